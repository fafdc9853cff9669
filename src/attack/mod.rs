// CBC padding oracle attack against the final ciphertext block.
//
// CBC decryption computes
//
//                 P_n = D(C_n) ⊕ C_{n-1},
//
// so flipping a bit of C_{n-1} (or the IV, if the message is one block long)
// flips the same bit of P_n and garbles nothing that the padding check looks
// at. We only ever touch that preceding block.
//
// First we find where the padding starts. Flipping the first i + 1 bytes of
// C_{n-1} leaves the padding intact until byte i of P_n is itself a padding
// byte, at which point the oracle reports bad padding.
//
// Then we walk back from the padding one byte at a time. With the last b
// bytes of P_n known we force them all to decrypt to b + 1, and try every
// mask for the byte before them. Exactly one mask makes that byte b + 1 as
// well and the oracle accepts the padding; the plaintext byte is the mask
// XOR b + 1.
mod discover;
mod recover;

pub use discover::discover_padding_length;
pub use recover::recover_bytes;

use thiserror::Error;
use tracing::info;

use crate::{
    oracle::{Candidate, EncryptionOracle, OracleError, PaddingOracle, Verdict},
    BLOCK_SIZE,
};

#[derive(Debug, Error)]
pub enum AttackError {
    #[error("ciphertext of {len} bytes is not a positive multiple of {} bytes", BLOCK_SIZE)]
    MalformedCiphertext { len: usize },
    #[error("could not obtain a target ciphertext: {0}")]
    EncryptionFailed(#[source] OracleError),
    #[error("the oracle rejected the padding of the untouched ciphertext")]
    TargetRejected,
    #[error("oracle unavailable during {stage} at byte {offset} (candidate {candidate}): {source}")]
    OracleUnavailable {
        stage: &'static str,
        offset: usize,
        candidate: String,
        #[source]
        source: OracleError,
    },
    #[error("no padding boundary found after {queries} oracle queries")]
    DiscoveryFailed { queries: usize },
    #[error("padding length {0} is outside 1..={}", BLOCK_SIZE)]
    PaddingLengthOutOfRange(usize),
    #[error("no mask validated plaintext byte {offset} at recovery step {step}")]
    RecoveryStalled { step: usize, offset: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttackConfig {
    /// Probe the 256 masks for each byte on the rayon thread pool.
    pub parallel: bool,
}

impl AttackConfig {
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// The plaintext of the final block, split at the discovered padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredBlock {
    padding_length: usize,
    content: Vec<u8>,
}

impl RecoveredBlock {
    pub fn padding_length(&self) -> usize {
        self.padding_length
    }

    /// The message bytes of the final block, in order.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// The whole final block, padding included.
    pub fn plaintext(&self) -> Vec<u8> {
        let mut block = self.content.clone();
        block.resize(BLOCK_SIZE, self.padding_length as u8);
        block
    }
}

impl std::fmt::Display for RecoveredBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.content))
    }
}

pub struct PaddingOracleAttack<O> {
    oracle: O,
    config: AttackConfig,
}

impl<O: PaddingOracle + Sync> PaddingOracleAttack<O> {
    pub fn new(oracle: O) -> Self {
        Self {
            oracle,
            config: AttackConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AttackConfig) -> Self {
        self.config = config;
        self
    }

    pub fn run(
        &self,
        iv: &[u8; BLOCK_SIZE],
        ciphertext: &[u8],
    ) -> Result<RecoveredBlock, AttackError> {
        let target = Target::new(iv, ciphertext)?;
        let verdict = query(&self.oracle, target.forge(|_| ()), "target check", 0)?;
        if !verdict.is_valid() {
            return Err(AttackError::TargetRejected);
        }
        info!(blocks = ciphertext.len() / BLOCK_SIZE, "oracle accepts the target");

        let padding_length = discover::discover_in(&self.oracle, &target)?;
        info!(padding_length, "discovered padding length");

        let content = recover::recover_in(&self.oracle, &target, padding_length, self.config)?;
        info!(recovered = content.len(), "recovered final block");

        Ok(RecoveredBlock {
            padding_length,
            content,
        })
    }

    /// Have `encryptor` produce the ciphertext of `plaintext`, then attack it.
    pub fn run_encrypted<E: EncryptionOracle + ?Sized>(
        &self,
        encryptor: &E,
        plaintext: &[u8],
    ) -> Result<RecoveredBlock, AttackError> {
        let (iv, ciphertext) = encryptor
            .encrypt(plaintext)
            .map_err(AttackError::EncryptionFailed)?;
        self.run(&iv, &ciphertext)
    }
}

/// `iv || ciphertext`, so that the block before the target is addressed the
/// same way whether or not it is the IV.
#[derive(Debug, Clone)]
pub(crate) struct Target {
    chained: Vec<u8>,
}

impl Target {
    pub(crate) fn new(iv: &[u8; BLOCK_SIZE], ciphertext: &[u8]) -> Result<Self, AttackError> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(AttackError::MalformedCiphertext {
                len: ciphertext.len(),
            });
        }
        Ok(Self {
            chained: [iv.as_slice(), ciphertext].concat(),
        })
    }

    /// A fresh candidate with `edit` applied to the block preceding the target.
    pub(crate) fn forge(&self, edit: impl FnOnce(&mut [u8; BLOCK_SIZE])) -> Candidate {
        let mut chained = self.chained.clone();
        let start = chained.len() - 2 * BLOCK_SIZE;
        let mut preceding = [0u8; BLOCK_SIZE];
        preceding.copy_from_slice(&chained[start..start + BLOCK_SIZE]);
        edit(&mut preceding);
        chained[start..start + BLOCK_SIZE].copy_from_slice(&preceding);
        Candidate::from_chained(&chained)
    }
}

pub(crate) fn query<O: PaddingOracle + ?Sized>(
    oracle: &O,
    candidate: Candidate,
    stage: &'static str,
    offset: usize,
) -> Result<Verdict, AttackError> {
    oracle
        .query(&candidate)
        .map_err(|source| AttackError::OracleUnavailable {
            stage,
            offset,
            candidate: candidate.to_hex(),
            source,
        })
}
