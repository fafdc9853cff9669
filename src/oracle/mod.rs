// Padding oracle client seam.
//
// An oracle decrypts a candidate ciphertext under a key we never see and
// reports only whether the recovered plaintext was correctly padded. Services
// signal bad padding by printing a fixed diagnostic; anything else they print
// means the padding was fine.
pub mod http;
pub mod local;

use thiserror::Error;

use crate::{CipherError, BLOCK_SIZE};

/// Printed by a padding oracle service when, and only when, unpadding fails.
pub const UNPADDING_DIAGNOSTIC: &str = "Error While Unpadding!\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid,
}

impl Verdict {
    /// Interpret the output of a padding oracle service. Only an exact match
    /// of [`UNPADDING_DIAGNOSTIC`] counts as bad padding.
    pub fn from_output(output: &[u8]) -> Self {
        if output == UNPADDING_DIAGNOSTIC.as_bytes() {
            Verdict::Invalid
        } else {
            Verdict::Valid
        }
    }

    pub fn is_valid(self) -> bool {
        self == Verdict::Valid
    }
}

/// The oracle could not give a verdict. Never a statement about padding.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("could not reach the oracle: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("oracle answered with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed oracle response: {0}")]
    Malformed(String),
    #[error(transparent)]
    Cipher(#[from] CipherError),
}

/// A ciphertext and IV to submit to an oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    iv: [u8; BLOCK_SIZE],
    ciphertext: Vec<u8>,
}

impl Candidate {
    pub fn new(iv: [u8; BLOCK_SIZE], ciphertext: Vec<u8>) -> Self {
        Self { iv, ciphertext }
    }

    /// Split `iv || ciphertext` back into its parts.
    pub(crate) fn from_chained(chained: &[u8]) -> Self {
        let (iv_bytes, ciphertext) = chained.split_at(BLOCK_SIZE);
        let mut iv = [0u8; BLOCK_SIZE];
        iv.copy_from_slice(iv_bytes);
        Self::new(iv, ciphertext.to_vec())
    }

    pub fn iv(&self) -> &[u8; BLOCK_SIZE] {
        &self.iv
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn to_hex(&self) -> String {
        format!("{}{}", hex::encode(self.iv), hex::encode(&self.ciphertext))
    }
}

pub trait PaddingOracle {
    fn query(&self, candidate: &Candidate) -> Result<Verdict, OracleError>;
}

impl<T: PaddingOracle + ?Sized> PaddingOracle for &T {
    fn query(&self, candidate: &Candidate) -> Result<Verdict, OracleError> {
        (**self).query(candidate)
    }
}

/// Produces the ciphertext under attack. Returns the IV and the ciphertext.
pub trait EncryptionOracle {
    fn encrypt(&self, plaintext: &[u8]) -> Result<([u8; BLOCK_SIZE], Vec<u8>), OracleError>;
}

impl<T: EncryptionOracle + ?Sized> EncryptionOracle for &T {
    fn encrypt(&self, plaintext: &[u8]) -> Result<([u8; BLOCK_SIZE], Vec<u8>), OracleError> {
        (**self).encrypt(plaintext)
    }
}
