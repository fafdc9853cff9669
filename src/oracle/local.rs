// In-process padding oracle holding the key
use crate::{
    cbc::{decrypt_cbc, encrypt_cbc, generate_key, random_bytes},
    AesCipher, CipherError, BLOCK_SIZE,
};

use super::{Candidate, EncryptionOracle, OracleError, PaddingOracle, Verdict, UNPADDING_DIAGNOSTIC};

#[derive(Debug, Clone)]
pub struct LocalOracle {
    cipher: AesCipher,
}

impl LocalOracle {
    pub fn new(key: &[u8]) -> Result<Self, CipherError> {
        Ok(Self {
            cipher: AesCipher::new(key)?,
        })
    }

    pub fn random(key_bits: usize) -> Result<Self, CipherError> {
        Self::new(&generate_key(key_bits)?)
    }

    pub fn encrypt_with_iv(&self, plaintext: &[u8], iv: &[u8; BLOCK_SIZE]) -> Vec<u8> {
        encrypt_cbc(plaintext, &self.cipher, iv)
    }

    /// What a padding oracle service would print after decrypting: the
    /// unpadding diagnostic on bad padding, nothing otherwise.
    pub fn decrypt_output(
        &self,
        iv: &[u8; BLOCK_SIZE],
        ciphertext: &[u8],
    ) -> Result<&'static str, CipherError> {
        match decrypt_cbc(ciphertext, &self.cipher, iv) {
            Ok(_) => Ok(""),
            Err(CipherError::Padding(_)) => Ok(UNPADDING_DIAGNOSTIC),
            Err(e) => Err(e),
        }
    }
}

impl PaddingOracle for LocalOracle {
    fn query(&self, candidate: &Candidate) -> Result<Verdict, OracleError> {
        let output = self.decrypt_output(candidate.iv(), candidate.ciphertext())?;
        Ok(Verdict::from_output(output.as_bytes()))
    }
}

impl EncryptionOracle for LocalOracle {
    fn encrypt(&self, plaintext: &[u8]) -> Result<([u8; BLOCK_SIZE], Vec<u8>), OracleError> {
        let iv = random_bytes::<BLOCK_SIZE>();
        Ok((iv, self.encrypt_with_iv(plaintext, &iv)))
    }
}
