mod aes;
pub mod attack;
mod cbc;
pub mod oracle;
mod padding;
pub mod server;

pub use aes::{AesCipher, CipherError, BLOCK_SIZE};
pub use attack::{
    discover_padding_length, recover_bytes, AttackConfig, AttackError, PaddingOracleAttack,
    RecoveredBlock,
};
pub use cbc::{decrypt_cbc, encrypt_cbc, generate_key, random_bytes};
pub use oracle::{
    http::HttpOracle, local::LocalOracle, Candidate, EncryptionOracle, OracleError,
    PaddingOracle, Verdict, UNPADDING_DIAGNOSTIC,
};
pub use padding::{pkcs7_pad, pkcs7_unpad, PaddingError};
