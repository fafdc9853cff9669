// AES in CBC mode with PKCS#7 padding
use rand::RngCore;

use crate::{
    aes::{AesCipher, CipherError, BLOCK_SIZE},
    padding::{pkcs7_pad, pkcs7_unpad},
};

pub fn encrypt_cbc(
    plaintext: &[u8],
    cipher: &AesCipher,
    iv: &[u8; BLOCK_SIZE],
) -> Vec<u8> {
    let padded = pkcs7_pad(plaintext, BLOCK_SIZE as u8);
    let mut ciphertext = Vec::with_capacity(padded.len());

    let mut last_block = *iv;
    for plaintext_block in padded.chunks_exact(BLOCK_SIZE) {
        let mut message_buf = last_block;
        xor_into(&mut message_buf, plaintext_block);
        last_block = cipher.encrypt_block(&message_buf);
        ciphertext.extend_from_slice(&last_block);
    }
    ciphertext
}

pub fn decrypt_cbc(
    ciphertext: &[u8],
    cipher: &AesCipher,
    iv: &[u8; BLOCK_SIZE],
) -> Result<Vec<u8>, CipherError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CipherError::CiphertextLength(ciphertext.len()));
    }
    let mut message = Vec::with_capacity(ciphertext.len());

    let mut last_block: &[u8] = iv;
    for ciphertext_block in ciphertext.chunks_exact(BLOCK_SIZE) {
        let mut ciphertext_buf = [0u8; BLOCK_SIZE];
        ciphertext_buf.copy_from_slice(ciphertext_block);
        let mut message_buf = cipher.decrypt_block(&ciphertext_buf);
        xor_into(&mut message_buf, last_block);
        message.extend_from_slice(&message_buf);
        last_block = ciphertext_block;
    }
    pkcs7_unpad(&mut message, BLOCK_SIZE as u8)?;
    Ok(message)
}

pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Generate a random AES key of the given size in bits.
pub fn generate_key(bits: usize) -> Result<Vec<u8>, CipherError> {
    if ![128, 192, 256].contains(&bits) {
        return Err(CipherError::KeyBits(bits));
    }
    let mut key = vec![0u8; bits / 8];
    rand::thread_rng().fill_bytes(&mut key);
    Ok(key)
}

fn xor_into(block: &mut [u8; BLOCK_SIZE], other: &[u8]) {
    block.iter_mut().zip(other).for_each(|(a, b)| *a ^= b);
}
