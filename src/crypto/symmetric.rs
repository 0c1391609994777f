//! AES-256-GCM for data under an already-shared key
//!
//! Output layout: `nonce (12 bytes) || ciphertext || tag (16 bytes)`. A fresh
//! random nonce is drawn for every call.

use super::keys::SymmetricKey;
use crate::{FrameError, Result};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Encrypt bytes under a shared key
pub fn encrypt_symmetric(plaintext: &[u8], key: &SymmetricKey) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| FrameError::key("Invalid AES-256 key length"))?;

    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| FrameError::encryption("AES-GCM encryption failed"))?;

    let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Decrypt bytes produced by [`encrypt_symmetric`]
pub fn decrypt_symmetric(data: &[u8], key: &SymmetricKey) -> Result<Vec<u8>> {
    if data.len() < NONCE_SIZE + TAG_SIZE {
        return Err(FrameError::decryption(format!(
            "Ciphertext too short: {} bytes",
            data.len()
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| FrameError::key("Invalid AES-256 key length"))?;

    let (nonce, ciphertext) = data.split_at(NONCE_SIZE);
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| FrameError::decryption("Authentication tag mismatch"))
}
