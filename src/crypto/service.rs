//! Per-session envelope cryptography service

use super::encoding::{decode_bytes, encode_bytes, Encoding};
use super::envelope::{self, EncryptionEnvelope};
use super::keys::{self, KeyPair, PublicKey, SymmetricKey};
use super::symmetric;
use crate::{FrameError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Configuration for an [`EnvelopeService`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoConfig {
    /// Radix used for format-preserving encryption
    pub radix: u32,
    /// FF1 tweak
    pub tweak: Vec<u8>,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            radix: 10,
            tweak: Vec::new(),
        }
    }
}

impl CryptoConfig {
    /// Create a configuration with decimal radix and an empty tweak
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the FPE radix
    pub fn with_radix(mut self, radix: u32) -> Self {
        self.radix = radix;
        self
    }

    /// Set the FPE tweak
    pub fn with_tweak(mut self, tweak: impl Into<Vec<u8>>) -> Self {
        self.tweak = tweak.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(2..=(1 << 16)).contains(&self.radix) {
            return Err(FrameError::config(format!(
                "FPE radix must be between 2 and 65536, got {}",
                self.radix
            )));
        }
        Ok(())
    }
}

/// The cryptography a session keeps around
///
/// Stateless apart from its configuration; keys are always passed in by the
/// caller, who owns them.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeService {
    config: CryptoConfig,
}

impl EnvelopeService {
    /// Create a service from a validated configuration
    pub fn new(config: CryptoConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get the configuration
    pub fn config(&self) -> &CryptoConfig {
        &self.config
    }

    /// Generate a session key pair
    pub fn generate_key_pair(&self) -> KeyPair {
        KeyPair::generate()
    }

    /// Generate a random symmetric key
    pub fn generate_symmetric_key(&self) -> SymmetricKey {
        SymmetricKey::generate()
    }

    /// Derive the key shared with `peer`
    pub fn derive_shared_secret(&self, own: &KeyPair, peer: &PublicKey) -> Result<SymmetricKey> {
        keys::derive_shared_secret(own, peer)
    }

    /// Seal a payload for `recipient`
    pub fn encrypt<T: Serialize>(
        &self,
        payload: &T,
        recipient: &PublicKey,
        sender: Option<&KeyPair>,
    ) -> Result<EncryptionEnvelope> {
        envelope::encrypt_asymmetric(payload, recipient, sender)
    }

    /// Open an envelope sealed for `recipient`
    pub fn decrypt<T: DeserializeOwned>(
        &self,
        envelope: &EncryptionEnvelope,
        recipient: &KeyPair,
        expected_sender: Option<&PublicKey>,
    ) -> Result<T> {
        envelope::decrypt_asymmetric(envelope, recipient, expected_sender)
    }

    /// Open an envelope and learn who sealed it
    pub fn decrypt_with_sender<T: DeserializeOwned>(
        &self,
        envelope: &EncryptionEnvelope,
        recipient: &KeyPair,
    ) -> Result<(T, PublicKey)> {
        envelope::decrypt_with_sender(envelope, recipient)
    }

    /// AES-256-GCM encrypt under a shared key
    pub fn encrypt_symmetric(&self, plaintext: &[u8], key: &SymmetricKey) -> Result<Vec<u8>> {
        symmetric::encrypt_symmetric(plaintext, key)
    }

    /// AES-256-GCM decrypt under a shared key
    pub fn decrypt_symmetric(&self, data: &[u8], key: &SymmetricKey) -> Result<Vec<u8>> {
        symmetric::decrypt_symmetric(data, key)
    }

    /// Format-preserving encryption of a digit sequence at the configured radix
    #[cfg(feature = "fpe")]
    pub fn encrypt_fpe(&self, digits: &[u16], key: &SymmetricKey) -> Result<Vec<u16>> {
        super::fpe::encrypt_fpe(digits, key, self.config.radix, &self.config.tweak)
    }

    /// Reverse [`encrypt_fpe`](Self::encrypt_fpe)
    #[cfg(feature = "fpe")]
    pub fn decrypt_fpe(&self, digits: &[u16], key: &SymmetricKey) -> Result<Vec<u16>> {
        super::fpe::decrypt_fpe(digits, key, self.config.radix, &self.config.tweak)
    }

    /// Format-preserving encryption of a digit string at the configured radix
    #[cfg(feature = "fpe")]
    pub fn encrypt_fpe_str(&self, input: &str, key: &SymmetricKey) -> Result<String> {
        super::fpe::encrypt_fpe_str(input, key, self.config.radix, &self.config.tweak)
    }

    /// Reverse [`encrypt_fpe_str`](Self::encrypt_fpe_str)
    #[cfg(feature = "fpe")]
    pub fn decrypt_fpe_str(&self, input: &str, key: &SymmetricKey) -> Result<String> {
        super::fpe::decrypt_fpe_str(input, key, self.config.radix, &self.config.tweak)
    }

    /// Encode bytes
    pub fn encode(&self, bytes: &[u8], encoding: Encoding) -> String {
        encode_bytes(bytes, encoding)
    }

    /// Decode bytes
    pub fn decode(&self, input: &str, encoding: Encoding) -> Result<Vec<u8>> {
        decode_bytes(input, encoding)
    }
}
