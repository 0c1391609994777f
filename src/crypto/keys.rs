//! P-256 key material and shared-secret derivation
//!
//! Private halves never leave this module in a transportable form: neither
//! [`KeyPair`] nor [`SymmetricKey`] implements `Serialize`, and neither exposes
//! an encoding helper. Only [`PublicKey`] crosses a channel.

use super::encoding::{decode_bytes, encode_bytes, Encoding};
use crate::{FrameError, Result};
use hkdf::Hkdf;
use p256::ecdh::diffie_hellman;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of a symmetric key in bytes (256 bits)
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Size of an uncompressed SEC1 P-256 public key
pub const PUBLIC_KEY_SIZE: usize = 65;

const SHARED_SECRET_SALT: &[u8] = b"secure-frame-ecdh-salt-v1";
const SHARED_SECRET_INFO: &[u8] = b"secure-frame-aes-256-gcm-key-v1";

/// A P-256 public key
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(p256::PublicKey);

impl PublicKey {
    /// Import a SEC1-encoded key (compressed or uncompressed)
    ///
    /// Points off the curve, the identity and malformed encodings are rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        p256::PublicKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|e| FrameError::key_with("Invalid P-256 public key", e))
    }

    /// Export as 65-byte uncompressed SEC1
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_encoded_point(false).as_bytes().to_vec()
    }

    /// Import from an encoded string
    pub fn from_encoded(encoded: &str, encoding: Encoding) -> Result<Self> {
        let bytes = decode_bytes(encoded, encoding)
            .map_err(|e| FrameError::key_with("Invalid public key encoding", e))?;
        Self::from_bytes(&bytes)
    }

    /// Export as an encoded string
    pub fn to_encoded(&self, encoding: Encoding) -> String {
        encode_bytes(&self.to_bytes(), encoding)
    }

    pub(crate) fn inner(&self) -> &p256::PublicKey {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey")
            .field(&self.to_encoded(Encoding::Hex))
            .finish()
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_encoded(Encoding::Base64))
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::from_encoded(&encoded, Encoding::Base64).map_err(serde::de::Error::custom)
    }
}

/// A P-256 key pair held in memory for one session
pub struct KeyPair {
    secret: p256::SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a fresh key pair from OS randomness
    pub fn generate() -> Self {
        let secret = p256::SecretKey::random(&mut OsRng);
        let public = PublicKey(secret.public_key());
        Self { secret, public }
    }

    /// Get the public half
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub(crate) fn secret(&self) -> &p256::SecretKey {
        &self.secret
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A 256-bit symmetric key
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; SYMMETRIC_KEY_SIZE]);

impl SymmetricKey {
    /// Generate a random key
    pub fn generate() -> Self {
        let mut bytes = [0u8; SYMMETRIC_KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create a key from exactly 32 bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; SYMMETRIC_KEY_SIZE] = bytes.try_into().map_err(|_| {
            FrameError::key(format!(
                "Symmetric key must be {} bytes, got {}",
                SYMMETRIC_KEY_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

/// Derive a symmetric key shared with a peer
///
/// ECDH over P-256 followed by HKDF-SHA256. Both sides derive the same key:
/// `derive_shared_secret(a, b.public) == derive_shared_secret(b, a.public)`.
pub fn derive_shared_secret(own: &KeyPair, peer: &PublicKey) -> Result<SymmetricKey> {
    let shared = diffie_hellman(own.secret().to_nonzero_scalar(), peer.inner().as_affine());

    let hkdf = Hkdf::<Sha256>::new(Some(SHARED_SECRET_SALT), shared.raw_secret_bytes().as_slice());
    let mut okm = [0u8; SYMMETRIC_KEY_SIZE];
    hkdf.expand(SHARED_SECRET_INFO, &mut okm)
        .map_err(|_| FrameError::key("HKDF expansion failed"))?;

    let key = SymmetricKey(okm);
    okm.zeroize();
    Ok(key)
}
