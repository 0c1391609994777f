//! Envelope cryptography for payloads carried over a channel
//!
//! This module protects data that crosses a window boundary: asymmetric
//! envelopes for one-off messages, shared-key AEAD for sessions, and
//! format-preserving encryption for short digit strings such as OTP codes.
//!
//! # Architecture
//!
//! The crypto module is organized as follows:
//! - [`encoding`] - hex, base58 and base64 byte encodings
//! - [`keys`] - P-256 key pairs, public key import/export, ECDH + HKDF
//! - [`envelope`] - RFC 9180 HPKE envelopes carrying the sender's public key
//! - [`symmetric`] - AES-256-GCM under a derived or generated key
//! - [`fpe`] - FF1 format-preserving encryption (feature `fpe`)
//! - [`service`] - [`EnvelopeService`], the per-session entry point
//!
//! # Examples
//!
//! ## Sealing a payload for a peer
//!
//! ```
//! use secure_frame::crypto::{decrypt_asymmetric, encrypt_asymmetric, KeyPair};
//!
//! # fn example() -> secure_frame::Result<()> {
//! let signer = KeyPair::generate();
//! let host = KeyPair::generate();
//!
//! let envelope = encrypt_asymmetric(&"hello", signer.public_key(), Some(&host))?;
//! let opened: String = decrypt_asymmetric(&envelope, &signer, Some(host.public_key()))?;
//! assert_eq!(opened, "hello");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Deriving a shared key
//!
//! ```
//! use secure_frame::crypto::{derive_shared_secret, decrypt_symmetric, encrypt_symmetric, KeyPair};
//!
//! # fn example() -> secure_frame::Result<()> {
//! let a = KeyPair::generate();
//! let b = KeyPair::generate();
//!
//! let key_a = derive_shared_secret(&a, b.public_key())?;
//! let key_b = derive_shared_secret(&b, a.public_key())?;
//!
//! let sealed = encrypt_symmetric(b"otp", &key_a)?;
//! assert_eq!(decrypt_symmetric(&sealed, &key_b)?, b"otp");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! # Features
//!
//! - **HPKE envelopes** - DHKEM(P-256, HKDF-SHA256) / HKDF-SHA256 / AES-256-GCM
//! - **Key agreement** - ECDH over P-256 with HKDF-SHA256 key derivation
//! - **Format-preserving encryption** - FF1 over AES-256 at any radix
//! - **Key hygiene** - private material never serializes and symmetric keys zeroize on drop

pub mod encoding;
pub mod envelope;
#[cfg(feature = "fpe")]
pub mod fpe;
pub mod keys;
pub mod service;
pub mod symmetric;


// Re-export commonly used items
pub use encoding::{decode_bytes, encode_bytes, Encoding};
pub use envelope::{
    decrypt_asymmetric, decrypt_with_sender, encrypt_asymmetric, EncodedEnvelope,
    EncryptionEnvelope,
};
#[cfg(feature = "fpe")]
pub use self::fpe::{decrypt_fpe, decrypt_fpe_str, encrypt_fpe, encrypt_fpe_str};
pub use keys::{derive_shared_secret, KeyPair, PublicKey, SymmetricKey};
pub use service::{CryptoConfig, EnvelopeService};
pub use symmetric::{decrypt_symmetric, encrypt_symmetric};
