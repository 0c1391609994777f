//! Asymmetric envelopes (RFC 9180 HPKE)
//!
//! Suite: DHKEM(P-256, HKDF-SHA256), HKDF-SHA256, AES-256-GCM.
//!
//! Envelopes are sealed in auth mode: the sender's static key takes part in
//! the key schedule, so an envelope opens only for a recipient who names the
//! same sender key. That key travels next to the ciphertext and is repeated
//! inside the sealed plaintext:
//!
//! ```json
//! { "data": { ... }, "encryptionContext": { "senderPublicKey": "<base64>" } }
//! ```
//!
//! Envelopes without a sender key (base mode, from peers that do not
//! authenticate) still open, but never when a sender is expected.

use super::encoding::{decode_bytes, encode_bytes, serde_base64, Encoding};
use super::keys::{KeyPair, PublicKey};
use crate::{FrameError, Result};
use hpke::aead::AesGcm256;
use hpke::kdf::HkdfSha256;
use hpke::kem::DhP256HkdfSha256;
use hpke::{Deserializable, Kem as KemTrait, OpModeR, OpModeS, Serializable};
use rand::rngs::OsRng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

type Kem = DhP256HkdfSha256;
type Aead = AesGcm256;
type Kdf = HkdfSha256;

/// HPKE `info` parameter (empty, matching the signer frames)
const HPKE_INFO: &[u8] = b"";

/// HPKE additional authenticated data (empty)
const HPKE_AAD: &[u8] = b"";

/// The result of sealing a payload for one recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionEnvelope {
    /// AEAD ciphertext including the authentication tag
    #[serde(with = "serde_base64")]
    pub ciphertext: Vec<u8>,
    /// Encapsulated ephemeral key the recipient needs to derive the shared secret
    #[serde(with = "serde_base64")]
    pub encapsulated_key: Vec<u8>,
    /// Static key of the sealing side; absent for base mode envelopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_public_key: Option<PublicKey>,
}

/// String-encoded form of an envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedEnvelope {
    pub ciphertext: String,
    pub encapsulated_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_public_key: Option<String>,
}

impl EncryptionEnvelope {
    /// Encode every field with the given encoding
    pub fn encode(&self, encoding: Encoding) -> EncodedEnvelope {
        EncodedEnvelope {
            ciphertext: encode_bytes(&self.ciphertext, encoding),
            encapsulated_key: encode_bytes(&self.encapsulated_key, encoding),
            sender_public_key: self
                .sender_public_key
                .as_ref()
                .map(|key| key.to_encoded(encoding)),
        }
    }

    /// Decode an encoded envelope
    pub fn decode(encoded: &EncodedEnvelope, encoding: Encoding) -> Result<Self> {
        Ok(Self {
            ciphertext: decode_bytes(&encoded.ciphertext, encoding)?,
            encapsulated_key: decode_bytes(&encoded.encapsulated_key, encoding)?,
            sender_public_key: encoded
                .sender_public_key
                .as_deref()
                .map(|key| PublicKey::from_encoded(key, encoding))
                .transpose()?,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SealedPayload<'a, T> {
    data: &'a T,
    encryption_context: EncryptionContext,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenedPayload<T> {
    data: T,
    encryption_context: EncryptionContext,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncryptionContext {
    sender_public_key: PublicKey,
}

fn suite_public_key(key: &PublicKey) -> Result<<Kem as KemTrait>::PublicKey> {
    <Kem as KemTrait>::PublicKey::from_bytes(&key.to_bytes())
        .map_err(|e| FrameError::key_with("Public key rejected by HPKE suite", e))
}

fn suite_private_key(pair: &KeyPair) -> Result<<Kem as KemTrait>::PrivateKey> {
    <Kem as KemTrait>::PrivateKey::from_bytes(pair.secret().to_bytes().as_slice())
        .map_err(|e| FrameError::key_with("Private key rejected by HPKE suite", e))
}

/// Seal a payload for `recipient`, authenticated as `sender`
///
/// Pass `None` to use a fresh ephemeral sender pair for this call only; pass a
/// session-bound pair to let the recipient authenticate the sender across
/// calls with [`decrypt_asymmetric`].
pub fn encrypt_asymmetric<T: Serialize>(
    payload: &T,
    recipient: &PublicKey,
    sender: Option<&KeyPair>,
) -> Result<EncryptionEnvelope> {
    let ephemeral;
    let sender = match sender {
        Some(sender) => sender,
        None => {
            ephemeral = KeyPair::generate();
            &ephemeral
        }
    };

    let plaintext = serde_json::to_vec(&SealedPayload {
        data: payload,
        encryption_context: EncryptionContext {
            sender_public_key: sender.public_key().clone(),
        },
    })?;

    let recipient_key = suite_public_key(recipient)?;
    let mode = OpModeS::Auth((suite_private_key(sender)?, suite_public_key(sender.public_key())?));

    let (encapsulated_key, ciphertext) = hpke::single_shot_seal::<Aead, Kdf, Kem, _>(
        &mode,
        &recipient_key,
        HPKE_INFO,
        &plaintext,
        HPKE_AAD,
        &mut OsRng,
    )
    .map_err(|e| {
        tracing::error!("HPKE seal failed: {}", e);
        FrameError::encryption("Failed to encrypt data")
    })?;

    Ok(EncryptionEnvelope {
        ciphertext,
        encapsulated_key: encapsulated_key.to_bytes().to_vec(),
        sender_public_key: Some(sender.public_key().clone()),
    })
}

fn open(envelope: &EncryptionEnvelope, recipient: &KeyPair, sender: Option<&PublicKey>) -> Result<Vec<u8>> {
    let recipient_key = suite_private_key(recipient)?;

    let encapsulated_key =
        <Kem as KemTrait>::EncappedKey::from_bytes(&envelope.encapsulated_key)
            .map_err(|e| FrameError::decryption_with("Malformed encapsulated key", e))?;

    let mode = match sender {
        Some(sender) => OpModeR::Auth(
            suite_public_key(sender)
                .map_err(|e| FrameError::decryption_with("Malformed sender key", e))?,
        ),
        None => OpModeR::Base,
    };

    hpke::single_shot_open::<Aead, Kdf, Kem>(
        &mode,
        &recipient_key,
        &encapsulated_key,
        HPKE_INFO,
        &envelope.ciphertext,
        HPKE_AAD,
    )
    .map_err(|e| {
        tracing::debug!("HPKE open failed: {}", e);
        FrameError::decryption("Failed to decrypt data")
    })
}

/// Open an envelope sealed with [`encrypt_asymmetric`]
///
/// With `expected_sender`, the envelope opens only if it was sealed by the
/// holder of that key's private half. Every failure is a
/// [`FrameError::Decryption`].
pub fn decrypt_asymmetric<T: DeserializeOwned>(
    envelope: &EncryptionEnvelope,
    recipient: &KeyPair,
    expected_sender: Option<&PublicKey>,
) -> Result<T> {
    match expected_sender {
        Some(expected) => {
            if envelope.sender_public_key.as_ref() != Some(expected) {
                return Err(FrameError::decryption("Envelope sender does not match"));
            }
            let (data, _) = open_payload(envelope, recipient, Some(expected))?;
            Ok(data)
        }
        None => {
            let (data, _) = open_payload(envelope, recipient, envelope.sender_public_key.as_ref())?;
            Ok(data)
        }
    }
}

/// Open an envelope and return the payload with the key that sealed it
///
/// Fails for base mode envelopes, which carry no authenticated sender.
pub fn decrypt_with_sender<T: DeserializeOwned>(
    envelope: &EncryptionEnvelope,
    recipient: &KeyPair,
) -> Result<(T, PublicKey)> {
    let sender = envelope
        .sender_public_key
        .as_ref()
        .ok_or_else(|| FrameError::decryption("Envelope carries no sender key"))?;
    open_payload(envelope, recipient, Some(sender))
}

fn open_payload<T: DeserializeOwned>(
    envelope: &EncryptionEnvelope,
    recipient: &KeyPair,
    sender: Option<&PublicKey>,
) -> Result<(T, PublicKey)> {
    let plaintext = open(envelope, recipient, sender)?;

    let opened: OpenedPayload<T> = serde_json::from_slice(&plaintext)
        .map_err(|e| FrameError::decryption_with("Decrypted payload is malformed", e))?;

    let claimed = opened.encryption_context.sender_public_key;
    if let Some(sender) = sender {
        if &claimed != sender {
            return Err(FrameError::decryption("Sealed sender key does not match envelope"));
        }
    }

    Ok((opened.data, claimed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seal_base(plaintext: &[u8], recipient: &PublicKey) -> EncryptionEnvelope {
        let (encapsulated_key, ciphertext) = hpke::single_shot_seal::<Aead, Kdf, Kem, _>(
            &OpModeS::Base,
            &suite_public_key(recipient).unwrap(),
            HPKE_INFO,
            plaintext,
            HPKE_AAD,
            &mut OsRng,
        )
        .unwrap();
        EncryptionEnvelope {
            ciphertext,
            encapsulated_key: encapsulated_key.to_bytes().to_vec(),
            sender_public_key: None,
        }
    }

    #[test]
    fn test_claimed_sender_in_plaintext_is_not_trusted() {
        let recipient = KeyPair::generate();
        let trusted = KeyPair::generate();

        let plaintext = serde_json::to_vec(&serde_json::json!({
            "data": "attacker payload",
            "encryptionContext": { "senderPublicKey": trusted.public_key() },
        }))
        .unwrap();
        let mut forged = seal_base(&plaintext, recipient.public_key());

        // unauthenticated envelopes still open when no sender is expected
        let opened: String = decrypt_asymmetric(&forged, &recipient, None).unwrap();
        assert_eq!(opened, "attacker payload");

        let err = decrypt_asymmetric::<String>(&forged, &recipient, Some(trusted.public_key()))
            .unwrap_err();
        assert!(matches!(err, FrameError::Decryption { .. }));
        assert!(decrypt_with_sender::<String>(&forged, &recipient).is_err());

        // naming the trusted key on the envelope does not help either
        forged.sender_public_key = Some(trusted.public_key().clone());
        let err = decrypt_asymmetric::<String>(&forged, &recipient, Some(trusted.public_key()))
            .unwrap_err();
        assert!(matches!(err, FrameError::Decryption { .. }));
    }

    #[test]
    fn test_envelope_relabelled_with_trusted_sender_fails() {
        let recipient = KeyPair::generate();
        let trusted = KeyPair::generate();
        let attacker = KeyPair::generate();

        let mut sealed =
            encrypt_asymmetric(&"attacker payload", recipient.public_key(), Some(&attacker)).unwrap();
        sealed.sender_public_key = Some(trusted.public_key().clone());

        let err = decrypt_asymmetric::<String>(&sealed, &recipient, Some(trusted.public_key()))
            .unwrap_err();
        assert!(matches!(err, FrameError::Decryption { .. }));
        assert!(decrypt_with_sender::<String>(&sealed, &recipient).is_err());
    }

    #[test]
    fn test_auth_envelope_names_its_sender() {
        let recipient = KeyPair::generate();
        let sender = KeyPair::generate();

        let sealed = encrypt_asymmetric(&7u32, recipient.public_key(), Some(&sender)).unwrap();
        assert_eq!(sealed.sender_public_key.as_ref(), Some(sender.public_key()));

        let opened: u32 = decrypt_asymmetric(&sealed, &recipient, None).unwrap();
        assert_eq!(opened, 7);
    }
}
