//! Byte encodings (hex, base58, base64)

use crate::{FrameError, Result};
use base64::{engine::general_purpose, Engine as _};
use std::fmt;
use std::str::FromStr;

/// Supported byte ↔ string encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Lowercase hexadecimal
    Hex,
    /// Base58 (bitcoin alphabet)
    Base58,
    /// Standard base64 with padding
    Base64,
}

impl Encoding {
    /// Get the encoding name
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Hex => "hex",
            Encoding::Base58 => "base58",
            Encoding::Base64 => "base64",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hex" => Ok(Encoding::Hex),
            "base58" => Ok(Encoding::Base58),
            "base64" => Ok(Encoding::Base64),
            other => Err(FrameError::UnsupportedEncoding {
                encoding: other.to_string(),
            }),
        }
    }
}

/// Encode bytes into a string
pub fn encode_bytes(bytes: &[u8], encoding: Encoding) -> String {
    match encoding {
        Encoding::Hex => hex::encode(bytes),
        Encoding::Base58 => bs58::encode(bytes).into_string(),
        Encoding::Base64 => general_purpose::STANDARD.encode(bytes),
    }
}

/// Decode a string into bytes
///
/// Hex input may carry a `0x` prefix. Malformed input is an error, never a
/// truncated result.
pub fn decode_bytes(input: &str, encoding: Encoding) -> Result<Vec<u8>> {
    match encoding {
        Encoding::Hex => hex::decode(input.strip_prefix("0x").unwrap_or(input))
            .map_err(|e| FrameError::decoding(format!("Invalid hex: {}", e))),
        Encoding::Base58 => bs58::decode(input)
            .into_vec()
            .map_err(|e| FrameError::decoding(format!("Invalid base58: {}", e))),
        Encoding::Base64 => general_purpose::STANDARD
            .decode(input)
            .map_err(|e| FrameError::decoding(format!("Invalid base64: {}", e))),
    }
}

/// Serde helpers for byte fields carried as base64 strings
pub mod serde_base64 {
    use super::{decode_bytes, encode_bytes, Encoding};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&encode_bytes(bytes, Encoding::Base64))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        decode_bytes(&encoded, Encoding::Base64).map_err(serde::de::Error::custom)
    }
}
