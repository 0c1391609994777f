//! Window origins

use crate::{FrameError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// A serialized `http`/`https` origin (`scheme://host[:port]`)
///
/// Origins are the unit of trust for a channel: posts are addressed to exactly
/// one origin and inbound frames are compared against it byte for byte.
/// Wildcards are never representable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Origin(String);

impl Origin {
    /// Parse a bare origin such as `https://signers.example.com`
    ///
    /// A trailing slash is tolerated; paths, queries, fragments, default ports
    /// spelled out and non-http schemes are rejected.
    pub fn parse(origin: &str) -> Result<Self> {
        let url = parse_http_url(origin)?;
        let serialized = url.origin().ascii_serialization();

        if origin.trim_end_matches('/') != serialized {
            return Err(FrameError::config(format!(
                "'{}' is not a bare origin (expected '{}')",
                origin, serialized
            )));
        }

        Ok(Self(serialized))
    }

    /// Derive the origin of a full URL
    pub fn from_url(url: &str) -> Result<Self> {
        let url = parse_http_url(url)?;
        Ok(Self(url.origin().ascii_serialization()))
    }

    /// Get the serialized origin
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check an inbound origin string against this origin
    pub fn matches(&self, other: &str) -> bool {
        self.0 == other
    }
}

fn parse_http_url(input: &str) -> Result<Url> {
    if input.trim() == "*" {
        return Err(FrameError::config(
            "Wildcard target origins are not allowed",
        ));
    }

    let url = Url::parse(input)
        .map_err(|e| FrameError::config(format!("Invalid origin '{}': {}", input, e)))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(FrameError::config(format!(
                "Origin must use http or https, got '{}'",
                other
            )))
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(FrameError::config(format!(
            "Origin '{}' has no host",
            input
        )));
    }

    Ok(url)
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Origin {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Origin {
    type Error = FrameError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Origin> for String {
    fn from(origin: Origin) -> Self {
        origin.0
    }
}

impl AsRef<str> for Origin {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_origin() {
        let origin = Origin::parse("https://signers.crossmint.com").unwrap();
        assert_eq!(origin.as_str(), "https://signers.crossmint.com");

        let origin = Origin::parse("http://localhost:3000/").unwrap();
        assert_eq!(origin.as_str(), "http://localhost:3000");
    }

    #[test]
    fn test_parse_rejects_non_origins() {
        assert!(Origin::parse("*").is_err());
        assert!(Origin::parse("").is_err());
        assert!(Origin::parse("signers.crossmint.com").is_err());
        assert!(Origin::parse("ftp://files.example.com").is_err());
        assert!(Origin::parse("https://example.com/path").is_err());
        assert!(Origin::parse("https://example.com:443").is_err());

        let err = Origin::parse("*").unwrap_err();
        assert!(matches!(err, FrameError::Config { .. }));
    }

    #[test]
    fn test_from_url() {
        let origin = Origin::from_url("https://www.crossmint.com/sdk/2024-09-26/signers?x=1#y").unwrap();
        assert_eq!(origin.as_str(), "https://www.crossmint.com");

        let origin = Origin::from_url("http://localhost:3001/popup").unwrap();
        assert_eq!(origin.as_str(), "http://localhost:3001");

        assert!(Origin::from_url("javascript:alert(1)").is_err());
    }

    #[test]
    fn test_matches_is_exact() {
        let origin = Origin::parse("https://example.com").unwrap();
        assert!(origin.matches("https://example.com"));
        assert!(!origin.matches("https://example.com/"));
        assert!(!origin.matches("https://EXAMPLE.com"));
        assert!(!origin.matches("http://example.com"));
        assert!(!origin.matches("https://evil.example.com"));
    }

    #[test]
    fn test_serde() {
        let origin: Origin = serde_json::from_str("\"https://example.com\"").unwrap();
        assert_eq!(origin.as_str(), "https://example.com");
        assert_eq!(serde_json::to_string(&origin).unwrap(), "\"https://example.com\"");
        assert!(serde_json::from_str::<Origin>("\"*\"").is_err());
    }
}
