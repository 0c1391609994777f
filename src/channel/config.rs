//! Channel configuration

use crate::types::constants::{DEFAULT_HANDSHAKE_INTERVAL, DEFAULT_HANDSHAKE_TIMEOUT, PROTOCOL_VERSION};
use crate::types::Origin;
use crate::{FrameError, Result};
use std::time::Duration;

/// Handshake timing and protocol version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeOptions {
    /// Give up after this long without an acknowledgement
    pub timeout: Duration,
    /// Parent re-sends its request this often
    pub interval: Duration,
    /// Protocol version announced during the handshake
    pub protocol_version: u32,
}

impl Default for HandshakeOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            interval: DEFAULT_HANDSHAKE_INTERVAL,
            protocol_version: PROTOCOL_VERSION,
        }
    }
}

impl HandshakeOptions {
    /// Create options with the default timings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the handshake timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the request retry interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the announced protocol version
    pub fn with_protocol_version(mut self, version: u32) -> Self {
        self.protocol_version = version;
        self
    }

    /// Validate the handshake options
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(FrameError::config("Handshake timeout must be greater than zero"));
        }

        if self.interval.is_zero() {
            return Err(FrameError::config("Handshake interval must be greater than zero"));
        }

        if self.interval > self.timeout {
            return Err(FrameError::config(format!(
                "Handshake interval {:?} is longer than the timeout {:?}",
                self.interval, self.timeout
            )));
        }

        Ok(())
    }
}

/// Configuration for one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// The only origin frames are posted to and accepted from
    pub target_origin: Origin,
    /// Handshake timing and version
    pub handshake: HandshakeOptions,
    /// Extra origins a child accepts a `handshakeRequest` from
    pub bootstrap_origins: Vec<Origin>,
}

impl ChannelConfig {
    /// Create a config for a target origin such as `https://signers.example.com`
    ///
    /// Wildcards, non-http schemes and anything that is not a bare origin are
    /// rejected here, so a channel can never be built around them.
    pub fn new(target_origin: &str) -> Result<Self> {
        Ok(Self::from_origin(Origin::parse(target_origin)?))
    }

    /// Create a config for an already parsed origin
    pub fn from_origin(target_origin: Origin) -> Self {
        Self {
            target_origin,
            handshake: HandshakeOptions::default(),
            bootstrap_origins: Vec::new(),
        }
    }

    /// Replace the handshake options
    pub fn with_handshake_options(mut self, options: HandshakeOptions) -> Self {
        self.handshake = options;
        self
    }

    /// Set the handshake timeout
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake.timeout = timeout;
        self
    }

    /// Set the handshake retry interval
    pub fn with_handshake_interval(mut self, interval: Duration) -> Self {
        self.handshake.interval = interval;
        self
    }

    /// Set the announced protocol version
    pub fn with_protocol_version(mut self, version: u32) -> Self {
        self.handshake.protocol_version = version;
        self
    }

    /// Accept handshake requests from an additional origin (child role only)
    pub fn with_bootstrap_origin(mut self, origin: Origin) -> Self {
        if !self.bootstrap_origins.contains(&origin) {
            self.bootstrap_origins.push(origin);
        }
        self
    }

    /// Validate the channel configuration
    pub fn validate(&self) -> Result<()> {
        self.handshake.validate()
    }

    /// Whether a child may accept a handshake request from `origin`
    pub(crate) fn is_bootstrap_origin(&self, origin: &str) -> bool {
        self.bootstrap_origins.iter().any(|o| o.matches(origin))
    }
}
