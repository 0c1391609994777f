//! Handshake demo
//!
//! Runs a host page and a signer frame in one process over in-memory windows:
//! the two sides handshake, exchange public keys, and the host sends an OTP
//! that is format-preserving encrypted and then sealed in an HPKE envelope.

use secure_frame::channel::{ActionOptions, Channel, ChannelConfig};
use secure_frame::crypto::{CryptoConfig, EncryptionEnvelope, EnvelopeService, KeyPair, PublicKey};
use secure_frame::types::{EventMap, Origin};
use secure_frame::window::memory::window_pair;
use secure_frame::window::LoggedTransport;
use secure_frame::{FrameError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use std::time::Duration;

const HOST_ORIGIN: &str = "https://shop.example";
const SIGNER_ORIGIN: &str = "https://signers.example";

/// Events the host sends to the signer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
enum HostEvents {
    #[serde(rename = "request:get-public-key")]
    GetPublicKey { host_key: PublicKey },
    #[serde(rename = "request:verify-otp")]
    VerifyOtp { envelope: EncryptionEnvelope },
}

impl EventMap for HostEvents {
    const EVENTS: &'static [&'static str] = &["request:get-public-key", "request:verify-otp"];

    fn event_name(&self) -> &'static str {
        match self {
            HostEvents::GetPublicKey { .. } => "request:get-public-key",
            HostEvents::VerifyOtp { .. } => "request:verify-otp",
        }
    }
}

/// Events the signer sends back
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
enum SignerEvents {
    #[serde(rename = "response:get-public-key")]
    PublicKey { signer_key: PublicKey },
    #[serde(rename = "response:verify-otp")]
    OtpVerified { accepted: bool },
}

impl EventMap for SignerEvents {
    const EVENTS: &'static [&'static str] = &["response:get-public-key", "response:verify-otp"];

    fn event_name(&self) -> &'static str {
        match self {
            SignerEvents::PublicKey { .. } => "response:get-public-key",
            SignerEvents::OtpVerified { .. } => "response:verify-otp",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OtpPayload {
    otp: String,
}

fn duration_from_env(name: &str, default_ms: u64) -> Duration {
    let ms = env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default_ms);
    Duration::from_millis(ms)
}

/// Wire up the signer side: answer key requests and check OTP envelopes
fn run_signer(
    channel: &Channel<HostEvents, SignerEvents>,
    service: EnvelopeService,
    expected_otp: &'static str,
) -> Result<()> {
    let keys = Arc::new(KeyPair::generate());
    let shared = Arc::new(parking_lot::Mutex::new(None));

    let responder = channel.clone();
    let signer_keys = Arc::clone(&keys);
    let signer_shared = Arc::clone(&shared);
    let signer_service = service.clone();
    channel.on("request:get-public-key", move |event| {
        if let HostEvents::GetPublicKey { host_key } = event {
            match signer_service.derive_shared_secret(&signer_keys, &host_key) {
                Ok(key) => *signer_shared.lock() = Some((key, host_key)),
                Err(e) => tracing::error!("Key agreement failed: {}", e),
            }
            let reply = SignerEvents::PublicKey {
                signer_key: signer_keys.public_key().clone(),
            };
            if let Err(e) = responder.send(reply) {
                tracing::error!("Failed to answer key request: {}", e);
            }
        }
    })?;

    let responder = channel.clone();
    channel.on("request:verify-otp", move |event| {
        let HostEvents::VerifyOtp { envelope } = event else {
            return;
        };
        let guard = shared.lock();
        let Some((key, host_key)) = guard.as_ref() else {
            tracing::warn!("OTP arrived before key exchange");
            return;
        };

        let accepted = service
            .decrypt::<OtpPayload>(&envelope, &keys, Some(host_key))
            .and_then(|payload| service.decrypt_fpe_str(&payload.otp, key))
            .map(|otp| otp == expected_otp)
            .unwrap_or_else(|e| {
                tracing::warn!("Rejected OTP envelope: {}", e);
                false
            });

        if let Err(e) = responder.send(SignerEvents::OtpVerified { accepted }) {
            tracing::error!("Failed to answer OTP request: {}", e);
        }
    })?;

    Ok(())
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let timeout = duration_from_env("HANDSHAKE_TIMEOUT_MS", 10_000);
    let interval = duration_from_env("HANDSHAKE_INTERVAL_MS", 100);
    let otp = "042137";

    let host_origin = Origin::parse(HOST_ORIGIN)?;
    let signer_origin = Origin::parse(SIGNER_ORIGIN)?;
    let (host_window, signer_window) = window_pair(host_origin.clone(), signer_origin.clone());

    let host: Channel<SignerEvents, HostEvents> = Channel::parent(
        ChannelConfig::from_origin(signer_origin)
            .with_handshake_timeout(timeout)
            .with_handshake_interval(interval),
        Box::new(LoggedTransport::new(host_window.transport, "host")),
    )?;
    let signer: Channel<HostEvents, SignerEvents> = Channel::child(
        ChannelConfig::from_origin(host_origin)
            .with_handshake_timeout(timeout)
            .with_handshake_interval(interval),
        Box::new(LoggedTransport::new(signer_window.transport, "signer")),
    )?;

    tokio::spawn(host.clone().listen(host_window.inbox));
    tokio::spawn(signer.clone().listen(signer_window.inbox));

    let service = EnvelopeService::new(CryptoConfig::new().with_tweak("otp"))?;
    run_signer(&signer, service.clone(), otp)?;

    let (host_result, signer_result) = tokio::join!(host.handshake(), signer.handshake());
    host_result?;
    signer_result?;
    println!("Handshake complete: host and signer trust each other");

    let host_keys = service.generate_key_pair();
    let response = host
        .send_action(
            HostEvents::GetPublicKey {
                host_key: host_keys.public_key().clone(),
            },
            "response:get-public-key",
            ActionOptions::signer(),
        )
        .await?;
    let SignerEvents::PublicKey { signer_key } = response else {
        return Err(FrameError::validation("Unexpected response to key request").into());
    };
    println!("Signer public key: {}", signer_key.to_encoded(secure_frame::crypto::Encoding::Base58));

    let shared = service.derive_shared_secret(&host_keys, &signer_key)?;
    let masked = service.encrypt_fpe_str(otp, &shared)?;
    println!("OTP {} travels as {}", otp, masked);

    let envelope = service.encrypt(&OtpPayload { otp: masked }, &signer_key, Some(&host_keys))?;
    let response = host
        .send_action(
            HostEvents::VerifyOtp { envelope },
            "response:verify-otp",
            ActionOptions::signer(),
        )
        .await?;
    println!("Signer verdict: {:?}", response);

    host.close();
    signer.close();
    Ok(())
}
