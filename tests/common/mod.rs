//! Common test utilities for cwt integration tests

use std::sync::Once;

use ciborium::Value;
pub use cwt::prelude::*;
use p256::ecdh::EphemeralSecret;
use rand::rngs::OsRng;

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness. Filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// `{1: "https://as.example", 2: "someone", 7: h'313233'}`
pub fn sample_claims() -> Claims {
    Claims::new()
        .with(claims::label::ISS, "https://as.example")
        .with(claims::label::SUB, "someone")
        .with(claims::label::CTI, Value::Bytes(b"123".to_vec()))
}

/// Run an ECDH exchange on P-256 and return both sides' shared secrets
pub fn ecdh_shared_secrets() -> (Vec<u8>, Vec<u8>) {
    let sender = EphemeralSecret::random(&mut OsRng);
    let receiver = EphemeralSecret::random(&mut OsRng);
    let sender_public = sender.public_key();
    let receiver_public = receiver.public_key();

    let at_sender = sender.diffie_hellman(&receiver_public);
    let at_receiver = receiver.diffie_hellman(&sender_public);
    (
        at_sender.raw_secret_bytes().to_vec(),
        at_receiver.raw_secret_bytes().to_vec(),
    )
}
