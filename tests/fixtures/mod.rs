//! Test Fixtures Module
//!
//! Shared helpers for the session integration tests:
//! - Session fixtures on the loopback transport
//! - Wire event builders
//! - Recorded replay files (`*.jsonl`)

// Allow dead code in test fixtures - not every test binary uses every helper
#![allow(dead_code)]

pub mod events;

pub use events::*;

use std::path::PathBuf;

use waav_voice_session::core::transport::loopback::{LoopbackHandle, LoopbackKit};
use waav_voice_session::{SessionConfig, SessionSnapshot, VoiceSession};

/// Configuration with a test key and default timings.
pub fn test_config() -> SessionConfig {
    SessionConfig::default().with_api_key("sk-test-key")
}

/// A session wired to fresh loopback collaborators.
pub struct Harness {
    pub session: VoiceSession,
    pub kit: LoopbackKit,
    pub handle: LoopbackHandle,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(test_config(), LoopbackKit::new())
    }

    pub fn with(config: SessionConfig, kit: LoopbackKit) -> Self {
        let handle = kit.handle();
        let session = VoiceSession::new(config, kit.collaborators());
        Self {
            session,
            kit,
            handle,
        }
    }

    /// Started and connected, with the initial session.update already sent.
    pub async fn connected() -> Self {
        let harness = Self::new();
        harness.session.start().await.expect("start");
        // Drain the connection events so session.update is already out
        harness.snapshot().await;
        harness.handle.clear_sent();
        harness
    }

    /// Deliver an inbound event and wait until the session processed it.
    pub async fn inject(&self, event: serde_json::Value) -> SessionSnapshot {
        assert!(self.handle.inject_json(event), "no live loopback peer");
        self.session.snapshot().await.expect("snapshot")
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot().await.expect("snapshot")
    }
}

/// Path of a recorded replay under `tests/fixtures`.
pub fn replay_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}
