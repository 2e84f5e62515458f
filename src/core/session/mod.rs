//! Realtime voice session.
//!
//! # Architecture
//!
//! - `normalizer`: maps wire event names onto a closed set of canonical events
//! - `turn`: conversation turn-state machine and its side effects
//! - `transcript`: assembles streamed deltas into an ordered transcript
//! - `classifier`: decides which failures are noise, warnings or fatal
//! - `timer`: generation-tagged one-shot timers
//! - `resources`: the transport objects one connection attempt owns
//! - `manager`: the [`VoiceSession`] handle and the actor behind it
//!
//! # Example
//!
//! ```rust,ignore
//! use waav_voice_session::config::SessionConfig;
//! use waav_voice_session::core::session::VoiceSession;
//! use waav_voice_session::core::transport::loopback::LoopbackKit;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = SessionConfig::from_env().unwrap();
//!     let session = VoiceSession::new(config, LoopbackKit::new().collaborators());
//!     session.start_conversation().await.unwrap();
//!
//!     let mut updates = session.subscribe();
//!     while updates.changed().await.is_ok() {
//!         println!("{:?}", updates.borrow().conversation);
//!     }
//! }
//! ```

pub mod base;
pub mod classifier;
pub mod manager;
pub mod normalizer;
pub mod resources;
pub mod timer;
pub mod transcript;
pub mod turn;

pub use base::{
    ConnectionError, ConnectionState, ConversationState, ErrorSeverity, SessionError, SessionInfo,
    SessionResult, SessionSnapshot, TranscriptItem, TranscriptRole,
};
pub use classifier::Classification;
pub use manager::VoiceSession;
pub use normalizer::NormalizedEvent;
pub use transcript::{FlushOutcome, TranscriptAssembler};
pub use turn::{Transition, TurnEffect, TurnStateMachine};
