//! Base types shared by the voice session pipeline.
//!
//! This module defines the error taxonomy, the observable state enums and the
//! transcript data model. Everything here is plain data; behavior lives in the
//! normalizer, turn machine, transcript assembler, classifier and manager.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use time::OffsetDateTime;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while running a voice session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Microphone permission was denied
    #[error("Microphone permission denied")]
    PermissionDenied,

    /// Local audio capture could not be acquired
    #[error("Media acquisition failed: {0}")]
    MediaAcquisition(String),

    /// Signaling exchange failed
    #[error("Signaling failed: {0}")]
    Signaling(String),

    /// Peer transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Sending over the data channel failed
    #[error("Channel send failed: {0}")]
    ChannelSend(String),

    /// Data channel absent or not open
    #[error("Not connected")]
    NotConnected,

    /// Protocol-level error reported by the remote service
    #[error("Protocol error: {message}")]
    Protocol {
        /// Error message from the service
        message: String,
        /// Whether the error ended the session
        fatal: bool,
    },

    /// Credentials missing or rejected
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The operation was cancelled by `stop()`
    #[error("Cancelled")]
    Cancelled,

    /// The session task is gone
    #[error("Session closed")]
    SessionClosed,
}

impl SessionError {
    /// Whether the caller may retry the operation on the same session.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SessionError::PermissionDenied
            | SessionError::AuthenticationFailed(_)
            | SessionError::InvalidConfiguration(_)
            | SessionError::SessionClosed => false,
            SessionError::Protocol { fatal, .. } => !fatal,
            _ => true,
        }
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

// =============================================================================
// Observable State
// =============================================================================

/// Connection state of the peer transport.
///
/// Only transport signals move this; callers cannot set it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No transport
    #[default]
    Idle,
    /// `start()` in progress
    Connecting,
    /// Remote description applied
    Connected,
    /// Last attempt or live transport failed
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "idle"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Failed => write!(f, "failed"),
        }
    }
}

/// Turn-taking state of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// Nobody holds the floor
    #[default]
    Idle,
    /// The user is speaking
    UserSpeaking,
    /// The assistant is speaking
    AiSpeaking,
    /// The user stopped, a reply is being composed
    Processing,
}

impl ConversationState {
    /// Stub amplitude level for UI meters. There is no signal analysis behind it.
    pub fn amplitude_hint(&self) -> f32 {
        match self {
            ConversationState::Idle => 0.0,
            ConversationState::Processing => 0.1,
            ConversationState::UserSpeaking => 0.6,
            ConversationState::AiSpeaking => 0.8,
        }
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationState::Idle => write!(f, "idle"),
            ConversationState::UserSpeaking => write!(f, "user_speaking"),
            ConversationState::AiSpeaking => write!(f, "ai_speaking"),
            ConversationState::Processing => write!(f, "processing"),
        }
    }
}

// =============================================================================
// Transcript
// =============================================================================

/// Role of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptRole {
    /// User speech or typed input
    User,
    /// Assistant speech
    Assistant,
    /// Local system notes
    System,
    /// Tool output
    Tool,
}

impl fmt::Display for TranscriptRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptRole::User => write!(f, "user"),
            TranscriptRole::Assistant => write!(f, "assistant"),
            TranscriptRole::System => write!(f, "system"),
            TranscriptRole::Tool => write!(f, "tool"),
        }
    }
}

/// One entry of the transcript log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptItem {
    /// Monotonic creation-ordered id
    pub id: u64,
    /// Speaker role
    pub role: TranscriptRole,
    /// Accumulated text
    pub text: String,
    /// Final items are immutable
    pub is_final: bool,
    /// Creation time
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

// =============================================================================
// Surfaced Errors
// =============================================================================

/// Severity of a surfaced failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
            ErrorSeverity::Fatal => write!(f, "fatal"),
        }
    }
}

/// A classified failure as shown to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionError {
    pub message: String,
    pub severity: ErrorSeverity,
    pub recoverable: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl ConnectionError {
    /// Create a new error stamped with the current time.
    pub fn new(message: impl Into<String>, severity: ErrorSeverity, recoverable: bool) -> Self {
        Self {
            message: message.into(),
            severity,
            recoverable,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Recoverable warning.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, ErrorSeverity::Warning, true)
    }
}

// =============================================================================
// Session Identity & Snapshot
// =============================================================================

/// Identity of one connection attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    /// Opaque token, regenerated on every `start()`
    pub id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl SessionInfo {
    pub fn generate() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Everything an observer can see about the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session: Option<SessionInfo>,
    pub connection: ConnectionState,
    pub conversation: ConversationState,
    pub conversation_active: bool,
    pub response_in_progress: bool,
    pub remote_audio: bool,
    /// Most recent error or fatal failure
    pub error: Option<ConnectionError>,
    /// Most recent warning, cleared automatically
    pub warning: Option<ConnectionError>,
    pub transcript: Vec<TranscriptItem>,
}

impl SessionSnapshot {
    /// Stub amplitude for the current conversation state.
    pub fn amplitude(&self) -> f32 {
        self.conversation.amplitude_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(ConversationState::UserSpeaking.to_string(), "user_speaking");
        assert_eq!(ConversationState::AiSpeaking.to_string(), "ai_speaking");
        assert_eq!(TranscriptRole::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_error_recoverability() {
        assert!(!SessionError::PermissionDenied.is_recoverable());
        assert!(SessionError::ChannelSend("closed".to_string()).is_recoverable());
        assert!(SessionError::NotConnected.is_recoverable());
        assert!(
            !SessionError::Protocol {
                message: "quota".to_string(),
                fatal: true
            }
            .is_recoverable()
        );
    }

    #[test]
    fn test_session_info_regenerates() {
        let a = SessionInfo::generate();
        let b = SessionInfo::generate();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_amplitude_hint() {
        assert_eq!(ConversationState::Idle.amplitude_hint(), 0.0);
        assert!(ConversationState::AiSpeaking.amplitude_hint() > 0.0);
    }
}
