//! Wire event normalization.
//!
//! Maps the literal `type` string of an inbound data-channel message to a closed
//! set of semantic events using a PHF (Perfect Hash Function) static map.
//!
//! The upstream protocol has renamed and duplicated several events across
//! versions (`response.audio_transcript.*` became
//! `response.output_audio_transcript.*`, assistant speech is announced both by
//! `response.created` and `output_audio_buffer.started`, ...). All of those
//! aliases live in [`WIRE_EVENT_MAP`]; supporting a new alias is a table entry
//! and never a state machine change.
//!
//! ```text
//! "response.output_audio_transcript.delta" ─┐
//! "response.audio_transcript.delta" ────────┼─→ PHF Map ─→ NormalizedEvent::AiTranscriptionDelta
//! "response.text.delta" ────────────────────┘
//! ```

use phf::phf_map;
use std::fmt;

/// Semantic events the session pipeline reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormalizedEvent {
    UserSpeakingStarted,
    UserSpeakingStopped,
    AiSpeakingStarted,
    AiSpeakingStopped,
    UserTranscriptionDelta,
    UserTranscriptionCompleted,
    AiTranscriptionDelta,
    AiTranscriptionCompleted,
    Error,
    Unknown,
}

impl NormalizedEvent {
    /// Canonical snake_case name.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UserSpeakingStarted => "user_speaking_started",
            Self::UserSpeakingStopped => "user_speaking_stopped",
            Self::AiSpeakingStarted => "ai_speaking_started",
            Self::AiSpeakingStopped => "ai_speaking_stopped",
            Self::UserTranscriptionDelta => "user_transcription_delta",
            Self::UserTranscriptionCompleted => "user_transcription_completed",
            Self::AiTranscriptionDelta => "ai_transcription_delta",
            Self::AiTranscriptionCompleted => "ai_transcription_completed",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for NormalizedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PHF Static Map for O(1) Wire Type Lookup
// =============================================================================

/// Wire event type → semantic event, including every known alias.
pub static WIRE_EVENT_MAP: phf::Map<&'static str, NormalizedEvent> = phf_map! {
    // User speech (server VAD)
    "input_audio_buffer.speech_started" => NormalizedEvent::UserSpeakingStarted,
    "input_audio_buffer.speech_stopped" => NormalizedEvent::UserSpeakingStopped,

    // Assistant speech
    "response.created" => NormalizedEvent::AiSpeakingStarted,
    "output_audio_buffer.started" => NormalizedEvent::AiSpeakingStarted,
    "output_audio_buffer.speech_started" => NormalizedEvent::AiSpeakingStarted,
    "response.done" => NormalizedEvent::AiSpeakingStopped,
    "output_audio_buffer.stopped" => NormalizedEvent::AiSpeakingStopped,
    "output_audio_buffer.speech_stopped" => NormalizedEvent::AiSpeakingStopped,
    "output_audio_buffer.cleared" => NormalizedEvent::AiSpeakingStopped,

    // User transcription
    "conversation.item.input_audio_transcription.delta" => NormalizedEvent::UserTranscriptionDelta,
    "conversation.item.input_audio_transcription.completed" => NormalizedEvent::UserTranscriptionCompleted,

    // Assistant transcription (audio transcript and text-only variants)
    "response.audio_transcript.delta" => NormalizedEvent::AiTranscriptionDelta,
    "response.output_audio_transcript.delta" => NormalizedEvent::AiTranscriptionDelta,
    "response.text.delta" => NormalizedEvent::AiTranscriptionDelta,
    "response.output_text.delta" => NormalizedEvent::AiTranscriptionDelta,
    "response.audio_transcript.done" => NormalizedEvent::AiTranscriptionCompleted,
    "response.output_audio_transcript.done" => NormalizedEvent::AiTranscriptionCompleted,
    "response.text.done" => NormalizedEvent::AiTranscriptionCompleted,
    "response.output_text.done" => NormalizedEvent::AiTranscriptionCompleted,

    // Failures
    "error" => NormalizedEvent::Error,
    "conversation.item.input_audio_transcription.failed" => NormalizedEvent::Error,
};

/// Classify a wire event type (O(1) PHF lookup, case-sensitive).
#[inline]
pub fn normalize(event_type: &str) -> NormalizedEvent {
    WIRE_EVENT_MAP
        .get(event_type)
        .copied()
        .unwrap_or(NormalizedEvent::Unknown)
}

/// Keywords that make an unmapped event worth a closer look: they usually
/// mean the upstream protocol grew an alias this table does not know yet.
const COVERAGE_KEYWORDS: [&str; 3] = ["transcription", "audio", "response"];

/// Whether an unmapped event type hints at a protocol coverage gap.
pub fn is_coverage_gap(event_type: &str) -> bool {
    COVERAGE_KEYWORDS.iter().any(|k| event_type.contains(k))
}
