//! Realtime speech-to-speech protocol definitions.
//!
//! - `catalog`: model, voice and audio format catalogs plus endpoint constants
//! - `messages`: data-channel wire messages (outbound control events and the
//!   untyped inbound envelope)

pub mod catalog;
pub mod messages;

pub use catalog::{
    AudioFormat, CatalogEntry, DATA_CHANNEL_LABEL, DEFAULT_ICE_SERVER, DEFAULT_SIGNALING_URL,
    DEFAULT_TRANSCRIPTION_MODEL, PROTOCOL_VERSION, PROTOCOL_VERSION_HEADER, RealtimeModel,
    RealtimeVoice, select,
};
pub use messages::{
    ApiError, ClientEvent, ContentPart, ConversationItem, InboundMessage,
    InputAudioTranscription, MaxTokens, ResponseConfig, SessionConfig as WireSessionConfig,
    TurnDetection,
};
