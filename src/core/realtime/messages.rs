//! Realtime data-channel message types.
//!
//! Every message on the data channel is a single newline-free JSON object with
//! a `type` field.
//!
//! # Protocol Overview
//!
//! Client events (sent to server):
//! - session.update - Update session configuration
//! - conversation.item.create - Add item to conversation
//! - response.create - Generate a response
//! - response.cancel - Cancel current response
//! - input_audio_buffer.clear - Clear audio buffer
//!
//! Server events are not modelled as a closed enum here. The upstream protocol
//! renames and duplicates event types across versions, so inbound messages are
//! kept as [`InboundMessage`] (type string plus raw payload) and classified by
//! the session normalizer.

use serde::{Deserialize, Serialize};

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration sent with `session.update`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Response modalities (text, audio)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,

    /// System instructions for the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Voice for audio output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// Input audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<String>,

    /// Output audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<String>,

    /// Input audio transcription configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<InputAudioTranscription>,

    /// Turn detection configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,

    /// Temperature for response generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum response output tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_response_output_tokens: Option<MaxTokens>,
}

/// Maximum tokens configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaxTokens {
    /// Specific number of tokens
    Number(i32),
    /// Infinite tokens
    Infinite(String), // "inf"
}

impl MaxTokens {
    /// Negative limits mean "no limit".
    pub fn from_limit(limit: i32) -> Self {
        if limit < 0 {
            MaxTokens::Infinite("inf".to_string())
        } else {
            MaxTokens::Number(limit)
        }
    }
}

/// Input audio transcription configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputAudioTranscription {
    /// Transcription model (e.g., "whisper-1")
    pub model: String,
}

/// Turn detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold
        #[serde(skip_serializing_if = "Option::is_none")]
        threshold: Option<f32>,
        /// Audio prefix padding in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        prefix_padding_ms: Option<u32>,
        /// Silence duration in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        silence_duration_ms: Option<u32>,
    },
    /// No turn detection
    #[serde(rename = "none")]
    None {},
}

// =============================================================================
// Conversation Items
// =============================================================================

/// Conversation item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationItem {
    /// Item type
    #[serde(rename = "type")]
    pub item_type: String,
    /// Item role (user, assistant, system)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content parts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentPart>>,
}

/// Content part within a conversation item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    /// Content type (input_text, text)
    #[serde(rename = "type")]
    pub content_type: String,
    /// Text content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Response configuration for `response.create`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseConfig {
    /// Response modalities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,
    /// Per-response instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

// =============================================================================
// Client Events (sent to server)
// =============================================================================

/// Control messages sent over the data channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Create a conversation item
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        /// Item to create
        item: ConversationItem,
    },

    /// Create a response
    #[serde(rename = "response.create")]
    ResponseCreate {
        /// Response configuration
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<ResponseConfig>,
    },

    /// Cancel the current response
    #[serde(rename = "response.cancel")]
    ResponseCancel,

    /// Clear the input audio buffer
    #[serde(rename = "input_audio_buffer.clear")]
    InputAudioBufferClear,
}

impl ClientEvent {
    /// A user message carrying typed text.
    pub fn user_text(text: &str) -> Self {
        ClientEvent::ConversationItemCreate {
            item: ConversationItem {
                item_type: "message".to_string(),
                role: Some("user".to_string()),
                content: Some(vec![ContentPart {
                    content_type: "input_text".to_string(),
                    text: Some(text.to_string()),
                }]),
            },
        }
    }

    /// Wire type of this event.
    pub fn type_name(&self) -> &'static str {
        match self {
            ClientEvent::SessionUpdate { .. } => "session.update",
            ClientEvent::ConversationItemCreate { .. } => "conversation.item.create",
            ClientEvent::ResponseCreate { .. } => "response.create",
            ClientEvent::ResponseCancel => "response.cancel",
            ClientEvent::InputAudioBufferClear => "input_audio_buffer.clear",
        }
    }

    /// Encode as a single-line JSON message.
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// =============================================================================
// Server Messages (received from server)
// =============================================================================

/// API error information.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    /// Error code
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub code: Option<String>,
    /// Error message
    #[serde(default)]
    pub message: String,
}

/// An inbound data-channel message: the literal type plus its raw payload.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub event_type: String,
    pub payload: serde_json::Value,
}

impl InboundMessage {
    /// Parse one JSON message.
    ///
    /// A message without a string `type` field is reported with an empty type
    /// so it still reaches the normalizer and gets logged as unknown.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let payload: serde_json::Value = serde_json::from_str(text)?;
        let event_type = payload
            .get("type")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self {
            event_type,
            payload,
        })
    }

    fn str_field(&self, field: &str) -> Option<&str> {
        self.payload.get(field).and_then(|v| v.as_str())
    }

    /// Incremental text under `delta`.
    pub fn delta(&self) -> Option<&str> {
        self.str_field("delta")
    }

    /// Authoritative final text under `transcript`, or `text` for text-only responses.
    pub fn final_text(&self) -> Option<&str> {
        self.str_field("transcript").or_else(|| self.str_field("text"))
    }

    /// Response id, either top-level or inside a `response` object.
    pub fn response_id(&self) -> Option<&str> {
        self.str_field("response_id").or_else(|| {
            self.payload
                .get("response")
                .and_then(|r| r.get("id"))
                .and_then(|v| v.as_str())
        })
    }

    /// Whether the payload carries an `error` object.
    pub fn has_error_object(&self) -> bool {
        self.payload.get("error").is_some_and(|e| e.is_object())
    }

    /// Whether the event type belongs to the response lifecycle.
    pub fn is_response_scoped(&self) -> bool {
        self.event_type.starts_with("response.")
    }

    /// Structured error payload, if present.
    pub fn api_error(&self) -> Option<ApiError> {
        self.payload
            .get("error")
            .filter(|e| e.is_object())
            .and_then(|e| serde_json::from_value(e.clone()).ok())
    }

    /// Best-effort human readable error message.
    pub fn error_message(&self) -> String {
        if let Some(err) = self.api_error()
            && !err.message.is_empty()
        {
            return err.message;
        }
        self.payload
            .get("error")
            .and_then(|e| e.as_str())
            .or_else(|| self.str_field("message"))
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} event without message", self.event_type))
    }
}

// =============================================================================
// Tests
// =============================================================================
