//! Builders for inbound realtime wire events.

use serde_json::{Value, json};

pub fn speech_started() -> Value {
    json!({"type": "input_audio_buffer.speech_started", "audio_start_ms": 120})
}

pub fn speech_stopped() -> Value {
    json!({"type": "input_audio_buffer.speech_stopped", "audio_end_ms": 980})
}

pub fn response_created(response_id: &str) -> Value {
    json!({"type": "response.created", "response": {"id": response_id, "status": "in_progress"}})
}

pub fn audio_started(response_id: &str) -> Value {
    json!({"type": "output_audio_buffer.started", "response_id": response_id})
}

pub fn response_done(response_id: &str) -> Value {
    json!({"type": "response.done", "response": {"id": response_id, "status": "completed"}})
}

pub fn assistant_delta(delta: &str) -> Value {
    json!({"type": "response.audio_transcript.delta", "response_id": "resp_1", "delta": delta})
}

pub fn assistant_done(transcript: &str) -> Value {
    json!({"type": "response.audio_transcript.done", "response_id": "resp_1", "transcript": transcript})
}

pub fn user_delta(delta: &str) -> Value {
    json!({"type": "conversation.item.input_audio_transcription.delta", "item_id": "item_1", "delta": delta})
}

pub fn user_done(transcript: &str) -> Value {
    json!({"type": "conversation.item.input_audio_transcription.completed", "item_id": "item_1", "transcript": transcript})
}

/// Protocol error carrying an `error` object.
pub fn api_error(message: &str) -> Value {
    json!({"type": "error", "error": {"type": "invalid_request_error", "message": message}})
}
