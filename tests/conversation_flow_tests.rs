//! Conversation Flow Tests
//!
//! Turn-taking, transcript assembly and the conversation controls, driven by
//! wire events injected through the loopback transport. Time is paused so
//! debounce, gate-retry and fallback timers fire deterministically.

mod fixtures;

use std::time::Duration;

use fixtures::*;
use serde_json::Value;
use tokio::time::sleep;

use waav_voice_session::core::transport::loopback::{LoopbackKit, LoopbackTransport};
use waav_voice_session::{
    ConnectionState, ConversationState, SessionError, TranscriptItem, TranscriptRole,
};

/// Comfortably past the default transcript debounce.
const AFTER_DEBOUNCE: Duration = Duration::from_millis(150);

fn texts(items: &[TranscriptItem], role: TranscriptRole) -> Vec<String> {
    items
        .iter()
        .filter(|i| i.role == role)
        .map(|i| i.text.clone())
        .collect()
}

// =============================================================================
// Turn-taking
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_hello_there_exchange() {
    let harness = Harness::connected().await;
    let script = [
        speech_started(),
        speech_stopped(),
        response_created("resp_1"),
        assistant_delta("Hel"),
        assistant_delta("lo "),
        assistant_delta("there"),
        assistant_done("Hello there"),
        response_done("resp_1"),
    ];

    let mut states = vec![harness.snapshot().await.conversation];
    for event in script {
        let state = harness.inject(event).await.conversation;
        if states.last() != Some(&state) {
            states.push(state);
        }
    }

    assert_eq!(
        states,
        vec![
            ConversationState::Idle,
            ConversationState::UserSpeaking,
            ConversationState::Processing,
            ConversationState::AiSpeaking,
            ConversationState::Idle,
        ]
    );

    let snapshot = harness.snapshot().await;
    assert!(!snapshot.response_in_progress);
    let assistant: Vec<_> = snapshot
        .transcript
        .iter()
        .filter(|i| i.role == TranscriptRole::Assistant)
        .collect();
    assert_eq!(assistant.len(), 1);
    assert_eq!(assistant[0].text, "Hello there");
    assert!(assistant[0].is_final);
}

#[tokio::test(start_paused = true)]
async fn test_barge_in_cancels_response() {
    let harness = Harness::connected().await;
    harness.inject(response_created("resp_1")).await;

    let snapshot = harness.inject(speech_started()).await;

    assert_eq!(snapshot.conversation, ConversationState::UserSpeaking);
    assert!(snapshot.amplitude() > 0.0);
    assert!(!snapshot.response_in_progress);
    assert_eq!(harness.handle.sent_types(), vec!["response.cancel"]);
}

#[tokio::test(start_paused = true)]
async fn test_fallback_returns_to_idle() {
    let harness = Harness::connected().await;
    let snapshot = harness.inject(response_created("resp_1")).await;
    assert_eq!(snapshot.conversation, ConversationState::AiSpeaking);

    sleep(Duration::from_secs(31)).await;

    let snapshot = harness.snapshot().await;
    assert_eq!(snapshot.conversation, ConversationState::Idle);
    assert!(!snapshot.response_in_progress);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_start_does_not_extend_fallback() {
    let harness = Harness::connected().await;
    harness.inject(response_created("resp_1")).await;

    sleep(Duration::from_secs(20)).await;
    let snapshot = harness.inject(audio_started("resp_1")).await;
    assert_eq!(snapshot.conversation, ConversationState::AiSpeaking);
    assert!(snapshot.response_in_progress);

    // Fallback still counts from the first start
    sleep(Duration::from_secs(11)).await;
    let snapshot = harness.snapshot().await;
    assert_eq!(snapshot.conversation, ConversationState::Idle);
    assert!(!snapshot.response_in_progress);
}

#[tokio::test(start_paused = true)]
async fn test_response_done_disarms_fallback() {
    let harness = Harness::connected().await;
    harness.inject(response_created("resp_1")).await;
    harness.inject(response_done("resp_1")).await;
    harness.inject(speech_started()).await;
    harness.inject(speech_stopped()).await;

    sleep(Duration::from_secs(31)).await;
    assert_eq!(
        harness.snapshot().await.conversation,
        ConversationState::Processing
    );
}

#[tokio::test(start_paused = true)]
async fn test_unknown_events_do_not_move_state() {
    let harness = Harness::connected().await;
    harness.inject(speech_started()).await;

    for event_type in ["rate_limits.updated", "session.updated", "something.new"] {
        let snapshot = harness
            .inject(serde_json::json!({"type": event_type}))
            .await;
        assert_eq!(snapshot.conversation, ConversationState::UserSpeaking);
    }
    assert!(harness.handle.inject("{not json"));
    assert_eq!(
        harness.snapshot().await.conversation,
        ConversationState::UserSpeaking
    );
}

// =============================================================================
// Transcript
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_user_deltas_merge_across_flushes() {
    let harness = Harness::connected().await;

    harness.inject(user_delta("Can")).await;
    sleep(AFTER_DEBOUNCE).await;
    harness.inject(user_delta(" you")).await;
    sleep(AFTER_DEBOUNCE).await;
    harness.inject(user_delta(" help?")).await;
    sleep(AFTER_DEBOUNCE).await;

    let transcript = harness.snapshot().await.transcript;
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].text, "Can you help?");
    assert!(!transcript[0].is_final);

    let transcript = harness.inject(user_done("Can you help?")).await.transcript;
    assert_eq!(transcript.len(), 1);
    assert!(transcript[0].is_final);
}

#[tokio::test(start_paused = true)]
async fn test_chunking_does_not_change_transcript() {
    let chunkings: [&[&str]; 3] = [
        &["Sure, I can help."],
        &["Sure", ", I can", " help."],
        &["S", "u", "re, I ", "can help", "."],
    ];

    let mut results = Vec::new();
    for chunks in chunkings {
        let harness = Harness::connected().await;
        harness.inject(user_done("Can you help?")).await;
        for chunk in chunks {
            harness.inject(assistant_delta(chunk)).await;
        }
        sleep(AFTER_DEBOUNCE).await;
        let partial = harness.snapshot().await.transcript;
        assert_eq!(
            texts(&partial, TranscriptRole::Assistant),
            vec!["Sure, I can help.".to_string()]
        );
        results.push(harness.inject(assistant_done("Sure, I can help.")).await.transcript);
    }

    for transcript in &results {
        assert!(transcript.iter().all(|i| i.is_final));
        assert_eq!(
            texts(transcript, TranscriptRole::Assistant),
            vec!["Sure, I can help.".to_string()]
        );
        assert_eq!(
            texts(transcript, TranscriptRole::User),
            vec!["Can you help?".to_string()]
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_assistant_text_waits_for_user_transcript() {
    let harness = Harness::connected().await;
    harness.inject(speech_started()).await;
    harness.inject(speech_stopped()).await;
    harness.inject(response_created("resp_1")).await;
    harness.inject(assistant_delta("Sure")).await;

    // Debounce fired but the user's words are still missing
    sleep(AFTER_DEBOUNCE).await;
    assert!(harness.snapshot().await.transcript.is_empty());

    harness.inject(user_done("Can you help?")).await;
    sleep(Duration::from_millis(300)).await;

    let transcript = harness.snapshot().await.transcript;
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].role, TranscriptRole::User);
    assert_eq!(transcript[0].text, "Can you help?");
    assert_eq!(transcript[1].role, TranscriptRole::Assistant);
    assert_eq!(transcript[1].text, "Sure");
    assert!(transcript[0].id < transcript[1].id);
}

#[tokio::test(start_paused = true)]
async fn test_user_completion_without_text_uses_deltas() {
    let harness = Harness::connected().await;
    harness.inject(user_delta("Hi")).await;
    harness.inject(user_delta(" there")).await;

    let transcript = harness
        .inject(serde_json::json!({
            "type": "conversation.item.input_audio_transcription.completed",
            "item_id": "item_1"
        }))
        .await
        .transcript;

    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].text, "Hi there");
    assert!(transcript[0].is_final);
}

#[tokio::test(start_paused = true)]
async fn test_clear_transcript() {
    let harness = Harness::connected().await;
    harness.inject(user_done("Hello")).await;
    harness.inject(assistant_delta("Hi")).await;

    harness.session.clear_transcript().await;
    sleep(AFTER_DEBOUNCE).await;

    assert!(harness.snapshot().await.transcript.is_empty());
}

// =============================================================================
// Conversation controls
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_start_conversation_connects_and_unmutes() {
    let harness = Harness::new();

    harness.session.start_conversation().await.unwrap();

    let snapshot = harness.snapshot().await;
    assert_eq!(snapshot.connection, ConnectionState::Connected);
    assert!(snapshot.conversation_active);
    assert_eq!(harness.kit.media.last_track_enabled(), Some(true));
    // Exactly one session.update, sent when the channel opened
    assert_eq!(harness.handle.sent_types(), vec!["session.update"]);
}

#[tokio::test(start_paused = true)]
async fn test_start_conversation_when_connected_resends_config() {
    let harness = Harness::connected().await;
    harness.session.stop_conversation().await;
    harness.handle.clear_sent();

    harness.session.start_conversation().await.unwrap();

    assert_eq!(harness.handle.sent_types(), vec!["session.update"]);
    assert_eq!(harness.kit.media.last_track_enabled(), Some(true));
    assert!(harness.snapshot().await.conversation_active);
}

#[tokio::test(start_paused = true)]
async fn test_stop_conversation_mutes_and_cancels() {
    let harness = Harness::connected().await;
    harness.inject(response_created("resp_1")).await;
    harness.inject(user_delta("half a sen")).await;

    harness.session.stop_conversation().await;

    let snapshot = harness.snapshot().await;
    assert!(!snapshot.conversation_active);
    assert_eq!(snapshot.conversation, ConversationState::Idle);
    assert!(!snapshot.response_in_progress);
    assert_eq!(snapshot.connection, ConnectionState::Connected);
    assert_eq!(harness.kit.media.last_track_enabled(), Some(false));
    assert_eq!(harness.handle.sent_types(), vec!["response.cancel"]);
    // Pending user text is flushed, not lost
    assert_eq!(
        texts(&snapshot.transcript, TranscriptRole::User),
        vec!["half a sen".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_send_user_input() {
    let harness = Harness::connected().await;

    harness.session.send_user_input("  What time is it?  ").await.unwrap();

    let sent: Vec<Value> = harness
        .handle
        .sent()
        .iter()
        .map(|s| serde_json::from_str(s).unwrap())
        .collect();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0]["type"], "conversation.item.create");
    assert_eq!(sent[0]["item"]["role"], "user");
    assert_eq!(sent[0]["item"]["content"][0]["type"], "input_text");
    assert_eq!(sent[0]["item"]["content"][0]["text"], "What time is it?");
    assert_eq!(sent[1]["type"], "response.create");

    let transcript = harness.snapshot().await.transcript;
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].role, TranscriptRole::User);
    assert_eq!(transcript[0].text, "What time is it?");
    assert!(transcript[0].is_final);
}

#[tokio::test(start_paused = true)]
async fn test_send_user_input_interrupts_response() {
    let harness = Harness::connected().await;
    harness.inject(response_created("resp_1")).await;

    harness.session.send_user_input("stop").await.unwrap();

    assert_eq!(
        harness.handle.sent_types(),
        vec!["response.cancel", "conversation.item.create", "response.create"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_send_user_input_ignored_when_inactive() {
    let harness = Harness::connected().await;
    harness.session.stop_conversation().await;
    harness.handle.clear_sent();

    harness.session.send_user_input("hello").await.unwrap();
    harness.session.send_user_input("   ").await.unwrap();

    assert!(harness.handle.sent().is_empty());
    assert!(harness.snapshot().await.transcript.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_send_message_requires_open_channel() {
    let harness = Harness::with(
        test_config(),
        LoopbackKit::with_transport(LoopbackTransport::manual_open()),
    );

    let err = harness
        .session
        .send_message(waav_voice_session::ClientEvent::ResponseCancel)
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::NotConnected);
}
