//! Replay Tests
//!
//! Recorded wire sessions from `tests/fixtures/*.jsonl` played through a live
//! session, the same way the `replay` command does.

mod fixtures;

use std::time::Duration;

use fixtures::*;
use serde_json::Value;

use waav_voice_session::{ConversationState, SessionSnapshot, TranscriptRole};

/// Play a recording, returning the conversation states it passed through and
/// the final snapshot.
async fn play(name: &str) -> (Vec<ConversationState>, SessionSnapshot) {
    let contents = std::fs::read_to_string(replay_path(name)).unwrap();
    let harness = Harness::connected().await;

    let mut states = vec![harness.snapshot().await.conversation];
    for line in contents.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let value: Value = serde_json::from_str(line).unwrap();
        if let Some(ms) = value.get("sleep_ms").and_then(Value::as_u64) {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            continue;
        }
        let state = harness.inject(value).await.conversation;
        if states.last() != Some(&state) {
            states.push(state);
        }
    }

    tokio::time::sleep(Duration::from_secs(1)).await;
    let snapshot = harness.snapshot().await;
    (states, snapshot)
}

#[tokio::test(start_paused = true)]
async fn test_replay_hello_there() {
    let (states, snapshot) = play("hello_there.jsonl").await;

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

    let transcript: Vec<_> = snapshot
        .transcript
        .iter()
        .map(|i| (i.role, i.text.as_str(), i.is_final))
        .collect();
    assert_eq!(
        transcript,
        vec![
            (TranscriptRole::User, "Hi", true),
            (TranscriptRole::Assistant, "Hello there", true),
        ]
    );
    assert!(snapshot.error.is_none());
    assert!(snapshot.warning.is_none());
}
