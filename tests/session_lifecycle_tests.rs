//! Session Lifecycle Tests
//!
//! Connection setup, teardown, cancellation and transport health of a
//! `VoiceSession` running on the loopback collaborators.

mod fixtures;

use std::time::Duration;

use fixtures::*;
use serde_json::Value;

use waav_voice_session::core::transport::loopback::{
    LoopbackKit, LoopbackSignaling, LoopbackTransport,
};
use waav_voice_session::core::transport::{PeerState, TransportEvent};
use waav_voice_session::{
    ConnectionState, ConversationState, ErrorSeverity, SessionConfig, SessionError,
};

// =============================================================================
// Start
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_start_sends_configured_session_update() {
    let mut config = test_config();
    config.instructions = Some("Be brief.".to_string());
    let harness = Harness::with(config, LoopbackKit::new());

    harness.session.start().await.unwrap();
    let snapshot = harness.snapshot().await;

    assert_eq!(snapshot.connection, ConnectionState::Connected);
    assert!(snapshot.conversation_active);
    assert!(snapshot.remote_audio);
    assert_eq!(harness.kit.signaling.exchanges(), 1);

    let sent = harness.handle.sent();
    assert_eq!(sent.len(), 1);
    let update: Value = serde_json::from_str(&sent[0]).unwrap();
    assert_eq!(update["type"], "session.update");
    assert_eq!(update["session"]["instructions"], "Be brief.");
    assert_eq!(update["session"]["voice"], "alloy");
    assert_eq!(update["session"]["turn_detection"]["type"], "server_vad");
    assert_eq!(
        update["session"]["input_audio_transcription"]["model"],
        "whisper-1"
    );
}

#[tokio::test(start_paused = true)]
async fn test_session_update_waits_for_channel_open() {
    let harness = Harness::with(
        test_config(),
        LoopbackKit::with_transport(LoopbackTransport::manual_open()),
    );
    harness.session.start().await.unwrap();
    harness.snapshot().await;
    assert!(harness.handle.sent().is_empty());

    assert!(harness.handle.open_channel());
    harness.snapshot().await;
    assert_eq!(harness.handle.sent_types(), vec!["session.update"]);
}

#[tokio::test(start_paused = true)]
async fn test_start_when_connected_is_noop() {
    let harness = Harness::connected().await;
    let before = harness.snapshot().await;

    harness.session.start().await.unwrap();

    let after = harness.snapshot().await;
    assert_eq!(harness.handle.peers_created(), 1);
    assert_eq!(before.session, after.session);
}

#[tokio::test(start_paused = true)]
async fn test_each_start_gets_a_new_session_id() {
    let harness = Harness::connected().await;
    let first = harness.snapshot().await.session.unwrap();

    harness.session.stop().await;
    harness.session.start().await.unwrap();

    let second = harness.snapshot().await.session.unwrap();
    assert_ne!(first.id, second.id);
}

// =============================================================================
// Start failures
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_permission_denied() {
    let kit = LoopbackKit::new();
    kit.permission.set_granted(false);
    let harness = Harness::with(test_config(), kit);

    let err = harness.session.start().await.unwrap_err();
    assert_eq!(err, SessionError::PermissionDenied);

    let snapshot = harness.snapshot().await;
    assert_eq!(snapshot.connection, ConnectionState::Failed);
    assert!(!snapshot.conversation_active);
    assert_eq!(snapshot.error.unwrap().severity, ErrorSeverity::Fatal);
    assert_eq!(harness.kit.media.acquired(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_media_failure_releases_nothing_live() {
    let kit = LoopbackKit::new();
    kit.media.fail_with("no input device");
    let harness = Harness::with(test_config(), kit);

    let err = harness.session.start().await.unwrap_err();
    assert!(matches!(err, SessionError::MediaAcquisition(_)));
    assert_eq!(harness.handle.peers_created(), 0);

    let snapshot = harness.snapshot().await;
    assert_eq!(snapshot.connection, ConnectionState::Failed);
    assert!(snapshot.error.unwrap().recoverable);
}

#[tokio::test(start_paused = true)]
async fn test_signaling_failure_releases_resources() {
    let kit = LoopbackKit::new();
    kit.signaling
        .fail_with(Some(SessionError::Signaling("503 Service Unavailable".to_string())));
    let harness = Harness::with(test_config(), kit);

    let err = harness.session.start().await.unwrap_err();
    assert!(matches!(err, SessionError::Signaling(_)));

    let snapshot = harness.snapshot().await;
    assert_eq!(snapshot.connection, ConnectionState::Failed);
    assert!(snapshot.error.as_ref().unwrap().recoverable);
    assert_eq!(harness.kit.media.live_tracks(), 0);
    assert_eq!(harness.handle.open_peers(), 0);

    // A later successful start clears the error
    harness.kit.signaling.fail_with(None);
    harness.session.start().await.unwrap();
    let snapshot = harness.snapshot().await;
    assert_eq!(snapshot.connection, ConnectionState::Connected);
    assert!(snapshot.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_auth_rejection_is_fatal() {
    let kit = LoopbackKit::new();
    kit.signaling.fail_with(Some(SessionError::AuthenticationFailed(
        "401 Unauthorized: invalid api key".to_string(),
    )));
    let harness = Harness::with(test_config(), kit);

    harness.session.start().await.unwrap_err();
    let error = harness.snapshot().await.error.unwrap();
    assert_eq!(error.severity, ErrorSeverity::Fatal);
    assert!(!error.recoverable);
}

#[tokio::test(start_paused = true)]
async fn test_blank_api_key_rejected_before_media() {
    let harness = Harness::with(
        SessionConfig::default().with_api_key("   "),
        LoopbackKit::new(),
    );

    let err = harness.session.start().await.unwrap_err();
    assert!(matches!(err, SessionError::AuthenticationFailed(_)));
    assert_eq!(harness.kit.media.acquired(), 0);
}

// =============================================================================
// Stop
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_stop_releases_everything() {
    let harness = Harness::connected().await;
    harness.inject(speech_started()).await;

    harness.session.stop().await;

    let snapshot = harness.snapshot().await;
    assert_eq!(snapshot.connection, ConnectionState::Idle);
    assert_eq!(snapshot.conversation, ConversationState::Idle);
    assert!(!snapshot.conversation_active);
    assert!(!snapshot.remote_audio);
    assert!(snapshot.session.is_none());
    assert_eq!(harness.kit.media.live_tracks(), 0);
    assert_eq!(harness.handle.open_peers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent() {
    let harness = Harness::new();
    harness.session.stop().await;
    harness.session.stop().await;
    assert_eq!(harness.snapshot().await.connection, ConnectionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_stop_right_after_start() {
    let kit = LoopbackKit::new()
        .with_signaling(LoopbackSignaling::with_delay(Duration::from_millis(500)));
    let harness = Harness::with(test_config(), kit);

    let (started, ()) = tokio::join!(harness.session.start(), async {
        tokio::task::yield_now().await;
        harness.session.stop().await;
    });

    // Whether stop landed mid-connect or after it, nothing may survive
    if let Err(err) = started {
        assert_eq!(err, SessionError::Cancelled);
    }
    let snapshot = harness.snapshot().await;
    assert_eq!(snapshot.connection, ConnectionState::Idle);
    assert!(!snapshot.conversation_active);
    assert!(snapshot.error.is_none());
    assert_eq!(harness.kit.media.live_tracks(), 0);
    assert_eq!(harness.handle.open_peers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_toggle() {
    let harness = Harness::new();

    harness.session.toggle().await.unwrap();
    assert_eq!(harness.snapshot().await.connection, ConnectionState::Connected);

    harness.session.toggle().await.unwrap();
    assert_eq!(harness.snapshot().await.connection, ConnectionState::Idle);
    assert_eq!(harness.kit.media.live_tracks(), 0);
}

// =============================================================================
// Transport health
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_peer_disconnect_fails_session() {
    let harness = Harness::connected().await;
    harness.inject(response_created("resp_1")).await;

    harness
        .handle
        .inject_event(TransportEvent::ConnectionStateChanged(PeerState::Disconnected));
    let snapshot = harness.snapshot().await;

    assert_eq!(snapshot.connection, ConnectionState::Failed);
    assert_eq!(snapshot.conversation, ConversationState::Idle);
    assert!(!snapshot.response_in_progress);
    let error = snapshot.error.unwrap();
    assert!(error.recoverable);
    assert_eq!(error.severity, ErrorSeverity::Error);
    assert_eq!(harness.kit.media.live_tracks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_channel_closed_fails_session() {
    let harness = Harness::connected().await;
    harness.handle.inject_event(TransportEvent::ChannelClosed);
    assert_eq!(harness.snapshot().await.connection, ConnectionState::Failed);

    // Restart after a transport failure
    harness.session.start().await.unwrap();
    assert_eq!(harness.snapshot().await.connection, ConnectionState::Connected);
    assert_eq!(harness.handle.peers_created(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_channel_error_is_a_warning() {
    let harness = Harness::connected().await;
    harness
        .handle
        .inject_event(TransportEvent::ChannelError("SCTP buffer full".to_string()));

    let snapshot = harness.snapshot().await;
    assert_eq!(snapshot.connection, ConnectionState::Connected);
    assert_eq!(snapshot.warning.unwrap().severity, ErrorSeverity::Warning);
    assert!(snapshot.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_events_after_stop_are_ignored() {
    let harness = Harness::connected().await;
    let handle = harness.handle.clone();
    harness.session.stop().await;

    handle.inject_json(response_created("resp_late"));
    handle.inject_event(TransportEvent::ConnectionStateChanged(PeerState::Failed));

    let snapshot = harness.snapshot().await;
    assert_eq!(snapshot.connection, ConnectionState::Idle);
    assert_eq!(snapshot.conversation, ConversationState::Idle);
    assert!(snapshot.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_connection_progress() {
    let harness = Harness::new();
    let mut updates = harness.session.subscribe();

    harness.session.start().await.unwrap();
    let connected = updates
        .wait_for(|s| s.connection == ConnectionState::Connected)
        .await
        .unwrap()
        .clone();
    assert!(connected.session.is_some());
    assert_eq!(harness.session.current().connection, ConnectionState::Connected);
}
