//! Transport, media and permission capabilities consumed by the session.
//!
//! The session manager never talks to a media stack directly. It drives these
//! traits, which a host application implements on top of its peer-connection
//! library of choice:
//!
//! - [`PermissionProvider`]: microphone permission prompt
//! - [`MediaDevices`] / [`LocalAudioTrack`]: local audio capture
//! - [`Transport`] / [`PeerConnection`] / [`DataChannel`]: peer transport
//! - [`SignalingClient`]: offer/answer exchange with the remote service
//!
//! Asynchronous transport notifications flow back through a
//! [`TransportEventSender`], which tags every event with the connection
//! attempt that produced it so the session can discard events from a
//! torn-down attempt.
//!
//! Two implementations ship with the crate: [`signaling::HttpSignalingClient`]
//! for the real signaling endpoint and the in-process [`loopback`] family used
//! by the replay command and the test suite.

pub mod loopback;
pub mod signaling;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::core::session::base::SessionResult;

pub use signaling::HttpSignalingClient;

// =============================================================================
// Transport Types
// =============================================================================

/// ICE server entry handed to the peer connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServer {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// Kind of session description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpKind {
    Offer,
    Answer,
}

/// SDP blob plus its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Peer connection state as reported by the media stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl PeerState {
    /// Whether the peer can no longer carry the session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PeerState::Disconnected | PeerState::Failed | PeerState::Closed
        )
    }
}

impl fmt::Display for PeerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerState::New => write!(f, "new"),
            PeerState::Connecting => write!(f, "connecting"),
            PeerState::Connected => write!(f, "connected"),
            PeerState::Disconnected => write!(f, "disconnected"),
            PeerState::Failed => write!(f, "failed"),
            PeerState::Closed => write!(f, "closed"),
        }
    }
}

/// Data channel ready state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Asynchronous notifications from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    ConnectionStateChanged(PeerState),
    /// Remote audio arrived
    RemoteTrack { track_id: String },
    ChannelOpen,
    /// One JSON text message
    ChannelMessage(String),
    ChannelError(String),
    ChannelClosed,
}

impl TransportEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TransportEvent::ConnectionStateChanged(_) => "connection_state_changed",
            TransportEvent::RemoteTrack { .. } => "remote_track",
            TransportEvent::ChannelOpen => "channel_open",
            TransportEvent::ChannelMessage(_) => "channel_message",
            TransportEvent::ChannelError(_) => "channel_error",
            TransportEvent::ChannelClosed => "channel_closed",
        }
    }
}

type EventSink = Arc<dyn Fn(u64, TransportEvent) -> bool + Send + Sync>;

/// Delivers transport events for one connection attempt.
///
/// Cloned freely into media-stack callbacks. `send` returns false once the
/// receiving session is gone.
#[derive(Clone)]
pub struct TransportEventSender {
    attempt: u64,
    sink: EventSink,
}

impl TransportEventSender {
    pub fn new(
        attempt: u64,
        sink: impl Fn(u64, TransportEvent) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            attempt,
            sink: Arc::new(sink),
        }
    }

    /// Sender backed by a plain channel of `(attempt, event)` pairs.
    pub fn from_channel(attempt: u64, tx: mpsc::UnboundedSender<(u64, TransportEvent)>) -> Self {
        Self::new(attempt, move |attempt, event| tx.send((attempt, event)).is_ok())
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn send(&self, event: TransportEvent) -> bool {
        (self.sink)(self.attempt, event)
    }
}

impl fmt::Debug for TransportEventSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportEventSender")
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Capability Traits
// =============================================================================

/// Microphone permission prompt.
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Ask for microphone access. Returns whether it was granted.
    async fn request_microphone(&self) -> bool;
}

/// Local audio capture.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquire a live local audio track.
    async fn acquire_audio(&self) -> SessionResult<Arc<dyn LocalAudioTrack>>;
}

/// A live local audio track.
pub trait LocalAudioTrack: Send + Sync {
    fn id(&self) -> &str;

    /// Mute or unmute without releasing the device.
    fn set_enabled(&self, enabled: bool);

    fn is_enabled(&self) -> bool;

    /// Release the device. Idempotent.
    fn stop(&self);

    fn is_live(&self) -> bool;
}

/// Factory for peer connections.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Create a peer connection whose events are delivered through `events`.
    async fn create_peer_connection(
        &self,
        ice_servers: &[IceServer],
        events: TransportEventSender,
    ) -> SessionResult<Box<dyn PeerConnection>>;
}

/// One peer connection.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    // -------------------------------------------------------------------------
    // Setup
    // -------------------------------------------------------------------------

    /// Create the data channel carrying JSON control events.
    async fn create_data_channel(&self, label: &str) -> SessionResult<Arc<dyn DataChannel>>;

    /// Attach the local audio track.
    async fn add_track(&self, track: Arc<dyn LocalAudioTrack>) -> SessionResult<()>;

    // -------------------------------------------------------------------------
    // Negotiation
    // -------------------------------------------------------------------------

    async fn create_offer(&self) -> SessionResult<SessionDescription>;

    async fn set_local_description(&self, desc: SessionDescription) -> SessionResult<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> SessionResult<()>;

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    fn state(&self) -> PeerState;

    /// Close the connection. Idempotent.
    async fn close(&self);
}

/// Bidirectional text channel for control events.
pub trait DataChannel: Send + Sync {
    fn label(&self) -> &str;

    fn state(&self) -> ChannelState;

    /// Send one text message.
    fn send(&self, text: &str) -> SessionResult<()>;

    /// Close the channel. Idempotent.
    fn close(&self);
}

/// Offer/answer exchange with the remote service.
#[async_trait]
pub trait SignalingClient: Send + Sync {
    async fn exchange(&self, offer: &SessionDescription) -> SessionResult<SessionDescription>;
}

/// Everything a session needs from the host environment.
#[derive(Clone)]
pub struct Collaborators {
    pub permission: Arc<dyn PermissionProvider>,
    pub media: Arc<dyn MediaDevices>,
    pub transport: Arc<dyn Transport>,
    pub signaling: Arc<dyn SignalingClient>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
