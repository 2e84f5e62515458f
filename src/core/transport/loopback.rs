//! In-process loopback collaborators.
//!
//! A complete set of capability implementations that never leave the process.
//! The replay command feeds recorded wire events through them, and the test
//! suite uses them to drive a real session deterministically.
//!
//! [`LoopbackTransport::handle`] returns a [`LoopbackHandle`] that can inject
//! inbound channel messages or raw transport events into the most recent peer
//! connection and inspect everything the session sent.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use super::{
    ChannelState, Collaborators, DataChannel, IceServer, LocalAudioTrack, MediaDevices,
    PeerConnection, PeerState, PermissionProvider, SdpKind, SessionDescription, SignalingClient,
    Transport, TransportEvent, TransportEventSender,
};
use crate::core::session::base::{SessionError, SessionResult};

// =============================================================================
// Permission
// =============================================================================

/// Permission provider with a fixed answer.
#[derive(Debug)]
pub struct LoopbackPermission {
    granted: AtomicBool,
}

impl LoopbackPermission {
    pub fn new(granted: bool) -> Self {
        Self {
            granted: AtomicBool::new(granted),
        }
    }

    pub fn set_granted(&self, granted: bool) {
        self.granted.store(granted, Ordering::SeqCst);
    }
}

#[async_trait]
impl PermissionProvider for LoopbackPermission {
    async fn request_microphone(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Media
// =============================================================================

/// Local track that only tracks its own liveness.
#[derive(Debug)]
pub struct LoopbackTrack {
    id: String,
    live: AtomicBool,
    enabled: AtomicBool,
    live_count: Arc<AtomicUsize>,
}

impl LocalAudioTrack for LoopbackTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            self.live_count.fetch_sub(1, Ordering::SeqCst);
            debug!(track_id = %self.id, "Loopback track stopped");
        }
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

/// Media devices handing out [`LoopbackTrack`]s.
#[derive(Debug, Default)]
pub struct LoopbackMedia {
    live_count: Arc<AtomicUsize>,
    acquired: AtomicUsize,
    failure: Mutex<Option<String>>,
    last_track: Mutex<Option<Arc<LoopbackTrack>>>,
}

impl LoopbackMedia {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following acquisition fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(message.into());
    }

    /// Number of tracks acquired and not yet stopped.
    pub fn live_tracks(&self) -> usize {
        self.live_count.load(Ordering::SeqCst)
    }

    /// Number of successful acquisitions.
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// Whether the most recent track is enabled.
    pub fn last_track_enabled(&self) -> Option<bool> {
        self.last_track.lock().as_ref().map(|t| t.is_enabled())
    }
}

#[async_trait]
impl MediaDevices for LoopbackMedia {
    async fn acquire_audio(&self) -> SessionResult<Arc<dyn LocalAudioTrack>> {
        if let Some(message) = self.failure.lock().clone() {
            return Err(SessionError::MediaAcquisition(message));
        }
        let n = self.acquired.fetch_add(1, Ordering::SeqCst) + 1;
        self.live_count.fetch_add(1, Ordering::SeqCst);
        let track = Arc::new(LoopbackTrack {
            id: format!("loopback-mic-{n}"),
            live: AtomicBool::new(true),
            enabled: AtomicBool::new(true),
            live_count: self.live_count.clone(),
        });
        *self.last_track.lock() = Some(track.clone());
        Ok(track)
    }
}

// =============================================================================
// Transport
// =============================================================================

#[derive(Debug, Default)]
struct LoopbackShared {
    /// Event sender and channel of the most recent peer connection
    current: Mutex<Option<(TransportEventSender, Arc<LoopbackChannel>)>>,
    sent: Mutex<Vec<String>>,
    send_failure: Mutex<Option<String>>,
    peers_created: AtomicUsize,
    peers_open: AtomicUsize,
    auto_open: AtomicBool,
}

/// Data channel recording every sent message.
pub struct LoopbackChannel {
    label: String,
    open: AtomicBool,
    closed: AtomicBool,
    shared: Arc<LoopbackShared>,
}

impl std::fmt::Debug for LoopbackChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackChannel")
            .field("label", &self.label)
            .field("state", &self.state())
            .finish()
    }
}

impl DataChannel for LoopbackChannel {
    fn label(&self) -> &str {
        &self.label
    }

    fn state(&self) -> ChannelState {
        if self.closed.load(Ordering::SeqCst) {
            ChannelState::Closed
        } else if self.open.load(Ordering::SeqCst) {
            ChannelState::Open
        } else {
            ChannelState::Connecting
        }
    }

    fn send(&self, text: &str) -> SessionResult<()> {
        if self.state() != ChannelState::Open {
            return Err(SessionError::ChannelSend("data channel is not open".to_string()));
        }
        if let Some(message) = self.shared.send_failure.lock().clone() {
            return Err(SessionError::ChannelSend(message));
        }
        self.shared.sent.lock().push(text.to_string());
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.open.store(false, Ordering::SeqCst);
    }
}

/// Peer connection that "connects" as soon as the remote answer is applied.
pub struct LoopbackPeer {
    events: TransportEventSender,
    channel: Mutex<Option<Arc<LoopbackChannel>>>,
    tracks: Mutex<Vec<Arc<dyn LocalAudioTrack>>>,
    state: Mutex<PeerState>,
    shared: Arc<LoopbackShared>,
}

#[async_trait]
impl PeerConnection for LoopbackPeer {
    async fn create_data_channel(&self, label: &str) -> SessionResult<Arc<dyn DataChannel>> {
        let channel = Arc::new(LoopbackChannel {
            label: label.to_string(),
            open: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            shared: self.shared.clone(),
        });
        *self.channel.lock() = Some(channel.clone());
        *self.shared.current.lock() = Some((self.events.clone(), channel.clone()));
        Ok(channel)
    }

    async fn add_track(&self, track: Arc<dyn LocalAudioTrack>) -> SessionResult<()> {
        self.tracks.lock().push(track);
        Ok(())
    }

    async fn create_offer(&self) -> SessionResult<SessionDescription> {
        let media = self.tracks.lock().len();
        Ok(SessionDescription::offer(format!(
            "v=0\r\no=loopback {} 1 IN IP4 127.0.0.1\r\ns=-\r\na=x-tracks:{media}\r\n",
            self.events.attempt()
        )))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> SessionResult<()> {
        if desc.kind != SdpKind::Offer {
            return Err(SessionError::Transport("local description must be an offer".to_string()));
        }
        *self.state.lock() = PeerState::Connecting;
        self.events
            .send(TransportEvent::ConnectionStateChanged(PeerState::Connecting));
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> SessionResult<()> {
        if desc.kind != SdpKind::Answer {
            return Err(SessionError::Transport("remote description must be an answer".to_string()));
        }
        *self.state.lock() = PeerState::Connected;
        self.events
            .send(TransportEvent::ConnectionStateChanged(PeerState::Connected));
        self.events.send(TransportEvent::RemoteTrack {
            track_id: "loopback-remote-audio".to_string(),
        });
        if self.shared.auto_open.load(Ordering::SeqCst)
            && let Some(channel) = self.channel.lock().as_ref()
        {
            channel.open.store(true, Ordering::SeqCst);
            self.events.send(TransportEvent::ChannelOpen);
        }
        Ok(())
    }

    fn state(&self) -> PeerState {
        *self.state.lock()
    }

    async fn close(&self) {
        let mut state = self.state.lock();
        if *state == PeerState::Closed {
            return;
        }
        *state = PeerState::Closed;
        drop(state);
        if let Some(channel) = self.channel.lock().as_ref() {
            channel.close();
        }
        self.tracks.lock().clear();
        self.shared.peers_open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Transport producing [`LoopbackPeer`]s.
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    shared: Arc<LoopbackShared>,
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackTransport {
    /// Data channels open automatically once the answer is applied.
    pub fn new() -> Self {
        let shared = LoopbackShared::default();
        shared.auto_open.store(true, Ordering::SeqCst);
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Data channels stay in `Connecting` until [`LoopbackHandle::open_channel`].
    pub fn manual_open() -> Self {
        Self {
            shared: Arc::new(LoopbackShared::default()),
        }
    }

    pub fn handle(&self) -> LoopbackHandle {
        LoopbackHandle {
            shared: self.shared.clone(),
        }
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn create_peer_connection(
        &self,
        ice_servers: &[IceServer],
        events: TransportEventSender,
    ) -> SessionResult<Box<dyn PeerConnection>> {
        debug!(
            attempt = events.attempt(),
            ice_servers = ice_servers.len(),
            "Creating loopback peer connection"
        );
        self.shared.peers_created.fetch_add(1, Ordering::SeqCst);
        self.shared.peers_open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(LoopbackPeer {
            events,
            channel: Mutex::new(None),
            tracks: Mutex::new(Vec::new()),
            state: Mutex::new(PeerState::New),
            shared: self.shared.clone(),
        }))
    }
}

/// Remote end of the loopback transport.
#[derive(Debug, Clone)]
pub struct LoopbackHandle {
    shared: Arc<LoopbackShared>,
}

impl LoopbackHandle {
    /// Deliver a raw transport event to the most recent peer connection.
    pub fn inject_event(&self, event: TransportEvent) -> bool {
        match self.shared.current.lock().as_ref() {
            Some((events, _)) => events.send(event),
            None => false,
        }
    }

    /// Deliver one inbound data-channel message.
    pub fn inject(&self, text: impl Into<String>) -> bool {
        self.inject_event(TransportEvent::ChannelMessage(text.into()))
    }

    /// Deliver a JSON value as an inbound message.
    pub fn inject_json(&self, value: serde_json::Value) -> bool {
        self.inject(value.to_string())
    }

    /// Open the current data channel and announce it.
    pub fn open_channel(&self) -> bool {
        let current = self.shared.current.lock().clone();
        match current {
            Some((events, channel)) => {
                channel.open.store(true, Ordering::SeqCst);
                events.send(TransportEvent::ChannelOpen)
            }
            None => false,
        }
    }

    /// Make every following send fail with `message`; `None` restores sends.
    pub fn fail_sends(&self, message: Option<&str>) {
        *self.shared.send_failure.lock() = message.map(str::to_string);
    }

    /// Every message the session sent, oldest first.
    pub fn sent(&self) -> Vec<String> {
        self.shared.sent.lock().clone()
    }

    /// The `type` of every sent message.
    pub fn sent_types(&self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|m| serde_json::from_str::<serde_json::Value>(m).ok())
            .filter_map(|v| v.get("type").and_then(|t| t.as_str()).map(str::to_string))
            .collect()
    }

    pub fn clear_sent(&self) {
        self.shared.sent.lock().clear();
    }

    pub fn peers_created(&self) -> usize {
        self.shared.peers_created.load(Ordering::SeqCst)
    }

    /// Peer connections created and not yet closed.
    pub fn open_peers(&self) -> usize {
        self.shared.peers_open.load(Ordering::SeqCst)
    }

    /// State of the current data channel, if any.
    pub fn channel_state(&self) -> Option<ChannelState> {
        self.shared
            .current
            .lock()
            .as_ref()
            .map(|(_, channel)| channel.state())
    }
}

// =============================================================================
// Signaling
// =============================================================================

/// Signaling that answers every offer locally.
#[derive(Debug, Default)]
pub struct LoopbackSignaling {
    delay: Mutex<Option<Duration>>,
    failure: Mutex<Option<SessionError>>,
    exchanges: AtomicU64,
}

impl LoopbackSignaling {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer only after `delay`.
    pub fn with_delay(delay: Duration) -> Self {
        let signaling = Self::default();
        *signaling.delay.lock() = Some(delay);
        signaling
    }

    /// Make every following exchange fail with `err`; `None` restores answers.
    pub fn fail_with(&self, err: Option<SessionError>) {
        *self.failure.lock() = err;
    }

    pub fn exchanges(&self) -> u64 {
        self.exchanges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignalingClient for LoopbackSignaling {
    async fn exchange(&self, offer: &SessionDescription) -> SessionResult<SessionDescription> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.failure.lock().clone() {
            return Err(err);
        }
        Ok(SessionDescription::answer(offer.sdp.replace("loopback", "loopback-answer")))
    }
}

// =============================================================================
// Bundle
// =============================================================================

/// All loopback collaborators plus typed access to each of them.
#[derive(Clone)]
pub struct LoopbackKit {
    pub permission: Arc<LoopbackPermission>,
    pub media: Arc<LoopbackMedia>,
    pub transport: LoopbackTransport,
    pub signaling: Arc<LoopbackSignaling>,
}

impl Default for LoopbackKit {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackKit {
    pub fn new() -> Self {
        Self::with_transport(LoopbackTransport::new())
    }

    pub fn with_transport(transport: LoopbackTransport) -> Self {
        Self {
            permission: Arc::new(LoopbackPermission::new(true)),
            media: Arc::new(LoopbackMedia::new()),
            transport,
            signaling: Arc::new(LoopbackSignaling::new()),
        }
    }

    pub fn with_signaling(mut self, signaling: LoopbackSignaling) -> Self {
        self.signaling = Arc::new(signaling);
        self
    }

    pub fn handle(&self) -> LoopbackHandle {
        self.transport.handle()
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            permission: self.permission.clone(),
            media: self.media.clone(),
            transport: Arc::new(self.transport.clone()),
            signaling: self.signaling.clone(),
        }
    }
}
