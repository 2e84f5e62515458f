//! Session lifecycle manager.
//!
//! [`VoiceSession`] is a cheap, cloneable handle to a single actor task that
//! owns every piece of session state: the turn machine, the transcript, the
//! timers and the transport resources. Commands, transport events and timer
//! firings all funnel through one inbox and are processed strictly in order,
//! so no two handlers ever observe state mid-update.
//!
//! Observers read the latest [`SessionSnapshot`] through a watch channel.
//!
//! Transport events are tagged with the connection attempt that produced them
//! and timer firings with their slot generation; anything belonging to an
//! earlier attempt or a re-armed timer is dropped.
//!
//! The actor only holds weak references to its own inbox. Once every handle is
//! dropped it tears the transport down, aborts its timers and exits.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::base::{
    ConnectionError, ConnectionState, ErrorSeverity, SessionError, SessionInfo, SessionResult,
    SessionSnapshot, TranscriptRole,
};
use super::classifier::{self, Classification};
use super::normalizer::{self, NormalizedEvent};
use super::resources::SessionResources;
use super::timer::{SessionTimers, TimerFired, TimerKind};
use super::transcript::{FlushOutcome, TranscriptAssembler};
use super::turn::{Transition, TurnEffect, TurnStateMachine};
use crate::config::SessionConfig;
use crate::core::realtime::{ClientEvent, DATA_CHANNEL_LABEL, InboundMessage};
use crate::core::transport::{Collaborators, PeerConnection, TransportEvent, TransportEventSender};

// =============================================================================
// Inbox
// =============================================================================

type Reply<T> = oneshot::Sender<T>;

enum Command {
    Start(Reply<SessionResult<()>>),
    Stop(Reply<()>),
    Send(ClientEvent, Reply<SessionResult<()>>),
    StartConversation(Reply<SessionResult<()>>),
    StopConversation(Reply<()>),
    SendUserInput(String, Reply<SessionResult<()>>),
    ClearTranscript(Reply<()>),
    Snapshot(Reply<SessionSnapshot>),
}

enum Inbox {
    Command(Command),
    Transport { attempt: u64, event: TransportEvent },
    Timer(TimerFired),
}

// =============================================================================
// Handle
// =============================================================================

/// Handle to a realtime voice session.
///
/// All clones drive the same session. Must be created inside a Tokio runtime.
#[derive(Clone)]
pub struct VoiceSession {
    inbox: mpsc::UnboundedSender<Inbox>,
    /// Cancels the connection attempt currently in flight
    start_cancel: Arc<Mutex<CancellationToken>>,
    state: watch::Receiver<SessionSnapshot>,
}

impl std::fmt::Debug for VoiceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.state.borrow();
        f.debug_struct("VoiceSession")
            .field("connection", &snapshot.connection)
            .field("conversation", &snapshot.conversation)
            .finish_non_exhaustive()
    }
}

impl VoiceSession {
    /// Spawn the session actor.
    pub fn new(config: SessionConfig, collaborators: Collaborators) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionSnapshot::default());
        let start_cancel = Arc::new(Mutex::new(CancellationToken::new()));

        let actor = SessionActor {
            config,
            collaborators,
            inbox: tx.downgrade(),
            start_cancel: start_cancel.clone(),
            state_tx,
            attempt: 0,
            credentials_validated: false,
            session: None,
            connection: ConnectionState::Idle,
            conversation_active: false,
            remote_audio: false,
            error: None,
            warning: None,
            turn: TurnStateMachine::new(),
            transcript: TranscriptAssembler::new(),
            timers: SessionTimers::default(),
            resources: SessionResources::default(),
        };
        tokio::spawn(actor.run(rx));

        Self {
            inbox: tx,
            start_cancel,
            state: state_rx,
        }
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> SessionResult<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inbox
            .send(Inbox::Command(command(reply_tx)))
            .map_err(|_| SessionError::SessionClosed)?;
        reply_rx.await.map_err(|_| SessionError::SessionClosed)
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Connect: microphone permission, local audio, peer connection, data
    /// channel and the signaling exchange.
    ///
    /// No-op when already connected. Resolves with [`SessionError::Cancelled`]
    /// when `stop()` interrupts it.
    pub async fn start(&self) -> SessionResult<()> {
        self.request(Command::Start).await?
    }

    /// Tear everything down and return to idle. Never fails.
    pub async fn stop(&self) {
        self.start_cancel.lock().cancel();
        if let Err(e) = self.request(Command::Stop).await {
            debug!("stop() on closed session: {}", e);
        }
    }

    /// Stop when connected or connecting, start otherwise.
    pub async fn toggle(&self) -> SessionResult<()> {
        let connection = self.state.borrow().connection;
        match connection {
            ConnectionState::Connected | ConnectionState::Connecting => {
                self.stop().await;
                Ok(())
            }
            ConnectionState::Idle | ConnectionState::Failed => self.start().await,
        }
    }

    // -------------------------------------------------------------------------
    // Conversation
    // -------------------------------------------------------------------------

    /// Send a raw client event over the data channel.
    pub async fn send_message(&self, event: ClientEvent) -> SessionResult<()> {
        self.request(|reply| Command::Send(event, reply)).await?
    }

    /// Open the conversation, connecting first when needed, and unmute the mic.
    pub async fn start_conversation(&self) -> SessionResult<()> {
        self.request(Command::StartConversation).await?
    }

    /// Cancel any response, mute the mic and flush pending transcript text.
    pub async fn stop_conversation(&self) {
        if let Err(e) = self.request(Command::StopConversation).await {
            debug!("stop_conversation() on closed session: {}", e);
        }
    }

    /// Send typed user text and ask for a response.
    ///
    /// Ignored while no conversation is active or when `text` is blank.
    pub async fn send_user_input(&self, text: impl Into<String>) -> SessionResult<()> {
        let text = text.into();
        self.request(|reply| Command::SendUserInput(text, reply))
            .await?
    }

    pub async fn clear_transcript(&self) {
        if let Err(e) = self.request(Command::ClearTranscript).await {
            debug!("clear_transcript() on closed session: {}", e);
        }
    }

    // -------------------------------------------------------------------------
    // Observation
    // -------------------------------------------------------------------------

    /// Snapshot taken after every previously queued command and event.
    pub async fn snapshot(&self) -> SessionResult<SessionSnapshot> {
        self.request(Command::Snapshot).await
    }

    /// Most recently published snapshot, without waiting for the actor.
    pub fn current(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver that is notified whenever observable state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.clone()
    }
}

// =============================================================================
// Actor
// =============================================================================

struct SessionActor {
    config: SessionConfig,
    collaborators: Collaborators,
    inbox: mpsc::WeakUnboundedSender<Inbox>,
    start_cancel: Arc<Mutex<CancellationToken>>,
    state_tx: watch::Sender<SessionSnapshot>,

    /// Bumped on every `start()`; transport events carry it
    attempt: u64,
    credentials_validated: bool,
    session: Option<SessionInfo>,
    connection: ConnectionState,
    conversation_active: bool,
    remote_audio: bool,
    error: Option<ConnectionError>,
    warning: Option<ConnectionError>,

    turn: TurnStateMachine,
    transcript: TranscriptAssembler,
    timers: SessionTimers,
    resources: SessionResources,
}

/// Run one connection step unless `token` is cancelled first.
async fn guarded<T, F>(token: &CancellationToken, step: F) -> SessionResult<T>
where
    F: Future<Output = SessionResult<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(SessionError::Cancelled),
        result = step => result,
    }
}

impl SessionActor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Inbox>) {
        while let Some(message) = rx.recv().await {
            match message {
                Inbox::Command(command) => self.handle_command(command).await,
                Inbox::Transport { attempt, event } => {
                    self.handle_transport(attempt, event).await
                }
                Inbox::Timer(fired) => self.handle_timer(fired),
            }
        }

        self.timers.cancel_all();
        self.teardown().await;
        debug!("Voice session actor stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start(reply) => {
                let result = self.start().await;
                let _ = reply.send(result);
            }
            Command::Stop(reply) => {
                self.stop().await;
                let _ = reply.send(());
            }
            Command::Send(event, reply) => {
                let result = self.send_event(&event);
                self.publish();
                let _ = reply.send(result);
            }
            Command::StartConversation(reply) => {
                let result = self.start_conversation().await;
                let _ = reply.send(result);
            }
            Command::StopConversation(reply) => {
                self.stop_conversation();
                let _ = reply.send(());
            }
            Command::SendUserInput(text, reply) => {
                let result = self.send_user_input(&text);
                self.publish();
                let _ = reply.send(result);
            }
            Command::ClearTranscript(reply) => {
                self.transcript.clear();
                self.timers.user_flush.cancel();
                self.timers.assistant_flush.cancel();
                self.publish();
                let _ = reply.send(());
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    async fn start(&mut self) -> SessionResult<()> {
        if self.connection == ConnectionState::Connected {
            warn!("start() ignored: session already connected");
            return Ok(());
        }
        if !self.resources.is_empty() {
            debug!("Releasing stale transport before reconnecting");
            self.teardown().await;
        }

        self.attempt += 1;
        let token = CancellationToken::new();
        *self.start_cancel.lock() = token.clone();

        let session = SessionInfo::generate();
        info!(session_id = %session.id, attempt = self.attempt, "Starting voice session");
        self.session = Some(session);
        self.connection = ConnectionState::Connecting;
        self.publish();

        match self.connect(&token).await {
            Ok(()) => {
                self.connection = ConnectionState::Connected;
                self.conversation_active = true;
                self.error = None;
                info!(attempt = self.attempt, "Voice session connected");
                self.publish();
                Ok(())
            }
            Err(SessionError::Cancelled) => {
                info!(attempt = self.attempt, "Voice session start cancelled");
                self.teardown().await;
                self.publish();
                Err(SessionError::Cancelled)
            }
            Err(err) => {
                error!(attempt = self.attempt, error = %err, "Voice session start failed");
                match classifier::classify_session_error(&err) {
                    Classification::Surface(surfaced) => self.fail(surfaced).await,
                    Classification::Suppressed => {
                        self.teardown().await;
                        self.connection = ConnectionState::Failed;
                    }
                }
                self.publish();
                Err(err)
            }
        }
    }

    /// The connection sequence. Every acquired resource is stored as soon as
    /// it exists so a failure or cancellation part way through releases it.
    async fn connect(&mut self, token: &CancellationToken) -> SessionResult<()> {
        if !self.credentials_validated {
            self.config.validate_credentials()?;
            self.credentials_validated = true;
        }

        let collaborators = self.collaborators.clone();

        let granted = guarded(token, async {
            Ok(collaborators.permission.request_microphone().await)
        })
        .await?;
        if !granted {
            return Err(SessionError::PermissionDenied);
        }

        let track = guarded(token, collaborators.media.acquire_audio()).await?;
        self.resources.track = Some(track.clone());

        let events = self.transport_sender();
        let peer: Arc<dyn PeerConnection> = Arc::from(
            guarded(
                token,
                collaborators
                    .transport
                    .create_peer_connection(&self.config.ice_servers, events),
            )
            .await?,
        );
        self.resources.peer = Some(peer.clone());

        let channel = guarded(token, peer.create_data_channel(DATA_CHANNEL_LABEL)).await?;
        self.resources.channel = Some(channel);

        guarded(token, peer.add_track(track)).await?;

        let offer = guarded(token, peer.create_offer()).await?;
        guarded(token, peer.set_local_description(offer.clone())).await?;
        debug!(attempt = self.attempt, "Local offer ready, exchanging with signaling");

        let answer = guarded(token, collaborators.signaling.exchange(&offer)).await?;
        guarded(token, peer.set_remote_description(answer)).await?;

        Ok(())
    }

    async fn stop(&mut self) {
        if self.connection != ConnectionState::Idle || !self.resources.is_empty() {
            info!("Stopping voice session");
        }
        self.teardown().await;
        self.publish();
    }

    /// Release the transport and reset per-connection state. The error slot is
    /// left alone so a fatal failure stays visible until the next start.
    async fn teardown(&mut self) {
        self.timers.cancel_session();
        self.resources.release().await;
        self.turn.reset();
        self.transcript.clear_buffers();
        self.session = None;
        self.connection = ConnectionState::Idle;
        self.conversation_active = false;
        self.remote_audio = false;
    }

    async fn fail(&mut self, surfaced: ConnectionError) {
        self.teardown().await;
        if surfaced.severity == ErrorSeverity::Fatal {
            // A fatal error replaces any pending warning and stops every timer
            self.timers.cancel_all();
            self.warning = None;
        }
        self.connection = ConnectionState::Failed;
        self.error = Some(surfaced);
    }

    fn transport_sender(&self) -> TransportEventSender {
        let inbox = self.inbox.clone();
        TransportEventSender::new(self.attempt, move |attempt, event| {
            inbox
                .upgrade()
                .is_some_and(|tx| tx.send(Inbox::Transport { attempt, event }).is_ok())
        })
    }

    // -------------------------------------------------------------------------
    // Conversation
    // -------------------------------------------------------------------------

    async fn start_conversation(&mut self) -> SessionResult<()> {
        let already_connected = self.connection == ConnectionState::Connected;
        if !already_connected {
            // session.update goes out when the data channel opens
            self.start().await?;
        } else {
            self.send_session_update();
        }

        self.resources.set_mic_enabled(true);
        self.conversation_active = true;
        info!("Conversation started");
        self.publish();
        Ok(())
    }

    fn stop_conversation(&mut self) {
        let transition = self.turn.cancel_response();
        self.apply_transition(transition);
        self.resources.set_mic_enabled(false);

        self.timers.user_flush.cancel();
        self.timers.assistant_flush.cancel();
        self.transcript.flush_user();
        self.flush_assistant();

        let transition = self.turn.reset();
        self.apply_transition(transition);
        self.conversation_active = false;
        info!("Conversation stopped");
        self.publish();
    }

    fn send_user_input(&mut self, text: &str) -> SessionResult<()> {
        if !self.conversation_active {
            debug!("Ignoring user input, no active conversation");
            return Ok(());
        }
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let transition = self.turn.cancel_response();
        self.apply_transition(transition);

        self.send_event(&ClientEvent::user_text(text))?;
        self.send_event(&ClientEvent::ResponseCreate { response: None })?;

        self.transcript.queue_item(TranscriptRole::User, text);
        self.timers.user_flush.cancel();
        self.transcript.flush_user();
        Ok(())
    }

    fn send_session_update(&mut self) {
        let event = ClientEvent::SessionUpdate {
            session: self.config.to_wire_session(),
        };
        if let Err(e) = self.send_event(&event) {
            debug!(error = %e, "session.update not sent");
        }
    }

    /// Serialize and send one event. Benign cancellation races count as sent.
    fn send_event(&mut self, event: &ClientEvent) -> SessionResult<()> {
        let event_type = event.type_name();
        let Some(channel) = self.resources.open_channel().cloned() else {
            warn!(event_type, "Cannot send, data channel is not open");
            self.surface_warning(&format!("Cannot send {event_type}: data channel is not open"));
            return Err(SessionError::NotConnected);
        };

        let wire = event.to_wire().map_err(|e| {
            SessionError::ChannelSend(format!("Failed to encode {event_type}: {e}"))
        })?;

        match channel.send(&wire) {
            Ok(()) => {
                trace!(event_type, "Sent client event");
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                if classifier::is_benign(&message) {
                    debug!(event_type, %message, "Ignoring benign send failure");
                    return Ok(());
                }
                warn!(event_type, error = %err, "Failed to send client event");
                self.surface_warning(&message);
                Err(err)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Transport events
    // -------------------------------------------------------------------------

    async fn handle_transport(&mut self, attempt: u64, event: TransportEvent) {
        if attempt != self.attempt || !self.resources.has_peer() {
            debug!(
                attempt,
                current = self.attempt,
                event = event.name(),
                "Dropping event from stale transport"
            );
            return;
        }

        match event {
            TransportEvent::ConnectionStateChanged(state) => {
                debug!(%state, "Peer connection state changed");
                if state.is_terminal() && self.connection == ConnectionState::Connected {
                    self.transport_lost(format!("Peer connection {state}")).await;
                }
            }
            TransportEvent::RemoteTrack { track_id } => {
                debug!(%track_id, "Remote audio track attached");
                self.remote_audio = true;
            }
            TransportEvent::ChannelOpen => {
                info!("Data channel open");
                self.send_session_update();
            }
            TransportEvent::ChannelMessage(text) => self.handle_message(&text).await,
            TransportEvent::ChannelError(message) => {
                warn!(%message, "Data channel error");
                self.surface_warning(&message);
            }
            TransportEvent::ChannelClosed => {
                if self.connection == ConnectionState::Connected {
                    self.transport_lost("Data channel closed".to_string()).await;
                }
            }
        }
        self.publish();
    }

    async fn transport_lost(&mut self, reason: String) {
        let err = SessionError::Transport(reason);
        error!(error = %err, "Transport lost");
        match classifier::classify_session_error(&err) {
            Classification::Surface(surfaced) => self.fail(surfaced).await,
            Classification::Suppressed => {
                self.teardown().await;
                self.connection = ConnectionState::Failed;
            }
        }
    }

    async fn handle_message(&mut self, text: &str) {
        let message = match InboundMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Dropping malformed data channel message");
                return;
            }
        };

        let event = normalizer::normalize(&message.event_type);
        trace!(event_type = %message.event_type, normalized = %event, "Inbound event");

        match event {
            NormalizedEvent::UserSpeakingStarted
            | NormalizedEvent::UserSpeakingStopped
            | NormalizedEvent::AiSpeakingStarted
            | NormalizedEvent::AiSpeakingStopped => {
                let transition = self.turn.handle(event);
                if transition.duplicate {
                    debug!(
                        event_type = %message.event_type,
                        response_id = message.response_id().unwrap_or("-"),
                        "Ignoring duplicate assistant start"
                    );
                }
                self.apply_transition(transition);
            }
            NormalizedEvent::UserTranscriptionDelta => {
                if let Some(delta) = message.delta()
                    && self.transcript.push_delta(TranscriptRole::User, delta)
                {
                    self.arm(TimerKind::UserFlush, self.config.timing.transcript_debounce);
                }
            }
            NormalizedEvent::UserTranscriptionCompleted => {
                self.timers.user_flush.cancel();
                self.complete(TranscriptRole::User, message.final_text());
            }
            NormalizedEvent::AiTranscriptionDelta => {
                if let Some(delta) = message.delta()
                    && self.transcript.push_delta(TranscriptRole::Assistant, delta)
                {
                    self.arm(
                        TimerKind::AssistantFlush,
                        self.config.timing.transcript_debounce,
                    );
                }
            }
            NormalizedEvent::AiTranscriptionCompleted => {
                self.timers.assistant_flush.cancel();
                self.complete(TranscriptRole::Assistant, message.final_text());
            }
            NormalizedEvent::Error => self.handle_error_event(&message).await,
            NormalizedEvent::Unknown => {
                if normalizer::is_coverage_gap(&message.event_type) {
                    info!(event_type = %message.event_type, "Unhandled realtime event");
                } else {
                    debug!(event_type = %message.event_type, "Ignoring realtime event");
                }
            }
        }
    }

    /// Finalize a role's transcript from the authoritative text, falling back
    /// to whatever deltas were buffered.
    fn complete(&mut self, role: TranscriptRole, final_text: Option<&str>) {
        let text = match final_text.filter(|t| !t.trim().is_empty()) {
            Some(text) => text.to_string(),
            None => self.transcript.pending_text(role),
        };
        if text.trim().is_empty() {
            debug!(%role, "Empty transcription, nothing to finalize");
            return;
        }
        let id = self.transcript.complete(role, &text);
        debug!(%role, item_id = id, "Transcript item finalized");
    }

    async fn handle_error_event(&mut self, message: &InboundMessage) {
        let text = message.error_message();

        if !(message.has_error_object() || message.is_response_scoped()) {
            warn!(event_type = %message.event_type, %text, "Realtime warning");
            self.surface_warning(&text);
            return;
        }

        match classifier::classify(&text) {
            Classification::Suppressed => {
                debug!(%text, "Ignoring benign cancellation race");
            }
            Classification::Surface(surfaced) if surfaced.recoverable => {
                warn!(%text, "Realtime error");
                let transition = self.turn.on_response_error();
                self.apply_transition(transition);
            }
            Classification::Surface(surfaced) => {
                error!(%text, "Fatal realtime error, closing session");
                self.fail(surfaced).await;
            }
        }
    }

    fn apply_transition(&mut self, transition: Transition) {
        if transition.changed() {
            debug!(from = %transition.from, to = %transition.to, "Conversation state changed");
        }
        for effect in transition.effects {
            match effect {
                TurnEffect::SendCancel => {
                    debug!("Cancelling in-flight response");
                    if let Err(e) = self.send_event(&ClientEvent::ResponseCancel) {
                        debug!(error = %e, "response.cancel not sent");
                    }
                }
                TurnEffect::ArmFallbackTimer => {
                    self.arm(TimerKind::AiFallback, self.config.timing.ai_fallback)
                }
                TurnEffect::DisarmFallbackTimer => self.timers.ai_fallback.cancel(),
            }
        }
    }

    /// Surface a warning unless it is benign; it expires after the warning TTL.
    fn surface_warning(&mut self, message: &str) {
        match classifier::classify_warning(message) {
            Classification::Suppressed => debug!(%message, "Suppressed benign failure"),
            Classification::Surface(warning) => {
                self.warning = Some(warning);
                self.arm(TimerKind::WarningExpiry, self.config.timing.warning_ttl);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Timers
    // -------------------------------------------------------------------------

    fn arm(&mut self, kind: TimerKind, delay: Duration) {
        let inbox = self.inbox.clone();
        self.timers.slot_mut(kind).arm(delay, move |fired| {
            if let Some(tx) = inbox.upgrade() {
                let _ = tx.send(Inbox::Timer(fired));
            }
        });
    }

    fn handle_timer(&mut self, fired: TimerFired) {
        if !self.timers.slot_mut(fired.kind).accept(fired) {
            trace!(timer = %fired.kind, generation = fired.generation, "Ignoring stale timer");
            return;
        }

        match fired.kind {
            TimerKind::UserFlush => {
                if let FlushOutcome::Flushed(id) = self.transcript.flush_user() {
                    trace!(item_id = id, "User transcript flushed");
                }
            }
            TimerKind::AssistantFlush => self.flush_assistant(),
            TimerKind::AiFallback => {
                warn!("Assistant turn never reported its end, returning to idle");
                let transition = self.turn.on_fallback_timeout();
                self.apply_transition(transition);
            }
            TimerKind::WarningExpiry => self.warning = None,
        }
        self.publish();
    }

    /// Flush assistant text, retrying later while the user's words for this
    /// turn have not landed yet.
    fn flush_assistant(&mut self) {
        match self.transcript.flush_assistant(false) {
            FlushOutcome::Deferred => {
                trace!("Assistant text waiting for the user transcript");
                self.arm(
                    TimerKind::AssistantFlush,
                    self.config.timing.assistant_gate_retry,
                );
            }
            FlushOutcome::Flushed(id) => trace!(item_id = id, "Assistant transcript flushed"),
            FlushOutcome::Empty => {}
        }
    }

    // -------------------------------------------------------------------------
    // Observation
    // -------------------------------------------------------------------------

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session: self.session.clone(),
            connection: self.connection,
            conversation: self.turn.state(),
            conversation_active: self.conversation_active,
            response_in_progress: self.turn.response_in_progress(),
            remote_audio: self.remote_audio,
            error: self.error.clone(),
            warning: self.warning.clone(),
            transcript: self.transcript.items().to_vec(),
        }
    }

    fn publish(&self) {
        let next = self.snapshot();
        self.state_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
