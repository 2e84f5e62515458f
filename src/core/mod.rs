pub mod realtime;
pub mod session;
pub mod transport;

// Re-export commonly used types for convenience
pub use realtime::{
    AudioFormat, ClientEvent, InboundMessage, RealtimeModel, RealtimeVoice, WireSessionConfig,
};

pub use session::{
    ConnectionError, ConnectionState, ConversationState, ErrorSeverity, SessionError,
    SessionResult, SessionSnapshot, TranscriptItem, TranscriptRole, VoiceSession,
};

pub use transport::{
    Collaborators, DataChannel, HttpSignalingClient, IceServer, LocalAudioTrack, MediaDevices,
    PeerConnection, PermissionProvider, SignalingClient, Transport, TransportEvent,
    TransportEventSender,
};
