use meshcall_core::ParticipantId;
use thiserror::Error;

/// Failures of the relay session itself.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("relay unreachable: {0}")]
    Unreachable(String),

    #[error("relay rejected the join: {0}")]
    Rejected(String),

    #[error("relay did not confirm the join in time")]
    Timeout,

    #[error("relay channel closed")]
    Closed,

    #[error("relay protocol violation: {0}")]
    Protocol(String),
}

/// Camera, microphone or display capture could not be obtained.
#[derive(Debug, Clone, Error)]
pub enum MediaAccessError {
    #[error("permission denied for {0}")]
    PermissionDenied(&'static str),

    #[error("{0} capture is not available on this device")]
    Unavailable(&'static str),

    #[error("capture failed: {0}")]
    Capture(String),
}

/// A single inbound signal could not be applied. The signal is dropped and
/// the peer keeps its current state.
#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("malformed signal payload from {from}: {reason}")]
    MalformedPayload { from: ParticipantId, reason: String },

    #[error("signal from unknown or removed peer {0}")]
    UnknownPeer(ParticipantId),

    #[error("unexpected {kind} from {from} in state {state}")]
    UnexpectedSignal {
        from: ParticipantId,
        kind: &'static str,
        state: &'static str,
    },

    #[error("remote description from {from} rejected: {source}")]
    RemoteDescriptionRejected {
        from: ParticipantId,
        #[source]
        source: TransportError,
    },

    #[error("failed to send signal to {to}: {source}")]
    Send {
        to: ParticipantId,
        #[source]
        source: ChannelError,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// The local side of a peer connection could not be configured. The peer's
/// entry must be removed.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to create transport for {peer}: {source}")]
    Transport {
        peer: ParticipantId,
        #[source]
        source: TransportError,
    },

    #[error("failed to create local description for {peer}: {source}")]
    CreateDescription {
        peer: ParticipantId,
        #[source]
        source: TransportError,
    },

    #[error("local description for {peer} rejected: {source}")]
    LocalDescriptionRejected {
        peer: ParticipantId,
        #[source]
        source: TransportError,
    },
}

impl ConfigurationError {
    pub fn peer(&self) -> &ParticipantId {
        match self {
            ConfigurationError::Transport { peer, .. }
            | ConfigurationError::CreateDescription { peer, .. }
            | ConfigurationError::LocalDescriptionRejected { peer, .. } => peer,
        }
    }
}

/// Errors raised at the peer transport seam.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("webrtc: {0}")]
    WebRtc(#[from] webrtc::Error),

    #[error("invalid session description: {0}")]
    InvalidDescription(String),

    #[error("transport closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}

/// Errors that abort a session before it starts.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("failed to read config {path}: {reason}")]
    Config { path: String, reason: String },
}

/// The session task has ended; commands can no longer be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("meeting session has ended")]
pub struct SessionClosed;
