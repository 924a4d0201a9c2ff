mod chat;
mod media;
mod participant;
mod relay;
mod signaling;

pub use chat::ChatMessage;
pub use media::{LocalMediaState, MediaSource, TrackKind};
pub use participant::{ConnectionState, ParticipantId};
pub use relay::{ClientMessage, ServerMessage};
pub use signaling::{
    IceCandidate, IceServerConfig, SdpType, SessionDescription, SignalEnvelope, SignalKind,
};
