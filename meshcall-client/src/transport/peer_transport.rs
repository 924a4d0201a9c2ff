use crate::error::TransportError;
use crate::media::LocalTrack;
use crate::transport::TransportEvent;
use async_trait::async_trait;
use meshcall_core::{IceCandidate, IceServerConfig, ParticipantId, SessionDescription};
use tokio::sync::mpsc;

/// One negotiated media connection to a remote participant.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn add_track(&self, track: &LocalTrack) -> Result<(), TransportError>;

    /// Swaps the outgoing track of the same kind without renegotiating.
    async fn replace_track(&self, track: &LocalTrack) -> Result<(), TransportError>;

    async fn create_offer(&self) -> Result<SessionDescription, TransportError>;

    async fn create_answer(&self) -> Result<SessionDescription, TransportError>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), TransportError>;

    async fn set_remote_description(&self, desc: SessionDescription)
    -> Result<(), TransportError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}

/// Where a new transport reports its events.
#[derive(Debug, Clone)]
pub struct TransportContext {
    pub peer: ParticipantId,
    pub generation: u64,
    pub events: mpsc::UnboundedSender<TransportEvent>,
}

#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(&self, ctx: TransportContext) -> Result<Box<dyn PeerTransport>, TransportError>;

    /// Applies relay-pushed ICE servers to transports created afterwards.
    async fn update_ice_servers(&self, ice_servers: Vec<IceServerConfig>);
}
