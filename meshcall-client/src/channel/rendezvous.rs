use crate::error::ChannelError;
use async_trait::async_trait;
use meshcall_core::{IceServerConfig, ParticipantId, ServerMessage, SignalEnvelope};
use std::collections::HashMap;
use tracing::warn;

/// Inbound relay traffic, as delivered to the session loop.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    IceConfig(Vec<IceServerConfig>),

    /// Full roster snapshot, broadcast whenever `joined_id` enters the room.
    RosterJoined {
        joined_id: ParticipantId,
        members: Vec<ParticipantId>,
        names: HashMap<ParticipantId, String>,
    },

    MemberLeft(ParticipantId),

    Signal {
        from: ParticipantId,
        envelope: SignalEnvelope,
    },

    /// A signal whose payload could not be decoded.
    SignalRejected {
        from: ParticipantId,
        reason: String,
    },

    ChatReceived {
        sender_id: ParticipantId,
        sender_name: String,
        body: String,
    },
}

/// Maps a relay frame received after the join handshake to a session event.
///
/// `welcome` and `rejected` only make sense during the handshake and are
/// ignored here.
pub fn relay_event(msg: ServerMessage) -> Option<RelayEvent> {
    match msg {
        ServerMessage::IceConfig { ice_servers } => Some(RelayEvent::IceConfig(ice_servers)),
        ServerMessage::Joined {
            joined_id,
            members,
            names,
        } => Some(RelayEvent::RosterJoined {
            joined_id,
            members,
            names,
        }),
        ServerMessage::MemberLeft { id } => Some(RelayEvent::MemberLeft(id)),
        ServerMessage::Signal { from, payload } => match SignalEnvelope::from_payload(&payload) {
            Ok(envelope) if envelope.kind().is_some() => {
                Some(RelayEvent::Signal { from, envelope })
            }
            Ok(_) => Some(RelayEvent::SignalRejected {
                from,
                reason: "unsupported description type".to_owned(),
            }),
            Err(e) => Some(RelayEvent::SignalRejected {
                from,
                reason: e.to_string(),
            }),
        },
        ServerMessage::Chat {
            body,
            sender_name,
            sender_id,
        } => Some(RelayEvent::ChatReceived {
            sender_id,
            sender_name,
            body,
        }),
        ServerMessage::Welcome { participant_id } => {
            warn!(%participant_id, "Ignoring welcome outside of the join handshake");
            None
        }
        ServerMessage::Rejected { reason } => {
            warn!(%reason, "Ignoring rejection outside of the join handshake");
            None
        }
    }
}

/// Outbound half of the relay session.
///
/// Inbound events are not part of the trait; implementations hand out an
/// `mpsc::Receiver<RelayEvent>` when they connect.
#[async_trait]
pub trait RendezvousChannel: Send + Sync {
    /// The relay-assigned id of the local participant.
    fn local_id(&self) -> &ParticipantId;

    async fn send_signal(
        &self,
        to: &ParticipantId,
        envelope: &SignalEnvelope,
    ) -> Result<(), ChannelError>;

    async fn send_chat(&self, body: &str, sender_name: &str) -> Result<(), ChannelError>;

    /// Leaves the room and closes the relay session. No events are delivered
    /// afterwards.
    async fn leave(&self) -> Result<(), ChannelError>;
}
