use crate::model::participant::ParticipantId;
use crate::model::signaling::IceServerConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Frames the client sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "snake_case")]
pub enum ClientMessage {
    Join {
        room: String,
        display_name: String,
    },
    Signal {
        to: ParticipantId,
        /// Legacy JSON string envelope, see [`crate::SignalEnvelope`].
        payload: String,
    },
    Chat {
        body: String,
        sender_name: String,
    },
    Leave,
}

/// Frames the relay sends to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        participant_id: ParticipantId,
    },
    Rejected {
        reason: String,
    },
    IceConfig {
        ice_servers: Vec<IceServerConfig>,
    },
    /// Roster snapshot broadcast to the whole room whenever `joined_id` joins.
    Joined {
        joined_id: ParticipantId,
        members: Vec<ParticipantId>,
        #[serde(default)]
        names: HashMap<ParticipantId, String>,
    },
    MemberLeft {
        id: ParticipantId,
    },
    Signal {
        from: ParticipantId,
        payload: String,
    },
    Chat {
        body: String,
        sender_name: String,
        sender_id: ParticipantId,
    },
}
