use crate::media::RemoteTrack;
use meshcall_core::{ConnectionState, IceCandidate, ParticipantId};

/// Events a peer transport posts to the session loop.
///
/// Each carries the generation of the table entry that created the
/// transport, so events from a closed transport can be recognised.
#[derive(Debug)]
pub enum TransportEvent {
    /// A local ICE candidate was gathered and must be sent to the peer.
    CandidateGenerated {
        peer: ParticipantId,
        generation: u64,
        candidate: IceCandidate,
    },

    /// The peer started sending a track.
    TrackReceived {
        peer: ParticipantId,
        generation: u64,
        track: RemoteTrack,
    },

    StateChanged {
        peer: ParticipantId,
        generation: u64,
        state: ConnectionState,
    },
}

impl TransportEvent {
    pub fn origin(&self) -> (&ParticipantId, u64) {
        match self {
            TransportEvent::CandidateGenerated {
                peer, generation, ..
            }
            | TransportEvent::TrackReceived {
                peer, generation, ..
            }
            | TransportEvent::StateChanged {
                peer, generation, ..
            } => (peer, *generation),
        }
    }
}
