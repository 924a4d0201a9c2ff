use crate::error::MediaAccessError;
use crate::peer::NegotiationState;
use meshcall_core::{ChatMessage, ConnectionState, LocalMediaState, MediaSource, ParticipantId};
use std::fmt;
use std::time::{Duration, SystemTime};

/// How long a gesture reaction stays on screen.
pub const REACTION_DISPLAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TileKey {
    Local,
    Remote(ParticipantId),
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileKey::Local => f.write_str("local"),
            TileKey::Remote(id) => write!(f, "{id}"),
        }
    }
}

/// What a tile renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileSource {
    Preview(MediaSource),
    /// Local media could not be acquired; the participant only receives.
    NoPreview,
    Remote {
        stream_id: String,
        audio: bool,
        video: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub key: TileKey,
    pub name: String,
    pub source: TileSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    pub connection_state: ConnectionState,
    /// `None` for the local participant.
    pub negotiation: Option<NegotiationState>,
    pub is_local: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedMoment {
    pub captured_at: SystemTime,
    pub caption: String,
}

/// Everything the UI renders, republished after every change.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionView {
    pub local_id: ParticipantId,
    /// The first tile is always the local one.
    pub tiles: Vec<Tile>,
    pub participants: Vec<Participant>,
    pub messages: Vec<ChatMessage>,
    pub unseen_messages: usize,
    pub media: LocalMediaState,
    pub media_ready: bool,
    pub recording: bool,
    pub moments: Vec<CapturedMoment>,
    pub ended: bool,
}

impl SessionView {
    pub fn tile_keys(&self) -> Vec<String> {
        self.tiles.iter().map(|t| t.key.to_string()).collect()
    }

    pub fn tile(&self, key: &TileKey) -> Option<&Tile> {
        self.tiles.iter().find(|t| &t.key == key)
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveReason {
    UserLeft,
    RelayLost,
}

/// One-shot UI effects.
#[derive(Debug, Clone)]
pub enum SessionNotice {
    ReactionShown { duration: Duration },
    ScreenshotRequested,
    RecordingStarted,
    RecordingStopped,
    /// Ask the user for a caption, answer with `moment_captured`.
    CaptionRequested,
    MediaUnavailable(MediaAccessError),
    PeerFailed { peer: ParticipantId, reason: String },
    Left(LeaveReason),
}
