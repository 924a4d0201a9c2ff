use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// What the local preview (and the outgoing video) is fed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaSource {
    #[default]
    Camera,
    Screen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalMediaState {
    pub video_enabled: bool,
    pub audio_enabled: bool,
    pub active_source: MediaSource,
}

impl LocalMediaState {
    pub fn enabled(&self, kind: TrackKind) -> bool {
        match kind {
            TrackKind::Audio => self.audio_enabled,
            TrackKind::Video => self.video_enabled,
        }
    }
}

impl Default for LocalMediaState {
    fn default() -> Self {
        Self {
            video_enabled: true,
            audio_enabled: true,
            active_source: MediaSource::Camera,
        }
    }
}
