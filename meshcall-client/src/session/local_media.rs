use crate::media::{LocalStream, LocalTrack};
use meshcall_core::{LocalMediaState, MediaSource, TrackKind};

/// The local preview and the enable flags applied to its tracks.
///
/// A source that lacks a kind (a video-only display capture) keeps sending
/// the previous source's track of that kind.
#[derive(Debug, Default)]
pub struct LocalMedia {
    active: Option<LocalStream>,
    carried: Vec<LocalTrack>,
    state: LocalMediaState,
}

impl LocalMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.active.is_some()
    }

    pub fn state(&self) -> LocalMediaState {
        self.state
    }

    pub fn active(&self) -> Option<&LocalStream> {
        self.active.as_ref()
    }

    /// Tracks every new peer connection gets.
    pub fn tracks(&self) -> Vec<LocalTrack> {
        let Some(stream) = &self.active else {
            return Vec::new();
        };
        stream
            .tracks()
            .iter()
            .chain(self.carried.iter())
            .cloned()
            .collect()
    }

    pub fn toggle(&mut self, kind: TrackKind) -> bool {
        let enabled = !self.state.enabled(kind);
        self.set_enabled(kind, enabled);
        enabled
    }

    pub fn set_enabled(&mut self, kind: TrackKind, enabled: bool) {
        match kind {
            TrackKind::Audio => self.state.audio_enabled = enabled,
            TrackKind::Video => self.state.video_enabled = enabled,
        }
        self.apply_flags();
    }

    /// Makes `stream` the preview. Kinds it lacks keep their current track.
    /// Returns the tracks no longer sent; the caller stops them once peers
    /// have switched. The current enable flags carry over.
    pub fn replace_active(&mut self, stream: LocalStream) -> Vec<LocalTrack> {
        let in_use = self.tracks();
        self.carried = in_use
            .iter()
            .filter(|track| stream.track(track.kind()).is_none())
            .cloned()
            .collect();
        self.state.active_source = stream.source();
        self.active = Some(stream);
        self.apply_flags();

        in_use
            .into_iter()
            .filter(|track| !self.carried.iter().any(|c| c.id() == track.id()))
            .collect()
    }

    /// Drops the preview, e.g. when the camera cannot be re-acquired after a
    /// screen share ends. Returns the tracks that were in use.
    pub fn clear(&mut self) -> Vec<LocalTrack> {
        let in_use = self.tracks();
        self.state.active_source = MediaSource::Camera;
        self.active = None;
        self.carried.clear();
        in_use
    }

    pub fn stop(&mut self) {
        for track in self.clear() {
            track.stop();
        }
    }

    fn apply_flags(&self) {
        for track in self.tracks() {
            track.set_enabled(self.state.enabled(track.kind()));
        }
    }
}
