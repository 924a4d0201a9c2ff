use crate::error::TransportError;
use meshcall_core::{MediaSource, TrackKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// A locally captured track, shared read-only by every peer transport.
///
/// Disabling a track keeps it attached to every connection; samples written
/// while disabled are discarded, so no renegotiation is needed.
#[derive(Clone)]
pub struct LocalTrack {
    id: String,
    kind: TrackKind,
    enabled: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    rtc: Arc<TrackLocalStaticSample>,
}

impl LocalTrack {
    pub fn new(kind: TrackKind, stream_id: &str) -> Self {
        let codec = match kind {
            TrackKind::Audio => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                ..Default::default()
            },
            TrackKind::Video => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                ..Default::default()
            },
        };
        let id = Uuid::new_v4().to_string();
        let rtc = TrackLocalStaticSample::new(codec, id.clone(), stream_id.to_owned());

        Self {
            id,
            kind,
            enabled: Arc::new(AtomicBool::new(true)),
            stopped: Arc::new(AtomicBool::new(false)),
            rtc: Arc::new(rtc),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    pub fn rtc_track(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        self.rtc.clone()
    }

    /// Feeds one captured sample to every connection the track is bound to.
    /// Returns `false` when the sample was discarded (track disabled or stopped).
    pub async fn write_sample(&self, sample: &Sample) -> Result<bool, TransportError> {
        if !self.is_enabled() || self.is_stopped() {
            return Ok(false);
        }
        self.rtc.write_sample(sample).await?;
        Ok(true)
    }
}

impl std::fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// One capture session: camera+microphone or a display.
#[derive(Debug, Clone)]
pub struct LocalStream {
    id: String,
    source: MediaSource,
    tracks: Vec<LocalTrack>,
}

impl LocalStream {
    pub fn new(source: MediaSource, kinds: &[TrackKind]) -> Self {
        let id = Uuid::new_v4().to_string();
        let tracks = kinds.iter().map(|kind| LocalTrack::new(*kind, &id)).collect();
        Self { id, source, tracks }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> MediaSource {
        self.source
    }

    pub fn tracks(&self) -> &[LocalTrack] {
        &self.tracks
    }

    pub fn track(&self, kind: TrackKind) -> Option<&LocalTrack> {
        self.tracks.iter().find(|t| t.kind() == kind)
    }

    pub fn stop(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}
