use async_trait::async_trait;
use meshcall_client::media::{LocalStream, MediaDevices, ScreenCapture};
use meshcall_client::MediaAccessError;
use meshcall_core::{MediaSource, TrackKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Mutex, oneshot};

#[derive(Default)]
struct DevicesState {
    camera_denied: AtomicBool,
    screen_denied: AtomicBool,
    screen_without_audio: AtomicBool,
    camera_acquisitions: AtomicUsize,
    screen_acquisitions: AtomicUsize,
    revokers: Mutex<Vec<oneshot::Sender<()>>>,
}

/// MediaDevices with switchable permissions and a manual screen-share revoke.
#[derive(Clone, Default)]
pub struct MockMediaDevices {
    state: Arc<DevicesState>,
}

impl MockMediaDevices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn camera_denied() -> Self {
        let devices = Self::default();
        devices.deny_camera(true);
        devices
    }

    pub fn deny_camera(&self, denied: bool) {
        self.state.camera_denied.store(denied, Ordering::SeqCst);
    }

    pub fn deny_screen(&self, denied: bool) {
        self.state.screen_denied.store(denied, Ordering::SeqCst);
    }

    /// Display captures carry video only, as browsers usually hand them out.
    pub fn screen_without_audio(&self, video_only: bool) {
        self.state
            .screen_without_audio
            .store(video_only, Ordering::SeqCst);
    }

    pub fn camera_acquisitions(&self) -> usize {
        self.state.camera_acquisitions.load(Ordering::SeqCst)
    }

    pub fn screen_acquisitions(&self) -> usize {
        self.state.screen_acquisitions.load(Ordering::SeqCst)
    }

    /// Ends the most recent screen capture as the platform's "stop sharing"
    /// button would.
    pub async fn revoke_screen(&self) -> bool {
        match self.state.revokers.lock().await.pop() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl MediaDevices for MockMediaDevices {
    async fn acquire_camera(&self) -> Result<LocalStream, MediaAccessError> {
        if self.state.camera_denied.load(Ordering::SeqCst) {
            return Err(MediaAccessError::PermissionDenied("camera"));
        }
        self.state.camera_acquisitions.fetch_add(1, Ordering::SeqCst);
        Ok(LocalStream::new(
            MediaSource::Camera,
            &[TrackKind::Audio, TrackKind::Video],
        ))
    }

    async fn acquire_screen(&self) -> Result<ScreenCapture, MediaAccessError> {
        if self.state.screen_denied.load(Ordering::SeqCst) {
            return Err(MediaAccessError::PermissionDenied("display"));
        }
        self.state.screen_acquisitions.fetch_add(1, Ordering::SeqCst);

        let kinds: &[TrackKind] = if self.state.screen_without_audio.load(Ordering::SeqCst) {
            &[TrackKind::Video]
        } else {
            &[TrackKind::Audio, TrackKind::Video]
        };

        let (tx, ended) = oneshot::channel();
        self.state.revokers.lock().await.push(tx);
        Ok(ScreenCapture {
            stream: LocalStream::new(MediaSource::Screen, kinds),
            ended,
        })
    }
}
