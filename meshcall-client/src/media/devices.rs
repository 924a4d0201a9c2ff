use crate::error::MediaAccessError;
use crate::media::LocalStream;
use async_trait::async_trait;
use meshcall_core::{MediaSource, TrackKind};
use tokio::sync::oneshot;

/// A display capture. `ended` resolves when the user revokes the share
/// through the platform's own controls.
pub struct ScreenCapture {
    pub stream: LocalStream,
    pub ended: oneshot::Receiver<()>,
}

/// Seam to the platform's capture devices.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Camera plus microphone.
    async fn acquire_camera(&self) -> Result<LocalStream, MediaAccessError>;

    async fn acquire_screen(&self) -> Result<ScreenCapture, MediaAccessError>;
}

/// Devices for headless participants: tracks exist and can be negotiated,
/// but nothing is captured into them. Display capture is unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntheticMediaDevices;

impl SyntheticMediaDevices {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaDevices for SyntheticMediaDevices {
    async fn acquire_camera(&self) -> Result<LocalStream, MediaAccessError> {
        Ok(LocalStream::new(
            MediaSource::Camera,
            &[TrackKind::Audio, TrackKind::Video],
        ))
    }

    async fn acquire_screen(&self) -> Result<ScreenCapture, MediaAccessError> {
        Err(MediaAccessError::Unavailable("display"))
    }
}
