use crate::error::SessionClosed;
use crate::gesture::GestureIntent;
use crate::session::{SessionCommand, SessionView};
use meshcall_core::ParticipantId;
use tokio::sync::{mpsc, watch};

/// Cloneable control surface of a running [`crate::session::MeetingSession`].
///
/// Dropping every handle ends the session as if `leave` was called.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    local_id: ParticipantId,
    commands: mpsc::Sender<SessionCommand>,
    view: watch::Receiver<SessionView>,
}

impl SessionHandle {
    pub(crate) fn new(
        local_id: ParticipantId,
        commands: mpsc::Sender<SessionCommand>,
        view: watch::Receiver<SessionView>,
    ) -> Self {
        Self {
            local_id,
            commands,
            view,
        }
    }

    pub fn local_id(&self) -> &ParticipantId {
        &self.local_id
    }

    /// A receiver that is notified on every view change.
    pub fn view(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    pub fn snapshot(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// Waits until the published view satisfies `f`.
    pub async fn wait_for(
        &self,
        f: impl FnMut(&SessionView) -> bool,
    ) -> Result<SessionView, SessionClosed> {
        let mut view = self.view.clone();
        let matched = view.wait_for(f).await.map_err(|_| SessionClosed)?;
        Ok(matched.clone())
    }

    pub async fn send(&self, command: SessionCommand) -> Result<(), SessionClosed> {
        self.commands.send(command).await.map_err(|_| SessionClosed)
    }

    pub async fn toggle_video(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::ToggleVideo).await
    }

    pub async fn toggle_audio(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::ToggleAudio).await
    }

    pub async fn toggle_screen_share(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::ToggleScreenShare).await
    }

    pub async fn send_chat(&self, body: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(SessionCommand::SendChat(body.into())).await
    }

    pub async fn mark_chat_seen(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::MarkChatSeen).await
    }

    pub async fn gesture(&self, intent: GestureIntent) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Gesture(intent)).await
    }

    pub async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), SessionClosed> {
        self.gesture(GestureIntent::SetMicrophoneEnabled(enabled))
            .await
    }

    pub async fn moment_captured(&self, caption: impl Into<String>) -> Result<(), SessionClosed> {
        self.gesture(GestureIntent::MomentCaptured(caption.into()))
            .await
    }

    pub async fn publish_frame(&self, image: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(SessionCommand::PublishFrame(image.into())).await
    }

    /// Leaves the room and waits for teardown to finish.
    pub async fn leave(&self) -> Result<SessionView, SessionClosed> {
        // A session that is already gone has nothing left to tear down.
        let _ = self.send(SessionCommand::Leave).await;
        self.wait_for(|v| v.ended).await
    }
}
