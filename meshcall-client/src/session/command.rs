use crate::gesture::GestureIntent;

/// User and gesture intents sent to the session loop through a
/// [`crate::session::SessionHandle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    ToggleVideo,
    ToggleAudio,
    ToggleScreenShare,
    SendChat(String),
    MarkChatSeen,
    Gesture(GestureIntent),
    /// Fans a preview frame out to the gesture recognizers.
    PublishFrame(String),
    Leave,
}
