use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a recognised gesture asks the session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureIntent {
    SetMicrophoneEnabled(bool),
    ReactionTriggered,
    CaptureRequested,
    RecordingStartRequested,
    RecordingStopRequested,
    /// OK sign seen; the UI should prompt for a caption.
    MomentDetected,
    /// The caption the user gave for a detected moment.
    MomentCaptured(String),
}

/// Raw event frame exchanged with a gesture recognizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureEvent {
    pub event: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl GestureEvent {
    /// Outbound video frame, fanned out to every recognizer.
    pub fn frame(image: &str) -> Self {
        Self {
            event: "frame".to_owned(),
            data: serde_json::json!({ "image": image }),
        }
    }

    /// Maps the event to a session intent. Unknown events yield `None`.
    pub fn intent(&self) -> Option<GestureIntent> {
        match self.event.as_str() {
            "mic-status" => {
                let status = self.data.get("status").and_then(Value::as_str)?;
                Some(GestureIntent::SetMicrophoneEnabled(status == "on"))
            }
            "pinky-reaction" => Some(GestureIntent::ReactionTriggered),
            "take-screenshot" => Some(GestureIntent::CaptureRequested),
            "start-recording" => Some(GestureIntent::RecordingStartRequested),
            "stop-recording" => Some(GestureIntent::RecordingStopRequested),
            "ok-sign-detected" => Some(GestureIntent::MomentDetected),
            _ => None,
        }
    }
}

/// Decodes one text frame from a recognizer.
pub fn parse_gesture_event(text: &str) -> Result<Option<GestureIntent>, serde_json::Error> {
    let event: GestureEvent = serde_json::from_str(text)?;
    Ok(event.intent())
}
