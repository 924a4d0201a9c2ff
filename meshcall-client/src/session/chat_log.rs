use meshcall_core::{ChatMessage, ParticipantId};

/// Append-only room chat with an unseen counter.
#[derive(Debug, Default, Clone)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
    unseen: usize,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message the local participant sent.
    pub fn push_local(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Records a message from the relay. The relay's echo of a local message
    /// is skipped. Returns whether the message was appended.
    pub fn receive(&mut self, message: ChatMessage, local_id: &ParticipantId) -> bool {
        if &message.sender_id == local_id {
            return false;
        }
        self.messages.push(message);
        self.unseen += 1;
        true
    }

    pub fn mark_seen(&mut self) {
        self.unseen = 0;
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn unseen(&self) -> usize {
        self.unseen
    }
}
