use async_trait::async_trait;
use meshcall_client::{ChannelError, RelayEvent, RendezvousChannel};
use meshcall_core::{ParticipantId, SignalEnvelope, SignalKind};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// A signal routed through the relay.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayedSignal {
    pub from: ParticipantId,
    pub to: ParticipantId,
    pub envelope: SignalEnvelope,
}

impl RelayedSignal {
    pub fn kind(&self) -> Option<SignalKind> {
        self.envelope.kind()
    }
}

struct Member {
    id: ParticipantId,
    name: String,
    tx: mpsc::Sender<RelayEvent>,
}

#[derive(Default)]
struct RelayState {
    members: Vec<Member>,
    signals: Vec<RelayedSignal>,
}

impl RelayState {
    fn snapshot(&self, joined_id: &ParticipantId) -> RelayEvent {
        RelayEvent::RosterJoined {
            joined_id: joined_id.clone(),
            members: self.members.iter().map(|m| m.id.clone()).collect(),
            names: self
                .members
                .iter()
                .map(|m| (m.id.clone(), m.name.clone()))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn sender(&self, id: &ParticipantId) -> Option<mpsc::Sender<RelayEvent>> {
        self.members.iter().find(|m| &m.id == id).map(|m| m.tx.clone())
    }

    fn senders(&self) -> Vec<mpsc::Sender<RelayEvent>> {
        self.members.iter().map(|m| m.tx.clone()).collect()
    }
}

/// In-memory relay that behaves like the real one: every join is announced
/// to the whole room with a full roster snapshot, signals are routed to
/// their target and chat is echoed to everyone, sender included.
///
/// # Example
///
/// ```ignore
/// let relay = LoopbackRelay::new();
/// let (channel, events) = relay.join("a", "Ada").await;
///
/// // ... run a session over `channel` ...
///
/// let offers = relay.signals_of_kind(SignalKind::SdpOffer).await;
/// ```
#[derive(Clone, Default)]
pub struct LoopbackRelay {
    state: Arc<Mutex<RelayState>>,
}

impl LoopbackRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a member and broadcasts the new roster to the room.
    pub async fn join(&self, id: &str, name: &str) -> (MockRendezvous, mpsc::Receiver<RelayEvent>) {
        let id = ParticipantId::from(id);
        let (tx, rx) = mpsc::channel(256);

        let (snapshot, senders) = {
            let mut state = self.state.lock().await;
            state.members.push(Member {
                id: id.clone(),
                name: name.to_owned(),
                tx,
            });
            (state.snapshot(&id), state.senders())
        };
        for tx in senders {
            let _ = tx.send(snapshot.clone()).await;
        }

        let channel = MockRendezvous {
            id,
            relay: self.clone(),
        };
        (channel, rx)
    }

    /// Delivers a raw event to one member.
    pub async fn inject(&self, to: &str, event: RelayEvent) -> bool {
        let sender = self.state.lock().await.sender(&ParticipantId::from(to));
        match sender {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Re-delivers the roster snapshot announcing `joined_id` to everyone.
    pub async fn rebroadcast_roster(&self, joined_id: &str) {
        let (snapshot, senders) = {
            let state = self.state.lock().await;
            (
                state.snapshot(&ParticipantId::from(joined_id)),
                state.senders(),
            )
        };
        for tx in senders {
            let _ = tx.send(snapshot.clone()).await;
        }
    }

    /// Drops a member's connection without a leave: its event queue closes
    /// and the rest of the room sees it depart.
    pub async fn disconnect(&self, id: &str) {
        self.remove_member(&ParticipantId::from(id)).await;
    }

    pub async fn member_ids(&self) -> Vec<ParticipantId> {
        self.state
            .lock()
            .await
            .members
            .iter()
            .map(|m| m.id.clone())
            .collect()
    }

    pub async fn signals(&self) -> Vec<RelayedSignal> {
        self.state.lock().await.signals.clone()
    }

    pub async fn signals_of_kind(&self, kind: SignalKind) -> Vec<RelayedSignal> {
        self.signals()
            .await
            .into_iter()
            .filter(|s| s.kind() == Some(kind))
            .collect()
    }

    pub async fn signals_between(&self, from: &str, to: &str) -> Vec<RelayedSignal> {
        self.signals()
            .await
            .into_iter()
            .filter(|s| s.from.as_str() == from && s.to.as_str() == to)
            .collect()
    }

    async fn remove_member(&self, id: &ParticipantId) -> bool {
        let senders = {
            let mut state = self.state.lock().await;
            let before = state.members.len();
            state.members.retain(|m| &m.id != id);
            if state.members.len() == before {
                return false;
            }
            state.senders()
        };
        for tx in senders {
            let _ = tx.send(RelayEvent::MemberLeft(id.clone())).await;
        }
        true
    }
}

/// One member's view of the [`LoopbackRelay`].
pub struct MockRendezvous {
    id: ParticipantId,
    relay: LoopbackRelay,
}

#[async_trait]
impl RendezvousChannel for MockRendezvous {
    fn local_id(&self) -> &ParticipantId {
        &self.id
    }

    async fn send_signal(
        &self,
        to: &ParticipantId,
        envelope: &SignalEnvelope,
    ) -> Result<(), ChannelError> {
        let target = {
            let mut state = self.relay.state.lock().await;
            if state.sender(&self.id).is_none() {
                return Err(ChannelError::Closed);
            }
            state.signals.push(RelayedSignal {
                from: self.id.clone(),
                to: to.clone(),
                envelope: envelope.clone(),
            });
            state.sender(to)
        };

        // The real relay silently drops signals to departed members
        if let Some(tx) = target {
            let _ = tx
                .send(RelayEvent::Signal {
                    from: self.id.clone(),
                    envelope: envelope.clone(),
                })
                .await;
        }
        Ok(())
    }

    async fn send_chat(&self, body: &str, sender_name: &str) -> Result<(), ChannelError> {
        let senders = {
            let state = self.relay.state.lock().await;
            if state.sender(&self.id).is_none() {
                return Err(ChannelError::Closed);
            }
            state.senders()
        };
        for tx in senders {
            let _ = tx
                .send(RelayEvent::ChatReceived {
                    sender_id: self.id.clone(),
                    sender_name: sender_name.to_owned(),
                    body: body.to_owned(),
                })
                .await;
        }
        Ok(())
    }

    async fn leave(&self) -> Result<(), ChannelError> {
        self.relay.remove_member(&self.id).await;
        Ok(())
    }
}
