use crate::channel::{RelayEvent, RendezvousChannel, relay_event};
use crate::error::ChannelError;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use meshcall_core::{ClientMessage, ParticipantId, ServerMessage, SignalEnvelope};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

const EVENT_QUEUE: usize = 256;

/// Relay session over a WebSocket.
pub struct WsRendezvous {
    local_id: ParticipantId,
    outbound: mpsc::UnboundedSender<Message>,
    closed: Arc<AtomicBool>,
    recv_task: AbortHandle,
}

impl WsRendezvous {
    /// Opens the relay session and joins `room`.
    ///
    /// Returns once the relay has assigned the local id. Frames the relay sends
    /// before its `welcome` are kept and delivered first on the event queue.
    pub async fn connect(
        relay_url: &str,
        room: &str,
        display_name: &str,
        connect_timeout: Duration,
    ) -> Result<(Self, mpsc::Receiver<RelayEvent>), ChannelError> {
        let deadline = Instant::now() + connect_timeout;

        let (ws, _) = tokio::time::timeout_at(deadline, connect_async(relay_url))
            .await
            .map_err(|_| ChannelError::Timeout)?
            .map_err(|e| ChannelError::Unreachable(e.to_string()))?;
        info!(url = relay_url, "Connected to relay");

        let (mut sink, mut stream) = ws.split();

        let join = encode(&ClientMessage::Join {
            room: room.to_owned(),
            display_name: display_name.to_owned(),
        })?;
        sink.send(Message::Text(join))
            .await
            .map_err(|e| ChannelError::Unreachable(e.to_string()))?;

        // Handshake: wait for welcome / rejected
        let mut early = Vec::new();
        let local_id = loop {
            let frame = tokio::time::timeout_at(deadline, stream.next())
                .await
                .map_err(|_| ChannelError::Timeout)?;

            let text = match frame {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(_))) | None => {
                    return Err(ChannelError::Unreachable(
                        "relay closed the connection before welcome".to_owned(),
                    ));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(ChannelError::Unreachable(e.to_string())),
            };

            match serde_json::from_str::<ServerMessage>(&text) {
                Ok(ServerMessage::Welcome { participant_id }) => break participant_id,
                Ok(ServerMessage::Rejected { reason }) => {
                    return Err(ChannelError::Rejected(reason));
                }
                Ok(msg) => early.extend(relay_event(msg)),
                Err(e) => return Err(ChannelError::Protocol(e.to_string())),
            }
        };
        info!(%local_id, room, "Joined room");

        let (event_tx, event_rx) = mpsc::channel(early.len().max(EVENT_QUEUE));
        if !early.is_empty() {
            debug!(count = early.len(), "Replaying frames received before welcome");
        }
        for event in early {
            if let Err(e) = event_tx.try_send(event) {
                warn!("Dropped early relay event: {}", e);
            }
        }

        let closed = Arc::new(AtomicBool::new(false));

        // Send loop: owns the sink
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let is_close = matches!(msg, Message::Close(_));
                if let Err(e) = sink.send(msg).await {
                    warn!("Failed to write to relay: {}", e);
                    break;
                }
                if is_close {
                    break;
                }
            }
            let _ = sink.close().await;
            debug!("Relay send loop finished");
        });

        // Receive loop: owns the event sender, dropping it signals relay loss
        let recv_closed = closed.clone();
        let recv_task = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                if recv_closed.load(Ordering::Acquire) {
                    break;
                }
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(msg) => {
                            let Some(event) = relay_event(msg) else {
                                continue;
                            };
                            if event_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Dropping undecodable relay frame: {}", e),
                    },
                    Ok(Message::Close(_)) => {
                        info!("Relay closed the connection");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("Relay connection error: {}", e);
                        break;
                    }
                }
            }
            debug!("Relay receive loop finished");
        });

        let channel = Self {
            local_id,
            outbound,
            closed,
            recv_task: recv_task.abort_handle(),
        };
        Ok((channel, event_rx))
    }

    fn send_message(&self, msg: &ClientMessage) -> Result<(), ChannelError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ChannelError::Closed);
        }
        let text = encode(msg)?;
        self.outbound
            .send(Message::Text(text))
            .map_err(|_| ChannelError::Closed)
    }
}

#[async_trait]
impl RendezvousChannel for WsRendezvous {
    fn local_id(&self) -> &ParticipantId {
        &self.local_id
    }

    async fn send_signal(
        &self,
        to: &ParticipantId,
        envelope: &SignalEnvelope,
    ) -> Result<(), ChannelError> {
        let payload = envelope
            .to_payload()
            .map_err(|e| ChannelError::Protocol(e.to_string()))?;
        self.send_message(&ClientMessage::Signal {
            to: to.clone(),
            payload,
        })
    }

    async fn send_chat(&self, body: &str, sender_name: &str) -> Result<(), ChannelError> {
        self.send_message(&ClientMessage::Chat {
            body: body.to_owned(),
            sender_name: sender_name.to_owned(),
        })
    }

    async fn leave(&self) -> Result<(), ChannelError> {
        let result = self.send_message(&ClientMessage::Leave);
        self.closed.store(true, Ordering::Release);
        let _ = self.outbound.send(Message::Close(None));
        self.recv_task.abort();
        info!(local_id = %self.local_id, "Left relay session");
        result
    }
}

impl Drop for WsRendezvous {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

fn encode(msg: &ClientMessage) -> Result<String, ChannelError> {
    serde_json::to_string(msg).map_err(|e| ChannelError::Protocol(e.to_string()))
}
