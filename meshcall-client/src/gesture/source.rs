use crate::config::{BackoffConfig, GestureEndpoint};
use crate::gesture::{GestureEvent, GestureIntent, parse_gesture_event};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Frames waiting for a slow recognizer are dropped beyond this.
const FRAME_BUFFER: usize = 4;

struct GestureSource {
    name: String,
    frames: mpsc::Sender<String>,
    task: JoinHandle<()>,
}

/// Connections to the gesture recognizers, one independent task each.
///
/// A source that drops its connection reconnects on its own with
/// exponential backoff; the others are unaffected.
pub struct GestureHub {
    sources: Vec<GestureSource>,
}

impl GestureHub {
    pub fn spawn(
        endpoints: &[GestureEndpoint],
        backoff: BackoffConfig,
        intents: mpsc::Sender<GestureIntent>,
    ) -> Self {
        let sources = endpoints
            .iter()
            .map(|endpoint| {
                let (frames, frames_rx) = mpsc::channel(FRAME_BUFFER);
                let task = tokio::spawn(run_source(
                    endpoint.clone(),
                    backoff,
                    intents.clone(),
                    frames_rx,
                ));
                GestureSource {
                    name: endpoint.name.clone(),
                    frames,
                    task,
                }
            })
            .collect();

        Self { sources }
    }

    /// Offers a frame to every recognizer. Returns how many accepted it.
    pub fn publish_frame(&self, image: &str) -> usize {
        self.sources
            .iter()
            .filter(|source| match source.frames.try_send(image.to_owned()) {
                Ok(()) => true,
                Err(_) => {
                    debug!(source = %source.name, "Frame dropped");
                    false
                }
            })
            .count()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn shutdown(&mut self) {
        for source in self.sources.drain(..) {
            source.task.abort();
        }
    }
}

impl Drop for GestureHub {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_source(
    endpoint: GestureEndpoint,
    backoff: BackoffConfig,
    intents: mpsc::Sender<GestureIntent>,
    mut frames: mpsc::Receiver<String>,
) {
    let mut attempt = 0u32;

    loop {
        match connect_async(endpoint.url.as_str()).await {
            Ok((ws, _)) => {
                info!(source = %endpoint.name, url = %endpoint.url, "Gesture source connected");
                attempt = 0;

                let (mut sink, mut stream) = ws.split();
                loop {
                    tokio::select! {
                        frame = stream.next() => match frame {
                            Some(Ok(Message::Text(text))) => match parse_gesture_event(&text) {
                                Ok(Some(intent)) => {
                                    if intents.send(intent).await.is_err() {
                                        return;
                                    }
                                }
                                Ok(None) => {}
                                Err(e) => debug!(source = %endpoint.name, "Undecodable gesture event: {}", e),
                            },
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                warn!(source = %endpoint.name, "Gesture source error: {}", e);
                                break;
                            }
                        },

                        image = frames.recv() => {
                            let Some(image) = image else { return };
                            let Ok(text) = serde_json::to_string(&GestureEvent::frame(&image)) else {
                                continue;
                            };
                            if sink.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                info!(source = %endpoint.name, "Gesture source disconnected");
            }
            Err(e) => {
                debug!(source = %endpoint.name, "Gesture source unreachable: {}", e);
            }
        }

        if intents.is_closed() {
            return;
        }

        let delay = backoff.delay(attempt);
        attempt = attempt.saturating_add(1);

        // Frames published while disconnected are lost
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => break,
                image = frames.recv() => {
                    if image.is_none() {
                        return;
                    }
                }
            }
        }
    }
}
