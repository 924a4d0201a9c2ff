//! Integration tests for meshcall-client.
//!
//! Tests are organized by functionality:
//! - `channel_tests` - the WebSocket relay channel against an in-process relay
//! - `membership_tests` - roster reconciliation and departures
//! - `negotiation_tests` - offer/answer/ICE sequencing and failure isolation
//! - `session_tests` - end-to-end meeting scenarios, chat, media and gestures

pub mod membership_tests;
pub mod negotiation_tests;

use meshcall_client::{MeetingSession, SessionConfig, SessionHandle, SessionNotice};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Level;

use crate::utils::{LoopbackRelay, MockMediaDevices, MockTransportFactory};

/// Initialize tracing for tests (call once per test).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Session settings that never touch the network.
pub fn test_config(display_name: &str) -> SessionConfig {
    SessionConfig {
        display_name: display_name.to_owned(),
        ice_servers: vec![],
        gestures: vec![],
        ..Default::default()
    }
}

/// A running session plus the doubles it was built with.
pub struct TestParticipant {
    pub handle: SessionHandle,
    pub notices: mpsc::UnboundedReceiver<SessionNotice>,
    pub factory: MockTransportFactory,
    pub devices: MockMediaDevices,
}

/// Joins `relay` as `id` with fresh mock transports and devices.
pub async fn join_session(relay: &LoopbackRelay, id: &str, name: &str) -> TestParticipant {
    join_session_with(
        relay,
        id,
        name,
        MockMediaDevices::new(),
        MockTransportFactory::new(),
    )
    .await
}

pub async fn join_session_with(
    relay: &LoopbackRelay,
    id: &str,
    name: &str,
    devices: MockMediaDevices,
    factory: MockTransportFactory,
) -> TestParticipant {
    let (channel, events) = relay.join(id, name).await;
    let (handle, notices) = MeetingSession::start(
        &test_config(name),
        Box::new(channel),
        events,
        Arc::new(devices.clone()),
        Arc::new(factory.clone()),
    )
    .await;

    TestParticipant {
        handle,
        notices,
        factory,
        devices,
    }
}
