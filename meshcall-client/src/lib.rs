pub mod channel;
pub mod config;
pub mod error;
pub mod gesture;
pub mod media;
pub mod peer;
pub mod session;
pub mod transport;

pub use channel::{RelayEvent, RendezvousChannel, WsRendezvous};
pub use config::{BackoffConfig, GestureEndpoint, SessionConfig};
pub use error::*;
pub use gesture::{GestureHub, GestureIntent};
pub use media::{LocalStream, LocalTrack, MediaDevices, ScreenCapture, SyntheticMediaDevices};
pub use peer::{MembershipReconciler, NegotiationEngine, PeerConnectionTable, RosterDelta};
pub use session::{MeetingSession, SessionHandle, SessionNotice, SessionView};
pub use transport::{PeerTransport, TransportConfig, TransportFactory, WebRtcTransportFactory};
