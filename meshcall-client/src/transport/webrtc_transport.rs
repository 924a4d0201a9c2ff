use crate::error::TransportError;
use crate::media::{LocalTrack, RemoteTrack};
use crate::transport::{
    PeerTransport, TransportConfig, TransportContext, TransportEvent, TransportFactory,
};
use async_trait::async_trait;
use meshcall_core::{
    ConnectionState, IceCandidate, IceServerConfig, ParticipantId, SdpType, SessionDescription,
    TrackKind,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use webrtc::track::track_remote::TrackRemote;

/// Peer transport backed by a `webrtc` crate `RTCPeerConnection`.
pub struct WebRtcTransport {
    peer: ParticipantId,
    peer_connection: Arc<RTCPeerConnection>,
    senders: Mutex<HashMap<TrackKind, Arc<RTCRtpSender>>>,
}

impl WebRtcTransport {
    /// Builds the connection and wires its callbacks into `ctx.events`.
    pub async fn new(ctx: TransportContext, config: &TransportConfig) -> Result<Self, TransportError> {
        // 1. Codecs and RTCP interceptors
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        // 2. STUN/TURN
        let rtc_config = RTCConfiguration {
            ice_servers: config.ice_servers.iter().map(to_rtc_ice_server).collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        // 3. Callbacks. Each closure owns its own clone of the sender and id.
        let state_tx = ctx.events.clone();
        let uid_state = ctx.peer.clone();
        let generation = ctx.generation;
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let uid = uid_state.clone();

                Box::pin(async move {
                    info!(peer = %uid, state = ?s, "Peer connection state changed");
                    let _ = tx.send(TransportEvent::StateChanged {
                        peer: uid,
                        generation,
                        state: connection_state(s),
                    });
                })
            },
        ));

        let ice_tx = ctx.events.clone();
        let uid_ice = ctx.peer.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let uid = uid_ice.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let candidate = IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                };
                let _ = tx.send(TransportEvent::CandidateGenerated {
                    peer: uid,
                    generation,
                    candidate,
                });
            })
        }));

        let track_tx = ctx.events.clone();
        let uid_track = ctx.peer.clone();
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();
                let uid = uid_track.clone();

                Box::pin(async move {
                    let kind = match track.kind() {
                        RTPCodecType::Audio => TrackKind::Audio,
                        _ => TrackKind::Video,
                    };
                    debug!(peer = %uid, ?kind, "Remote track received");

                    let remote = RemoteTrack {
                        id: track.id(),
                        kind,
                        stream_id: track.stream_id(),
                        rtc: Some(track),
                    };
                    let _ = tx.send(TransportEvent::TrackReceived {
                        peer: uid,
                        generation,
                        track: remote,
                    });
                })
            },
        ));

        Ok(Self {
            peer: ctx.peer,
            peer_connection,
            senders: Mutex::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl PeerTransport for WebRtcTransport {
    async fn add_track(&self, track: &LocalTrack) -> Result<(), TransportError> {
        let sender = self.peer_connection.add_track(track.rtc_track()).await?;

        // RTCP has to be drained for the interceptors to work.
        let rtcp_sender = sender.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while rtcp_sender.read(&mut buf).await.is_ok() {}
        });

        self.senders.lock().await.insert(track.kind(), sender);
        Ok(())
    }

    async fn replace_track(&self, track: &LocalTrack) -> Result<(), TransportError> {
        let senders = self.senders.lock().await;
        let Some(sender) = senders.get(&track.kind()) else {
            return Err(TransportError::Other(format!(
                "no outgoing {:?} track to replace for {}",
                track.kind(),
                self.peer
            )));
        };
        sender.replace_track(Some(track.rtc_track())).await?;
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, TransportError> {
        // Without local tracks the offer would carry no media sections at all.
        if self.senders.lock().await.is_empty() {
            for kind in [RTPCodecType::Audio, RTPCodecType::Video] {
                self.peer_connection
                    .add_transceiver_from_kind(
                        kind,
                        Some(RTCRtpTransceiverInit {
                            direction: RTCRtpTransceiverDirection::Recvonly,
                            send_encodings: vec![],
                        }),
                    )
                    .await?;
            }
        }

        let offer = self.peer_connection.create_offer(None).await?;
        from_rtc_description(offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        let answer = self.peer_connection.create_answer(None).await?;
        from_rtc_description(answer)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), TransportError> {
        self.peer_connection
            .set_local_description(to_rtc_description(desc)?)
            .await?;
        Ok(())
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), TransportError> {
        self.peer_connection
            .set_remote_description(to_rtc_description(desc)?)
            .await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

/// Creates a [`WebRtcTransport`] per remote participant.
pub struct WebRtcTransportFactory {
    config: RwLock<TransportConfig>,
}

impl WebRtcTransportFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }
}

impl Default for WebRtcTransportFactory {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

#[async_trait]
impl TransportFactory for WebRtcTransportFactory {
    async fn create(&self, ctx: TransportContext) -> Result<Box<dyn PeerTransport>, TransportError> {
        let config = self.config.read().await.clone();
        let transport = WebRtcTransport::new(ctx, &config).await?;
        Ok(Box::new(transport))
    }

    async fn update_ice_servers(&self, ice_servers: Vec<IceServerConfig>) {
        if ice_servers.is_empty() {
            warn!("Ignoring empty ICE server list from relay");
            return;
        }
        self.config.write().await.ice_servers = ice_servers;
    }
}

fn to_rtc_ice_server(server: &IceServerConfig) -> RTCIceServer {
    RTCIceServer {
        urls: server.urls.clone(),
        username: server.username.clone().unwrap_or_default(),
        credential: server.credential.clone().unwrap_or_default(),
        ..Default::default()
    }
}

fn to_rtc_description(desc: SessionDescription) -> Result<RTCSessionDescription, TransportError> {
    let rtc = match desc.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp)?,
        SdpType::Pranswer => RTCSessionDescription::pranswer(desc.sdp)?,
        SdpType::Rollback => {
            return Err(TransportError::InvalidDescription(
                "rollback is not supported".to_owned(),
            ));
        }
    };
    Ok(rtc)
}

fn from_rtc_description(desc: RTCSessionDescription) -> Result<SessionDescription, TransportError> {
    let sdp_type = match desc.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        RTCSdpType::Unspecified => {
            return Err(TransportError::InvalidDescription(
                "unspecified sdp type".to_owned(),
            ));
        }
    };
    Ok(SessionDescription {
        sdp_type,
        sdp: desc.sdp,
    })
}

fn connection_state(state: RTCPeerConnectionState) -> ConnectionState {
    match state {
        RTCPeerConnectionState::Unspecified | RTCPeerConnectionState::New => ConnectionState::New,
        RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
        RTCPeerConnectionState::Connected => ConnectionState::Connected,
        RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
        RTCPeerConnectionState::Failed => ConnectionState::Failed,
        RTCPeerConnectionState::Closed => ConnectionState::Closed,
    }
}
