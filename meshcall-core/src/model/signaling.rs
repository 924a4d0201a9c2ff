use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

/// Browser-shaped session description: `{"type": "offer", "sdp": "v=0..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Browser-shaped ICE candidate (`RTCIceCandidate.toJSON()`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    SdpOffer,
    SdpAnswer,
    IceCandidate,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalKind::SdpOffer => "sdp-offer",
            SignalKind::SdpAnswer => "sdp-answer",
            SignalKind::IceCandidate => "ice-candidate",
        };
        f.write_str(name)
    }
}

/// Signal routed peer-to-peer through the relay.
///
/// On the wire it is the legacy JSON string payload carrying exactly one of
/// `sdp` or `ice`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalEnvelope {
    Sdp(SessionDescription),
    Ice(IceCandidate),
}

impl SignalEnvelope {
    /// Classifies the envelope. Pranswer and rollback descriptions are reported
    /// by their SDP type and are not valid negotiation steps.
    pub fn kind(&self) -> Option<SignalKind> {
        match self {
            SignalEnvelope::Sdp(desc) => match desc.sdp_type {
                SdpType::Offer => Some(SignalKind::SdpOffer),
                SdpType::Answer => Some(SignalKind::SdpAnswer),
                SdpType::Pranswer | SdpType::Rollback => None,
            },
            SignalEnvelope::Ice(_) => Some(SignalKind::IceCandidate),
        }
    }

    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_payload(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}
