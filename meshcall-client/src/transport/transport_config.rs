use meshcall_core::IceServerConfig;
use meshcall_core::utils::{
    DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2, DEFAULT_STUN_ADDR_3, DEFAULT_STUN_ADDR_4,
};

/// ICE configuration applied to every peer connection the client creates.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl TransportConfig {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self { ice_servers }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: vec![
                    DEFAULT_STUN_ADDR.to_owned(),
                    DEFAULT_STUN_ADDR_2.to_owned(),
                    DEFAULT_STUN_ADDR_3.to_owned(),
                    DEFAULT_STUN_ADDR_4.to_owned(),
                ],
                username: None,
                credential: None,
            }],
        }
    }
}
