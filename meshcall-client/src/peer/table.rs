use crate::error::{ConfigurationError, TransportError};
use crate::media::{LocalTrack, RemoteStream};
use crate::transport::{PeerTransport, TransportContext, TransportEvent, TransportFactory};
use meshcall_core::{ConnectionState, IceCandidate, ParticipantId};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Offer/answer progress of one peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegotiationState {
    #[default]
    New,
    HaveLocalOffer,
    HaveRemoteOffer,
    Stable,
}

impl NegotiationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NegotiationState::New => "new",
            NegotiationState::HaveLocalOffer => "have-local-offer",
            NegotiationState::HaveRemoteOffer => "have-remote-offer",
            NegotiationState::Stable => "stable",
        }
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection to one remote participant.
pub struct PeerEntry {
    id: ParticipantId,
    generation: u64,
    transport: Box<dyn PeerTransport>,
    offer_created: bool,
    pub(crate) negotiation: NegotiationState,
    pub(crate) remote_description_set: bool,
    pub(crate) pending_candidates: Vec<IceCandidate>,
    pub(crate) remote_stream: Option<RemoteStream>,
    pub(crate) connection_state: ConnectionState,
}

impl PeerEntry {
    pub fn id(&self) -> &ParticipantId {
        &self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn transport(&self) -> &dyn PeerTransport {
        self.transport.as_ref()
    }

    pub fn offer_created(&self) -> bool {
        self.offer_created
    }

    /// Flags the entry as offered. Returns `false` if it already was; the flag
    /// is never reset.
    pub fn mark_offer_created(&mut self) -> bool {
        !std::mem::replace(&mut self.offer_created, true)
    }

    pub fn negotiation(&self) -> NegotiationState {
        self.negotiation
    }

    pub fn remote_description_set(&self) -> bool {
        self.remote_description_set
    }

    pub fn pending_candidates(&self) -> &[IceCandidate] {
        &self.pending_candidates
    }

    pub fn remote_stream(&self) -> Option<&RemoteStream> {
        self.remote_stream.as_ref()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }
}

impl fmt::Debug for PeerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerEntry")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("offer_created", &self.offer_created)
            .field("negotiation", &self.negotiation)
            .field("pending_candidates", &self.pending_candidates.len())
            .field("connection_state", &self.connection_state)
            .finish()
    }
}

/// All live peer connections of a session, keyed by participant id.
pub struct PeerConnectionTable {
    entries: HashMap<ParticipantId, PeerEntry>,
    factory: Arc<dyn TransportFactory>,
    events: mpsc::UnboundedSender<TransportEvent>,
    next_generation: u64,
}

impl PeerConnectionTable {
    pub fn new(
        factory: Arc<dyn TransportFactory>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Self {
        Self {
            entries: HashMap::new(),
            factory,
            events,
            next_generation: 1,
        }
    }

    /// Returns the entry for `id`, creating its transport and attaching
    /// `local_tracks` if there is none yet.
    pub async fn ensure(
        &mut self,
        id: &ParticipantId,
        local_tracks: &[LocalTrack],
    ) -> Result<&mut PeerEntry, ConfigurationError> {
        let slot = match self.entries.entry(id.clone()) {
            Entry::Occupied(entry) => return Ok(entry.into_mut()),
            Entry::Vacant(slot) => slot,
        };

        let generation = self.next_generation;
        self.next_generation += 1;

        let ctx = TransportContext {
            peer: id.clone(),
            generation,
            events: self.events.clone(),
        };
        let transport = self
            .factory
            .create(ctx)
            .await
            .map_err(|source| ConfigurationError::Transport {
                peer: id.clone(),
                source,
            })?;

        for track in local_tracks {
            if let Err(source) = transport.add_track(track).await {
                if let Err(e) = transport.close().await {
                    warn!(peer = %id, "Error while closing transport: {}", e);
                }
                return Err(ConfigurationError::Transport {
                    peer: id.clone(),
                    source,
                });
            }
        }

        info!(peer = %id, generation, tracks = local_tracks.len(), "Peer connection created");

        Ok(slot.insert(PeerEntry {
            id: id.clone(),
            generation,
            transport,
            offer_created: false,
            negotiation: NegotiationState::New,
            remote_description_set: false,
            pending_candidates: Vec::new(),
            remote_stream: None,
            connection_state: ConnectionState::New,
        }))
    }

    /// Closes and discards the entry. Returns `false` if there was none.
    pub async fn remove(&mut self, id: &ParticipantId) -> bool {
        let Some(entry) = self.entries.remove(id) else {
            return false;
        };
        if let Err(e) = entry.transport.close().await {
            warn!(peer = %id, "Error while closing transport: {}", e);
        }
        info!(peer = %id, generation = entry.generation, "Peer connection removed");
        true
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&PeerEntry> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &ParticipantId) -> Option<&mut PeerEntry> {
        self.entries.get_mut(id)
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.entries.contains_key(id)
    }

    /// Ids of all entries, sorted.
    pub fn ids(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<_> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an event tagged with `generation` still belongs to the live
    /// entry for `id`.
    pub fn is_current(&self, id: &ParticipantId, generation: u64) -> bool {
        self.entries
            .get(id)
            .is_some_and(|entry| entry.generation == generation)
    }

    /// Swaps the outgoing track of the same kind on every transport.
    pub async fn replace_track_all(
        &self,
        track: &LocalTrack,
    ) -> Vec<(ParticipantId, TransportError)> {
        let mut failures = Vec::new();
        for entry in self.entries.values() {
            if let Err(e) = entry.transport.replace_track(track).await {
                failures.push((entry.id.clone(), e));
            }
        }
        failures
    }

    pub async fn close_all(&mut self) {
        for (id, entry) in self.entries.drain() {
            if let Err(e) = entry.transport.close().await {
                warn!(peer = %id, "Error while closing transport: {}", e);
            }
        }
        debug!("All peer connections closed");
    }
}
