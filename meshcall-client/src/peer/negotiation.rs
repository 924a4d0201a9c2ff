use crate::channel::RendezvousChannel;
use crate::error::{ConfigurationError, NegotiationError};
use crate::peer::{NegotiationState, PeerConnectionTable, PeerEntry};
use meshcall_core::{ParticipantId, SessionDescription, SignalEnvelope, SignalKind};
use tracing::{debug, info, warn};

/// Drives the offer/answer/ICE state machine of every peer entry.
///
/// Only the participant a roster snapshot announces as newly joined sends
/// offers; everybody else answers. Two sides therefore never offer to each
/// other at the same time.
#[derive(Debug, Default, Clone, Copy)]
pub struct NegotiationEngine;

impl NegotiationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Sends an offer to every member of the snapshot that has not been
    /// offered yet, if the snapshot announces the local participant.
    ///
    /// Failures are per peer and returned; the other peers are still offered.
    pub async fn initiate_offers(
        &self,
        table: &mut PeerConnectionTable,
        channel: &dyn RendezvousChannel,
        local_id: &ParticipantId,
        joined_id: &ParticipantId,
        members: &[ParticipantId],
    ) -> Vec<NegotiationError> {
        let mut errors = Vec::new();
        if joined_id != local_id {
            return errors;
        }

        for member in members.iter().filter(|m| *m != local_id) {
            let Some(entry) = table.get_mut(member) else {
                continue;
            };
            // Flag first: a second snapshot must not produce a second offer.
            if !entry.mark_offer_created() {
                continue;
            }
            if let Err(e) = send_offer(entry, channel).await {
                errors.push(e);
            }
        }
        errors
    }

    /// Applies one inbound signal from `from`.
    pub async fn handle_signal(
        &self,
        table: &mut PeerConnectionTable,
        channel: &dyn RendezvousChannel,
        from: &ParticipantId,
        envelope: SignalEnvelope,
    ) -> Result<(), NegotiationError> {
        let entry = table
            .get_mut(from)
            .ok_or_else(|| NegotiationError::UnknownPeer(from.clone()))?;

        let Some(kind) = envelope.kind() else {
            return Err(NegotiationError::MalformedPayload {
                from: from.clone(),
                reason: "unsupported description type".to_owned(),
            });
        };

        match (kind, envelope) {
            (SignalKind::SdpOffer, SignalEnvelope::Sdp(offer)) => {
                handle_offer(entry, channel, offer).await
            }
            (SignalKind::SdpAnswer, SignalEnvelope::Sdp(answer)) => {
                handle_answer(entry, answer).await
            }
            (_, SignalEnvelope::Ice(candidate)) => {
                if entry.remote_description_set {
                    if let Err(e) = entry.transport().add_ice_candidate(candidate).await {
                        warn!(peer = %from, "Dropping ICE candidate: {}", e);
                    }
                } else {
                    debug!(peer = %from, "Buffering ICE candidate until remote description is set");
                    entry.pending_candidates.push(candidate);
                }
                Ok(())
            }
            (kind, _) => Err(NegotiationError::MalformedPayload {
                from: from.clone(),
                reason: format!("{kind} does not match its payload"),
            }),
        }
    }
}

async fn send_offer(
    entry: &mut PeerEntry,
    channel: &dyn RendezvousChannel,
) -> Result<(), NegotiationError> {
    let peer = entry.id().clone();

    let offer = entry
        .transport()
        .create_offer()
        .await
        .map_err(|source| ConfigurationError::CreateDescription {
            peer: peer.clone(),
            source,
        })?;
    entry
        .transport()
        .set_local_description(offer.clone())
        .await
        .map_err(|source| ConfigurationError::LocalDescriptionRejected {
            peer: peer.clone(),
            source,
        })?;
    entry.negotiation = NegotiationState::HaveLocalOffer;

    channel
        .send_signal(&peer, &SignalEnvelope::Sdp(offer))
        .await
        .map_err(|source| NegotiationError::Send { to: peer.clone(), source })?;

    info!(%peer, "Sent offer");
    Ok(())
}

async fn handle_offer(
    entry: &mut PeerEntry,
    channel: &dyn RendezvousChannel,
    offer: SessionDescription,
) -> Result<(), NegotiationError> {
    let peer = entry.id().clone();

    if matches!(
        entry.negotiation,
        NegotiationState::HaveLocalOffer | NegotiationState::HaveRemoteOffer
    ) {
        return Err(NegotiationError::UnexpectedSignal {
            from: peer,
            kind: "sdp-offer",
            state: entry.negotiation.as_str(),
        });
    }

    entry
        .transport()
        .set_remote_description(offer)
        .await
        .map_err(|source| NegotiationError::RemoteDescriptionRejected {
            from: peer.clone(),
            source,
        })?;
    entry.remote_description_set = true;
    entry.negotiation = NegotiationState::HaveRemoteOffer;
    flush_candidates(entry).await;

    let answer = entry
        .transport()
        .create_answer()
        .await
        .map_err(|source| ConfigurationError::CreateDescription {
            peer: peer.clone(),
            source,
        })?;
    entry
        .transport()
        .set_local_description(answer.clone())
        .await
        .map_err(|source| ConfigurationError::LocalDescriptionRejected {
            peer: peer.clone(),
            source,
        })?;
    entry.negotiation = NegotiationState::Stable;

    channel
        .send_signal(&peer, &SignalEnvelope::Sdp(answer))
        .await
        .map_err(|source| NegotiationError::Send { to: peer.clone(), source })?;

    info!(%peer, "Answered offer");
    Ok(())
}

async fn handle_answer(
    entry: &mut PeerEntry,
    answer: SessionDescription,
) -> Result<(), NegotiationError> {
    let peer = entry.id().clone();

    if entry.negotiation != NegotiationState::HaveLocalOffer {
        return Err(NegotiationError::UnexpectedSignal {
            from: peer,
            kind: "sdp-answer",
            state: entry.negotiation.as_str(),
        });
    }

    entry
        .transport()
        .set_remote_description(answer)
        .await
        .map_err(|source| NegotiationError::RemoteDescriptionRejected {
            from: peer.clone(),
            source,
        })?;
    entry.remote_description_set = true;
    entry.negotiation = NegotiationState::Stable;
    flush_candidates(entry).await;

    info!(%peer, "Negotiation complete");
    Ok(())
}

async fn flush_candidates(entry: &mut PeerEntry) {
    let pending = std::mem::take(&mut entry.pending_candidates);
    if pending.is_empty() {
        return;
    }
    debug!(peer = %entry.id(), count = pending.len(), "Applying buffered ICE candidates");
    for candidate in pending {
        if let Err(e) = entry.transport().add_ice_candidate(candidate).await {
            warn!(peer = %entry.id(), "Dropping buffered ICE candidate: {}", e);
        }
    }
}
