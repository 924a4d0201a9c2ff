use crate::error::ConfigurationError;
use crate::media::LocalTrack;
use crate::peer::PeerConnectionTable;
use meshcall_core::ParticipantId;
use std::collections::HashSet;
use tracing::{debug, warn};

/// What has to change for the table to match a roster snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterDelta {
    /// Members without an entry, in roster order.
    pub to_create: Vec<ParticipantId>,
    /// Entries whose participant is no longer in the roster.
    pub to_remove: Vec<ParticipantId>,
}

impl RosterDelta {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_remove.is_empty()
    }

    /// Pure diff between the current entry ids and a roster.
    ///
    /// `excluded` members never get an entry created (peers whose local side
    /// failed to configure).
    pub fn between<'a>(
        existing: impl IntoIterator<Item = &'a ParticipantId>,
        local_id: &ParticipantId,
        members: &[ParticipantId],
        excluded: &HashSet<ParticipantId>,
    ) -> Self {
        let existing: HashSet<&ParticipantId> = existing.into_iter().collect();
        let roster: HashSet<&ParticipantId> = members.iter().collect();

        let mut seen = HashSet::new();
        let to_create = members
            .iter()
            .filter(|m| *m != local_id)
            .filter(|m| !existing.contains(m) && !excluded.contains(*m))
            .filter(|m| seen.insert(*m))
            .cloned()
            .collect();

        let mut to_remove: Vec<ParticipantId> = existing
            .into_iter()
            .filter(|id| !roster.contains(id))
            .cloned()
            .collect();
        to_remove.sort();

        Self {
            to_create,
            to_remove,
        }
    }
}

/// Keeps the peer table in line with the relay's roster.
#[derive(Debug, Default)]
pub struct MembershipReconciler {
    failed: HashSet<ParticipantId>,
}

impl MembershipReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reconcile(
        &self,
        table: &PeerConnectionTable,
        local_id: &ParticipantId,
        members: &[ParticipantId],
    ) -> RosterDelta {
        let ids = table.ids();
        RosterDelta::between(ids.iter(), local_id, members, &self.failed)
    }

    /// Removes stale entries, then creates missing ones. Creation failures are
    /// returned and the peer is excluded from later snapshots.
    pub async fn apply(
        &mut self,
        table: &mut PeerConnectionTable,
        delta: &RosterDelta,
        local_tracks: &[LocalTrack],
    ) -> Vec<ConfigurationError> {
        for id in &delta.to_remove {
            table.remove(id).await;
        }

        let mut errors = Vec::new();
        for id in &delta.to_create {
            if let Err(e) = table.ensure(id, local_tracks).await {
                warn!(peer = %id, "Failed to create peer connection: {}", e);
                self.failed.insert(id.clone());
                errors.push(e);
            }
        }
        debug!(
            created = delta.to_create.len() - errors.len(),
            removed = delta.to_remove.len(),
            "Roster applied"
        );
        errors
    }

    /// Excludes a peer from future snapshots after its configuration failed.
    pub fn mark_failed(&mut self, id: &ParticipantId) {
        self.failed.insert(id.clone());
    }

    pub fn is_failed(&self, id: &ParticipantId) -> bool {
        self.failed.contains(id)
    }

    /// Forgets a departed participant, so a later rejoin starts clean.
    pub fn forget(&mut self, id: &ParticipantId) {
        self.failed.remove(id);
    }
}
