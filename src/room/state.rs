//! The waiting-room state machine
//!
//! `WaitingRoom` is the sole owner of the tracked entries. Every operation
//! runs inside one critical section and returns the full ordered snapshot
//! taken inside that same section, so callers never need a separate read and
//! always observe a consistent list.

use crate::config::RoomSettings;
use crate::room::entry::WaitingEntry;
use crate::types::{MemberId, MemberRef};
use crate::utils::current_timestamp;
use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Timing constants and grace policy for a waiting room
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// How long a called member may stay away before the sweep evicts them
    pub call_grace: Duration,
    /// How long a departed member may stay away before the sweep evicts them
    pub leave_grace: Duration,
    /// Departures tolerated before a leave evicts the entry outright
    pub grace_leaves: u32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            call_grace: Duration::seconds(15),
            leave_grace: Duration::minutes(15),
            grace_leaves: 1,
        }
    }
}

impl From<&RoomSettings> for RoomConfig {
    fn from(settings: &RoomSettings) -> Self {
        Self {
            call_grace: Duration::seconds(settings.call_grace_seconds as i64),
            leave_grace: Duration::seconds(settings.leave_grace_seconds as i64),
            grace_leaves: settings.grace_leaves,
        }
    }
}

/// The ordered waiting list, keyed by member identity.
///
/// All mutation goes through the operations below; each is atomic with
/// respect to every other and none can fail for a well-formed identity --
/// operating on an untracked member is a no-op, never an error.
pub struct WaitingRoom {
    config: RoomConfig,
    entries: Mutex<HashMap<MemberId, WaitingEntry>>,
}

impl WaitingRoom {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Member entered the holding channel.
    ///
    /// Untracked members are inserted with a fresh `joined_at` and full
    /// grace; tracked members only have their flags cleared. The display
    /// name captured at first join is deliberately not refreshed by later
    /// joins.
    pub fn join(&self, member: MemberRef) -> Vec<WaitingEntry> {
        let mut entries = self.lock_entries();
        Self::apply_join(&mut entries, member, self.config.grace_leaves);
        Self::sorted_snapshot(&entries)
    }

    /// Member entered the active channel.
    ///
    /// Calling an untracked member never creates an entry; the unchanged
    /// snapshot is returned.
    pub fn call(&self, member_id: &MemberId) -> Vec<WaitingEntry> {
        let mut entries = self.lock_entries();
        Self::apply_call(&mut entries, member_id);
        Self::sorted_snapshot(&entries)
    }

    /// Member left both tracked channels.
    ///
    /// With grace to spare the entry stays, flagged as left; once grace is
    /// exhausted the next leave evicts it outright.
    pub fn leave(&self, member_id: &MemberId) -> Vec<WaitingEntry> {
        let mut entries = self.lock_entries();
        Self::apply_leave(&mut entries, member_id);
        Self::sorted_snapshot(&entries)
    }

    /// Evict every entry whose call-grace or leave-grace window has expired.
    ///
    /// This is the only path that removes a called-but-never-returned or
    /// left-and-never-returned member. Entries with neither flag set are
    /// untouched regardless of age.
    pub fn sweep(&self) -> Vec<WaitingEntry> {
        let now = current_timestamp();
        let mut entries = self.lock_entries();
        entries.retain(|_, entry| {
            let expired = self.call_grace_expired(entry, now) || self.leave_grace_expired(entry, now);
            if expired {
                debug!("Member {} exceeded grace period and is removed", entry);
            }
            !expired
        });
        Self::sorted_snapshot(&entries)
    }

    /// Reconcile tracked state against an authoritative membership snapshot.
    ///
    /// Used after a connectivity gap: everyone seen waiting is joined,
    /// everyone seen active is called (inserted first when untracked), and
    /// every tracked member in neither set goes through the usual leave
    /// rule. Active wins when a member unexpectedly appears in both sets.
    pub fn sync(&self, waiting: &[MemberRef], active: &[MemberRef]) -> Vec<WaitingEntry> {
        let mut entries = self.lock_entries();

        let mut seen: HashSet<MemberId> = HashSet::new();
        for member in waiting {
            seen.insert(member.id.clone());
            Self::apply_join(&mut entries, member.clone(), self.config.grace_leaves);
        }
        for member in active {
            seen.insert(member.id.clone());
            if !entries.contains_key(&member.id) {
                Self::apply_join(&mut entries, member.clone(), self.config.grace_leaves);
            }
            Self::apply_call(&mut entries, &member.id);
        }

        let absent: Vec<MemberId> = entries
            .keys()
            .filter(|id| !seen.contains(*id))
            .cloned()
            .collect();
        for member_id in &absent {
            Self::apply_leave(&mut entries, member_id);
        }

        debug!(
            "Synced against snapshot: {} waiting, {} active, {} absent",
            waiting.len(),
            active.len(),
            absent.len()
        );
        Self::sorted_snapshot(&entries)
    }

    /// Randomize future call order without discarding tracked state.
    ///
    /// Each entry gets a synthetic `joined_at` of now minus its shuffled
    /// rank in whole seconds, and its grace counter restored, producing a
    /// uniformly random total order under the usual ascending-`joined_at`
    /// sort.
    pub fn reset(&self) -> Vec<WaitingEntry> {
        let mut entries = self.lock_entries();
        debug!("Reset initialized");

        let mut member_ids: Vec<MemberId> = entries.keys().cloned().collect();
        member_ids.shuffle(&mut rand::thread_rng());

        let now = current_timestamp();
        for (rank, member_id) in member_ids.iter().enumerate() {
            if let Some(entry) = entries.get(member_id) {
                let joined_at = now - Duration::seconds(rank as i64);
                let reordered = entry.reordered(joined_at, self.config.grace_leaves);
                entries.insert(member_id.clone(), reordered);
            }
        }

        debug!("Reset complete");
        Self::sorted_snapshot(&entries)
    }

    /// Number of currently tracked members
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    fn apply_join(entries: &mut HashMap<MemberId, WaitingEntry>, member: MemberRef, grace: u32) {
        match entries.get(&member.id) {
            None => {
                let entry = WaitingEntry::new(member.clone(), current_timestamp(), grace);
                debug!("Added new member {}", entry);
                entries.insert(member.id, entry);
            }
            Some(existing) => {
                let entry = existing.returned();
                debug!("Removed flags for member {}", entry);
                entries.insert(member.id, entry);
            }
        }
    }

    fn apply_call(entries: &mut HashMap<MemberId, WaitingEntry>, member_id: &MemberId) {
        if let Some(existing) = entries.get(member_id) {
            let entry = existing.called(current_timestamp());
            debug!("Called member {}", entry);
            entries.insert(member_id.clone(), entry);
        }
    }

    fn apply_leave(entries: &mut HashMap<MemberId, WaitingEntry>, member_id: &MemberId) {
        if let Some(existing) = entries.get(member_id) {
            if existing.grace_leaves() > 0 {
                let entry = existing.departed(current_timestamp());
                debug!("Member {} left with grace", entry);
                entries.insert(member_id.clone(), entry);
            } else {
                debug!("Member {} left without grace", existing);
                entries.remove(member_id);
            }
        }
    }

    fn call_grace_expired(&self, entry: &WaitingEntry, now: DateTime<Utc>) -> bool {
        entry
            .called_at()
            .map(|called| now > called + self.config.call_grace)
            .unwrap_or(false)
    }

    fn leave_grace_expired(&self, entry: &WaitingEntry, now: DateTime<Utc>) -> bool {
        entry
            .left_at()
            .map(|left| now > left + self.config.leave_grace)
            .unwrap_or(false)
    }

    fn sorted_snapshot(entries: &HashMap<MemberId, WaitingEntry>) -> Vec<WaitingEntry> {
        let mut snapshot: Vec<WaitingEntry> = entries.values().cloned().collect();
        snapshot.sort_by_key(|entry| entry.joined_at());
        snapshot
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<MemberId, WaitingEntry>> {
        // A poisoned lock can only mean a panic mid-operation; the map is
        // still structurally valid, so keep serving.
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for WaitingRoom {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}
