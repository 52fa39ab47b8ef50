//! Enrollment store — one record per (user, sequence) pair, forever.
//!
//! The map key is the composite pair, which makes the uniqueness constraint
//! a property of the storage layer rather than of the caller's
//! check-then-create: two racing enrollment attempts resolve to a single
//! record, and the loser receives the winner's record unchanged.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use nurture_core::types::{Enrollment, EnrollmentStatus};

pub struct EnrollmentStore {
    by_pair: DashMap<(Uuid, Uuid), Enrollment>,
    /// Secondary index: enrollment id -> (user_id, sequence_id).
    by_id: DashMap<Uuid, (Uuid, Uuid)>,
}

impl EnrollmentStore {
    pub fn new() -> Self {
        Self {
            by_pair: DashMap::new(),
            by_id: DashMap::new(),
        }
    }

    /// Insert an enrollment unless one already exists for the pair.
    ///
    /// Returns the stored record and whether this call created it. The
    /// existence check ignores status: an exited enrollment blocks
    /// re-creation just like an active one.
    pub fn insert_if_absent(&self, enrollment: Enrollment) -> (Enrollment, bool) {
        let key = (enrollment.user_id, enrollment.sequence_id);
        match self.by_pair.entry(key) {
            Entry::Occupied(occupied) => (occupied.get().clone(), false),
            Entry::Vacant(vacant) => {
                self.by_id.insert(enrollment.id, key);
                vacant.insert(enrollment.clone());
                (enrollment, true)
            }
        }
    }

    pub fn get(&self, user_id: &Uuid, sequence_id: &Uuid) -> Option<Enrollment> {
        self.by_pair
            .get(&(*user_id, *sequence_id))
            .map(|r| r.value().clone())
    }

    pub fn get_by_id(&self, id: &Uuid) -> Option<Enrollment> {
        let key = self.by_id.get(id).map(|r| *r.value())?;
        self.by_pair.get(&key).map(|r| r.value().clone())
    }

    pub fn for_user(&self, user_id: &Uuid) -> Vec<Enrollment> {
        self.by_pair
            .iter()
            .filter(|r| &r.key().0 == user_id)
            .map(|r| r.value().clone())
            .collect()
    }

    /// All ACTIVE enrollments under a sequence. The exit evaluator's scan.
    pub fn active_for_sequence(&self, sequence_id: &Uuid) -> Vec<Enrollment> {
        self.by_pair
            .iter()
            .filter(|r| {
                &r.key().1 == sequence_id && r.value().status == EnrollmentStatus::Active
            })
            .map(|r| r.value().clone())
            .collect()
    }

    /// The dispatcher read contract: ACTIVE enrollments whose next send is
    /// due. The send loop itself lives outside this system.
    pub fn due(&self, now: DateTime<Utc>) -> Vec<Enrollment> {
        self.by_pair
            .iter()
            .filter(|r| r.value().status == EnrollmentStatus::Active && r.value().next_send_at <= now)
            .map(|r| r.value().clone())
            .collect()
    }

    /// Mutate an enrollment under the entry lock. Returns the updated record,
    /// or None if the id is unknown.
    pub fn update_by_id<F>(&self, id: &Uuid, f: F) -> Option<Enrollment>
    where
        F: FnOnce(&mut Enrollment),
    {
        let key = self.by_id.get(id).map(|r| *r.value())?;
        let mut entry = self.by_pair.get_mut(&key)?;
        f(entry.value_mut());
        Some(entry.value().clone())
    }

    pub fn count(&self) -> usize {
        self.by_pair.len()
    }
}

impl Default for EnrollmentStore {
    fn default() -> Self {
        Self::new()
    }
}
