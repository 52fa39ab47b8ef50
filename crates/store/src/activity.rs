//! User activity store — learners, per-lesson progress, and tags.
//!
//! Consumed read-only by the trigger and exit evaluators; written to by the
//! rest of the platform (login handler, lesson player) and by the enrollment
//! manager (tags only).

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

use nurture_core::types::{Learner, ProgressRecord, TagRecord};

/// Thread-safe activity store. The tag map is keyed by (user, tag), which is
/// the composite unique constraint — an insert of an existing pair is a
/// no-op, never an error.
pub struct ActivityStore {
    learners: DashMap<Uuid, Learner>,
    progress: DashMap<Uuid, Vec<ProgressRecord>>,
    tags: DashMap<(Uuid, String), TagRecord>,
}

impl ActivityStore {
    pub fn new() -> Self {
        Self {
            learners: DashMap::new(),
            progress: DashMap::new(),
            tags: DashMap::new(),
        }
    }

    // ─── Learners ──────────────────────────────────────────────────────────

    pub fn upsert_learner(&self, learner: Learner) {
        self.learners.insert(learner.id, learner);
    }

    pub fn get_learner(&self, id: &Uuid) -> Option<Learner> {
        self.learners.get(id).map(|r| r.value().clone())
    }

    /// Snapshot of all learners. Evaluators filter this themselves so a
    /// single scan serves every condition.
    pub fn list_learners(&self) -> Vec<Learner> {
        self.learners.iter().map(|r| r.value().clone()).collect()
    }

    /// Record a login. Returns false if the learner is unknown.
    pub fn record_login(&self, user_id: &Uuid, at: DateTime<Utc>) -> bool {
        match self.learners.get_mut(user_id) {
            Some(mut entry) => {
                entry.value_mut().last_login_at = Some(at);
                true
            }
            None => false,
        }
    }

    // ─── Progress ──────────────────────────────────────────────────────────

    /// Upsert a progress record. One record per (user, lesson); a repeat
    /// write for the same lesson updates it in place.
    pub fn record_progress(&self, record: ProgressRecord) {
        let mut records = self.progress.entry(record.user_id).or_default();
        match records.iter_mut().find(|r| r.lesson == record.lesson) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    pub fn progress_for(&self, user_id: &Uuid) -> Vec<ProgressRecord> {
        self.progress
            .get(user_id)
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// "Has started learning" — at least one progress record exists.
    pub fn has_started(&self, user_id: &Uuid) -> bool {
        self.progress
            .get(user_id)
            .map(|r| !r.is_empty())
            .unwrap_or(false)
    }

    /// The learner's last learning activity: the most recent progress
    /// record's timestamp, falling back to `last_login_at` when no progress
    /// exists.
    pub fn latest_activity_at(&self, learner: &Learner) -> Option<DateTime<Utc>> {
        let latest_progress = self
            .progress
            .get(&learner.id)
            .and_then(|records| records.iter().map(|r| r.updated_at).max());
        latest_progress.or(learner.last_login_at)
    }

    // ─── Tags ──────────────────────────────────────────────────────────────

    /// Upsert a tag. Returns true if the tag was newly created, false if it
    /// already existed. Never an error.
    pub fn add_tag(&self, user_id: Uuid, tag: &str) -> bool {
        match self.tags.entry((user_id, tag.to_string())) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(TagRecord {
                    user_id,
                    tag: tag.to_string(),
                    created_at: Utc::now(),
                });
                info!(user_id = %user_id, tag, "tag added");
                true
            }
        }
    }

    pub fn has_tag(&self, user_id: &Uuid, tag: &str) -> bool {
        self.tags.contains_key(&(*user_id, tag.to_string()))
    }

    pub fn tags_for(&self, user_id: &Uuid) -> Vec<TagRecord> {
        self.tags
            .iter()
            .filter(|r| &r.key().0 == user_id)
            .map(|r| r.value().clone())
            .collect()
    }
}

impl Default for ActivityStore {
    fn default() -> Self {
        Self::new()
    }
}
