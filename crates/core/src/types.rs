//! Shared domain types for the Nurture recovery and milestone engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Learner activity ──────────────────────────────────────────────────────

/// A learner account. Consumed read-only by the recovery evaluators; owned
/// by the enrollment/auth side of the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Learner {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    /// Opt-in / signup timestamp. Learners without one are never evaluated.
    pub signup_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// Synthetic/test profiles are skipped by every evaluator.
    pub is_test: bool,
    pub created_at: DateTime<Utc>,
}

/// One lesson's progress for one learner. Existence of at least one record
/// means the learner has started the course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub user_id: Uuid,
    pub lesson: u32,
    pub completed: bool,
    pub updated_at: DateTime<Utc>,
}

/// A free-text behavioral label on a learner. Unique per (user, tag);
/// tags are additive and never removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRecord {
    pub user_id: Uuid,
    pub tag: String,
    pub created_at: DateTime<Utc>,
}

// ─── Sequences & enrollments ───────────────────────────────────────────────

/// Outbound channel for a sequence step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageChannel {
    Email,
    Sms,
    Chat,
    Voice,
}

/// A single step of a messaging sequence. Dispatch of steps is handled by
/// an external send loop that polls due enrollments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceStep {
    pub position: u32,
    pub channel: MessageChannel,
    /// Template identifier resolved by the sending side.
    pub template: String,
    /// Delay after the previous step before this one becomes due.
    pub delay_hours: u32,
}

/// A named, versioned definition of a multi-step messaging sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sequence {
    pub id: Uuid,
    /// Unique, stable identifier used for lookup by the evaluators.
    pub slug: String,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub steps: Vec<SequenceStep>,
    /// Lifetime count of enrollments ever created under this sequence.
    pub total_enrolled: u64,
    /// Lifetime count of enrollments exited from this sequence.
    pub total_exited: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Runtime status of an enrollment. `Active -> Exited` is the only
/// transition; `Exited` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Active,
    Exited,
}

/// One learner's membership in one sequence. Unique per
/// (user_id, sequence_id) for the lifetime of the system — once created,
/// never deleted and never re-created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub sequence_id: Uuid,
    pub status: EnrollmentStatus,
    pub current_step_index: u32,
    /// When the external dispatcher should next act on this enrollment.
    pub next_send_at: DateTime<Utc>,
    pub enrolled_at: DateTime<Utc>,
    pub exited_at: Option<DateTime<Utc>>,
    pub exit_reason: Option<String>,
}

/// The three behavioral conditions the trigger evaluator checks, each mapped
/// to one sequence by slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryCondition {
    NeverLoggedIn,
    NeverStarted,
    Abandoned,
}

impl RecoveryCondition {
    pub const ALL: [RecoveryCondition; 3] = [
        RecoveryCondition::NeverLoggedIn,
        RecoveryCondition::NeverStarted,
        RecoveryCondition::Abandoned,
    ];

    /// Slug of the sequence this condition enrolls into.
    pub fn slug(&self) -> &'static str {
        match self {
            RecoveryCondition::NeverLoggedIn => "never_logged_in",
            RecoveryCondition::NeverStarted => "never_started",
            RecoveryCondition::Abandoned => "abandoned",
        }
    }

    /// Marker tag upserted on the learner when enrolled.
    pub fn entry_tag(&self) -> String {
        format!("recovery:{}", self.slug())
    }
}

// ─── Analytics events ──────────────────────────────────────────────────────

/// Event types emitted into the analytics pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SequenceEnrolled,
    SequenceExited,
}

/// An analytics event. Routed by an [`crate::event_bus::EventSink`]
/// implementation; the engine itself never blocks on delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NurtureEvent {
    pub event_id: Uuid,
    pub event_type: EventType,
    pub user_id: Option<Uuid>,
    pub sequence_slug: Option<String>,
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}
