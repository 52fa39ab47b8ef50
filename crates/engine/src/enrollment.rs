//! Enrollment manager — single source of truth for creating and mutating
//! enrollments, keeping sequence counters and marker tags consistent.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;

use nurture_core::config::RecoveryConfig;
use nurture_core::error::{NurtureError, NurtureResult};
use nurture_core::event_bus::{make_event, EventSink};
use nurture_core::types::{Enrollment, EnrollmentStatus, EventType};
use nurture_store::{ActivityStore, EnrollmentStore, SequenceCatalog};

#[derive(Clone)]
pub struct EnrollmentManager {
    catalog: Arc<SequenceCatalog>,
    enrollments: Arc<EnrollmentStore>,
    activity: Arc<ActivityStore>,
    event_sink: Arc<dyn EventSink>,
    first_send_delay: Duration,
}

impl std::fmt::Debug for EnrollmentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrollmentManager")
            .field("enrollments", &self.enrollments.count())
            .finish()
    }
}

impl EnrollmentManager {
    pub fn new(
        catalog: Arc<SequenceCatalog>,
        enrollments: Arc<EnrollmentStore>,
        activity: Arc<ActivityStore>,
        config: &RecoveryConfig,
    ) -> Self {
        Self {
            catalog,
            enrollments,
            activity,
            event_sink: nurture_core::event_bus::noop_sink(),
            first_send_delay: Duration::minutes(config.first_send_delay_mins),
        }
    }

    /// Attach an event sink for emitting analytics events.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Enroll a learner into a sequence.
    ///
    /// Idempotent: if an enrollment already exists for the pair — active or
    /// exited — the existing record is returned unchanged and nothing else
    /// happens. On creation the enrollment starts at step 0 with the first
    /// send scheduled a short delay out, and the sequence's lifetime
    /// `total_enrolled` counter is incremented as part of the same logical
    /// operation.
    ///
    /// Returns the stored record and whether this call created it.
    pub fn enroll(&self, user_id: Uuid, sequence_id: Uuid) -> NurtureResult<(Enrollment, bool)> {
        let sequence = self
            .catalog
            .get(&sequence_id)
            .ok_or_else(|| NurtureError::SequenceNotFound(sequence_id.to_string()))?;
        if !sequence.is_active {
            return Err(NurtureError::SequenceInactive(sequence.slug));
        }

        let now = Utc::now();
        let candidate = Enrollment {
            id: Uuid::new_v4(),
            user_id,
            sequence_id,
            status: EnrollmentStatus::Active,
            current_step_index: 0,
            next_send_at: now + self.first_send_delay,
            enrolled_at: now,
            exited_at: None,
            exit_reason: None,
        };

        // The store's pair key is the real uniqueness backstop; a losing
        // racer gets the winner's record back here.
        let (enrollment, created) = self.enrollments.insert_if_absent(candidate);

        if created {
            self.catalog.increment_enrolled(&sequence_id)?;
            metrics::counter!("recovery.enrollments_created", "sequence" => sequence.slug.clone())
                .increment(1);
            info!(
                user_id = %user_id,
                sequence = %sequence.slug,
                enrollment_id = %enrollment.id,
                "learner enrolled"
            );
            self.event_sink.emit(make_event(
                EventType::SequenceEnrolled,
                Some(user_id),
                Some(sequence.slug),
                None,
            ));
        }

        Ok((enrollment, created))
    }

    /// Exit an enrollment with a human-readable reason.
    ///
    /// Exactly-once: only an ACTIVE enrollment transitions. A repeat call
    /// returns the already-exited record without touching counters or tags.
    pub fn exit(&self, enrollment_id: &Uuid, reason: &str) -> NurtureResult<Enrollment> {
        let now = Utc::now();
        let mut transitioned = false;
        let enrollment = self
            .enrollments
            .update_by_id(enrollment_id, |e| {
                if e.status == EnrollmentStatus::Active {
                    e.status = EnrollmentStatus::Exited;
                    e.exited_at = Some(now);
                    e.exit_reason = Some(reason.to_string());
                    transitioned = true;
                }
            })
            .ok_or_else(|| NurtureError::EnrollmentNotFound(enrollment_id.to_string()))?;

        if transitioned {
            let sequence = self
                .catalog
                .get(&enrollment.sequence_id)
                .ok_or_else(|| {
                    NurtureError::SequenceNotFound(enrollment.sequence_id.to_string())
                })?;
            self.catalog.increment_exited(&enrollment.sequence_id)?;
            self.activity.add_tag(
                enrollment.user_id,
                &format!("recovery:{}_exited", sequence.slug),
            );
            metrics::counter!("recovery.exits", "sequence" => sequence.slug.clone()).increment(1);
            info!(
                user_id = %enrollment.user_id,
                sequence = %sequence.slug,
                reason,
                "enrollment exited"
            );
            self.event_sink.emit(make_event(
                EventType::SequenceExited,
                Some(enrollment.user_id),
                Some(sequence.slug),
                Some(reason.to_string()),
            ));
        }

        Ok(enrollment)
    }
}
