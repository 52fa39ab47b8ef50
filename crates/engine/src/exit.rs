//! Exit evaluator — runs after trigger evaluation and closes enrollments
//! whose underlying condition a later user action has resolved.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use nurture_core::config::RecoveryConfig;
use nurture_core::types::{Learner, RecoveryCondition};
use nurture_store::{ActivityStore, EnrollmentStore, SequenceCatalog};

use crate::enrollment::EnrollmentManager;

/// Aggregate result of one exit run, keyed by sequence slug.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExitReport {
    pub exited: HashMap<String, u64>,
    pub errors: u64,
}

/// Scans ACTIVE enrollments per recovery sequence and exits any whose
/// trigger condition no longer holds. Safe to run repeatedly: already-exited
/// enrollments are never scanned, and the manager's status guard makes a
/// racing double-exit a no-op.
pub struct ExitEvaluator {
    activity: Arc<ActivityStore>,
    catalog: Arc<SequenceCatalog>,
    enrollments: Arc<EnrollmentStore>,
    manager: Arc<EnrollmentManager>,
    config: RecoveryConfig,
}

impl ExitEvaluator {
    pub fn new(
        activity: Arc<ActivityStore>,
        catalog: Arc<SequenceCatalog>,
        enrollments: Arc<EnrollmentStore>,
        manager: Arc<EnrollmentManager>,
        config: RecoveryConfig,
    ) -> Self {
        Self {
            activity,
            catalog,
            enrollments,
            manager,
            config,
        }
    }

    pub fn run(&self) -> ExitReport {
        let mut report = ExitReport::default();

        // Exits apply to deactivated sequences too; deactivation only stops
        // new enrollments.
        for condition in RecoveryCondition::ALL {
            let Some(sequence) = self.catalog.get_by_slug(condition.slug()) else {
                debug!(slug = condition.slug(), "recovery sequence not configured, skipping");
                continue;
            };

            let mut exited = 0u64;
            for enrollment in self.enrollments.active_for_sequence(&sequence.id) {
                let Some(learner) = self.activity.get_learner(&enrollment.user_id) else {
                    continue;
                };

                let Some(reason) = self.resolution_reason(condition, &learner) else {
                    continue;
                };

                match self.manager.exit(&enrollment.id, reason) {
                    Ok(_) => exited += 1,
                    Err(e) => {
                        warn!(
                            user_id = %enrollment.user_id,
                            sequence = condition.slug(),
                            error = %e,
                            "exit failed, continuing batch"
                        );
                        report.errors += 1;
                    }
                }
            }

            info!(
                condition = condition.slug(),
                exited,
                "exit condition evaluated"
            );
            report.exited.insert(condition.slug().to_string(), exited);
        }

        report
    }

    /// The reason string if the learner's behavior has resolved the
    /// condition, None if the enrollment should stay active.
    fn resolution_reason(
        &self,
        condition: RecoveryCondition,
        learner: &Learner,
    ) -> Option<&'static str> {
        match condition {
            RecoveryCondition::NeverLoggedIn => learner
                .last_login_at
                .is_some()
                .then_some("User took action (logged in)"),
            RecoveryCondition::NeverStarted => self
                .activity
                .has_started(&learner.id)
                .then_some("User started learning"),
            RecoveryCondition::Abandoned => {
                // Re-engagement window: deliberately shorter than the 7-day
                // entry threshold.
                let cutoff = Utc::now() - Duration::days(self.config.reengage_within_days);
                let reengaged = self
                    .activity
                    .latest_activity_at(learner)
                    .map(|at| at > cutoff)
                    .unwrap_or(false);
                reengaged.then_some("User became active again")
            }
        }
    }
}
