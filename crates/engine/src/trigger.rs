//! Trigger evaluator — the daily scan that enrolls newly-eligible learners
//! into the recovery sequences.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use nurture_core::config::RecoveryConfig;
use nurture_core::types::{Learner, RecoveryCondition};
use nurture_store::{ActivityStore, SequenceCatalog};

use crate::enrollment::EnrollmentManager;

/// Per-condition aggregate counts for one evaluator run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ConditionCounts {
    pub checked: u64,
    pub enrolled: u64,
}

/// Aggregate result of one trigger run, keyed by sequence slug.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerReport {
    pub conditions: HashMap<String, ConditionCounts>,
    pub errors: u64,
}

/// Scans the activity store for learners matching one of the three recovery
/// conditions and enrolls them. Designed to run as a stateless batch job on
/// an external schedule; correctness under overlap comes from the enrollment
/// manager's idempotency, not from locking here.
pub struct TriggerEvaluator {
    activity: Arc<ActivityStore>,
    catalog: Arc<SequenceCatalog>,
    manager: Arc<EnrollmentManager>,
    config: RecoveryConfig,
}

impl TriggerEvaluator {
    pub fn new(
        activity: Arc<ActivityStore>,
        catalog: Arc<SequenceCatalog>,
        manager: Arc<EnrollmentManager>,
        config: RecoveryConfig,
    ) -> Self {
        Self {
            activity,
            catalog,
            manager,
            config,
        }
    }

    /// Evaluate all three conditions against every eligible learner.
    ///
    /// A condition whose sequence is missing or inactive is silently
    /// skipped. A failure enrolling one learner is logged, tallied, and does
    /// not abort the rest of the batch.
    pub fn run(&self) -> TriggerReport {
        let now = Utc::now();
        let learners = self.activity.list_learners();
        let mut report = TriggerReport::default();

        for condition in RecoveryCondition::ALL {
            let Some(sequence) = self.catalog.get_by_slug(condition.slug()) else {
                debug!(slug = condition.slug(), "recovery sequence not configured, skipping");
                continue;
            };
            if !sequence.is_active {
                debug!(slug = condition.slug(), "recovery sequence inactive, skipping");
                continue;
            }

            let mut counts = ConditionCounts::default();
            for learner in &learners {
                if !learner.is_active || learner.is_test {
                    continue;
                }
                let Some(signup_at) = learner.signup_at else {
                    continue;
                };
                counts.checked += 1;

                if !self.matches(condition, learner, signup_at, now) {
                    continue;
                }

                match self.manager.enroll(learner.id, sequence.id) {
                    Ok((_, true)) => {
                        self.activity.add_tag(learner.id, &condition.entry_tag());
                        counts.enrolled += 1;
                    }
                    // Already enrolled at some point, active or exited:
                    // this condition never re-triggers for the pair.
                    Ok((_, false)) => {}
                    Err(e) => {
                        warn!(
                            user_id = %learner.id,
                            sequence = condition.slug(),
                            error = %e,
                            "enrollment failed, continuing batch"
                        );
                        report.errors += 1;
                    }
                }
            }

            info!(
                condition = condition.slug(),
                checked = counts.checked,
                enrolled = counts.enrolled,
                "trigger condition evaluated"
            );
            report.conditions.insert(condition.slug().to_string(), counts);
        }

        report
    }

    fn matches(
        &self,
        condition: RecoveryCondition,
        learner: &Learner,
        signup_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> bool {
        match condition {
            RecoveryCondition::NeverLoggedIn => {
                learner.last_login_at.is_none()
                    && signup_at <= now - Duration::days(self.config.never_logged_in_after_days)
            }
            RecoveryCondition::NeverStarted => match learner.last_login_at {
                Some(login_at) => {
                    login_at <= now - Duration::days(self.config.never_started_after_days)
                        && !self.activity.has_started(&learner.id)
                }
                None => false,
            },
            RecoveryCondition::Abandoned => {
                if !self.activity.has_started(&learner.id) {
                    return false;
                }
                match self.activity.latest_activity_at(learner) {
                    Some(at) => at <= now - Duration::days(self.config.abandoned_after_days),
                    None => false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use nurture_core::types::ProgressRecord;
    use nurture_store::EnrollmentStore;
    use uuid::Uuid;

    struct Fixture {
        activity: Arc<ActivityStore>,
        catalog: Arc<SequenceCatalog>,
        manager: Arc<EnrollmentManager>,
        evaluator: TriggerEvaluator,
    }

    fn setup() -> Fixture {
        let activity = Arc::new(ActivityStore::new());
        let catalog = Arc::new(SequenceCatalog::new());
        catalog.seed_recovery_sequences();
        let enrollments = Arc::new(EnrollmentStore::new());
        let manager = Arc::new(EnrollmentManager::new(
            catalog.clone(),
            enrollments,
            activity.clone(),
            &RecoveryConfig::default(),
        ));
        let evaluator = TriggerEvaluator::new(
            activity.clone(),
            catalog.clone(),
            manager.clone(),
            RecoveryConfig::default(),
        );
        Fixture {
            activity,
            catalog,
            manager,
            evaluator,
        }
    }

    fn learner_signed_up_days_ago(days: i64) -> Learner {
        Learner {
            id: Uuid::new_v4(),
            email: "learner@example.com".to_string(),
            first_name: Some("Sam".to_string()),
            last_login_at: None,
            signup_at: Some(Utc::now() - Duration::days(days)),
            is_active: true,
            is_test: false,
            created_at: Utc::now() - Duration::days(days),
        }
    }

    #[test]
    fn test_never_logged_in_enrolls_after_one_day() {
        let fx = setup();
        let learner = learner_signed_up_days_ago(2);
        fx.activity.upsert_learner(learner.clone());

        let report = fx.evaluator.run();
        let counts = report.conditions["never_logged_in"];
        assert_eq!(counts.checked, 1);
        assert_eq!(counts.enrolled, 1);
        assert!(fx.activity.has_tag(&learner.id, "recovery:never_logged_in"));

        let seq = fx.catalog.get_by_slug("never_logged_in").unwrap();
        assert_eq!(seq.total_enrolled, 1);
    }

    #[test]
    fn test_fresh_signup_not_enrolled() {
        let fx = setup();
        // Signed up an hour ago: inside the 1-day grace window.
        let mut learner = learner_signed_up_days_ago(0);
        learner.signup_at = Some(Utc::now() - Duration::hours(1));
        fx.activity.upsert_learner(learner);

        let report = fx.evaluator.run();
        assert_eq!(report.conditions["never_logged_in"].enrolled, 0);
    }

    #[test]
    fn test_preconditions_skip_test_and_inactive_profiles() {
        let fx = setup();

        let mut test_profile = learner_signed_up_days_ago(5);
        test_profile.is_test = true;
        fx.activity.upsert_learner(test_profile);

        let mut inactive = learner_signed_up_days_ago(5);
        inactive.is_active = false;
        fx.activity.upsert_learner(inactive);

        let mut no_signup = learner_signed_up_days_ago(5);
        no_signup.signup_at = None;
        fx.activity.upsert_learner(no_signup);

        let report = fx.evaluator.run();
        let counts = report.conditions["never_logged_in"];
        assert_eq!(counts.checked, 0);
        assert_eq!(counts.enrolled, 0);
    }

    #[test]
    fn test_never_started_requires_stale_login_and_zero_progress() {
        let fx = setup();

        let mut stale = learner_signed_up_days_ago(10);
        stale.last_login_at = Some(Utc::now() - Duration::days(3));
        fx.activity.upsert_learner(stale.clone());

        // Logged in recently: not eligible.
        let mut recent = learner_signed_up_days_ago(10);
        recent.last_login_at = Some(Utc::now() - Duration::hours(12));
        fx.activity.upsert_learner(recent.clone());

        // Stale login but has progress: not eligible.
        let mut started = learner_signed_up_days_ago(10);
        started.last_login_at = Some(Utc::now() - Duration::days(3));
        fx.activity.upsert_learner(started.clone());
        fx.activity.record_progress(ProgressRecord {
            user_id: started.id,
            lesson: 1,
            completed: false,
            updated_at: Utc::now() - Duration::days(3),
        });

        let report = fx.evaluator.run();
        assert_eq!(report.conditions["never_started"].enrolled, 1);
        assert!(fx.activity.has_tag(&stale.id, "recovery:never_started"));
        assert!(!fx.activity.has_tag(&recent.id, "recovery:never_started"));
    }

    #[test]
    fn test_abandoned_after_seven_days_idle() {
        let fx = setup();

        let mut learner = learner_signed_up_days_ago(30);
        learner.last_login_at = Some(Utc::now() - Duration::days(20));
        fx.activity.upsert_learner(learner.clone());
        fx.activity.record_progress(ProgressRecord {
            user_id: learner.id,
            lesson: 4,
            completed: true,
            updated_at: Utc::now() - Duration::days(8),
        });

        let report = fx.evaluator.run();
        assert_eq!(report.conditions["abandoned"].enrolled, 1);

        // Active six days ago: not yet abandoned.
        let mut active = learner_signed_up_days_ago(30);
        active.last_login_at = Some(Utc::now() - Duration::days(20));
        fx.activity.upsert_learner(active.clone());
        fx.activity.record_progress(ProgressRecord {
            user_id: active.id,
            lesson: 2,
            completed: true,
            updated_at: Utc::now() - Duration::days(6),
        });

        let report = fx.evaluator.run();
        assert_eq!(report.conditions["abandoned"].enrolled, 0);
    }

    #[test]
    fn test_double_run_enrolls_once() {
        let fx = setup();
        fx.activity.upsert_learner(learner_signed_up_days_ago(3));

        let first = fx.evaluator.run();
        assert_eq!(first.conditions["never_logged_in"].enrolled, 1);

        let second = fx.evaluator.run();
        assert_eq!(second.conditions["never_logged_in"].enrolled, 0);
        assert_eq!(second.errors, 0);

        let seq = fx.catalog.get_by_slug("never_logged_in").unwrap();
        assert_eq!(seq.total_enrolled, 1);
    }

    #[test]
    fn test_no_retrigger_after_exit() {
        let fx = setup();
        let learner = learner_signed_up_days_ago(3);
        fx.activity.upsert_learner(learner.clone());

        fx.evaluator.run();
        let seq = fx.catalog.get_by_slug("never_logged_in").unwrap();
        let enrollment = fx
            .manager
            .enroll(learner.id, seq.id)
            .map(|(e, _)| e)
            .unwrap();
        fx.manager
            .exit(&enrollment.id, "User took action (logged in)")
            .unwrap();

        // Still matches the raw criteria, but the exited record blocks
        // re-enrollment.
        let report = fx.evaluator.run();
        assert_eq!(report.conditions["never_logged_in"].enrolled, 0);
        assert_eq!(
            fx.catalog.get_by_slug("never_logged_in").unwrap().total_enrolled,
            1
        );
    }

    #[test]
    fn test_inactive_sequence_condition_skipped() {
        let fx = setup();
        fx.activity.upsert_learner(learner_signed_up_days_ago(3));
        let seq = fx.catalog.get_by_slug("never_logged_in").unwrap();
        fx.catalog.set_active(&seq.id, false).unwrap();

        let report = fx.evaluator.run();
        assert!(!report.conditions.contains_key("never_logged_in"));
        assert_eq!(report.errors, 0);
    }

    #[test]
    fn test_conditions_evaluated_independently() {
        let fx = setup();

        // Stale login, no progress: matches never_started. Separately give
        // the same learner eight-day-old progress so abandoned matches too.
        let mut learner = learner_signed_up_days_ago(30);
        learner.last_login_at = Some(Utc::now() - Duration::days(9));
        fx.activity.upsert_learner(learner.clone());
        fx.activity.record_progress(ProgressRecord {
            user_id: learner.id,
            lesson: 1,
            completed: true,
            updated_at: Utc::now() - Duration::days(8),
        });

        let report = fx.evaluator.run();
        // Has progress, so never_started does not match; abandoned does.
        assert_eq!(report.conditions["never_started"].enrolled, 0);
        assert_eq!(report.conditions["abandoned"].enrolled, 1);

        // A learner may hold enrollments in several sequences at once.
        let ns = fx.catalog.get_by_slug("never_started").unwrap();
        let (_, created) = fx.manager.enroll(learner.id, ns.id).unwrap();
        assert!(created);
        let ab = fx.catalog.get_by_slug("abandoned").unwrap();
        let (_, created) = fx.manager.enroll(learner.id, ab.id).unwrap();
        assert!(!created); // already enrolled by the trigger run above
    }
}
