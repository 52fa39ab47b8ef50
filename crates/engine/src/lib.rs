//! Recovery sequence engine — trigger evaluation, enrollment lifecycle,
//! and exit evaluation for the Nurture platform.

pub mod enrollment;
pub mod exit;
pub mod trigger;

pub use enrollment::EnrollmentManager;
pub use exit::{ExitEvaluator, ExitReport};
pub use trigger::{ConditionCounts, TriggerEvaluator, TriggerReport};
