//! Request/response types for the REST API.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nurture_engine::ConditionCounts;

/// Generic JSON error payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Result of one scheduler-invoked recovery run: trigger counts per
/// condition, exit counts per sequence, and the combined error tally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryRunResponse {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub conditions: HashMap<String, ConditionCounts>,
    pub exited: HashMap<String, u64>,
    pub errors: u64,
}

/// Aggregate stats for one sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceStats {
    pub slug: String,
    pub total_enrolled: u64,
    pub total_exited: u64,
    pub active_enrollments: u64,
}

/// Query parameters for the milestone lookup endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MilestoneQuery {
    pub lesson: Option<u32>,
    pub first_name: Option<String>,
}
