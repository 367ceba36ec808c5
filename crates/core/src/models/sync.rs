use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::provider::ProviderId;

/// Label emitted as the terminal step when a sync fails.
pub const SYNC_FAILED_LABEL: &str = "Sync failed";

/// One fixed step of a provider's progress plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressStep {
    pub percent: u8,
    pub label: &'static str,
}

impl ProgressStep {
    pub const fn new(percent: u8, label: &'static str) -> Self {
        Self { percent, label }
    }
}

/// A progress update as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProgress {
    pub percent: u8,
    pub label: String,
}

impl From<ProgressStep> for SyncProgress {
    fn from(step: ProgressStep) -> Self {
        Self {
            percent: step.percent,
            label: step.label.to_string(),
        }
    }
}

/// Caller-supplied filters for a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SyncOptions {
    /// Restrict a school sync to these grade levels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grade_levels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_students: Option<u32>,
}

impl SyncOptions {
    pub fn is_empty(&self) -> bool {
        self.grade_levels.is_empty() && self.max_students.is_none()
    }
}

/// Count of students per risk bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RiskDistribution {
    pub high: u32,
    pub moderate: u32,
    pub low: u32,
}

/// Risk bucket for a single score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    Moderate,
    Low,
}

impl RiskLevel {
    pub const HIGH_THRESHOLD: f64 = 0.7;
    pub const MODERATE_THRESHOLD: f64 = 0.4;

    /// Bucket a score; boundary values belong to the higher bucket.
    pub fn from_score(score: f64) -> Self {
        if score >= Self::HIGH_THRESHOLD {
            RiskLevel::High
        } else if score >= Self::MODERATE_THRESHOLD {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }
}

impl RiskDistribution {
    pub fn record(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::High => self.high += 1,
            RiskLevel::Moderate => self.moderate += 1,
            RiskLevel::Low => self.low += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.high + self.moderate + self.low
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub total_students: u32,
    pub risk_distribution: RiskDistribution,
}

/// A named contributing factor with optional weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Per-student prediction in the normalized result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub student_id: String,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<Factor>,
    pub protective_factors: Vec<Factor>,
    /// Provider-specific per-student fields (attendance rate, missing assignments).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub enrichment: BTreeMap<String, serde_json::Value>,
}

/// The normalized outcome of one successful sync. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub run_id: Uuid,
    pub provider: ProviderId,
    pub container_id: String,
    pub synced_at: DateTime<Utc>,
    pub students_processed: u32,
    pub summary: SyncSummary,
    pub predictions: Vec<Prediction>,
    pub source_metadata: BTreeMap<String, serde_json::Value>,
}
