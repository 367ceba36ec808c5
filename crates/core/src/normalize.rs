//! Maps provider sync payloads onto the single [`SyncResult`] contract.
//!
//! Normalization is pure: it never performs I/O and never touches session state.

use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{PathwayError, Result};
use crate::models::provider::ProviderId;
use crate::models::sync::{
    Factor, Prediction, RiskDistribution, RiskLevel, SyncResult, SyncSummary,
};
use crate::providers::canvas::mapper::CanvasMapper;
use crate::providers::classroom::mapper::ClassroomMapper;
use crate::providers::powerschool::mapper::PowerSchoolMapper;
use crate::providers::{RawFactor, RawPrediction, RawSyncEnvelope, RawSyncResponse};

/// Normalize a raw sync payload for `provider` and `container_id`.
pub fn normalize(
    provider: ProviderId,
    container_id: &str,
    raw: RawSyncResponse,
) -> Result<SyncResult> {
    if raw.provider() != provider {
        return Err(PathwayError::MalformedResponse {
            provider,
            reason: format!("received a {} payload", raw.provider()),
        });
    }

    let (envelope, source) = match raw {
        RawSyncResponse::Canvas(r) => {
            let source = CanvasMapper::source_metadata(&r);
            (r.envelope, source)
        }
        RawSyncResponse::PowerSchool(r) => {
            let source = PowerSchoolMapper::source_metadata(&r);
            (r.envelope, source)
        }
        RawSyncResponse::GoogleClassroom(r) => {
            let source = ClassroomMapper::source_metadata(&r);
            (r.envelope, source)
        }
    };

    assemble(provider, container_id, envelope, source)
}

fn assemble(
    provider: ProviderId,
    container_id: &str,
    mut envelope: RawSyncEnvelope,
    source: BTreeMap<String, Value>,
) -> Result<SyncResult> {
    let malformed = |reason: String| PathwayError::MalformedResponse { provider, reason };

    match envelope.status.as_deref() {
        Some("success") => {}
        Some(other) => return Err(malformed(format!("unexpected status {other:?}"))),
        None => return Err(malformed("status indicator missing".into())),
    }

    let raw_predictions = envelope
        .take_rows()
        .ok_or_else(|| malformed("students array missing".into()))?;

    let mut distribution = RiskDistribution::default();
    let mut predictions = Vec::with_capacity(raw_predictions.len());
    for raw in raw_predictions {
        let prediction = prediction(raw).map_err(malformed)?;
        distribution.record(prediction.risk_level);
        predictions.push(prediction);
    }

    let total_students = predictions.len() as u32;
    let mut source_metadata = BTreeMap::new();
    source_metadata.insert("provider".to_string(), Value::from(provider.as_str()));
    if let Some(summary) = envelope.summary {
        source_metadata.insert("upstreamSummary".to_string(), summary);
    }
    // Core keys win over anything a provider adapter reports.
    for (key, value) in source {
        source_metadata.entry(key).or_insert(value);
    }

    Ok(SyncResult {
        run_id: Uuid::new_v4(),
        provider,
        container_id: container_id.to_string(),
        synced_at: Utc::now(),
        students_processed: envelope.students_processed.unwrap_or(total_students),
        summary: SyncSummary {
            total_students,
            risk_distribution: distribution,
        },
        predictions,
        source_metadata,
    })
}

fn prediction(raw: RawPrediction) -> std::result::Result<Prediction, String> {
    let Some(student_id) = raw.student_key().map(str::to_string) else {
        return Err("prediction without a student id".into());
    };
    if !raw.risk_score.is_finite() || !(0.0..=1.0).contains(&raw.risk_score) {
        return Err(format!(
            "risk score {} for student {} is outside [0, 1]",
            raw.risk_score, student_id
        ));
    }

    Ok(Prediction {
        risk_level: RiskLevel::from_score(raw.risk_score),
        student_id,
        risk_score: raw.risk_score,
        risk_factors: raw.risk_factors.into_iter().map(factor).collect(),
        protective_factors: raw.protective_factors.into_iter().map(factor).collect(),
        enrichment: raw.extra,
    })
}

fn factor(raw: RawFactor) -> Factor {
    match raw {
        RawFactor::Name(name) => Factor {
            name,
            weight: None,
            detail: None,
        },
        RawFactor::Detailed {
            name,
            weight,
            detail,
        } => Factor {
            name,
            weight,
            detail,
        },
    }
}
