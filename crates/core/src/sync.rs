//! Sync orchestration: one provider call, paced progress, normalization.
//!
//! Progress steps are advanced on a fixed interval while the network call is
//! in flight. The completion step is only emitted once the payload has been
//! normalized; a failure emits a terminal "Sync failed" step at the last
//! reached percentage instead.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{PathwayError, Result};
use crate::models::sync::{
    ProgressStep, SyncOptions, SyncProgress, SyncResult, SYNC_FAILED_LABEL,
};
use crate::normalize::normalize;
use crate::providers::ProviderClient;

pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(800);

const COMPLETION_STEP: ProgressStep = ProgressStep::new(100, "Complete");

#[derive(Debug, Clone)]
pub struct SyncOrchestrator {
    interval: Duration,
}

impl Default for SyncOrchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_INTERVAL)
    }
}

impl SyncOrchestrator {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one sync of `container_id`, reporting progress through `emit`.
    ///
    /// Returns `Abandoned` without emitting anything further once `cancel`
    /// fires.
    pub async fn run<F>(
        &self,
        client: &dyn ProviderClient,
        container_id: &str,
        options: &SyncOptions,
        cancel: &CancellationToken,
        mut emit: F,
    ) -> Result<SyncResult>
    where
        F: FnMut(SyncProgress),
    {
        let provider = client.provider();
        let mut pacer = ProgressPacer::new(client.progress_plan());
        info!(%provider, container_id, "Starting sync");

        if let Some(progress) = pacer.advance() {
            emit(progress);
        }

        let call = client.sync_container(container_id, options);
        tokio::pin!(call);

        let outcome = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(%provider, container_id, "Sync abandoned");
                    return Err(PathwayError::Abandoned { provider });
                }
                res = &mut call => break res,
                _ = tokio::time::sleep(self.interval), if pacer.has_pending() => {
                    if let Some(progress) = pacer.advance() {
                        debug!(%provider, percent = progress.percent, label = %progress.label, "Sync progress");
                        emit(progress);
                    }
                }
            }
        };

        // Cancelled while the response was resolving.
        if cancel.is_cancelled() {
            debug!(%provider, container_id, "Sync abandoned after response");
            return Err(PathwayError::Abandoned { provider });
        }

        let normalized = match outcome {
            Ok(raw) => normalize(provider, container_id, raw),
            Err(err @ PathwayError::MalformedResponse { .. }) => Err(err),
            Err(cause) => Err(PathwayError::Sync {
                stage: pacer.stage(),
                cause: Box::new(cause),
            }),
        };

        match normalized {
            Ok(result) => {
                emit(pacer.complete());
                info!(
                    %provider,
                    container_id,
                    students = result.summary.total_students,
                    high = result.summary.risk_distribution.high,
                    "Sync complete"
                );
                Ok(result)
            }
            Err(err) => {
                warn!(%provider, container_id, error = %err, "Sync failed");
                emit(pacer.failed());
                Err(err)
            }
        }
    }
}

/// Walks a progress plan, never letting the percentage go backwards.
struct ProgressPacer {
    pending: std::slice::Iter<'static, ProgressStep>,
    completion: ProgressStep,
    current: Option<SyncProgress>,
}

impl ProgressPacer {
    fn new(plan: &'static [ProgressStep]) -> Self {
        let (pending, completion) = match plan.split_last() {
            Some((last, rest)) if last.percent == 100 => (rest, *last),
            _ => (plan, COMPLETION_STEP),
        };
        Self {
            pending: pending.iter(),
            completion,
            current: None,
        }
    }

    fn has_pending(&self) -> bool {
        !self.pending.as_slice().is_empty()
    }

    fn floor(&self) -> u8 {
        self.current.as_ref().map_or(0, |p| p.percent)
    }

    fn advance(&mut self) -> Option<SyncProgress> {
        let step = self.pending.next()?;
        let progress = SyncProgress {
            percent: step.percent.max(self.floor()),
            label: step.label.to_string(),
        };
        self.current = Some(progress.clone());
        Some(progress)
    }

    /// Label of the step the sync had reached.
    fn stage(&self) -> String {
        self.current
            .as_ref()
            .map_or_else(|| "start".to_string(), |p| p.label.clone())
    }

    fn complete(&mut self) -> SyncProgress {
        let progress = SyncProgress::from(self.completion);
        self.current = Some(progress.clone());
        progress
    }

    fn failed(&self) -> SyncProgress {
        SyncProgress {
            percent: self.floor(),
            label: SYNC_FAILED_LABEL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::provider::ProviderId;
    use crate::testing::{sync_body, FakeProvider};

    fn orchestrator() -> SyncOrchestrator {
        SyncOrchestrator::new(Duration::from_secs(1))
    }

    async fn run(
        fake: &FakeProvider,
        cancel: &CancellationToken,
    ) -> (Result<SyncResult>, Vec<SyncProgress>) {
        let mut seen = Vec::new();
        let result = orchestrator()
            .run(fake, "1", &SyncOptions::default(), cancel, |p| seen.push(p))
            .await;
        (result, seen)
    }

    fn percents(seen: &[SyncProgress]) -> Vec<u8> {
        seen.iter().map(|p| p.percent).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn paces_steps_while_the_call_is_in_flight() {
        let fake = FakeProvider::new(ProviderId::Canvas);
        fake.set_sync_delay(Duration::from_millis(3500));

        let (result, seen) = run(&fake, &CancellationToken::new()).await;
        let result = result.unwrap();

        assert_eq!(percents(&seen), vec![10, 40, 70, 100]);
        assert_eq!(seen.last().unwrap().label, "Complete");
        assert!(seen.windows(2).all(|w| w[0].percent <= w[1].percent));
        assert_eq!(result.summary.total_students, 3);
        assert_eq!(result.container_id, "1");
    }

    #[tokio::test(start_paused = true)]
    async fn fast_response_skips_remaining_steps() {
        let fake = FakeProvider::new(ProviderId::Canvas);

        let (result, seen) = run(&fake, &CancellationToken::new()).await;
        assert!(result.is_ok());
        assert_eq!(percents(&seen), vec![10, 100]);
    }

    #[tokio::test(start_paused = true)]
    async fn network_failure_reports_stage_and_never_completes() {
        let fake = FakeProvider::new(ProviderId::PowerSchool);
        fake.set_sync_delay(Duration::from_millis(1500));
        fake.fail_sync("gateway timeout");

        let (result, seen) = run(&fake, &CancellationToken::new()).await;
        match result.unwrap_err() {
            PathwayError::Sync { stage, cause } => {
                assert_eq!(stage, "Fetching roster");
                assert_eq!(cause.upstream_message(), Some("gateway timeout"));
            }
            other => panic!("expected Sync error, got {other:?}"),
        }

        assert_eq!(
            seen,
            vec![
                SyncProgress {
                    percent: 10,
                    label: "Connecting".into()
                },
                SyncProgress {
                    percent: 40,
                    label: "Fetching roster".into()
                },
                SyncProgress {
                    percent: 40,
                    label: SYNC_FAILED_LABEL.into()
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_payload_is_surfaced_directly() {
        let fake = FakeProvider::new(ProviderId::Canvas);
        fake.set_sync_body(serde_json::json!({"status": "success"}));

        let (result, seen) = run(&fake, &CancellationToken::new()).await;
        assert!(matches!(
            result.unwrap_err(),
            PathwayError::MalformedResponse { .. }
        ));
        assert_eq!(seen.last().unwrap().label, SYNC_FAILED_LABEL);
        assert!(seen.iter().all(|p| p.percent < 100));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_abandons_without_further_progress() {
        let fake = Arc::new(FakeProvider::new(ProviderId::Canvas));
        fake.set_sync_delay(Duration::from_secs(10));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            trigger.cancel();
        });

        let (result, seen) = run(&fake, &cancel).await;
        assert!(matches!(
            result.unwrap_err(),
            PathwayError::Abandoned {
                provider: ProviderId::Canvas
            }
        ));
        assert_eq!(percents(&seen), vec![10, 40]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_racing_the_response_emits_no_terminal_step() {
        let fake = FakeProvider::new(ProviderId::Canvas);
        let cancel = CancellationToken::new();
        fake.cancel_on_response(cancel.clone());

        let (result, seen) = run(&fake, &cancel).await;
        assert!(matches!(
            result.unwrap_err(),
            PathwayError::Abandoned { .. }
        ));
        assert_eq!(percents(&seen), vec![10]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_racing_a_failure_emits_no_failed_step() {
        let fake = FakeProvider::new(ProviderId::Canvas);
        fake.fail_sync("gateway timeout");
        let cancel = CancellationToken::new();
        fake.cancel_on_response(cancel.clone());

        let (result, seen) = run(&fake, &cancel).await;
        assert!(matches!(
            result.unwrap_err(),
            PathwayError::Abandoned { .. }
        ));
        assert!(seen.iter().all(|p| p.label != SYNC_FAILED_LABEL));
    }

    #[test]
    fn pacer_never_goes_backwards() {
        static PLAN: &[ProgressStep] = &[
            ProgressStep::new(30, "a"),
            ProgressStep::new(20, "b"),
            ProgressStep::new(100, "done"),
        ];
        let mut pacer = ProgressPacer::new(PLAN);
        assert_eq!(pacer.advance().unwrap().percent, 30);
        let second = pacer.advance().unwrap();
        assert_eq!((second.percent, second.label.as_str()), (30, "b"));
        assert!(!pacer.has_pending());
        assert_eq!(pacer.complete().label, "done");
    }

    #[test]
    fn pacer_appends_completion_when_plan_lacks_one() {
        static PLAN: &[ProgressStep] = &[ProgressStep::new(50, "halfway")];
        let mut pacer = ProgressPacer::new(PLAN);
        assert!(pacer.has_pending());
        pacer.advance();
        assert_eq!(pacer.complete(), SyncProgress::from(COMPLETION_STEP));
    }

    #[test]
    fn failed_before_any_step_reports_zero() {
        let pacer = ProgressPacer::new(&[]);
        assert_eq!(pacer.failed().percent, 0);
        assert_eq!(pacer.stage(), "start");
    }

    #[tokio::test(start_paused = true)]
    async fn sync_body_helper_matches_plan() {
        let fake = FakeProvider::new(ProviderId::GoogleClassroom);
        fake.set_sync_body(sync_body(&[0.75, 0.45]));
        let (result, _) = run(&fake, &CancellationToken::new()).await;
        let summary = result.unwrap().summary;
        assert_eq!(summary.risk_distribution.high, 1);
        assert_eq!(summary.risk_distribution.moderate, 1);
    }
}
