//! Bounded status-polling loop.
//!
//! Sequential by construction: one status request is in flight at a
//! time, so updates for a task are applied in poll-attempt order. The
//! loop stops on a terminal provider status, the attempt ceiling, an
//! exhausted transient-retry budget, or cancellation.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use prism_core::artifact::select_artifacts;
use prism_core::error::OrchestrationError;
use prism_core::progress;
use prism_core::status::{translate_status, CanonicalStatus, StatusTranslation};
use prism_core::tools::ToolSpec;

use crate::transport::ProviderTransport;

/// Tunable polling parameters. Configured per deployment at the edge
/// (see the api crate's `ServerConfig`), never hardcoded at call sites.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Fixed delay between poll attempts.
    pub interval: Duration,
    /// Hard cap on poll attempts; `interval * max_attempts` bounds the
    /// job's polling wall-clock time.
    pub max_attempts: u32,
    /// Consecutive transport failures tolerated before escalating to a
    /// terminal `PollingTransient`.
    pub transient_retries: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_attempts: 200,
            transient_retries: 3,
        }
    }
}

/// Observable happenings during a poll loop, in attempt order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// A status observation; `progress` is already monotonic.
    Progress {
        status: CanonicalStatus,
        progress: u8,
    },
    /// A transport failure that will be retried silently.
    TransientFailure { attempt: u32, error: String },
}

/// Successful terminal result of a poll loop.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    /// Artifact URLs matching the tool's expected media kinds.
    pub artifacts: Vec<String>,
    /// Poll attempts consumed.
    pub attempts: u32,
    /// Wall-clock time spent polling.
    pub elapsed: Duration,
}

/// Poll a task until a terminal outcome.
///
/// Progress is never reported as decreasing, and never as 100 before a
/// true `Completed` is observed: provider-reported values are clamped to
/// 99 while live, and synthesized values (when the provider reports no
/// number) ramp against the attempt ceiling. The final 100 is the
/// caller's to apply on completion.
///
/// Every continuation checks `cancel` before acting; once the token is
/// cancelled the loop is inert and resolves `Cancelled`.
pub async fn poll_until_terminal<T, F>(
    transport: &T,
    task_id: &str,
    tool: &ToolSpec,
    config: &PollConfig,
    cancel: &CancellationToken,
    mut observer: F,
) -> Result<PollOutcome, OrchestrationError>
where
    T: ProviderTransport + ?Sized,
    F: FnMut(PollEvent),
{
    let started = Instant::now();
    let mut last_progress: u8 = 0;
    let mut consecutive_failures: u32 = 0;
    let mut attempt: u32 = 0;

    while attempt < config.max_attempts {
        attempt += 1;

        if cancel.is_cancelled() {
            return Err(OrchestrationError::Cancelled);
        }

        let fetched = tokio::select! {
            _ = cancel.cancelled() => return Err(OrchestrationError::Cancelled),
            result = transport.fetch_status(task_id) => result,
        };

        match fetched {
            Err(err) => {
                consecutive_failures += 1;
                tracing::warn!(
                    task_id,
                    attempt,
                    consecutive_failures,
                    error = %err,
                    "Status fetch failed",
                );
                if consecutive_failures > config.transient_retries {
                    return Err(OrchestrationError::PollingTransient(err.to_string()));
                }
                observer(PollEvent::TransientFailure {
                    attempt,
                    error: err.to_string(),
                });
            }
            Ok(status) => {
                consecutive_failures = 0;
                let translation = translate_status(&status.raw_status);

                match &translation {
                    StatusTranslation::Recognized(CanonicalStatus::Completed) => {
                        let outputs =
                            fetch_outputs_with_retry(transport, task_id, config, cancel).await?;
                        let artifacts = select_artifacts(&outputs, tool.expected_outputs);
                        if artifacts.is_empty() {
                            return Err(OrchestrationError::ArtifactNotFound {
                                task_id: task_id.to_string(),
                                expected: tool.expected_outputs_label(),
                            });
                        }
                        tracing::info!(
                            task_id,
                            attempts = attempt,
                            artifact_count = artifacts.len(),
                            "Task completed",
                        );
                        return Ok(PollOutcome {
                            artifacts,
                            attempts: attempt,
                            elapsed: started.elapsed(),
                        });
                    }
                    StatusTranslation::Recognized(CanonicalStatus::Failed) => {
                        return Err(OrchestrationError::TaskFailed(format!(
                            "provider reported terminal status '{}'",
                            status.raw_status
                        )));
                    }
                    StatusTranslation::Recognized(CanonicalStatus::Cancelled) => {
                        return Err(OrchestrationError::Cancelled);
                    }
                    StatusTranslation::Recognized(CanonicalStatus::TimedOut) => {
                        return Err(OrchestrationError::PollingTimeout {
                            task_id: task_id.to_string(),
                            elapsed_secs: started.elapsed().as_secs(),
                            attempts: attempt,
                        });
                    }
                    StatusTranslation::Recognized(_) | StatusTranslation::Unrecognized(_) => {
                        if let StatusTranslation::Unrecognized(raw) = &translation {
                            tracing::debug!(
                                task_id,
                                raw_status = %raw,
                                "Unrecognized provider status; continuing to poll",
                            );
                        }
                        let observed = match status.progress {
                            // 100 is reserved for a true Completed.
                            Some(reported) => reported.min(99),
                            None => progress::synthesize(attempt, config.max_attempts),
                        };
                        last_progress = progress::advance(last_progress, observed);
                        observer(PollEvent::Progress {
                            status: translation.observed_status(),
                            progress: last_progress,
                        });
                    }
                }
            }
        }

        if attempt < config.max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => return Err(OrchestrationError::Cancelled),
                _ = tokio::time::sleep(config.interval) => {}
            }
        }
    }

    Err(OrchestrationError::PollingTimeout {
        task_id: task_id.to_string(),
        elapsed_secs: started.elapsed().as_secs(),
        attempts: attempt,
    })
}

/// The completion-time outputs fetch, under the same transient budget
/// and cancellation rules as status fetches.
async fn fetch_outputs_with_retry<T>(
    transport: &T,
    task_id: &str,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> Result<Vec<prism_core::artifact::OutputDescriptor>, OrchestrationError>
where
    T: ProviderTransport + ?Sized,
{
    let mut failures: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(OrchestrationError::Cancelled);
        }

        let fetched = tokio::select! {
            _ = cancel.cancelled() => return Err(OrchestrationError::Cancelled),
            result = transport.fetch_outputs(task_id) => result,
        };

        match fetched {
            Ok(outputs) => return Ok(outputs),
            Err(err) => {
                failures += 1;
                tracing::warn!(task_id, failures, error = %err, "Outputs fetch failed");
                if failures > config.transient_retries {
                    return Err(OrchestrationError::PollingTransient(err.to_string()));
                }
                tokio::select! {
                    _ = cancel.cancelled() => return Err(OrchestrationError::Cancelled),
                    _ = tokio::time::sleep(config.interval) => {}
                }
            }
        }
    }
}
