//! Bounded retry around a single remote call.
//!
//! Every call to the analytics service, and the upload to the delivery
//! endpoint, goes through [`guard`]. Attempts follow each other immediately;
//! there is no backoff. Exhausting the budget fails the operation, never the
//! process.

use std::error::Error as StdError;
use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::run_log::RunLog;

/// Operation class of a remote call. The class picks the retry count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryBudget {
    /// Creates, updates, uploads and single-object reads.
    Write,
    /// One page of a paginated read.
    Read,
}

/// Retry counts per operation class. A count of `n` allows `n + 1` attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub write_retries: u32,
    pub read_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            write_retries: 3,
            read_retries: 4,
        }
    }
}

impl RetryConfig {
    pub fn retries_for(&self, budget: RetryBudget) -> u32 {
        match budget {
            RetryBudget::Write => self.write_retries,
            RetryBudget::Read => self.read_retries,
        }
    }
}

/// Terminal failure of a guarded call, carrying the last attempt's error.
#[derive(Debug, Clone, Error)]
#[error("{label} failed after {attempts} attempt(s): {message}")]
pub struct FailureDetail {
    pub label: String,
    pub attempts: u32,
    pub message: String,
    /// Messages of the nested sources, outermost first.
    pub causes: Vec<String>,
}

impl FailureDetail {
    pub fn causal_chain(&self) -> String {
        self.causes.join("\n")
    }
}

fn causes_of(err: &dyn StdError) -> Vec<String> {
    let mut causes = Vec::new();
    let mut current = err.source();
    while let Some(source) = current {
        causes.push(source.to_string());
        current = source.source();
    }
    causes
}

/// Run `op` until it succeeds or `retries` retries have been spent.
///
/// Each failed attempt logs a brief line and the nested source messages as
/// visible entries, plus the full debug form of the error as a local note.
pub async fn guard<T, E, F, Fut>(
    log: &mut RunLog,
    label: &str,
    retries: u32,
    mut op: F,
) -> Result<T, FailureDetail>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: StdError,
{
    let mut attempt = 0u32;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    log.note(format!("{label} succeeded on attempt {}", attempt + 1));
                }
                return Ok(value);
            }
            Err(err) => {
                let message = err.to_string();
                let causes = causes_of(&err);

                log.warn(format!("Failed {label}: Retry {attempt}: {message}"));
                log.note(format!("Failed {label}: Retry {attempt}: {err:?}"));
                if !causes.is_empty() {
                    log.warn(format!(
                        "Failed {label}: Retry {attempt}: Inner messages: {}",
                        causes.join("\n")
                    ));
                }

                if attempt < retries {
                    attempt += 1;
                    continue;
                }

                return Err(FailureDetail {
                    label: label.to_string(),
                    attempts: attempt + 1,
                    message,
                    causes,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, Error)]
    #[error("socket closed")]
    struct SocketClosed;

    #[derive(Debug, Error)]
    #[error("transport failure")]
    struct Transport {
        #[source]
        source: SocketClosed,
    }

    #[derive(Debug, Error)]
    #[error("service unavailable")]
    struct Unavailable {
        #[source]
        source: Transport,
    }

    #[derive(Debug, Error)]
    #[error("boom")]
    struct Boom;

    async fn always_failing(retries: u32) -> (u32, Result<(), FailureDetail>) {
        let calls = Cell::new(0u32);
        let mut log = RunLog::new();
        let result = guard(&mut log, "Update", retries, || {
            calls.set(calls.get() + 1);
            async { Err::<(), _>(Boom) }
        })
        .await;
        (calls.get(), result)
    }

    #[test]
    fn default_budgets_are_asymmetric() {
        let config = RetryConfig::default();
        assert_eq!(config.retries_for(RetryBudget::Write), 3);
        assert_eq!(config.retries_for(RetryBudget::Read), 4);
    }

    #[tokio::test]
    async fn success_short_circuits() {
        let calls = Cell::new(0u32);
        let mut log = RunLog::new();
        let result = guard(&mut log, "Create", 3, || {
            calls.set(calls.get() + 1);
            async { Ok::<_, Boom>(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 1);
        assert!(log.entries().is_empty());
    }

    #[tokio::test]
    async fn write_budget_makes_four_attempts() {
        let (calls, result) = always_failing(RetryConfig::default().write_retries).await;
        assert_eq!(calls, 4);
        let detail = result.unwrap_err();
        assert_eq!(detail.attempts, 4);
        assert_eq!(detail.message, "boom");
    }

    #[tokio::test]
    async fn read_budget_makes_five_attempts() {
        let (calls, result) = always_failing(RetryConfig::default().read_retries).await;
        assert_eq!(calls, 5);
        assert_eq!(result.unwrap_err().attempts, 5);
    }

    #[tokio::test]
    async fn zero_retries_calls_once() {
        let (calls, result) = always_failing(0).await;
        assert_eq!(calls, 1);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn succeeding_on_attempt_k_calls_k_times() {
        for k in 1..=4u32 {
            let calls = Cell::new(0u32);
            let mut log = RunLog::new();
            let result = guard(&mut log, "QueryCSV", 3, || {
                calls.set(calls.get() + 1);
                let attempt = calls.get();
                async move {
                    if attempt < k {
                        Err(Boom)
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

            assert_eq!(result.unwrap(), k);
            assert_eq!(calls.get(), k);
        }
    }

    #[tokio::test]
    async fn failure_captures_causal_chain_outermost_first() {
        let mut log = RunLog::new();
        let result = guard(&mut log, "Create", 0, || async {
            Err::<(), _>(Unavailable {
                source: Transport {
                    source: SocketClosed,
                },
            })
        })
        .await;

        let detail = result.unwrap_err();
        assert_eq!(detail.message, "service unavailable");
        assert_eq!(detail.causes, vec!["transport failure", "socket closed"]);
        assert_eq!(detail.causal_chain(), "transport failure\nsocket closed");

        let visible = log.detail_text();
        assert!(visible.contains("Failed Create: Retry 0: service unavailable"));
        assert!(visible.contains("Inner messages: transport failure\nsocket closed"));
    }

    #[tokio::test]
    async fn each_attempt_is_logged() {
        let mut log = RunLog::new();
        let _ = guard(&mut log, "Update", 2, || async { Err::<(), _>(Boom) }).await;

        let visible = log.detail_text();
        assert!(visible.contains("Failed Update: Retry 0: boom"));
        assert!(visible.contains("Failed Update: Retry 1: boom"));
        assert!(visible.contains("Failed Update: Retry 2: boom"));
        assert!(!visible.contains("Retry 3"));
    }
}
