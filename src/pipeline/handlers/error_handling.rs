use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{cancelled, OdmError, OdmErrorCode, OdmResult};
use crate::pipeline::{Next, PipelineContext, PipelineResult, QueryHandler};

/// Bounded retry with increasing delay for transient failures.
#[derive(Clone, Debug)]
pub struct RetrySettings {
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetrySettings {
    pub fn should_retry(&self, attempt: usize, error: &OdmError) -> bool {
        if error.code == OdmErrorCode::Cancelled {
            return false;
        }
        if attempt + 1 >= self.max_attempts {
            return false;
        }
        error.is_transient()
    }

    pub fn backoff_delay(&self, attempt: usize) -> Duration {
        let factor = self.multiplier.powi(attempt as i32);
        let delay = self.initial_delay.mul_f64(factor);
        if delay > self.max_delay {
            self.max_delay
        } else {
            delay
        }
    }
}

/// Classifies failures from the rest of the chain and retries the transient
/// ones. Non-transient failures and cancellation surface unchanged and
/// immediately.
pub struct ErrorHandlingHandler {
    retry: RetrySettings,
}

impl ErrorHandlingHandler {
    pub fn new(retry: RetrySettings) -> Self {
        Self { retry }
    }
}

#[async_trait]
impl QueryHandler for ErrorHandlingHandler {
    fn name(&self) -> &'static str {
        "error-handling"
    }

    async fn handle(
        &self,
        context: PipelineContext,
        next: Next<'_>,
        cancel: &CancellationToken,
    ) -> OdmResult<PipelineResult> {
        let mut attempt = 0usize;
        loop {
            if cancel.is_cancelled() {
                return Err(cancelled());
            }
            match next.run(context.clone(), cancel).await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    if !self.retry.should_retry(attempt, &err) {
                        return Err(err);
                    }
                    let delay = self.retry.backoff_delay(attempt);
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(cancelled()),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{invalid_argument, unavailable};

    #[test]
    fn retries_transient_errors_within_bound() {
        let settings = RetrySettings {
            max_attempts: 3,
            ..Default::default()
        };
        let transient = unavailable("backend overloaded");
        assert!(settings.should_retry(0, &transient));
        assert!(settings.should_retry(1, &transient));
        assert!(!settings.should_retry(2, &transient));
    }

    #[test]
    fn never_retries_non_transient_or_cancellation() {
        let settings = RetrySettings::default();
        assert!(!settings.should_retry(0, &invalid_argument("bad filter")));
        assert!(!settings.should_retry(0, &cancelled()));
    }

    #[test]
    fn backoff_grows_and_caps() {
        let settings = RetrySettings {
            max_attempts: 10,
            initial_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(settings.backoff_delay(0), Duration::from_millis(100));
        assert_eq!(settings.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(settings.backoff_delay(5), Duration::from_millis(500));
    }
}
