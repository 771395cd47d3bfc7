//! Observability hooks. Sinks never affect control flow; the pipeline calls
//! them and moves on.

use std::time::Duration;

/// Receives query lifecycle events from the logging handler.
pub trait DiagnosticsSink: Send + Sync {
    fn query_executing(&self, description: &str);

    fn query_executed(&self, description: &str, duration: Duration, result_count: Option<usize>);

    fn query_failed(&self, description: &str, duration: Duration, error: &str);
}

/// Default sink that writes through the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogDiagnostics;

impl DiagnosticsSink for LogDiagnostics {
    fn query_executing(&self, description: &str) {
        log::debug!("executing {description}");
    }

    fn query_executed(&self, description: &str, duration: Duration, result_count: Option<usize>) {
        match result_count {
            Some(count) => {
                log::debug!("executed {description} in {duration:?} ({count} results)")
            }
            None => log::debug!("executed {description} in {duration:?}"),
        }
    }

    fn query_failed(&self, description: &str, duration: Duration, error: &str) {
        log::warn!("query {description} failed after {duration:?}: {error}");
    }
}
