use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::diagnostics::DiagnosticsSink;
use crate::error::OdmResult;
use crate::pipeline::{Next, PipelineContext, PipelineResult, QueryHandler};

/// Outermost stage: emits executing/executed/failed events. Side effects
/// only; the result passes through untouched.
pub struct LoggingHandler {
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl LoggingHandler {
    pub fn new(diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        Self { diagnostics }
    }
}

#[async_trait]
impl QueryHandler for LoggingHandler {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn handle(
        &self,
        context: PipelineContext,
        next: Next<'_>,
        cancel: &CancellationToken,
    ) -> OdmResult<PipelineResult> {
        let description = context.describe();
        self.diagnostics.query_executing(&description);
        let started = Instant::now();

        match next.run(context, cancel).await {
            Ok(result) => {
                let count = match &result {
                    PipelineResult::Empty => Some(0),
                    PipelineResult::Scalar(_) => Some(1),
                    PipelineResult::Materialized { items, .. } => Some(items.len()),
                    // Item count is unknown until the stream is drained.
                    PipelineResult::Streaming { .. } => None,
                };
                self.diagnostics
                    .query_executed(&description, started.elapsed(), count);
                Ok(result)
            }
            Err(err) => {
                self.diagnostics
                    .query_failed(&description, started.elapsed(), &err.to_string());
                Err(err)
            }
        }
    }
}
