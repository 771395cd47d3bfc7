use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::OdmResult;
use crate::metadata::MetadataProvider;
use crate::pipeline::{Next, PipelineContext, PipelineResult, QueryHandler};
use crate::resolver::QueryResolver;

/// Resolves the query expression exactly once per request and stores the
/// result on the context before delegating.
pub struct ResolveHandler {
    metadata: Arc<dyn MetadataProvider>,
}

impl ResolveHandler {
    pub fn new(metadata: Arc<dyn MetadataProvider>) -> Self {
        Self { metadata }
    }
}

#[async_trait]
impl QueryHandler for ResolveHandler {
    fn name(&self) -> &'static str {
        "resolve"
    }

    async fn handle(
        &self,
        mut context: PipelineContext,
        next: Next<'_>,
        cancel: &CancellationToken,
    ) -> OdmResult<PipelineResult> {
        if context.resolved().is_none() {
            let resolver = QueryResolver::new(self.metadata.as_ref());
            let resolved = resolver.resolve(context.expression(), context.parameters())?;
            context.set_resolved(resolved);
        }
        next.run(context, cancel).await
    }
}
