use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::error::OdmResult;
use crate::pipeline::{
    IncludeLoader, NavigationHandle, Next, PipelineContext, PipelineItem, PipelineResult,
    QueryHandler, QueryKind,
};

/// Last post-processing stage: attaches a navigation handle to every
/// materialized record so unfetched navigations can be loaded on demand.
/// Inactive unless an include loader is configured.
pub struct LazyNavigationHandler {
    loader: Option<Arc<IncludeLoader>>,
}

impl LazyNavigationHandler {
    pub fn new(loader: Option<Arc<IncludeLoader>>) -> Self {
        Self { loader }
    }

    fn attach(loader: &Arc<IncludeLoader>, item: PipelineItem) -> PipelineItem {
        match item {
            PipelineItem::Record(record) => {
                let handle = NavigationHandle::new(
                    Arc::clone(loader),
                    record.key().clone(),
                    record.entity(),
                );
                PipelineItem::Record(record.with_navigations(handle))
            }
            other => other,
        }
    }
}

#[async_trait]
impl QueryHandler for LazyNavigationHandler {
    fn name(&self) -> &'static str {
        "lazy-navigation"
    }

    fn applies_to(&self, kind: QueryKind) -> bool {
        kind == QueryKind::Entity
    }

    async fn handle(
        &self,
        context: PipelineContext,
        next: Next<'_>,
        cancel: &CancellationToken,
    ) -> OdmResult<PipelineResult> {
        let result = next.run(context, cancel).await?;
        let Some(loader) = &self.loader else {
            return Ok(result);
        };

        match result {
            PipelineResult::Materialized { items, context } => {
                let loader = Arc::clone(loader);
                let items = items
                    .into_iter()
                    .map(|item| Self::attach(&loader, item))
                    .collect();
                Ok(PipelineResult::Materialized { items, context })
            }
            PipelineResult::Streaming { stream, context } => {
                let loader = Arc::clone(loader);
                let stream = stream
                    .map(move |item| item.map(|item| Self::attach(&loader, item)))
                    .boxed();
                Ok(PipelineResult::Streaming { stream, context })
            }
            other => Ok(other),
        }
    }
}
