use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::OdmResult;
use crate::metadata::MetadataProvider;
use crate::pipeline::{
    Next, PipelineContext, PipelineItem, PipelineResult, QueryHandler, QueryKind,
};

/// Identity resolution against the unit-of-work: a record whose key is
/// already tracked is substituted with the tracked instance, so repeated
/// reads of the same document hand back the same shared instance. New
/// records register as unchanged.
///
/// The tracker is pulled from the context at call time; the handler itself
/// holds no unit-of-work state.
pub struct TrackingHandler {
    metadata: Arc<dyn MetadataProvider>,
}

impl TrackingHandler {
    pub fn new(metadata: Arc<dyn MetadataProvider>) -> Self {
        Self { metadata }
    }
}

#[async_trait]
impl QueryHandler for TrackingHandler {
    fn name(&self) -> &'static str {
        "tracking"
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
        let tracking = context.tracking();
        let tracker = context.tracker();
        let result = next.run(context, cancel).await?;

        let (Some(tracker), true) = (tracker, tracking) else {
            return Ok(result);
        };

        match result {
            PipelineResult::Materialized { items, context } => {
                let mut tracker = tracker.lock().unwrap();
                let items = items
                    .into_iter()
                    .map(|item| match item {
                        PipelineItem::Record(record)
                            if self.metadata.descriptor(record.entity()).is_some() =>
                        {
                            let path = record.key().path().canonical_string();
                            let instance = tracker.resolve_or_track(
                                record.entity(),
                                &path,
                                Arc::clone(record.instance()),
                            );
                            PipelineItem::Record(record.with_instance(instance))
                        }
                        other => other,
                    })
                    .collect();
                Ok(PipelineResult::Materialized { items, context })
            }
            other => Ok(other),
        }
    }
}
