//! The query pipeline: an explicit, ordered chain of handlers composed at
//! construction time.
//!
//! Each handler receives the context, a [`Next`] pointing at the rest of the
//! chain and a cancellation token, and produces a [`PipelineResult`] by
//! delegating, short-circuiting, or post-processing the delegated result.
//! Handlers that do not apply to the current query kind are skipped
//! transparently. The standard order is: logging, error handling (retry),
//! resolution, lazy-navigation attachment, tracking, conversion, execution.
//! On the way back out of the chain raw snapshots are therefore converted
//! first, identity-resolved second and given navigation handles last.

mod context;
pub mod handlers;
mod include_loader;
mod result;

pub use context::{ExecutionArtifacts, PipelineContext, QueryKind};
pub use include_loader::{IncludeLoader, NavigationHandle};
pub use result::{EntityRecord, ItemStream, PipelineItem, PipelineResult};

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::client::StoreClient;
use crate::convert::TypeConverter;
use crate::diagnostics::DiagnosticsSink;
use crate::error::{internal_error, OdmResult};
use crate::metadata::MetadataProvider;

pub use handlers::error_handling::RetrySettings;

/// One stage of the pipeline.
#[async_trait]
pub trait QueryHandler: Send + Sync {
    /// Stable name, used for chain inspection and diagnostics.
    fn name(&self) -> &'static str;

    /// Whether this handler participates for the given query kind; handlers
    /// that return `false` are passed over without being invoked.
    fn applies_to(&self, kind: QueryKind) -> bool {
        let _ = kind;
        true
    }

    async fn handle(
        &self,
        context: PipelineContext,
        next: Next<'_>,
        cancel: &CancellationToken,
    ) -> OdmResult<PipelineResult>;
}

/// The remainder of the handler chain after the current stage.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    handlers: &'a [Arc<dyn QueryHandler>],
}

impl<'a> Next<'a> {
    pub fn run(
        self,
        context: PipelineContext,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, OdmResult<PipelineResult>> {
        Box::pin(async move {
            match self.handlers.split_first() {
                None => Err(internal_error(
                    "Handler chain ended without a terminal handler",
                )),
                Some((head, rest)) => {
                    let next = Next { handlers: rest };
                    if head.applies_to(context.kind()) {
                        head.handle(context, next, cancel).await
                    } else {
                        next.run(context, cancel).await
                    }
                }
            }
        })
    }
}

/// Everything the standard handler chain depends on.
#[derive(Clone)]
pub struct PipelineDependencies {
    pub client: Arc<dyn StoreClient>,
    pub metadata: Arc<dyn MetadataProvider>,
    pub converter: Arc<dyn TypeConverter>,
    pub diagnostics: Arc<dyn DiagnosticsSink>,
    pub retry: RetrySettings,
    /// When present, materialized records get lazy navigation handles.
    pub include_loader: Option<Arc<IncludeLoader>>,
}

/// An ordered, inspectable handler chain.
pub struct QueryPipeline {
    handlers: Vec<Arc<dyn QueryHandler>>,
}

impl QueryPipeline {
    pub fn new(handlers: Vec<Arc<dyn QueryHandler>>) -> Self {
        Self { handlers }
    }

    /// The standard chain in its required order.
    pub fn standard(deps: PipelineDependencies) -> Self {
        Self::new(vec![
            Arc::new(handlers::logging::LoggingHandler::new(deps.diagnostics)),
            Arc::new(handlers::error_handling::ErrorHandlingHandler::new(
                deps.retry,
            )),
            Arc::new(handlers::resolve::ResolveHandler::new(Arc::clone(
                &deps.metadata,
            ))),
            Arc::new(handlers::lazy::LazyNavigationHandler::new(
                deps.include_loader,
            )),
            Arc::new(handlers::track::TrackingHandler::new(Arc::clone(
                &deps.metadata,
            ))),
            Arc::new(handlers::convert::ConvertHandler::new(
                Arc::clone(&deps.metadata),
                deps.converter,
            )),
            Arc::new(handlers::execute::ExecutionHandler::new(deps.client)),
        ])
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|handler| handler.name()).collect()
    }

    pub async fn execute(
        &self,
        context: PipelineContext,
        cancel: &CancellationToken,
    ) -> OdmResult<PipelineResult> {
        Next {
            handlers: &self.handlers,
        }
        .run(context, cancel)
        .await
    }
}
