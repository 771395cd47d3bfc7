use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::client::{DocumentSnapshot, StoreClient};
use crate::error::OdmResult;
use crate::model::{strip_qualified_prefix, ResourcePath};
use crate::native::{
    build_aggregate, build_include_query, build_min_max_query, build_point_read, build_query,
    build_subcollection_aggregate, build_subcollection_query,
};
use crate::pipeline::{
    ExecutionArtifacts, Next, PipelineContext, PipelineItem, PipelineResult, QueryHandler,
    QueryKind,
};
use crate::resolver::{
    ResolvedInclude, ResolvedIncludeKind, ResolvedQuery, ResolvedSubcollectionProjection,
};

/// Terminal stage: issues reads against the store and accumulates every
/// fetched document (roots and everything transitively included) in the
/// context's flat snapshot map. Never calls the rest of the chain.
pub struct ExecutionHandler {
    client: Arc<dyn StoreClient>,
}

impl ExecutionHandler {
    pub fn new(client: Arc<dyn StoreClient>) -> Self {
        Self { client }
    }

    async fn execute_scalar(
        &self,
        mut context: PipelineContext,
        resolved: &ResolvedQuery,
        cancel: &CancellationToken,
    ) -> OdmResult<PipelineResult> {
        let aggregation = resolved
            .aggregation()
            .expect("scalar execution requires an aggregation");

        if aggregation.kind().is_native() {
            let native = build_aggregate(resolved)?;
            let value = self.client.run_aggregate(&native, cancel).await?;
            return Ok(PipelineResult::Scalar(value));
        }

        // Min/max run as ordered limit-1 queries; the convert stage extracts
        // the field value from the zero-or-one matched documents.
        let native = build_min_max_query(resolved)?;
        let documents = self.client.run_query(&native, cancel).await?;
        let items = documents
            .iter()
            .cloned()
            .map(PipelineItem::Snapshot)
            .collect();
        for snapshot in documents {
            context.artifacts_mut().insert_snapshot(snapshot);
        }
        Ok(PipelineResult::materialized(items, context))
    }

    async fn execute_document(
        &self,
        mut context: PipelineContext,
        resolved: &ResolvedQuery,
        cancel: &CancellationToken,
    ) -> OdmResult<PipelineResult> {
        let key = build_point_read(resolved)?;
        let Some(root) = self.client.get_document(&key, cancel).await? else {
            return Ok(PipelineResult::Empty);
        };

        let mut artifacts = ExecutionArtifacts::new();
        artifacts.insert_snapshot(root.clone());
        self.load_includes(&root, resolved.includes(), &mut artifacts, cancel)
            .await?;
        if let Some(projection) = resolved.projection() {
            self.load_subcollection_projections(
                &root,
                projection.subcollections(),
                &mut artifacts,
                cancel,
            )
            .await?;
        }

        *context.artifacts_mut() = artifacts;
        Ok(PipelineResult::materialized(
            vec![PipelineItem::Snapshot(root)],
            context,
        ))
    }

    async fn execute_collection(
        &self,
        mut context: PipelineContext,
        resolved: &ResolvedQuery,
        cancel: &CancellationToken,
    ) -> OdmResult<PipelineResult> {
        let native = build_query(resolved)?;
        let roots = self.client.run_query(&native, cancel).await?;

        let streamable = context.prefer_streaming()
            && !context.tracking()
            && resolved.includes().is_empty()
            && resolved.projection().is_none();
        if streamable {
            let stream = stream::iter(roots.into_iter().map(|snapshot| {
                Ok(PipelineItem::Snapshot(snapshot))
            }))
            .boxed();
            return Ok(PipelineResult::streaming(stream, context));
        }

        let mut artifacts = ExecutionArtifacts::new();
        let mut items = Vec::with_capacity(roots.len());
        for root in roots {
            artifacts.insert_snapshot(root.clone());
            self.load_includes(&root, resolved.includes(), &mut artifacts, cancel)
                .await?;
            if let Some(projection) = resolved.projection() {
                self.load_subcollection_projections(
                    &root,
                    projection.subcollections(),
                    &mut artifacts,
                    cancel,
                )
                .await?;
            }
            items.push(PipelineItem::Snapshot(root));
        }

        *context.artifacts_mut() = artifacts;
        Ok(PipelineResult::materialized(items, context))
    }

    /// Recursive eager loading. Reference includes resolve the pointer field,
    /// skip anything already fetched (the cycle and duplicate guard) and
    /// silently tolerate dangling pointers; collection includes query every
    /// child. Each fetched document lands in the flat map and is then walked
    /// for its own nested includes. Sibling fetches are awaited sequentially.
    fn load_includes<'a>(
        &'a self,
        parent: &'a DocumentSnapshot,
        includes: &'a [ResolvedInclude],
        artifacts: &'a mut ExecutionArtifacts,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, OdmResult<()>> {
        Box::pin(async move {
            for include in includes {
                match include.kind() {
                    ResolvedIncludeKind::Reference { field } => {
                        let Some(value) = parent.field(field) else {
                            continue;
                        };
                        let Some(raw) = value.as_reference().or_else(|| value.as_str()) else {
                            continue;
                        };
                        let Ok(parsed) = ResourcePath::from_string(raw) else {
                            continue;
                        };
                        let relative = strip_qualified_prefix(&parsed).canonical_string();
                        if artifacts.contains_snapshot(&relative) {
                            continue;
                        }
                        let raw = raw.to_string();
                        match self
                            .client
                            .get_document_by_reference(&raw, cancel)
                            .await?
                        {
                            Some(child) => {
                                artifacts.insert_snapshot(child.clone());
                                self.load_includes(&child, include.nested(), artifacts, cancel)
                                    .await?;
                            }
                            // Dangling pointer: treated as not found.
                            None => continue,
                        }
                    }
                    ResolvedIncludeKind::Collection { collection_id } => {
                        let query = build_include_query(parent.path(), collection_id);
                        let children = self.client.run_query(&query, cancel).await?;
                        for child in children {
                            artifacts.insert_snapshot(child.clone());
                            self.load_includes(&child, include.nested(), artifacts, cancel)
                                .await?;
                        }
                    }
                }
            }
            Ok(())
        })
    }

    /// Recursive walk for subcollection projections; levels terminating in
    /// an aggregation store their result under `parentPath:resultName`
    /// instead of fetching rows.
    fn load_subcollection_projections<'a>(
        &'a self,
        parent: &'a DocumentSnapshot,
        projections: &'a [ResolvedSubcollectionProjection],
        artifacts: &'a mut ExecutionArtifacts,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, OdmResult<()>> {
        Box::pin(async move {
            for projection in projections {
                if projection.aggregation().is_some() {
                    let native = build_subcollection_aggregate(parent.path(), projection)?;
                    let value = self.client.run_aggregate(&native, cancel).await?;
                    let key = format!(
                        "{}:{}",
                        parent.path().canonical_string(),
                        projection.result_name()
                    );
                    artifacts.insert_aggregation(key, value);
                    continue;
                }

                let query = build_subcollection_query(parent.path(), projection);
                let children = self.client.run_query(&query, cancel).await?;
                for child in children {
                    artifacts.insert_snapshot(child.clone());
                    self.load_subcollection_projections(
                        &child,
                        projection.nested(),
                        artifacts,
                        cancel,
                    )
                    .await?;
                }
            }
            Ok(())
        })
    }
}

#[async_trait]
impl QueryHandler for ExecutionHandler {
    fn name(&self) -> &'static str {
        "execute"
    }

    async fn handle(
        &self,
        context: PipelineContext,
        _next: Next<'_>,
        cancel: &CancellationToken,
    ) -> OdmResult<PipelineResult> {
        let resolved = context.resolved_query()?;

        match context.kind() {
            QueryKind::Aggregation | QueryKind::Predicate => {
                self.execute_scalar(context, &resolved, cancel).await
            }
            QueryKind::Entity | QueryKind::Projection => {
                if resolved.is_document_query() {
                    self.execute_document(context, &resolved, cancel).await
                } else {
                    self.execute_collection(context, &resolved, cancel).await
                }
            }
        }
    }
}
