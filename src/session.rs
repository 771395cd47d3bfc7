//! The typed entry point: a session owning the store client, metadata
//! registry, pipeline and unit-of-work, plus a fluent builder over the query
//! expression. Every query semantic lives in the expression and the
//! pipeline; the builder only assembles them.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::client::StoreClient;
use crate::convert::StandardTypeConverter;
use crate::diagnostics::{DiagnosticsSink, LogDiagnostics};
use crate::error::{invalid_argument, OdmError, OdmResult};
use crate::expression::{
    AggregationKind, AggregationSpec, FilterOperator, FirestoreCursor, IncludeSpec, OrderByClause,
    OrderDirection, ProjectionSpec, QueryExpression, ValueExpression, WhereClause,
};
use crate::metadata::{MetadataProvider, MetadataRegistry, Record, ScalarKind, ScalarShape};
use crate::model::{FieldPath, IntoFieldPath};
use crate::pipeline::{
    EntityRecord, IncludeLoader, PipelineContext, PipelineDependencies, PipelineItem,
    PipelineResult, QueryPipeline, RetrySettings,
};
use crate::resolver::QueryContext;
use crate::tracking::EntityTracker;
use crate::value::{MapValue, Value};

/// Session-wide configuration, builder-style.
#[derive(Clone)]
pub struct SessionOptions {
    pub tracking: bool,
    pub lazy_navigation: bool,
    pub retry: RetrySettings,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            tracking: true,
            lazy_navigation: false,
            retry: RetrySettings::default(),
        }
    }
}

impl SessionOptions {
    pub fn no_tracking(mut self) -> Self {
        self.tracking = false;
        self
    }

    pub fn with_lazy_navigation(mut self) -> Self {
        self.lazy_navigation = true;
        self
    }

    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }
}

/// One logical unit of work against the store.
pub struct DocumentSession {
    pipeline: QueryPipeline,
    tracker: Arc<Mutex<EntityTracker>>,
    options: SessionOptions,
}

impl DocumentSession {
    pub fn new(
        client: Arc<dyn StoreClient>,
        metadata: Arc<MetadataRegistry>,
        options: SessionOptions,
    ) -> Self {
        Self::with_diagnostics(client, metadata, options, Arc::new(LogDiagnostics))
    }

    pub fn with_diagnostics(
        client: Arc<dyn StoreClient>,
        metadata: Arc<MetadataRegistry>,
        options: SessionOptions,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        let metadata: Arc<dyn MetadataProvider> = metadata;
        let include_loader = options.lazy_navigation.then(|| {
            Arc::new(IncludeLoader::new(
                Arc::clone(&client),
                Arc::clone(&metadata),
            ))
        });
        let pipeline = QueryPipeline::standard(PipelineDependencies {
            client,
            metadata,
            converter: Arc::new(StandardTypeConverter),
            diagnostics,
            retry: options.retry.clone(),
            include_loader,
        });
        Self {
            pipeline,
            tracker: Arc::new(Mutex::new(EntityTracker::new())),
            options,
        }
    }

    pub fn query<T: Record>(&self) -> Query<'_, T> {
        let descriptor = T::descriptor();
        Query {
            session: self,
            expression: QueryExpression::for_collection(
                descriptor.entity_name(),
                descriptor.collection().to_string(),
            ),
            parameters: QueryContext::new(),
            cancel: CancellationToken::new(),
            no_tracking: false,
            deferred_error: None,
            _marker: PhantomData,
        }
    }

    /// Point read by document id; `None` when the document does not exist.
    pub async fn find<T: Record>(&self, id: &str) -> OdmResult<Option<Arc<T>>> {
        self.query::<T>().find(id).await
    }

    /// The session's unit-of-work.
    pub fn tracker(&self) -> Arc<Mutex<EntityTracker>> {
        Arc::clone(&self.tracker)
    }

    pub fn pipeline(&self) -> &QueryPipeline {
        &self.pipeline
    }
}

/// Fluent, typed query builder. Consuming combinators update the underlying
/// expression; terminals run the pipeline.
pub struct Query<'a, T: Record> {
    session: &'a DocumentSession,
    expression: QueryExpression,
    parameters: QueryContext,
    cancel: CancellationToken,
    no_tracking: bool,
    deferred_error: Option<OdmError>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Record> Query<'a, T> {
    fn field(&mut self, field: impl IntoFieldPath) -> Option<FieldPath> {
        match field.into_field_path() {
            Ok(path) => Some(path),
            Err(err) => {
                if self.deferred_error.is_none() {
                    self.deferred_error = Some(err);
                }
                None
            }
        }
    }

    pub fn filter(
        mut self,
        field: impl IntoFieldPath,
        operator: FilterOperator,
        value: impl Into<ValueExpression>,
    ) -> Self {
        if let Some(path) = self.field(field) {
            self.expression = self
                .expression
                .with_filter(WhereClause::new(path, operator, value));
        }
        self
    }

    /// Prefix match: `field >= prefix` and `field < prefix + U+FFFF`.
    pub fn starts_with(
        mut self,
        field: impl IntoFieldPath,
        prefix: impl Into<ValueExpression>,
    ) -> Self {
        if let Some(path) = self.field(field) {
            let prefix = prefix.into();
            self.expression = self
                .expression
                .with_filter(WhereClause::new(
                    path.clone(),
                    FilterOperator::GreaterThanOrEqual,
                    prefix.clone(),
                ))
                .with_filter(WhereClause::new(
                    path,
                    FilterOperator::LessThan,
                    ValueExpression::prefix_upper_bound(prefix),
                ));
        }
        self
    }

    pub fn order_by(mut self, field: impl IntoFieldPath, direction: OrderDirection) -> Self {
        if let Some(path) = self.field(field) {
            self.expression = self
                .expression
                .with_order_by(OrderByClause::new(path, direction));
        }
        self
    }

    pub fn order_by_ascending(self, field: impl IntoFieldPath) -> Self {
        self.order_by(field, OrderDirection::Ascending)
    }

    pub fn order_by_descending(self, field: impl IntoFieldPath) -> Self {
        self.order_by(field, OrderDirection::Descending)
    }

    pub fn limit(mut self, limit: impl Into<ValueExpression>) -> Self {
        self.expression = self.expression.with_limit(limit);
        self
    }

    pub fn skip(mut self, skip: impl Into<ValueExpression>) -> Self {
        self.expression = self.expression.with_skip(skip);
        self
    }

    pub fn start_after(mut self, cursor: FirestoreCursor) -> Self {
        self.expression = self.expression.with_cursor(cursor);
        self
    }

    pub fn include(mut self, navigation: &str) -> Self {
        self.expression = self
            .expression
            .with_include(IncludeSpec::navigation(navigation));
        self
    }

    /// Nests under the most recent `include`.
    pub fn then_include(mut self, navigation: &str) -> Self {
        self.expression = self
            .expression
            .with_then_include(IncludeSpec::navigation(navigation));
        self
    }

    pub fn project(mut self, projection: ProjectionSpec) -> Self {
        self.expression = self.expression.with_projection(projection);
        self
    }

    /// Binds a named query parameter.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.bind(name, value);
        self
    }

    pub fn as_no_tracking(mut self) -> Self {
        self.no_tracking = true;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn context(&self, expression: QueryExpression) -> PipelineContext {
        let mut context = PipelineContext::new(expression, self.parameters.clone());
        if self.session.options.tracking && !self.no_tracking {
            context = context.with_tracking(self.session.tracker());
        }
        context
    }

    async fn run(&self, expression: QueryExpression) -> OdmResult<PipelineResult> {
        if let Some(err) = &self.deferred_error {
            return Err(err.clone());
        }
        self.session
            .pipeline
            .execute(self.context(expression), &self.cancel)
            .await
    }

    async fn run_scalar(&self, expression: QueryExpression) -> OdmResult<Value> {
        match self.run(expression).await? {
            PipelineResult::Scalar(value) => Ok(value),
            _ => Err(invalid_argument("Query did not produce a scalar result")),
        }
    }

    /// Materialized records, including their lazy-navigation handles.
    pub async fn records(self) -> OdmResult<Vec<EntityRecord>> {
        match self.run(self.expression.clone()).await? {
            PipelineResult::Empty => Ok(Vec::new()),
            PipelineResult::Materialized { items, .. } => Ok(items
                .into_iter()
                .filter_map(|item| match item {
                    PipelineItem::Record(record) => Some(record),
                    _ => None,
                })
                .collect()),
            _ => Err(invalid_argument("Query did not produce entity records")),
        }
    }

    pub async fn to_vec(self) -> OdmResult<Vec<Arc<T>>> {
        self.records()
            .await?
            .iter()
            .map(EntityRecord::downcast)
            .collect()
    }

    pub async fn first(self) -> OdmResult<Option<Arc<T>>> {
        let limited = self.expression.clone().with_limit(1);
        let records = match self.run(limited).await? {
            PipelineResult::Empty => Vec::new(),
            PipelineResult::Materialized { items, .. } => items,
            _ => return Err(invalid_argument("Query did not produce entity records")),
        };
        records
            .iter()
            .find_map(|item| match item {
                PipelineItem::Record(record) => Some(record.downcast()),
                _ => None,
            })
            .transpose()
    }

    pub async fn find(self, id: &str) -> OdmResult<Option<Arc<T>>> {
        let expression = self.expression.clone().with_id_lookup(id);
        match self.run(expression).await? {
            PipelineResult::Empty => Ok(None),
            PipelineResult::Materialized { items, .. } => items
                .iter()
                .find_map(|item| match item {
                    PipelineItem::Record(record) => Some(record.downcast()),
                    _ => None,
                })
                .transpose(),
            _ => Err(invalid_argument("Point read did not produce a record")),
        }
    }

    /// Single-pass lazy sequence; deserialization happens as the stream is
    /// drained. Falls back to a materialized source when the query shape
    /// requires one (tracking, includes, projections).
    pub async fn stream(self) -> OdmResult<BoxStream<'static, OdmResult<Arc<T>>>> {
        let context = self
            .context(self.expression.clone())
            .with_streaming_preferred();
        if let Some(err) = &self.deferred_error {
            return Err(err.clone());
        }
        let result = self
            .session
            .pipeline
            .execute(context, &self.cancel)
            .await?;
        match result {
            PipelineResult::Empty => Ok(futures::stream::empty().boxed()),
            PipelineResult::Streaming { stream, .. } => Ok(stream
                .map(|item| {
                    item.and_then(|item| match item {
                        PipelineItem::Record(record) => record.downcast::<T>(),
                        _ => Err(invalid_argument("Stream did not produce entity records")),
                    })
                })
                .boxed()),
            PipelineResult::Materialized { items, .. } => {
                let records: Vec<OdmResult<Arc<T>>> = items
                    .into_iter()
                    .filter_map(|item| match item {
                        PipelineItem::Record(record) => Some(record.downcast::<T>()),
                        _ => None,
                    })
                    .collect();
                Ok(futures::stream::iter(records).boxed())
            }
            _ => Err(invalid_argument("Query did not produce entity records")),
        }
    }

    pub async fn count(self) -> OdmResult<i64> {
        let expression = self.expression.clone().with_aggregation(AggregationSpec::new(
            AggregationKind::Count,
            None,
            ScalarShape::required(ScalarKind::Integer),
        ));
        let value = self.run_scalar(expression).await?;
        value
            .as_integer()
            .ok_or_else(|| invalid_argument("Count did not produce an integer"))
    }

    pub async fn any(self) -> OdmResult<bool> {
        let expression = self.expression.clone().with_aggregation(AggregationSpec::new(
            AggregationKind::Any,
            None,
            ScalarShape::required(ScalarKind::Boolean),
        ));
        let value = self.run_scalar(expression).await?;
        value
            .as_bool()
            .ok_or_else(|| invalid_argument("Existence check did not produce a boolean"))
    }

    pub async fn sum(self, field: impl IntoFieldPath, result: ScalarShape) -> OdmResult<Value> {
        self.aggregate(AggregationKind::Sum, field, result).await
    }

    pub async fn average(self, field: impl IntoFieldPath, result: ScalarShape) -> OdmResult<Value> {
        self.aggregate(AggregationKind::Average, field, result).await
    }

    pub async fn min(self, field: impl IntoFieldPath, result: ScalarShape) -> OdmResult<Value> {
        self.aggregate(AggregationKind::Min, field, result).await
    }

    pub async fn max(self, field: impl IntoFieldPath, result: ScalarShape) -> OdmResult<Value> {
        self.aggregate(AggregationKind::Max, field, result).await
    }

    async fn aggregate(
        self,
        kind: AggregationKind,
        field: impl IntoFieldPath,
        result: ScalarShape,
    ) -> OdmResult<Value> {
        let property = field.into_field_path()?;
        let expression = self.expression.clone().with_aggregation(AggregationSpec::new(
            kind,
            Some(property),
            result,
        ));
        self.run_scalar(expression).await
    }

    /// Executes the projection and returns one row per matched document.
    pub async fn rows(self) -> OdmResult<Vec<MapValue>> {
        match self.run(self.expression.clone()).await? {
            PipelineResult::Empty => Ok(Vec::new()),
            PipelineResult::Materialized { items, .. } => Ok(items
                .into_iter()
                .filter_map(|item| match item {
                    PipelineItem::Row(row) => Some(row),
                    _ => None,
                })
                .collect()),
            _ => Err(invalid_argument("Query did not produce projected rows")),
        }
    }

    /// The underlying expression, for inspection.
    pub fn expression(&self) -> &QueryExpression {
        &self.expression
    }
}
