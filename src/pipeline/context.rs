use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::client::DocumentSnapshot;
use crate::error::{internal_error, OdmResult};
use crate::expression::{AggregationKind, QueryExpression};
use crate::model::{strip_qualified_prefix, ResourcePath};
use crate::resolver::{QueryContext, ResolvedQuery};
use crate::tracking::EntityTracker;
use crate::value::Value;

/// Classification of what a query produces; handlers use it to decide
/// whether they participate at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryKind {
    /// Materialized entity instances.
    Entity,
    /// A single scalar (count, sum, average, min, max).
    Aggregation,
    /// Reshaped rows, possibly with nested subcollection data.
    Projection,
    /// A boolean existence check.
    Predicate,
}

impl QueryKind {
    pub fn classify(expression: &QueryExpression) -> Self {
        if let Some(aggregation) = expression.aggregation() {
            if aggregation.kind() == AggregationKind::Any {
                return QueryKind::Predicate;
            }
            return QueryKind::Aggregation;
        }
        if expression.projection().is_some() {
            return QueryKind::Projection;
        }
        QueryKind::Entity
    }
}

/// Everything the execution handler fetched, in the strongly-typed form the
/// convert handler consumes: the flat path-keyed snapshot map plus the
/// subcollection aggregation results keyed by `parentPath:resultName`.
/// Created and consumed within a single pipeline invocation.
#[derive(Clone, Default)]
pub struct ExecutionArtifacts {
    snapshots: BTreeMap<String, DocumentSnapshot>,
    aggregations: BTreeMap<String, Value>,
}

impl ExecutionArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a fetched document under its database-relative canonical
    /// path.
    pub fn insert_snapshot(&mut self, snapshot: DocumentSnapshot) {
        let relative = strip_qualified_prefix(snapshot.path());
        self.snapshots.insert(relative.canonical_string(), snapshot);
    }

    pub fn contains_snapshot(&self, path: &str) -> bool {
        self.snapshots.contains_key(path)
    }

    pub fn snapshots(&self) -> impl Iterator<Item = (&String, &DocumentSnapshot)> {
        self.snapshots.iter()
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    /// Direct children of `parent` in one subcollection, in path order.
    pub fn children_of(
        &self,
        parent: &ResourcePath,
        collection_id: &str,
    ) -> Vec<&DocumentSnapshot> {
        let prefix = format!("{}/{}/", parent.canonical_string(), collection_id);
        let expected_depth = parent.len() + 2;
        self.snapshots
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter(|(path, _)| path.split('/').count() == expected_depth)
            .map(|(_, snapshot)| snapshot)
            .collect()
    }

    pub fn insert_aggregation(&mut self, key: String, value: Value) {
        self.aggregations.insert(key, value);
    }

    pub fn aggregation(&self, key: &str) -> Option<&Value> {
        self.aggregations.get(key)
    }
}

/// Per-request state threaded through the handler chain. Handlers replace
/// the context (or fields of their copy) before delegating; results carry
/// the context back out so post-processing stages see what execution
/// produced.
#[derive(Clone)]
pub struct PipelineContext {
    expression: QueryExpression,
    kind: QueryKind,
    parameters: QueryContext,
    tracking: bool,
    prefer_streaming: bool,
    resolved: Option<Arc<ResolvedQuery>>,
    tracker: Option<Arc<Mutex<EntityTracker>>>,
    artifacts: ExecutionArtifacts,
}

impl PipelineContext {
    pub fn new(expression: QueryExpression, parameters: QueryContext) -> Self {
        let kind = QueryKind::classify(&expression);
        Self {
            expression,
            kind,
            parameters,
            tracking: false,
            prefer_streaming: false,
            resolved: None,
            tracker: None,
            artifacts: ExecutionArtifacts::new(),
        }
    }

    pub fn with_tracking(mut self, tracker: Arc<Mutex<EntityTracker>>) -> Self {
        self.tracking = true;
        self.tracker = Some(tracker);
        self
    }

    pub fn with_streaming_preferred(mut self) -> Self {
        self.prefer_streaming = true;
        self
    }

    pub fn expression(&self) -> &QueryExpression {
        &self.expression
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn parameters(&self) -> &QueryContext {
        &self.parameters
    }

    pub fn tracking(&self) -> bool {
        self.tracking
    }

    pub fn prefer_streaming(&self) -> bool {
        self.prefer_streaming
    }

    /// The unit-of-work, pulled from the context at call time by the
    /// tracking handler.
    pub fn tracker(&self) -> Option<Arc<Mutex<EntityTracker>>> {
        self.tracker.clone()
    }

    pub fn set_resolved(&mut self, resolved: ResolvedQuery) {
        self.resolved = Some(Arc::new(resolved));
    }

    pub fn resolved(&self) -> Option<&Arc<ResolvedQuery>> {
        self.resolved.as_ref()
    }

    /// The resolved query, which only exists after the resolver handler ran.
    pub fn resolved_query(&self) -> OdmResult<Arc<ResolvedQuery>> {
        self.resolved
            .clone()
            .ok_or_else(|| internal_error("Resolver handler must run before this stage"))
    }

    pub fn artifacts(&self) -> &ExecutionArtifacts {
        &self.artifacts
    }

    pub fn artifacts_mut(&mut self) -> &mut ExecutionArtifacts {
        &mut self.artifacts
    }

    /// Short human-readable description for diagnostics.
    pub fn describe(&self) -> String {
        format!(
            "{:?} query over '{}'",
            self.kind,
            self.expression.source_collection()
        )
    }
}
