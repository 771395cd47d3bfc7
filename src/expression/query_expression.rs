use crate::expression::{
    AggregationSpec, CursorExpression, IncludeSpec, OrderByClause, ProjectionSpec, ValueExpression,
    WhereClause,
};

/// The logical, not-yet-executed query description.
///
/// Built through `with_*` operations that return an updated copy; applying
/// the same sequence of operations twice yields structurally equal
/// expressions, which resolution and caching rely on.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryExpression {
    source_collection: String,
    entity: &'static str,
    filters: Vec<WhereClause>,
    order_by: Vec<OrderByClause>,
    limit: Option<ValueExpression>,
    skip: Option<ValueExpression>,
    id_lookup: Option<ValueExpression>,
    cursor: Option<CursorExpression>,
    includes: Vec<IncludeSpec>,
    aggregation: Option<AggregationSpec>,
    projection: Option<ProjectionSpec>,
}

impl QueryExpression {
    pub fn for_collection(entity: &'static str, source_collection: impl Into<String>) -> Self {
        Self {
            source_collection: source_collection.into(),
            entity,
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            skip: None,
            id_lookup: None,
            cursor: None,
            includes: Vec::new(),
            aggregation: None,
            projection: None,
        }
    }

    pub fn with_filter(mut self, filter: WhereClause) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_order_by(mut self, order: OrderByClause) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn with_limit(mut self, limit: impl Into<ValueExpression>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    pub fn with_skip(mut self, skip: impl Into<ValueExpression>) -> Self {
        self.skip = Some(skip.into());
        self
    }

    /// Turns the query into a point read of a single document id.
    pub fn with_id_lookup(mut self, id: impl Into<ValueExpression>) -> Self {
        self.id_lookup = Some(id.into());
        self
    }

    pub fn with_cursor(mut self, cursor: impl Into<CursorExpression>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn with_include(mut self, include: IncludeSpec) -> Self {
        self.includes.push(include);
        self
    }

    /// Nests `include` under the most recently added include chain.
    pub fn with_then_include(mut self, include: IncludeSpec) -> Self {
        match self.includes.last_mut() {
            Some(last) => last.push_to_tail(include),
            None => self.includes.push(include),
        }
        self
    }

    pub fn with_aggregation(mut self, aggregation: AggregationSpec) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    pub fn with_projection(mut self, projection: ProjectionSpec) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn source_collection(&self) -> &str {
        &self.source_collection
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn filters(&self) -> &[WhereClause] {
        &self.filters
    }

    pub fn order_by(&self) -> &[OrderByClause] {
        &self.order_by
    }

    pub fn limit(&self) -> Option<&ValueExpression> {
        self.limit.as_ref()
    }

    pub fn skip(&self) -> Option<&ValueExpression> {
        self.skip.as_ref()
    }

    pub fn id_lookup(&self) -> Option<&ValueExpression> {
        self.id_lookup.as_ref()
    }

    pub fn cursor(&self) -> Option<&CursorExpression> {
        self.cursor.as_ref()
    }

    pub fn includes(&self) -> &[IncludeSpec] {
        &self.includes
    }

    pub fn aggregation(&self) -> Option<&AggregationSpec> {
        self.aggregation.as_ref()
    }

    pub fn projection(&self) -> Option<&ProjectionSpec> {
        self.projection.as_ref()
    }
}
