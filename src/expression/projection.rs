use crate::expression::{AggregationSpec, OrderByClause, ValueExpression, WhereClause};
use crate::model::FieldPath;

/// A reshaping of the result: a subset of the root document's fields plus
/// any number of subcollection projections, each with its own query shape.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProjectionSpec {
    fields: Vec<FieldPath>,
    subcollections: Vec<SubcollectionProjection>,
}

impl ProjectionSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, field: FieldPath) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_subcollection(mut self, projection: SubcollectionProjection) -> Self {
        self.subcollections.push(projection);
        self
    }

    /// Selected root fields; empty means all fields.
    pub fn fields(&self) -> &[FieldPath] {
        &self.fields
    }

    pub fn subcollections(&self) -> &[SubcollectionProjection] {
        &self.subcollections
    }
}

/// Projection over one child collection: either nested rows (possibly
/// filtered, ordered and limited) or a terminal aggregation.
#[derive(Clone, Debug, PartialEq)]
pub struct SubcollectionProjection {
    navigation: String,
    result_name: String,
    filters: Vec<WhereClause>,
    order_by: Vec<OrderByClause>,
    limit: Option<ValueExpression>,
    aggregation: Option<AggregationSpec>,
    fields: Vec<FieldPath>,
    nested: Vec<SubcollectionProjection>,
}

impl SubcollectionProjection {
    pub fn navigation(name: impl Into<String>) -> Self {
        let navigation = name.into();
        Self {
            result_name: navigation.clone(),
            navigation,
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            aggregation: None,
            fields: Vec::new(),
            nested: Vec::new(),
        }
    }

    pub fn with_result_name(mut self, name: impl Into<String>) -> Self {
        self.result_name = name.into();
        self
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

    pub fn with_aggregation(mut self, aggregation: AggregationSpec) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    pub fn with_field(mut self, field: FieldPath) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_nested(mut self, nested: SubcollectionProjection) -> Self {
        self.nested.push(nested);
        self
    }

    pub fn navigation_name(&self) -> &str {
        &self.navigation
    }

    pub fn result_name(&self) -> &str {
        &self.result_name
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

    pub fn aggregation(&self) -> Option<&AggregationSpec> {
        self.aggregation.as_ref()
    }

    pub fn fields(&self) -> &[FieldPath] {
        &self.fields
    }

    pub fn nested(&self) -> &[SubcollectionProjection] {
        &self.nested
    }
}
