use crate::expression::{FilterOperator, OrderDirection};
use crate::model::{FieldPath, ResourcePath};
use crate::value::Value;

/// Filter operators in the store's own vocabulary. The mapping from
/// [`FilterOperator`] is 1:1 and invertible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NativeOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    ArrayContains,
    ArrayContainsAny,
    In,
    NotIn,
}

impl NativeOperator {
    pub fn from_operator(operator: FilterOperator) -> Self {
        match operator {
            FilterOperator::Equal => NativeOperator::Equal,
            FilterOperator::NotEqual => NativeOperator::NotEqual,
            FilterOperator::LessThan => NativeOperator::LessThan,
            FilterOperator::LessThanOrEqual => NativeOperator::LessThanOrEqual,
            FilterOperator::GreaterThan => NativeOperator::GreaterThan,
            FilterOperator::GreaterThanOrEqual => NativeOperator::GreaterThanOrEqual,
            FilterOperator::ArrayContains => NativeOperator::ArrayContains,
            FilterOperator::ArrayContainsAny => NativeOperator::ArrayContainsAny,
            FilterOperator::In => NativeOperator::In,
            FilterOperator::NotIn => NativeOperator::NotIn,
        }
    }

    pub fn to_operator(self) -> FilterOperator {
        match self {
            NativeOperator::Equal => FilterOperator::Equal,
            NativeOperator::NotEqual => FilterOperator::NotEqual,
            NativeOperator::LessThan => FilterOperator::LessThan,
            NativeOperator::LessThanOrEqual => FilterOperator::LessThanOrEqual,
            NativeOperator::GreaterThan => FilterOperator::GreaterThan,
            NativeOperator::GreaterThanOrEqual => FilterOperator::GreaterThanOrEqual,
            NativeOperator::ArrayContains => FilterOperator::ArrayContains,
            NativeOperator::ArrayContainsAny => FilterOperator::ArrayContainsAny,
            NativeOperator::In => FilterOperator::In,
            NativeOperator::NotIn => FilterOperator::NotIn,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NativeFilter {
    pub field: FieldPath,
    pub operator: NativeOperator,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NativeOrder {
    pub field: FieldPath,
    pub direction: OrderDirection,
}

/// Start-after position: order-by values first, anchor document id as the
/// final tie-break.
#[derive(Clone, Debug, PartialEq)]
pub struct NativeCursor {
    pub anchor_document_id: String,
    pub values: Vec<Value>,
}

/// One executable collection query.
#[derive(Clone, Debug, PartialEq)]
pub struct NativeQuery {
    parent: ResourcePath,
    collection_id: String,
    filters: Vec<NativeFilter>,
    order_by: Vec<NativeOrder>,
    start_after: Option<NativeCursor>,
    offset: Option<i64>,
    limit: Option<i64>,
}

impl NativeQuery {
    pub fn new(parent: ResourcePath, collection_id: impl Into<String>) -> Self {
        Self {
            parent,
            collection_id: collection_id.into(),
            filters: Vec::new(),
            order_by: Vec::new(),
            start_after: None,
            offset: None,
            limit: None,
        }
    }

    pub fn with_filter(mut self, filter: NativeFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_order(mut self, order: NativeOrder) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn with_start_after(mut self, cursor: NativeCursor) -> Self {
        self.start_after = Some(cursor);
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn parent(&self) -> &ResourcePath {
        &self.parent
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    /// Full path of the queried collection.
    pub fn collection_path(&self) -> ResourcePath {
        self.parent.child([self.collection_id.as_str()])
    }

    pub fn filters(&self) -> &[NativeFilter] {
        &self.filters
    }

    pub fn order_by(&self) -> &[NativeOrder] {
        &self.order_by
    }

    pub fn start_after(&self) -> Option<&NativeCursor> {
        self.start_after.as_ref()
    }

    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NativeAggregateOperation {
    Count,
    Sum(FieldPath),
    Average(FieldPath),
}

/// One executable aggregate query.
#[derive(Clone, Debug, PartialEq)]
pub struct NativeAggregateQuery {
    query: NativeQuery,
    alias: String,
    operation: NativeAggregateOperation,
}

impl NativeAggregateQuery {
    pub fn new(
        query: NativeQuery,
        alias: impl Into<String>,
        operation: NativeAggregateOperation,
    ) -> Self {
        Self {
            query,
            alias: alias.into(),
            operation,
        }
    }

    pub fn query(&self) -> &NativeQuery {
        &self.query
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn operation(&self) -> &NativeAggregateOperation {
        &self.operation
    }
}
