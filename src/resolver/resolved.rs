use crate::expression::{AggregationKind, FilterOperator, FirestoreCursor, OrderByClause};
use crate::metadata::ScalarShape;
use crate::model::FieldPath;
use crate::value::Value;

/// A filter with its comparison value fully evaluated.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedFilter {
    property: FieldPath,
    operator: FilterOperator,
    value: Value,
}

impl ResolvedFilter {
    pub fn new(property: FieldPath, operator: FilterOperator, value: Value) -> Self {
        Self {
            property,
            operator,
            value,
        }
    }

    pub fn property(&self) -> &FieldPath {
        &self.property
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedAggregation {
    kind: AggregationKind,
    property: Option<FieldPath>,
    result: ScalarShape,
}

impl ResolvedAggregation {
    pub fn new(kind: AggregationKind, property: Option<FieldPath>, result: ScalarShape) -> Self {
        Self {
            kind,
            property,
            result,
        }
    }

    pub fn kind(&self) -> AggregationKind {
        self.kind
    }

    pub fn property(&self) -> Option<&FieldPath> {
        self.property.as_ref()
    }

    pub fn result(&self) -> ScalarShape {
        self.result
    }
}

/// An include expanded against the metadata oracle: the navigation's storage
/// kind, target entity and target collection are all known.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedInclude {
    navigation: String,
    kind: ResolvedIncludeKind,
    target_entity: &'static str,
    target_collection: String,
    nested: Vec<ResolvedInclude>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedIncludeKind {
    Reference { field: FieldPath },
    Collection { collection_id: String },
}

impl ResolvedInclude {
    pub fn new(
        navigation: String,
        kind: ResolvedIncludeKind,
        target_entity: &'static str,
        target_collection: String,
        nested: Vec<ResolvedInclude>,
    ) -> Self {
        Self {
            navigation,
            kind,
            target_entity,
            target_collection,
            nested,
        }
    }

    pub fn navigation(&self) -> &str {
        &self.navigation
    }

    pub fn kind(&self) -> &ResolvedIncludeKind {
        &self.kind
    }

    pub fn target_entity(&self) -> &'static str {
        self.target_entity
    }

    /// Collection id the second-to-last path segment of target documents
    /// carries.
    pub fn target_collection(&self) -> &str {
        &self.target_collection
    }

    pub fn nested(&self) -> &[ResolvedInclude] {
        &self.nested
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedProjection {
    fields: Vec<FieldPath>,
    subcollections: Vec<ResolvedSubcollectionProjection>,
}

impl ResolvedProjection {
    pub fn new(
        fields: Vec<FieldPath>,
        subcollections: Vec<ResolvedSubcollectionProjection>,
    ) -> Self {
        Self {
            fields,
            subcollections,
        }
    }

    pub fn fields(&self) -> &[FieldPath] {
        &self.fields
    }

    pub fn subcollections(&self) -> &[ResolvedSubcollectionProjection] {
        &self.subcollections
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedSubcollectionProjection {
    result_name: String,
    collection_id: String,
    filters: Vec<ResolvedFilter>,
    order_by: Vec<OrderByClause>,
    limit: Option<i64>,
    aggregation: Option<ResolvedAggregation>,
    fields: Vec<FieldPath>,
    nested: Vec<ResolvedSubcollectionProjection>,
}

impl ResolvedSubcollectionProjection {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        result_name: String,
        collection_id: String,
        filters: Vec<ResolvedFilter>,
        order_by: Vec<OrderByClause>,
        limit: Option<i64>,
        aggregation: Option<ResolvedAggregation>,
        fields: Vec<FieldPath>,
        nested: Vec<ResolvedSubcollectionProjection>,
    ) -> Self {
        Self {
            result_name,
            collection_id,
            filters,
            order_by,
            limit,
            aggregation,
            fields,
            nested,
        }
    }

    pub fn result_name(&self) -> &str {
        &self.result_name
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    pub fn filters(&self) -> &[ResolvedFilter] {
        &self.filters
    }

    pub fn order_by(&self) -> &[OrderByClause] {
        &self.order_by
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    pub fn aggregation(&self) -> Option<&ResolvedAggregation> {
        self.aggregation.as_ref()
    }

    pub fn fields(&self) -> &[FieldPath] {
        &self.fields
    }

    pub fn nested(&self) -> &[ResolvedSubcollectionProjection] {
        &self.nested
    }
}

/// Fully concrete counterpart of the query expression: every deferred value
/// replaced by a literal, include and projection trees expanded.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedQuery {
    collection: String,
    entity: &'static str,
    filters: Vec<ResolvedFilter>,
    order_by: Vec<OrderByClause>,
    limit: Option<i64>,
    skip: Option<i64>,
    document_id: Option<String>,
    cursor: Option<FirestoreCursor>,
    includes: Vec<ResolvedInclude>,
    aggregation: Option<ResolvedAggregation>,
    projection: Option<ResolvedProjection>,
}

impl ResolvedQuery {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        collection: String,
        entity: &'static str,
        filters: Vec<ResolvedFilter>,
        order_by: Vec<OrderByClause>,
        limit: Option<i64>,
        skip: Option<i64>,
        document_id: Option<String>,
        cursor: Option<FirestoreCursor>,
        includes: Vec<ResolvedInclude>,
        aggregation: Option<ResolvedAggregation>,
        projection: Option<ResolvedProjection>,
    ) -> Self {
        Self {
            collection,
            entity,
            filters,
            order_by,
            limit,
            skip,
            document_id,
            cursor,
            includes,
            aggregation,
            projection,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn filters(&self) -> &[ResolvedFilter] {
        &self.filters
    }

    pub fn order_by(&self) -> &[OrderByClause] {
        &self.order_by
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    pub fn skip(&self) -> Option<i64> {
        self.skip
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    pub fn is_document_query(&self) -> bool {
        self.document_id.is_some()
    }

    pub fn cursor(&self) -> Option<&FirestoreCursor> {
        self.cursor.as_ref()
    }

    pub fn includes(&self) -> &[ResolvedInclude] {
        &self.includes
    }

    pub fn aggregation(&self) -> Option<&ResolvedAggregation> {
        self.aggregation.as_ref()
    }

    pub fn projection(&self) -> Option<&ResolvedProjection> {
        self.projection.as_ref()
    }
}
