use crate::error::{invalid_argument, OdmResult};
use crate::expression::{AggregationKind, OrderByClause, OrderDirection};
use crate::model::{DocumentKey, ResourcePath};
use crate::native::{
    NativeAggregateOperation, NativeAggregateQuery, NativeCursor, NativeFilter, NativeOperator,
    NativeOrder, NativeQuery,
};
use crate::resolver::{
    ResolvedAggregation, ResolvedFilter, ResolvedQuery, ResolvedSubcollectionProjection,
};

/// Translates a resolved collection query into its native form. Pure; does
/// not execute anything.
pub fn build_query(resolved: &ResolvedQuery) -> OdmResult<NativeQuery> {
    let mut query = NativeQuery::new(ResourcePath::root(), resolved.collection());

    for filter in resolved.filters() {
        query = query.with_filter(to_native_filter(filter));
    }
    for order in resolved.order_by() {
        query = query.with_order(to_native_order(order));
    }
    if let Some(cursor) = resolved.cursor() {
        let values = cursor.order_by_values();
        if !values.is_empty() && values.len() != resolved.order_by().len() {
            return Err(invalid_argument(format!(
                "Cursor carries {} order-by values but the query has {} order-by clauses",
                values.len(),
                resolved.order_by().len()
            )));
        }
        query = query.with_start_after(NativeCursor {
            anchor_document_id: cursor.anchor_document_id().to_string(),
            values: values.to_vec(),
        });
    }
    if let Some(skip) = resolved.skip() {
        query = query.with_offset(skip);
    }
    if let Some(limit) = resolved.limit() {
        query = query.with_limit(limit);
    }

    Ok(query)
}

/// Point reads bypass query execution entirely; the native form is just the
/// document key.
pub fn build_point_read(resolved: &ResolvedQuery) -> OdmResult<DocumentKey> {
    let id = resolved
        .document_id()
        .ok_or_else(|| invalid_argument("Point reads require a resolved document id"))?;
    DocumentKey::from_path(ResourcePath::from_segments([resolved.collection(), id]))
}

/// Builds the native aggregate query for count, any, sum and average.
pub fn build_aggregate(resolved: &ResolvedQuery) -> OdmResult<NativeAggregateQuery> {
    let aggregation = resolved
        .aggregation()
        .ok_or_else(|| invalid_argument("Aggregate builds require an aggregation"))?;
    let base = build_query(resolved)?;

    match aggregation.kind() {
        AggregationKind::Count => Ok(NativeAggregateQuery::new(
            base,
            "count",
            NativeAggregateOperation::Count,
        )),
        // Existence only needs to know whether at least one document matches.
        AggregationKind::Any => Ok(NativeAggregateQuery::new(
            base.with_limit(1),
            "any",
            NativeAggregateOperation::Count,
        )),
        AggregationKind::Sum => Ok(NativeAggregateQuery::new(
            base,
            "sum",
            NativeAggregateOperation::Sum(required_property(aggregation)?),
        )),
        AggregationKind::Average => Ok(NativeAggregateQuery::new(
            base,
            "average",
            NativeAggregateOperation::Average(required_property(aggregation)?),
        )),
        AggregationKind::Min | AggregationKind::Max => Err(invalid_argument(
            "Min and max execute as ordered limit-1 queries, not native aggregates",
        )),
    }
}

/// Min/max rewrite: an ordinary query ordered by the aggregated property
/// (ascending for min, descending for max) with limit 1.
pub fn build_min_max_query(resolved: &ResolvedQuery) -> OdmResult<NativeQuery> {
    let aggregation = resolved
        .aggregation()
        .ok_or_else(|| invalid_argument("Min/max builds require an aggregation"))?;
    let direction = match aggregation.kind() {
        AggregationKind::Min => OrderDirection::Ascending,
        AggregationKind::Max => OrderDirection::Descending,
        other => {
            return Err(invalid_argument(format!(
                "{other:?} is not a min/max aggregation"
            )))
        }
    };
    let property = required_property(aggregation)?;

    let mut query = NativeQuery::new(ResourcePath::root(), resolved.collection());
    for filter in resolved.filters() {
        query = query.with_filter(to_native_filter(filter));
    }
    Ok(query
        .with_order(NativeOrder {
            field: property,
            direction,
        })
        .with_limit(1))
}

/// Query fetching every document of one include's child collection.
pub fn build_include_query(parent_document: &ResourcePath, collection_id: &str) -> NativeQuery {
    NativeQuery::new(parent_document.clone(), collection_id)
}

/// Query for one subcollection projection level, carrying that projection's
/// own filters, ordering and limit.
pub fn build_subcollection_query(
    parent_document: &ResourcePath,
    projection: &ResolvedSubcollectionProjection,
) -> NativeQuery {
    let mut query = NativeQuery::new(parent_document.clone(), projection.collection_id());
    for filter in projection.filters() {
        query = query.with_filter(to_native_filter(filter));
    }
    for order in projection.order_by() {
        query = query.with_order(to_native_order(order));
    }
    if let Some(limit) = projection.limit() {
        query = query.with_limit(limit);
    }
    query
}

/// Aggregate over one subcollection projection level.
pub fn build_subcollection_aggregate(
    parent_document: &ResourcePath,
    projection: &ResolvedSubcollectionProjection,
) -> OdmResult<NativeAggregateQuery> {
    let aggregation = projection
        .aggregation()
        .ok_or_else(|| invalid_argument("Subcollection aggregate builds require an aggregation"))?;
    let base = build_subcollection_query(parent_document, projection);

    match aggregation.kind() {
        AggregationKind::Count => Ok(NativeAggregateQuery::new(
            base,
            projection.result_name(),
            NativeAggregateOperation::Count,
        )),
        AggregationKind::Any => Ok(NativeAggregateQuery::new(
            base.with_limit(1),
            projection.result_name(),
            NativeAggregateOperation::Count,
        )),
        AggregationKind::Sum => Ok(NativeAggregateQuery::new(
            base,
            projection.result_name(),
            NativeAggregateOperation::Sum(required_property(aggregation)?),
        )),
        AggregationKind::Average => Ok(NativeAggregateQuery::new(
            base,
            projection.result_name(),
            NativeAggregateOperation::Average(required_property(aggregation)?),
        )),
        AggregationKind::Min | AggregationKind::Max => Err(invalid_argument(
            "Min and max are not supported as subcollection aggregates",
        )),
    }
}

fn required_property(aggregation: &ResolvedAggregation) -> OdmResult<crate::model::FieldPath> {
    aggregation.property().cloned().ok_or_else(|| {
        invalid_argument(format!(
            "{:?} aggregations require a property path",
            aggregation.kind()
        ))
    })
}

fn to_native_filter(filter: &ResolvedFilter) -> NativeFilter {
    NativeFilter {
        field: filter.property().clone(),
        operator: NativeOperator::from_operator(filter.operator()),
        value: filter.value().clone(),
    }
}

fn to_native_order(order: &OrderByClause) -> NativeOrder {
    NativeOrder {
        field: order.property().clone(),
        direction: order.direction(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{FilterOperator, FirestoreCursor};
    use crate::metadata::{ScalarKind, ScalarShape};
    use crate::model::FieldPath;
    use crate::value::Value;

    fn field(path: &str) -> FieldPath {
        FieldPath::from_dot_separated(path).unwrap()
    }

    fn resolved(cursor: Option<FirestoreCursor>) -> ResolvedQuery {
        ResolvedQuery::new(
            "orders".to_string(),
            "Order",
            vec![ResolvedFilter::new(
                field("status"),
                FilterOperator::Equal,
                Value::from_string("paid"),
            )],
            vec![OrderByClause::descending(field("total"))],
            Some(5),
            Some(10),
            None,
            cursor,
            Vec::new(),
            None,
            None,
        )
    }

    #[test]
    fn translates_filters_order_and_pagination() {
        let query = build_query(&resolved(None)).unwrap();
        assert_eq!(query.collection_path().canonical_string(), "orders");
        assert_eq!(query.filters().len(), 1);
        assert_eq!(query.filters()[0].operator, NativeOperator::Equal);
        assert_eq!(query.order_by()[0].direction, OrderDirection::Descending);
        assert_eq!(query.offset(), Some(10));
        assert_eq!(query.limit(), Some(5));
    }

    #[test]
    fn operator_translation_round_trips() {
        let operators = [
            FilterOperator::Equal,
            FilterOperator::NotEqual,
            FilterOperator::LessThan,
            FilterOperator::LessThanOrEqual,
            FilterOperator::GreaterThan,
            FilterOperator::GreaterThanOrEqual,
            FilterOperator::ArrayContains,
            FilterOperator::ArrayContainsAny,
            FilterOperator::In,
            FilterOperator::NotIn,
        ];
        for operator in operators {
            assert_eq!(
                NativeOperator::from_operator(operator).to_operator(),
                operator
            );
        }
    }

    #[test]
    fn cursor_cardinality_must_match_order_by() {
        let mismatched = resolved(Some(FirestoreCursor::new(
            "o9",
            vec![Value::from_integer(1), Value::from_integer(2)],
        )));
        let err = build_query(&mismatched).unwrap_err();
        assert_eq!(err.code_str(), "odm/invalid-argument");
    }

    #[test]
    fn document_only_cursor_is_accepted() {
        let query = build_query(&resolved(Some(FirestoreCursor::document_only("o9")))).unwrap();
        let cursor = query.start_after().unwrap();
        assert_eq!(cursor.anchor_document_id, "o9");
        assert!(cursor.values.is_empty());
    }

    #[test]
    fn min_max_rewrites_to_ordered_limit_one() {
        let mut base = resolved(None);
        base = ResolvedQuery::new(
            base.collection().to_string(),
            base.entity(),
            base.filters().to_vec(),
            Vec::new(),
            None,
            None,
            None,
            None,
            Vec::new(),
            Some(ResolvedAggregation::new(
                AggregationKind::Max,
                Some(field("total")),
                ScalarShape::nullable(ScalarKind::Double),
            )),
            None,
        );
        let query = build_min_max_query(&base).unwrap();
        assert_eq!(query.limit(), Some(1));
        assert_eq!(query.order_by().len(), 1);
        assert_eq!(query.order_by()[0].direction, OrderDirection::Descending);
    }

    #[test]
    fn native_aggregate_rejects_min_max() {
        let base = ResolvedQuery::new(
            "orders".to_string(),
            "Order",
            Vec::new(),
            Vec::new(),
            None,
            None,
            None,
            None,
            Vec::new(),
            Some(ResolvedAggregation::new(
                AggregationKind::Min,
                Some(field("total")),
                ScalarShape::nullable(ScalarKind::Double),
            )),
            None,
        );
        assert!(build_aggregate(&base).is_err());
    }
}
