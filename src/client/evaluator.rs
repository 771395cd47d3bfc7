//! Applies a native query to candidate documents: filtering, ordering,
//! cursor positioning, offset and limit. Shared by the in-memory client and
//! reusable by any other client that fetches more than it can filter
//! server-side.

use std::cmp::Ordering;

use crate::client::DocumentSnapshot;
use crate::expression::OrderDirection;
use crate::model::ResourcePath;
use crate::native::{NativeAggregateOperation, NativeAggregateQuery, NativeCursor, NativeFilter, NativeOperator, NativeQuery};
use crate::value::{compare_values, value_order, Value, ValueKind};

pub fn apply_query(
    documents: Vec<DocumentSnapshot>,
    query: &NativeQuery,
) -> Vec<DocumentSnapshot> {
    let mut matched: Vec<DocumentSnapshot> = documents
        .into_iter()
        .filter(|snapshot| satisfies_filters(snapshot, query.filters()))
        .collect();

    matched.sort_by(|left, right| compare_snapshots(left, right, query));

    if let Some(cursor) = query.start_after() {
        matched.retain(|snapshot| is_after_cursor(snapshot, cursor, query));
    }

    if let Some(offset) = query.offset() {
        let offset = offset.max(0) as usize;
        if offset >= matched.len() {
            matched.clear();
        } else {
            matched.drain(0..offset);
        }
    }

    if let Some(limit) = query.limit() {
        let limit = limit.max(0) as usize;
        matched.truncate(limit);
    }

    matched
}

pub fn apply_aggregate(documents: Vec<DocumentSnapshot>, query: &NativeAggregateQuery) -> Value {
    let matched = apply_query(documents, query.query());
    match query.operation() {
        NativeAggregateOperation::Count => Value::from_integer(matched.len() as i64),
        NativeAggregateOperation::Sum(field) => {
            let mut integer_sum = 0i64;
            let mut double_sum = 0f64;
            let mut saw_double = false;
            let mut saw_any = false;
            for snapshot in &matched {
                match snapshot.field(field).as_ref().map(Value::kind) {
                    Some(ValueKind::Integer(i)) => {
                        saw_any = true;
                        integer_sum += i;
                    }
                    Some(ValueKind::Double(d)) => {
                        saw_any = true;
                        saw_double = true;
                        double_sum += d;
                    }
                    _ => {}
                }
            }
            if !saw_any {
                Value::from_integer(0)
            } else if saw_double {
                Value::from_double(double_sum + integer_sum as f64)
            } else {
                Value::from_integer(integer_sum)
            }
        }
        NativeAggregateOperation::Average(field) => {
            let values: Vec<f64> = matched
                .iter()
                .filter_map(|snapshot| snapshot.field(field).and_then(|v| v.as_number()))
                .collect();
            if values.is_empty() {
                Value::null()
            } else {
                Value::from_double(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
    }
}

fn satisfies_filters(snapshot: &DocumentSnapshot, filters: &[NativeFilter]) -> bool {
    filters.iter().all(|filter| {
        match snapshot.field(&filter.field) {
            Some(value) => evaluate_filter(filter, &value),
            // Absent fields only ever satisfy a not-equal check.
            None => matches!(filter.operator, NativeOperator::NotEqual),
        }
    })
}

fn evaluate_filter(filter: &NativeFilter, value: &Value) -> bool {
    match filter.operator {
        NativeOperator::Equal => compare_values(value, &filter.value) == Some(Ordering::Equal),
        NativeOperator::NotEqual => compare_values(value, &filter.value) != Some(Ordering::Equal),
        NativeOperator::LessThan => compare_values(value, &filter.value) == Some(Ordering::Less),
        NativeOperator::LessThanOrEqual => matches!(
            compare_values(value, &filter.value),
            Some(Ordering::Less | Ordering::Equal)
        ),
        NativeOperator::GreaterThan => {
            compare_values(value, &filter.value) == Some(Ordering::Greater)
        }
        NativeOperator::GreaterThanOrEqual => matches!(
            compare_values(value, &filter.value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        NativeOperator::ArrayContains => match value.kind() {
            ValueKind::Array(array) => array
                .values()
                .iter()
                .any(|member| compare_values(member, &filter.value) == Some(Ordering::Equal)),
            _ => false,
        },
        NativeOperator::ArrayContainsAny => match (value.kind(), filter.value.kind()) {
            (ValueKind::Array(array), ValueKind::Array(needles)) => array.values().iter().any(
                |member| {
                    needles
                        .values()
                        .iter()
                        .any(|needle| compare_values(member, needle) == Some(Ordering::Equal))
                },
            ),
            _ => false,
        },
        NativeOperator::In => match filter.value.kind() {
            ValueKind::Array(candidates) => candidates
                .values()
                .iter()
                .any(|candidate| compare_values(value, candidate) == Some(Ordering::Equal)),
            _ => false,
        },
        NativeOperator::NotIn => match filter.value.kind() {
            ValueKind::Array(candidates) => !candidates
                .values()
                .iter()
                .any(|candidate| compare_values(value, candidate) == Some(Ordering::Equal)),
            _ => false,
        },
    }
}

fn compare_snapshots(
    left: &DocumentSnapshot,
    right: &DocumentSnapshot,
    query: &NativeQuery,
) -> Ordering {
    for order in query.order_by() {
        let lv = left.field(&order.field).unwrap_or_else(Value::null);
        let rv = right.field(&order.field).unwrap_or_else(Value::null);
        let ordering = apply_direction(value_order(&lv, &rv), order.direction);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    apply_direction(
        ResourcePath::comparator(left.path(), right.path()),
        tie_break_direction(query),
    )
}

/// Documents after the cursor position compare greater than the anchor's
/// order-by values, with the anchor id as the final tie-break.
fn is_after_cursor(
    snapshot: &DocumentSnapshot,
    cursor: &NativeCursor,
    query: &NativeQuery,
) -> bool {
    for (value, order) in cursor.values.iter().zip(query.order_by()) {
        let field_value = snapshot.field(&order.field).unwrap_or_else(Value::null);
        match apply_direction(value_order(&field_value, value), order.direction) {
            Ordering::Greater => return true,
            Ordering::Less => return false,
            Ordering::Equal => {}
        }
    }
    apply_direction(
        snapshot.id().cmp(cursor.anchor_document_id.as_str()),
        tie_break_direction(query),
    ) == Ordering::Greater
}

fn tie_break_direction(query: &NativeQuery) -> OrderDirection {
    query
        .order_by()
        .last()
        .map(|order| order.direction)
        .unwrap_or_default()
}

fn apply_direction(ordering: Ordering, direction: OrderDirection) -> Ordering {
    match direction {
        OrderDirection::Ascending => ordering,
        OrderDirection::Descending => ordering.reverse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DocumentKey, FieldPath};
    use crate::native::NativeOrder;
    use crate::value::MapValue;

    fn doc(path: &str, fields: &[(&str, Value)]) -> DocumentSnapshot {
        let mut data = MapValue::default();
        for (name, value) in fields {
            data.insert(*name, value.clone());
        }
        DocumentSnapshot::new(DocumentKey::from_string(path).unwrap(), data)
    }

    fn field(path: &str) -> FieldPath {
        FieldPath::from_dot_separated(path).unwrap()
    }

    fn orders() -> Vec<DocumentSnapshot> {
        vec![
            doc("orders/a", &[("total", Value::from_integer(10)), ("status", Value::from_string("paid"))]),
            doc("orders/b", &[("total", Value::from_integer(30)), ("status", Value::from_string("paid"))]),
            doc("orders/c", &[("total", Value::from_integer(20)), ("status", Value::from_string("open"))]),
        ]
    }

    #[test]
    fn filters_and_orders() {
        let query = NativeQuery::new(ResourcePath::root(), "orders")
            .with_filter(NativeFilter {
                field: field("status"),
                operator: NativeOperator::Equal,
                value: Value::from_string("paid"),
            })
            .with_order(NativeOrder {
                field: field("total"),
                direction: OrderDirection::Descending,
            });
        let result = apply_query(orders(), &query);
        let ids: Vec<&str> = result.iter().map(|s| s.id()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn cursor_continues_strictly_after_anchor() {
        let query = NativeQuery::new(ResourcePath::root(), "orders")
            .with_order(NativeOrder {
                field: field("total"),
                direction: OrderDirection::Ascending,
            })
            .with_start_after(NativeCursor {
                anchor_document_id: "a".to_string(),
                values: vec![Value::from_integer(10)],
            });
        let result = apply_query(orders(), &query);
        let ids: Vec<&str> = result.iter().map(|s| s.id()).collect();
        assert_eq!(ids, ["c", "b"]);
    }

    #[test]
    fn document_only_cursor_uses_id_order() {
        let query = NativeQuery::new(ResourcePath::root(), "orders").with_start_after(
            NativeCursor {
                anchor_document_id: "a".to_string(),
                values: Vec::new(),
            },
        );
        let result = apply_query(orders(), &query);
        let ids: Vec<&str> = result.iter().map(|s| s.id()).collect();
        assert_eq!(ids, ["b", "c"]);
    }

    #[test]
    fn offset_and_limit_window_the_result() {
        let query = NativeQuery::new(ResourcePath::root(), "orders")
            .with_order(NativeOrder {
                field: field("total"),
                direction: OrderDirection::Ascending,
            })
            .with_offset(1)
            .with_limit(1);
        let result = apply_query(orders(), &query);
        let ids: Vec<&str> = result.iter().map(|s| s.id()).collect();
        assert_eq!(ids, ["c"]);
    }

    #[test]
    fn array_membership_operators() {
        let tagged = vec![doc(
            "orders/a",
            &[(
                "tags",
                Value::from_array(vec![Value::from_string("rush"), Value::from_string("gift")]),
            )],
        )];
        let contains = NativeQuery::new(ResourcePath::root(), "orders").with_filter(NativeFilter {
            field: field("tags"),
            operator: NativeOperator::ArrayContains,
            value: Value::from_string("rush"),
        });
        assert_eq!(apply_query(tagged.clone(), &contains).len(), 1);

        let contains_any =
            NativeQuery::new(ResourcePath::root(), "orders").with_filter(NativeFilter {
                field: field("tags"),
                operator: NativeOperator::ArrayContainsAny,
                value: Value::from_array(vec![Value::from_string("bulk"), Value::from_string("gift")]),
            });
        assert_eq!(apply_query(tagged, &contains_any).len(), 1);
    }

    #[test]
    fn aggregate_sum_and_average() {
        let base = NativeQuery::new(ResourcePath::root(), "orders");
        let sum = NativeAggregateQuery::new(
            base.clone(),
            "sum",
            NativeAggregateOperation::Sum(field("total")),
        );
        assert_eq!(apply_aggregate(orders(), &sum), Value::from_integer(60));

        let average = NativeAggregateQuery::new(
            base,
            "average",
            NativeAggregateOperation::Average(field("total")),
        );
        assert_eq!(apply_aggregate(orders(), &average), Value::from_double(20.0));
    }

    #[test]
    fn average_over_no_documents_is_null() {
        let query = NativeAggregateQuery::new(
            NativeQuery::new(ResourcePath::root(), "orders"),
            "average",
            NativeAggregateOperation::Average(field("total")),
        );
        assert_eq!(apply_aggregate(Vec::new(), &query), Value::null());
    }
}
