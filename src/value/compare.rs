use std::cmp::Ordering;

use crate::value::{Value, ValueKind};

/// Relative order of value type brackets; values of different brackets sort
/// by bracket, never by content. Integers and doubles share one numeric
/// bracket.
fn type_rank(value: &Value) -> u8 {
    match value.kind() {
        ValueKind::Null => 0,
        ValueKind::Boolean(_) => 1,
        ValueKind::Integer(_) | ValueKind::Double(_) => 2,
        ValueKind::Timestamp(_) => 3,
        ValueKind::String(_) => 4,
        ValueKind::Bytes(_) => 5,
        ValueKind::Reference(_) => 6,
        ValueKind::Array(_) => 7,
        ValueKind::Map(_) => 8,
    }
}

/// Total order over all values, used for sorting and cursor positioning.
pub fn value_order(left: &Value, right: &Value) -> Ordering {
    let rank = type_rank(left).cmp(&type_rank(right));
    if rank != Ordering::Equal {
        return rank;
    }

    match (left.kind(), right.kind()) {
        (ValueKind::Null, ValueKind::Null) => Ordering::Equal,
        (ValueKind::Boolean(l), ValueKind::Boolean(r)) => l.cmp(r),
        (ValueKind::Integer(l), ValueKind::Integer(r)) => l.cmp(r),
        (ValueKind::Timestamp(l), ValueKind::Timestamp(r)) => l.cmp(r),
        (ValueKind::String(l), ValueKind::String(r)) => l.cmp(r),
        (ValueKind::Bytes(l), ValueKind::Bytes(r)) => l.as_slice().cmp(r.as_slice()),
        (ValueKind::Reference(l), ValueKind::Reference(r)) => l.cmp(r),
        (ValueKind::Array(l), ValueKind::Array(r)) => {
            for (lv, rv) in l.values().iter().zip(r.values().iter()) {
                match value_order(lv, rv) {
                    Ordering::Equal => continue,
                    non_eq => return non_eq,
                }
            }
            l.len().cmp(&r.len())
        }
        (ValueKind::Map(l), ValueKind::Map(r)) => {
            for ((lk, lv), (rk, rv)) in l.fields().iter().zip(r.fields().iter()) {
                match lk.cmp(rk) {
                    Ordering::Equal => {}
                    non_eq => return non_eq,
                }
                match value_order(lv, rv) {
                    Ordering::Equal => {}
                    non_eq => return non_eq,
                }
            }
            l.fields().len().cmp(&r.fields().len())
        }
        _ => {
            // Same bracket, mixed numerics.
            let l = left.as_number().expect("numeric bracket");
            let r = right.as_number().expect("numeric bracket");
            l.total_cmp(&r)
        }
    }
}

/// Comparison for range filters: values of different brackets are not
/// comparable and the filter does not match.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    if type_rank(left) != type_rank(right) {
        return None;
    }
    Some(value_order(left, right))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_brackets_unify_integer_and_double() {
        assert_eq!(
            compare_values(&Value::from_integer(2), &Value::from_double(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_values(&Value::from_integer(3), &Value::from_double(3.0)),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn cross_bracket_values_are_incomparable() {
        assert_eq!(
            compare_values(&Value::from_integer(2), &Value::from_string("2")),
            None
        );
    }

    #[test]
    fn brackets_order_for_sorting() {
        assert_eq!(
            value_order(&Value::null(), &Value::from_bool(false)),
            Ordering::Less
        );
        assert_eq!(
            value_order(&Value::from_double(9.0), &Value::from_string("a")),
            Ordering::Less
        );
    }

    #[test]
    fn arrays_compare_lexicographically() {
        let short = Value::from_array(vec![Value::from_integer(1)]);
        let long = Value::from_array(vec![Value::from_integer(1), Value::from_integer(2)]);
        assert_eq!(value_order(&short, &long), Ordering::Less);
    }
}
