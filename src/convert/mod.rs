//! Conversion seam: scalar type coercions and the related-entity map that
//! record materializers draw navigation instances from.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::client::DocumentSnapshot;
use crate::error::{invalid_argument, OdmResult};
use crate::metadata::{DynEntity, ScalarKind, ScalarShape};
use crate::model::{strip_qualified_prefix, DocumentKey, FieldPath, ResourcePath};
use crate::value::{to_plain_json, Value, ValueKind};

/// Scalar coercion between store values and caller-declared result shapes.
pub trait TypeConverter: Send + Sync {
    fn convert(&self, value: Value, target: &ScalarShape) -> OdmResult<Value>;
}

/// Default converter: numeric widening/narrowing, RFC 3339 timestamp
/// parsing, boolean-from-count, and null passthrough for nullable targets.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardTypeConverter;

impl TypeConverter for StandardTypeConverter {
    fn convert(&self, value: Value, target: &ScalarShape) -> OdmResult<Value> {
        if value.is_null() {
            if target.nullable {
                return Ok(Value::null());
            }
            return Err(invalid_argument(
                "Null value cannot convert to a non-nullable target",
            ));
        }

        match (target.kind, value.kind()) {
            (ScalarKind::Integer, ValueKind::Integer(_)) => Ok(value),
            (ScalarKind::Integer, ValueKind::Double(d)) => Ok(Value::from_integer(*d as i64)),
            (ScalarKind::Double, ValueKind::Double(_)) => Ok(value),
            (ScalarKind::Double, ValueKind::Integer(i)) => Ok(Value::from_double(*i as f64)),
            (ScalarKind::Boolean, ValueKind::Boolean(_)) => Ok(value),
            (ScalarKind::Boolean, ValueKind::Integer(i)) => Ok(Value::from_bool(*i != 0)),
            (ScalarKind::String, ValueKind::String(_)) => Ok(value),
            (ScalarKind::Timestamp, ValueKind::Timestamp(_)) => Ok(value),
            (ScalarKind::Timestamp, ValueKind::String(s)) => DateTime::parse_from_rfc3339(s)
                .map(|ts| Value::from_timestamp(ts.with_timezone(&Utc)))
                .map_err(|err| {
                    invalid_argument(format!("String is not an RFC 3339 timestamp: {err}"))
                }),
            (kind, other) => Err(invalid_argument(format!(
                "Cannot convert {other:?} to {kind:?}"
            ))),
        }
    }
}

/// Materialized instances of related documents, keyed by database-relative
/// canonical path. Built deepest-first during graph assembly so that by the
/// time a document is deserialized, everything it can point at is present.
#[derive(Clone, Default)]
pub struct RelatedEntities {
    entities: BTreeMap<String, DynEntity>,
}

impl RelatedEntities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: String, entity: DynEntity) {
        self.entities.insert(path, entity);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entities.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&DynEntity> {
        self.entities.get(path)
    }

    /// Resolves a reference field of `snapshot` to an already-materialized
    /// instance. Dangling or unfetched references resolve to `None`.
    pub fn reference<T: Send + Sync + 'static>(
        &self,
        snapshot: &DocumentSnapshot,
        field: &FieldPath,
    ) -> Option<Arc<T>> {
        let value = snapshot.data().value_at(field)?;
        let raw = match value.kind() {
            ValueKind::Reference(path) => path.as_str(),
            ValueKind::String(path) => path.as_str(),
            _ => return None,
        };
        let relative = strip_qualified_prefix(&ResourcePath::from_string(raw).ok()?);
        self.downcast(&relative.canonical_string())
    }

    /// All materialized children of `parent` in the given subcollection, in
    /// path order.
    pub fn children_of<T: Send + Sync + 'static>(
        &self,
        parent: &DocumentKey,
        collection_id: &str,
    ) -> Vec<Arc<T>> {
        let prefix = format!(
            "{}/{}/",
            parent.path().canonical_string(),
            collection_id
        );
        let expected_depth = parent.path().len() + 2;
        self.entities
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter(|(path, _)| path.split('/').count() == expected_depth)
            .filter_map(|(path, _)| self.downcast(path))
            .collect()
    }

    fn downcast<T: Send + Sync + 'static>(&self, path: &str) -> Option<Arc<T>> {
        self.entities
            .get(path)
            .and_then(|entity| Arc::clone(entity).downcast::<T>().ok())
    }
}

/// Deserializes a snapshot's plain fields into any `serde`-deserializable
/// type. Navigation fields are the materializer's job; mark them
/// `#[serde(skip)]` on the record type.
pub fn deserialize_fields<T: DeserializeOwned>(snapshot: &DocumentSnapshot) -> OdmResult<T> {
    let json = to_plain_json(&Value::from_map(snapshot.data().fields().clone()));
    serde_json::from_value(json).map_err(|err| {
        invalid_argument(format!(
            "Document {} does not match the target record shape: {err}",
            snapshot.path()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::MapValue;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct OrderFields {
        status: String,
        total: f64,
    }

    fn snapshot(path: &str, fields: &[(&str, Value)]) -> DocumentSnapshot {
        let mut data = MapValue::default();
        for (name, value) in fields {
            data.insert(*name, value.clone());
        }
        DocumentSnapshot::new(DocumentKey::from_string(path).unwrap(), data)
    }

    #[test]
    fn deserializes_plain_fields() {
        let snapshot = snapshot(
            "orders/o1",
            &[
                ("status", Value::from_string("paid")),
                ("total", Value::from_double(12.5)),
            ],
        );
        let fields: OrderFields = deserialize_fields(&snapshot).unwrap();
        assert_eq!(
            fields,
            OrderFields {
                status: "paid".to_string(),
                total: 12.5
            }
        );
    }

    #[test]
    fn converter_widens_and_narrows_numerics() {
        let converter = StandardTypeConverter;
        assert_eq!(
            converter
                .convert(
                    Value::from_integer(3),
                    &ScalarShape::required(ScalarKind::Double)
                )
                .unwrap(),
            Value::from_double(3.0)
        );
        assert_eq!(
            converter
                .convert(
                    Value::from_double(3.9),
                    &ScalarShape::required(ScalarKind::Integer)
                )
                .unwrap(),
            Value::from_integer(3)
        );
    }

    #[test]
    fn converter_null_policy_follows_nullability() {
        let converter = StandardTypeConverter;
        assert!(converter
            .convert(Value::null(), &ScalarShape::nullable(ScalarKind::Double))
            .unwrap()
            .is_null());
        assert!(converter
            .convert(Value::null(), &ScalarShape::required(ScalarKind::Double))
            .is_err());
    }

    #[test]
    fn reference_resolution_tolerates_dangling_pointers() {
        let related = RelatedEntities::new();
        let snapshot = snapshot(
            "orders/o1",
            &[("customer", Value::from_reference("customers/missing"))],
        );
        let resolved: Option<Arc<String>> =
            related.reference(&snapshot, &FieldPath::from_dot_separated("customer").unwrap());
        assert!(resolved.is_none());
    }

    #[test]
    fn children_lookup_respects_depth() {
        let mut related = RelatedEntities::new();
        related.insert(
            "orders/o1/items/i1".to_string(),
            Arc::new("item".to_string()) as DynEntity,
        );
        related.insert(
            "orders/o1/items/i1/notes/n1".to_string(),
            Arc::new("note".to_string()) as DynEntity,
        );

        let parent = DocumentKey::from_string("orders/o1").unwrap();
        let children: Vec<Arc<String>> = related.children_of(&parent, "items");
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].as_str(), "item");
    }
}
