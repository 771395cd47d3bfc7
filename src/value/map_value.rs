use std::collections::BTreeMap;

use crate::model::FieldPath;
use crate::value::{Value, ValueKind};

/// An ordered map of field names to values; the shape of every stored
/// document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapValue {
    fields: BTreeMap<String, Value>,
}

impl MapValue {
    pub fn new(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Walks a dotted field path through nested maps.
    pub fn value_at(&self, path: &FieldPath) -> Option<&Value> {
        let mut current = self.fields.get(path.segments().first()?.as_str())?;
        for segment in &path.segments()[1..] {
            current = match current.kind() {
                ValueKind::Map(map) => map.get(segment)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl FromIterator<(String, Value)> for MapValue {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_nested_paths() {
        let mut inner = MapValue::default();
        inner.insert("region", Value::from_string("emea"));
        let mut map = MapValue::default();
        map.insert("customer", Value::from_map(inner.fields().clone()));

        let path = FieldPath::from_dot_separated("customer.region").unwrap();
        assert_eq!(map.value_at(&path), Some(&Value::from_string("emea")));

        let missing = FieldPath::from_dot_separated("customer.name").unwrap();
        assert_eq!(map.value_at(&missing), None);
    }
}
