use crate::model::{DocumentKey, FieldPath, ResourcePath};
use crate::value::{MapValue, Value};

/// One document as read from the store: its key plus decoded fields.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentSnapshot {
    key: DocumentKey,
    data: MapValue,
}

impl DocumentSnapshot {
    pub fn new(key: DocumentKey, data: MapValue) -> Self {
        Self { key, data }
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn path(&self) -> &ResourcePath {
        self.key.path()
    }

    pub fn id(&self) -> &str {
        self.key.id()
    }

    pub fn data(&self) -> &MapValue {
        &self.data
    }

    /// Resolves a possibly-dotted field path; `__name__` resolves to the
    /// document id.
    pub fn field(&self, path: &FieldPath) -> Option<Value> {
        if path.is_document_id() {
            return Some(Value::from_string(self.id()));
        }
        self.data.value_at(path).cloned()
    }
}
