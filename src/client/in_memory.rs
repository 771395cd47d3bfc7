use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::client::{apply_aggregate, apply_query, DocumentSnapshot, StoreClient};
use crate::error::{cancelled, OdmResult};
use crate::model::{strip_qualified_prefix, DocumentKey, ResourcePath};
use crate::native::{NativeAggregateQuery, NativeQuery};
use crate::value::{from_plain_json, MapValue, Value, ValueKind};

/// A complete in-process [`StoreClient`] over a path-keyed document map.
///
/// Filtering, ordering, cursors and aggregation all run through the shared
/// query evaluator, so behavior matches what a remote store would return.
/// Reads are counted per document path, which tests use to assert fetch
/// behavior.
#[derive(Clone, Default)]
pub struct InMemoryStoreClient {
    documents: Arc<Mutex<BTreeMap<String, MapValue>>>,
    reads: Arc<Mutex<BTreeMap<String, usize>>>,
}

impl InMemoryStoreClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, data: MapValue) {
        let mut documents = self.documents.lock().unwrap();
        documents.insert(path.to_string(), data);
    }

    /// Seeds a document from plain JSON. Object values become maps; strings
    /// stay strings, so reference fields should be seeded with
    /// [`InMemoryStoreClient::insert`] when reference kinds matter.
    pub fn insert_json(&self, path: &str, data: serde_json::Value) {
        let value = from_plain_json(&data);
        let map = match value.kind() {
            ValueKind::Map(map) => map.clone(),
            _ => MapValue::default(),
        };
        self.insert(path, map);
    }

    pub fn remove(&self, path: &str) {
        let mut documents = self.documents.lock().unwrap();
        documents.remove(path);
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.lock().unwrap().is_empty()
    }

    /// How many times the document at `path` has been fetched, whether by
    /// point read, reference resolution or query.
    pub fn read_count(&self, path: &str) -> usize {
        self.reads.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    fn record_read(&self, path: &str) {
        let mut reads = self.reads.lock().unwrap();
        *reads.entry(path.to_string()).or_insert(0) += 1;
    }

    fn snapshots_in_collection(&self, collection_path: &ResourcePath) -> Vec<DocumentSnapshot> {
        let documents = self.documents.lock().unwrap();
        documents
            .iter()
            .filter_map(|(path, data)| {
                let key = DocumentKey::from_string(path).ok()?;
                if key.collection_path() == *collection_path {
                    Some(DocumentSnapshot::new(key, data.clone()))
                } else {
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl StoreClient for InMemoryStoreClient {
    async fn get_document(
        &self,
        key: &DocumentKey,
        cancel: &CancellationToken,
    ) -> OdmResult<Option<DocumentSnapshot>> {
        if cancel.is_cancelled() {
            return Err(cancelled());
        }
        let canonical = key.path().canonical_string();
        let data = {
            let documents = self.documents.lock().unwrap();
            documents.get(&canonical).cloned()
        };
        match data {
            Some(data) => {
                self.record_read(&canonical);
                Ok(Some(DocumentSnapshot::new(key.clone(), data)))
            }
            None => Ok(None),
        }
    }

    async fn get_document_by_reference(
        &self,
        reference: &str,
        cancel: &CancellationToken,
    ) -> OdmResult<Option<DocumentSnapshot>> {
        let relative = strip_qualified_prefix(&ResourcePath::from_string(reference)?);
        let key = match DocumentKey::from_path(relative) {
            Ok(key) => key,
            // Malformed references behave like dangling ones.
            Err(_) => return Ok(None),
        };
        self.get_document(&key, cancel).await
    }

    async fn run_query(
        &self,
        query: &NativeQuery,
        cancel: &CancellationToken,
    ) -> OdmResult<Vec<DocumentSnapshot>> {
        if cancel.is_cancelled() {
            return Err(cancelled());
        }
        let candidates = self.snapshots_in_collection(&query.collection_path());
        let matched = apply_query(candidates, query);
        for snapshot in &matched {
            self.record_read(&snapshot.path().canonical_string());
        }
        Ok(matched)
    }

    async fn run_aggregate(
        &self,
        query: &NativeAggregateQuery,
        cancel: &CancellationToken,
    ) -> OdmResult<Value> {
        if cancel.is_cancelled() {
            return Err(cancelled());
        }
        let candidates = self.snapshots_in_collection(&query.query().collection_path());
        Ok(apply_aggregate(candidates, query))
    }
}
