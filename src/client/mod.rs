//! The store client seam: the narrow async interface the pipeline executes
//! against, plus an in-memory implementation with full query evaluation.

mod evaluator;
mod in_memory;
mod snapshot;

pub use evaluator::{apply_aggregate, apply_query};
pub use in_memory::InMemoryStoreClient;
pub use snapshot::DocumentSnapshot;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::OdmResult;
use crate::model::DocumentKey;
use crate::native::{NativeAggregateQuery, NativeQuery};
use crate::value::Value;

/// Remote store reads. Every call is asynchronous and cancellable; absence is
/// reported as `None`, never as an error.
#[async_trait]
pub trait StoreClient: Send + Sync + 'static {
    async fn get_document(
        &self,
        key: &DocumentKey,
        cancel: &CancellationToken,
    ) -> OdmResult<Option<DocumentSnapshot>>;

    /// Fetches the document a reference field points at. The reference may be
    /// fully qualified or database-relative.
    async fn get_document_by_reference(
        &self,
        reference: &str,
        cancel: &CancellationToken,
    ) -> OdmResult<Option<DocumentSnapshot>>;

    async fn run_query(
        &self,
        query: &NativeQuery,
        cancel: &CancellationToken,
    ) -> OdmResult<Vec<DocumentSnapshot>>;

    async fn run_aggregate(
        &self,
        query: &NativeAggregateQuery,
        cancel: &CancellationToken,
    ) -> OdmResult<Value>;
}
