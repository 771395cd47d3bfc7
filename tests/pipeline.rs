mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use common::{seeded_store, session, Order};
use firestore_odm::{
    error, DocumentKey, DocumentSnapshot, FilterOperator, FirestoreCursor, InMemoryStoreClient,
    OdmResult, RetrySettings, ScalarKind, ScalarShape, SessionOptions, StoreClient, Value,
    ValueExpression,
};
use firestore_odm::native::{NativeAggregateQuery, NativeQuery};

#[tokio::test]
async fn filters_order_and_materialize() {
    let session = session(seeded_store(), SessionOptions::default());
    let orders = session
        .query::<Order>()
        .filter("status", FilterOperator::Equal, "paid")
        .order_by_descending("total")
        .to_vec()
        .await
        .unwrap();

    let totals: Vec<f64> = orders.iter().map(|order| order.total).collect();
    assert_eq!(totals, [30.0, 10.0]);
}

#[tokio::test]
async fn parameterized_query_rebinds_per_execution() {
    let session = session(seeded_store(), SessionOptions::default());

    let paid = session
        .query::<Order>()
        .filter(
            "status",
            FilterOperator::Equal,
            ValueExpression::parameter("status"),
        )
        .bind("status", "paid")
        .to_vec()
        .await
        .unwrap();
    assert_eq!(paid.len(), 2);

    let open = session
        .query::<Order>()
        .filter(
            "status",
            FilterOperator::Equal,
            ValueExpression::parameter("status"),
        )
        .bind("status", "open")
        .to_vec()
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
}

#[tokio::test]
async fn prefix_matching_uses_an_upper_bound() {
    let session = session(seeded_store(), SessionOptions::default());
    let orders = session
        .query::<Order>()
        .starts_with("status", "pa")
        .to_vec()
        .await
        .unwrap();
    assert_eq!(orders.len(), 2);

    let none = session
        .query::<Order>()
        .starts_with("status", "z")
        .to_vec()
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn cursor_continues_after_anchor() {
    let session = session(seeded_store(), SessionOptions::default());
    let page = session
        .query::<Order>()
        .order_by_ascending("total")
        .start_after(FirestoreCursor::new("o1", vec![Value::from_integer(10)]))
        .records()
        .await
        .unwrap();

    let ids: Vec<&str> = page.iter().map(|record| record.key().id()).collect();
    assert_eq!(ids, ["o3", "o2"]);
}

#[tokio::test]
async fn cursor_cardinality_mismatch_is_rejected() {
    let session = session(seeded_store(), SessionOptions::default());
    let err = session
        .query::<Order>()
        .order_by_ascending("total")
        .start_after(FirestoreCursor::new(
            "o1",
            vec![Value::from_integer(10), Value::from_integer(20)],
        ))
        .records()
        .await
        .unwrap_err();
    assert_eq!(err.code_str(), "odm/invalid-argument");
}

#[tokio::test]
async fn count_any_sum_and_average() {
    let session = session(seeded_store(), SessionOptions::default());

    let count = session
        .query::<Order>()
        .filter("status", FilterOperator::Equal, "paid")
        .count()
        .await
        .unwrap();
    assert_eq!(count, 2);

    let any = session
        .query::<Order>()
        .filter("status", FilterOperator::Equal, "open")
        .any()
        .await
        .unwrap();
    assert!(any);

    let none = session
        .query::<Order>()
        .filter("status", FilterOperator::Equal, "void")
        .any()
        .await
        .unwrap();
    assert!(!none);

    let sum = session
        .query::<Order>()
        .sum("total", ScalarShape::required(ScalarKind::Integer))
        .await
        .unwrap();
    assert_eq!(sum, Value::from_integer(60));

    let average = session
        .query::<Order>()
        .average("total", ScalarShape::required(ScalarKind::Double))
        .await
        .unwrap();
    assert_eq!(average, Value::from_double(20.0));
}

#[tokio::test]
async fn min_max_run_as_ordered_limit_one_queries() {
    let session = session(seeded_store(), SessionOptions::default());

    let max = session
        .query::<Order>()
        .max("total", ScalarShape::nullable(ScalarKind::Double))
        .await
        .unwrap();
    assert_eq!(max, Value::from_double(30.0));

    let min = session
        .query::<Order>()
        .filter("status", FilterOperator::Equal, "paid")
        .min("total", ScalarShape::required(ScalarKind::Double))
        .await
        .unwrap();
    assert_eq!(min, Value::from_double(10.0));
}

// Max over an empty match set: null for a nullable target, an
// empty-sequence failure for a non-nullable one.
#[tokio::test]
async fn empty_sequence_policy_for_max() {
    let session = session(InMemoryStoreClient::new(), SessionOptions::default());

    let nullable = session
        .query::<Order>()
        .filter("status", FilterOperator::Equal, "Paid")
        .max("total", ScalarShape::nullable(ScalarKind::Double))
        .await
        .unwrap();
    assert!(nullable.is_null());

    let err = session
        .query::<Order>()
        .filter("status", FilterOperator::Equal, "Paid")
        .max("total", ScalarShape::required(ScalarKind::Double))
        .await
        .unwrap_err();
    assert_eq!(err.code_str(), "odm/empty-sequence");
}

#[tokio::test]
async fn empty_sequence_policy_applies_to_average_and_min_too() {
    let session = session(InMemoryStoreClient::new(), SessionOptions::default());

    let average = session
        .query::<Order>()
        .average("total", ScalarShape::nullable(ScalarKind::Double))
        .await
        .unwrap();
    assert!(average.is_null());

    let err = session
        .query::<Order>()
        .average("total", ScalarShape::required(ScalarKind::Double))
        .await
        .unwrap_err();
    assert_eq!(err.code_str(), "odm/empty-sequence");

    let err = session
        .query::<Order>()
        .min("total", ScalarShape::required(ScalarKind::Double))
        .await
        .unwrap_err();
    assert_eq!(err.code_str(), "odm/empty-sequence");
}

#[tokio::test]
async fn empty_sequence_policy_holds_for_parameterized_queries() {
    let session = session(InMemoryStoreClient::new(), SessionOptions::default());
    let nullable = session
        .query::<Order>()
        .filter(
            "status",
            FilterOperator::Equal,
            ValueExpression::parameter("status"),
        )
        .bind("status", "Paid")
        .max("total", ScalarShape::nullable(ScalarKind::Double))
        .await
        .unwrap();
    assert!(nullable.is_null());
}

#[tokio::test]
async fn point_read_of_missing_document_is_empty_not_an_error() {
    let session = session(seeded_store(), SessionOptions::default());
    let missing = session.find::<Order>("doc-1").await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn point_read_returns_the_document() {
    let session = session(seeded_store(), SessionOptions::default());
    let order = session.find::<Order>("o1").await.unwrap().unwrap();
    assert_eq!(order.status, "paid");
    assert_eq!(order.total, 10.0);
}

#[tokio::test]
async fn streaming_is_single_pass_and_lazy() {
    let session = session(seeded_store(), SessionOptions::default());
    let stream = session
        .query::<Order>()
        .filter("status", FilterOperator::Equal, "paid")
        .as_no_tracking()
        .stream()
        .await
        .unwrap();

    let orders: Vec<Arc<Order>> = stream
        .map(|order| order.unwrap())
        .collect()
        .await;
    assert_eq!(orders.len(), 2);
}

/// Store wrapper that fails a fixed number of times before delegating.
struct FlakyStoreClient {
    inner: InMemoryStoreClient,
    remaining_failures: AtomicUsize,
    invocations: AtomicUsize,
    transient: bool,
}

impl FlakyStoreClient {
    fn new(inner: InMemoryStoreClient, failures: usize, transient: bool) -> Self {
        Self {
            inner,
            remaining_failures: AtomicUsize::new(failures),
            invocations: AtomicUsize::new(0),
            transient,
        }
    }

    fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    fn fail_if_scheduled(&self) -> OdmResult<()> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let remaining = self.remaining_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_failures.store(remaining - 1, Ordering::SeqCst);
            if self.transient {
                return Err(error::unavailable("store briefly unavailable"));
            }
            return Err(error::invalid_argument("malformed request"));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreClient for FlakyStoreClient {
    async fn get_document(
        &self,
        key: &DocumentKey,
        cancel: &CancellationToken,
    ) -> OdmResult<Option<DocumentSnapshot>> {
        self.fail_if_scheduled()?;
        self.inner.get_document(key, cancel).await
    }

    async fn get_document_by_reference(
        &self,
        reference: &str,
        cancel: &CancellationToken,
    ) -> OdmResult<Option<DocumentSnapshot>> {
        self.fail_if_scheduled()?;
        self.inner.get_document_by_reference(reference, cancel).await
    }

    async fn run_query(
        &self,
        query: &NativeQuery,
        cancel: &CancellationToken,
    ) -> OdmResult<Vec<DocumentSnapshot>> {
        self.fail_if_scheduled()?;
        self.inner.run_query(query, cancel).await
    }

    async fn run_aggregate(
        &self,
        query: &NativeAggregateQuery,
        cancel: &CancellationToken,
    ) -> OdmResult<Value> {
        self.fail_if_scheduled()?;
        self.inner.run_aggregate(query, cancel).await
    }
}

fn fast_retry(max_attempts: usize) -> RetrySettings {
    RetrySettings {
        max_attempts,
        initial_delay: std::time::Duration::from_millis(1),
        multiplier: 2.0,
        max_delay: std::time::Duration::from_millis(10),
    }
}

#[tokio::test]
async fn transient_failures_retry_up_to_the_bound() {
    let flaky = Arc::new(FlakyStoreClient::new(seeded_store(), 2, true));
    let session = firestore_odm::DocumentSession::new(
        Arc::clone(&flaky) as Arc<dyn StoreClient>,
        common::registry(),
        SessionOptions::default().with_retry(fast_retry(3)),
    );

    let orders = session.query::<Order>().to_vec().await.unwrap();
    assert_eq!(orders.len(), 3);
    assert_eq!(flaky.invocations(), 3);
}

#[tokio::test]
async fn transient_failures_beyond_the_bound_surface() {
    let flaky = Arc::new(FlakyStoreClient::new(seeded_store(), 5, true));
    let session = firestore_odm::DocumentSession::new(
        Arc::clone(&flaky) as Arc<dyn StoreClient>,
        common::registry(),
        SessionOptions::default().with_retry(fast_retry(3)),
    );

    let err = session.query::<Order>().to_vec().await.unwrap_err();
    assert_eq!(err.code_str(), "odm/unavailable");
    assert_eq!(flaky.invocations(), 3);
}

#[tokio::test]
async fn non_transient_failures_are_not_retried() {
    let flaky = Arc::new(FlakyStoreClient::new(seeded_store(), 1, false));
    let session = firestore_odm::DocumentSession::new(
        Arc::clone(&flaky) as Arc<dyn StoreClient>,
        common::registry(),
        SessionOptions::default().with_retry(fast_retry(3)),
    );

    let err = session.query::<Order>().to_vec().await.unwrap_err();
    assert_eq!(err.code_str(), "odm/invalid-argument");
    assert_eq!(flaky.invocations(), 1);
}

#[tokio::test]
async fn cancellation_surfaces_as_cancelled() {
    let session = session(seeded_store(), SessionOptions::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = session
        .query::<Order>()
        .with_cancellation(cancel)
        .to_vec()
        .await
        .unwrap_err();
    assert_eq!(err.code_str(), "odm/cancelled");
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_during_a_retry_delay_stops_retrying() {
    let flaky = Arc::new(FlakyStoreClient::new(seeded_store(), usize::MAX, true));
    let session = firestore_odm::DocumentSession::new(
        Arc::clone(&flaky) as Arc<dyn StoreClient>,
        common::registry(),
        SessionOptions::default().with_retry(RetrySettings {
            max_attempts: 10,
            initial_delay: std::time::Duration::from_millis(200),
            multiplier: 1.0,
            max_delay: std::time::Duration::from_secs(1),
        }),
    );

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let err = session
        .query::<Order>()
        .with_cancellation(cancel)
        .to_vec()
        .await
        .unwrap_err();
    assert_eq!(err.code_str(), "odm/cancelled");
    assert!(flaky.invocations() <= 2);
}
