//! firestore-odm: a typed query pipeline and object-document mapper for
//! Firestore-shaped document stores.
//!
//! Queries are described as immutable expressions, resolved against
//! execution-time parameters, translated into native store queries and run
//! through an explicit handler chain that executes, converts, tracks and
//! optionally lazy-loads results, reassembling nested object graphs from
//! the flat set of documents the store hands back.

pub mod client;
pub mod convert;
pub mod diagnostics;
pub mod error;
pub mod expression;
pub mod metadata;
pub mod model;
pub mod native;
pub mod pipeline;
pub mod resolver;
pub mod session;
pub mod tracking;
pub mod value;

pub use client::{DocumentSnapshot, InMemoryStoreClient, StoreClient};
pub use convert::{deserialize_fields, RelatedEntities, StandardTypeConverter, TypeConverter};
pub use error::{OdmError, OdmErrorCode, OdmResult};
pub use expression::{
    AggregationKind, AggregationSpec, FilterOperator, FirestoreCursor, IncludeSpec, OrderByClause,
    OrderDirection, ProjectionSpec, QueryExpression, SubcollectionProjection, ValueExpression,
    WhereClause,
};
pub use metadata::{
    EntityDescriptor, MetadataProvider, MetadataRegistry, NavigationDescriptor, NavigationKind,
    Record, ScalarKind, ScalarShape,
};
pub use model::{DatabaseId, DocumentKey, FieldPath, ResourcePath};
pub use pipeline::{
    EntityRecord, IncludeLoader, NavigationHandle, PipelineContext, PipelineResult, QueryKind,
    QueryPipeline, RetrySettings,
};
pub use resolver::{QueryContext, QueryResolver, ResolvedQuery};
pub use session::{DocumentSession, Query, SessionOptions};
pub use value::{MapValue, Value, ValueKind};
