//! Native query shapes: what the store client actually executes, and the
//! pure translation from resolved queries into them.

mod builder;
mod query;

pub use builder::{
    build_aggregate, build_include_query, build_min_max_query, build_point_read, build_query,
    build_subcollection_aggregate, build_subcollection_query,
};
pub use query::{
    NativeAggregateOperation, NativeAggregateQuery, NativeCursor, NativeFilter, NativeOperator,
    NativeOrder, NativeQuery,
};
