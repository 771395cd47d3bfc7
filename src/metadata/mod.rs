//! Entity metadata: how record types map onto collections, keys and
//! navigations.
//!
//! The pipeline consumes this through the [`MetadataProvider`] trait; the
//! in-crate [`MetadataRegistry`] is a plain registry populated by explicit
//! [`Record`] registrations, with no convention discovery of its own.

mod descriptor;
mod registry;

pub use descriptor::{
    EntityDescriptor, NavigationDescriptor, NavigationKind, ScalarKind, ScalarShape,
};
pub use registry::{DynEntity, Materializer, MetadataProvider, MetadataRegistry};

use crate::client::DocumentSnapshot;
use crate::convert::RelatedEntities;
use crate::error::OdmResult;

/// A user record type that can be materialized from document snapshots.
///
/// `from_snapshot` receives the related-entity map so reference and
/// child-collection navigations resolve to instances that were already built
/// for the same request.
pub trait Record: Send + Sync + 'static {
    fn descriptor() -> EntityDescriptor
    where
        Self: Sized;

    fn from_snapshot(snapshot: &DocumentSnapshot, related: &RelatedEntities) -> OdmResult<Self>
    where
        Self: Sized;
}
