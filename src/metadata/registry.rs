use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::client::DocumentSnapshot;
use crate::convert::RelatedEntities;
use crate::error::OdmResult;
use crate::metadata::{EntityDescriptor, Record};

/// A materialized entity instance with its concrete type erased. Shared via
/// `Arc` so identity tracking can hand out the same instance repeatedly.
pub type DynEntity = Arc<dyn Any + Send + Sync>;

/// Builds one entity instance from a snapshot plus the related entities
/// already materialized for the same request.
pub type Materializer =
    Arc<dyn Fn(&DocumentSnapshot, &RelatedEntities) -> OdmResult<DynEntity> + Send + Sync>;

/// The metadata oracle consumed by the pipeline: collection names, primary
/// keys, navigation descriptors and per-type materialization strategies,
/// keyed by entity name.
pub trait MetadataProvider: Send + Sync {
    fn descriptor(&self, entity: &str) -> Option<EntityDescriptor>;

    fn materializer(&self, entity: &str) -> Option<Materializer>;

    /// Reverse lookup from a root collection id to the entity stored there.
    fn entity_for_collection(&self, collection: &str) -> Option<&'static str>;
}

struct RegisteredEntity {
    descriptor: EntityDescriptor,
    materializer: Materializer,
}

/// Plain registry implementation of [`MetadataProvider`]; each entity type is
/// registered explicitly and contributes a typed materialization strategy.
#[derive(Default)]
pub struct MetadataRegistry {
    entries: HashMap<&'static str, RegisteredEntity>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Record>(&mut self) {
        let descriptor = T::descriptor();
        let materializer: Materializer = Arc::new(|snapshot, related| {
            T::from_snapshot(snapshot, related).map(|entity| Arc::new(entity) as DynEntity)
        });
        self.entries.insert(
            descriptor.entity_name(),
            RegisteredEntity {
                descriptor,
                materializer,
            },
        );
    }

    pub fn with<T: Record>(mut self) -> Self {
        self.register::<T>();
        self
    }

    pub fn is_registered(&self, entity: &str) -> bool {
        self.entries.contains_key(entity)
    }
}

impl MetadataProvider for MetadataRegistry {
    fn descriptor(&self, entity: &str) -> Option<EntityDescriptor> {
        self.entries
            .get(entity)
            .map(|entry| entry.descriptor.clone())
    }

    fn materializer(&self, entity: &str) -> Option<Materializer> {
        self.entries
            .get(entity)
            .map(|entry| Arc::clone(&entry.materializer))
    }

    fn entity_for_collection(&self, collection: &str) -> Option<&'static str> {
        self.entries
            .values()
            .find(|entry| entry.descriptor.collection() == collection)
            .map(|entry| entry.descriptor.entity_name())
    }
}
