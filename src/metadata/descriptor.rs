use crate::model::FieldPath;

/// The scalar result shapes the pipeline can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    Boolean,
    Integer,
    Double,
    String,
    Timestamp,
}

/// Target shape of a scalar-producing operator; `nullable` decides the
/// empty-sequence policy for average, min and max.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalarShape {
    pub kind: ScalarKind,
    pub nullable: bool,
}

impl ScalarShape {
    pub fn required(kind: ScalarKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    pub fn nullable(kind: ScalarKind) -> Self {
        Self {
            kind,
            nullable: true,
        }
    }
}

/// Describes how one entity type maps onto the store.
#[derive(Clone, Debug)]
pub struct EntityDescriptor {
    entity_name: &'static str,
    collection: String,
    primary_key: Vec<FieldPath>,
    navigations: Vec<NavigationDescriptor>,
}

impl EntityDescriptor {
    pub fn new(entity_name: &'static str, collection: impl Into<String>) -> Self {
        Self {
            entity_name,
            collection: collection.into(),
            primary_key: vec![FieldPath::document_id()],
            navigations: Vec::new(),
        }
    }

    pub fn with_primary_key(mut self, key: Vec<FieldPath>) -> Self {
        self.primary_key = key;
        self
    }

    pub fn with_navigation(mut self, navigation: NavigationDescriptor) -> Self {
        self.navigations.push(navigation);
        self
    }

    pub fn entity_name(&self) -> &'static str {
        self.entity_name
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn primary_key(&self) -> &[FieldPath] {
        &self.primary_key
    }

    pub fn navigations(&self) -> &[NavigationDescriptor] {
        &self.navigations
    }

    pub fn navigation(&self, name: &str) -> Option<&NavigationDescriptor> {
        self.navigations.iter().find(|nav| nav.name() == name)
    }
}

/// One navigation from an entity to related data.
#[derive(Clone, Debug)]
pub struct NavigationDescriptor {
    name: String,
    target_entity: &'static str,
    kind: NavigationKind,
}

#[derive(Clone, Debug)]
pub enum NavigationKind {
    /// A pointer field inside the owning document, addressing one document of
    /// the target type.
    Reference { field: FieldPath },
    /// A child collection nested under the owning document's path.
    Collection { collection_id: String },
}

impl NavigationDescriptor {
    pub fn reference(
        name: impl Into<String>,
        target_entity: &'static str,
        field: FieldPath,
    ) -> Self {
        Self {
            name: name.into(),
            target_entity,
            kind: NavigationKind::Reference { field },
        }
    }

    pub fn collection(
        name: impl Into<String>,
        target_entity: &'static str,
        collection_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target_entity,
            kind: NavigationKind::Collection {
                collection_id: collection_id.into(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target_entity(&self) -> &'static str {
        self.target_entity
    }

    pub fn kind(&self) -> &NavigationKind {
        &self.kind
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.kind, NavigationKind::Collection { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_defaults_to_document_id_key() {
        let descriptor = EntityDescriptor::new("Order", "orders");
        assert_eq!(descriptor.primary_key(), &[FieldPath::document_id()]);
    }

    #[test]
    fn navigation_lookup_by_name() {
        let descriptor = EntityDescriptor::new("Order", "orders").with_navigation(
            NavigationDescriptor::collection("items", "OrderItem", "items"),
        );
        assert!(descriptor.navigation("items").unwrap().is_collection());
        assert!(descriptor.navigation("customer").is_none());
    }
}
