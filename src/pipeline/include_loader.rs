use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::client::StoreClient;
use crate::convert::RelatedEntities;
use crate::error::{failed_precondition, invalid_argument, OdmResult};
use crate::metadata::{MetadataProvider, NavigationKind};
use crate::model::DocumentKey;
use crate::native::build_include_query;
use crate::pipeline::result::EntityRecord;

/// Loads a single navigation for an already-materialized entity, outside of
/// and independent from the eager include mechanism.
pub struct IncludeLoader {
    client: Arc<dyn StoreClient>,
    metadata: Arc<dyn MetadataProvider>,
}

impl IncludeLoader {
    pub fn new(client: Arc<dyn StoreClient>, metadata: Arc<dyn MetadataProvider>) -> Self {
        Self { client, metadata }
    }

    /// Fetches and materializes the documents behind one navigation of the
    /// entity at `owner`. Dangling references and missing owners produce an
    /// empty result, not an error.
    pub async fn load_navigation(
        &self,
        owner_entity: &str,
        owner: &DocumentKey,
        navigation: &str,
        cancel: &CancellationToken,
    ) -> OdmResult<Vec<EntityRecord>> {
        let descriptor = self.metadata.descriptor(owner_entity).ok_or_else(|| {
            failed_precondition(format!(
                "No metadata registered for entity '{owner_entity}'"
            ))
        })?;
        let nav = descriptor.navigation(navigation).ok_or_else(|| {
            invalid_argument(format!(
                "Entity '{owner_entity}' has no navigation named '{navigation}'"
            ))
        })?;
        let target = nav.target_entity();
        let materializer = self.metadata.materializer(target).ok_or_else(|| {
            failed_precondition(format!("No metadata registered for entity '{target}'"))
        })?;
        let related = RelatedEntities::new();

        match nav.kind() {
            NavigationKind::Reference { field } => {
                let Some(owner_snapshot) = self.client.get_document(owner, cancel).await? else {
                    return Ok(Vec::new());
                };
                let Some(value) = owner_snapshot.field(field) else {
                    return Ok(Vec::new());
                };
                let reference = match value.as_reference().or_else(|| value.as_str()) {
                    Some(reference) => reference.to_string(),
                    None => return Ok(Vec::new()),
                };
                match self
                    .client
                    .get_document_by_reference(&reference, cancel)
                    .await?
                {
                    Some(snapshot) => {
                        let instance = materializer(&snapshot, &related)?;
                        Ok(vec![EntityRecord::new(
                            snapshot.key().clone(),
                            target,
                            instance,
                        )])
                    }
                    None => Ok(Vec::new()),
                }
            }
            NavigationKind::Collection { collection_id } => {
                let query = build_include_query(owner.path(), collection_id);
                let children = self.client.run_query(&query, cancel).await?;
                children
                    .into_iter()
                    .map(|snapshot| {
                        let instance = materializer(&snapshot, &related)?;
                        Ok(EntityRecord::new(snapshot.key().clone(), target, instance))
                    })
                    .collect()
            }
        }
    }
}

/// Per-record handle attached by the lazy-navigation handler: carries the
/// loader plus the owning document's identity, so unfetched navigations can
/// be pulled on demand.
#[derive(Clone)]
pub struct NavigationHandle {
    loader: Arc<IncludeLoader>,
    owner: DocumentKey,
    entity: &'static str,
}

impl NavigationHandle {
    pub fn new(loader: Arc<IncludeLoader>, owner: DocumentKey, entity: &'static str) -> Self {
        Self {
            loader,
            owner,
            entity,
        }
    }

    pub async fn load(
        &self,
        navigation: &str,
        cancel: &CancellationToken,
    ) -> OdmResult<Vec<EntityRecord>> {
        self.loader
            .load_navigation(self.entity, &self.owner, navigation, cancel)
            .await
    }

    /// Loads a collection navigation as typed instances.
    pub async fn load_many<T: Send + Sync + 'static>(
        &self,
        navigation: &str,
        cancel: &CancellationToken,
    ) -> OdmResult<Vec<Arc<T>>> {
        self.load(navigation, cancel)
            .await?
            .iter()
            .map(EntityRecord::downcast)
            .collect()
    }

    /// Loads a reference navigation as a typed instance, `None` when the
    /// pointer is absent or dangling.
    pub async fn load_one<T: Send + Sync + 'static>(
        &self,
        navigation: &str,
        cancel: &CancellationToken,
    ) -> OdmResult<Option<Arc<T>>> {
        let records = self.load(navigation, cancel).await?;
        records.first().map(EntityRecord::downcast).transpose()
    }
}
