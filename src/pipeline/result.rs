use std::sync::Arc;

use futures::stream::BoxStream;

use crate::client::DocumentSnapshot;
use crate::error::{internal_error, OdmResult};
use crate::metadata::DynEntity;
use crate::model::DocumentKey;
use crate::pipeline::include_loader::NavigationHandle;
use crate::pipeline::PipelineContext;
use crate::value::MapValue;

/// One element of a materialized or streaming result, at whatever stage of
/// the pipeline it currently is: raw snapshot out of execution, typed record
/// out of conversion, or projected row.
#[derive(Clone)]
pub enum PipelineItem {
    Snapshot(DocumentSnapshot),
    Record(EntityRecord),
    Row(MapValue),
}

/// A materialized entity: its document key, entity type, shared instance and
/// (when lazy navigation is configured) a handle that loads unfetched
/// navigations on demand.
#[derive(Clone)]
pub struct EntityRecord {
    key: DocumentKey,
    entity: &'static str,
    instance: DynEntity,
    navigations: Option<NavigationHandle>,
}

impl std::fmt::Debug for EntityRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRecord")
            .field("key", &self.key)
            .field("entity", &self.entity)
            .field("has_navigations", &self.navigations.is_some())
            .finish()
    }
}

impl EntityRecord {
    pub fn new(key: DocumentKey, entity: &'static str, instance: DynEntity) -> Self {
        Self {
            key,
            entity,
            instance,
            navigations: None,
        }
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn instance(&self) -> &DynEntity {
        &self.instance
    }

    pub fn with_instance(mut self, instance: DynEntity) -> Self {
        self.instance = instance;
        self
    }

    pub fn with_navigations(mut self, handle: NavigationHandle) -> Self {
        self.navigations = Some(handle);
        self
    }

    /// The lazy navigation handle, present when the pipeline was configured
    /// with an include loader.
    pub fn navigations(&self) -> Option<&NavigationHandle> {
        self.navigations.as_ref()
    }

    pub fn downcast<T: Send + Sync + 'static>(&self) -> OdmResult<Arc<T>> {
        Arc::clone(&self.instance).downcast::<T>().map_err(|_| {
            internal_error(format!(
                "Record at {} is not of the requested type",
                self.key.path()
            ))
        })
    }
}

pub type ItemStream = BoxStream<'static, OdmResult<PipelineItem>>;

/// Outcome of one pipeline invocation. Exactly one variant is produced per
/// invocation; a `Streaming` result is single-pass and must be consumed at
/// most once.
pub enum PipelineResult {
    /// Nothing matched (point read of a nonexistent document).
    Empty,
    /// A single converted value.
    Scalar(crate::value::Value),
    /// Fully realized items plus the context they were produced under.
    Materialized {
        items: Vec<PipelineItem>,
        context: Box<PipelineContext>,
    },
    /// Lazily produced items; forward-only, producible once.
    Streaming {
        stream: ItemStream,
        context: Box<PipelineContext>,
    },
}

impl PipelineResult {
    pub fn materialized(items: Vec<PipelineItem>, context: PipelineContext) -> Self {
        PipelineResult::Materialized {
            items,
            context: Box::new(context),
        }
    }

    pub fn streaming(stream: ItemStream, context: PipelineContext) -> Self {
        PipelineResult::Streaming {
            stream,
            context: Box::new(context),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, PipelineResult::Empty)
    }

    /// Materialized items, when this is a materialized result.
    pub fn items(&self) -> Option<&[PipelineItem]> {
        match self {
            PipelineResult::Materialized { items, .. } => Some(items),
            _ => None,
        }
    }
}
