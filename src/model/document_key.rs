use crate::error::{invalid_argument, OdmResult};
use crate::model::ResourcePath;

/// Address of a single document: a resource path with an even number of
/// segments.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    path: ResourcePath,
}

impl DocumentKey {
    pub fn from_path(path: ResourcePath) -> OdmResult<Self> {
        if path.len() < 2 || path.len() % 2 != 0 {
            return Err(invalid_argument(
                "Document keys must point to a document (even number of segments)",
            ));
        }
        Ok(Self { path })
    }

    pub fn from_string(path: &str) -> OdmResult<Self> {
        let resource = ResourcePath::from_string(path)?;
        Self::from_path(resource)
    }

    pub fn collection_path(&self) -> ResourcePath {
        self.path.without_last()
    }

    /// The id of the collection this document directly belongs to.
    pub fn collection_id(&self) -> &str {
        self.path
            .penultimate_segment()
            .expect("DocumentKey path always has a collection segment")
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn id(&self) -> &str {
        self.path
            .last_segment()
            .expect("DocumentKey path always has an id")
    }
}
