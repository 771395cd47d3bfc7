use crate::model::ResourcePath;

const DEFAULT_DATABASE: &str = "(default)";

/// Identifies one logical database within a project.
///
/// Fully qualified document names carry a
/// `projects/{project}/databases/{database}/documents` prefix; pipeline code
/// works with paths relative to that prefix and uses [`DatabaseId`] to strip
/// or re-apply it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DatabaseId {
    project_id: String,
    database: String,
}

impl DatabaseId {
    pub fn new(project_id: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: database.into(),
        }
    }

    pub fn default_database(project_id: impl Into<String>) -> Self {
        Self::new(project_id, DEFAULT_DATABASE)
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// The path prefix under which all documents of this database live.
    pub fn root_path(&self) -> ResourcePath {
        ResourcePath::from_segments([
            "projects",
            self.project_id.as_str(),
            "databases",
            self.database.as_str(),
            "documents",
        ])
    }

    pub fn qualify(&self, relative: &ResourcePath) -> ResourcePath {
        self.root_path().child(relative.segments().to_vec())
    }
}

/// Strips a `projects/{p}/databases/{d}/documents` prefix if present,
/// returning the database-relative remainder unchanged otherwise.
pub(crate) fn strip_qualified_prefix(path: &ResourcePath) -> ResourcePath {
    if path.len() >= 5
        && path.segment(0) == Some("projects")
        && path.segment(2) == Some("databases")
        && path.segment(4) == Some("documents")
    {
        return path.pop_first_n(5);
    }
    path.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualifies_relative_paths() {
        let db = DatabaseId::default_database("demo");
        let relative = ResourcePath::from_string("orders/o1").unwrap();
        assert_eq!(
            db.qualify(&relative).canonical_string(),
            "projects/demo/databases/(default)/documents/orders/o1"
        );
    }

    #[test]
    fn strips_qualified_prefix() {
        let qualified = ResourcePath::from_string(
            "projects/demo/databases/(default)/documents/orders/o1/items/i1",
        )
        .unwrap();
        assert_eq!(
            strip_qualified_prefix(&qualified).canonical_string(),
            "orders/o1/items/i1"
        );
    }

    #[test]
    fn leaves_relative_paths_alone() {
        let relative = ResourcePath::from_string("orders/o1").unwrap();
        assert_eq!(strip_qualified_prefix(&relative), relative);
    }
}
