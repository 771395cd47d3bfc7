use crate::error::{invalid_argument, OdmResult};

/// A dot-separated path to a field inside a document, possibly nested.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn new<S, I>(segments: I) -> OdmResult<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(invalid_argument(
                "FieldPath must contain at least one segment",
            ));
        }
        Ok(Self { segments })
    }

    pub fn from_dot_separated(path: &str) -> OdmResult<Self> {
        if path.trim().is_empty() {
            return Err(invalid_argument("FieldPath string cannot be empty"));
        }
        FieldPath::new(path.split('.'))
    }

    pub fn last_segment(&self) -> &str {
        self.segments
            .last()
            .expect("FieldPath always has at least one segment")
            .as_str()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn canonical_string(&self) -> String {
        self.segments.join(".")
    }

    /// The pseudo-field addressing the document id itself.
    pub fn document_id() -> Self {
        Self {
            segments: vec!["__name__".to_string()],
        }
    }

    pub fn is_document_id(&self) -> bool {
        self.segments.len() == 1 && self.segments[0] == "__name__"
    }
}

/// Trait that converts common user inputs into a validated [`FieldPath`].
pub trait IntoFieldPath {
    fn into_field_path(self) -> OdmResult<FieldPath>;
}

impl IntoFieldPath for FieldPath {
    fn into_field_path(self) -> OdmResult<FieldPath> {
        Ok(self)
    }
}

impl<'a> IntoFieldPath for &'a FieldPath {
    fn into_field_path(self) -> OdmResult<FieldPath> {
        Ok(self.clone())
    }
}

impl IntoFieldPath for String {
    fn into_field_path(self) -> OdmResult<FieldPath> {
        FieldPath::from_dot_separated(&self)
    }
}

impl<'a> IntoFieldPath for &'a str {
    fn into_field_path(self) -> OdmResult<FieldPath> {
        FieldPath::from_dot_separated(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_dot_path() {
        let field = FieldPath::from_dot_separated("customer.region").unwrap();
        assert_eq!(field.segments(), &["customer", "region"]);
    }

    #[test]
    fn rejects_empty() {
        let err = FieldPath::from_dot_separated("").unwrap_err();
        assert_eq!(err.code_str(), "odm/invalid-argument");
    }

    #[test]
    fn document_id_pseudo_field() {
        assert!(FieldPath::document_id().is_document_id());
        assert!(!FieldPath::from_dot_separated("name").unwrap().is_document_id());
    }
}
