use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use crate::error::{invalid_argument, OdmResult};

/// A slash-separated path into the document store.
///
/// Paths with an odd number of segments address collections, paths with an
/// even number address documents.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourcePath {
    segments: Vec<String>,
}

impl ResourcePath {
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments = segments.into_iter().map(Into::into).collect();
        Self::new(segments)
    }

    pub fn from_string(path: &str) -> OdmResult<Self> {
        if path.trim().is_empty() {
            return Ok(Self::root());
        }

        if path.contains("//") {
            return Err(invalid_argument("Found empty segment in resource path"));
        }

        Ok(Self::from_segments(
            path.split('/')
                .filter(|segment| !segment.is_empty())
                .map(|segment| segment.to_string()),
        ))
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(|s| s.as_str())
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn child<I, S>(&self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut new_segments = self.segments.clone();
        new_segments.extend(segments.into_iter().map(Into::into));
        Self::new(new_segments)
    }

    pub fn without_last(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self::new(segments)
    }

    pub fn pop_first_n(&self, count: usize) -> Self {
        if count == 0 {
            return self.clone();
        }
        if count >= self.segments.len() {
            return Self::root();
        }
        Self::new(self.segments[count..].to_vec())
    }

    pub fn first_segment(&self) -> Option<&str> {
        self.segments.first().map(|s| s.as_str())
    }

    pub fn last_segment(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    /// The second-to-last segment, i.e. for a document path the id of the
    /// collection the document lives in.
    pub fn penultimate_segment(&self) -> Option<&str> {
        if self.segments.len() < 2 {
            return None;
        }
        self.segments
            .get(self.segments.len() - 2)
            .map(|s| s.as_str())
    }

    pub fn canonical_string(&self) -> String {
        self.segments.join("/")
    }

    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.len() > other.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(other.segments.iter())
            .all(|(l, r)| l == r)
    }

    pub fn comparator(left: &Self, right: &Self) -> Ordering {
        for (l, r) in left.segments.iter().zip(right.segments.iter()) {
            match l.cmp(r) {
                Ordering::Equal => continue,
                non_eq => return non_eq,
            }
        }
        left.len().cmp(&right.len())
    }
}

impl Display for ResourcePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_render_path() {
        let path = ResourcePath::from_string("orders/o1/items/i2").unwrap();
        assert_eq!(path.len(), 4);
        assert_eq!(path.last_segment(), Some("i2"));
        assert_eq!(path.penultimate_segment(), Some("items"));
        assert_eq!(path.canonical_string(), "orders/o1/items/i2");
    }

    #[test]
    fn handles_root_path() {
        let path = ResourcePath::from_string("").unwrap();
        assert!(path.is_empty());
        assert_eq!(path.penultimate_segment(), None);
    }

    #[test]
    fn rejects_empty_segments() {
        let err = ResourcePath::from_string("orders//o1").unwrap_err();
        assert_eq!(err.code_str(), "odm/invalid-argument");
    }

    #[test]
    fn prefix_checks() {
        let parent = ResourcePath::from_string("orders/o1").unwrap();
        let child = ResourcePath::from_string("orders/o1/items/i1").unwrap();
        assert!(parent.is_prefix_of(&child));
        assert!(!child.is_prefix_of(&parent));
    }
}
