/// Eager-loading request for one navigation, with nested includes below it.
///
/// The tree is resolved against the metadata oracle at resolution time; at
/// this stage an include is nothing but a navigation name.
#[derive(Clone, Debug, PartialEq)]
pub struct IncludeSpec {
    navigation: String,
    nested: Vec<IncludeSpec>,
}

impl IncludeSpec {
    pub fn navigation(name: impl Into<String>) -> Self {
        Self {
            navigation: name.into(),
            nested: Vec::new(),
        }
    }

    pub fn with_nested(mut self, nested: IncludeSpec) -> Self {
        self.nested.push(nested);
        self
    }

    pub fn name(&self) -> &str {
        &self.navigation
    }

    pub fn nested(&self) -> &[IncludeSpec] {
        &self.nested
    }

    /// Appends `nested` to the deepest single-branch tail of this include;
    /// the shape `include(a).then_include(b)` builds `a -> b`.
    pub(crate) fn push_to_tail(&mut self, nested: IncludeSpec) {
        match self.nested.last_mut() {
            Some(last) => last.push_to_tail(nested),
            None => self.nested.push(nested),
        }
    }
}
