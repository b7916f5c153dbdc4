use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::FieldName;

/// The separator between the components of a dotted path.
pub const PATH_SEPARATOR: char = '.';

/// A path through nested sub-tables, written as dot-separated field names (`"middle.inner.id1"`).
///
/// Attribute metadata keys and flattened column names are dotted paths. The root path is empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributePath(Vec<FieldName>);

impl AttributePath {
    /// The empty path.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Split a dotted string into its components.
    pub fn parse(path: &str) -> Self {
        if path.is_empty() {
            return Self::root();
        }
        Self(path.split(PATH_SEPARATOR).map(FieldName::from).collect())
    }

    /// Append a component.
    pub fn push(mut self, name: impl Into<FieldName>) -> Self {
        self.0.push(name.into());
        self
    }

    /// The path's components, outermost first.
    pub fn parts(&self) -> &[FieldName] {
        &self.0
    }

    /// Whether this is the empty path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The first component and the remaining path.
    pub fn split_first(&self) -> Option<(&FieldName, AttributePath)> {
        self.0
            .split_first()
            .map(|(head, tail)| (head, AttributePath(tail.to_vec())))
    }
}

impl Display for AttributePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.iter().join("."))
    }
}

impl From<&str> for AttributePath {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// Join a prefix and a key with the path separator. An empty prefix yields the key unchanged.
pub fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}{PATH_SEPARATOR}{key}")
    }
}
