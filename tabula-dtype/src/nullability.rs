use std::fmt::{Display, Formatter};

/// Whether a field may hold null values.
///
/// For columns this controls the arrow field's nullability. For attributes a nullable field may
/// be left unset, and for sub-tables it marks the struct column as nullable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Nullability {
    /// The field is required
    #[default]
    NonNullable,
    /// The field may be null (or, for attributes, unset)
    Nullable,
}

impl Nullability {
    /// Whether this is [`Nullability::Nullable`].
    pub fn is_nullable(&self) -> bool {
        matches!(self, Nullability::Nullable)
    }
}

impl From<bool> for Nullability {
    fn from(nullable: bool) -> Self {
        if nullable {
            Self::Nullable
        } else {
            Self::NonNullable
        }
    }
}

/// Rendered as a `?` suffix on nullable fields, e.g. `x: Int64?`.
impl Display for Nullability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_nullable() {
            write!(f, "?")
        } else {
            Ok(())
        }
    }
}
