//! Field declarations: the named slots a [`TableSchema`](crate::TableSchema) is compiled from.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use arrow_schema::DataType;
use tabula_expr::Validator;
use tabula_scalar::ScalarValue;

use crate::{AttributeType, Nullability, TableSchemaRef};

/// The name of a field.
pub type FieldName = Arc<str>;

/// What a field stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// One value per row, stored as a physical column of the given arrow type.
    Column(DataType),
    /// One scalar per table instance, stored in the table's metadata.
    Attribute(AttributeType),
    /// A nested table, stored as a struct column. Its attributes live under the field's prefix.
    SubTable(TableSchemaRef),
}

impl FieldKind {
    /// Whether this field is stored as a physical column.
    pub fn is_physical(&self) -> bool {
        !matches!(self, FieldKind::Attribute(_))
    }
}

/// A named slot in a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: FieldName,
    kind: FieldKind,
    nullability: Nullability,
    default: Option<ScalarValue>,
    validator: Option<Validator>,
}

impl FieldDescriptor {
    fn new(name: impl Into<FieldName>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullability: Nullability::NonNullable,
            default: None,
            validator: None,
        }
    }

    /// A per-row column of `data_type`.
    pub fn column(name: impl Into<FieldName>, data_type: DataType) -> Self {
        Self::new(name, FieldKind::Column(data_type))
    }

    /// A per-instance scalar.
    pub fn attribute(name: impl Into<FieldName>, attribute_type: AttributeType) -> Self {
        Self::new(name, FieldKind::Attribute(attribute_type))
    }

    /// A nested table.
    pub fn subtable(name: impl Into<FieldName>, schema: TableSchemaRef) -> Self {
        Self::new(name, FieldKind::SubTable(schema))
    }

    /// Mark the field as nullable.
    pub fn nullable(self) -> Self {
        self.with_nullability(Nullability::Nullable)
    }

    /// Set the field's nullability.
    pub fn with_nullability(mut self, nullability: Nullability) -> Self {
        self.nullability = nullability;
        self
    }

    /// The value used when the field is not provided.
    ///
    /// For attributes, this is what the getter returns while the attribute is unset. For
    /// columns, an omitted column is filled with this value on every row.
    pub fn with_default(mut self, default: impl Into<ScalarValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Attach a predicate that every value of the field must satisfy.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// The field's name.
    pub fn name(&self) -> &FieldName {
        &self.name
    }

    /// What the field stores.
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// The field's nullability.
    pub fn nullability(&self) -> Nullability {
        self.nullability
    }

    /// Whether the field is nullable.
    pub fn is_nullable(&self) -> bool {
        self.nullability.is_nullable()
    }

    /// The field's default value, if any.
    pub fn default_value(&self) -> Option<&ScalarValue> {
        self.default.as_ref()
    }

    /// The field's validator, if any.
    pub fn validator(&self) -> Option<&Validator> {
        self.validator.as_ref()
    }

    /// Whether a value must be provided for this field.
    ///
    /// Fields that are nullable or have a default are optional.
    pub fn is_required(&self) -> bool {
        !self.is_nullable() && self.default.is_none()
    }

    /// The attribute type, if this is an attribute.
    pub fn as_attribute(&self) -> Option<AttributeType> {
        match &self.kind {
            FieldKind::Attribute(t) => Some(*t),
            _ => None,
        }
    }

    /// The nested schema, if this is a sub-table.
    pub fn as_subtable(&self) -> Option<&TableSchemaRef> {
        match &self.kind {
            FieldKind::SubTable(schema) => Some(schema),
            _ => None,
        }
    }

    /// The column's arrow type, if this is a column.
    pub fn as_column(&self) -> Option<&DataType> {
        match &self.kind {
            FieldKind::Column(dt) => Some(dt),
            _ => None,
        }
    }
}

impl Display for FieldDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            FieldKind::Column(dt) => write!(f, "{}: {}{}", self.name, dt, self.nullability),
            FieldKind::Attribute(t) => write!(f, "@{}: {}{}", self.name, t, self.nullability),
            FieldKind::SubTable(schema) => {
                write!(f, "{}: {}{}", self.name, schema.name(), self.nullability)
            }
        }
    }
}
