use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema, SchemaRef};
use itertools::Itertools;
use tabula_error::{TabulaResult, tabula_bail};

use crate::{AttributePath, FieldDescriptor, FieldKind, PATH_SEPARATOR, join_path};

/// A shared, compiled schema.
pub type TableSchemaRef = Arc<TableSchema>;

/// A compiled record type.
///
/// Compiling an ordered list of [`FieldDescriptor`]s produces:
/// - the physical arrow schema, one column per column or sub-table field in declaration order,
///   with sub-tables expanded in place as struct columns;
/// - the attribute key namespace, the dotted path of every attribute at any depth.
///
/// Equality is structural: two schemas are equal when their fields are equal, whatever their
/// names.
#[derive(Debug, Clone)]
pub struct TableSchema {
    name: Arc<str>,
    fields: Vec<FieldDescriptor>,
    arrow: SchemaRef,
    attribute_keys: BTreeSet<String>,
}

impl TableSchema {
    /// Compile `fields` into a schema called `name`.
    ///
    /// Fails with a schema error on duplicate or malformed field names, and on defaults or
    /// validators that the field's type cannot carry.
    pub fn compile(
        name: impl Into<Arc<str>>,
        fields: impl IntoIterator<Item = FieldDescriptor>,
    ) -> TabulaResult<Self> {
        let name = name.into();
        let fields: Vec<FieldDescriptor> = fields.into_iter().collect();

        let mut seen = BTreeSet::new();
        let mut arrow_fields = Vec::new();
        let mut attribute_keys = BTreeSet::new();

        for field in &fields {
            let field_name = field.name().as_ref();
            if field_name.is_empty() || field_name.contains(PATH_SEPARATOR) {
                tabula_bail!(Schema: "{}: invalid field name '{}'", name, field_name);
            }
            if !seen.insert(field_name) {
                tabula_bail!(Schema: "{}: duplicate field name {}", name, field_name);
            }

            match field.kind() {
                FieldKind::Column(data_type) => {
                    check_column_default(&name, field, data_type)?;
                    arrow_fields.push(Field::new(
                        field_name,
                        data_type.clone(),
                        field.is_nullable(),
                    ));
                }
                FieldKind::Attribute(attribute_type) => {
                    if let Some(default) = field.default_value() {
                        attribute_type
                            .to_bytes(default)
                            .map_err(|e| e.with_context(format!("{name}: default of {field_name}")))
                            .map_err(|e| schema_error(&e))?;
                        if let Some(validator) = field.validator() {
                            validator
                                .check(field_name, default)
                                .map_err(|e| schema_error(&e))?;
                        }
                    }
                    attribute_keys.insert(field_name.to_string());
                }
                FieldKind::SubTable(nested) => {
                    if field.default_value().is_some() || field.validator().is_some() {
                        tabula_bail!(
                            Schema: "{}: sub-table {} cannot have a default or a validator",
                            name,
                            field_name
                        );
                    }
                    arrow_fields.push(Field::new(
                        field_name,
                        DataType::Struct(nested.arrow_schema().fields().clone()),
                        field.is_nullable(),
                    ));
                    attribute_keys.extend(
                        nested
                            .attribute_keys()
                            .iter()
                            .map(|key| join_path(field_name, key)),
                    );
                }
            }
        }

        log::debug!(
            "compiled schema {}: {} physical columns, {} attribute keys",
            name,
            arrow_fields.len(),
            attribute_keys.len()
        );

        Ok(Self {
            name,
            fields,
            arrow: Arc::new(Schema::new(arrow_fields)),
            attribute_keys,
        })
    }

    /// The schema's display name.
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    /// The declared fields, in order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a field declared at this level.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name().as_ref() == name)
    }

    /// The physical arrow schema.
    pub fn arrow_schema(&self) -> &SchemaRef {
        &self.arrow
    }

    /// Fields stored as physical columns, in column order.
    pub fn physical_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.kind().is_physical())
    }

    /// Attribute fields declared at this level.
    pub fn attribute_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields
            .iter()
            .filter(|f| matches!(f.kind(), FieldKind::Attribute(_)))
    }

    /// Sub-table fields declared at this level.
    pub fn subtable_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields
            .iter()
            .filter(|f| matches!(f.kind(), FieldKind::SubTable(_)))
    }

    /// The number of physical columns.
    pub fn ncolumns(&self) -> usize {
        self.arrow.fields().len()
    }

    /// The physical column index of a column or sub-table field.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.physical_fields()
            .position(|f| f.name().as_ref() == name)
    }

    /// Every attribute's dotted path, at any depth.
    pub fn attribute_keys(&self) -> &BTreeSet<String> {
        &self.attribute_keys
    }

    /// Resolve a dotted attribute key to its declaration.
    pub fn resolve_attribute(&self, key: &str) -> Option<&FieldDescriptor> {
        self.resolve(&AttributePath::parse(key))
            .filter(|f| f.as_attribute().is_some())
    }

    /// Resolve a dotted path to the field it names, descending through sub-tables.
    pub fn resolve(&self, path: &AttributePath) -> Option<&FieldDescriptor> {
        let (head, tail) = path.split_first()?;
        let field = self.field(head)?;
        if tail.is_root() {
            return Some(field);
        }
        field.as_subtable()?.resolve(&tail)
    }
}

fn check_column_default(
    schema: &str,
    field: &FieldDescriptor,
    data_type: &DataType,
) -> TabulaResult<()> {
    let Some(default) = field.default_value() else {
        return Ok(());
    };
    if default.is_null() && !field.is_nullable() {
        tabula_bail!(
            Schema: "{}: non-nullable column {} cannot default to null",
            schema,
            field.name()
        );
    }
    default
        .to_arrow(data_type)
        .map_err(|e| schema_error(&e.with_context(format!("{schema}: default of {}", field.name()))))?;
    if let Some(validator) = field.validator() {
        validator
            .check(field.name(), default)
            .map_err(|e| schema_error(&e))?;
    }
    Ok(())
}

fn schema_error(err: &tabula_error::TabulaError) -> tabula_error::TabulaError {
    tabula_error::tabula_err!(Schema: "{}", err)
}

impl PartialEq for TableSchema {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Eq for TableSchema {}

impl Display for TableSchema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{{{}}}", self.name, self.fields.iter().join(", "))
    }
}
