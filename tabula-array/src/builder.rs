use std::sync::Arc;

use arrow_array::{ArrayRef, new_null_array};
use tabula_dtype::{AttributeValues, FieldKind, Metadata, TableSchemaRef, prefix_metadata};
use tabula_error::{TabulaResult, tabula_bail};
use tabula_scalar::ScalarValue;

use crate::aliases::hash_map::HashMap;
use crate::{ChunkedArray, Table};

enum ColumnSource {
    Array(ArrayRef),
    Values(Vec<ScalarValue>),
    SubTable(Table),
}

/// Assembles a [`Table`] from named columns and attribute values.
///
/// Omitted columns are filled from the field default, or with nulls when the field is nullable.
/// Sub-tables contribute their attributes to the new table under the field's prefix.
pub struct TableBuilder {
    schema: TableSchemaRef,
    columns: HashMap<String, ColumnSource>,
    metadata: Metadata,
    attributes: AttributeValues,
}

impl TableBuilder {
    pub fn new(schema: TableSchemaRef) -> Self {
        Self {
            schema,
            columns: HashMap::new(),
            metadata: Metadata::new(),
            attributes: AttributeValues::new(),
        }
    }

    /// Provide column `name` as an arrow array of the field's type.
    pub fn with_column(mut self, name: impl Into<String>, array: ArrayRef) -> Self {
        self.columns.insert(name.into(), ColumnSource::Array(array));
        self
    }

    /// Provide column `name` as scalar values, converted to the field's type.
    pub fn with_values<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ScalarValue>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.columns.insert(name.into(), ColumnSource::Values(values));
        self
    }

    /// Provide sub-table `name`. Its attributes are carried over under the field's prefix.
    pub fn with_subtable(mut self, name: impl Into<String>, table: Table) -> Self {
        self.columns.insert(name.into(), ColumnSource::SubTable(table));
        self
    }

    /// Set the attribute at dotted path `key`.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Set several attributes at once.
    pub fn with_attributes(mut self, values: AttributeValues) -> Self {
        self.attributes.extend(values);
        self
    }

    /// Start from already encoded metadata. Explicit attributes take precedence over it.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata.extend(metadata);
        self
    }

    pub fn build(self) -> TabulaResult<Table> {
        let Self {
            schema,
            mut columns,
            mut metadata,
            attributes,
        } = self;

        let mut provided: Vec<Option<ArrayRef>> = Vec::with_capacity(schema.ncolumns());
        let mut size: Option<(String, usize)> = None;
        for field in schema.physical_fields() {
            let name = field.name().as_ref();
            let Some(source) = columns.remove(name) else {
                provided.push(None);
                continue;
            };
            let array = match (source, field.kind()) {
                (ColumnSource::SubTable(table), FieldKind::SubTable(nested)) => {
                    if nested.as_ref() != table.schema().as_ref() {
                        tabula_bail!(
                            Schema: "sub-table {} expects schema {}, got {}",
                            name,
                            nested,
                            table.schema()
                        );
                    }
                    metadata.extend(prefix_metadata(name, table.metadata()));
                    Arc::new(table.compact_struct_array()?) as ArrayRef
                }
                (ColumnSource::SubTable(_), _) => {
                    tabula_bail!("{}.{} is not a sub-table", schema.name(), name)
                }
                (ColumnSource::Array(array), _) => array,
                (ColumnSource::Values(values), _) => {
                    let data_type = schema.arrow_schema().field_with_name(name)?.data_type();
                    ScalarValue::iter_to_array(values, data_type)
                        .map_err(|e| e.with_context(format!("column {name}")))?
                }
            };
            let (first, expected) = size.get_or_insert_with(|| (name.to_string(), array.len()));
            if *expected != array.len() {
                tabula_bail!(
                    Validation: "column {} has {} rows but column {} has {}",
                    name,
                    array.len(),
                    first,
                    expected
                );
            }
            provided.push(Some(array));
        }

        if let Some(name) = columns.keys().next() {
            tabula_bail!("{} has no column {}", schema.name(), name);
        }
        let len = match size {
            Some((_, len)) => len,
            None if schema.ncolumns() == 0 => 0,
            None => tabula_bail!("{} needs at least one column to size the table", schema.name()),
        };

        let chunked = schema
            .physical_fields()
            .zip(schema.arrow_schema().fields().iter())
            .zip(provided)
            .map(|((field, arrow_field), array)| {
                let array = match array {
                    Some(array) => array,
                    None => match field.default_value() {
                        Some(default) => ScalarValue::iter_to_array(
                            std::iter::repeat_n(default.clone(), len),
                            arrow_field.data_type(),
                        )?,
                        None if field.is_nullable() => new_null_array(arrow_field.data_type(), len),
                        None => tabula_bail!(
                            Validation: "missing non-nullable column {}.{}",
                            schema.name(),
                            field.name()
                        ),
                    },
                };
                Ok(ChunkedArray::from(array))
            })
            .collect::<TabulaResult<Vec<_>>>()?;

        let metadata = schema.merge_metadata(&metadata, &attributes)?;
        Table::try_new(schema, chunked, metadata)
    }
}

impl Table {
    /// Start building a table of `schema`.
    pub fn builder(schema: TableSchemaRef) -> TableBuilder {
        TableBuilder::new(schema)
    }
}

#[cfg(test)]
mod tests {
    use arrow_array::Int64Array;
    use arrow_array::cast::AsArray;
    use arrow_array::types::Int64Type;
    use arrow_schema::DataType;
    use tabula_dtype::{AttributeType, FieldDescriptor, TableSchema};

    use super::*;

    fn pair() -> TableSchemaRef {
        Arc::new(
            TableSchema::compile(
                "Pair",
                [
                    FieldDescriptor::column("x", DataType::Int64),
                    FieldDescriptor::column("y", DataType::Int64).nullable(),
                    FieldDescriptor::column("z", DataType::Int32).with_default(7i32),
                    FieldDescriptor::attribute("name", AttributeType::Utf8),
                ],
            )
            .unwrap(),
        )
    }

    fn wrapper() -> TableSchemaRef {
        Arc::new(
            TableSchema::compile(
                "Wrapper",
                [
                    FieldDescriptor::subtable("pairs", pair()),
                    FieldDescriptor::column("id", DataType::Utf8),
                    FieldDescriptor::attribute("version", AttributeType::INT64).with_default(1i64),
                ],
            )
            .unwrap(),
        )
    }

    fn pairs() -> Table {
        Table::builder(pair())
            .with_column("x", Arc::new(Int64Array::from(vec![1, 2, 3])))
            .with_attribute("name", "p")
            .build()
            .unwrap()
    }

    #[test]
    fn omitted_columns_are_filled() {
        let table = pairs();
        assert_eq!(table.len(), 3);
        assert_eq!(table.column("y").unwrap().compact().unwrap().null_count(), 3);
        let z = table.column("z").unwrap().compact().unwrap();
        assert_eq!(
            z.as_primitive::<arrow_array::types::Int32Type>().values().to_vec(),
            vec![7, 7, 7]
        );
    }

    #[test]
    fn missing_required_column() {
        let err = Table::builder(pair())
            .with_values("y", [1i64])
            .with_attribute("name", "p")
            .build()
            .unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn missing_required_attribute() {
        let err = Table::builder(pair())
            .with_values("x", [1i64])
            .build()
            .unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn mismatched_lengths() {
        let err = Table::builder(pair())
            .with_values("x", [1i64, 2])
            .with_values("y", [1i64])
            .with_attribute("name", "p")
            .build()
            .unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn unknown_column() {
        assert!(
            Table::builder(pair())
                .with_values("x", [1i64])
                .with_values("w", [1i64])
                .with_attribute("name", "p")
                .build()
                .is_err()
        );
    }

    #[test]
    fn subtable_attributes_are_prefixed() {
        let table = Table::builder(wrapper())
            .with_subtable("pairs", pairs())
            .with_values("id", ["a", "b", "c"])
            .build()
            .unwrap();
        assert_eq!(table.attribute("pairs.name").unwrap(), ScalarValue::from("p"));
        assert_eq!(table.attribute("version").unwrap(), ScalarValue::from(1i64));

        let inner = table.extract_subtable("pairs").unwrap();
        assert_eq!(inner, pairs());
        assert_eq!(
            table
                .column_path("pairs.x")
                .unwrap()
                .compact()
                .unwrap()
                .as_primitive::<Int64Type>()
                .values()
                .to_vec(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn explicit_attributes_override_subtable_metadata() {
        let table = Table::builder(wrapper())
            .with_subtable("pairs", pairs())
            .with_values("id", ["a", "b", "c"])
            .with_attribute("pairs.name", "q")
            .build()
            .unwrap();
        assert_eq!(table.attribute("pairs.name").unwrap(), ScalarValue::from("q"));
    }

    #[test]
    fn fragmented_subtables_are_compacted() {
        let fragmented = crate::concatenate_with(&[pairs(), pairs()], false).unwrap();
        assert!(fragmented.is_fragmented());
        let table = Table::builder(wrapper())
            .with_subtable("pairs", fragmented)
            .with_values("id", ["a", "b", "c", "d", "e", "f"])
            .build()
            .unwrap();
        assert!(!table.is_fragmented());
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn narrow_float_attributes_must_fit() {
        let schema = Arc::new(
            TableSchema::compile(
                "Ratios",
                [
                    FieldDescriptor::column("x", DataType::Int64),
                    FieldDescriptor::attribute("r", AttributeType::float(4).unwrap()),
                    FieldDescriptor::attribute("h", AttributeType::float(2).unwrap()).nullable(),
                ],
            )
            .unwrap(),
        );
        let build = |r: f64, h: f64| {
            Table::builder(schema.clone())
                .with_values("x", [1i64])
                .with_attribute("r", r)
                .with_attribute("h", h)
                .build()
        };
        assert!(build(1e300, 1.0).unwrap_err().is_validation_error());
        assert!(build(1.0, 1e6).unwrap_err().is_validation_error());
        let table = build(0.5, 2.0).unwrap();
        assert_eq!(table.attribute("h").unwrap(), ScalarValue::from(2.0f64));
    }
}
