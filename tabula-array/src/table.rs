use std::fmt::{Display, Formatter};
use std::sync::Arc;

use arrow_array::{Array, ArrayRef, RecordBatch, RecordBatchOptions, StructArray};
use arrow_schema::{DataType, Field, Schema};
use tabula_dtype::{
    AttributePath, AttributeValues, FieldName, Metadata, TableSchemaRef, prefix_metadata,
    strip_metadata_prefix,
};
use tabula_error::{TabulaResult, tabula_bail, tabula_err};
use tabula_scalar::ScalarValue;

use crate::ChunkedArray;

/// An instance of a [`TableSchema`](tabula_dtype::TableSchema): one chunked array per physical
/// column, plus the attribute metadata of this instance and of every nested sub-table.
///
/// Column data is immutable and shared by reference between tables; cloning a table is cheap.
/// Attributes can be changed in place, which only rewrites metadata.
#[derive(Debug, Clone)]
pub struct Table {
    schema: TableSchemaRef,
    columns: Vec<ChunkedArray>,
    metadata: Metadata,
    len: usize,
}

impl Table {
    /// Build a table, checking its data and metadata against the schema and running every
    /// column validator.
    pub fn try_new(
        schema: TableSchemaRef,
        columns: Vec<ChunkedArray>,
        metadata: Metadata,
    ) -> TabulaResult<Self> {
        let metadata = schema.normalize_metadata(&metadata)?;
        let table = Self::try_from_parts(schema, columns, metadata)?;
        table.check_nullability()?;
        table.validate()?;
        Ok(table)
    }

    /// Build a table from parts already known to be valid, only checking the layout.
    pub(crate) fn try_from_parts(
        schema: TableSchemaRef,
        columns: Vec<ChunkedArray>,
        metadata: Metadata,
    ) -> TabulaResult<Self> {
        let fields = schema.arrow_schema().fields();
        if columns.len() != fields.len() {
            tabula_bail!(
                Validation: "{} expects {} columns, got {}",
                schema.name(),
                fields.len(),
                columns.len()
            );
        }
        for (field, column) in fields.iter().zip(&columns) {
            if column.data_type() != field.data_type() {
                tabula_bail!(
                    Schema: "column {} has type {}, expected {}",
                    field.name(),
                    column.data_type(),
                    field.data_type()
                );
            }
        }
        let len = columns.first().map(ChunkedArray::len).unwrap_or_default();
        if let Some((field, column)) = fields.iter().zip(&columns).find(|(_, c)| c.len() != len) {
            tabula_bail!(
                Validation: "column {} has {} rows but the table has {}",
                field.name(),
                column.len(),
                len
            );
        }
        Ok(Self {
            schema,
            columns,
            metadata,
            len,
        })
    }

    fn check_nullability(&self) -> TabulaResult<()> {
        for (field, column) in self.schema.arrow_schema().fields().iter().zip(&self.columns) {
            for chunk in column.chunks() {
                check_nulls(field, chunk.as_ref(), field.name())?;
            }
        }
        Ok(())
    }

    pub fn schema(&self) -> &TableSchemaRef {
        &self.schema
    }

    pub fn columns(&self) -> &[ChunkedArray] {
        &self.columns
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The physical column of a column or sub-table field.
    pub fn column(&self, name: &str) -> TabulaResult<&ChunkedArray> {
        let idx = self
            .schema
            .column_index(name)
            .ok_or_else(|| tabula_err!("{} has no column {}", self.schema.name(), name))?;
        self.columns
            .get(idx)
            .ok_or_else(|| tabula_err!(AssertionFailed: "column {} is missing", name))
    }

    /// The column at a dotted path through sub-tables, e.g. `"middle.inner.x"`.
    pub fn column_path(&self, path: &str) -> TabulaResult<ChunkedArray> {
        let path = AttributePath::parse(path);
        let Some((head, rest)) = path.split_first() else {
            tabula_bail!("empty column path");
        };
        let mut column = self.column(head)?.clone();
        for name in rest.parts() {
            column = column.field(name)?;
        }
        Ok(column)
    }

    /// The number of chunks of every physical column, in column order.
    pub fn chunk_counts(&self) -> Vec<(FieldName, usize)> {
        self.schema
            .physical_fields()
            .zip(&self.columns)
            .map(|(field, column)| (field.name().clone(), column.nchunks()))
            .collect()
    }

    /// Whether any column is held in more than one chunk.
    pub fn is_fragmented(&self) -> bool {
        self.columns.iter().any(|c| !c.is_contiguous())
    }

    /// Fails with a fragmentation error if any column is held in more than one chunk.
    pub fn ensure_contiguous(&self) -> TabulaResult<()> {
        if let Some((name, chunks)) = self.chunk_counts().into_iter().find(|(_, n)| *n > 1) {
            tabula_bail!(
                Fragmented: "column {} has {} chunks; defragment the table first",
                name,
                chunks
            );
        }
        Ok(())
    }

    /// The value of the attribute at dotted path `key`, or its default when unset.
    pub fn attribute(&self, key: &str) -> TabulaResult<ScalarValue> {
        self.schema.attribute_value(&self.metadata, key)
    }

    /// Set the attribute at dotted path `key`. Setting null unsets an optional attribute.
    pub fn set_attribute(&mut self, key: &str, value: impl Into<ScalarValue>) -> TabulaResult<()> {
        let overrides = AttributeValues::from([(key.to_string(), value.into())]);
        self.metadata = self.schema.merge_metadata(&self.metadata, &overrides)?;
        Ok(())
    }

    /// A copy of this table with the attribute at `key` set.
    pub fn with_attribute(mut self, key: &str, value: impl Into<ScalarValue>) -> TabulaResult<Self> {
        self.set_attribute(key, value)?;
        Ok(self)
    }

    /// Every attribute at any depth, with defaults applied. Unset nullable attributes are null.
    pub fn attributes(&self) -> TabulaResult<AttributeValues> {
        self.schema
            .attribute_keys()
            .iter()
            .map(|key| Ok((key.clone(), self.attribute(key)?)))
            .collect()
    }

    /// The sub-table stored in field `name`.
    ///
    /// The struct column's chunks are pushed down into the sub-table's columns without copying,
    /// and the metadata under the field's prefix becomes the sub-table's own.
    pub fn extract_subtable(&self, name: &str) -> TabulaResult<Table> {
        let nested = self
            .schema
            .field(name)
            .and_then(|f| f.as_subtable())
            .ok_or_else(|| tabula_err!("{} has no sub-table {}", self.schema.name(), name))?;
        let columns = self.column(name)?.fields()?;
        let metadata = strip_metadata_prefix(name, &self.metadata);
        Table::try_from_parts(nested.clone(), columns, metadata)
    }

    /// A copy of this table with the sub-table in field `name` replaced by `value`.
    pub fn with_subtable(&self, name: &str, value: &Table) -> TabulaResult<Table> {
        let nested = self
            .schema
            .field(name)
            .and_then(|f| f.as_subtable())
            .ok_or_else(|| tabula_err!("{} has no sub-table {}", self.schema.name(), name))?;
        if nested.as_ref() != value.schema.as_ref() {
            tabula_bail!(
                Schema: "sub-table {} expects schema {}, got {}",
                name,
                nested,
                value.schema
            );
        }
        if value.len != self.len {
            tabula_bail!(
                Validation: "sub-table {} has {} rows but the table has {}",
                name,
                value.len,
                self.len
            );
        }
        let idx = self
            .schema
            .column_index(name)
            .ok_or_else(|| tabula_err!(AssertionFailed: "sub-table {} has no column", name))?;

        let mut columns = self.columns.clone();
        let column: ArrayRef = Arc::new(value.compact_struct_array()?);
        if let Some(slot) = columns.get_mut(idx) {
            *slot = ChunkedArray::from(column);
        }

        let prefix = format!("{name}.");
        let mut metadata: Metadata = self
            .metadata
            .iter()
            .filter(|(k, _)| !k.starts_with(&prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        metadata.extend(prefix_metadata(name, &value.metadata));

        Table::try_from_parts(self.schema.clone(), columns, metadata)
    }

    /// The table as a single struct array. Fails if the table is fragmented.
    pub fn to_struct_array(&self) -> TabulaResult<StructArray> {
        self.ensure_contiguous()?;
        let arrays = self
            .columns
            .iter()
            .map(|c| {
                c.as_contiguous()
                    .ok_or_else(|| tabula_err!(AssertionFailed: "column is not contiguous"))
            })
            .collect::<TabulaResult<Vec<_>>>()?;
        self.struct_array(arrays)
    }

    /// The table as a single struct array, copying fragmented columns into one chunk.
    pub(crate) fn compact_struct_array(&self) -> TabulaResult<StructArray> {
        if self.is_fragmented() {
            log::debug!(
                "compacting fragmented {} ({} rows) into a struct array",
                self.schema.name(),
                self.len
            );
        }
        let arrays = self
            .columns
            .iter()
            .map(ChunkedArray::to_array)
            .collect::<TabulaResult<Vec<_>>>()?;
        self.struct_array(arrays)
    }

    fn struct_array(&self, arrays: Vec<ArrayRef>) -> TabulaResult<StructArray> {
        let fields = self.schema.arrow_schema().fields().clone();
        if fields.is_empty() {
            return Ok(StructArray::new_empty_fields(self.len, None));
        }
        Ok(StructArray::try_new(fields, arrays, None)?)
    }

    /// The table as a record batch whose schema metadata carries the attributes.
    ///
    /// Fragmented columns are copied into one chunk.
    pub fn to_record_batch(&self) -> TabulaResult<RecordBatch> {
        let arrays = self
            .columns
            .iter()
            .map(ChunkedArray::to_array)
            .collect::<TabulaResult<Vec<_>>>()?;
        let schema = Schema::new_with_metadata(
            self.schema.arrow_schema().fields().clone(),
            self.schema.to_arrow_metadata(&self.metadata),
        );
        Ok(RecordBatch::try_new_with_options(
            Arc::new(schema),
            arrays,
            &RecordBatchOptions::new().with_row_count(Some(self.len)),
        )?)
    }
}

fn check_nulls(field: &Field, array: &dyn Array, path: &str) -> TabulaResult<()> {
    if !field.is_nullable() && array.logical_null_count() > 0 {
        tabula_bail!(
            Validation: "non-nullable column {} contains {} nulls",
            path,
            array.logical_null_count()
        );
    }
    if let (DataType::Struct(children), Some(array)) = (
        field.data_type(),
        array.as_any().downcast_ref::<StructArray>(),
    ) {
        for (child, column) in children.iter().zip(array.columns()) {
            // Rows where the struct itself is null do not count against its children.
            let column = match array.nulls() {
                Some(nulls) if nulls.null_count() > 0 => {
                    let valid = arrow_array::BooleanArray::new(nulls.inner().clone(), None);
                    arrow_select::filter::filter(column.as_ref(), &valid)?
                }
                _ => column.clone(),
            };
            check_nulls(child, column.as_ref(), &format!("{path}.{}", child.name()))?;
        }
    }
    Ok(())
}

impl PartialEq for Table {
    /// Tables are equal when their schemas are structurally equal and they hold the same
    /// values and metadata, however their columns are chunked.
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len
            && self.schema == other.schema
            && self.metadata == other.metadata
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(lhs, rhs)| lhs.content_eq(rhs))
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(size={})", self.schema.name(), self.len)
    }
}
