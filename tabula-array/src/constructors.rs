//! Ways of building a table from data held elsewhere.

use arrow_array::{ArrayRef, RecordBatch};
use tabula_dtype::{AttributeValues, FieldKind, Metadata, TableSchemaRef};
use tabula_error::{TabulaResult, tabula_bail};
use tabula_scalar::ScalarValue;

use crate::{ChunkedArray, Table};

impl Table {
    /// A table with no rows.
    pub fn empty(schema: TableSchemaRef, attributes: &AttributeValues) -> TabulaResult<Table> {
        let metadata = schema.merge_metadata(&Metadata::new(), attributes)?;
        let columns = schema
            .arrow_schema()
            .fields()
            .iter()
            .map(|f| ChunkedArray::empty(f.data_type().clone()))
            .collect();
        Table::try_new(schema, columns, metadata)
    }

    /// A table from one array per physical column, in column order.
    pub fn from_arrays(
        schema: TableSchemaRef,
        arrays: Vec<ArrayRef>,
        attributes: &AttributeValues,
    ) -> TabulaResult<Table> {
        if arrays.len() != schema.ncolumns() {
            tabula_bail!(
                Validation: "{} expects {} columns, got {}",
                schema.name(),
                schema.ncolumns(),
                arrays.len()
            );
        }
        let metadata = schema.merge_metadata(&Metadata::new(), attributes)?;
        let columns = arrays.into_iter().map(ChunkedArray::from).collect();
        Table::try_new(schema, columns, metadata)
    }

    /// A table from named arrays. Omitted columns are filled as [`TableBuilder`](crate::TableBuilder)
    /// does.
    pub fn from_columns<I, S>(
        schema: TableSchemaRef,
        columns: I,
        attributes: AttributeValues,
    ) -> TabulaResult<Table>
    where
        I: IntoIterator<Item = (S, ArrayRef)>,
        S: Into<String>,
    {
        columns
            .into_iter()
            .fold(Table::builder(schema), |builder, (name, array)| {
                builder.with_column(name, array)
            })
            .with_attributes(attributes)
            .build()
    }

    /// A table from one list of values per physical column, in column order.
    ///
    /// Sub-table columns cannot be given as lists; build those with [`Table::builder`].
    pub fn from_lists(
        schema: TableSchemaRef,
        lists: Vec<Vec<ScalarValue>>,
        attributes: AttributeValues,
    ) -> TabulaResult<Table> {
        if lists.len() != schema.ncolumns() {
            tabula_bail!(
                Validation: "{} expects {} columns, got {}",
                schema.name(),
                schema.ncolumns(),
                lists.len()
            );
        }
        let mut builder = Table::builder(schema.clone());
        for (field, values) in schema.physical_fields().zip(lists) {
            if matches!(field.kind(), FieldKind::SubTable(_)) {
                tabula_bail!(NotImplemented: "from_lists with sub-table columns", schema.name());
            }
            builder = builder.with_values(field.name().as_ref(), values);
        }
        builder.with_attributes(attributes).build()
    }

    /// A table from a record batch holding this schema's columns.
    ///
    /// Attributes stored in the batch's schema metadata are carried over; `attributes` override
    /// them. Columns of the batch that the schema does not declare are ignored.
    pub fn from_record_batch(
        schema: TableSchemaRef,
        batch: &RecordBatch,
        attributes: AttributeValues,
    ) -> TabulaResult<Table> {
        let metadata = schema.from_arrow_metadata(batch.schema_ref().metadata())?;
        let mut builder = Table::builder(schema.clone()).with_metadata(metadata);
        for field in schema.physical_fields() {
            if let Some(column) = batch.column_by_name(field.name()) {
                builder = builder.with_column(field.name().as_ref(), column.clone());
            }
        }
        let table = builder.with_attributes(attributes).build()?;
        if table.len() != batch.num_rows() {
            tabula_bail!(
                Validation: "{} read {} rows from a batch of {}",
                schema.name(),
                table.len(),
                batch.num_rows()
            );
        }
        Ok(table)
    }
}
