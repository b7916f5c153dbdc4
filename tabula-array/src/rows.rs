use arrow_array::RecordBatch;
use arrow_json::ReaderBuilder;
use serde::Serialize;
use tabula_dtype::{AttributeValues, TableSchemaRef};
use tabula_error::TabulaResult;

use crate::Table;

impl Table {
    /// A table from serializable rows, one struct or map per row keyed by column name.
    ///
    /// Nested sub-tables are given as nested structs. Missing keys decode as null.
    pub fn from_rows<S: Serialize>(
        schema: TableSchemaRef,
        rows: &[S],
        attributes: AttributeValues,
    ) -> TabulaResult<Table> {
        let arrow_schema = schema.arrow_schema().clone();
        let mut decoder = ReaderBuilder::new(arrow_schema.clone())
            .with_batch_size(rows.len().max(1))
            .build_decoder()?;
        decoder.serialize(rows)?;
        let batch = decoder
            .flush()?
            .unwrap_or_else(|| RecordBatch::new_empty(arrow_schema));
        log::trace!("decoded {} rows of {}", batch.num_rows(), schema.name());
        Table::from_record_batch(schema, &batch, attributes)
    }
}
