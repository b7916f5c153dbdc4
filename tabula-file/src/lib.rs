//! Readers and writers moving [`Table`](tabula_array::Table)s in and out of files.
//!
//! Parquet and Arrow IPC files hold the nested columns and the full attribute metadata, so a
//! table read back equals the table written. CSV holds flattened columns only; attributes travel
//! as constant string columns and sub-table validity is lost.

#[cfg(feature = "csv")]
pub use csv::*;
#[cfg(feature = "ipc")]
pub use ipc::*;
#[cfg(feature = "parquet")]
pub use parquet::*;

#[cfg(feature = "csv")]
mod csv;
#[cfg(feature = "ipc")]
mod ipc;
#[cfg(feature = "parquet")]
mod parquet;

#[cfg(any(feature = "ipc", feature = "parquet"))]
mod batches {
    use arrow_array::RecordBatch;
    use arrow_schema::{ArrowError, SchemaRef};
    use arrow_select::concat::concat_batches;
    use tabula_error::TabulaResult;

    /// Collect a stream of batches into one batch carrying the file's schema and metadata.
    pub(crate) fn collect_batches<I>(schema: &SchemaRef, batches: I) -> TabulaResult<RecordBatch>
    where
        I: IntoIterator<Item = Result<RecordBatch, ArrowError>>,
    {
        let batches = batches.into_iter().collect::<Result<Vec<_>, _>>()?;
        log::trace!("read {} record batches", batches.len());
        Ok(concat_batches(schema, &batches)?)
    }
}
