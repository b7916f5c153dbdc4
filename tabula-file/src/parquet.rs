use std::fs::File;
use std::io::Write;
use std::path::Path;

use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::ChunkReader;
use tabula_array::Table;
use tabula_dtype::{AttributeValues, TableSchemaRef};
use tabula_error::TabulaResult;

use crate::batches::collect_batches;

/// Options for writing Parquet files.
#[derive(Debug, Clone)]
pub struct ParquetWriteOptions {
    compression: Compression,
    max_row_group_size: usize,
}

impl Default for ParquetWriteOptions {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            max_row_group_size: 1024 * 1024,
        }
    }
}

impl ParquetWriteOptions {
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_max_row_group_size(mut self, max_row_group_size: usize) -> Self {
        self.max_row_group_size = max_row_group_size;
        self
    }

    /// Write `table` with its attribute metadata stored in the file's key-value metadata.
    pub fn write<W: Write + Send>(&self, table: &Table, writer: W) -> TabulaResult<()> {
        let batch = table.to_record_batch()?;
        let properties = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.max_row_group_size)
            .build();
        let mut writer = ArrowWriter::try_new(writer, batch.schema(), Some(properties))?;
        writer.write(&batch)?;
        writer.close()?;
        log::debug!("wrote {} to parquet", table);
        Ok(())
    }

    pub fn write_file(&self, table: &Table, path: impl AsRef<Path>) -> TabulaResult<()> {
        self.write(table, File::create(path)?)
    }
}

/// Read a table of `schema` from Parquet data. `attributes` override those stored in the file.
pub fn read_parquet<R: ChunkReader + 'static>(
    schema: TableSchemaRef,
    reader: R,
    attributes: AttributeValues,
) -> TabulaResult<Table> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(reader)?;
    let file_schema = builder.schema().clone();
    let batch = collect_batches(&file_schema, builder.build()?)?;
    Table::from_record_batch(schema, &batch, attributes)
}

pub fn read_parquet_file(
    schema: TableSchemaRef,
    path: impl AsRef<Path>,
    attributes: AttributeValues,
) -> TabulaResult<Table> {
    read_parquet(schema, File::open(path)?, attributes)
}
