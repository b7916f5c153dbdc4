use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;
use std::sync::Arc;

use arrow_csv::reader::Format;
use arrow_csv::{ReaderBuilder, WriterBuilder};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use arrow_select::concat::concat_batches;
use tabula_array::{Table, flat_fields};
use tabula_dtype::{AttributeValues, TableSchemaRef};
use tabula_error::TabulaResult;

/// Options for writing CSV files.
#[derive(Debug, Clone)]
pub struct CsvWriteOptions {
    attribute_columns: bool,
    delimiter: u8,
}

impl Default for CsvWriteOptions {
    fn default() -> Self {
        Self {
            attribute_columns: true,
            delimiter: b',',
        }
    }
}

impl CsvWriteOptions {
    /// Whether to write every attribute as a column repeating its string form.
    pub fn with_attribute_columns(mut self, attribute_columns: bool) -> Self {
        self.attribute_columns = attribute_columns;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Write `table` flattened, one column per leaf named by dotted path.
    pub fn write<W: Write>(&self, table: &Table, writer: W) -> TabulaResult<()> {
        for field in table.schema().subtable_fields() {
            let nulls: usize = table
                .column(field.name())?
                .chunks()
                .iter()
                .map(|c| c.null_count())
                .sum();
            if nulls > 0 {
                log::warn!(
                    "{} rows of sub-table {} are null; CSV keeps only their leaf values",
                    nulls,
                    field.name()
                );
            }
        }
        let batch = table.to_flat_record_batch(self.attribute_columns)?;
        let mut writer = WriterBuilder::new()
            .with_header(true)
            .with_delimiter(self.delimiter)
            .build(writer);
        writer.write(&batch)?;
        log::debug!("wrote {} to csv", table);
        Ok(())
    }

    pub fn write_file(&self, table: &Table, path: impl AsRef<Path>) -> TabulaResult<()> {
        self.write(table, File::create(path)?)
    }
}

/// Options for reading CSV files.
#[derive(Debug, Clone)]
pub struct CsvReadOptions {
    delimiter: u8,
    batch_size: usize,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            batch_size: 8192,
        }
    }
}

impl CsvReadOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Read a table of `schema` from CSV with a header row.
    ///
    /// Leaf columns are parsed as the schema's types. Attribute columns are read from the first
    /// row; `attributes` override them. Columns the schema does not know are ignored.
    pub fn read<R: Read + Seek>(
        &self,
        schema: TableSchemaRef,
        mut reader: R,
        attributes: AttributeValues,
    ) -> TabulaResult<Table> {
        let format = Format::default()
            .with_header(true)
            .with_delimiter(self.delimiter);
        let (header, _) = format.infer_schema(&mut reader, Some(0))?;
        reader.rewind()?;

        let csv_schema = csv_schema(&schema, &header);
        let batches = ReaderBuilder::new(csv_schema.clone())
            .with_format(format)
            .with_batch_size(self.batch_size)
            .build(reader)?
            .collect::<Result<Vec<_>, _>>()?;
        log::trace!("read {} csv batches", batches.len());
        let batch = concat_batches(&csv_schema, &batches)?;
        Table::from_flat_record_batch(schema, &batch, attributes)
    }

    pub fn read_file(
        &self,
        schema: TableSchemaRef,
        path: impl AsRef<Path>,
        attributes: AttributeValues,
    ) -> TabulaResult<Table> {
        self.read(schema, File::open(path)?, attributes)
    }
}

/// The header's columns, typed as the schema's leaves. Everything else is read as text.
fn csv_schema(schema: &TableSchemaRef, header: &Schema) -> SchemaRef {
    let leaves = flat_fields(schema);
    let fields: Vec<Field> = header
        .fields()
        .iter()
        .map(|column| {
            let data_type = leaves
                .iter()
                .find(|leaf| leaf.name() == column.name())
                .map_or(DataType::Utf8, |leaf| leaf.data_type().clone());
            Field::new(column.name(), data_type, true)
        })
        .collect();
    Arc::new(Schema::new(fields))
}
