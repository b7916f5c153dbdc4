use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;

use arrow_ipc::reader::FileReader;
use arrow_ipc::writer::FileWriter;
use tabula_array::Table;
use tabula_dtype::{AttributeValues, TableSchemaRef};
use tabula_error::TabulaResult;

use crate::batches::collect_batches;

/// Write `table` as an Arrow IPC file, with its attribute metadata in the schema metadata.
pub fn write_ipc<W: Write>(table: &Table, writer: W) -> TabulaResult<()> {
    let batch = table.to_record_batch()?;
    let mut writer = FileWriter::try_new(writer, batch.schema_ref())?;
    writer.write(&batch)?;
    writer.finish()?;
    log::debug!("wrote {} to arrow ipc", table);
    Ok(())
}

pub fn write_ipc_file(table: &Table, path: impl AsRef<Path>) -> TabulaResult<()> {
    write_ipc(table, File::create(path)?)
}

/// Read a table of `schema` from an Arrow IPC file. `attributes` override those stored in the
/// file.
pub fn read_ipc<R: Read + Seek>(
    schema: TableSchemaRef,
    reader: R,
    attributes: AttributeValues,
) -> TabulaResult<Table> {
    let reader = FileReader::try_new(reader, None)?;
    let file_schema = reader.schema();
    let batch = collect_batches(&file_schema, reader)?;
    Table::from_record_batch(schema, &batch, attributes)
}

pub fn read_ipc_file(
    schema: TableSchemaRef,
    path: impl AsRef<Path>,
    attributes: AttributeValues,
) -> TabulaResult<Table> {
    read_ipc(schema, File::open(path)?, attributes)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tabula_scalar::ScalarValue;

    use super::*;
    use crate::test_tables::{outer, table};

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.arrow");
        let table = table();
        write_ipc_file(&table, &path).unwrap();
        let back = read_ipc_file(outer(), &path, AttributeValues::new()).unwrap();
        assert_eq!(back, table);
        assert_eq!(back.attribute("scale").unwrap(), ScalarValue::from(1.5f64));
    }

    #[test]
    fn fragmented_tables_are_written_whole() {
        let table = tabula_array::concatenate_with(&[table(), table()], false).unwrap();
        let mut buffer = Vec::new();
        write_ipc(&table, &mut buffer).unwrap();
        let back = read_ipc(outer(), Cursor::new(buffer), AttributeValues::new()).unwrap();
        assert_eq!(back.len(), 6);
        assert_eq!(back, table);
    }

    #[test]
    fn wrong_schema_is_rejected() {
        let mut buffer = Vec::new();
        write_ipc(&table(), &mut buffer).unwrap();
        assert!(
            read_ipc(
                crate::test_tables::inner(),
                Cursor::new(buffer),
                AttributeValues::new()
            )
            .is_err()
        );
    }
}
