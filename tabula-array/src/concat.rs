use tabula_error::{TabulaResult, tabula_bail};

use crate::{ChunkedArray, Table};

/// Concatenate tables of one schema into a single contiguous table.
///
/// The result carries the first table's metadata.
pub fn concatenate(tables: &[Table]) -> TabulaResult<Table> {
    concatenate_with(tables, true)
}

/// Concatenate tables of one schema.
///
/// Without `compact`, the result references the chunks of every input and no data is copied.
/// The result carries the first table's metadata; differing metadata in later inputs is dropped.
pub fn concatenate_with(tables: &[Table], compact: bool) -> TabulaResult<Table> {
    let Some((first, rest)) = tables.split_first() else {
        tabula_bail!("no tables to concatenate");
    };

    let mut columns: Vec<ChunkedArray> = first.columns().to_vec();
    for table in rest {
        if table.schema() != first.schema() {
            tabula_bail!(
                Schema: "cannot concatenate {} with {}",
                first.schema(),
                table.schema()
            );
        }
        if table.metadata() != first.metadata() {
            log::debug!(
                "concatenating {} with differing metadata; keeping the first table's",
                first.schema().name()
            );
        }
        for (column, other) in columns.iter_mut().zip(table.columns()) {
            column.extend_from(other)?;
        }
    }

    let table = Table::try_from_parts(first.schema().clone(), columns, first.metadata().clone())?;
    log::trace!(
        "concatenated {} tables into {} ({} rows)",
        tables.len(),
        table.schema().name(),
        table.len()
    );
    if compact { table.defragment() } else { Ok(table) }
}
