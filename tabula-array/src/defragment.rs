use tabula_error::TabulaResult;

use crate::{ChunkedArray, Table};

impl Table {
    /// A copy of this table with every column held in exactly one chunk.
    ///
    /// Every column is copied, including columns that are already contiguous, so the result
    /// never keeps alive buffers it was sliced from. Struct columns are copied as a whole, so
    /// nested sub-tables are contiguous too.
    pub fn defragment(&self) -> TabulaResult<Table> {
        log::debug!(
            "defragmenting {} ({} rows, {} chunks)",
            self.schema().name(),
            self.len(),
            self.columns().iter().map(|c| c.nchunks()).max().unwrap_or_default()
        );
        let columns = self
            .columns()
            .iter()
            .map(ChunkedArray::compacted)
            .collect::<TabulaResult<Vec<_>>>()?;
        Table::try_from_parts(self.schema().clone(), columns, self.metadata().clone())
    }
}
