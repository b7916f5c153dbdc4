//! Equality lookups over one column of a table.

use std::fmt::{Debug, Formatter};

use tabula_error::TabulaResult;
use tabula_scalar::ScalarValue;

use crate::Table;
use crate::aliases::hash_map::HashMap;

/// Maps each distinct value of a column to the rows holding it.
///
/// The index is a snapshot: it keeps its own handle on the table's columns, so the table it was
/// built from stays free to change its attributes. Null values are not indexed.
pub struct EqualityIndex {
    table: Table,
    column: String,
    rows: HashMap<ScalarValue, Vec<usize>>,
}

impl EqualityIndex {
    /// Index the column at dotted path `column`.
    pub fn build(table: &Table, column: &str) -> TabulaResult<Self> {
        let mut rows: HashMap<ScalarValue, Vec<usize>> = HashMap::new();
        let mut start = 0;
        for chunk in table.column_path(column)?.chunks() {
            for (offset, value) in ScalarValue::values_from_arrow(chunk.as_ref())?
                .into_iter()
                .enumerate()
            {
                if !value.is_null() {
                    rows.entry(value).or_default().push(start + offset);
                }
            }
            start += chunk.len();
        }
        log::debug!(
            "indexed {} distinct values of {}.{}",
            rows.len(),
            table.schema().name(),
            column
        );
        Ok(Self {
            table: table.clone(),
            column: column.to_string(),
            rows,
        })
    }

    /// The rows holding `value`, in table order, or `None` when no row holds it.
    pub fn lookup(&self, value: impl Into<ScalarValue>) -> TabulaResult<Option<Table>> {
        match self.rows.get(&value.into()) {
            Some(rows) => self.table.take(rows).map(Some),
            None => Ok(None),
        }
    }

    /// Row positions holding `value`.
    pub fn positions(&self, value: &ScalarValue) -> &[usize] {
        self.rows.get(value).map(Vec::as_slice).unwrap_or_default()
    }

    /// The number of distinct indexed values.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self) -> &str {
        &self.column
    }
}

impl Debug for EqualityIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EqualityIndex")
            .field("table", &self.table.to_string())
            .field("column", &self.column)
            .field("distinct", &self.rows.len())
            .finish()
    }
}

impl Table {
    /// Build an [`EqualityIndex`] over the column at dotted path `column`.
    pub fn index(&self, column: &str) -> TabulaResult<EqualityIndex> {
        EqualityIndex::build(self, column)
    }
}
