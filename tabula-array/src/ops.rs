//! Row-level operations on tables. None of them revalidate data already held by a table.

use std::fmt::{Display, Formatter};

use arrow_array::cast::AsArray;
use arrow_array::{Array, ArrayRef, BooleanArray, UInt64Array};
use arrow_ord::sort::{SortColumn, SortOptions, lexsort_to_indices};
use arrow_select::concat::concat;
use itertools::Itertools;
use tabula_dtype::{TableSchema, join_path};
use tabula_error::{TabulaResult, tabula_bail};
use tabula_expr::Operator;
use tabula_scalar::ScalarValue;

use crate::{ChunkedArray, Table};

/// The direction of a sort key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl Display for SortOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Ascending => write!(f, "ascending"),
            SortOrder::Descending => write!(f, "descending"),
        }
    }
}

impl Table {
    /// The rows `offset..offset + len`, sharing the underlying buffers.
    pub fn slice(&self, offset: usize, len: usize) -> TabulaResult<Table> {
        let columns = self
            .columns()
            .iter()
            .map(|c| c.slice(offset, len))
            .collect::<TabulaResult<Vec<_>>>()?;
        Table::try_from_parts(self.schema().clone(), columns, self.metadata().clone())
    }

    /// The single row at `index`, as a one-row table.
    pub fn row(&self, index: usize) -> TabulaResult<Table> {
        if index >= self.len() {
            tabula_bail!(OutOfBounds: index, 0, self.len());
        }
        self.slice(index, 1)
    }

    /// Iterate over the rows of the table as one-row tables.
    pub fn rows(&self) -> impl Iterator<Item = TabulaResult<Table>> + '_ {
        (0..self.len()).map(|idx| self.slice(idx, 1))
    }

    /// Gather the rows at `indices`, in order. Rows may repeat.
    pub fn take(&self, indices: &[usize]) -> TabulaResult<Table> {
        if let Some(idx) = indices.iter().find(|&&idx| idx >= self.len()) {
            tabula_bail!(OutOfBounds: *idx, 0, self.len());
        }
        let indices = UInt64Array::from_iter_values(indices.iter().map(|&idx| idx as u64));
        self.take_array(&indices)
    }

    fn take_array(&self, indices: &dyn Array) -> TabulaResult<Table> {
        let columns = self
            .columns()
            .iter()
            .map(|c| c.take(indices))
            .collect::<TabulaResult<Vec<_>>>()?;
        Table::try_from_parts(self.schema().clone(), columns, self.metadata().clone())
    }

    /// The rows whose value in the column at dotted path `column` equals `value`.
    ///
    /// Rows holding null never match.
    pub fn select(&self, column: &str, value: impl Into<ScalarValue>) -> TabulaResult<Table> {
        let value = value.into();
        let mask = equality_mask(&self.column_path(column)?, &value)?;
        log::trace!(
            "select {} == {} kept {} of {} rows",
            column,
            value,
            mask.true_count(),
            self.len()
        );
        let columns = self
            .columns()
            .iter()
            .map(|c| c.filter(&mask))
            .collect::<TabulaResult<Vec<_>>>()?;
        Table::try_from_parts(self.schema().clone(), columns, self.metadata().clone())
    }

    /// Sort the rows by one or more columns, named by dotted path. Nulls sort first.
    pub fn sort_by<'a>(
        &self,
        keys: impl IntoIterator<Item = (&'a str, SortOrder)>,
    ) -> TabulaResult<Table> {
        let sort_columns = keys
            .into_iter()
            .map(|(name, order)| {
                Ok(SortColumn {
                    values: self.column_path(name)?.to_array()?,
                    options: Some(SortOptions {
                        descending: order == SortOrder::Descending,
                        nulls_first: true,
                    }),
                })
            })
            .collect::<TabulaResult<Vec<_>>>()?;
        if sort_columns.is_empty() {
            tabula_bail!("sort_by needs at least one key");
        }
        let indices = lexsort_to_indices(&sort_columns, None)?;
        self.take_array(&indices)
    }

    /// Run every column validator, at every depth, over the table's data.
    ///
    /// The error names the first failing column and the failing row positions.
    pub fn validate(&self) -> TabulaResult<()> {
        validate_columns(self.schema(), self.columns(), "")
    }

    /// Whether every column validator passes.
    pub fn is_valid(&self) -> bool {
        match self.validate() {
            Ok(()) => true,
            Err(err) => {
                log::debug!("{} is invalid: {}", self, err);
                false
            }
        }
    }
}

fn equality_mask(column: &ChunkedArray, value: &ScalarValue) -> TabulaResult<BooleanArray> {
    let masks = column
        .chunks()
        .iter()
        .map(|chunk| Operator::Eq.compare(chunk.as_ref(), value))
        .collect::<TabulaResult<Vec<_>>>()?;
    // Filtering treats null mask slots as false, so null rows never match.
    match masks.as_slice() {
        [] => Ok(BooleanArray::from(Vec::<bool>::new())),
        [mask] => Ok(mask.clone()),
        masks => {
            let refs: Vec<&dyn Array> = masks.iter().map(|m| m as &dyn Array).collect();
            let combined: ArrayRef = concat(&refs)?;
            Ok(combined.as_boolean().clone())
        }
    }
}

fn validate_columns(
    schema: &TableSchema,
    columns: &[ChunkedArray],
    prefix: &str,
) -> TabulaResult<()> {
    for (field, column) in schema.physical_fields().zip(columns) {
        let path = join_path(prefix, field.name());
        if let Some(validator) = field.validator() {
            for conjunct in validator.conjuncts() {
                let failures = column.failures(conjunct)?;
                if !failures.is_empty() {
                    tabula_bail!(
                        Validation: "column {} failed validator {} at rows [{}]",
                        path,
                        conjunct,
                        failures.iter().join(", ")
                    );
                }
            }
        }
        if let Some(nested) = field.as_subtable() {
            validate_columns(nested, &column.fields()?, &path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow_array::types::Int64Type;
    use arrow_schema::DataType;
    use rstest::rstest;
    use tabula_dtype::{FieldDescriptor, TableSchemaRef};

    use super::*;

    fn schema() -> TableSchemaRef {
        Arc::new(
            TableSchema::compile(
                "Item",
                [
                    FieldDescriptor::column("id", DataType::Utf8),
                    FieldDescriptor::column("x", DataType::Int64)
                        .nullable()
                        .with_validator(tabula_expr::ge(0i64)),
                ],
            )
            .unwrap(),
        )
    }

    fn items() -> Table {
        Table::builder(schema())
            .with_values("id", ["a", "b", "c", "b"])
            .with_values("x", [Some(3i64), None, Some(1), Some(2)])
            .build()
            .unwrap()
    }

    fn xs(table: &Table) -> Vec<Option<i64>> {
        table
            .column("x")
            .unwrap()
            .compact()
            .unwrap()
            .as_primitive::<Int64Type>()
            .iter()
            .collect()
    }

    #[test]
    fn slice_and_row() {
        let table = items();
        assert_eq!(xs(&table.slice(1, 2).unwrap()), vec![None, Some(1)]);
        assert_eq!(xs(&table.row(3).unwrap()), vec![Some(2)]);
        assert!(table.row(4).is_err());
        assert_eq!(table.rows().count(), 4);
    }

    #[test]
    fn take_repeats_rows() {
        let table = items();
        assert_eq!(
            xs(&table.take(&[2, 2, 0]).unwrap()),
            vec![Some(1), Some(1), Some(3)]
        );
        assert!(table.take(&[4]).unwrap_err().is_out_of_bounds());
    }

    #[rstest]
    #[case("b", vec![None, Some(2)])]
    #[case("a", vec![Some(3)])]
    #[case("z", vec![])]
    fn select_matches(#[case] id: &str, #[case] expected: Vec<Option<i64>>) {
        assert_eq!(xs(&items().select("id", id).unwrap()), expected);
    }

    #[test]
    fn select_skips_nulls() {
        assert_eq!(xs(&items().select("x", 2i64).unwrap()), vec![Some(2)]);
    }

    #[rstest]
    #[case(SortOrder::Ascending, vec![None, Some(1), Some(2), Some(3)])]
    #[case(SortOrder::Descending, vec![None, Some(3), Some(2), Some(1)])]
    fn sort_by_column(#[case] order: SortOrder, #[case] expected: Vec<Option<i64>>) {
        assert_eq!(xs(&items().sort_by([("x", order)]).unwrap()), expected);
    }

    #[test]
    fn validate_reports_rows() {
        let table = items();
        assert!(table.is_valid());
        let err = Table::builder(schema())
            .with_values("id", ["a", "b", "c"])
            .with_values("x", [1i64, -1, -2])
            .build()
            .unwrap_err();
        assert!(err.is_validation_error());
        assert!(err.to_string().contains("[1, 2]"), "{err}");
    }

    #[test]
    fn validate_names_failing_conjunct() {
        let schema = Arc::new(
            TableSchema::compile(
                "Bounded",
                [
                    FieldDescriptor::column("x", DataType::Int64).with_validator(
                        tabula_expr::and_([tabula_expr::ge(0i64), tabula_expr::lt(5i64)]),
                    ),
                ],
            )
            .unwrap(),
        );
        let err = Table::builder(schema)
            .with_values("x", [1i64, 7, 2])
            .build()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("column x failed validator < 5 at rows [1]"), "{msg}");
    }
}
