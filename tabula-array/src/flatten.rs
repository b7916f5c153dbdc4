//! Flat record batches: sub-tables expanded into dotted top-level columns, for formats that
//! cannot hold nested data. Attributes can ride along as constant string columns.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow_arith::boolean::is_null;
use arrow_array::cast::AsArray;
use arrow_array::{
    Array, ArrayRef, RecordBatch, RecordBatchOptions, StringArray, StructArray, new_null_array,
};
use arrow_cast::cast;
use arrow_schema::{DataType, Field, Schema};
use arrow_select::nullif::nullif;
use tabula_dtype::{AttributeValues, TableSchema, TableSchemaRef, join_path};
use tabula_error::{TabulaResult, tabula_bail};

use crate::Table;

impl Table {
    /// The table as a record batch without nested columns.
    ///
    /// Each sub-table column is replaced by its leaf columns, named by dotted path. Rows where a
    /// sub-table is null become nulls in every leaf. With `attribute_columns`, every set
    /// attribute is appended as a column repeating its string form on each row.
    pub fn to_flat_record_batch(&self, attribute_columns: bool) -> TabulaResult<RecordBatch> {
        let mut fields = Vec::new();
        let mut arrays = Vec::new();
        for (field, column) in self.schema().arrow_schema().fields().iter().zip(self.columns()) {
            let array = column.to_array()?;
            flatten_into(
                field.name(),
                field.is_nullable(),
                array,
                &mut fields,
                &mut arrays,
            )?;
        }
        if attribute_columns {
            for (key, value) in self.schema().string_attributes(self.metadata())? {
                fields.push(Field::new(key, DataType::Utf8, false));
                arrays.push(Arc::new(StringArray::from_iter_values(std::iter::repeat_n(
                    value,
                    self.len(),
                ))));
            }
        }
        Ok(RecordBatch::try_new_with_options(
            Arc::new(Schema::new(fields)),
            arrays,
            &RecordBatchOptions::new().with_row_count(Some(self.len())),
        )?)
    }

    /// A table from a record batch written by [`Table::to_flat_record_batch`] or any batch with
    /// the same dotted column names.
    ///
    /// Columns are cast to the schema's types. Attribute columns are read from the first row;
    /// `attributes` override them. Sub-table validity cannot be recovered: a sub-table that was
    /// null reads back as a struct of null leaves.
    pub fn from_flat_record_batch(
        schema: TableSchemaRef,
        batch: &RecordBatch,
        attributes: AttributeValues,
    ) -> TabulaResult<Table> {
        let mut values = schema.values_from_strings(&attribute_strings(&schema, batch)?)?;
        values.extend(attributes);

        let mut builder = Table::builder(schema.clone()).with_attributes(values);
        for field in schema.arrow_schema().fields() {
            if let Some(array) = unflatten(field, field.name(), batch)? {
                builder = builder.with_column(field.name().as_str(), array);
            }
        }
        builder.build()
    }
}

/// The leaf fields of `schema`'s physical columns, named by dotted path.
///
/// A leaf is nullable when it or any enclosing sub-table is nullable.
pub fn flat_fields(schema: &TableSchema) -> Vec<Field> {
    fn leaves(path: &str, field: &Field, nullable: bool, out: &mut Vec<Field>) {
        match field.data_type() {
            DataType::Struct(children) => {
                for child in children {
                    leaves(
                        &join_path(path, child.name()),
                        child,
                        nullable || child.is_nullable(),
                        out,
                    );
                }
            }
            data_type => out.push(Field::new(path, data_type.clone(), nullable)),
        }
    }

    let mut out = Vec::new();
    for field in schema.arrow_schema().fields() {
        leaves(field.name(), field, field.is_nullable(), &mut out);
    }
    out
}

fn flatten_into(
    path: &str,
    nullable: bool,
    array: ArrayRef,
    fields: &mut Vec<Field>,
    arrays: &mut Vec<ArrayRef>,
) -> TabulaResult<()> {
    let Some(struct_array) = array.as_struct_opt() else {
        fields.push(Field::new(path, array.data_type().clone(), nullable));
        arrays.push(array);
        return Ok(());
    };
    let parent_nulls = (struct_array.null_count() > 0)
        .then(|| is_null(struct_array))
        .transpose()?;
    for (child_field, child) in struct_array.fields().iter().zip(struct_array.columns()) {
        let child = match &parent_nulls {
            Some(mask) => nullif(child.as_ref(), mask)?,
            None => child.clone(),
        };
        flatten_into(
            &join_path(path, child_field.name()),
            nullable || child_field.is_nullable(),
            child,
            fields,
            arrays,
        )?;
    }
    Ok(())
}

fn unflatten(field: &Field, path: &str, batch: &RecordBatch) -> TabulaResult<Option<ArrayRef>> {
    let DataType::Struct(children) = field.data_type() else {
        return batch
            .column_by_name(path)
            .map(|column| {
                if column.data_type() == field.data_type() {
                    Ok(column.clone())
                } else {
                    Ok(cast(column.as_ref(), field.data_type())?)
                }
            })
            .transpose();
    };

    let leaves = children
        .iter()
        .map(|child| unflatten(child, &join_path(path, child.name()), batch))
        .collect::<TabulaResult<Vec<_>>>()?;
    if leaves.iter().all(Option::is_none) {
        return Ok(None);
    }
    let arrays = children
        .iter()
        .zip(leaves)
        .map(|(child, leaf)| match leaf {
            Some(leaf) => Ok(leaf),
            None if child.is_nullable() => Ok(new_null_array(child.data_type(), batch.num_rows())),
            None => tabula_bail!(
                Validation: "missing non-nullable column {}",
                join_path(path, child.name())
            ),
        })
        .collect::<TabulaResult<Vec<_>>>()?;
    Ok(Some(Arc::new(StructArray::try_new(
        children.clone(),
        arrays,
        None,
    )?)))
}

fn attribute_strings(
    schema: &TableSchemaRef,
    batch: &RecordBatch,
) -> TabulaResult<BTreeMap<String, String>> {
    let mut strings = BTreeMap::new();
    if batch.num_rows() == 0 {
        return Ok(strings);
    }
    for key in schema.attribute_keys() {
        let Some(column) = batch.column_by_name(key) else {
            continue;
        };
        let first = cast(column.slice(0, 1).as_ref(), &DataType::Utf8)?;
        let first = first.as_string::<i32>();
        if first.is_valid(0) {
            strings.insert(key.clone(), first.value(0).to_string());
        }
    }
    Ok(strings)
}
