#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use arrow_array::Array;
use arrow_array::cast::AsArray;
use arrow_array::types::Int64Type;
use arrow_schema::DataType;
use rstest::rstest;
use serde::Serialize;
use tabula::dtype::{AttributeType, AttributeValues, FieldDescriptor, TableSchema, TableSchemaRef};
use tabula::expr::{and_, ge, is_in, lt};
use tabula::scalar::ScalarValue;
use tabula::{SortOrder, Table, concatenate, concatenate_with};

fn ints(table: &Table, path: &str) -> Vec<i64> {
    table
        .column_path(path)
        .unwrap()
        .compact()
        .unwrap()
        .as_primitive::<Int64Type>()
        .values()
        .to_vec()
}

fn pair_schema() -> TableSchemaRef {
    Arc::new(
        TableSchema::compile(
            "Pair",
            [
                FieldDescriptor::column("x", DataType::Int64),
                FieldDescriptor::column("y", DataType::Int64),
            ],
        )
        .unwrap(),
    )
}

fn pair(x: &[i64], y: &[i64]) -> Table {
    Table::builder(pair_schema())
        .with_values("x", x.to_vec())
        .with_values("y", y.to_vec())
        .build()
        .unwrap()
}

fn nested_schema() -> TableSchemaRef {
    let inner = Arc::new(
        TableSchema::compile(
            "Inner",
            [
                FieldDescriptor::column("x", DataType::Int64),
                FieldDescriptor::attribute("id1", AttributeType::Utf8),
            ],
        )
        .unwrap(),
    );
    let middle = Arc::new(
        TableSchema::compile(
            "Middle",
            [
                FieldDescriptor::subtable("inner", inner),
                FieldDescriptor::attribute("id2", AttributeType::Utf8),
            ],
        )
        .unwrap(),
    );
    Arc::new(
        TableSchema::compile(
            "Outer",
            [
                FieldDescriptor::subtable("middle", middle),
                FieldDescriptor::attribute("id3", AttributeType::Utf8),
            ],
        )
        .unwrap(),
    )
}

fn nested(x: &[i64]) -> Table {
    let schema = nested_schema();
    let middle_schema = schema.field("middle").unwrap().as_subtable().unwrap().clone();
    let inner_schema = middle_schema.field("inner").unwrap().as_subtable().unwrap().clone();
    let inner = Table::builder(inner_schema)
        .with_values("x", x.to_vec())
        .with_attribute("id1", "a")
        .build()
        .unwrap();
    let middle = Table::builder(middle_schema)
        .with_subtable("inner", inner)
        .with_attribute("id2", "b")
        .build()
        .unwrap();
    Table::builder(schema)
        .with_subtable("middle", middle)
        .with_attribute("id3", "c")
        .build()
        .unwrap()
}

#[test]
fn pair_concatenation() {
    let have = concatenate(&[pair(&[1, 2, 3], &[4, 5, 6]), pair(&[11, 22, 33], &[44, 55, 66])])
        .unwrap();
    assert_eq!(have.len(), 6);
    assert_eq!(ints(&have, "x"), vec![1, 2, 3, 11, 22, 33]);
    assert_eq!(have.to_string(), "Pair(size=6)");
}

#[test]
fn nested_metadata_keys() {
    let table = nested(&[1, 2]);
    let keys: Vec<&str> = table.metadata().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["id3", "middle.id2", "middle.inner.id1"]);
    let values: Vec<&[u8]> = table.metadata().values().map(|v| v.as_ref()).collect();
    assert_eq!(values, vec![b"c".as_slice(), b"b", b"a"]);

    let inner = table
        .extract_subtable("middle")
        .unwrap()
        .extract_subtable("inner")
        .unwrap();
    assert_eq!(inner.attribute("id1").unwrap(), ScalarValue::from("a"));
    assert_eq!(ints(&inner, "x"), vec![1, 2]);
}

#[test]
fn nested_attributes_are_settable() {
    let mut table = nested(&[1]);
    table.set_attribute("middle.inner.id1", "z").unwrap();
    assert_eq!(table.attribute("middle.inner.id1").unwrap(), ScalarValue::from("z"));
    assert!(table.set_attribute("middle.inner.x", "z").is_err());
    assert!(table.set_attribute("id3", 1i64).unwrap_err().is_validation_error());

    let attributes = table.attributes().unwrap();
    assert_eq!(attributes.len(), 3);
    assert_eq!(attributes["middle.id2"], ScalarValue::from("b"));
}

#[test]
fn replacing_a_subtable() {
    let table = nested(&[1, 2]);
    let middle = table.extract_subtable("middle").unwrap();
    let inner = middle
        .extract_subtable("inner")
        .unwrap()
        .with_attribute("id1", "q")
        .unwrap();
    let middle = middle.with_subtable("inner", &inner).unwrap();
    let table = table.with_subtable("middle", &middle).unwrap();
    assert_eq!(table.attribute("middle.inner.id1").unwrap(), ScalarValue::from("q"));
    assert_eq!(ints(&table, "middle.inner.x"), vec![1, 2]);

    let short = nested(&[1]).extract_subtable("middle").unwrap();
    assert!(table.with_subtable("middle", &short).unwrap_err().is_validation_error());
}

#[rstest]
#[case(&[3, 0, 5])]
#[case(&[1])]
#[case(&[2, 2, 2, 2])]
fn concatenated_row_counts(#[case] counts: &[usize]) {
    let inputs: Vec<Table> = counts
        .iter()
        .scan(0i64, |next, &count| {
            let xs: Vec<i64> = (*next..*next + count as i64).collect();
            *next += count as i64;
            Some(pair(&xs, &xs))
        })
        .collect();
    let have = concatenate(&inputs).unwrap();
    let total: usize = counts.iter().sum();
    assert_eq!(have.len(), total);
    assert_eq!(ints(&have, "x"), (0..total as i64).collect::<Vec<_>>());
}

#[test]
fn concatenation_keeps_first_metadata() {
    let first = nested(&[1]);
    let second = nested(&[2]).with_attribute("id3", "other").unwrap();
    let have = concatenate(&[first, second]).unwrap();
    assert_eq!(have.attribute("id3").unwrap(), ScalarValue::from("c"));
    assert_eq!(ints(&have, "middle.inner.x"), vec![1, 2]);
}

#[test]
fn defragment_is_idempotent() {
    let fragmented = concatenate_with(&vec![nested(&[1, 2]); 5], false).unwrap();
    assert!(fragmented.is_fragmented());
    assert!(fragmented.to_struct_array().unwrap_err().is_fragmented());

    let once = fragmented.defragment().unwrap();
    let twice = once.defragment().unwrap();
    assert_eq!(once, twice);
    assert!(twice.chunk_counts().iter().all(|(_, n)| *n == 1));
    assert_eq!(concatenate(&[fragmented.clone()]).unwrap(), once);
    assert_eq!(once.to_struct_array().unwrap().len(), 10);
}

#[derive(Serialize)]
struct Row {
    id: i64,
    name: String,
    value: i64,
}

fn table_with_string() -> Table {
    let schema = Arc::new(
        TableSchema::compile(
            "TableWithString",
            [
                FieldDescriptor::column("id", DataType::Int64),
                FieldDescriptor::column("name", DataType::Utf8),
                FieldDescriptor::column("value", DataType::Int64),
            ],
        )
        .unwrap(),
    );
    let row = |id: i64, name: &str, value: i64| Row {
        id,
        name: name.to_string(),
        value,
    };
    Table::from_rows(
        schema,
        &[row(1, "a", 4), row(2, "a", 5), row(3, "c", 6)],
        AttributeValues::new(),
    )
    .unwrap()
}

#[rstest]
#[case("a", Some(vec![1, 2]))]
#[case("c", Some(vec![3]))]
#[case("b", None)]
fn index_lookup(#[case] name: &str, #[case] ids: Option<Vec<i64>>) {
    let table = table_with_string();
    let index = table.index("name").unwrap();
    let found = index.lookup(name).unwrap();
    assert_eq!(found.map(|t| ints(&t, "id")), ids);
}

#[test]
fn select_and_sort() {
    let table = table_with_string();
    assert_eq!(ints(&table.select("name", "a").unwrap(), "value"), vec![4, 5]);
    assert_eq!(
        ints(
            &table
                .sort_by([("name", SortOrder::Descending), ("value", SortOrder::Ascending)])
                .unwrap(),
            "id"
        ),
        vec![3, 1, 2]
    );
}

#[test]
fn validators_guard_constructors() {
    let schema = Arc::new(
        TableSchema::compile(
            "Bounded",
            [
                FieldDescriptor::column("x", DataType::Int64)
                    .with_validator(and_([ge(0i64), lt(10i64)])),
                FieldDescriptor::column("kind", DataType::Utf8)
                    .with_validator(is_in(["star", "planet"])),
            ],
        )
        .unwrap(),
    );
    let ok = Table::builder(schema.clone())
        .with_values("x", [0i64, 9])
        .with_values("kind", ["star", "planet"])
        .build()
        .unwrap();
    assert!(ok.is_valid());

    let err = Table::builder(schema)
        .with_values("x", [0i64, 10])
        .with_values("kind", ["star", "comet"])
        .build()
        .unwrap_err();
    assert!(err.is_validation_error());
}

#[cfg(feature = "files")]
mod files {
    use tabula::file::{
        CsvReadOptions, CsvWriteOptions, ParquetWriteOptions, read_ipc_file, read_parquet_file,
        write_ipc_file,
    };

    use super::*;

    #[test]
    fn nested_tables_survive_every_format() {
        let table = nested(&[1, 2, 3]);
        let dir = tempfile::tempdir().unwrap();

        let parquet = dir.path().join("t.parquet");
        ParquetWriteOptions::default().write_file(&table, &parquet).unwrap();
        assert_eq!(
            read_parquet_file(nested_schema(), &parquet, AttributeValues::new()).unwrap(),
            table
        );

        let ipc = dir.path().join("t.arrow");
        write_ipc_file(&table, &ipc).unwrap();
        assert_eq!(
            read_ipc_file(nested_schema(), &ipc, AttributeValues::new()).unwrap(),
            table
        );

        let csv = dir.path().join("t.csv");
        CsvWriteOptions::default().write_file(&table, &csv).unwrap();
        assert_eq!(
            CsvReadOptions::default()
                .read_file(nested_schema(), &csv, AttributeValues::new())
                .unwrap(),
            table
        );
    }
}
