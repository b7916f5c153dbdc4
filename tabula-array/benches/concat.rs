#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use arrow_schema::DataType;
use divan::Bencher;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tabula_array::{Table, concatenate, concatenate_with};
use tabula_dtype::{AttributeType, FieldDescriptor, TableSchema, TableSchemaRef};

fn main() {
    divan::main();
}

const INPUTS: usize = 100;

fn pair_schema() -> TableSchemaRef {
    Arc::new(
        TableSchema::compile(
            "Pair",
            [
                FieldDescriptor::column("x", DataType::Int64),
                FieldDescriptor::column("y", DataType::Float64),
            ],
        )
        .unwrap(),
    )
}

fn wrapper_schema() -> TableSchemaRef {
    Arc::new(
        TableSchema::compile(
            "Wrapper",
            [
                FieldDescriptor::subtable("pairs", pair_schema()),
                FieldDescriptor::column("id", DataType::Utf8),
                FieldDescriptor::attribute("label", AttributeType::Utf8),
            ],
        )
        .unwrap(),
    )
}

fn pairs(rng: &mut StdRng, len: usize) -> Table {
    Table::builder(pair_schema())
        .with_values("x", (0..len).map(|_| rng.random_range(0..1_000i64)))
        .with_values("y", (0..len).map(|_| rng.random::<f64>()))
        .build()
        .unwrap()
}

fn wrappers(len: usize) -> Vec<Table> {
    let mut rng = StdRng::seed_from_u64(0);
    (0..INPUTS)
        .map(|i| {
            Table::builder(wrapper_schema())
                .with_subtable("pairs", pairs(&mut rng, len))
                .with_values("id", (0..len).map(|j| format!("{i}-{j}")))
                .with_attribute("label", "bench")
                .build()
                .unwrap()
        })
        .collect()
}

#[divan::bench(args = [10, 1_000])]
fn concatenate_flat(bencher: Bencher, len: usize) {
    let mut rng = StdRng::seed_from_u64(0);
    let inputs: Vec<Table> = (0..INPUTS).map(|_| pairs(&mut rng, len)).collect();
    bencher.bench(|| concatenate(&inputs).unwrap());
}

#[divan::bench(args = [10, 1_000])]
fn concatenate_nested(bencher: Bencher, len: usize) {
    let inputs = wrappers(len);
    bencher.bench(|| concatenate(&inputs).unwrap());
}

#[divan::bench(args = [10, 1_000])]
fn concatenate_by_reference(bencher: Bencher, len: usize) {
    let inputs = wrappers(len);
    bencher.bench(|| concatenate_with(&inputs, false).unwrap());
}

#[divan::bench(args = [10, 1_000])]
fn defragment(bencher: Bencher, len: usize) {
    let fragmented = concatenate_with(&wrappers(len), false).unwrap();
    bencher.bench(|| fragmented.defragment().unwrap());
}
