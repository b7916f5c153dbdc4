//! Typed columnar tables on Apache Arrow.
//!
//! A record type is declared once as a list of fields: per-row columns, per-instance attributes
//! and nested sub-tables. [`dtype::TableSchema::compile`] turns the declaration into an arrow
//! schema plus a namespace of dotted attribute keys, and [`Table`] holds one instance: chunked
//! columns together with the attribute metadata of the table and all its sub-tables.

pub use tabula_array::*;
#[cfg(feature = "files")]
pub use tabula_file as file;
pub use {
    tabula_dtype as dtype, tabula_error as error, tabula_expr as expr, tabula_scalar as scalar,
};
