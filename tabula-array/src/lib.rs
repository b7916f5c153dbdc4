//! Tables of typed columns with per-instance attributes.
//!
//! A [`Table`] pairs the columns of a compiled [`TableSchema`](tabula_dtype::TableSchema) with
//! the attribute metadata of one instance. Columns are [`ChunkedArray`]s: concatenation appends
//! chunks by reference, and [`Table::defragment`] copies them into one contiguous chunk.
//!
//! Constructors that take user data check it against the schema and run every column validator.
//! Operations that derive one table from another (slicing, taking, selecting, sorting,
//! concatenating) trust their input and do not validate again.

pub use builder::*;
pub use chunked::*;
pub use concat::*;
pub use flatten::flat_fields;
pub use index::*;
pub use ops::*;
pub use table::*;

pub mod aliases;
mod builder;
mod chunked;
mod concat;
mod constructors;
mod defragment;
mod flatten;
mod index;
mod ops;
mod rows;
mod table;
