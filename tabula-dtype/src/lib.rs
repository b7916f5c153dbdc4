#![deny(missing_docs)]

//! The schema layer of Tabula.
//!
//! A record type is declared as an ordered list of [`FieldDescriptor`]s, each a column, an
//! attribute or a sub-table, and compiled once into a [`TableSchema`]. The compiled schema knows
//! the physical arrow layout of the data and the dotted key of every attribute, and owns the
//! metadata codec that moves attribute values in and out of a table's [`Metadata`].

pub use attribute::*;
pub use field::*;
pub use metadata::*;
pub use nullability::*;
pub use path::*;
pub use schema::*;

mod attribute;
mod field;
mod metadata;
mod nullability;
mod path;
mod schema;
