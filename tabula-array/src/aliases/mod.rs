//! Collection aliases used by the index and builders.
//!
//! Lookups hash [`ScalarValue`](tabula_scalar::ScalarValue) keys, so the `hashbrown` map is used
//! in place of the standard library's.

pub mod hash_map;
