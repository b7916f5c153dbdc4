use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::types::{
    Float16Type, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type, UInt8Type,
    UInt16Type, UInt32Type, UInt64Type,
};
use arrow_array::{
    Array, ArrayRef, BinaryArray, BooleanArray, Float64Array, Int64Array, Scalar, StringArray,
    UInt64Array, new_null_array,
};
use arrow_cast::cast::{CastOptions, cast_with_options};
use arrow_schema::DataType;
use tabula_error::{TabulaResult, tabula_bail, tabula_err};

use crate::ScalarValue;

macro_rules! primitive_values {
    ($array:expr, $T:ty) => {
        $array
            .as_primitive::<$T>()
            .iter()
            .map(ScalarValue::from)
            .collect()
    };
}

/// Cast options that surface overflow and truncation as errors instead of nulls.
fn strict() -> CastOptions<'static> {
    CastOptions {
        safe: false,
        ..Default::default()
    }
}

impl ScalarValue {
    /// Read every value of an arrow array. Nulls become [`ScalarValue::Null`].
    ///
    /// Temporal and decimal arrays are read through their integer representation.
    pub fn values_from_arrow(array: &dyn Array) -> TabulaResult<Vec<ScalarValue>> {
        Ok(match array.data_type() {
            DataType::Null => vec![ScalarValue::Null; array.len()],
            DataType::Boolean => array.as_boolean().iter().map(ScalarValue::from).collect(),
            DataType::Int8 => primitive_values!(array, Int8Type),
            DataType::Int16 => primitive_values!(array, Int16Type),
            DataType::Int32 => primitive_values!(array, Int32Type),
            DataType::Int64 => primitive_values!(array, Int64Type),
            DataType::UInt8 => primitive_values!(array, UInt8Type),
            DataType::UInt16 => primitive_values!(array, UInt16Type),
            DataType::UInt32 => primitive_values!(array, UInt32Type),
            DataType::UInt64 => primitive_values!(array, UInt64Type),
            DataType::Float16 => primitive_values!(array, Float16Type),
            DataType::Float32 => primitive_values!(array, Float32Type),
            DataType::Float64 => primitive_values!(array, Float64Type),
            DataType::Utf8 => array.as_string::<i32>().iter().map(ScalarValue::from).collect(),
            DataType::LargeUtf8 => array.as_string::<i64>().iter().map(ScalarValue::from).collect(),
            DataType::Utf8View => array.as_string_view().iter().map(ScalarValue::from).collect(),
            DataType::Binary => array.as_binary::<i32>().iter().map(ScalarValue::from).collect(),
            DataType::LargeBinary => array.as_binary::<i64>().iter().map(ScalarValue::from).collect(),
            DataType::BinaryView => array.as_binary_view().iter().map(ScalarValue::from).collect(),
            DataType::Date32
            | DataType::Date64
            | DataType::Time32(_)
            | DataType::Time64(_)
            | DataType::Timestamp(..)
            | DataType::Duration(_)
            | DataType::Decimal128(..) => {
                let ints = cast_with_options(array, &DataType::Int64, &strict())?;
                primitive_values!(ints, Int64Type)
            }
            other => tabula_bail!(NotImplemented: "values_from_arrow", other),
        })
    }

    /// Read the value at `index` of an arrow array.
    pub fn from_arrow(array: &dyn Array, index: usize) -> TabulaResult<ScalarValue> {
        if index >= array.len() {
            tabula_bail!(OutOfBounds: index, 0, array.len());
        }
        Self::values_from_arrow(array.slice(index, 1).as_ref())?
            .pop()
            .ok_or_else(|| tabula_err!(AssertionFailed: "slice of length 1 produced no value"))
    }

    /// Build an arrow array of `data_type` holding `values`.
    ///
    /// The values are first collected into the natural arrow type of their kind, then cast. The
    /// cast is strict: values that overflow the target type are an error.
    pub fn iter_to_array<I>(values: I, data_type: &DataType) -> TabulaResult<ArrayRef>
    where
        I: IntoIterator<Item = ScalarValue>,
    {
        let values: Vec<ScalarValue> = values.into_iter().collect();
        let natural: ArrayRef = match data_type {
            DataType::Null => {
                if let Some(v) = values.iter().find(|v| !v.is_null()) {
                    tabula_bail!(MismatchedTypes: "null", v.kind());
                }
                return Ok(new_null_array(data_type, values.len()));
            }
            DataType::Boolean => Arc::new(
                values
                    .iter()
                    .map(|v| expect_kind(v, ScalarValue::as_bool, data_type))
                    .collect::<TabulaResult<BooleanArray>>()?,
            ),
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
                Arc::new(
                    values
                        .iter()
                        .map(|v| expect_kind(v, ScalarValue::as_u64, data_type))
                        .collect::<TabulaResult<UInt64Array>>()?,
                )
            }
            DataType::Float16 | DataType::Float32 | DataType::Float64 => Arc::new(
                values
                    .iter()
                    .map(|v| expect_kind(v, ScalarValue::as_f64, data_type))
                    .collect::<TabulaResult<Float64Array>>()?,
            ),
            dt if dt.is_integer() || dt.is_temporal() => Arc::new(
                values
                    .iter()
                    .map(|v| expect_kind(v, ScalarValue::as_i64, data_type))
                    .collect::<TabulaResult<Int64Array>>()?,
            ),
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => Arc::new(
                values
                    .iter()
                    .map(|v| {
                        expect_kind(v, |v| v.as_str().map(str::to_string), data_type)
                    })
                    .collect::<TabulaResult<StringArray>>()?,
            ),
            DataType::Binary | DataType::LargeBinary | DataType::BinaryView => Arc::new(
                values
                    .iter()
                    .map(|v| expect_kind(v, |v| v.as_bytes().map(<[u8]>::to_vec), data_type))
                    .collect::<TabulaResult<BinaryArray>>()?,
            ),
            other => tabula_bail!(NotImplemented: "iter_to_array", other),
        };

        if natural.data_type() == data_type {
            return Ok(natural);
        }
        Ok(cast_with_options(natural.as_ref(), data_type, &strict())?)
    }

    /// Build a single-element arrow array of `data_type` holding this value.
    pub fn to_arrow(&self, data_type: &DataType) -> TabulaResult<ArrayRef> {
        Self::iter_to_array([self.clone()], data_type)
    }

    /// An arrow [`Scalar`] of `data_type`, for use with arrow comparison kernels.
    pub fn to_arrow_scalar(&self, data_type: &DataType) -> TabulaResult<Scalar<ArrayRef>> {
        Ok(Scalar::new(self.to_arrow(data_type)?))
    }
}

fn expect_kind<T>(
    value: &ScalarValue,
    extract: impl Fn(&ScalarValue) -> Option<T>,
    data_type: &DataType,
) -> TabulaResult<Option<T>> {
    if value.is_null() {
        return Ok(None);
    }
    extract(value)
        .map(Some)
        .ok_or_else(|| tabula_err!(MismatchedTypes: data_type, format!("{value} ({})", value.kind())))
}
