use std::fmt::{Display, Formatter};

use arrow_array::{Array, ArrayRef, BooleanArray, Datum};
use arrow_cast::cast;
use arrow_ord::cmp;
use arrow_schema::{ArrowError, DataType};
use tabula_error::{TabulaResult, tabula_bail};
use tabula_scalar::ScalarValue;

/// A comparison between a value and a fixed bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match &self {
            Operator::Eq => "==",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
        };
        Display::fmt(display, f)
    }
}

impl Operator {
    pub fn to_fn<T: PartialEq + PartialOrd>(&self) -> fn(&T, &T) -> bool {
        match self {
            Operator::Eq => |l, r| l == r,
            Operator::Gt => |l, r| l > r,
            Operator::Gte => |l, r| l >= r,
            Operator::Lt => |l, r| l < r,
            Operator::Lte => |l, r| l <= r,
        }
    }

    /// Compare every element of `array` against `bound`.
    ///
    /// Null elements produce null results. The arrow comparison kernels are used whenever the
    /// bound can be represented in the array's type; otherwise each element is compared as a
    /// [`ScalarValue`].
    pub fn compare(&self, array: &dyn Array, bound: &ScalarValue) -> TabulaResult<BooleanArray> {
        if bound.is_null() {
            tabula_bail!("cannot compare against a null bound");
        }
        match self.compare_kernel(array, bound) {
            Ok(result) => Ok(result),
            Err(err) => {
                log::debug!(
                    "falling back to scalar comparison of {} {} {}: {}",
                    array.data_type(),
                    self,
                    bound,
                    err
                );
                let compare = self.to_fn::<ScalarValue>();
                Ok(ScalarValue::values_from_arrow(array)?
                    .iter()
                    .map(|v| {
                        (!v.is_null()).then(|| v.partial_cmp(bound).is_some() && compare(v, bound))
                    })
                    .collect())
            }
        }
    }

    /// Integer arrays compared against a fractional bound are widened to `Float64` so the bound
    /// is not truncated.
    fn compare_kernel(&self, array: &dyn Array, bound: &ScalarValue) -> TabulaResult<BooleanArray> {
        let fractional =
            matches!(bound, ScalarValue::Float(f) if f.fract() != 0.0 || !f.is_finite());
        if array.data_type().is_integer() && fractional {
            let widened: ArrayRef = cast(array, &DataType::Float64)?;
            let rhs = bound.to_arrow_scalar(&DataType::Float64)?;
            return Ok(self.arrow_compare(&widened, &rhs)?);
        }
        let rhs = bound.to_arrow_scalar(array.data_type())?;
        Ok(self.arrow_compare(&array, &rhs)?)
    }

    fn arrow_compare(
        &self,
        lhs: &dyn Datum,
        rhs: &dyn Datum,
    ) -> Result<BooleanArray, ArrowError> {
        match self {
            Operator::Eq => cmp::eq(lhs, rhs),
            Operator::Gt => cmp::gt(lhs, rhs),
            Operator::Gte => cmp::gt_eq(lhs, rhs),
            Operator::Lt => cmp::lt(lhs, rhs),
            Operator::Lte => cmp::lt_eq(lhs, rhs),
        }
    }
}

#[cfg(test)]
mod tests {
    use arrow_array::{Int64Array, StringArray, UInt8Array};

    use super::*;

    #[test]
    fn compare_keeps_nulls() {
        let array = Int64Array::from(vec![Some(1), None, Some(3)]);
        let result = Operator::Gte
            .compare(&array, &ScalarValue::from(2i64))
            .unwrap();
        assert_eq!(result, BooleanArray::from(vec![Some(false), None, Some(true)]));
    }

    #[test]
    fn compare_falls_back_for_unrepresentable_bounds() {
        let array = UInt8Array::from(vec![0, 5]);
        let result = Operator::Gt
            .compare(&array, &ScalarValue::from(-1i64))
            .unwrap();
        assert_eq!(result, BooleanArray::from(vec![true, true]));

        let strings = StringArray::from(vec!["a"]);
        let result = Operator::Eq
            .compare(&strings, &ScalarValue::from(1i64))
            .unwrap();
        assert_eq!(result, BooleanArray::from(vec![false]));
    }

    #[test]
    fn display() {
        assert_eq!(Operator::Lte.to_string(), "<=");
        assert_eq!(Operator::Eq.to_string(), "==");
    }
}
