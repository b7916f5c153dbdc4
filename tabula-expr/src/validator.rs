use std::fmt::{Display, Formatter};
use std::sync::Arc;

use arrow_arith::boolean::{and, or_kleene};
use arrow_array::{Array, BooleanArray};
use arrow_buffer::BooleanBuffer;
use itertools::Itertools;
use tabula_error::{TabulaResult, tabula_bail};
use tabula_scalar::ScalarValue;

use crate::Operator;

/// A pure predicate over a single value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validator {
    /// Compare the value against a fixed bound.
    Compare(Operator, ScalarValue),
    /// The value must equal one of the listed values.
    IsIn(Arc<[ScalarValue]>),
    /// Every inner validator must pass.
    And(Arc<[Validator]>),
}

impl Validator {
    /// Whether `value` satisfies this predicate. Nulls always pass.
    pub fn evaluate(&self, value: &ScalarValue) -> bool {
        if value.is_null() {
            return true;
        }
        match self {
            Validator::Compare(op, bound) => value
                .partial_cmp(bound)
                .is_some_and(|_| op.to_fn::<ScalarValue>()(value, bound)),
            Validator::IsIn(values) => values.iter().any(|v| v == value),
            Validator::And(validators) => validators.iter().all(|v| v.evaluate(value)),
        }
    }

    /// The predicates that must all pass, with nested conjunctions flattened.
    pub fn conjuncts(&self) -> Vec<&Validator> {
        match self {
            Validator::And(validators) => validators.iter().flat_map(|v| v.conjuncts()).collect(),
            _ => vec![self],
        }
    }

    /// The first predicate of this validator that rejects `value`.
    pub fn first_rejecting(&self, value: &ScalarValue) -> Option<&Validator> {
        self.conjuncts().into_iter().find(|v| !v.evaluate(value))
    }

    /// Check a single value belonging to `field`. The error names the predicate that failed.
    pub fn check(&self, field: &str, value: &ScalarValue) -> TabulaResult<()> {
        if let Some(failed) = self.first_rejecting(value) {
            tabula_bail!(
                Validation: "field {} value {} failed validator {}",
                field,
                value,
                failed
            );
        }
        Ok(())
    }

    /// Evaluate the predicate over every element of `array`.
    ///
    /// The result has no nulls: null elements of `array` evaluate to `true`.
    pub fn evaluate_array(&self, array: &dyn Array) -> TabulaResult<BooleanArray> {
        let result = match self {
            Validator::Compare(op, bound) => op.compare(array, bound)?,
            Validator::IsIn(values) => {
                let mut matches = BooleanArray::new(
                    BooleanBuffer::new_unset(array.len()),
                    array.logical_nulls(),
                );
                for value in values.iter().filter(|v| !v.is_null()) {
                    matches = or_kleene(&matches, &Operator::Eq.compare(array, value)?)?;
                }
                matches
            }
            Validator::And(validators) => {
                let mut all = BooleanArray::from(vec![true; array.len()]);
                for validator in validators.iter() {
                    all = and(&all, &validator.evaluate_array(array)?)?;
                }
                all
            }
        };
        Ok(nulls_pass(&result))
    }

    /// The row positions of `array` that fail the predicate, in order.
    pub fn failures(&self, array: &dyn Array) -> TabulaResult<Vec<usize>> {
        let result = self.evaluate_array(array)?;
        Ok(result
            .iter()
            .positions(|passed| passed == Some(false))
            .collect())
    }

    /// Check every element of `array` belonging to column `field`.
    ///
    /// The error names the first failing predicate and the rows it rejects.
    pub fn validate_array(&self, field: &str, array: &dyn Array) -> TabulaResult<()> {
        for conjunct in self.conjuncts() {
            let failures = conjunct.failures(array)?;
            if !failures.is_empty() {
                tabula_bail!(
                    Validation: "column {} failed validator {} at rows [{}]",
                    field,
                    conjunct,
                    failures.iter().join(", ")
                );
            }
        }
        Ok(())
    }
}

fn nulls_pass(result: &BooleanArray) -> BooleanArray {
    if result.null_count() == 0 {
        return result.clone();
    }
    result.iter().map(|v| Some(v.unwrap_or(true))).collect()
}

impl Display for Validator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Validator::Compare(op, bound) => write!(f, "{op} {bound}"),
            Validator::IsIn(values) => write!(f, "is_in([{}])", values.iter().join(", ")),
            Validator::And(validators) => write!(f, "and_({})", validators.iter().join(", ")),
        }
    }
}
