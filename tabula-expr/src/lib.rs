//! Predicates attached to schema fields.
//!
//! A [`Validator`] is built from the combinators [`lt`], [`le`], [`gt`], [`ge`], [`eq`], [`is_in`]
//! and [`and_`], and can be evaluated against a single [`ScalarValue`] (attributes) or
//! vectorised over an arrow array (columns). Nulls always pass; nullability is enforced by the
//! schema, not by validators.

mod operators;
mod validator;

pub use operators::*;
use tabula_scalar::ScalarValue;
pub use validator::*;

/// Passes when the value is strictly less than `bound`.
pub fn lt(bound: impl Into<ScalarValue>) -> Validator {
    Validator::Compare(Operator::Lt, bound.into())
}

/// Passes when the value is less than or equal to `bound`.
pub fn le(bound: impl Into<ScalarValue>) -> Validator {
    Validator::Compare(Operator::Lte, bound.into())
}

/// Passes when the value is strictly greater than `bound`.
pub fn gt(bound: impl Into<ScalarValue>) -> Validator {
    Validator::Compare(Operator::Gt, bound.into())
}

/// Passes when the value is greater than or equal to `bound`.
pub fn ge(bound: impl Into<ScalarValue>) -> Validator {
    Validator::Compare(Operator::Gte, bound.into())
}

/// Passes when the value equals `bound`.
pub fn eq(bound: impl Into<ScalarValue>) -> Validator {
    Validator::Compare(Operator::Eq, bound.into())
}

/// Passes when the value equals one of `values`.
pub fn is_in<I, T>(values: I) -> Validator
where
    I: IntoIterator<Item = T>,
    T: Into<ScalarValue>,
{
    Validator::IsIn(values.into_iter().map(Into::into).collect())
}

/// Passes when every one of `validators` passes.
pub fn and_<I>(validators: I) -> Validator
where
    I: IntoIterator<Item = Validator>,
{
    Validator::And(validators.into_iter().collect())
}
