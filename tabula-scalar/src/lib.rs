//! Single values that live outside of arrays: attribute values, validator bounds and index keys.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use half::f16;
use paste::paste;

mod arrow;

/// A single logical value.
///
/// Integers of every width are widened into [`ScalarValue::Int`] or [`ScalarValue::UInt`], and
/// floats into [`ScalarValue::Float`]. Integers compare equal across signedness, and an integer
/// compares equal to a float only when the float holds exactly that integer.
///
/// [`PartialOrd`] orders nulls first (lowest), then the natural ordering of the value. Values of
/// unrelated kinds (e.g. text and numbers) are unordered.
#[derive(Debug, Clone)]
pub enum ScalarValue {
    /// The absence of a value
    Null,
    /// A boolean
    Bool(bool),
    /// A signed integer
    Int(i64),
    /// An unsigned integer
    UInt(u64),
    /// A floating point number
    Float(f64),
    /// UTF-8 text
    Utf8(Arc<str>),
    /// Arbitrary bytes
    Binary(Arc<[u8]>),
}

macro_rules! as_primitive {
    ($T:ty) => {
        paste! {
            #[doc = "Access the value as `" $T "`, returning `None` if it is not numeric or does not fit"]
            pub fn [<as_ $T>](&self) -> Option<$T> {
                match self {
                    ScalarValue::Int(v) => <$T>::try_from(*v).ok(),
                    ScalarValue::UInt(v) => <$T>::try_from(*v).ok(),
                    _ => None,
                }
            }
        }
    };
}

impl ScalarValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ScalarValue::Int(_) | ScalarValue::UInt(_) | ScalarValue::Float(_)
        )
    }

    /// A short name for the kind of value, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ScalarValue::Null => "null",
            ScalarValue::Bool(_) => "bool",
            ScalarValue::Int(_) => "int",
            ScalarValue::UInt(_) => "uint",
            ScalarValue::Float(_) => "float",
            ScalarValue::Utf8(_) => "utf8",
            ScalarValue::Binary(_) => "binary",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScalarValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    as_primitive!(i8);
    as_primitive!(i16);
    as_primitive!(i32);
    as_primitive!(i64);
    as_primitive!(u8);
    as_primitive!(u16);
    as_primitive!(u32);
    as_primitive!(u64);

    /// Access the value as `f64`. Integers are converted, possibly losing precision.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Int(v) => Some(*v as f64),
            ScalarValue::UInt(v) => Some(*v as f64),
            ScalarValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::Utf8(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ScalarValue::Binary(b) => Some(b),
            ScalarValue::Utf8(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    fn as_i128(&self) -> Option<i128> {
        match self {
            ScalarValue::Int(v) => Some(i128::from(*v)),
            ScalarValue::UInt(v) => Some(i128::from(*v)),
            _ => None,
        }
    }
}

/// Returns the float as an integer if it holds one exactly.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn integral(f: f64) -> Option<i128> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < 2f64.powi(100)).then_some(f as i128)
}

#[allow(clippy::cast_precision_loss)]
fn cmp_int_float(i: i128, f: f64) -> Ordering {
    match integral(f) {
        Some(fi) => i.cmp(&fi),
        None => (i as f64).total_cmp(&f),
    }
}

/// Treats `-0.0` as `0.0`, which is how integers compare against both.
fn zero_folded(f: f64) -> f64 {
    if f == 0.0 { 0.0 } else { f }
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl Eq for ScalarValue {}

impl PartialOrd for ScalarValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use ScalarValue::*;

        match (self, other) {
            (Null, Null) => Some(Ordering::Equal),
            (Null, _) => Some(Ordering::Less),
            (_, Null) => Some(Ordering::Greater),
            (Bool(l), Bool(r)) => Some(l.cmp(r)),
            (Float(l), Float(r)) => Some(zero_folded(*l).total_cmp(&zero_folded(*r))),
            (Float(l), r) => r.as_i128().map(|r| cmp_int_float(r, *l).reverse()),
            (l, Float(r)) => l.as_i128().map(|l| cmp_int_float(l, *r)),
            (Int(_) | UInt(_), Int(_) | UInt(_)) => {
                Some(self.as_i128()?.cmp(&other.as_i128()?))
            }
            (Utf8(l), Utf8(r)) => Some(l.cmp(r)),
            (Binary(l), Binary(r)) => Some(l.cmp(r)),
            _ => None,
        }
    }
}

impl Hash for ScalarValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            ScalarValue::Null => 0u8.hash(state),
            ScalarValue::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            ScalarValue::Int(_) | ScalarValue::UInt(_) => {
                2u8.hash(state);
                self.as_i128().hash(state);
            }
            ScalarValue::Float(f) => {
                2u8.hash(state);
                match integral(*f) {
                    Some(i) => Some(i).hash(state),
                    None => f.to_bits().hash(state),
                }
            }
            ScalarValue::Utf8(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            ScalarValue::Binary(b) => {
                4u8.hash(state);
                b.hash(state);
            }
        }
    }
}

impl Display for ScalarValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "null"),
            ScalarValue::Bool(b) => write!(f, "{b}"),
            ScalarValue::Int(i) => write!(f, "{i}"),
            ScalarValue::UInt(u) => write!(f, "{u}"),
            ScalarValue::Float(v) => write!(f, "{v}"),
            ScalarValue::Utf8(s) => write!(f, "\"{s}\""),
            ScalarValue::Binary(b) => {
                write!(f, "0x")?;
                for byte in b.iter() {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

macro_rules! from_int {
    ($variant:ident, $($T:ty),+) => {
        $(
            impl From<$T> for ScalarValue {
                fn from(value: $T) -> Self {
                    ScalarValue::$variant(value.into())
                }
            }
        )+
    };
}

from_int!(Int, i8, i16, i32, i64);
from_int!(UInt, u8, u16, u32, u64);

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Bool(value)
    }
}

impl From<f16> for ScalarValue {
    fn from(value: f16) -> Self {
        ScalarValue::Float(value.to_f64())
    }
}

impl From<f32> for ScalarValue {
    fn from(value: f32) -> Self {
        ScalarValue::Float(value.into())
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Utf8(value.into())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Utf8(value.into())
    }
}

impl From<Arc<str>> for ScalarValue {
    fn from(value: Arc<str>) -> Self {
        ScalarValue::Utf8(value)
    }
}

impl From<&[u8]> for ScalarValue {
    fn from(value: &[u8]) -> Self {
        ScalarValue::Binary(value.into())
    }
}

impl From<Vec<u8>> for ScalarValue {
    fn from(value: Vec<u8>) -> Self {
        ScalarValue::Binary(value.into())
    }
}

impl<T> From<Option<T>> for ScalarValue
where
    ScalarValue: From<T>,
{
    fn from(value: Option<T>) -> Self {
        value.map(ScalarValue::from).unwrap_or(ScalarValue::Null)
    }
}
