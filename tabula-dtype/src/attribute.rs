use std::fmt::{Display, Formatter};

use bytes::Bytes;
use half::f16;
use tabula_error::{TabulaResult, tabula_bail, tabula_err};
use tabula_scalar::ScalarValue;

/// The value type of an attribute, and how it is stored in metadata.
///
/// Numbers are stored as fixed-width little-endian bytes and text as UTF-8. Every type also has
/// a string form used by row-oriented text formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    /// UTF-8 text
    Utf8,
    /// An integer of `width` bytes (1, 2, 4 or 8)
    Int {
        /// Width in bytes
        width: u8,
        /// Whether the integer is signed
        signed: bool,
    },
    /// An IEEE 754 float of `width` bytes (2, 4 or 8)
    Float {
        /// Width in bytes
        width: u8,
    },
}

impl AttributeType {
    /// A signed 64-bit integer.
    pub const INT64: AttributeType = AttributeType::Int {
        width: 8,
        signed: true,
    };
    /// A 64-bit float.
    pub const FLOAT64: AttributeType = AttributeType::Float { width: 8 };

    /// A signed or unsigned integer of `width` bytes.
    pub fn int(width: u8, signed: bool) -> TabulaResult<Self> {
        if !matches!(width, 1 | 2 | 4 | 8) {
            tabula_bail!(Schema: "integer attribute width must be 1, 2, 4 or 8, got {}", width);
        }
        Ok(AttributeType::Int { width, signed })
    }

    /// A float of `width` bytes.
    pub fn float(width: u8) -> TabulaResult<Self> {
        if !matches!(width, 2 | 4 | 8) {
            tabula_bail!(Schema: "float attribute width must be 2, 4 or 8, got {}", width);
        }
        Ok(AttributeType::Float { width })
    }

    /// Encode `value` into its metadata bytes.
    ///
    /// Fails with a validation error if the value is null, of another kind, or does not fit.
    /// Finite floats that would round to infinity in a narrower float do not fit.
    pub fn to_bytes(&self, value: &ScalarValue) -> TabulaResult<Bytes> {
        match *self {
            AttributeType::Utf8 => {
                let s = value
                    .as_str()
                    .ok_or_else(|| self.mismatch(value))?;
                Ok(Bytes::copy_from_slice(s.as_bytes()))
            }
            AttributeType::Int { width, signed } => {
                let bytes = match (width, signed) {
                    (1, true) => value.as_i8().map(|v| v.to_le_bytes().to_vec()),
                    (2, true) => value.as_i16().map(|v| v.to_le_bytes().to_vec()),
                    (4, true) => value.as_i32().map(|v| v.to_le_bytes().to_vec()),
                    (8, true) => value.as_i64().map(|v| v.to_le_bytes().to_vec()),
                    (1, false) => value.as_u8().map(|v| v.to_le_bytes().to_vec()),
                    (2, false) => value.as_u16().map(|v| v.to_le_bytes().to_vec()),
                    (4, false) => value.as_u32().map(|v| v.to_le_bytes().to_vec()),
                    (8, false) => value.as_u64().map(|v| v.to_le_bytes().to_vec()),
                    _ => tabula_bail!(Schema: "invalid attribute type {}", self),
                };
                bytes.map(Bytes::from).ok_or_else(|| self.mismatch(value))
            }
            AttributeType::Float { width } => {
                let v = value.as_f64().ok_or_else(|| self.mismatch(value))?;
                #[allow(clippy::cast_possible_truncation)]
                let (narrowed, bytes) = match width {
                    2 => {
                        let h = f16::from_f64(v);
                        (h.to_f64(), h.to_le_bytes().to_vec())
                    }
                    4 => {
                        let f = v as f32;
                        (f64::from(f), f.to_le_bytes().to_vec())
                    }
                    8 => (v, v.to_le_bytes().to_vec()),
                    _ => tabula_bail!(Schema: "invalid attribute type {}", self),
                };
                if v.is_finite() && narrowed.is_infinite() {
                    tabula_bail!(
                        Validation: "attribute value {} is out of range for {}",
                        v,
                        self
                    );
                }
                Ok(Bytes::from(bytes))
            }
        }
    }

    /// Decode metadata bytes back into a value.
    pub fn from_bytes(&self, raw: &[u8]) -> TabulaResult<ScalarValue> {
        match *self {
            AttributeType::Utf8 => std::str::from_utf8(raw)
                .map(ScalarValue::from)
                .map_err(|e| tabula_err!(Validation: "attribute is not valid UTF-8: {}", e)),
            AttributeType::Int { width, signed } => Ok(match (width, signed) {
                (1, true) => i8::from_le_bytes(self.fixed(raw)?).into(),
                (2, true) => i16::from_le_bytes(self.fixed(raw)?).into(),
                (4, true) => i32::from_le_bytes(self.fixed(raw)?).into(),
                (8, true) => i64::from_le_bytes(self.fixed(raw)?).into(),
                (1, false) => u8::from_le_bytes(self.fixed(raw)?).into(),
                (2, false) => u16::from_le_bytes(self.fixed(raw)?).into(),
                (4, false) => u32::from_le_bytes(self.fixed(raw)?).into(),
                (8, false) => u64::from_le_bytes(self.fixed(raw)?).into(),
                _ => tabula_bail!(Schema: "invalid attribute type {}", self),
            }),
            AttributeType::Float { width } => Ok(match width {
                2 => f16::from_le_bytes(self.fixed(raw)?).into(),
                4 => f32::from_le_bytes(self.fixed(raw)?).into(),
                8 => f64::from_le_bytes(self.fixed(raw)?).into(),
                _ => tabula_bail!(Schema: "invalid attribute type {}", self),
            }),
        }
    }

    /// The string form of `value`, used when attributes are written as text.
    ///
    /// Floats use the shortest representation that parses back to the same value.
    pub fn to_string_form(&self, value: &ScalarValue) -> TabulaResult<String> {
        // Normalise through the byte codec so the text holds exactly what metadata would.
        let value = self.from_bytes(&self.to_bytes(value)?)?;
        Ok(match value {
            ScalarValue::Utf8(s) => s.to_string(),
            ScalarValue::Float(f) => f.to_string(),
            other => other.to_string(),
        })
    }

    /// Parse the string form of a value.
    pub fn from_string_form(&self, raw: &str) -> TabulaResult<ScalarValue> {
        let value = match self {
            AttributeType::Utf8 => ScalarValue::from(raw),
            AttributeType::Int { signed: true, .. } => raw
                .trim()
                .parse::<i64>()
                .map(ScalarValue::from)
                .map_err(|e| tabula_err!(Validation: "cannot parse '{}' as {}: {}", raw, self, e))?,
            AttributeType::Int { signed: false, .. } => raw
                .trim()
                .parse::<u64>()
                .map(ScalarValue::from)
                .map_err(|e| tabula_err!(Validation: "cannot parse '{}' as {}: {}", raw, self, e))?,
            AttributeType::Float { .. } => raw
                .trim()
                .parse::<f64>()
                .map(ScalarValue::from)
                .map_err(|e| tabula_err!(Validation: "cannot parse '{}' as {}: {}", raw, self, e))?,
        };
        // Range check against the declared width.
        self.to_bytes(&value)?;
        Ok(value)
    }

    fn fixed<const N: usize>(&self, raw: &[u8]) -> TabulaResult<[u8; N]> {
        raw.try_into().map_err(|_| {
            tabula_err!(
                Validation: "expected {} bytes for {} attribute, got {}",
                N,
                self,
                raw.len()
            )
        })
    }

    fn mismatch(&self, value: &ScalarValue) -> tabula_error::TabulaError {
        tabula_err!(Validation: "value {} is not a valid {} attribute", value, self)
    }
}

impl Display for AttributeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeType::Utf8 => write!(f, "utf8"),
            AttributeType::Int { width, signed } => {
                write!(f, "{}{}", if *signed { "i" } else { "u" }, u32::from(*width) * 8)
            }
            AttributeType::Float { width } => write!(f, "f{}", u32::from(*width) * 8),
        }
    }
}
