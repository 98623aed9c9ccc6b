//! Declared coercion rules from [`FieldValue`] into concrete field types.
//!
//! Every settable field type implements [`FromFieldValue`]. A value whose shape
//! already matches the target is assigned directly; anything else goes through
//! the conversions below:
//!
//! | Target | Accepts |
//! |--------|---------|
//! | `String` | strings, rendered scalars |
//! | `i8..i64`, `isize` | ints, uints, truncated floats, decimal strings (overflow checked) |
//! | `u8..u64`, `usize` | non-negative numbers, decimal strings (overflow checked) |
//! | `f32`, `f64` | any number, float strings |
//! | `bool` | bools, `1/t/true/0/f/false` literals, integers |
//! | `Vec<T>` | lists, coerced element-wise |
//! | `HashMap<K, V>` | maps, keys and values coerced recursively |
//! | `Option<T>` | null as `None`, otherwise `Some(T)` |

use std::collections::HashMap;
use std::hash::Hash;

use thiserror::Error;

use crate::value::FieldValue;

/// Why a coercion failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionErrorKind {
    #[error("cannot convert {from} to {to}")]
    Mismatch { from: &'static str, to: &'static str },

    #[error("{0} overflow")]
    Overflow(&'static str),

    #[error("cannot convert negative value to {0}")]
    Negative(&'static str),

    #[error("invalid {to} literal {literal:?}")]
    Parse { to: &'static str, literal: String },

    #[error("cannot set null to non-optional field")]
    Null,
}

/// A coercion failure, tagged with the (possibly nested) field path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field {field}: {kind}")]
pub struct CoercionError {
    pub field: String,
    pub kind: CoercionErrorKind,
}

impl CoercionError {
    pub fn new(field: &str, kind: CoercionErrorKind) -> Self {
        Self {
            field: field.to_string(),
            kind,
        }
    }

    fn mismatch(field: &str, value: &FieldValue, to: &'static str) -> Self {
        Self::new(
            field,
            CoercionErrorKind::Mismatch {
                from: value.type_name(),
                to,
            },
        )
    }
}

/// Conversion from a [`FieldValue`] into a concrete field type.
pub trait FromFieldValue: Sized {
    /// Convert `value`, naming `field` in any error.
    fn from_field_value(value: FieldValue, field: &str) -> Result<Self, CoercionError>;
}

impl FromFieldValue for FieldValue {
    fn from_field_value(value: FieldValue, _field: &str) -> Result<Self, CoercionError> {
        Ok(value)
    }
}

impl FromFieldValue for String {
    fn from_field_value(value: FieldValue, field: &str) -> Result<Self, CoercionError> {
        match value {
            FieldValue::String(s) => Ok(s),
            v @ (FieldValue::Int(_)
            | FieldValue::UInt(_)
            | FieldValue::Float(_)
            | FieldValue::Bool(_)) => Ok(v.to_string()),
            FieldValue::Null => Err(CoercionError::new(field, CoercionErrorKind::Null)),
            other => Err(CoercionError::mismatch(field, &other, "string")),
        }
    }
}

fn to_i64(value: &FieldValue, field: &str, to: &'static str) -> Result<i64, CoercionError> {
    match value {
        FieldValue::Int(v) => Ok(*v),
        FieldValue::UInt(v) => {
            i64::try_from(*v).map_err(|_| CoercionError::new(field, CoercionErrorKind::Overflow(to)))
        }
        FieldValue::Float(v) => {
            if v.is_finite() && *v >= i64::MIN as f64 && *v < i64::MAX as f64 {
                Ok(*v as i64)
            } else {
                Err(CoercionError::new(field, CoercionErrorKind::Overflow(to)))
            }
        }
        FieldValue::String(s) => s.parse::<i64>().map_err(|_| {
            CoercionError::new(
                field,
                CoercionErrorKind::Parse {
                    to,
                    literal: s.clone(),
                },
            )
        }),
        FieldValue::Null => Err(CoercionError::new(field, CoercionErrorKind::Null)),
        other => Err(CoercionError::mismatch(field, other, to)),
    }
}

fn to_u64(value: &FieldValue, field: &str, to: &'static str) -> Result<u64, CoercionError> {
    match value {
        FieldValue::UInt(v) => Ok(*v),
        FieldValue::Int(v) => {
            u64::try_from(*v).map_err(|_| CoercionError::new(field, CoercionErrorKind::Negative(to)))
        }
        FieldValue::Float(v) => {
            if *v < 0.0 {
                Err(CoercionError::new(field, CoercionErrorKind::Negative(to)))
            } else if v.is_finite() && *v < u64::MAX as f64 {
                Ok(*v as u64)
            } else {
                Err(CoercionError::new(field, CoercionErrorKind::Overflow(to)))
            }
        }
        FieldValue::String(s) => s.parse::<u64>().map_err(|_| {
            CoercionError::new(
                field,
                CoercionErrorKind::Parse {
                    to,
                    literal: s.clone(),
                },
            )
        }),
        FieldValue::Null => Err(CoercionError::new(field, CoercionErrorKind::Null)),
        other => Err(CoercionError::mismatch(field, other, to)),
    }
}

macro_rules! impl_signed {
    ($($t:ty),*) => {
        $(impl FromFieldValue for $t {
            fn from_field_value(value: FieldValue, field: &str) -> Result<Self, CoercionError> {
                let wide = to_i64(&value, field, stringify!($t))?;
                <$t>::try_from(wide)
                    .map_err(|_| CoercionError::new(field, CoercionErrorKind::Overflow(stringify!($t))))
            }
        })*
    };
}

macro_rules! impl_unsigned {
    ($($t:ty),*) => {
        $(impl FromFieldValue for $t {
            fn from_field_value(value: FieldValue, field: &str) -> Result<Self, CoercionError> {
                let wide = to_u64(&value, field, stringify!($t))?;
                <$t>::try_from(wide)
                    .map_err(|_| CoercionError::new(field, CoercionErrorKind::Overflow(stringify!($t))))
            }
        })*
    };
}

impl_signed!(i8, i16, i32, i64, isize);
impl_unsigned!(u8, u16, u32, u64, usize);

impl FromFieldValue for f64 {
    fn from_field_value(value: FieldValue, field: &str) -> Result<Self, CoercionError> {
        match value {
            FieldValue::Float(v) => Ok(v),
            FieldValue::Int(v) => Ok(v as f64),
            FieldValue::UInt(v) => Ok(v as f64),
            FieldValue::String(s) => s.parse::<f64>().map_err(|_| {
                CoercionError::new(
                    field,
                    CoercionErrorKind::Parse {
                        to: "f64",
                        literal: s,
                    },
                )
            }),
            FieldValue::Null => Err(CoercionError::new(field, CoercionErrorKind::Null)),
            other => Err(CoercionError::mismatch(field, &other, "f64")),
        }
    }
}

impl FromFieldValue for f32 {
    fn from_field_value(value: FieldValue, field: &str) -> Result<Self, CoercionError> {
        let wide = f64::from_field_value(value, field)?;
        if wide.is_finite() && wide.abs() > f32::MAX as f64 {
            return Err(CoercionError::new(field, CoercionErrorKind::Overflow("f32")));
        }
        Ok(wide as f32)
    }
}

impl FromFieldValue for bool {
    fn from_field_value(value: FieldValue, field: &str) -> Result<Self, CoercionError> {
        match value {
            FieldValue::Bool(v) => Ok(v),
            FieldValue::Int(v) => Ok(v != 0),
            FieldValue::UInt(v) => Ok(v != 0),
            FieldValue::String(s) => parse_bool_literal(&s).ok_or(CoercionError::new(
                field,
                CoercionErrorKind::Parse {
                    to: "bool",
                    literal: s,
                },
            )),
            FieldValue::Null => Err(CoercionError::new(field, CoercionErrorKind::Null)),
            other => Err(CoercionError::mismatch(field, &other, "bool")),
        }
    }
}

/// Strict boolean literals: `1 t T TRUE true True` and `0 f F FALSE false False`.
pub fn parse_bool_literal(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

impl<T: FromFieldValue> FromFieldValue for Option<T> {
    fn from_field_value(value: FieldValue, field: &str) -> Result<Self, CoercionError> {
        match value {
            FieldValue::Null => Ok(None),
            other => T::from_field_value(other, field).map(Some),
        }
    }
}

impl<T: FromFieldValue> FromFieldValue for Vec<T> {
    fn from_field_value(value: FieldValue, field: &str) -> Result<Self, CoercionError> {
        match value {
            FieldValue::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| T::from_field_value(item, &format!("{}[{}]", field, i)))
                .collect(),
            other => Err(CoercionError::mismatch(field, &other, "list")),
        }
    }
}

impl<K, V> FromFieldValue for HashMap<K, V>
where
    K: FromFieldValue + Eq + Hash,
    V: FromFieldValue,
{
    fn from_field_value(value: FieldValue, field: &str) -> Result<Self, CoercionError> {
        match value {
            FieldValue::Map(entries) => {
                let mut map = HashMap::with_capacity(entries.len());
                for (k, v) in entries {
                    let label = format!("{}[{}]", field, k);
                    let key = K::from_field_value(k, &format!("{}.key", field))?;
                    let val = V::from_field_value(v, &label)?;
                    map.insert(key, val);
                }
                Ok(map)
            }
            other => Err(CoercionError::mismatch(field, &other, "map")),
        }
    }
}
