//! Scalar coercion.
//!
//! Path, query, header and cookie values arrive as text. [`coerce`] turns one
//! into a JSON value of the target scalar type, which serde then moves into
//! the field. Integers are parsed base 10 and must fit the target width;
//! booleans accept exactly `true` and `false`; floats must be finite.

use bindery_types::ScalarKind;
use serde_json::Value;

use crate::error::CoercionError;

/// Convert `raw` into a value of `kind`.
pub fn coerce(field: &str, raw: &str, kind: ScalarKind) -> Result<Value, CoercionError> {
    let fail = || CoercionError {
        field: field.to_string(),
        raw: raw.to_string(),
        target: kind.name().to_string(),
    };

    macro_rules! int {
        ($ty:ty) => {
            raw.parse::<$ty>().map(Value::from).map_err(|_| fail())
        };
    }

    match kind {
        ScalarKind::Bool => raw.parse::<bool>().map(Value::Bool).map_err(|_| fail()),
        ScalarKind::I8 => int!(i8),
        ScalarKind::I16 => int!(i16),
        ScalarKind::I32 => int!(i32),
        ScalarKind::I64 => int!(i64),
        ScalarKind::Isize => int!(isize),
        ScalarKind::U8 => int!(u8),
        ScalarKind::U16 => int!(u16),
        ScalarKind::U32 => int!(u32),
        ScalarKind::U64 => int!(u64),
        ScalarKind::Usize => int!(usize),
        ScalarKind::F32 => match raw.parse::<f32>() {
            Ok(v) if v.is_finite() => Ok(Value::from(v)),
            _ => Err(fail()),
        },
        ScalarKind::F64 => match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Value::from(v)),
            _ => Err(fail()),
        },
        ScalarKind::Char => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::String(c.to_string())),
                _ => Err(fail()),
            }
        }
        ScalarKind::String => Ok(Value::String(raw.to_string())),
    }
}
