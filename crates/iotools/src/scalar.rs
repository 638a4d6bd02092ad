use std::fmt;

use chrono::NaiveDate;
use num::complex::Complex64;

use crate::datatype::PrimitiveType;

/// A single value produced by converting a text token.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    /// No value. Only used as a default when nothing better is known.
    Null,

    /// True or false value
    Boolean(bool),

    /// Signed 64bit int
    Int64(i64),

    /// 64bit float
    Float64(f64),

    /// Complex with 64bit float components.
    Complex128(Complex64),

    /// Calendar date.
    Date(NaiveDate),

    /// Text, the value any token can be converted to.
    Utf8(String),
}

impl ScalarValue {
    /// Datatype of this value, `None` for null.
    pub fn datatype(&self) -> Option<PrimitiveType> {
        Some(match self {
            ScalarValue::Null => return None,
            ScalarValue::Boolean(_) => PrimitiveType::Boolean,
            ScalarValue::Int64(_) => PrimitiveType::Int64,
            ScalarValue::Float64(_) => PrimitiveType::Float64,
            ScalarValue::Complex128(_) => PrimitiveType::Complex128,
            ScalarValue::Date(_) => PrimitiveType::Date32,
            ScalarValue::Utf8(_) => PrimitiveType::Utf8,
        })
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// Compare two values treating NaN components as equal.
    ///
    /// Float lattice defaults are NaN which never compare equal with `==`.
    pub fn eq_nan_aware(&self, other: &ScalarValue) -> bool {
        fn feq(a: f64, b: f64) -> bool {
            (a.is_nan() && b.is_nan()) || a == b
        }

        match (self, other) {
            (ScalarValue::Float64(a), ScalarValue::Float64(b)) => feq(*a, *b),
            (ScalarValue::Complex128(a), ScalarValue::Complex128(b)) => {
                feq(a.re, b.re) && feq(a.im, b.im)
            }
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Complex128(v) => write!(f, "{}{:+}j", v.re, v.im),
            Self::Date(v) => write!(f, "{v}"),
            Self::Utf8(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Boolean(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int64(value)
    }
}

impl From<f32> for ScalarValue {
    fn from(value: f32) -> Self {
        ScalarValue::Float64(f64::from(value))
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float64(value)
    }
}

impl From<Complex64> for ScalarValue {
    fn from(value: Complex64) -> Self {
        ScalarValue::Complex128(value)
    }
}

impl From<NaiveDate> for ScalarValue {
    fn from(value: NaiveDate) -> Self {
        ScalarValue::Date(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Utf8(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Utf8(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_aware_equality() {
        assert!(ScalarValue::Float64(f64::NAN).eq_nan_aware(&ScalarValue::Float64(f64::NAN)));
        assert!(
            ScalarValue::Complex128(Complex64::new(f64::NAN, 0.0))
                .eq_nan_aware(&ScalarValue::Complex128(Complex64::new(f64::NAN, 0.0)))
        );
        assert!(!ScalarValue::Float64(1.0).eq_nan_aware(&ScalarValue::Int64(1)));
    }

    #[test]
    fn display_complex() {
        assert_eq!("1+2j", ScalarValue::from(Complex64::new(1.0, 2.0)).to_string());
        assert_eq!("0-1.5j", ScalarValue::from(Complex64::new(0.0, -1.5)).to_string());
    }
}
