//! Parsers for turning a single text token into a scalar value.
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use num::complex::Complex64;

use crate::datatype::PrimitiveType;
use crate::scalar::ScalarValue;

/// Logic for parsing a string into a scalar value.
///
/// Parsers are shared between converters through the type lattice, so they
/// take `&self` and must be thread safe.
pub trait Parser: fmt::Debug + Send + Sync {
    /// Parse a string, returning None if the parse cannot be done.
    fn parse(&self, s: &str) -> Option<ScalarValue>;
}

/// Case insensitive "true"/"false".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoolParser;

impl Parser for BoolParser {
    fn parse(&self, s: &str) -> Option<ScalarValue> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("true") {
            Some(ScalarValue::Boolean(true))
        } else if s.eq_ignore_ascii_case("false") {
            Some(ScalarValue::Boolean(false))
        } else {
            None
        }
    }
}

/// Parser that uses the stdlib `FromStr` trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FromStrParser<T: FromStr> {
    _type: PhantomData<T>,
}

impl<T: FromStr> FromStrParser<T> {
    pub const fn new() -> Self {
        FromStrParser { _type: PhantomData }
    }
}

impl<T> Parser for FromStrParser<T>
where
    T: FromStr + Into<ScalarValue> + fmt::Debug + Send + Sync,
{
    fn parse(&self, s: &str) -> Option<ScalarValue> {
        T::from_str(s.trim()).ok().map(Into::into)
    }
}

pub type Int64Parser = FromStrParser<i64>;
pub type Float32Parser = FromStrParser<f32>;
pub type Float64Parser = FromStrParser<f64>;

/// Integers within an inclusive range, produced as 64 bit values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRangeParser {
    min: i64,
    max: i64,
}

impl IntRangeParser {
    pub const fn new(min: i64, max: i64) -> Self {
        IntRangeParser { min, max }
    }
}

impl Parser for IntRangeParser {
    fn parse(&self, s: &str) -> Option<ScalarValue> {
        let v = i64::from_str(s.trim()).ok()?;
        (self.min..=self.max)
            .contains(&v)
            .then_some(ScalarValue::Int64(v))
    }
}

/// Parser that only accepts values representable by `datatype`.
///
/// Returns `None` for types whose values are already checked by the default
/// parser of their family.
pub fn parser_for_type(datatype: PrimitiveType) -> Option<Arc<dyn Parser>> {
    let (min, max) = match datatype {
        PrimitiveType::Int8 => (i64::from(i8::MIN), i64::from(i8::MAX)),
        PrimitiveType::Int16 => (i64::from(i16::MIN), i64::from(i16::MAX)),
        PrimitiveType::Int32 => (i64::from(i32::MIN), i64::from(i32::MAX)),
        PrimitiveType::UInt8 => (0, i64::from(u8::MAX)),
        PrimitiveType::UInt16 => (0, i64::from(u16::MAX)),
        PrimitiveType::UInt32 => (0, i64::from(u32::MAX)),
        // Values are stored as Int64.
        PrimitiveType::UInt64 => (0, i64::MAX),
        PrimitiveType::Float32 => return Some(Arc::new(Float32Parser::new())),
        _ => return None,
    };
    Some(Arc::new(IntRangeParser::new(min, max)))
}

/// Parse complex numbers written with a 'j' imaginary unit.
///
/// Example formats:
///
/// '1.5', '2j', '-1-2.5j', '(3+4J)', '1e-3+2e+1j'
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Complex128Parser;

impl Complex128Parser {
    fn parse_component(s: &str) -> Option<f64> {
        match s {
            "" | "+" => Some(1.0),
            "-" => Some(-1.0),
            s => f64::from_str(s).ok(),
        }
    }
}

impl Parser for Complex128Parser {
    fn parse(&self, s: &str) -> Option<ScalarValue> {
        let s = s.trim();
        let s = s
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .map(str::trim)
            .unwrap_or(s);

        if s.is_empty() {
            return None;
        }

        let body = match s.strip_suffix(['j', 'J']) {
            Some(body) => body,
            None => {
                // Real component only.
                let re = f64::from_str(s).ok()?;
                return Some(ScalarValue::Complex128(Complex64::new(re, 0.0)));
            }
        };

        // Find where the imaginary component starts. That's the last sign
        // that's not at the start and not part of an exponent.
        let bs = body.as_bytes();
        let split = (1..bs.len())
            .rev()
            .find(|&idx| matches!(bs[idx], b'+' | b'-') && !matches!(bs[idx - 1], b'e' | b'E'));

        let (re, im) = match split {
            Some(idx) => {
                let (re, im) = body.split_at(idx);
                (f64::from_str(re).ok()?, Self::parse_component(im)?)
            }
            None => (0.0, Self::parse_component(body)?),
        };

        Some(ScalarValue::Complex128(Complex64::new(re, im)))
    }
}

/// Accepts anything, producing the token as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utf8Parser;

impl Parser for Utf8Parser {
    fn parse(&self, s: &str) -> Option<ScalarValue> {
        Some(ScalarValue::Utf8(s.to_string()))
    }
}

/// Parse a string date using a strftime style format.
///
/// Example formats:
///
/// '1992-10-11' (the default '%Y-%m-%d')
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParser {
    format: String,
}

impl DateParser {
    pub fn new(format: impl Into<String>) -> Self {
        DateParser {
            format: format.into(),
        }
    }
}

impl Default for DateParser {
    fn default() -> Self {
        Self::new("%Y-%m-%d")
    }
}

impl Parser for DateParser {
    fn parse(&self, s: &str) -> Option<ScalarValue> {
        NaiveDate::parse_from_str(s.trim(), &self.format)
            .ok()
            .map(ScalarValue::Date)
    }
}

/// Wraps a closure as a parser.
#[derive(Clone)]
pub struct FnParser<F> {
    name: &'static str,
    func: F,
}

impl<F> FnParser<F>
where
    F: Fn(&str) -> Option<ScalarValue> + Send + Sync,
{
    pub fn new(name: &'static str, func: F) -> Self {
        FnParser { name, func }
    }
}

impl<F> fmt::Debug for FnParser<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnParser").field("name", &self.name).finish()
    }
}

impl<F> Parser for FnParser<F>
where
    F: Fn(&str) -> Option<ScalarValue> + Send + Sync,
{
    fn parse(&self, s: &str) -> Option<ScalarValue> {
        (self.func)(s)
    }
}
