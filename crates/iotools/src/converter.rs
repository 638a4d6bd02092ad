//! Per-column conversion of text tokens with type inference.
//!
//! A `StringConverter` is fed tokens from a single column. When unlocked, it
//! starts at the narrowest type of its lattice and widens whenever a token
//! can't be parsed by the current type. The catch-all entry at the end of the
//! lattice accepts anything, so an unlocked converter never fails.
//!
//! A converter created with a type hint is locked to that type for its
//! lifetime. Tokens the locked type can't represent are errors.
use std::sync::Arc;

use hashbrown::HashSet;
use tracing::{debug, trace};

use crate::datatype::PrimitiveType;
use crate::errors::{IoToolsError, Result, internal};
use crate::lattice::{LatticeEntry, TypeLattice};
use crate::parse::{self, Parser};
use crate::scalar::ScalarValue;

/// Split a comma separated list of missing value markers.
pub fn split_missing_values(s: &str) -> Vec<String> {
    s.split(',').map(|s| s.to_string()).collect()
}

/// Explicit type to lock a converter to.
#[derive(Debug, Clone)]
pub enum TypeHint {
    /// Use the lattice entry of the same family as this type. Integer types
    /// narrower than 64 bits and `Float32` only accept values in their range.
    Type(PrimitiveType),
    /// Use a caller provided parser.
    Parser(Arc<dyn Parser>),
}

impl From<PrimitiveType> for TypeHint {
    fn from(value: PrimitiveType) -> Self {
        TypeHint::Type(value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConverterOptions {
    pub type_hint: Option<TypeHint>,
    /// Value substituted for missing tokens. Kept across upgrades.
    pub default: Option<ScalarValue>,
    /// Tokens treated as missing in addition to the empty string.
    pub missing_values: Vec<String>,
}

/// Changes to apply to an existing converter.
#[derive(Debug, Clone, Default)]
pub struct ConverterUpdate {
    /// Pin the converter to this parser. This always locks the converter.
    pub parser: Option<Arc<dyn Parser>>,
    pub default: Option<ScalarValue>,
    /// Additional missing value markers.
    pub missing_values: Vec<String>,
    /// Lock the converter at its current type.
    pub locked: bool,
}

/// Where an unlocked converter currently sits.
///
/// The catch-all is tracked separately from the candidates since entries
/// registered later are inserted before it and would otherwise shift the
/// converter onto the new entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Candidate(usize),
    Terminal,
}

#[derive(Debug, Clone)]
enum ConverterState {
    Unlocked { position: Position },
    Locked { status: usize, entry: LatticeEntry },
}

#[derive(Debug, Clone)]
pub struct StringConverter {
    lattice: TypeLattice,
    state: ConverterState,
    /// Current value for missing tokens.
    default: ScalarValue,
    /// Default provided by the caller.
    explicit_default: Option<ScalarValue>,
    missing_values: HashSet<String>,
}

impl StringConverter {
    /// Create an unlocked converter with default options.
    pub fn new(lattice: &TypeLattice) -> Self {
        let position = Self::initial_position(lattice);
        let entry = Self::resolve_in(lattice, position);

        StringConverter {
            lattice: lattice.clone(),
            state: ConverterState::Unlocked { position },
            default: entry.default,
            explicit_default: None,
            missing_values: Self::missing_set(Vec::new()),
        }
    }

    pub fn try_new(lattice: &TypeLattice, options: ConverterOptions) -> Result<Self> {
        let missing_values = Self::missing_set(options.missing_values);
        let explicit_default = options.default;

        let (state, default) = match options.type_hint {
            None => {
                let position = Self::initial_position(lattice);
                let entry = Self::resolve_in(lattice, position);
                let default = explicit_default.clone().unwrap_or(entry.default);
                (ConverterState::Unlocked { position }, default)
            }
            Some(TypeHint::Type(datatype)) => {
                let status = lattice
                    .position_for_family(datatype.family())
                    .ok_or_else(|| IoToolsError::UnsupportedType(datatype.to_string()))?;
                let base = lattice
                    .entry(status)
                    .ok_or_else(|| internal!("missing lattice entry {status}"))?;

                // Narrower types get a parser that checks their range.
                let parser = parse::parser_for_type(datatype).unwrap_or(base.parser);
                let default = explicit_default.clone().unwrap_or(base.default);
                let entry = LatticeEntry::new(datatype, parser, default.clone(), base.name);

                (ConverterState::Locked { status, entry }, default)
            }
            Some(TypeHint::Parser(parser)) => {
                // Figure out what the parser produces.
                let datatype = explicit_default
                    .as_ref()
                    .and_then(|v| v.datatype())
                    .or_else(|| parser.parse("0").and_then(|v| v.datatype()))
                    .unwrap_or(PrimitiveType::Utf8);

                let (status, default) = match lattice.position_for_family(datatype.family()) {
                    Some(status) => {
                        let entry_default = lattice
                            .entry(status)
                            .map(|e| e.default)
                            .unwrap_or(ScalarValue::Null);
                        (status, explicit_default.clone().unwrap_or(entry_default))
                    }
                    None => (0, explicit_default.clone().unwrap_or(ScalarValue::Null)),
                };

                let entry = LatticeEntry::new(datatype, parser, default.clone(), "custom");

                (ConverterState::Locked { status, entry }, default)
            }
        };

        Ok(StringConverter {
            lattice: lattice.clone(),
            state,
            default,
            explicit_default,
            missing_values,
        })
    }

    fn missing_set(values: Vec<String>) -> HashSet<String> {
        let mut set: HashSet<String> = values.into_iter().collect();
        set.insert(String::new());
        set
    }

    fn initial_position(lattice: &TypeLattice) -> Position {
        if lattice.terminal_index() == 0 {
            Position::Terminal
        } else {
            Position::Candidate(0)
        }
    }

    fn resolve_in(lattice: &TypeLattice, position: Position) -> LatticeEntry {
        match position {
            Position::Candidate(idx) => lattice.entry(idx).unwrap_or_else(|| lattice.terminal()),
            Position::Terminal => lattice.terminal(),
        }
    }

    fn status_in(lattice: &TypeLattice, position: Position) -> usize {
        match position {
            Position::Candidate(idx) => idx,
            Position::Terminal => lattice.terminal_index(),
        }
    }

    /// Next position towards the catch-all.
    fn advance(&self, position: Position) -> Position {
        match position {
            Position::Candidate(idx) if idx + 1 < self.lattice.terminal_index() => {
                Position::Candidate(idx + 1)
            }
            _ => Position::Terminal,
        }
    }

    /// The entry currently used for parsing.
    fn current_entry(&self) -> LatticeEntry {
        match &self.state {
            ConverterState::Unlocked { position } => Self::resolve_in(&self.lattice, *position),
            ConverterState::Locked { entry, .. } => entry.clone(),
        }
    }

    /// Position of the converter in the lattice.
    pub fn status(&self) -> usize {
        match &self.state {
            ConverterState::Unlocked { position } => Self::status_in(&self.lattice, *position),
            ConverterState::Locked { status, .. } => *status,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.state, ConverterState::Locked { .. })
    }

    /// Type of the values currently produced.
    pub fn datatype(&self) -> PrimitiveType {
        match &self.state {
            ConverterState::Unlocked { position } => {
                Self::resolve_in(&self.lattice, *position).datatype
            }
            ConverterState::Locked { entry, .. } => entry.datatype,
        }
    }

    pub fn default(&self) -> &ScalarValue {
        &self.default
    }

    pub fn missing_values(&self) -> &HashSet<String> {
        &self.missing_values
    }

    pub fn lattice(&self) -> &TypeLattice {
        &self.lattice
    }

    fn is_missing(&self, token: &str) -> bool {
        self.missing_values.contains(token.trim())
    }

    /// Check if the current type accepts a token without changing anything.
    ///
    /// Missing tokens are always accepted.
    pub fn accepts(&self, token: &str) -> bool {
        self.is_missing(token) || self.current_entry().parser.parse(token).is_some()
    }

    /// Widen the converter until it can parse `token`, returning the parsed
    /// value.
    ///
    /// Missing tokens return the default without changing the type. Locked
    /// converters never change type and error if the token can't be parsed.
    pub fn upgrade(&mut self, token: &str) -> Result<ScalarValue> {
        if self.is_missing(token) {
            return Ok(self.default.clone());
        }

        let start = match &self.state {
            ConverterState::Locked { entry, .. } => {
                return entry
                    .parser
                    .parse(token)
                    .ok_or_else(|| IoToolsError::ConverterLocked {
                        token: token.to_string(),
                    });
            }
            ConverterState::Unlocked { position } => *position,
        };

        let mut position = start;
        loop {
            let entry = Self::resolve_in(&self.lattice, position);
            if let Some(value) = entry.parser.parse(token) {
                if position != start {
                    debug!(
                        %token,
                        from = Self::status_in(&self.lattice, start),
                        to = Self::status_in(&self.lattice, position),
                        datatype = %entry.datatype,
                        "upgraded converter"
                    );
                    self.state = ConverterState::Unlocked { position };
                    self.default = self.explicit_default.clone().unwrap_or(entry.default);
                }
                return Ok(value);
            }

            if position == Position::Terminal {
                return Err(internal!("catch-all entry rejected token '{token}'"));
            }

            trace!(%token, name = %entry.name, "candidate rejected token");
            position = self.advance(position);
        }
    }

    /// Upgrade using every token.
    pub fn iterate_upgrade<I, S>(&mut self, tokens: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for token in tokens {
            self.upgrade(token.as_ref())?;
        }
        Ok(())
    }

    /// Convert a token.
    ///
    /// Missing tokens produce the default. Tokens the current type can't parse
    /// widen an unlocked converter, and error for a locked one.
    pub fn call(&mut self, token: &str) -> Result<ScalarValue> {
        if self.is_missing(token) {
            return Ok(self.default.clone());
        }

        let entry = self.current_entry();
        if let Some(value) = entry.parser.parse(token) {
            return Ok(value);
        }

        if self.is_locked() {
            return Err(IoToolsError::ParseRejected {
                token: token.to_string(),
                datatype: entry.datatype.to_string(),
            });
        }

        self.upgrade(token)
    }

    /// Convert a token without ever changing the converter, producing the
    /// default for anything that can't be parsed.
    pub fn call_loose(&self, token: &str) -> ScalarValue {
        if self.is_missing(token) {
            return self.default.clone();
        }

        self.current_entry()
            .parser
            .parse(token)
            .unwrap_or_else(|| self.default.clone())
    }

    /// Apply changes to the converter.
    pub fn update(&mut self, update: ConverterUpdate) {
        if let Some(default) = update.default {
            self.default = default.clone();
            self.explicit_default = Some(default);
        }

        self.missing_values.extend(update.missing_values);

        let status = self.status();
        let current = self.current_entry();

        if let Some(parser) = update.parser {
            let datatype = self
                .default
                .datatype()
                .or_else(|| parser.parse("1").and_then(|v| v.datatype()))
                .unwrap_or(current.datatype);

            let entry = LatticeEntry::new(datatype, parser, self.default.clone(), "custom");
            self.state = ConverterState::Locked { status, entry };
        } else if update.locked && !self.is_locked() {
            self.state = ConverterState::Locked {
                status,
                entry: current,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use num::complex::Complex64;

    use super::*;
    use crate::parse::{DateParser, FnParser};

    fn date(y: i32, m: u32, d: u32) -> ScalarValue {
        ScalarValue::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn creation() {
        let lattice = TypeLattice::new();
        let converter = StringConverter::try_new(
            &lattice,
            ConverterOptions {
                type_hint: Some(PrimitiveType::Int64.into()),
                default: Some(ScalarValue::Int64(-99999)),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(1, converter.status());
        assert_eq!(&ScalarValue::Int64(-99999), converter.default());
        assert!(converter.is_locked());
    }

    #[test]
    fn creation_compatible_hint() {
        let lattice = TypeLattice::new();
        let converter = StringConverter::try_new(
            &lattice,
            ConverterOptions {
                type_hint: Some(PrimitiveType::Float32.into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(2, converter.status());
        assert_eq!(PrimitiveType::Float32, converter.datatype());
        assert!(converter.default().eq_nan_aware(&ScalarValue::Float64(f64::NAN)));
    }

    #[test]
    fn creation_unsupported_hint() {
        let lattice = TypeLattice::new();
        let got = StringConverter::try_new(
            &lattice,
            ConverterOptions {
                type_hint: Some(PrimitiveType::Date32.into()),
                ..Default::default()
            },
        );
        assert!(matches!(got, Err(IoToolsError::UnsupportedType(_))));
    }

    #[test]
    fn upgrade() {
        let lattice = TypeLattice::new();
        let mut converter = StringConverter::new(&lattice);
        assert_eq!(0, converter.status());
        assert_eq!(&ScalarValue::Boolean(false), converter.default());

        struct TestCase {
            token: &'static str,
            status: usize,
            value: ScalarValue,
        }

        let test_cases = [
            TestCase {
                token: "0",
                status: 1,
                value: ScalarValue::Int64(0),
            },
            TestCase {
                token: "0.",
                status: 2,
                value: ScalarValue::Float64(0.0),
            },
            TestCase {
                token: "0j",
                status: 3,
                value: ScalarValue::Complex128(Complex64::new(0.0, 0.0)),
            },
            TestCase {
                token: "a",
                status: lattice.len() - 1,
                value: ScalarValue::Utf8("a".to_string()),
            },
        ];

        for tc in test_cases {
            let value = converter.upgrade(tc.token).unwrap();
            assert_eq!(tc.status, converter.status(), "token: {}", tc.token);
            assert_eq!(tc.value, value, "token: {}", tc.token);
        }

        assert_eq!(PrimitiveType::Utf8, converter.datatype());
        assert_eq!(&ScalarValue::Utf8("???".to_string()), converter.default());
    }

    #[test]
    fn upgrade_skips_multiple_entries() {
        let lattice = TypeLattice::new();
        let mut converter = StringConverter::new(&lattice);
        converter.upgrade("1.5").unwrap();
        assert_eq!(2, converter.status());
    }

    #[test]
    fn upgrade_is_monotonic() {
        let lattice = TypeLattice::new();
        let mut converter = StringConverter::new(&lattice);
        converter.iterate_upgrade(["1", "2.5", "3", "true"]).unwrap();
        assert_eq!(lattice.terminal_index(), converter.status());

        let mut converter = StringConverter::new(&lattice);
        converter.iterate_upgrade(["2.5", "3"]).unwrap();
        assert_eq!(2, converter.status());
        assert_eq!(ScalarValue::Float64(3.0), converter.call("3").unwrap());
    }

    #[test]
    fn upgrade_missing_keeps_status() {
        let lattice = TypeLattice::new();
        let mut converter = StringConverter::new(&lattice);
        assert_eq!(ScalarValue::Boolean(false), converter.upgrade("").unwrap());
        assert_eq!(ScalarValue::Boolean(false), converter.upgrade("   ").unwrap());
        assert_eq!(0, converter.status());
        assert_eq!(ScalarValue::Boolean(true), converter.upgrade("TRUE").unwrap());
        assert_eq!(0, converter.status());
    }

    #[test]
    fn missing() {
        let lattice = TypeLattice::new();
        let mut converter = StringConverter::try_new(
            &lattice,
            ConverterOptions {
                missing_values: vec!["missing".to_string(), "missed".to_string()],
                ..Default::default()
            },
        )
        .unwrap();
        converter.upgrade("0").unwrap();

        assert_eq!(ScalarValue::Int64(0), converter.call("0").unwrap());
        let default = converter.default().clone();
        assert_eq!(ScalarValue::Int64(-1), default);
        assert_eq!(default, converter.call("").unwrap());
        assert_eq!(default, converter.call("missing").unwrap());
        assert_eq!(default, converter.call("missed").unwrap());

        // Not a missing marker, unlocked converters widen instead of failing.
        assert_eq!(
            ScalarValue::Utf8("miss".to_string()),
            converter.call("miss").unwrap()
        );
        assert_eq!(lattice.terminal_index(), converter.status());
    }

    #[test]
    fn locked_rejects() {
        let lattice = TypeLattice::new();
        let mut converter = StringConverter::try_new(
            &lattice,
            ConverterOptions {
                type_hint: Some(PrimitiveType::Int32.into()),
                missing_values: split_missing_values("N/A"),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(ScalarValue::Int64(4), converter.call("4").unwrap());
        assert_eq!(ScalarValue::Int64(-1), converter.call("N/A").unwrap());

        let got = converter.call("1.5");
        assert!(matches!(got, Err(IoToolsError::ParseRejected { .. })), "got: {got:?}");

        // Fits Int64 but not the requested width.
        let got = converter.call("1000000000000");
        assert!(matches!(got, Err(IoToolsError::ParseRejected { .. })), "got: {got:?}");
        assert!(!converter.accepts("2147483648"));
        assert!(converter.accepts("2147483647"));

        let got = converter.upgrade("abc");
        assert!(matches!(got, Err(IoToolsError::ConverterLocked { .. })), "got: {got:?}");

        // Nothing changed.
        assert_eq!(1, converter.status());
        assert_eq!(PrimitiveType::Int32, converter.datatype());
    }

    #[test]
    fn call_loose() {
        let lattice = TypeLattice::new();
        let mut converter = StringConverter::new(&lattice);
        converter.upgrade("1").unwrap();

        assert_eq!(ScalarValue::Int64(7), converter.call_loose("7"));
        assert_eq!(ScalarValue::Int64(-1), converter.call_loose("seven"));
        assert_eq!(1, converter.status());
    }

    #[test]
    fn accepts() {
        let lattice = TypeLattice::new();
        let mut converter = StringConverter::new(&lattice);
        converter.upgrade("1").unwrap();

        assert!(converter.accepts("12"));
        assert!(converter.accepts(""));
        assert!(!converter.accepts("1.5"));
        assert_eq!(1, converter.status());
    }

    #[test]
    fn upgrade_mapper() {
        let lattice = TypeLattice::new();
        lattice.register(Arc::new(DateParser::default()), date(2000, 1, 1));

        let mut converter = StringConverter::try_new(
            &lattice,
            ConverterOptions {
                type_hint: Some(TypeHint::Parser(Arc::new(DateParser::default()))),
                default: Some(date(2000, 1, 1)),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(date(2001, 1, 1), converter.call("2001-01-01").unwrap());
        assert_eq!(date(2009, 1, 1), converter.call("2009-01-01").unwrap());
        assert_eq!(date(2000, 1, 1), converter.call("").unwrap());
        assert_eq!(4, converter.status());
        assert_eq!(PrimitiveType::Date32, converter.datatype());
    }

    #[test]
    fn registered_entry_used_by_unlocked_converters() {
        let lattice = TypeLattice::new();
        let mut converter = StringConverter::new(&lattice);
        converter.upgrade("1").unwrap();

        // Registered after the converter was created.
        lattice.register(Arc::new(DateParser::default()), date(2000, 1, 1));

        assert_eq!(date(2001, 1, 1), converter.upgrade("2001-01-01").unwrap());
        assert_eq!(4, converter.status());
        assert_eq!(PrimitiveType::Date32, converter.datatype());
        assert_eq!(&date(2000, 1, 1), converter.default());
    }

    #[test]
    fn terminal_converter_stays_terminal_after_register() {
        let lattice = TypeLattice::new();
        let mut converter = StringConverter::new(&lattice);
        converter.upgrade("a").unwrap();
        assert_eq!(4, converter.status());

        lattice.register(Arc::new(DateParser::default()), date(2000, 1, 1));

        assert_eq!(5, converter.status());
        assert_eq!(PrimitiveType::Utf8, converter.datatype());
        assert_eq!(
            ScalarValue::Utf8("2001-01-01".to_string()),
            converter.call("2001-01-01").unwrap()
        );
    }

    #[test]
    fn string_to_object() {
        let lattice = TypeLattice::new();
        let parser = FnParser::new("strict_date", |s: &str| {
            NaiveDate::parse_from_str(s, "%a %b %d %H:%M:%S %Y")
                .ok()
                .map(ScalarValue::Date)
        });
        let converter = StringConverter::try_new(
            &lattice,
            ConverterOptions {
                type_hint: Some(TypeHint::Parser(Arc::new(parser))),
                ..Default::default()
            },
        )
        .unwrap();

        let complex = lattice.entry(lattice.len() - 2).unwrap();
        assert_eq!(
            Some(ScalarValue::Complex128(Complex64::new(0.0, 0.0))),
            complex.parser.parse("0")
        );
        // Parser couldn't tell us its type, fall back to text.
        assert_eq!(PrimitiveType::Utf8, converter.datatype());
        assert!(!converter.default().is_null());
    }

    #[test]
    fn keep_default() {
        for explicit in [-999, 0] {
            let lattice = TypeLattice::new();
            let mut converter = StringConverter::try_new(
                &lattice,
                ConverterOptions {
                    default: Some(ScalarValue::Int64(explicit)),
                    missing_values: split_missing_values(""),
                    ..Default::default()
                },
            )
            .unwrap();

            converter.upgrade("3.14159265").unwrap();
            assert_eq!(&ScalarValue::Int64(explicit), converter.default());
            assert_eq!(PrimitiveType::Float64, converter.datatype());
        }
    }

    #[test]
    fn keep_default_zero() {
        let lattice = TypeLattice::new();
        let converter = StringConverter::try_new(
            &lattice,
            ConverterOptions {
                type_hint: Some(PrimitiveType::Int64.into()),
                default: Some(ScalarValue::Int64(0)),
                missing_values: split_missing_values("N/A"),
            },
        )
        .unwrap();
        assert_eq!(&ScalarValue::Int64(0), converter.default());
    }

    #[test]
    fn keep_missing_values() {
        let lattice = TypeLattice::new();
        let converter = StringConverter::try_new(
            &lattice,
            ConverterOptions {
                type_hint: Some(PrimitiveType::Int64.into()),
                default: Some(ScalarValue::Int64(0)),
                missing_values: split_missing_values("N/A"),
            },
        )
        .unwrap();

        let expected: HashSet<String> = ["".to_string(), "N/A".to_string()].into_iter().collect();
        assert_eq!(&expected, converter.missing_values());
    }

    #[test]
    fn update_pins_parser() {
        let lattice = TypeLattice::new();
        let mut converter = StringConverter::new(&lattice);
        converter.upgrade("1").unwrap();

        converter.update(ConverterUpdate {
            parser: Some(Arc::new(DateParser::new("%d.%m.%Y"))),
            default: Some(date(1970, 1, 1)),
            missing_values: vec!["--".to_string()],
            locked: false,
        });

        assert!(converter.is_locked());
        assert_eq!(1, converter.status());
        assert_eq!(PrimitiveType::Date32, converter.datatype());
        assert_eq!(date(2024, 2, 29), converter.call("29.02.2024").unwrap());
        assert_eq!(date(1970, 1, 1), converter.call("--").unwrap());
        assert!(converter.missing_values().contains(""));
        assert!(converter.call("x").is_err());
    }

    #[test]
    fn update_lock_current() {
        let lattice = TypeLattice::new();
        let mut converter = StringConverter::new(&lattice);
        converter.upgrade("1.5").unwrap();

        converter.update(ConverterUpdate {
            locked: true,
            ..Default::default()
        });

        assert!(converter.is_locked());
        assert_eq!(PrimitiveType::Float64, converter.datatype());
        assert!(matches!(
            converter.upgrade("abc"),
            Err(IoToolsError::ConverterLocked { .. })
        ));
    }
}
