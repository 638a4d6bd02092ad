//! Ordered candidate types used for inferring the type of a column.
//!
//! Entries are ordered from the narrowest to the widest type. A converter
//! starts at the first entry and only ever moves towards the end. The last
//! entry is the catch-all "object" entry which accepts any token.
//!
//! New entries are registered immediately before the catch-all, so the
//! built-in order is always preserved.
use std::sync::Arc;

use num::complex::Complex64;
use parking_lot::RwLock;
use tracing::debug;

use crate::datatype::{PrimitiveType, TypeFamily};
use crate::parse::{BoolParser, Complex128Parser, Float64Parser, Int64Parser, Parser, Utf8Parser};
use crate::scalar::ScalarValue;

/// Default used by the catch-all entry.
pub const OBJECT_DEFAULT: &str = "???";

/// A single candidate type.
#[derive(Debug, Clone)]
pub struct LatticeEntry {
    pub datatype: PrimitiveType,
    pub parser: Arc<dyn Parser>,
    pub default: ScalarValue,
    /// Human readable name, used in logs.
    pub name: String,
}

impl LatticeEntry {
    pub fn new(
        datatype: PrimitiveType,
        parser: Arc<dyn Parser>,
        default: ScalarValue,
        name: impl Into<String>,
    ) -> Self {
        LatticeEntry {
            datatype,
            parser,
            default,
            name: name.into(),
        }
    }

    pub fn family(&self) -> TypeFamily {
        self.datatype.family()
    }
}

/// Caller owned registry of candidate types.
///
/// Cloning produces a handle to the same registry. Converters created from a
/// lattice observe entries registered after they were created.
#[derive(Debug, Clone)]
pub struct TypeLattice {
    entries: Arc<RwLock<Vec<LatticeEntry>>>,
}

impl Default for TypeLattice {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeLattice {
    /// Create a lattice with the builtin entries, bool -> int -> float ->
    /// complex -> object.
    pub fn new() -> Self {
        let entries = vec![
            LatticeEntry::new(
                PrimitiveType::Boolean,
                Arc::new(BoolParser),
                ScalarValue::Boolean(false),
                "bool",
            ),
            LatticeEntry::new(
                PrimitiveType::Int64,
                Arc::new(Int64Parser::new()),
                ScalarValue::Int64(-1),
                "int",
            ),
            LatticeEntry::new(
                PrimitiveType::Float64,
                Arc::new(Float64Parser::new()),
                ScalarValue::Float64(f64::NAN),
                "float",
            ),
            LatticeEntry::new(
                PrimitiveType::Complex128,
                Arc::new(Complex128Parser),
                ScalarValue::Complex128(Complex64::new(f64::NAN, 0.0)),
                "complex",
            ),
            Self::object_entry(),
        ];

        TypeLattice {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    fn object_entry() -> LatticeEntry {
        LatticeEntry::new(
            PrimitiveType::Utf8,
            Arc::new(Utf8Parser),
            ScalarValue::Utf8(OBJECT_DEFAULT.to_string()),
            "object",
        )
    }

    /// Number of entries, including the catch-all.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Index of the catch-all entry.
    pub fn terminal_index(&self) -> usize {
        self.len() - 1
    }

    pub fn entry(&self, idx: usize) -> Option<LatticeEntry> {
        self.entries.read().get(idx).cloned()
    }

    /// Get the catch-all entry.
    pub fn terminal(&self) -> LatticeEntry {
        let entries = self.entries.read();
        match entries.last() {
            Some(entry) => entry.clone(),
            None => Self::object_entry(),
        }
    }

    /// Snapshot of all entries.
    pub fn entries(&self) -> Vec<LatticeEntry> {
        self.entries.read().clone()
    }

    /// Find the first entry belonging to the given family.
    pub fn position_for_family(&self, family: TypeFamily) -> Option<usize> {
        self.entries
            .read()
            .iter()
            .position(|entry| entry.family() == family)
    }

    /// Register a new candidate type immediately before the catch-all entry.
    ///
    /// The datatype of the entry is taken from the default value. A null
    /// default registers a text entry.
    pub fn register(&self, parser: Arc<dyn Parser>, default: ScalarValue) {
        let datatype = default.datatype().unwrap_or(PrimitiveType::Utf8);
        let name = format!("{datatype}");
        self.register_entry(LatticeEntry::new(datatype, parser, default, name));
    }

    /// Register a fully specified entry immediately before the catch-all.
    pub fn register_entry(&self, entry: LatticeEntry) {
        let mut entries = self.entries.write();
        let idx = entries.len().saturating_sub(1);
        debug!(name = %entry.name, datatype = %entry.datatype, %idx, "registering lattice entry");
        entries.insert(idx, entry);
    }

    /// Register multiple entries, preserving their order.
    pub fn register_all(&self, entries: impl IntoIterator<Item = (Arc<dyn Parser>, ScalarValue)>) {
        for (parser, default) in entries {
            self.register(parser, default);
        }
    }
}
