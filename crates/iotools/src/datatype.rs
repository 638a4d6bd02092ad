use std::fmt;

use hashbrown::HashSet;

use crate::errors::{IoToolsError, Result};

/// Broad grouping of primitive types.
///
/// Lattice entries and type hints are matched on family rather than on the
/// exact type, e.g. an `Int32` hint pins a converter to the integer entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    Boolean,
    Integer,
    Float,
    Complex,
    Temporal,
    Text,
}

/// Non-nested element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float16,
    Float32,
    Float64,
    /// Complex with two 32-bit float components.
    Complex64,
    /// Complex with two 64-bit float components.
    Complex128,
    /// Calendar date with day resolution.
    Date32,
    /// Fixed-size byte string.
    Bytes(usize),
    /// Fixed-size unicode string, size in characters.
    Unicode(usize),
    /// Variable length text. This is the catch-all type any token can be
    /// represented as.
    Utf8,
}

impl PrimitiveType {
    /// Look up a primitive type from a shorthand token.
    ///
    /// Accepts array-protocol style codes with an optional byte order prefix
    /// ("i4", "<f8", "|S3", "c16", "M8[D]") as well as long names ("int32",
    /// "float", "object").
    pub fn from_token(token: &str) -> Result<Self> {
        let token = token.trim();
        let unknown = || IoToolsError::UnknownTypeToken(token.to_string());

        let code = token
            .strip_prefix(['<', '>', '|', '='])
            .unwrap_or(token);

        let typ = match code {
            "?" | "b1" | "bool" => Self::Boolean,
            "i1" | "int8" => Self::Int8,
            "i2" | "int16" => Self::Int16,
            "i4" | "int32" => Self::Int32,
            "i8" | "int64" | "int" => Self::Int64,
            "u1" | "uint8" => Self::UInt8,
            "u2" | "uint16" => Self::UInt16,
            "u4" | "uint32" => Self::UInt32,
            "u8" | "uint64" => Self::UInt64,
            "f2" | "float16" => Self::Float16,
            "f4" | "float32" => Self::Float32,
            "f8" | "float64" | "float" => Self::Float64,
            "c8" | "complex64" => Self::Complex64,
            "c16" | "complex128" | "complex" => Self::Complex128,
            "M8[D]" | "datetime64[D]" | "date" => Self::Date32,
            "O" | "object" | "str" | "U" => Self::Utf8,
            other => {
                // Sized strings, "S3", "a3", "U3".
                let (kind, size) = other.split_at_checked(1).ok_or_else(unknown)?;
                let size: usize = size.parse().map_err(|_| unknown())?;
                match kind {
                    "S" | "a" => Self::Bytes(size),
                    "U" => Self::Unicode(size),
                    _ => return Err(unknown()),
                }
            }
        };

        Ok(typ)
    }

    /// Canonical shorthand token for this type.
    pub fn token(&self) -> String {
        match self {
            Self::Boolean => "b1".to_string(),
            Self::Int8 => "i1".to_string(),
            Self::Int16 => "i2".to_string(),
            Self::Int32 => "i4".to_string(),
            Self::Int64 => "i8".to_string(),
            Self::UInt8 => "u1".to_string(),
            Self::UInt16 => "u2".to_string(),
            Self::UInt32 => "u4".to_string(),
            Self::UInt64 => "u8".to_string(),
            Self::Float16 => "f2".to_string(),
            Self::Float32 => "f4".to_string(),
            Self::Float64 => "f8".to_string(),
            Self::Complex64 => "c8".to_string(),
            Self::Complex128 => "c16".to_string(),
            Self::Date32 => "M8[D]".to_string(),
            Self::Bytes(n) => format!("S{n}"),
            Self::Unicode(n) => format!("U{n}"),
            Self::Utf8 => "O".to_string(),
        }
    }

    pub const fn family(&self) -> TypeFamily {
        match self {
            Self::Boolean => TypeFamily::Boolean,
            Self::Int8
            | Self::Int16
            | Self::Int32
            | Self::Int64
            | Self::UInt8
            | Self::UInt16
            | Self::UInt32
            | Self::UInt64 => TypeFamily::Integer,
            Self::Float16 | Self::Float32 | Self::Float64 => TypeFamily::Float,
            Self::Complex64 | Self::Complex128 => TypeFamily::Complex,
            Self::Date32 => TypeFamily::Temporal,
            Self::Bytes(_) | Self::Unicode(_) | Self::Utf8 => TypeFamily::Text,
        }
    }

    pub const fn is_numeric(&self) -> bool {
        matches!(
            self.family(),
            TypeFamily::Integer | TypeFamily::Float | TypeFamily::Complex
        )
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "Boolean"),
            Self::Int8 => write!(f, "Int8"),
            Self::Int16 => write!(f, "Int16"),
            Self::Int32 => write!(f, "Int32"),
            Self::Int64 => write!(f, "Int64"),
            Self::UInt8 => write!(f, "UInt8"),
            Self::UInt16 => write!(f, "UInt16"),
            Self::UInt32 => write!(f, "UInt32"),
            Self::UInt64 => write!(f, "UInt64"),
            Self::Float16 => write!(f, "Float16"),
            Self::Float32 => write!(f, "Float32"),
            Self::Float64 => write!(f, "Float64"),
            Self::Complex64 => write!(f, "Complex64"),
            Self::Complex128 => write!(f, "Complex128"),
            Self::Date32 => write!(f, "Date32"),
            Self::Bytes(n) => write!(f, "Bytes({n})"),
            Self::Unicode(n) => write!(f, "Unicode({n})"),
            Self::Utf8 => write!(f, "Utf8"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub datatype: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, datatype: impl Into<DataType>) -> Self {
        Field {
            name: name.into(),
            datatype: datatype.into(),
        }
    }
}

/// Ordered set of uniquely named fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructType {
    fields: Vec<Field>,
}

impl StructType {
    /// Create a new struct type, erroring if any field name is repeated.
    pub fn try_new(fields: impl IntoIterator<Item = Field>) -> Result<Self> {
        let fields: Vec<_> = fields.into_iter().collect();

        {
            let mut seen = HashSet::with_capacity(fields.len());
            for field in &fields {
                if !seen.insert(field.name.as_str()) {
                    return Err(IoToolsError::DuplicateFieldName(field.name.clone()));
                }
            }
        }

        Ok(StructType { fields })
    }

    /// Create a struct type from (name, type) pairs.
    pub fn try_from_pairs<S, T>(pairs: impl IntoIterator<Item = (S, T)>) -> Result<Self>
    where
        S: Into<String>,
        T: Into<DataType>,
    {
        Self::try_new(
            pairs
                .into_iter()
                .map(|(name, datatype)| Field::new(name, datatype)),
        )
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn names(&self) -> impl ExactSizeIterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn datatypes(&self) -> impl ExactSizeIterator<Item = &DataType> {
        self.fields.iter().map(|f| &f.datatype)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A primitive type or a (possibly nested) structured type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Primitive(PrimitiveType),
    Struct(StructType),
}

impl DataType {
    /// Look up a primitive datatype from a shorthand token.
    pub fn from_token(token: &str) -> Result<Self> {
        Ok(DataType::Primitive(PrimitiveType::from_token(token)?))
    }

    pub const fn is_struct(&self) -> bool {
        matches!(self, DataType::Struct(_))
    }

    pub fn try_as_struct(&self) -> Option<&StructType> {
        match self {
            DataType::Struct(s) => Some(s),
            DataType::Primitive(_) => None,
        }
    }

    pub fn try_as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            DataType::Primitive(p) => Some(*p),
            DataType::Struct(_) => None,
        }
    }
}

impl From<PrimitiveType> for DataType {
    fn from(value: PrimitiveType) -> Self {
        DataType::Primitive(value)
    }
}

impl From<StructType> for DataType {
    fn from(value: StructType) -> Self {
        DataType::Struct(value)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => write!(f, "{p}"),
            Self::Struct(s) => {
                write!(
                    f,
                    "Struct {{{}}}",
                    s.fields
                        .iter()
                        .map(|field| format!("{}: {}", field.name, field.datatype))
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        }
    }
}
