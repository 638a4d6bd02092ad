//! Building structured datatypes from loose type specifications.
use serde::Deserialize;
use tracing::trace;

use crate::datatype::{DataType, Field, PrimitiveType, StructType};
use crate::errors::Result;
use crate::names::{DefaultNameFormat, NameValidator};

/// Ways a datatype can be described.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpec {
    /// A single primitive type, shared by every named field.
    Scalar(PrimitiveType),
    /// Comma separated type tokens, e.g. "i4, f8".
    Delimited(String),
    /// Named fields.
    NamedPairs(Vec<(String, DataType)>),
    /// Unnamed fields.
    BareTypes(Vec<DataType>),
    /// An existing datatype.
    Descriptor(DataType),
}

impl From<PrimitiveType> for TypeSpec {
    fn from(value: PrimitiveType) -> Self {
        TypeSpec::Scalar(value)
    }
}

impl From<&str> for TypeSpec {
    fn from(value: &str) -> Self {
        TypeSpec::Delimited(value.to_string())
    }
}

impl From<DataType> for TypeSpec {
    fn from(value: DataType) -> Self {
        TypeSpec::Descriptor(value)
    }
}

impl From<StructType> for TypeSpec {
    fn from(value: StructType) -> Self {
        TypeSpec::Descriptor(DataType::Struct(value))
    }
}

/// Field names provided alongside a type spec.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Names {
    /// Comma separated names, e.g. "a, b".
    Delimited(String),
    List(Vec<String>),
}

impl Names {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Names::Delimited(s) => s.split(',').map(|s| s.to_string()).collect(),
            Names::List(names) => names,
        }
    }
}

impl From<&str> for Names {
    fn from(value: &str) -> Self {
        Names::Delimited(value.to_string())
    }
}

impl From<Vec<String>> for Names {
    fn from(value: Vec<String>) -> Self {
        Names::List(value)
    }
}

impl<const N: usize> From<[&str; N]> for Names {
    fn from(value: [&str; N]) -> Self {
        Names::List(value.iter().map(|s| s.to_string()).collect())
    }
}

/// A type spec normalized into its types and the names it carried.
enum Normalized {
    Primitive(PrimitiveType),
    Fields {
        types: Vec<DataType>,
        names: Option<Vec<String>>,
    },
}

impl Normalized {
    fn from_spec(spec: TypeSpec) -> Result<Self> {
        Ok(match spec {
            TypeSpec::Scalar(p) => Normalized::Primitive(p),
            TypeSpec::Delimited(s) => {
                let mut types = s
                    .split(',')
                    .map(|token| PrimitiveType::from_token(token.trim()))
                    .collect::<Result<Vec<_>>>()?;

                if types.len() == 1 {
                    Normalized::Primitive(types.remove(0))
                } else {
                    Normalized::Fields {
                        types: types.into_iter().map(DataType::Primitive).collect(),
                        names: None,
                    }
                }
            }
            TypeSpec::NamedPairs(pairs) => {
                let (names, types) = pairs.into_iter().unzip();
                Normalized::Fields {
                    types,
                    names: Some(names),
                }
            }
            TypeSpec::BareTypes(types) => Normalized::Fields { types, names: None },
            TypeSpec::Descriptor(DataType::Primitive(p)) => Normalized::Primitive(p),
            TypeSpec::Descriptor(DataType::Struct(s)) => Normalized::Fields {
                names: Some(s.names().map(|s| s.to_string()).collect()),
                types: s.datatypes().cloned().collect(),
            },
        })
    }
}

/// Build a datatype from a type spec and optional names using the default
/// name validator.
///
/// `default_format` is the template for synthesized names, e.g. "f%i".
pub fn easy_dtype(
    spec: impl Into<TypeSpec>,
    names: Option<Names>,
    default_format: &str,
) -> Result<DataType> {
    easy_dtype_with(spec, names, default_format, &NameValidator::default())
}

/// Build a datatype from a type spec and optional names.
///
/// A primitive with no names stays a primitive. A primitive with names
/// produces one field per name, all sharing the type. For multiple types,
/// explicit names win over carried names, extra names are dropped and missing
/// names are synthesized.
pub fn easy_dtype_with(
    spec: impl Into<TypeSpec>,
    names: Option<Names>,
    default_format: &str,
    validator: &NameValidator,
) -> Result<DataType> {
    let format = DefaultNameFormat::parse(default_format)?;
    let explicit = names.map(Names::into_vec);

    match Normalized::from_spec(spec.into())? {
        Normalized::Primitive(p) => match explicit {
            None => Ok(DataType::Primitive(p)),
            Some(names) => {
                let nbfields = names.len();
                let names = validate(validator, Some(names.as_slice()), nbfields, &format);
                build_struct(names.into_iter().map(|name| Field::new(name, p)))
            }
        },
        Normalized::Fields { types, names: carried } => {
            let nbfields = types.len();
            let names = match (explicit, carried) {
                (Some(names), _) => validate(validator, Some(names.as_slice()), nbfields, &format),
                (None, Some(carried)) => {
                    if format != DefaultNameFormat::default() && is_default_names(&carried) {
                        trace!(%format, "resynthesizing default field names");
                        validate::<String>(validator, None, nbfields, &format)
                    } else {
                        validate(validator, Some(carried.as_slice()), nbfields, &format)
                    }
                }
                (None, None) => validate::<String>(validator, None, nbfields, &format),
            };

            build_struct(
                names
                    .into_iter()
                    .zip(types)
                    .map(|(name, datatype)| Field::new(name, datatype)),
            )
        }
    }
}

fn validate<S: AsRef<str>>(
    validator: &NameValidator,
    names: Option<&[S]>,
    nbfields: usize,
    format: &DefaultNameFormat,
) -> Vec<String> {
    // Always produces names when a field count is given.
    validator
        .validate(names, Some(nbfields), format)
        .unwrap_or_default()
}

/// Check if names are exactly "f0", "f1", ...
fn is_default_names(names: &[String]) -> bool {
    let format = DefaultNameFormat::default();
    names
        .iter()
        .enumerate()
        .all(|(idx, name)| *name == format.format(idx))
}

fn build_struct(fields: impl IntoIterator<Item = Field>) -> Result<DataType> {
    Ok(DataType::Struct(StructType::try_new(fields)?))
}

/// Check if any field of a struct is itself a struct.
pub fn has_nested_fields(datatype: &DataType) -> bool {
    match datatype {
        DataType::Struct(s) => s.datatypes().any(|d| d.is_struct()),
        DataType::Primitive(_) => false,
    }
}

/// Collect the primitive types of a datatype, depth first.
pub fn flatten_dtype(datatype: &DataType) -> Vec<PrimitiveType> {
    let mut out = Vec::new();
    flatten_into(datatype, &mut out);
    out
}

fn flatten_into(datatype: &DataType, out: &mut Vec<PrimitiveType>) {
    match datatype {
        DataType::Primitive(p) => out.push(*p),
        DataType::Struct(s) => {
            for d in s.datatypes() {
                flatten_into(d, out);
            }
        }
    }
}
