//! Tokenizing lines of text, validating field names and inferring column
//! types from text tokens.
pub mod config;
pub mod converter;
pub mod datatype;
pub mod dtype;
pub mod errors;
pub mod infer;
pub mod lattice;
pub mod names;
pub mod parse;
pub mod scalar;
pub mod splitter;

pub use config::{HeaderMode, InferenceOptions};
pub use converter::{ConverterOptions, ConverterUpdate, StringConverter, TypeHint};
pub use datatype::{DataType, Field, PrimitiveType, StructType};
pub use dtype::{Names, TypeSpec, easy_dtype, easy_dtype_with, flatten_dtype, has_nested_fields};
pub use errors::{IoToolsError, Result};
pub use infer::{InferredSchema, RecordInference};
pub use lattice::TypeLattice;
pub use names::{DefaultNameFormat, NameValidator};
pub use scalar::ScalarValue;
pub use splitter::{Delimiter, LineSplitter};
