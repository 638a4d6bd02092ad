//! # Inference
//!
//! Infer a structured datatype from lines of delimited text.
//!
//! Steps:
//!
//! - Split each line into tokens, skipping lines with no tokens. The first
//!   record fixes the number of fields.
//!
//! - Infer types
//!
//! Every record except the first upgrades a converter per column. The first
//! record is held back since it may be a header.
//!
//! - Header inference
//!
//! Check if the first record fits the inferred types. If any field is
//! rejected, assume a header. Otherwise the first record is data and upgrades
//! the converters like every other record.
use tracing::debug;

use crate::config::{HeaderMode, InferenceOptions};
use crate::converter::{ConverterOptions, ConverterUpdate, StringConverter};
use crate::datatype::{DataType, Field, StructType};
use crate::errors::{IoToolsError, Result};
use crate::lattice::TypeLattice;
use crate::names::{DefaultNameFormat, NameValidator};
use crate::scalar::ScalarValue;
use crate::splitter::LineSplitter;

#[derive(Debug)]
pub struct RecordInference {
    lattice: TypeLattice,
    splitter: LineSplitter,
    validator: NameValidator,
    default_format: DefaultNameFormat,
    names: Option<Vec<String>>,
    missing_values: Vec<String>,
    header_mode: HeaderMode,
    /// First record, possibly a header.
    first: Option<Vec<String>>,
    converters: Vec<StringConverter>,
    /// Number of lines seen, including skipped lines.
    line: usize,
    /// Number of records used for type inference.
    records: usize,
}

impl RecordInference {
    pub fn try_new(lattice: &TypeLattice, options: InferenceOptions) -> Result<Self> {
        Ok(RecordInference {
            lattice: lattice.clone(),
            splitter: LineSplitter::new(options.splitter),
            validator: NameValidator::new(options.validator),
            default_format: DefaultNameFormat::parse(&options.default_format)?,
            names: options.names.map(|names| names.into_vec()),
            missing_values: options.missing_values,
            header_mode: options.has_header,
            first: None,
            converters: Vec::new(),
            line: 0,
            records: 0,
        })
    }

    /// Infer a schema from all lines.
    pub fn infer_from_lines<I, S>(
        lattice: &TypeLattice,
        options: InferenceOptions,
        lines: I,
    ) -> Result<InferredSchema>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut inference = Self::try_new(lattice, options)?;
        for line in lines {
            inference.observe_line(line.as_ref())?;
        }
        inference.finish()
    }

    /// Number of fields per record, known once a record has been observed.
    pub fn num_fields(&self) -> Option<usize> {
        self.first.as_ref().map(|first| first.len())
    }

    pub fn observe_line(&mut self, line: &str) -> Result<()> {
        self.line += 1;

        let tokens = self.splitter.split(line);
        if tokens.is_empty() {
            return Ok(());
        }

        let expected = match self.num_fields() {
            Some(n) => n,
            None => {
                self.converters = (0..tokens.len())
                    .map(|_| {
                        StringConverter::try_new(
                            &self.lattice,
                            ConverterOptions {
                                missing_values: self.missing_values.clone(),
                                ..Default::default()
                            },
                        )
                    })
                    .collect::<Result<Vec<_>>>()?;
                self.first = Some(tokens);
                return Ok(());
            }
        };

        if tokens.len() != expected {
            return Err(IoToolsError::InconsistentFieldCount {
                line: self.line,
                expected,
                got: tokens.len(),
            });
        }

        for (converter, token) in self.converters.iter_mut().zip(&tokens) {
            converter.upgrade(token)?;
        }
        self.records += 1;

        Ok(())
    }

    pub fn finish(mut self) -> Result<InferredSchema> {
        let first = self.first.take().ok_or(IoToolsError::NoRecords)?;

        let has_header = match self.header_mode {
            HeaderMode::Present => true,
            HeaderMode::Absent => false,
            HeaderMode::Auto => first
                .iter()
                .zip(&self.converters)
                .any(|(field, converter)| !converter.accepts(field)),
        };
        debug!(has_header, mode = ?self.header_mode, "header detection");

        if !has_header {
            for (converter, token) in self.converters.iter_mut().zip(&first) {
                converter.upgrade(token)?;
            }
            self.records += 1;
        }

        // Types are fixed from here on.
        for converter in &mut self.converters {
            converter.update(ConverterUpdate {
                locked: true,
                ..Default::default()
            });
        }

        let raw_names = match self.names.take() {
            Some(names) => Some(names),
            None if has_header => Some(first),
            None => None,
        };
        let names = self
            .validator
            .validate(
                raw_names.as_deref(),
                Some(self.converters.len()),
                &self.default_format,
            )
            .unwrap_or_default();

        let datatype = DataType::Struct(StructType::try_new(
            names
                .into_iter()
                .zip(&self.converters)
                .map(|(name, converter)| Field::new(name, converter.datatype())),
        )?);

        debug!(
            records = self.records,
            lines = self.line,
            %datatype,
            "inferred schema"
        );

        Ok(InferredSchema {
            datatype,
            has_header,
            splitter: self.splitter,
            converters: self.converters,
            line: 0,
        })
    }
}

/// Result of record inference.
#[derive(Debug, Clone)]
pub struct InferredSchema {
    /// Struct type with one field per column.
    pub datatype: DataType,
    /// Whether the first record was a header.
    pub has_header: bool,
    splitter: LineSplitter,
    converters: Vec<StringConverter>,
    /// Number of lines passed to `convert_line`.
    line: usize,
}

impl InferredSchema {
    /// Locked converters, one per column.
    pub fn converters(&self) -> &[StringConverter] {
        &self.converters
    }

    pub fn names(&self) -> Vec<&str> {
        match &self.datatype {
            DataType::Struct(s) => s.names().collect(),
            DataType::Primitive(_) => Vec::new(),
        }
    }

    /// Convert a line using the inferred types.
    ///
    /// Lines without tokens produce no values. Line numbers in errors count
    /// the lines passed to this method.
    pub fn convert_line(&mut self, line: &str) -> Result<Vec<ScalarValue>> {
        self.line += 1;
        let tokens = self.splitter.split(line);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        if tokens.len() != self.converters.len() {
            return Err(IoToolsError::InconsistentFieldCount {
                line: self.line,
                expected: self.converters.len(),
                got: tokens.len(),
            });
        }

        self.converters
            .iter_mut()
            .zip(&tokens)
            .map(|(converter, token)| converter.call(token))
            .collect()
    }
}
