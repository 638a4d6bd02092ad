use std::fmt;
use std::str::FromStr;

use hashbrown::{HashMap, HashSet};
use serde::Deserialize;

use crate::errors::{IoToolsError, Result};

/// Characters removed from names unless configured otherwise.
pub const DEFAULT_DELETECHARS: &str = "~!@#$%^&*()-=+~\\|]}[{';: /?.>,<";

/// Names that always get a trailing underscore.
pub const DEFAULT_EXCLUDELIST: &[&str] = &["return", "file", "print"];

/// Template for synthesizing field names from an index.
///
/// Parsed from a printf style string containing exactly one integer
/// placeholder, e.g. "f%i", "field_%03i", "col%d". A literal percent sign is
/// written as "%%".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultNameFormat {
    prefix: String,
    suffix: String,
    /// Minimum number of digits.
    width: usize,
    /// Pad with zeros instead of spaces.
    zero_pad: bool,
}

impl DefaultNameFormat {
    pub fn parse(template: &str) -> Result<Self> {
        let invalid = || IoToolsError::InvalidNameFormat(template.to_string());

        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut placeholder: Option<(usize, bool)> = None;

        let mut chars = template.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                match placeholder {
                    Some(_) => suffix.push(c),
                    None => prefix.push(c),
                }
                continue;
            }

            if chars.peek() == Some(&'%') {
                chars.next();
                match placeholder {
                    Some(_) => suffix.push('%'),
                    None => prefix.push('%'),
                }
                continue;
            }

            if placeholder.is_some() {
                return Err(invalid());
            }

            let zero_pad = chars.next_if_eq(&'0').is_some();
            let mut width = 0;
            while let Some(d) = chars.next_if(|c| c.is_ascii_digit()) {
                width = width * 10 + (d as usize - '0' as usize);
            }

            match chars.next() {
                Some('i') | Some('d') => placeholder = Some((width, zero_pad)),
                _ => return Err(invalid()),
            }
        }

        let (width, zero_pad) = placeholder.ok_or_else(invalid)?;

        Ok(DefaultNameFormat {
            prefix,
            suffix,
            width,
            zero_pad,
        })
    }

    /// Produce the name for some index.
    pub fn format(&self, idx: usize) -> String {
        let width = self.width;
        if self.zero_pad {
            format!("{}{idx:0width$}{}", self.prefix, self.suffix)
        } else {
            format!("{}{idx:>width$}{}", self.prefix, self.suffix)
        }
    }
}

impl Default for DefaultNameFormat {
    /// The "f%i" format.
    fn default() -> Self {
        DefaultNameFormat {
            prefix: "f".to_string(),
            suffix: String::new(),
            width: 0,
            zero_pad: false,
        }
    }
}

impl FromStr for DefaultNameFormat {
    type Err = IoToolsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DefaultNameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let escape = |s: &str| s.replace('%', "%%");
        write!(f, "{}%", escape(&self.prefix))?;
        if self.zero_pad {
            write!(f, "0")?;
        }
        if self.width > 0 {
            write!(f, "{}", self.width)?;
        }
        write!(f, "i{}", escape(&self.suffix))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseSensitivity {
    /// Keep names as is.
    #[default]
    Sensitive,
    /// Force upper case.
    Upper,
    /// Force lower case.
    Lower,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ValidatorOptions {
    /// Names to exclude in addition to `DEFAULT_EXCLUDELIST`.
    pub excludelist: Vec<String>,
    /// Characters to delete from names, `None` uses `DEFAULT_DELETECHARS`.
    pub deletechars: Option<String>,
    pub case_sensitivity: CaseSensitivity,
    /// Replacement for spaces, applied before deleting characters.
    pub replace_space: Option<char>,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        ValidatorOptions {
            excludelist: Vec::new(),
            deletechars: None,
            case_sensitivity: CaseSensitivity::Sensitive,
            replace_space: Some('_'),
        }
    }
}

/// Cleans up a sequence of candidate field names.
///
/// Validated names have invalid characters removed, the case policy applied,
/// excluded names suffixed with '_', blanks replaced by synthesized names and
/// duplicates renamed with a '_<n>' suffix.
#[derive(Debug, Clone)]
pub struct NameValidator {
    excludelist: HashSet<String>,
    deletechars: HashSet<char>,
    case_sensitivity: CaseSensitivity,
    replace_space: Option<char>,
}

impl Default for NameValidator {
    fn default() -> Self {
        Self::new(ValidatorOptions::default())
    }
}

impl NameValidator {
    pub fn new(options: ValidatorOptions) -> Self {
        let excludelist = options
            .excludelist
            .into_iter()
            .chain(DEFAULT_EXCLUDELIST.iter().map(|s| s.to_string()))
            .collect();

        let mut deletechars: HashSet<char> = options
            .deletechars
            .as_deref()
            .unwrap_or(DEFAULT_DELETECHARS)
            .chars()
            .collect();
        deletechars.insert('"');

        NameValidator {
            excludelist,
            deletechars,
            case_sensitivity: options.case_sensitivity,
            replace_space: options.replace_space,
        }
    }

    pub fn case_sensitivity(&self) -> CaseSensitivity {
        self.case_sensitivity
    }

    /// Validate a list of names.
    ///
    /// Returns `None` when neither names nor a number of fields were provided.
    /// When `nbfields` is provided, the output is padded with synthesized names
    /// or truncated to exactly that many names.
    pub fn validate<S: AsRef<str>>(
        &self,
        names: Option<&[S]>,
        nbfields: Option<usize>,
        default_format: &DefaultNameFormat,
    ) -> Option<Vec<String>> {
        let mut names: Vec<&str> = match (names, nbfields) {
            (None, None) => return None,
            (None, Some(_)) => Vec::new(),
            (Some(names), _) => names.iter().map(|s| s.as_ref()).collect(),
        };

        if let Some(nbfields) = nbfields {
            names.resize(nbfields, "");
        }

        // Raw names, synthesized names skip over anything in here.
        let raw: HashSet<&str> = names.iter().copied().collect();

        let mut validated = Vec::with_capacity(names.len());
        // Last suffix used per name.
        let mut suffixes: HashMap<String, usize> = HashMap::with_capacity(names.len());
        let mut emitted: HashSet<String> = HashSet::with_capacity(names.len());
        let mut nbempty = 0;

        for name in names.iter().copied() {
            let mut item = self.clean(name);

            if item.is_empty() {
                item = default_format.format(nbempty);
                while raw.contains(item.as_str()) {
                    nbempty += 1;
                    item = default_format.format(nbempty);
                }
                nbempty += 1;
            } else if self.excludelist.contains(&item) {
                item.push('_');
            }

            // Suffixed names may collide with names given as input, keep
            // bumping until unique.
            let suffix = suffixes.entry(item.clone()).or_insert(0);
            let mut candidate = item.clone();
            while emitted.contains(&candidate) {
                *suffix += 1;
                candidate = format!("{item}_{suffix}");
            }

            emitted.insert(candidate.clone());
            validated.push(candidate);
        }

        Some(validated)
    }

    /// Apply case policy, trim, replace spaces and delete invalid characters.
    fn clean(&self, name: &str) -> String {
        let name = match self.case_sensitivity {
            CaseSensitivity::Sensitive => name.to_string(),
            CaseSensitivity::Upper => name.to_uppercase(),
            CaseSensitivity::Lower => name.to_lowercase(),
        };

        name.trim()
            .chars()
            .map(|c| match self.replace_space {
                Some(replacement) if c == ' ' => replacement,
                _ => c,
            })
            .filter(|c| !self.deletechars.contains(c))
            .collect()
    }
}
