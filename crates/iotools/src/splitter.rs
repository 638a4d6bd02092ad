use serde::Deserialize;

/// How a line is broken into fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Delimiter {
    /// Split on runs of whitespace.
    #[default]
    Whitespace,
    /// Split on every occurrence of some text, usually a single character.
    Text(String),
    /// Consecutive fields of the same width.
    Width(usize),
    /// Fields with the given widths, in order.
    Widths(Vec<usize>),
}

impl Delimiter {
    /// Normalize degenerate policies, an empty delimiter or a zero width
    /// means whitespace splitting.
    fn normalized(self) -> Self {
        match self {
            Delimiter::Text(s) if s.is_empty() => Delimiter::Whitespace,
            Delimiter::Width(0) => Delimiter::Whitespace,
            other => other,
        }
    }
}

impl From<&str> for Delimiter {
    fn from(value: &str) -> Self {
        Delimiter::Text(value.to_string())
    }
}

impl From<char> for Delimiter {
    fn from(value: char) -> Self {
        Delimiter::Text(value.to_string())
    }
}

impl From<usize> for Delimiter {
    fn from(value: usize) -> Self {
        Delimiter::Width(value)
    }
}

impl From<Vec<usize>> for Delimiter {
    fn from(value: Vec<usize>) -> Self {
        Delimiter::Widths(value)
    }
}

impl<const N: usize> From<[usize; N]> for Delimiter {
    fn from(value: [usize; N]) -> Self {
        Delimiter::Widths(value.to_vec())
    }
}

/// Config representation of a delimiter, `null`, a string, a width or a list
/// of widths.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DelimiterConfig {
    Width(usize),
    Widths(Vec<usize>),
    Text(String),
}

impl<'de> Deserialize<'de> for Delimiter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let config = Option::<DelimiterConfig>::deserialize(deserializer)?;
        Ok(match config {
            None => Delimiter::Whitespace,
            Some(DelimiterConfig::Width(w)) => Delimiter::Width(w),
            Some(DelimiterConfig::Widths(ws)) => Delimiter::Widths(ws),
            Some(DelimiterConfig::Text(s)) => Delimiter::Text(s),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SplitterOptions {
    pub delimiter: Delimiter,
    /// Comment marker, everything from the marker onwards is dropped.
    pub comments: Option<String>,
    /// Trim whitespace from every token.
    pub autostrip: bool,
}

impl Default for SplitterOptions {
    fn default() -> Self {
        SplitterOptions {
            delimiter: Delimiter::Whitespace,
            comments: Some("#".to_string()),
            autostrip: true,
        }
    }
}

/// Splits a single line of text into tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSplitter {
    delimiter: Delimiter,
    comments: Option<String>,
    autostrip: bool,
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self::new(SplitterOptions::default())
    }
}

impl From<Delimiter> for LineSplitter {
    fn from(delimiter: Delimiter) -> Self {
        Self::new(SplitterOptions {
            delimiter,
            ..Default::default()
        })
    }
}

impl LineSplitter {
    pub fn new(options: SplitterOptions) -> Self {
        LineSplitter {
            delimiter: options.delimiter.normalized(),
            comments: options.comments.filter(|c| !c.is_empty()),
            autostrip: options.autostrip,
        }
    }

    pub fn delimiter(&self) -> &Delimiter {
        &self.delimiter
    }

    /// Split a line into tokens.
    pub fn split(&self, line: &str) -> Vec<String> {
        let line = line.trim_end_matches(['\n', '\r']);
        let line = match &self.comments {
            Some(marker) => line.split(marker.as_str()).next().unwrap_or(line),
            None => line,
        };

        let tokens = match &self.delimiter {
            Delimiter::Whitespace => {
                return line.split_whitespace().map(|s| s.to_string()).collect();
            }
            Delimiter::Text(delim) => {
                // Only spaces, other whitespace may be the delimiter.
                let line = line.trim_matches([' ', '\r', '\n']);
                if line.is_empty() {
                    return Vec::new();
                }
                line.split(delim.as_str()).collect::<Vec<_>>()
            }
            Delimiter::Width(width) => {
                if line.is_empty() {
                    return Vec::new();
                }
                fixed_width_chunks(line, *width)
            }
            Delimiter::Widths(widths) => {
                if line.is_empty() {
                    return Vec::new();
                }
                variable_width_chunks(line, widths)
            }
        };

        tokens
            .into_iter()
            .map(|s| {
                if self.autostrip {
                    s.trim().to_string()
                } else {
                    s.to_string()
                }
            })
            .collect()
    }
}

/// Byte offset of the character at `char_idx`, clamped to the end of the
/// string.
fn char_offset(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(offset, _)| offset)
        .unwrap_or(s.len())
}

fn fixed_width_chunks(line: &str, width: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = line;
    while !rest.is_empty() {
        let (chunk, remaining) = rest.split_at(char_offset(rest, width));
        chunks.push(chunk);
        rest = remaining;
    }
    chunks
}

fn variable_width_chunks<'a>(line: &'a str, widths: &[usize]) -> Vec<&'a str> {
    let mut chunks = Vec::with_capacity(widths.len() + 1);
    let mut rest = line;
    for &width in widths {
        let (chunk, remaining) = rest.split_at(char_offset(rest, width));
        chunks.push(chunk);
        rest = remaining;
    }

    // Anything past the declared widths only counts if it has content.
    if !rest.trim().is_empty() {
        chunks.push(rest);
    }

    chunks
}
