//! Command template substitution.
//!
//! A command template is a line-oriented text file. Each line may carry
//! positional placeholders `{0}`, `{1}`, ... that are replaced with the
//! parameter tail of an inventory row. Rendered lines are joined with
//! [`COMMAND_SEPARATOR`] into a single command string.
//!
//! Substitution is purely textual: nothing is escaped and the resulting command
//! syntax is not validated. Brace text that is not `{` digits `}` is literal.
//!
//! # Example
//!
//! ```rust
//! use netfleet::template::CommandTemplate;
//!
//! let template = CommandTemplate::from_lines(vec![
//!     "set vlans v{0} vlan-id {0}".to_string(),
//!     "set interfaces {1} unit 0 family ethernet-switching vlan members v{0}".to_string(),
//! ]).unwrap();
//!
//! assert_eq!(template.width(), 2);
//! let command = template.render(&["120".to_string(), "ge-0/0/4".to_string()]).unwrap();
//! assert_eq!(
//!     command,
//!     "set vlans v120 vlan-id 120; set interfaces ge-0/0/4 unit 0 family ethernet-switching vlan members v120"
//! );
//! ```

use std::path::Path;

use crate::error::{Error, Result};

/// Separator placed between command lines when they are joined.
pub const COMMAND_SEPARATOR: &str = "; ";

/// One piece of a parsed template line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Literal text copied as-is.
    Text(String),
    /// Positional parameter reference.
    Param(usize),
}

/// A parsed, line-oriented command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    lines: Vec<Vec<Segment>>,
    width: usize,
}

impl CommandTemplate {
    /// Load a template from a file, one command per line.
    ///
    /// Blank lines are dropped. A missing or unreadable file is a run-level
    /// error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::template_load(path, e.to_string()))?;
        let template = Self::from_lines(read_command_lines(&content))?;
        if template.is_empty() {
            return Err(Error::template_load(path, "template contains no commands"));
        }
        Ok(template)
    }

    /// Parse a template from already-split lines.
    pub fn from_lines<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Vec::new();
        let mut width = 0;

        for (idx, line) in lines.into_iter().enumerate() {
            let segments = parse_line(line.as_ref(), idx + 1)?;
            for segment in &segments {
                if let Segment::Param(i) = segment {
                    width = width.max(i + 1);
                }
            }
            parsed.push(segments);
        }

        Ok(Self {
            lines: parsed,
            width,
        })
    }

    /// Number of parameters the template needs (`max index + 1`, or 0).
    pub fn width(&self) -> usize {
        self.width
    }

    /// Whether the template is used verbatim.
    pub fn is_static(&self) -> bool {
        self.width == 0
    }

    /// Number of command lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the template has no command lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Check the template against an inventory parameter-tail width.
    ///
    /// A static template fits any inventory. A parameterized template must use
    /// exactly as many parameters as the inventory provides.
    pub fn validate_width(&self, parameters: usize) -> Result<()> {
        if self.is_static() || self.width == parameters {
            Ok(())
        } else {
            Err(Error::PlaceholderMismatch {
                placeholders: self.width,
                parameters,
            })
        }
    }

    /// Render the template into one joined command string.
    ///
    /// With a static template the parameters are ignored and lines are joined
    /// verbatim.
    pub fn render(&self, params: &[String]) -> Result<String> {
        if !self.is_static() && params.len() < self.width {
            return Err(Error::PlaceholderMismatch {
                placeholders: self.width,
                parameters: params.len(),
            });
        }

        let rendered: Vec<String> = self
            .lines
            .iter()
            .map(|segments| {
                segments
                    .iter()
                    .map(|segment| match segment {
                        Segment::Text(text) => text.as_str(),
                        Segment::Param(i) => params[*i].as_str(),
                    })
                    .collect()
            })
            .collect();

        Ok(join_commands(&rendered))
    }
}

/// Join command lines with [`COMMAND_SEPARATOR`].
pub fn join_commands<S: AsRef<str>>(lines: &[S]) -> String {
    lines
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(COMMAND_SEPARATOR)
}

/// Split file content into command lines, dropping blank lines and trailing
/// whitespace.
pub fn read_command_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(String::from)
        .collect()
}

/// Split one template line into literal and parameter segments.
fn parse_line(line: &str, line_no: usize) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut rest = line;

    while let Some(open) = rest.find('{') {
        text.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match after.find('}') {
            Some(close) if is_index(&after[..close]) => {
                let digits = &after[..close];
                let index = digits.parse::<usize>().map_err(|e| Error::InvalidPlaceholder {
                    line: line_no,
                    message: format!("'{{{}}}': {}", digits, e),
                })?;
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Param(index));
                rest = &after[close + 1..];
            }
            _ => {
                text.push('{');
                rest = after;
            }
        }
    }

    text.push_str(rest);
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

fn is_index(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
