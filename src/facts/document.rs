//! Status document model.
//!
//! Devices answer `| display xml` commands with a small XML document. This
//! module parses that text into an element tree that can be walked by element
//! name. Namespace prefixes are dropped from element names, so
//! `<junos:comment>` is addressed as `comment`.
//!
//! Processing instructions, comments and `DOCTYPE` declarations are skipped.
//! Text outside the root element (CLI banners, prompts) is ignored.

use thiserror::Error;

/// Deepest element nesting accepted in a status document.
pub const MAX_DEPTH: usize = 256;

/// A status document that could not be parsed or has an unexpected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DocumentError(pub String);

impl DocumentError {
    /// Creates a new document error.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// One element of a status document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Local element name
    pub name: String,
    /// Attributes in document order, names with prefixes kept
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order
    pub children: Vec<Element>,
    text: String,
}

impl Element {
    /// Parse a document and return its root element.
    pub fn parse(input: &str) -> Result<Element, DocumentError> {
        let mut parser = Parser { input, pos: 0 };
        parser.skip_prolog()?;
        parser.parse_element(1)
    }

    /// Direct text content, trimmed.
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given name.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of the first direct child with the given name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(Element::text)
    }

    /// Follow a path of direct child names.
    pub fn path(&self, names: &[&str]) -> Option<&Element> {
        names.iter().try_fold(self, |el, name| el.child(name))
    }

    /// This element or its first descendant (depth-first) with the given name.
    pub fn find(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn error(&self, message: impl std::fmt::Display) -> DocumentError {
        DocumentError(format!("{} at offset {}", message, self.pos))
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Move past the next occurrence of `marker`.
    fn skip_past(&mut self, marker: &str) -> Result<(), DocumentError> {
        match self.rest().find(marker) {
            Some(idx) => {
                self.pos += idx + marker.len();
                Ok(())
            }
            None => Err(self.error(format!("unterminated construct, expected '{}'", marker))),
        }
    }

    fn expect(&mut self, token: &str) -> Result<(), DocumentError> {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", token)))
        }
    }

    /// Skip everything before the root element.
    fn skip_prolog(&mut self) -> Result<(), DocumentError> {
        loop {
            let rest = self.rest();
            if rest.starts_with("<?") {
                self.skip_past("?>")?;
            } else if rest.starts_with("<!--") {
                self.skip_past("-->")?;
            } else if rest.starts_with("<!") {
                self.skip_past(">")?;
            } else if rest.starts_with('<') {
                return Ok(());
            } else {
                match rest.find('<') {
                    Some(idx) => self.pos += idx,
                    None => return Err(DocumentError::new("document has no root element")),
                }
            }
        }
    }

    fn read_name(&mut self) -> Result<&'a str, DocumentError> {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '>' | '/' | '='))
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(self.error("expected a name"));
        }
        self.pos += end;
        Ok(&rest[..end])
    }

    fn parse_element(&mut self, depth: usize) -> Result<Element, DocumentError> {
        if depth > MAX_DEPTH {
            return Err(self.error(format!("elements nested deeper than {}", MAX_DEPTH)));
        }
        self.expect("<")?;
        let qualified = self.read_name()?;
        let mut element = Element {
            name: local_name(qualified).to_string(),
            ..Default::default()
        };

        loop {
            self.skip_whitespace();
            if self.rest().starts_with("/>") {
                self.pos += 2;
                return Ok(element);
            }
            if self.rest().starts_with('>') {
                self.pos += 1;
                break;
            }

            let key = self.read_name()?;
            self.skip_whitespace();
            self.expect("=")?;
            self.skip_whitespace();
            let quote = match self.rest().chars().next() {
                Some(q @ ('"' | '\'')) => q,
                _ => return Err(self.error("expected a quoted attribute value")),
            };
            self.pos += 1;
            let end = self
                .rest()
                .find(quote)
                .ok_or_else(|| self.error("unterminated attribute value"))?;
            let value = decode_entities(&self.rest()[..end]);
            self.pos += end + 1;
            element.attributes.push((key.to_string(), value));
        }

        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return Err(self.error(format!("unclosed element '{}'", qualified)));
            }

            if rest.starts_with("</") {
                self.pos += 2;
                let closing = self.read_name()?;
                if closing != qualified {
                    return Err(self.error(format!(
                        "mismatched closing tag '{}' for '{}'",
                        closing, qualified
                    )));
                }
                self.skip_whitespace();
                self.expect(">")?;
                return Ok(element);
            } else if rest.starts_with("<!--") {
                self.skip_past("-->")?;
            } else if let Some(cdata) = rest.strip_prefix("<![CDATA[") {
                let end = cdata
                    .find("]]>")
                    .ok_or_else(|| self.error("unterminated CDATA section"))?;
                element.text.push_str(&cdata[..end]);
                self.pos += "<![CDATA[".len() + end + 3;
            } else if rest.starts_with("<?") {
                self.skip_past("?>")?;
            } else if rest.starts_with('<') {
                let child = self.parse_element(depth + 1)?;
                element.children.push(child);
            } else {
                let end = rest.find('<').unwrap_or(rest.len());
                element.text.push_str(&decode_entities(&rest[..end]));
                self.pos += end;
            }
        }
    }
}

fn local_name(qualified: &str) -> &str {
    qualified
        .rsplit_once(':')
        .map(|(_, local)| local)
        .unwrap_or(qualified)
}

/// Replace the predefined and numeric character references.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp..];
        let decoded = after.find(';').and_then(|semi| {
            let entity = &after[1..semi];
            let ch = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => {
                    let code = if let Some(hex) = entity.strip_prefix("#x") {
                        u32::from_str_radix(hex, 16).ok()
                    } else if let Some(dec) = entity.strip_prefix('#') {
                        dec.parse().ok()
                    } else {
                        None
                    };
                    code.and_then(char::from_u32)
                }
            };
            ch.map(|c| (c, semi))
        });

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &after[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
