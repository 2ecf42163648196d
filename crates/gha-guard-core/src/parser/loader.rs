//! YAML loading with source positions.
//!
//! `serde_yaml` produces the generic value tree. It does not expose
//! positions, so a second pass over the source text follows block
//! indentation and records the starting line of every mapping node in a
//! side table keyed by the node's path from the root. User data never
//! carries the line metadata.

use crate::error::WorkflowError;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;

/// One step in the address of a node, from the document root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    pub fn key(name: impl Into<String>) -> Self {
        PathSegment::Key(name.into())
    }
}

/// Starting line (1-indexed) of each mapping node, keyed by node path.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    lines: HashMap<Vec<PathSegment>, usize>,
}

impl LineIndex {
    pub fn line_of(&self, path: &[PathSegment]) -> Option<usize> {
        self.lines.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// A parsed YAML document whose root is known to be a mapping.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub root: Mapping,
    pub lines: LineIndex,
}

/// Load YAML text into a mapping plus its line side table.
pub fn load(content: &str, source_file: &str) -> Result<LoadedDocument, WorkflowError> {
    let value: Value =
        serde_yaml::from_str(content).map_err(|source| WorkflowError::Format {
            source_file: source_file.to_string(),
            source,
        })?;

    let root = match value {
        Value::Mapping(map) => map,
        other => {
            tracing::debug!(
                file = source_file,
                found = kind_of(&other),
                "Workflow root is not a mapping"
            );
            return Err(WorkflowError::Schema {
                source_file: source_file.to_string(),
                found: kind_of(&other),
            });
        }
    };

    Ok(LoadedDocument {
        root,
        lines: index_lines(content),
    })
}

/// Text form of a mapping key, as it appears in a [`PathSegment::Key`].
pub fn key_text(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Human-readable name of a YAML node's shape.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn index_lines(content: &str) -> LineIndex {
    let mut scanner = BlockScanner::default();
    for (i, raw) in content.lines().enumerate() {
        if !scanner.line(i + 1, raw) {
            break;
        }
    }
    LineIndex {
        lines: scanner.lines,
    }
}

#[derive(Debug)]
enum FrameKind {
    Mapping,
    Sequence { next: usize },
}

#[derive(Debug)]
struct Frame {
    indent: usize,
    path: Vec<PathSegment>,
    kind: FrameKind,
}

/// A key whose value has not started yet (`key:` at the end of a line).
#[derive(Debug)]
struct Pending {
    indent: usize,
    path: Vec<PathSegment>,
}

/// Indentation-driven walk over block-style YAML.
///
/// Only block collections are tracked. Flow collections record the line
/// they open on when they are a mapping value and are otherwise opaque.
#[derive(Debug, Default)]
struct BlockScanner {
    stack: Vec<Frame>,
    pending: Option<Pending>,
    /// Indent of the key owning a `|` or `>` scalar; deeper lines are text.
    block_scalar: Option<usize>,
    seen_content: bool,
    lines: HashMap<Vec<PathSegment>, usize>,
}

impl BlockScanner {
    /// Feed one source line. Returns false once the first document ends.
    fn line(&mut self, number: usize, raw: &str) -> bool {
        let text = raw.trim_end();
        let body = text.trim_start();
        let col = text.len() - body.len();

        if body.is_empty() {
            return true;
        }
        if let Some(owner) = self.block_scalar {
            if col > owner {
                return true;
            }
            self.block_scalar = None;
        }
        if body.starts_with('#') || body.starts_with('%') {
            return true;
        }
        if col == 0 && (body.starts_with("---") || body.starts_with("...")) {
            return !self.seen_content;
        }

        self.seen_content = true;
        self.node(col, body, number);
        true
    }

    fn node(&mut self, col: usize, body: &str, number: usize) {
        if let Some(pending) = self.pending.take() {
            let item = is_sequence_item(body);
            let opens = if item {
                col >= pending.indent
            } else {
                col > pending.indent && split_key(body).is_some()
            };
            if opens {
                let kind = if item {
                    FrameKind::Sequence { next: 0 }
                } else {
                    self.lines.insert(pending.path.clone(), number);
                    FrameKind::Mapping
                };
                self.stack.push(Frame {
                    indent: col,
                    path: pending.path,
                    kind,
                });
            }
        }

        while let Some(top) = self.stack.last() {
            let closes_sequence = top.indent == col
                && matches!(top.kind, FrameKind::Sequence { .. })
                && !is_sequence_item(body);
            if top.indent > col || closes_sequence {
                self.stack.pop();
            } else {
                break;
            }
        }

        if self.stack.is_empty() {
            if self.lines.contains_key(&Vec::<PathSegment>::new()) {
                return;
            }
            self.lines.insert(Vec::new(), number);
            self.stack.push(Frame {
                indent: col,
                path: Vec::new(),
                kind: FrameKind::Mapping,
            });
        }

        let Some(top) = self.stack.last_mut() else {
            return;
        };
        if top.indent != col {
            // Continuation of a multi-line scalar.
            return;
        }

        match &mut top.kind {
            FrameKind::Sequence { next } => {
                let Some(rest) = body.strip_prefix('-') else {
                    return;
                };
                let mut path = top.path.clone();
                path.push(PathSegment::Index(*next));
                *next += 1;
                self.item(col, rest, path, number);
            }
            FrameKind::Mapping => {
                let Some((key, value)) = split_key(body) else {
                    return;
                };
                let mut path = top.path.clone();
                path.push(PathSegment::Key(key));
                self.value(col, value, path, number);
            }
        }
    }

    /// The text after a `-` marker.
    fn item(&mut self, col: usize, rest: &str, path: Vec<PathSegment>, number: usize) {
        let content = rest.trim_start();
        let content_col = col + 1 + (rest.len() - content.len());

        if content.is_empty() || content.starts_with('#') {
            self.pending = Some(Pending { indent: col, path });
        } else if is_sequence_item(content) {
            self.stack.push(Frame {
                indent: content_col,
                path,
                kind: FrameKind::Sequence { next: 0 },
            });
            self.node(content_col, content, number);
        } else if split_key(content).is_some() {
            self.lines.insert(path.clone(), number);
            self.stack.push(Frame {
                indent: content_col,
                path,
                kind: FrameKind::Mapping,
            });
            self.node(content_col, content, number);
        } else {
            self.value(col, content, path, number);
        }
    }

    /// The text after `key:`, owned by a key at `col`.
    fn value(&mut self, col: usize, value: &str, path: Vec<PathSegment>, number: usize) {
        let value = strip_properties(value);
        if value.is_empty() || value.starts_with('#') {
            self.pending = Some(Pending { indent: col, path });
        } else if value.starts_with('|') || value.starts_with('>') {
            self.block_scalar = Some(col);
        } else if value.starts_with('{') {
            self.lines.insert(path, number);
        }
    }
}

fn is_sequence_item(body: &str) -> bool {
    body == "-" || body.starts_with("- ")
}

/// Drop leading `&anchor` and `!tag` properties from a value.
fn strip_properties(mut value: &str) -> &str {
    loop {
        value = value.trim_start();
        if !(value.starts_with('&') || value.starts_with('!')) {
            return value;
        }
        value = value.find(' ').map_or("", |at| &value[at..]);
    }
}

/// Split `key: value` into the unquoted key and the raw value text.
fn split_key(body: &str) -> Option<(String, &str)> {
    let (key, rest) = match body.chars().next()? {
        quote @ ('"' | '\'') => {
            let close = body[1..].find(quote)? + 1;
            (body[1..close].to_string(), &body[close + 1..])
        }
        '?' | '[' | '{' | '*' | '&' | '!' | '|' | '>' | ':' => return None,
        _ => {
            let at = body
                .find(": ")
                .or_else(|| body.ends_with(':').then(|| body.len() - 1))?;
            (body[..at].trim_end().to_string(), &body[at..])
        }
    };
    let value = rest.strip_prefix(':')?;
    if !(value.is_empty() || value.starts_with(' ')) || key.is_empty() {
        return None;
    }
    Some((key, value))
}
