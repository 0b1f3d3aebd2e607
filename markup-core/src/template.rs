//! Parsed template tree.
//!
//! A [`Template`] is built once by [`Template::parse`] and is read-only
//! afterwards, so one instance can be rendered any number of times from any
//! number of threads.

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;
use crate::parser;

/// 1-based line and column (in characters) of a tag in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// What a tag refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    /// `.` — the top of the scope stack.
    Current,
    /// `#` — zero-based counter of the nearest iteration.
    Index,
    /// `##` — one-based counter of the nearest iteration.
    Ordinal,
    /// Dotted path such as `name.first` or `brothers.0`.
    Path(Vec<String>),
}

impl Subject {
    /// Name a close tag must carry to end a section opened on this subject.
    pub fn section_name(&self) -> Option<String> {
        match self {
            Subject::Path(segments) => Some(segments.join(".")),
            _ => None,
        }
    }

    /// The single segment of a one-segment path (include candidates).
    pub fn single_name(&self) -> Option<&str> {
        match self {
            Subject::Path(segments) if segments.len() == 1 => Some(&segments[0]),
            _ => None,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Current => f.write_str("."),
            Subject::Index => f.write_str("#"),
            Subject::Ordinal => f.write_str("##"),
            Subject::Path(segments) => f.write_str(&segments.join(".")),
        }
    }
}

/// One `name>arg>arg` step of a pipe chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeInvocation {
    pub name: String,
    /// Raw argument text, escapes already resolved, whitespace preserved.
    pub args: Vec<String>,
}

impl PipeInvocation {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// Subject plus pipe chain shared by every tag kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub subject: Subject,
    pub pipes: Vec<PipeInvocation>,
    pub at: Position,
}

/// A node of the tag tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Literal text, copied to the output verbatim.
    Text(String),
    /// `{{subject|pipes}}` — interpolation.
    Leaf(Tag),
    /// `{{subject|pipes}}body{{/subject}}` — object push or array iteration.
    Section { tag: Tag, body: Vec<Node> },
    /// `{{if subject|pipes}}then{{else}}otherwise{{/if}}`.
    If {
        tag: Tag,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

/// A compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    /// Compile `source` into a tag tree.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        parser::parse(source).map(|nodes| Template { nodes })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

impl FromStr for Template {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Template::parse(s)
    }
}
