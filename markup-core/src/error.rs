//! Error types for markup-core.

use thiserror::Error;

use crate::template::Position;
use crate::value::Kind;

/// A structurally broken template. Fatal: nothing is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// `{{` with no `}}` after it.
    #[error("unterminated tag at {at}")]
    Unterminated { at: Position },

    /// `{{ }}`, `{{if}}` or a close marker without a name.
    #[error("empty tag at {at}")]
    EmptyTag { at: Position },

    /// `{{a||b}}` — a pipe segment with no name.
    #[error("empty pipe name in `{tag}` at {at}")]
    EmptyPipe { tag: String, at: Position },

    /// A subject that is not `.`, `#`, `##` or a well-formed dotted path.
    #[error("invalid path `{path}` at {at}")]
    InvalidPath { path: String, at: Position },

    /// A close tag no opener in the enclosing body claims.
    #[error("closing tag `{{{{/{name}}}}}` at {at} has no opening tag")]
    UnmatchedClose { name: String, at: Position },

    /// An `if` without a matching `/if`.
    #[error("`if` block opened at {at} is never closed")]
    UnclosedIf { at: Position },

    /// `else` directly inside a section body or at the top level.
    #[error("`else` at {at} is outside an `if` block")]
    StrayElse { at: Position },

    /// A second `else` inside one `if` block.
    #[error("second `else` at {at} in the same `if` block")]
    DuplicateElse { at: Position },
}

impl ParseError {
    /// Location of the offending tag.
    pub fn position(&self) -> Position {
        match self {
            ParseError::Unterminated { at }
            | ParseError::EmptyTag { at }
            | ParseError::EmptyPipe { at, .. }
            | ParseError::InvalidPath { at, .. }
            | ParseError::UnmatchedClose { at, .. }
            | ParseError::UnclosedIf { at }
            | ParseError::StrayElse { at }
            | ParseError::DuplicateElse { at } => *at,
        }
    }
}

/// Failure of a single pipe invocation. Recovered during rendering: the tag
/// renders the placeholder (or nothing, for block tags).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipeError {
    /// No call-local, custom or built-in pipe has this name.
    #[error("unknown pipe `{0}`")]
    UnknownPipe(String),

    /// A required argument was not supplied.
    #[error("pipe `{pipe}` expects {expected}")]
    MissingArgument { pipe: String, expected: &'static str },

    /// An argument could not be interpreted (e.g. `chop>abc`).
    #[error("pipe `{pipe}` got invalid argument `{arg}`")]
    InvalidArgument { pipe: String, arg: String },

    /// The running value has a type the pipe does not accept.
    #[error("pipe `{pipe}` cannot handle a {kind} value")]
    UnsupportedValue { pipe: String, kind: Kind },

    /// `call>method` named a method the value's type does not have.
    #[error("no method `{method}` on {target}")]
    UnknownMethod { target: String, method: String },

    /// A date method was called on text that is not a date.
    #[error("`{0}` is not a date")]
    NotADate(String),

    /// Free-form failure raised by caller-supplied pipes and methods.
    #[error("{0}")]
    Custom(String),
}

impl PipeError {
    /// Convenience constructor for caller-supplied pipes.
    pub fn custom(message: impl Into<String>) -> Self {
        PipeError::Custom(message.into())
    }
}
