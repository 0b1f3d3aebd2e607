//! Markup core library — context values, template tree, parser, errors.
//!
//! Public API surface:
//! - [`value`] — the [`Value`] model every context datum is converted into
//! - [`template`] — the parsed tag tree ([`Template`], [`Node`], [`Tag`])
//! - [`error`] — [`ParseError`] and [`PipeError`]

pub mod error;
mod parser;
pub mod template;
pub mod value;

pub use error::{ParseError, PipeError};
pub use template::{Node, PipeInvocation, Position, Subject, Tag, Template};
pub use value::{Kind, Mapping, Object, ObjectBuilder, Value};
