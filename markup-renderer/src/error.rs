//! Error types for markup-renderer.

use markup_core::ParseError;
use thiserror::Error;

/// Configuration errors, raised when pipes or includes are registered.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// Empty, or contains whitespace or template syntax characters.
    #[error("invalid name `{name}`: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// A custom pipe with this name already exists.
    #[error("pipe `{0}` is already registered")]
    DuplicatePipe(String),

    /// An include with this name already exists.
    #[error("include `{0}` is already registered")]
    DuplicateInclude(String),

    /// The registry was sealed; no further registration is accepted.
    #[error("registry is sealed; cannot register `{0}`")]
    Sealed(String),

    /// The include's template text does not parse.
    #[error("include `{name}` does not parse: {source}")]
    InvalidInclude {
        name: String,
        #[source]
        source: ParseError,
    },
}

/// Errors from the string-based render entry points.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// The template is structurally broken; nothing was rendered.
    #[error("template parse error: {0}")]
    Parse(#[from] ParseError),

    /// A call-local pipe or include was rejected.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
