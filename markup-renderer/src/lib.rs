//! # markup-renderer
//!
//! Evaluates parsed [`markup_core::Template`]s against [`markup_core::Value`]
//! contexts: scope resolution, the built-in pipe catalog, `call` dispatch,
//! includes and the registry of custom pipes.
//!
//! ## Usage
//!
//! ```rust
//! use markup_core::{Template, Value};
//! use markup_renderer::{Registry, Renderer};
//!
//! let mut registry = Registry::new();
//! registry
//!     .register_pipe("twice", |v, _| Ok(Value::String(format!("{v}{v}"))))
//!     .unwrap();
//!
//! let template = Template::parse("{{brothers}}{{.|upcase|twice}} {{/brothers}}").unwrap();
//! let context = Value::from(serde_json::json!({"brothers": ["Jack", "Joe"]}));
//! let out = Renderer::new(&registry).render(&template, &context);
//! assert_eq!(out, "JACKJACK JOEJOE ");
//! ```

pub mod dispatch;
pub mod engine;
pub mod error;
pub mod pipes;
pub mod registry;
pub mod scope;

pub use engine::{compact, render, render_template, render_with, Options, Renderer, MAX_INCLUDE_DEPTH, PLACEHOLDER};
pub use error::{RegistryError, RenderError};
pub use pipes::{catalog, run_chain, Family, Pipe, PipeFn, PipeInfo};
pub use registry::{global, register_include, register_pipe, validate_name, Include, Origin, Registry};
pub use scope::{Resolved, Scope};
