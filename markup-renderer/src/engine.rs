//! Template evaluation — [`Options`] and [`Renderer`].
//!
//! # Tag semantics
//!
//! | Tag                    | Subject resolves                    | Absent / pipe error |
//! |------------------------|-------------------------------------|---------------------|
//! | `{{x\|pipes}}`          | piped value, stringified            | `???`               |
//! | `{{x}}...{{/x}}`       | sequence: body per element; other: body once with the value pushed; null/false: nothing | nothing |
//! | `{{if x}}..{{else}}..` | truthy unless `false` or null       | else branch         |
//!
//! A render never fails once the template is parsed. Unresolved paths and
//! failing pipes are logged at debug level and degrade locally.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use markup_core::{Node, PipeError, PipeInvocation, Tag, Template, Value};

use crate::error::{RegistryError, RenderError};
use crate::pipes::{run_chain, Pipe};
use crate::registry::{self, parse_include, validate_name, Include, Registry};
use crate::scope::{Resolved, Scope};

/// Text emitted for unresolved paths and failed pipe chains.
pub const PLACEHOLDER: &str = "???";

/// Includes nested deeper than this render [`PLACEHOLDER`].
pub const MAX_INCLUDE_DEPTH: usize = 32;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Per-render pipes and includes, consulted before the registry.
///
/// Later registrations under the same name win.
#[derive(Clone, Default)]
pub struct Options {
    pipes: HashMap<String, Pipe>,
    includes: HashMap<String, Include>,
    compact: bool,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pipe<F>(mut self, name: &str, pipe: F) -> Result<Self, RegistryError>
    where
        F: Fn(&Value, &[String]) -> Result<Value, PipeError> + Send + Sync + 'static,
    {
        validate_name(name)?;
        self.pipes.insert(name.to_string(), Arc::new(pipe));
        Ok(self)
    }

    pub fn include(mut self, name: &str, source: &str) -> Result<Self, RegistryError> {
        validate_name(name)?;
        let include = parse_include(name, source)?;
        self.includes.insert(name.to_string(), include);
        Ok(self)
    }

    pub fn include_fn<F>(mut self, name: &str, produce: F) -> Result<Self, RegistryError>
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        validate_name(name)?;
        self.includes
            .insert(name.to_string(), Include::Dynamic(Arc::new(produce)));
        Ok(self)
    }

    /// Drop whitespace runs between `>` and `<` in the output.
    pub fn compact(mut self, on: bool) -> Self {
        self.compact = on;
        self
    }

    pub fn is_compact(&self) -> bool {
        self.compact
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pipes: Vec<_> = self.pipes.keys().collect();
        pipes.sort_unstable();
        f.debug_struct("Options")
            .field("pipes", &pipes)
            .field("includes", &self.includes)
            .field("compact", &self.compact)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Evaluates parsed templates against a registry.
///
/// Holds no per-render state; one instance may be shared across threads.
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'r> {
    registry: &'r Registry,
    options: Option<&'r Options>,
}

impl<'r> Renderer<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry, options: None }
    }

    pub fn with_options(registry: &'r Registry, options: &'r Options) -> Self {
        Self { registry, options: Some(options) }
    }

    /// Render `template` against `context`.
    pub fn render(&self, template: &Template, context: &Value) -> String {
        let mut out = String::new();
        self.render_nodes(template.nodes(), &Scope::root(context), 0, &mut out);
        if self.options.is_some_and(Options::is_compact) {
            compact(&out)
        } else {
            out
        }
    }

    fn lookup_pipe(&self, name: &str) -> Option<Pipe> {
        self.options
            .and_then(|options| options.pipes.get(name).cloned())
            .or_else(|| self.registry.pipe(name))
    }

    fn lookup_include(&self, name: &str) -> Option<&'r Include> {
        self.options
            .and_then(|options| options.includes.get(name))
            .or_else(|| self.registry.include(name))
    }

    fn apply<'v>(&self, pipes: &[PipeInvocation], value: Cow<'v, Value>) -> Result<Cow<'v, Value>, PipeError> {
        run_chain(pipes, value, |name| self.lookup_pipe(name))
    }

    fn render_nodes(&self, nodes: &[Node], scope: &Scope<'_>, depth: usize, out: &mut String) {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Leaf(tag) => self.render_leaf(tag, scope, depth, out),
                Node::Section { tag, body } => self.render_section(tag, body, scope, depth, out),
                Node::If { tag, then, otherwise } => {
                    let branch = if self.test(tag, scope, depth) { then } else { otherwise };
                    self.render_nodes(branch, scope, depth, out);
                }
            }
        }
    }

    /// Resolve a leaf or `if` subject; single names matching an include
    /// render that include against the current scope.
    fn subject_value<'s>(&self, tag: &Tag, scope: &Scope<'s>, depth: usize) -> Resolved<'s> {
        let Some(include) = tag.subject.single_name().and_then(|name| self.lookup_include(name)) else {
            return scope.resolve(&tag.subject);
        };
        if depth >= MAX_INCLUDE_DEPTH {
            tracing::warn!(include = %tag.subject, at = %tag.at, "include nesting deeper than {MAX_INCLUDE_DEPTH}");
            return Resolved::Absent;
        }
        match include.template() {
            Ok(template) => {
                let mut text = String::new();
                self.render_nodes(template.nodes(), scope, depth + 1, &mut text);
                Resolved::Found(Cow::Owned(Value::String(text)))
            }
            Err(err) => {
                tracing::warn!(include = %tag.subject, error = %err, "include does not parse");
                Resolved::Absent
            }
        }
    }

    fn render_leaf(&self, tag: &Tag, scope: &Scope<'_>, depth: usize, out: &mut String) {
        let Some(value) = self.subject_value(tag, scope, depth).found() else {
            tracing::debug!(subject = %tag.subject, at = %tag.at, "unresolved path");
            out.push_str(PLACEHOLDER);
            return;
        };
        match self.apply(&tag.pipes, value) {
            Ok(value) => out.push_str(&value.to_string()),
            Err(err) => {
                tracing::debug!(subject = %tag.subject, at = %tag.at, error = %err, "pipe failed");
                out.push_str(PLACEHOLDER);
            }
        }
    }

    fn render_section(&self, tag: &Tag, body: &[Node], scope: &Scope<'_>, depth: usize, out: &mut String) {
        let Some(value) = scope.resolve(&tag.subject).found() else {
            tracing::debug!(section = %tag.subject, at = %tag.at, "unresolved section");
            return;
        };
        let value = match self.apply(&tag.pipes, value) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(section = %tag.subject, at = %tag.at, error = %err, "pipe failed");
                return;
            }
        };

        match value.as_ref() {
            Value::Sequence(items) => {
                tracing::trace!(section = %tag.subject, items = items.len(), "iterate");
                for (index, item) in items.iter().enumerate() {
                    self.render_nodes(body, &scope.push_item(item, index), depth, out);
                }
            }
            Value::Null | Value::Bool(false) => {}
            other => {
                tracing::trace!(section = %tag.subject, kind = %other.kind(), "push");
                self.render_nodes(body, &scope.push(other), depth, out);
            }
        }
    }

    /// `if` truth: no pipes means `notempty`; otherwise anything but
    /// `false`, null, an absent subject or a pipe error.
    fn test(&self, tag: &Tag, scope: &Scope<'_>, depth: usize) -> bool {
        let Some(value) = self.subject_value(tag, scope, depth).found() else {
            return false;
        };
        if tag.pipes.is_empty() {
            return !value.is_empty();
        }
        match self.apply(&tag.pipes, value) {
            Ok(result) => !matches!(result.as_ref(), Value::Bool(false) | Value::Null),
            Err(err) => {
                tracing::debug!(subject = %tag.subject, at = %tag.at, error = %err, "pipe failed in condition");
                false
            }
        }
    }
}

/// Remove whitespace runs that sit between `>` and `<`.
pub fn compact(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(close) = rest.find('>') {
        out.push_str(&rest[..=close]);
        rest = &rest[close + 1..];
        let trimmed = rest.trim_start();
        if trimmed.len() < rest.len() && trimmed.starts_with('<') {
            rest = trimmed;
        }
    }
    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// String entry points (process-wide registry)
// ---------------------------------------------------------------------------

/// Parse `source` and render it with the process-wide registry.
pub fn render(source: &str, context: &Value) -> Result<String, RenderError> {
    let template = Template::parse(source)?;
    Ok(render_template(&template, context))
}

/// [`render`] with call-local pipes, includes and output options.
pub fn render_with(source: &str, context: &Value, options: &Options) -> Result<String, RenderError> {
    let template = Template::parse(source)?;
    let registry = registry::read_global();
    Ok(Renderer::with_options(&registry, options).render(&template, context))
}

/// Render an already parsed template with the process-wide registry.
pub fn render_template(template: &Template, context: &Value) -> String {
    let registry = registry::read_global();
    Renderer::new(&registry).render(template, context)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
