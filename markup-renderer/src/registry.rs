//! Named pipes and includes available to a render.
//!
//! # Lifecycle
//!
//! ```text
//! Registry::new()          built-in pipes seeded
//!   register_* / replace_* custom pipes and includes
//!   seal()                 further registration fails with RegistryError::Sealed
//!   Renderer::new(&reg)    read-only from here on
//! ```
//!
//! Custom pipes share the built-in namespace and may shadow a built-in.
//! Registering the same custom name twice is an error; `replace_*` is the
//! explicit overwrite.
//!
//! A process-wide instance lives behind [`global()`] for the string-based
//! render entry points. Renders take its read lock, registration the write
//! lock.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use markup_core::{ParseError, PipeError, Template, Value};

use crate::error::RegistryError;
use crate::pipes::{self, Pipe};

// ---------------------------------------------------------------------------
// 1. Includes
// ---------------------------------------------------------------------------

/// Producer of include text, called on every use.
pub type IncludeFn = dyn Fn() -> String + Send + Sync;

/// A named template rendered in place of a leaf tag.
#[derive(Clone)]
pub enum Include {
    /// Parsed once at registration.
    Template(Arc<Template>),
    /// Produced and parsed on every use.
    Dynamic(Arc<IncludeFn>),
}

impl Include {
    /// The template to render for this include.
    pub fn template(&self) -> Result<Cow<'_, Template>, ParseError> {
        match self {
            Include::Template(template) => Ok(Cow::Borrowed(template.as_ref())),
            Include::Dynamic(produce) => Template::parse(&produce()).map(Cow::Owned),
        }
    }
}

impl fmt::Debug for Include {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Include::Template(template) => f.debug_tuple("Template").field(template).finish(),
            Include::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

// ---------------------------------------------------------------------------
// 2. Name validation
// ---------------------------------------------------------------------------

const RESERVED: &[char] = &['{', '}', '|', '>', '/', '#', '.', '\\'];

/// Names must be usable inside a tag: non-empty, no whitespace, no syntax
/// characters.
pub fn validate_name(name: &str) -> Result<(), RegistryError> {
    let reason = if name.is_empty() {
        "must not be empty"
    } else if name.chars().any(char::is_whitespace) {
        "must not contain whitespace"
    } else if name.contains(RESERVED) {
        "must not contain template syntax characters"
    } else {
        return Ok(());
    };
    Err(RegistryError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

// ---------------------------------------------------------------------------
// 3. Registry
// ---------------------------------------------------------------------------

/// Where a registered pipe came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Builtin,
    Custom,
}

#[derive(Clone)]
struct PipeEntry {
    pipe: Pipe,
    origin: Origin,
}

/// Pipes and includes, keyed by name.
#[derive(Clone)]
pub struct Registry {
    pipes: HashMap<String, PipeEntry>,
    includes: HashMap<String, Include>,
    sealed: bool,
}

impl Registry {
    /// A registry holding every built-in pipe and no includes.
    pub fn new() -> Self {
        let pipes = pipes::builtins()
            .map(|(name, pipe)| {
                let entry = PipeEntry { pipe, origin: Origin::Builtin };
                (name.to_string(), entry)
            })
            .collect();
        Self {
            pipes,
            includes: HashMap::new(),
            sealed: false,
        }
    }

    fn check_open(&self, name: &str) -> Result<(), RegistryError> {
        if self.sealed {
            return Err(RegistryError::Sealed(name.to_string()));
        }
        validate_name(name)
    }

    /// Add a custom pipe. Shadowing a built-in is allowed; a second custom
    /// pipe under the same name is not.
    pub fn register_pipe<F>(&mut self, name: &str, pipe: F) -> Result<(), RegistryError>
    where
        F: Fn(&Value, &[String]) -> Result<Value, PipeError> + Send + Sync + 'static,
    {
        self.check_open(name)?;
        if self.origin(name) == Some(Origin::Custom) {
            return Err(RegistryError::DuplicatePipe(name.to_string()));
        }
        self.insert_pipe(name, Arc::new(pipe));
        Ok(())
    }

    /// Add or overwrite a custom pipe.
    pub fn replace_pipe<F>(&mut self, name: &str, pipe: F) -> Result<(), RegistryError>
    where
        F: Fn(&Value, &[String]) -> Result<Value, PipeError> + Send + Sync + 'static,
    {
        self.check_open(name)?;
        self.insert_pipe(name, Arc::new(pipe));
        Ok(())
    }

    fn insert_pipe(&mut self, name: &str, pipe: Pipe) {
        let entry = PipeEntry { pipe, origin: Origin::Custom };
        self.pipes.insert(name.to_string(), entry);
    }

    /// Parse `source` and add it as an include.
    pub fn register_include(&mut self, name: &str, source: &str) -> Result<(), RegistryError> {
        self.check_open(name)?;
        if self.includes.contains_key(name) {
            return Err(RegistryError::DuplicateInclude(name.to_string()));
        }
        let include = parse_include(name, source)?;
        self.includes.insert(name.to_string(), include);
        Ok(())
    }

    /// Add an include whose text is produced on every use.
    pub fn register_include_fn<F>(&mut self, name: &str, produce: F) -> Result<(), RegistryError>
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.check_open(name)?;
        if self.includes.contains_key(name) {
            return Err(RegistryError::DuplicateInclude(name.to_string()));
        }
        self.includes
            .insert(name.to_string(), Include::Dynamic(Arc::new(produce)));
        Ok(())
    }

    /// Add or overwrite an include.
    pub fn replace_include(&mut self, name: &str, source: &str) -> Result<(), RegistryError> {
        self.check_open(name)?;
        let include = parse_include(name, source)?;
        self.includes.insert(name.to_string(), include);
        Ok(())
    }

    /// Refuse all further registration.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn pipe(&self, name: &str) -> Option<Pipe> {
        self.pipes.get(name).map(|entry| Arc::clone(&entry.pipe))
    }

    pub fn include(&self, name: &str) -> Option<&Include> {
        self.includes.get(name)
    }

    pub fn origin(&self, name: &str) -> Option<Origin> {
        self.pipes.get(name).map(|entry| entry.origin)
    }

    /// Registered pipe names, sorted.
    pub fn pipe_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.pipes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered include names, sorted.
    pub fn include_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.includes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("pipes", &self.pipes.len())
            .field("includes", &self.include_names())
            .field("sealed", &self.sealed)
            .finish()
    }
}

pub(crate) fn parse_include(name: &str, source: &str) -> Result<Include, RegistryError> {
    Template::parse(source)
        .map(|template| Include::Template(Arc::new(template)))
        .map_err(|source| RegistryError::InvalidInclude {
            name: name.to_string(),
            source,
        })
}

// ---------------------------------------------------------------------------
// 4. Process-wide instance
// ---------------------------------------------------------------------------

static GLOBAL: OnceLock<RwLock<Registry>> = OnceLock::new();

/// The registry used by [`crate::render`] and [`crate::render_with`].
pub fn global() -> &'static RwLock<Registry> {
    GLOBAL.get_or_init(|| RwLock::new(Registry::new()))
}

// A panic inside a custom pipe must not take the registry down with it.
pub(crate) fn read_global() -> RwLockReadGuard<'static, Registry> {
    global().read().unwrap_or_else(PoisonError::into_inner)
}

fn write_global() -> RwLockWriteGuard<'static, Registry> {
    global().write().unwrap_or_else(PoisonError::into_inner)
}

/// [`Registry::register_pipe`] on the process-wide registry.
pub fn register_pipe<F>(name: &str, pipe: F) -> Result<(), RegistryError>
where
    F: Fn(&Value, &[String]) -> Result<Value, PipeError> + Send + Sync + 'static,
{
    write_global().register_pipe(name, pipe)
}

/// [`Registry::register_include`] on the process-wide registry.
pub fn register_include(name: &str, source: &str) -> Result<(), RegistryError> {
    write_global().register_include(name, source)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn new_registry_holds_every_builtin() {
        let registry = Registry::new();
        for info in pipes::catalog() {
            assert_eq!(registry.origin(info.name), Some(Origin::Builtin), "{}", info.name);
        }
        assert!(registry.include_names().is_empty());
    }

    #[rstest]
    #[case("", "must not be empty")]
    #[case("two words", "must not contain whitespace")]
    #[case("a|b", "must not contain template syntax characters")]
    #[case("a.b", "must not contain template syntax characters")]
    #[case("{x}", "must not contain template syntax characters")]
    fn invalid_names_are_rejected(#[case] name: &str, #[case] reason: &'static str) {
        assert_eq!(
            validate_name(name),
            Err(RegistryError::InvalidName { name: name.to_string(), reason })
        );
    }

    #[test]
    fn custom_pipe_may_shadow_builtin_once() {
        let mut registry = Registry::new();
        registry
            .register_pipe("upcase", |_, _| Ok(Value::from("shadowed")))
            .expect("shadow builtin");
        assert_eq!(registry.origin("upcase"), Some(Origin::Custom));

        let err = registry
            .register_pipe("upcase", |v, _| Ok(v.clone()))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicatePipe("upcase".to_string()));

        registry
            .replace_pipe("upcase", |_, _| Ok(Value::from("replaced")))
            .expect("replace");
        let pipe = registry.pipe("upcase").expect("pipe");
        assert_eq!(pipe(&Value::Null, &[]), Ok(Value::from("replaced")));
    }

    #[test]
    fn include_registration() {
        let mut registry = Registry::new();
        registry.register_include("greeting", "Hi {{name}}").expect("register");
        assert!(matches!(
            registry.register_include("greeting", "again"),
            Err(RegistryError::DuplicateInclude(_))
        ));
        assert!(matches!(
            registry.register_include("broken", "{{oops"),
            Err(RegistryError::InvalidInclude { .. })
        ));
        registry.replace_include("greeting", "Hello").expect("replace");

        let include = registry.include("greeting").expect("include");
        let template = include.template().expect("parse");
        assert_eq!(template.nodes().len(), 1);
    }

    #[test]
    fn dynamic_include_is_parsed_on_use() {
        let mut registry = Registry::new();
        registry
            .register_include_fn("stamp", || "{{when".to_string())
            .expect("register");
        let include = registry.include("stamp").expect("include");
        assert!(include.template().is_err());
    }

    #[test]
    fn sealed_registry_refuses_registration() {
        let mut registry = Registry::new();
        registry.seal();
        assert!(registry.is_sealed());
        assert_eq!(
            registry.register_include("late", "x"),
            Err(RegistryError::Sealed("late".to_string()))
        );
        assert_eq!(
            registry.replace_pipe("late", |v, _| Ok(v.clone())).unwrap_err(),
            RegistryError::Sealed("late".to_string())
        );
    }

    #[test]
    fn pipe_names_are_sorted() {
        let registry = Registry::new();
        let names = registry.pipe_names();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert!(names.contains(&"call"));
    }
}
