//! Scope stack and subject resolution.
//!
//! Frames are linked on the Rust call stack: entering a section body
//! pushes a child [`Scope`] that borrows its parent, leaving the body drops
//! it. Dotted paths only ever look at the innermost frame.

use std::borrow::Cow;

use markup_core::{Subject, Value};

/// Outcome of resolving a subject.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<'a> {
    /// The subject exists. Explicit nulls land here too.
    Found(Cow<'a, Value>),
    /// A path segment is missing, or `#`/`##` is used outside an iteration.
    Absent,
}

impl<'a> Resolved<'a> {
    pub fn found(self) -> Option<Cow<'a, Value>> {
        match self {
            Resolved::Found(value) => Some(value),
            Resolved::Absent => None,
        }
    }
}

/// One frame of the scope stack.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    value: &'a Value,
    index: Option<usize>,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    /// Bottom frame holding the render context.
    pub fn root(value: &'a Value) -> Self {
        Scope { value, index: None, parent: None }
    }

    /// Child frame for a mapping, object or scalar section.
    pub fn push<'b>(&'b self, value: &'b Value) -> Scope<'b> {
        Scope { value, index: None, parent: Some(self) }
    }

    /// Child frame for element `index` of an iterated sequence.
    pub fn push_item<'b>(&'b self, value: &'b Value, index: usize) -> Scope<'b> {
        Scope { value, index: Some(index), parent: Some(self) }
    }

    /// Top-of-stack value.
    pub fn current(&self) -> &'a Value {
        self.value
    }

    /// Zero-based counter of the nearest enclosing iteration.
    pub fn counter(&self) -> Option<usize> {
        let mut frame = Some(self);
        while let Some(scope) = frame {
            if scope.index.is_some() {
                return scope.index;
            }
            frame = scope.parent;
        }
        None
    }

    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut frame = self.parent;
        while let Some(scope) = frame {
            depth += 1;
            frame = scope.parent;
        }
        depth
    }

    pub fn resolve(&self, subject: &Subject) -> Resolved<'a> {
        let found = match subject {
            Subject::Current => Some(Cow::Borrowed(self.value)),
            Subject::Index => self.counter().map(|i| Cow::Owned(Value::from(i))),
            Subject::Ordinal => self.counter().map(|i| Cow::Owned(Value::from(i + 1))),
            Subject::Path(segments) => segments
                .iter()
                .try_fold(self.value, |value, segment| value.get(segment))
                .map(Cow::Borrowed),
        };
        found.map_or(Resolved::Absent, Resolved::Found)
    }
}
