//! Persistent, index-addressed environment.
//!
//! An environment is a linked chain of bindings, innermost first, so that
//! index 0 is the most recently bound value. Extending never touches the
//! existing chain: closures and continuation frames that captured an older
//! environment keep seeing exactly what they captured, and many of them can
//! share one tail.

use std::fmt;
use std::rc::Rc;

use crate::machine::RuntimeError;
use crate::teardown::{self, Owned};
use crate::value::Value;

#[derive(Clone, Default)]
pub struct Env {
    head: Option<Rc<Binding>>,
}

pub(crate) struct Binding {
    value: Value,
    /// Length of the environment this binding heads.
    len: usize,
    rest: Env,
}

impl Binding {
    pub(crate) fn detach(&mut self, out: &mut Vec<Owned>) {
        self.value.detach(out);
        self.rest.detach(out);
    }
}

impl Env {
    /// Create an empty environment
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.head.as_ref().map_or(0, |b| b.len)
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// A new environment with `value` bound at index 0 and every existing
    /// binding shifted up by one.
    pub fn extend(&self, value: Value) -> Env {
        Env {
            head: Some(Rc::new(Binding {
                value,
                len: self.len() + 1,
                rest: self.clone(),
            })),
        }
    }

    /// Value bound `index` positions from the innermost binding.
    pub fn lookup(&self, index: usize) -> Result<Value, RuntimeError> {
        let len = self.len();
        if index >= len {
            return Err(RuntimeError::IndexOutOfRange { index, len });
        }
        self.values()
            .nth(index)
            .cloned()
            .ok_or(RuntimeError::IndexOutOfRange { index, len })
    }

    /// Bound values, innermost first.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        let mut cursor = self.head.as_deref();
        std::iter::from_fn(move || {
            let binding = cursor?;
            cursor = binding.rest.head.as_deref();
            Some(&binding.value)
        })
    }

    /// Hand the chain over to `out`, leaving this environment empty.
    pub(crate) fn detach(&mut self, out: &mut Vec<Owned>) {
        if let Some(head) = self.head.take() {
            out.push(Owned::Binding(head));
        }
    }
}

impl Drop for Env {
    fn drop(&mut self) {
        if let Some(head) = self.head.take() {
            teardown::release(Owned::Binding(head));
        }
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env").field("len", &self.len()).finish()
    }
}
