//! Lexical name scope used during resolution.

/// Names bound at a point of the program, innermost first.
///
/// The depth of a scope always equals the static nesting depth of the
/// expression being resolved, which is also the length of the runtime
/// environment that expression will be evaluated under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    // Stored outermost first so binding and unbinding happen at the tail.
    names: Vec<String>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scope from names listed innermost first.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.reverse();
        Self { names }
    }

    /// Bind a new innermost name.
    pub fn push(&mut self, name: impl Into<String>) {
        self.names.push(name.into());
    }

    /// Remove the innermost name.
    pub fn pop(&mut self) -> Option<String> {
        self.names.pop()
    }

    /// Distance from the innermost binding to the nearest binding of `name`.
    pub fn locate(&self, name: &str) -> Option<usize> {
        self.names.iter().rev().position(|n| n == name)
    }

    pub fn depth(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names innermost first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().rev().map(String::as_str)
    }
}
