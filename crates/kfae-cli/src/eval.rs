//! End-to-end evaluation of surface programs.
//!
//! Resolves a closed surface expression under the empty scope and runs it
//! under the empty environment with the terminal continuation.

use kfae_ast::ast;
use kfae_resolve::{translate, ResolveError, Scope};

use crate::cont::Cont;
use crate::env::Env;
use crate::machine::{Machine, RuntimeError};
use crate::value::Value;

/// Failure of either phase. The two are kept apart because they mean
/// different things: an unbound name is a compile-time mistake, the rest
/// are runtime type or resource errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Resolve(ResolveError),
    Runtime(RuntimeError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Resolve(e) => write!(f, "resolve error: {}", e),
            Error::Runtime(e) => write!(f, "runtime error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Resolve(e) => Some(e),
            Error::Runtime(e) => Some(e),
        }
    }
}

impl From<ResolveError> for Error {
    fn from(e: ResolveError) -> Self {
        Error::Resolve(e)
    }
}

impl From<RuntimeError> for Error {
    fn from(e: RuntimeError) -> Self {
        Error::Runtime(e)
    }
}

/// Resolve and evaluate a closed program with an unlimited machine.
pub fn evaluate(expr: &ast::Expr) -> Result<Value, Error> {
    evaluate_with(&Machine::new(), expr)
}

/// Resolve and evaluate a closed program on `machine`.
pub fn evaluate_with(machine: &Machine, expr: &ast::Expr) -> Result<Value, Error> {
    let core = translate(expr, &Scope::new())?;
    tracing::debug!(root = core.kind(), "program resolved");
    Ok(machine.interp(core, Env::new(), Cont::Done)?)
}
