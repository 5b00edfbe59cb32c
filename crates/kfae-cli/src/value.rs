//! Runtime values.

use std::fmt;
use std::rc::Rc;

use kfae_resolve::ir::Expr;

use crate::cont::Cont;
use crate::env::Env;
use crate::teardown::Owned;

#[derive(Clone)]
pub enum Value {
    Num(i64),
    /// Function body paired with the environment it was defined in
    Closure { body: Rc<Expr>, env: Env },
    /// Reified control state; applying it resumes that state
    Continuation(Cont),
}

impl Value {
    pub fn as_num(&self) -> Option<i64> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Whether the value can be applied.
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Closure { .. } | Value::Continuation(_))
    }

    /// Hand over any environment or continuation the value owns.
    pub(crate) fn detach(&mut self, out: &mut Vec<Owned>) {
        match self {
            Value::Num(_) => {}
            Value::Closure { env, .. } => env.detach(out),
            Value::Continuation(k) => k.detach(out),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Num(_) => "number",
            Value::Closure { .. } => "closure",
            Value::Continuation(_) => "continuation",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Num(n) => write!(f, "{n}"),
            Value::Closure { .. } => write!(f, "<closure>"),
            Value::Continuation(_) => write!(f, "<continuation>"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Num(n) => write!(f, "Num({n})"),
            Value::Closure { body, env } => f
                .debug_struct("Closure")
                .field("body", &format_args!("{body}"))
                .field("env", env)
                .finish(),
            Value::Continuation(k) => f.debug_tuple("Continuation").field(k).finish(),
        }
    }
}
