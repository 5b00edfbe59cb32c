//! The continuation-passing abstract machine.
//!
//! `interp` (evaluate an expression under an environment and continuation)
//! and `resume` (hand a value to a continuation) are mutually tail
//! recursive. Instead of calling each other they return the next [`State`]
//! to a single loop in [`Machine::run`], so native stack use stays constant
//! however deep the program or its pending work gets.

use std::fmt;
use std::rc::Rc;

use kfae_resolve::ir::Expr;

use crate::cont::{Cont, Frame};
use crate::env::Env;
use crate::value::Value;

/// Errors that abort a run of the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Variable index past the end of the environment. The resolver never
    /// produces this for a program run under a matching environment.
    IndexOutOfRange { index: usize, len: usize },
    /// Arithmetic on something other than a number
    NotANumber { op: ArithOp, found: &'static str },
    /// Application of something other than a closure or continuation
    NotAFunction { found: &'static str },
    /// Result does not fit in an `i64`
    ArithmeticOverflow { op: ArithOp, left: i64, right: i64 },
    /// The configured step budget ran out
    StepLimitExceeded { limit: u64 },
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::IndexOutOfRange { index, len } => write!(
                f,
                "internal error: variable index {} out of range for environment of length {}",
                index, len
            ),
            RuntimeError::NotANumber { op, found } => {
                write!(f, "`{}` expects numbers, found {}", op, found)
            }
            RuntimeError::NotAFunction { found } => {
                write!(f, "cannot apply a {}", found)
            }
            RuntimeError::ArithmeticOverflow { op, left, right } => {
                write!(f, "arithmetic overflow: {} {} {}", left, op, right)
            }
            RuntimeError::StepLimitExceeded { limit } => {
                write!(f, "step limit of {} exceeded", limit)
            }
        }
    }
}

impl std::error::Error for RuntimeError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
}

impl ArithOp {
    fn apply(self, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
        let (Value::Num(a), Value::Num(b)) = (left, right) else {
            let found = if left.as_num().is_some() { right } else { left };
            return Err(RuntimeError::NotANumber {
                op: self,
                found: found.kind(),
            });
        };
        let result = match self {
            ArithOp::Add => a.checked_add(*b),
            ArithOp::Sub => a.checked_sub(*b),
        };
        result.map(Value::Num).ok_or(RuntimeError::ArithmeticOverflow {
            op: self,
            left: *a,
            right: *b,
        })
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithOp::Add => write!(f, "+"),
            ArithOp::Sub => write!(f, "-"),
        }
    }
}

/// Machine state between two steps of the trampoline.
enum State {
    /// Evaluate `expr` under `env`, then hand its value to `cont`.
    Eval { expr: Rc<Expr>, env: Env, cont: Cont },
    /// Hand `value` to `cont`.
    Resume { cont: Cont, value: Value },
}

/// Result of a run together with the number of steps it took.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub value: Value,
    pub steps: u64,
}

/// Machine configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Machine {
    step_limit: Option<u64>,
}

impl Machine {
    /// A machine with no step limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with [`RuntimeError::StepLimitExceeded`] after `limit` steps.
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    pub fn step_limit(&self) -> Option<u64> {
        self.step_limit
    }

    /// Evaluate `expr` under `env` and pass the result to `cont`.
    pub fn interp(&self, expr: Rc<Expr>, env: Env, cont: Cont) -> Result<Value, RuntimeError> {
        self.run(State::Eval { expr, env, cont }).map(|e| e.value)
    }

    /// Like [`Machine::interp`], also reporting the number of steps.
    pub fn interp_counted(
        &self,
        expr: Rc<Expr>,
        env: Env,
        cont: Cont,
    ) -> Result<Evaluation, RuntimeError> {
        self.run(State::Eval { expr, env, cont })
    }

    /// Pass `value` to `cont`.
    pub fn resume(&self, cont: Cont, value: Value) -> Result<Value, RuntimeError> {
        self.run(State::Resume { cont, value }).map(|e| e.value)
    }

    /// Apply a closure or captured continuation obtained from an earlier run.
    ///
    /// A continuation may be applied any number of times; each application
    /// resumes the control state recorded when it was captured.
    pub fn apply(&self, func: &Value, arg: Value) -> Result<Value, RuntimeError> {
        let cont = Cont::push(Frame::FinishApply {
            func: func.clone(),
            next: Cont::Done,
        });
        self.resume(cont, arg)
    }

    fn run(&self, mut state: State) -> Result<Evaluation, RuntimeError> {
        let mut steps: u64 = 0;
        loop {
            state = match state {
                State::Resume {
                    cont: Cont::Done,
                    value,
                } => {
                    tracing::debug!(steps, result = %value, "machine finished");
                    return Ok(Evaluation { value, steps });
                }
                State::Eval { expr, env, cont } => {
                    steps = self.count_step(steps)?;
                    tracing::trace!(step = steps, expr = expr.kind(), env_len = env.len(), "eval");
                    eval_step(&expr, env, cont)?
                }
                State::Resume {
                    cont: Cont::Frame(frame),
                    value,
                } => {
                    steps = self.count_step(steps)?;
                    tracing::trace!(step = steps, frame = frame.name(), value = %value, "resume");
                    resume_step(&frame, value)?
                }
            };
        }
    }

    /// Charge one transition against the step limit.
    fn count_step(&self, steps: u64) -> Result<u64, RuntimeError> {
        if let Some(limit) = self.step_limit {
            if steps >= limit {
                tracing::debug!(limit, "step limit exceeded");
                return Err(RuntimeError::StepLimitExceeded { limit });
            }
        }
        Ok(steps + 1)
    }
}

fn eval_step(expr: &Expr, env: Env, cont: Cont) -> Result<State, RuntimeError> {
    let state = match expr {
        Expr::Num(n) => State::Resume {
            cont,
            value: Value::Num(*n),
        },
        Expr::Add(left, right) => {
            let cont = Cont::push(Frame::AwaitAddRight {
                right: Rc::clone(right),
                env: env.clone(),
                next: cont,
            });
            State::Eval {
                expr: Rc::clone(left),
                env,
                cont,
            }
        }
        Expr::Sub(left, right) => {
            let cont = Cont::push(Frame::AwaitSubRight {
                right: Rc::clone(right),
                env: env.clone(),
                next: cont,
            });
            State::Eval {
                expr: Rc::clone(left),
                env,
                cont,
            }
        }
        Expr::Var(index) => State::Resume {
            cont,
            value: env.lookup(*index)?,
        },
        Expr::Fun(body) => State::Resume {
            cont,
            value: Value::Closure {
                body: Rc::clone(body),
                env,
            },
        },
        Expr::App(func, arg) => {
            let cont = Cont::push(Frame::AwaitArg {
                arg: Rc::clone(arg),
                env: env.clone(),
                next: cont,
            });
            State::Eval {
                expr: Rc::clone(func),
                env,
                cont,
            }
        }
        // The body runs under the very continuation it can see as a value.
        Expr::Capture(body) => State::Eval {
            expr: Rc::clone(body),
            env: env.extend(Value::Continuation(cont.clone())),
            cont,
        },
    };
    Ok(state)
}

fn resume_step(frame: &Frame, value: Value) -> Result<State, RuntimeError> {
    let state = match frame {
        Frame::AwaitAddRight { right, env, next } => State::Eval {
            expr: Rc::clone(right),
            env: env.clone(),
            cont: Cont::push(Frame::FinishAdd {
                left: value,
                next: next.clone(),
            }),
        },
        Frame::FinishAdd { left, next } => State::Resume {
            cont: next.clone(),
            value: ArithOp::Add.apply(left, &value)?,
        },
        Frame::AwaitSubRight { right, env, next } => State::Eval {
            expr: Rc::clone(right),
            env: env.clone(),
            cont: Cont::push(Frame::FinishSub {
                left: value,
                next: next.clone(),
            }),
        },
        Frame::FinishSub { left, next } => State::Resume {
            cont: next.clone(),
            value: ArithOp::Sub.apply(left, &value)?,
        },
        Frame::AwaitArg { arg, env, next } => State::Eval {
            expr: Rc::clone(arg),
            env: env.clone(),
            cont: Cont::push(Frame::FinishApply {
                func: value,
                next: next.clone(),
            }),
        },
        Frame::FinishApply { func, next } => match func {
            // Call-by-value: the callee returns to the caller's `next`.
            Value::Closure { body, env } => State::Eval {
                expr: Rc::clone(body),
                env: env.extend(value),
                cont: next.clone(),
            },
            // Non-local jump: `next` is abandoned.
            Value::Continuation(saved) => State::Resume {
                cont: saved.clone(),
                value,
            },
            Value::Num(_) => {
                return Err(RuntimeError::NotAFunction { found: func.kind() });
            }
        },
    };
    Ok(state)
}

/// Evaluate `expr` under `env` and `cont` with an unlimited machine.
pub fn interp(expr: Rc<Expr>, env: Env, cont: Cont) -> Result<Value, RuntimeError> {
    Machine::new().interp(expr, env, cont)
}

/// Pass `value` to `cont` with an unlimited machine.
pub fn resume(cont: Cont, value: Value) -> Result<Value, RuntimeError> {
    Machine::new().resume(cont, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rc(e: Expr) -> Rc<Expr> {
        Rc::new(e)
    }

    fn run(e: Expr) -> Result<Value, RuntimeError> {
        interp(rc(e), Env::new(), Cont::Done)
    }

    #[test]
    fn number_resumes_done() {
        assert_eq!(run(Expr::Num(10)).unwrap().as_num(), Some(10));
    }

    #[test]
    fn add_and_sub() {
        let add = Expr::Add(rc(Expr::Num(10)), rc(Expr::Num(20)));
        assert_eq!(run(add).unwrap().as_num(), Some(30));
        let sub = Expr::Sub(rc(Expr::Num(10)), rc(Expr::Num(20)));
        assert_eq!(run(sub).unwrap().as_num(), Some(-10));
    }

    #[test]
    fn var_reads_from_env() {
        let env = Env::new().extend(Value::Num(7)).extend(Value::Num(8));
        let v = interp(rc(Expr::Var(1)), env, Cont::Done).unwrap();
        assert_eq!(v.as_num(), Some(7));
    }

    #[test]
    fn var_out_of_range_is_reported() {
        let err = run(Expr::Var(0)).unwrap_err();
        assert_eq!(err, RuntimeError::IndexOutOfRange { index: 0, len: 0 });
    }

    #[test]
    fn fun_yields_closure_over_current_env() {
        let env = Env::new().extend(Value::Num(1));
        let v = interp(rc(Expr::Fun(rc(Expr::Var(1)))), env, Cont::Done).unwrap();
        match v {
            Value::Closure { env, .. } => assert_eq!(env.len(), 1),
            other => panic!("expected closure, got {other:?}"),
        }
    }

    #[test]
    fn resume_done_returns_value() {
        let v = resume(Cont::Done, Value::Num(4)).unwrap();
        assert_eq!(v.as_num(), Some(4));
    }

    #[test]
    fn resume_runs_pending_frames() {
        // [FinishSub(10) > Done] resumed with 3 computes 10 - 3.
        let k = Cont::push(Frame::FinishSub {
            left: Value::Num(10),
            next: Cont::Done,
        });
        assert_eq!(resume(k, Value::Num(3)).unwrap().as_num(), Some(7));
    }

    #[test]
    fn capture_binds_current_continuation() {
        // 1 + letcc k => k 41
        let e = Expr::Add(
            rc(Expr::Num(1)),
            rc(Expr::Capture(rc(Expr::App(rc(Expr::Var(0)), rc(Expr::Num(41)))))),
        );
        assert_eq!(run(e).unwrap().as_num(), Some(42));
    }

    #[test]
    fn not_a_number_names_offender() {
        let e = Expr::Sub(rc(Expr::Fun(rc(Expr::Var(0)))), rc(Expr::Num(1)));
        assert_eq!(
            run(e).unwrap_err(),
            RuntimeError::NotANumber {
                op: ArithOp::Sub,
                found: "closure"
            }
        );
    }

    #[test]
    fn overflow_is_an_error() {
        let e = Expr::Add(rc(Expr::Num(i64::MAX)), rc(Expr::Num(1)));
        assert_eq!(
            run(e).unwrap_err(),
            RuntimeError::ArithmeticOverflow {
                op: ArithOp::Add,
                left: i64::MAX,
                right: 1
            }
        );
        let e = Expr::Sub(rc(Expr::Num(i64::MIN)), rc(Expr::Num(1)));
        assert!(matches!(
            run(e),
            Err(RuntimeError::ArithmeticOverflow { op: ArithOp::Sub, .. })
        ));
    }

    #[test]
    fn step_count_matches_transitions() {
        // eval Add, eval Num, resume AwaitAddRight, eval Num, resume FinishAdd
        let e = rc(Expr::Add(rc(Expr::Num(1)), rc(Expr::Num(2))));
        let out = Machine::new()
            .interp_counted(e, Env::new(), Cont::Done)
            .unwrap();
        assert_eq!(out.value.as_num(), Some(3));
        assert_eq!(out.steps, 5);
    }

    #[test]
    fn step_limit_stops_run() {
        let e = rc(Expr::Add(rc(Expr::Num(1)), rc(Expr::Num(2))));
        let machine = Machine::new().with_step_limit(4);
        assert_eq!(
            machine.interp(Rc::clone(&e), Env::new(), Cont::Done).unwrap_err(),
            RuntimeError::StepLimitExceeded { limit: 4 }
        );
        let machine = Machine::new().with_step_limit(5);
        assert_eq!(machine.interp(e, Env::new(), Cont::Done).unwrap().as_num(), Some(3));
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            RuntimeError::NotAFunction { found: "number" }.to_string(),
            "cannot apply a number"
        );
        assert_eq!(
            RuntimeError::NotANumber {
                op: ArithOp::Add,
                found: "continuation"
            }
            .to_string(),
            "`+` expects numbers, found continuation"
        );
    }
}
