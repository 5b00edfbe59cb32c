#![forbid(unsafe_code)]
#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]

pub mod cont;
pub mod env;
pub mod eval;
pub mod machine;
mod teardown;
pub mod value;

pub use cont::{Cont, Frame};
pub use env::Env;
pub use eval::{evaluate, evaluate_with, Error};
pub use machine::{interp, resume, ArithOp, Evaluation, Machine, RuntimeError};
pub use value::Value;
