#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]
#![forbid(unsafe_code)]

pub mod ir;
mod scope;
mod translate;

pub use scope::Scope;
pub use translate::{translate, ResolveError};
