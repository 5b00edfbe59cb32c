#![forbid(unsafe_code)]
#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]

pub mod ast {
    use serde::{Deserialize, Serialize};
    use std::fmt;

    /// Surface expression: variables are referred to by name.
    ///
    /// Trees are built by the caller (there is no parser) and are immutable
    /// once handed to the resolver.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub enum Expr {
        Number(i64),
        Add(Box<Expr>, Box<Expr>),
        Subtract(Box<Expr>, Box<Expr>),
        Variable(String),
        /// `fun <param> => <body>`
        Function { param: String, body: Box<Expr> },
        /// `<func> <arg>`
        Apply { func: Box<Expr>, arg: Box<Expr> },
        /// `letcc <name> in <body>`: binds the current continuation.
        CaptureContinuation { name: String, body: Box<Expr> },
    }

    impl Expr {
        pub fn num(n: i64) -> Self {
            Expr::Number(n)
        }

        pub fn add(left: Expr, right: Expr) -> Self {
            Expr::Add(Box::new(left), Box::new(right))
        }

        pub fn sub(left: Expr, right: Expr) -> Self {
            Expr::Subtract(Box::new(left), Box::new(right))
        }

        pub fn var(name: impl Into<String>) -> Self {
            Expr::Variable(name.into())
        }

        pub fn fun(param: impl Into<String>, body: Expr) -> Self {
            Expr::Function {
                param: param.into(),
                body: Box::new(body),
            }
        }

        pub fn app(func: Expr, arg: Expr) -> Self {
            Expr::Apply {
                func: Box::new(func),
                arg: Box::new(arg),
            }
        }

        pub fn capture(name: impl Into<String>, body: Expr) -> Self {
            Expr::CaptureContinuation {
                name: name.into(),
                body: Box::new(body),
            }
        }

        /// Move the children out, leaving leaves behind.
        fn detach_children(&mut self, out: &mut Vec<Expr>) {
            match self {
                Expr::Add(l, r) | Expr::Subtract(l, r) => {
                    out.push(std::mem::replace(&mut **l, Expr::Number(0)));
                    out.push(std::mem::replace(&mut **r, Expr::Number(0)));
                }
                Expr::Apply { func, arg } => {
                    out.push(std::mem::replace(&mut **func, Expr::Number(0)));
                    out.push(std::mem::replace(&mut **arg, Expr::Number(0)));
                }
                Expr::Function { body, .. } | Expr::CaptureContinuation { body, .. } => {
                    out.push(std::mem::replace(&mut **body, Expr::Number(0)));
                }
                Expr::Number(_) | Expr::Variable(_) => {}
            }
        }
    }

    // Deeply nested trees would overflow the native stack with the
    // compiler-generated recursive drop.
    impl Drop for Expr {
        fn drop(&mut self) {
            let mut pending = Vec::new();
            self.detach_children(&mut pending);
            while let Some(mut expr) = pending.pop() {
                expr.detach_children(&mut pending);
            }
        }
    }

    impl fmt::Display for Expr {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Expr::Number(n) => write!(f, "Num({n})"),
                Expr::Add(l, r) => write!(f, "Add({l}, {r})"),
                Expr::Subtract(l, r) => write!(f, "Sub({l}, {r})"),
                Expr::Variable(name) => write!(f, "Id({name})"),
                Expr::Function { param, body } => write!(f, "Fun({param}, {body})"),
                Expr::Apply { func, arg } => write!(f, "App({func}, {arg})"),
                Expr::CaptureContinuation { name, body } => write!(f, "Vcc({name}, {body})"),
            }
        }
    }
}
