//! Core expressions: the position-addressed form the machine evaluates.
//!
//! Variables are de Bruijn indices: `Var(0)` is the innermost binding.
//! Subtrees are reference counted so closures and continuation frames can
//! hold on to the code they still have to run without copying it.

use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Expr {
    Num(i64),
    Add(Rc<Expr>, Rc<Expr>),
    Sub(Rc<Expr>, Rc<Expr>),
    Var(usize),
    /// Function body; the parameter is `Var(0)` inside it.
    Fun(Rc<Expr>),
    App(Rc<Expr>, Rc<Expr>),
    /// Body evaluated with the current continuation bound at `Var(0)`.
    Capture(Rc<Expr>),
}

impl Expr {
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::Num(_) => "num",
            Expr::Add(..) => "add",
            Expr::Sub(..) => "sub",
            Expr::Var(_) => "var",
            Expr::Fun(_) => "fun",
            Expr::App(..) => "app",
            Expr::Capture(_) => "capture",
        }
    }

    /// Whether every variable is bound in an environment of `depth` values.
    pub fn is_closed(&self, depth: usize) -> bool {
        let mut stack = vec![(self, depth)];
        while let Some((expr, depth)) = stack.pop() {
            match expr {
                Expr::Num(_) => {}
                Expr::Var(i) => {
                    if *i >= depth {
                        return false;
                    }
                }
                Expr::Add(l, r) | Expr::Sub(l, r) | Expr::App(l, r) => {
                    stack.push((r.as_ref(), depth));
                    stack.push((l.as_ref(), depth));
                }
                Expr::Fun(body) | Expr::Capture(body) => stack.push((body.as_ref(), depth + 1)),
            }
        }
        true
    }

    /// Move uniquely owned children out, leaving leaves behind. Shared
    /// children only lose a reference count.
    fn detach_children(&mut self, out: &mut Vec<Expr>) {
        let mut take = |child: &mut Rc<Expr>| {
            if let Some(inner) = Rc::get_mut(child) {
                out.push(std::mem::replace(inner, Expr::Num(0)));
            }
        };
        match self {
            Expr::Add(l, r) | Expr::Sub(l, r) | Expr::App(l, r) => {
                take(l);
                take(r);
            }
            Expr::Fun(body) | Expr::Capture(body) => take(body),
            Expr::Num(_) | Expr::Var(_) => {}
        }
    }
}

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
            Expr::Num(n) => write!(f, "Num({n})"),
            Expr::Add(l, r) => write!(f, "Add({l}, {r})"),
            Expr::Sub(l, r) => write!(f, "Sub({l}, {r})"),
            Expr::Var(i) => write!(f, "Var({i})"),
            Expr::Fun(body) => write!(f, "Fun({body})"),
            Expr::App(func, arg) => write!(f, "App({func}, {arg})"),
            Expr::Capture(body) => write!(f, "Capture({body})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rc(e: Expr) -> Rc<Expr> {
        Rc::new(e)
    }

    #[test]
    fn closed_counts_binders() {
        // Fun(Var(0)) is closed at depth 0, Fun(Var(1)) is not.
        assert!(Expr::Fun(rc(Expr::Var(0))).is_closed(0));
        assert!(!Expr::Fun(rc(Expr::Var(1))).is_closed(0));
        assert!(Expr::Fun(rc(Expr::Var(1))).is_closed(1));
        assert!(Expr::Capture(rc(Expr::Var(0))).is_closed(0));
    }

    #[test]
    fn closed_checks_both_operands() {
        let e = Expr::Add(rc(Expr::Num(1)), rc(Expr::Var(0)));
        assert!(!e.is_closed(0));
        assert!(e.is_closed(1));
    }

    #[test]
    fn display_renders_indices() {
        let e = Expr::App(
            rc(Expr::Fun(rc(Expr::Add(rc(Expr::Var(0)), rc(Expr::Var(0)))))),
            rc(Expr::Num(10)),
        );
        assert_eq!(e.to_string(), "App(Fun(Add(Var(0), Var(0))), Num(10))");
    }

    #[test]
    fn shared_subtree_survives_parent_drop() {
        let shared = rc(Expr::Sub(rc(Expr::Num(5)), rc(Expr::Num(2))));
        let parent = Expr::Fun(Rc::clone(&shared));
        drop(parent);
        assert_eq!(*shared, Expr::Sub(rc(Expr::Num(5)), rc(Expr::Num(2))));
    }

    #[test]
    fn dropping_a_deep_tree_does_not_overflow() {
        let mut e = rc(Expr::Num(0));
        for _ in 0..200_000 {
            e = rc(Expr::Add(rc(Expr::Num(1)), e));
        }
        drop(e);
    }
}
