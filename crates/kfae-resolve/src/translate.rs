//! Resolution of surface names to de Bruijn indices.
//!
//! The walk is driven by an explicit task stack rather than recursion so
//! arbitrarily deep programs can be resolved.

use std::rc::Rc;

use kfae_ast::ast;

use crate::ir::Expr;
use crate::scope::Scope;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A variable with no enclosing binder of the same name
    UnresolvedName {
        name: String,
        /// Names visible at the reference, innermost first
        in_scope: Vec<String>,
    },
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::UnresolvedName { name, in_scope } if in_scope.is_empty() => {
                write!(f, "unresolved name `{}` (nothing in scope)", name)
            }
            ResolveError::UnresolvedName { name, in_scope } => {
                write!(
                    f,
                    "unresolved name `{}` (in scope: {})",
                    name,
                    in_scope.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for ResolveError {}

/// Shape of a node whose children are being resolved.
#[derive(Debug, Clone, Copy)]
enum Node {
    Add,
    Sub,
    App,
    Fun,
    Capture,
}

enum Task<'a> {
    Visit(&'a ast::Expr),
    /// Pop the node's children off the output stack and assemble it.
    Build(Node),
    /// Leave the scope of a binder.
    Unbind,
}

/// Translate a surface expression into a core expression under `scope`.
///
/// With an empty scope the result is closed and can be evaluated under an
/// empty environment.
pub fn translate(expr: &ast::Expr, scope: &Scope) -> Result<Rc<Expr>, ResolveError> {
    let mut scope = scope.clone();
    let outer_depth = scope.depth();
    let mut tasks = vec![Task::Visit(expr)];
    let mut built: Vec<Rc<Expr>> = Vec::new();

    while let Some(task) = tasks.pop() {
        match task {
            Task::Visit(expr) => match expr {
                ast::Expr::Number(n) => built.push(Rc::new(Expr::Num(*n))),
                ast::Expr::Variable(name) => {
                    let index = scope.locate(name).ok_or_else(|| {
                        ResolveError::UnresolvedName {
                            name: name.clone(),
                            in_scope: scope.names().map(str::to_string).collect(),
                        }
                    })?;
                    tracing::trace!(name = %name, index, depth = scope.depth(), "resolved");
                    built.push(Rc::new(Expr::Var(index)));
                }
                ast::Expr::Add(l, r) => visit_pair(&mut tasks, Node::Add, l, r),
                ast::Expr::Subtract(l, r) => visit_pair(&mut tasks, Node::Sub, l, r),
                ast::Expr::Apply { func, arg } => visit_pair(&mut tasks, Node::App, func, arg),
                ast::Expr::Function { param, body } => {
                    scope.push(param.as_str());
                    tasks.push(Task::Build(Node::Fun));
                    tasks.push(Task::Unbind);
                    tasks.push(Task::Visit(body));
                }
                ast::Expr::CaptureContinuation { name, body } => {
                    scope.push(name.as_str());
                    tasks.push(Task::Build(Node::Capture));
                    tasks.push(Task::Unbind);
                    tasks.push(Task::Visit(body));
                }
            },
            Task::Unbind => {
                scope.pop();
            }
            Task::Build(node) => {
                let expr = match node {
                    Node::Fun => Expr::Fun(pop_built(&mut built)),
                    Node::Capture => Expr::Capture(pop_built(&mut built)),
                    Node::Add | Node::Sub | Node::App => {
                        let right = pop_built(&mut built);
                        let left = pop_built(&mut built);
                        match node {
                            Node::Add => Expr::Add(left, right),
                            Node::Sub => Expr::Sub(left, right),
                            _ => Expr::App(left, right),
                        }
                    }
                };
                built.push(Rc::new(expr));
            }
        }
    }

    let result = pop_built(&mut built);
    debug_assert!(built.is_empty());
    debug_assert!(result.is_closed(outer_depth));
    Ok(result)
}

fn visit_pair<'a>(
    tasks: &mut Vec<Task<'a>>,
    node: Node,
    left: &'a ast::Expr,
    right: &'a ast::Expr,
) {
    tasks.push(Task::Build(node));
    tasks.push(Task::Visit(right));
    tasks.push(Task::Visit(left));
}

fn pop_built(built: &mut Vec<Rc<Expr>>) -> Rc<Expr> {
    match built.pop() {
        Some(expr) => expr,
        None => unreachable!("every Build task follows the visits of its children"),
    }
}
