//! Resolver behaviour over whole programs.

use std::collections::HashSet;

use kfae_ast::ast::Expr;
use kfae_resolve::{translate, ResolveError, Scope};
use proptest::prelude::*;

// -- Strategies --

fn name_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "k"]).prop_map(str::to_string)
}

/// Arbitrary surface expressions over a tiny alphabet of names, so that
/// shadowing and free variables both show up often.
fn expr_strategy() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        (-1000i64..1000).prop_map(Expr::num),
        name_strategy().prop_map(Expr::var),
    ];
    leaf.prop_recursive(6, 64, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Expr::add(l, r)),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Expr::sub(l, r)),
            (inner.clone(), inner.clone()).prop_map(|(f, a)| Expr::app(f, a)),
            (name_strategy(), inner.clone()).prop_map(|(p, b)| Expr::fun(p, b)),
            (name_strategy(), inner).prop_map(|(n, b)| Expr::capture(n, b)),
        ]
    })
}

fn free_names(expr: &Expr, bound: &mut Vec<String>, out: &mut HashSet<String>) {
    match expr {
        Expr::Number(_) => {}
        Expr::Variable(name) => {
            if !bound.contains(name) {
                out.insert(name.clone());
            }
        }
        Expr::Add(l, r) | Expr::Subtract(l, r) => {
            free_names(l, bound, out);
            free_names(r, bound, out);
        }
        Expr::Apply { func, arg } => {
            free_names(func, bound, out);
            free_names(arg, bound, out);
        }
        Expr::Function { param: name, body } | Expr::CaptureContinuation { name, body } => {
            bound.push(name.clone());
            free_names(body, bound, out);
            bound.pop();
        }
    }
}

proptest! {
    #[test]
    fn closed_programs_resolve_in_bounds(body in expr_strategy()) {
        let program = Expr::fun("a", Expr::fun("b", Expr::capture("c", Expr::fun("k", body))));
        let core = translate(&program, &Scope::new()).unwrap();
        prop_assert!(core.is_closed(0));
    }

    #[test]
    fn resolution_fails_exactly_on_free_names(expr in expr_strategy()) {
        let mut free = HashSet::new();
        free_names(&expr, &mut Vec::new(), &mut free);
        match translate(&expr, &Scope::new()) {
            Ok(core) => {
                prop_assert!(free.is_empty());
                prop_assert!(core.is_closed(0));
            }
            Err(ResolveError::UnresolvedName { name, .. }) => {
                prop_assert!(free.contains(&name));
            }
        }
    }

    #[test]
    fn outer_scope_closes_free_names(expr in expr_strategy()) {
        let scope = Scope::from_names(["a", "b", "c", "k"]);
        let core = translate(&expr, &scope).unwrap();
        prop_assert!(core.is_closed(scope.depth()));
    }
}

#[test]
fn deep_right_nested_addition_resolves() {
    let mut program = Expr::num(1);
    for _ in 0..100_000 {
        program = Expr::add(Expr::num(1), program);
    }
    let core = translate(&program, &Scope::new()).unwrap();
    assert!(core.is_closed(0));
}

#[test]
fn deep_binder_chain_resolves_outermost_reference() {
    // fun x0 => fun x1 => ... => x0
    let depth = 50_000;
    let mut program = Expr::var("x0");
    for i in (0..depth).rev() {
        program = Expr::fun(format!("x{i}"), program);
    }
    let core = translate(&program, &Scope::new()).unwrap();
    assert!(core.is_closed(0));

    let mut node = &core;
    for _ in 0..depth {
        match node.as_ref() {
            kfae_resolve::ir::Expr::Fun(body) => node = body,
            other => panic!("expected Fun, got {other}"),
        }
    }
    assert_eq!(**node, kfae_resolve::ir::Expr::Var(depth - 1));
}
