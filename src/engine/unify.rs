//! Structural unification.

use crate::engine::env::Env;
use crate::engine::term::{Term, Var};

/// Finds the most general extension of `env` making `a` and `b` equal, or
/// `None` if there is none. With `occurs_check` on, binding a variable to a
/// term containing it fails instead of creating a cyclic binding.
///
/// `Int(1)` and `Float(1.0)` do not unify; numbers unify by exact value
/// within their own class.
pub fn unify(a: &Term, b: &Term, env: &Env, occurs_check: bool) -> Option<Env> {
    let a = env.resolve(a);
    let b = env.resolve(b);
    match (&a, &b) {
        (Term::Var(x), Term::Var(y)) if x == y => Some(env.clone()),
        (Term::Var(v), t) | (t, Term::Var(v)) => {
            if occurs_check && occurs(v, t, env) {
                None
            } else {
                Some(env.extend(v, (*t).clone()))
            }
        }
        (Term::Atom(x), Term::Atom(y)) => (x == y).then(|| env.clone()),
        (Term::Int(x), Term::Int(y)) => (x == y).then(|| env.clone()),
        (Term::Float(x), Term::Float(y)) => (x == y).then(|| env.clone()),
        (Term::Compound(x), Term::Compound(y)) => {
            if x.functor != y.functor || x.args.len() != y.args.len() {
                return None;
            }
            let mut env = env.clone();
            for (p, q) in x.args.iter().zip(&y.args) {
                env = unify(p, q, &env, occurs_check)?;
            }
            Some(env)
        }
        _ => None,
    }
}

/// True iff the unbound variable `v` occurs in `t` under `env`.
fn occurs(v: &Var, t: &Term, env: &Env) -> bool {
    match env.resolve(t) {
        Term::Var(w) => w == *v,
        Term::Compound(c) => c.args.iter().any(|arg| occurs(v, arg, env)),
        _ => false,
    }
}
