//! The binding store: a persistent chain of variable → term frames.
//!
//! `extend` never mutates; it returns a child environment whose new frame
//! shadows older bindings. Sibling branches of the search therefore never
//! observe each other's bindings — backtracking simply drops the child and
//! keeps using the parent.

use std::sync::Arc;

use crate::engine::term::{Term, Var};

#[derive(Debug)]
struct Frame {
    var: u64,
    value: Term,
    generation: u64,
    next: Option<Arc<Frame>>,
}

impl Drop for Frame {
    fn drop(&mut self) {
        // Unlink iteratively; deep chains must not recurse on drop.
        let mut next = self.next.take();
        while let Some(frame) = next {
            match Arc::try_unwrap(frame) {
                Ok(mut owned) => next = owned.next.take(),
                Err(_) => break,
            }
        }
    }
}

/// An immutable-by-extension association from variable identity to term.
#[derive(Debug, Clone, Default)]
pub struct Env {
    head: Option<Arc<Frame>>,
}

impl Env {
    pub fn new() -> Env {
        Env { head: None }
    }

    /// A monotonically increasing counter; `a.generation() <= b.generation()`
    /// whenever `a` is an ancestor of `b`.
    pub fn generation(&self) -> u64 {
        self.head.as_ref().map_or(0, |f| f.generation)
    }

    /// Child environment binding `var` to `value`.
    pub fn extend(&self, var: &Var, value: Term) -> Env {
        Env {
            head: Some(Arc::new(Frame {
                var: var.tag(),
                value,
                generation: self.generation() + 1,
                next: self.head.clone(),
            })),
        }
    }

    /// The binding of `var`, if any. The innermost frame wins.
    pub fn lookup(&self, var: &Var) -> Option<&Term> {
        let mut cur = self.head.as_deref();
        while let Some(frame) = cur {
            if frame.var == var.tag() {
                return Some(&frame.value);
            }
            cur = frame.next.as_deref();
        }
        None
    }

    /// Chases variable bindings until a non-variable or an unbound variable
    /// is reached. Idempotent: `resolve(resolve(t)) == resolve(t)`.
    pub fn resolve(&self, t: &Term) -> Term {
        let mut cur = t.clone();
        loop {
            let next = match &cur {
                Term::Var(v) => match self.lookup(v) {
                    Some(bound) => bound.clone(),
                    None => return cur,
                },
                _ => return cur,
            };
            cur = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_env() {
        let env = Env::new();
        let x = Var::fresh();
        assert_eq!(env.lookup(&x), None);
        assert_eq!(env.generation(), 0);
    }

    #[test]
    fn test_extend_and_lookup() {
        let x = Var::fresh();
        let env = Env::new().extend(&x, Term::atom("a"));
        assert_eq!(env.lookup(&x), Some(&Term::atom("a")));
        assert_eq!(env.generation(), 1);
    }

    #[test]
    fn test_parent_untouched_by_child() {
        let x = Var::fresh();
        let y = Var::fresh();
        let parent = Env::new().extend(&x, Term::Int(1));
        let child = parent.extend(&y, Term::Int(2));

        assert_eq!(parent.lookup(&y), None);
        assert_eq!(child.lookup(&x), Some(&Term::Int(1)));
        assert_eq!(child.lookup(&y), Some(&Term::Int(2)));
    }

    #[test]
    fn test_sibling_isolation() {
        let x = Var::fresh();
        let base = Env::new();
        let left = base.extend(&x, Term::atom("left"));
        let right = base.extend(&x, Term::atom("right"));

        assert_eq!(left.lookup(&x), Some(&Term::atom("left")));
        assert_eq!(right.lookup(&x), Some(&Term::atom("right")));
        assert_eq!(base.lookup(&x), None);
    }

    #[test]
    fn test_resolve_chases_chains() {
        let x = Var::fresh();
        let y = Var::fresh();
        let env = Env::new()
            .extend(&x, Term::Var(y.clone()))
            .extend(&y, Term::atom("end"));

        let resolved = env.resolve(&Term::Var(x));
        assert_eq!(resolved, Term::atom("end"));
        // idempotent
        assert_eq!(env.resolve(&resolved), resolved);
    }

    #[test]
    fn test_resolve_stops_at_unbound() {
        let x = Var::fresh();
        let y = Var::fresh();
        let env = Env::new().extend(&x, Term::Var(y.clone()));
        assert_eq!(env.resolve(&Term::Var(x)), Term::Var(y));
    }

    #[test]
    fn test_deep_chain_drop() {
        let mut env = Env::new();
        for _ in 0..200_000 {
            env = env.extend(&Var::fresh(), Term::Int(0));
        }
        drop(env);
    }
}
