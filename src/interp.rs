//! The embeddable engine: consult, query, and native predicate
//! registration.

use std::collections::HashMap;

use tracing::warn;

use crate::config::Flags;
use crate::engine::env::Env;
use crate::engine::machine::Machine;
use crate::engine::promise::{Cont, Promise};
use crate::engine::term::{resolve_all, Indicator, Term, Var};
use crate::error::Error;
use crate::reader;
use crate::solutions::{HostValue, Solution, Solutions};

/// Derived predicates are bootstrapped from source, so they get ordinary
/// clause semantics for free.
const PRELUDE: &str = r#"
once(G) :- call(G), !.
ignore(G) :- call(G), !.
ignore(_).
not(G) :- \+ call(G).
forall(C, A) :- \+ (call(C), \+ call(A)).
"#;

/// One isolated Prolog world: clause database, flags, and built-ins.
/// Creating two engines produces two fully independent worlds.
///
/// # Example
///
/// ```
/// use hornlog::Engine;
///
/// let mut engine = Engine::new();
/// engine
///     .consult("append([], L, L). append([X|L1], L2, [X|L3]) :- append(L1, L2, L3).")
///     .unwrap();
///
/// let mut sols = engine.query("append(X, Y, [a, b]).", &[]).unwrap();
/// let mut count = 0;
/// while sols.next() {
///     count += 1;
/// }
/// assert_eq!(count, 3);
/// ```
pub struct Engine {
    machine: Machine,
}

impl Engine {
    pub fn new() -> Engine {
        let mut engine = Engine {
            machine: Machine::new(),
        };
        engine
            .consult(PRELUDE)
            .expect("the bootstrap prelude is well-formed");
        engine
    }

    pub fn flags(&self) -> &Flags {
        self.machine.flags()
    }

    pub fn flags_mut(&mut self) -> &mut Flags {
        self.machine.flags_mut()
    }

    /// Direct access to the resolution machine, for embedders that build
    /// promises by hand.
    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    /// Installs a native predicate, callable from Prolog like any other.
    /// The handler receives `(machine, args, continuation, env, barrier)`
    /// and returns a promise, so native code takes part in backtracking,
    /// cut, and exception handling uniformly.
    pub fn register_predicate(
        &mut self,
        name: &str,
        arity: usize,
        handler: impl Fn(&mut Machine, &[Term], &Cont, &Env, u64) -> Promise + 'static,
    ) {
        self.machine.register_builtin(name, arity, handler);
    }

    /// Reads and loads a program: clauses are asserted in order, `:- Goal`
    /// directives are executed on the spot. If `term_expansion/2` is
    /// defined, each clause is filtered through its first solution before
    /// being stored. A thrown exception aborts the load; a failing
    /// directive is logged and skipped.
    pub fn consult(&mut self, src: &str) -> Result<(), Error> {
        self.consult_with(src, &[])
    }

    /// [`Engine::consult`] with `?` placeholder substitution.
    pub fn consult_with(&mut self, src: &str, args: &[HostValue]) -> Result<(), Error> {
        let binds: Vec<Term> = args.iter().map(HostValue::to_term).collect();
        let clauses = reader::read_program(src, *self.machine.flags(), &binds)?;
        for clause in clauses {
            if let Some(c) = clause.as_compound() {
                if c.functor == ":-" && c.args.len() == 1 {
                    self.run_directive(&c.args[0])?;
                    continue;
                }
            }
            let clause = self.expand_term(clause)?;
            self.machine
                .assert_clause(&clause, &Env::new(), false, false)
                .map_err(|e| Error::Exception(e.into_term()))?;
        }
        Ok(())
    }

    fn run_directive(&mut self, goal: &Term) -> Result<(), Error> {
        let mut search = self.machine.query_search(goal);
        match search.next_solution(&mut self.machine) {
            Ok(Some(_)) => Ok(()),
            Ok(None) => {
                warn!(target: "hornlog::interp", "directive failed: {}", goal);
                Ok(())
            }
            Err(e) => Err(Error::Exception(e.into_term())),
        }
    }

    /// Applies user-defined `term_expansion/2`, keeping the clause as-is
    /// when the hook is absent or has no solution for it.
    fn expand_term(&mut self, clause: Term) -> Result<Term, Error> {
        let hook = Indicator::new("term_expansion", 2);
        if self.machine.user_procedure(&hook).is_none() {
            return Ok(clause);
        }
        let expanded = Var::fresh();
        let goal = Term::compound(
            "term_expansion",
            [clause.clone(), Term::Var(expanded.clone())],
        );
        let mut search = self.machine.query_search(&goal);
        match search.next_solution(&mut self.machine) {
            Ok(Some(env)) => Ok(resolve_all(&Term::Var(expanded), &env)),
            Ok(None) => Ok(clause),
            Err(e) => Err(Error::Exception(e.into_term())),
        }
    }

    /// Compiles a goal and returns its lazy solution stream. `?`
    /// placeholders in the source are substituted left to right from
    /// `args`.
    pub fn query(&mut self, src: &str, args: &[HostValue]) -> Result<Solutions<'_>, Error> {
        let binds: Vec<Term> = args.iter().map(HostValue::to_term).collect();
        let (goal, vars) = reader::read_query(src, *self.machine.flags(), &binds)?;
        let search = self.machine.query_search(&goal);
        Ok(Solutions::new(&mut self.machine, search, vars))
    }

    /// Runs a query for its first solution. An empty stream is
    /// [`Error::NoSolutions`].
    pub fn query_solution(&mut self, src: &str, args: &[HostValue]) -> Result<Solution, Error> {
        let mut sols = self.query(src, args)?;
        if sols.next() {
            let mut bindings = HashMap::new();
            sols.scan(&mut bindings);
            let mut ordered: Vec<(String, Term)> = Vec::new();
            for name in sols.vars() {
                if let Some(t) = bindings.remove(&name) {
                    ordered.push((name, t));
                }
            }
            return Ok(Solution::new(ordered));
        }
        match sols.err() {
            Some(e) => Err(e.clone()),
            None => Err(Error::NoSolutions),
        }
    }

    /// Convenience: the continuation type for native predicates that just
    /// succeed once.
    pub fn deterministic(
        handler: impl Fn(&mut Machine, &[Term], &Env) -> Result<Option<Env>, crate::engine::Exception>
            + 'static,
    ) -> impl Fn(&mut Machine, &[Term], &Cont, &Env, u64) -> Promise {
        move |m, args, k, env, _barrier| match handler(m, args, env) {
            Ok(Some(env)) => k(m, &env),
            Ok(None) => Promise::fail(),
            Err(e) => Promise::error(e),
        }
    }
}

impl Default for Engine {
    fn default() -> Engine {
        Engine::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consult_and_query() {
        let mut e = Engine::new();
        e.consult("parent(tom, bob). parent(bob, ann).").unwrap();

        let mut sols = e.query("parent(tom, X).", &[]).unwrap();
        assert!(sols.next());
        assert_eq!(sols.get("X"), Some(Term::atom("bob")));
        assert!(!sols.next());
        assert!(sols.err().is_none());
    }

    #[test]
    fn test_query_solution_no_solutions() {
        let mut e = Engine::new();
        e.consult("foo(a).").unwrap();
        let err = e.query_solution("foo(b).", &[]).unwrap_err();
        assert_eq!(err, Error::NoSolutions);
    }

    #[test]
    fn test_syntax_error_reported() {
        let mut e = Engine::new();
        assert!(matches!(e.consult("foo("), Err(Error::Syntax(_))));
        assert!(matches!(e.query("foo((.", &[]), Err(Error::Syntax(_))));
    }

    #[test]
    fn test_placeholders() {
        let mut e = Engine::new();
        e.consult_with("foo(?, ?).", &["a".into(), 42i64.into()])
            .unwrap();
        assert!(e.query_solution("foo(a, 42).", &[]).is_ok());
    }

    #[test]
    fn test_engines_are_isolated() {
        let mut a = Engine::new();
        let mut b = Engine::new();
        a.consult("secret(x).").unwrap();

        assert!(a.query_solution("secret(X).", &[]).is_ok());
        // engine b never heard of secret/1
        assert!(matches!(
            b.query_solution("secret(X).", &[]),
            Err(Error::Exception(_))
        ));
    }

    #[test]
    fn test_register_predicate() {
        let mut e = Engine::new();
        e.register_predicate(
            "host_double",
            2,
            Engine::deterministic(|_m, args, env| {
                let n = match env.resolve(&args[0]) {
                    Term::Int(n) => n,
                    _ => return Ok(None),
                };
                Ok(crate::engine::unify(
                    &args[1],
                    &Term::Int(n * 2),
                    env,
                    false,
                ))
            }),
        );
        let sol = e.query_solution("host_double(21, X).", &[]).unwrap();
        assert_eq!(sol.get("X"), Some(&Term::Int(42)));
    }

    #[test]
    fn test_prelude_once() {
        let mut e = Engine::new();
        e.consult("p(1). p(2).").unwrap();
        let mut sols = e.query("once(p(X)).", &[]).unwrap();
        assert!(sols.next());
        assert_eq!(sols.get("X"), Some(Term::Int(1)));
        assert!(!sols.next());
    }

    #[test]
    fn test_term_expansion_hook() {
        let mut e = Engine::new();
        e.consult("term_expansion(special, expanded).").unwrap();
        e.consult("special.").unwrap();
        assert!(e.query_solution("expanded.", &[]).is_ok());
        assert!(matches!(
            e.query_solution("special.", &[]),
            Err(Error::Exception(_)) | Err(Error::NoSolutions)
        ));
    }

    #[test]
    fn test_term_expansion_throw_aborts_load() {
        let mut e = Engine::new();
        e.consult("term_expansion(_, _) :- throw(bad_clause).")
            .unwrap();
        assert!(matches!(e.consult("a."), Err(Error::Exception(_))));
    }
}
