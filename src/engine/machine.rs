//! The resolution machine: procedure dispatch and the clause database.
//!
//! One `Machine` is one fully isolated Prolog world — procedures, flags,
//! and barrier supply. Built-ins live in the same procedure table as user
//! code; their reserved indicators cannot be overwritten.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::config::{Flags, Unknown};
use crate::engine::env::Env;
use crate::engine::exception::{self, Exception};
use crate::engine::promise::{Cont, Promise, Search, Thunk};
use crate::engine::term::{copy_term, rulify, Indicator, Term};
use crate::engine::unify::unify;

/// A stored fact or rule. Head and body share their variables.
#[derive(Debug, PartialEq)]
pub struct Clause {
    pub head: Term,
    pub body: Term,
}

/// A native predicate handler: `(machine, args, continuation, env, barrier)`.
/// Receiving the continuation and the caller's cut barrier keeps
/// backtracking, cut, and exceptions uniform across native and user code.
pub type NativeFn = Rc<dyn Fn(&mut Machine, &[Term], &Cont, &Env, u64) -> Promise>;

/// An ordered clause list, `dynamic` iff assert/retract may touch it.
#[derive(Clone)]
pub struct UserProcedure {
    pub clauses: Vec<Arc<Clause>>,
    pub dynamic: bool,
}

#[derive(Clone)]
pub enum Procedure {
    Builtin(NativeFn),
    User(UserProcedure),
}

pub struct Machine {
    procedures: HashMap<Indicator, Procedure>,
    flags: Flags,
    barrier_counter: u64,
}

impl Machine {
    /// A machine with the built-in predicates registered and nothing else.
    pub fn new() -> Machine {
        let mut m = Machine {
            procedures: HashMap::new(),
            flags: Flags::default(),
            barrier_counter: 0,
        };
        crate::engine::builtins::register_all(&mut m);
        m
    }

    pub fn flags(&self) -> &Flags {
        &self.flags
    }

    pub fn flags_mut(&mut self) -> &mut Flags {
        &mut self.flags
    }

    /// A fresh cut-barrier token.
    pub fn new_barrier(&mut self) -> u64 {
        self.barrier_counter += 1;
        self.barrier_counter
    }

    /// Installs a native predicate. Panics if the indicator is taken by
    /// another built-in; user clauses under the same indicator are shadowed.
    pub fn register_builtin(
        &mut self,
        name: &str,
        arity: usize,
        f: impl Fn(&mut Machine, &[Term], &Cont, &Env, u64) -> Promise + 'static,
    ) {
        let ind = Indicator::new(name, arity);
        if let Some(Procedure::Builtin(_)) = self.procedures.get(&ind) {
            panic!("built-in {} registered twice", ind);
        }
        self.procedures.insert(ind, Procedure::Builtin(Rc::new(f)));
    }

    pub(crate) fn procedure(&self, ind: &Indicator) -> Option<Procedure> {
        self.procedures.get(ind).cloned()
    }

    pub(crate) fn user_procedure(&self, ind: &Indicator) -> Option<UserProcedure> {
        match self.procedures.get(ind) {
            Some(Procedure::User(p)) => Some(p.clone()),
            _ => None,
        }
    }

    /// User-defined indicators, sorted for stable enumeration.
    pub fn user_indicators(&self) -> Vec<Indicator> {
        let mut out: Vec<Indicator> = self
            .procedures
            .iter()
            .filter(|(_, p)| matches!(p, Procedure::User(_)))
            .map(|(ind, _)| ind.clone())
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name).then(a.arity.cmp(&b.arity)));
        out
    }

    /// Solves `goal` under `env`, handing each solution environment to `k`.
    /// `barrier` is the cut scope the goal executes in: a `!` reached from
    /// here prunes the alternatives of the barrier's owner.
    pub fn solve(&mut self, goal: &Term, k: &Cont, env: &Env, barrier: u64) -> Promise {
        let goal = env.resolve(goal);
        let ind = match &goal {
            Term::Var(_) => return Promise::error(exception::instantiation_error()),
            Term::Int(_) | Term::Float(_) => {
                return Promise::error(exception::type_error("callable", goal.clone()))
            }
            Term::Atom(a) => Indicator::new(a.clone(), 0),
            Term::Compound(c) => Indicator::new(c.functor.clone(), c.args.len()),
        };
        trace!(target: "hornlog::machine", "dispatch {}", ind);
        match self.procedure(&ind) {
            Some(Procedure::Builtin(f)) => {
                let args: Vec<Term> = match &goal {
                    Term::Compound(c) => c.args.to_vec(),
                    _ => Vec::new(),
                };
                f(self, &args, k, env, barrier)
            }
            Some(Procedure::User(proc)) => self.solve_user(&proc, &goal, k, env),
            None => match self.flags.unknown {
                Unknown::Error => {
                    Promise::error(exception::existence_error_procedure(&ind))
                }
                Unknown::Fail => Promise::fail(),
                Unknown::Warning => {
                    warn!(target: "hornlog::machine", "unknown procedure {}", ind);
                    Promise::fail()
                }
            },
        }
    }

    /// Tries the clauses of a user procedure in order. The clause list is
    /// snapshotted here, so retracts performed while backtracking through
    /// the procedure do not disturb the ongoing scan. The whole choice is
    /// wrapped in a fresh cut scope: the clause bodies run under it, so a
    /// `!` in a body prunes exactly this procedure's remaining clauses.
    fn solve_user(&mut self, proc: &UserProcedure, goal: &Term, k: &Cont, env: &Env) -> Promise {
        let barrier = self.new_barrier();
        let alts: Vec<Thunk> = proc
            .clauses
            .iter()
            .cloned()
            .map(|clause| {
                let goal = goal.clone();
                let k = k.clone();
                let env = env.clone();
                Box::new(move |m: &mut Machine| {
                    let (head, body) = rename_clause(&clause);
                    match unify(&goal, &head, &env, false) {
                        Some(env) => m.solve(&body, &k, &env, barrier),
                        None => Promise::fail(),
                    }
                }) as Thunk
            })
            .collect();
        Promise::cut_scope(barrier, alts)
    }

    /// A search over one goal, rooted in its own cut scope. The top-level
    /// continuation yields each solution environment to the driver.
    pub fn query_search(&mut self, goal: &Term) -> Search {
        let barrier = self.new_barrier();
        let goal = goal.clone();
        let k: Cont = Rc::new(|_m, env| Promise::ok(env.clone()));
        Search::new(Promise::cut_scope(
            barrier,
            vec![Box::new(move |m: &mut Machine| {
                m.solve(&goal, &k, &Env::new(), barrier)
            })],
        ))
    }

    /// Adds a clause. `front` selects `asserta` placement. Runtime asserts
    /// require (or create) a dynamic procedure; consult-time loading
    /// creates static procedures and may extend them.
    pub fn assert_clause(
        &mut self,
        t: &Term,
        env: &Env,
        front: bool,
        runtime: bool,
    ) -> Result<(), Exception> {
        let (head, body) = rulify(t, env);
        let mut map = HashMap::new();
        let head = copy_term(&head, env, &mut map);
        let body = copy_term(&body, env, &mut map);

        let ind = match &head {
            Term::Var(_) => return Err(exception::instantiation_error()),
            Term::Int(_) | Term::Float(_) => {
                return Err(exception::type_error("callable", head.clone()))
            }
            Term::Atom(a) => Indicator::new(a.clone(), 0),
            Term::Compound(c) => Indicator::new(c.functor.clone(), c.args.len()),
        };

        let clause = Arc::new(Clause { head, body });
        match self.procedures.get_mut(&ind) {
            Some(Procedure::Builtin(_)) => Err(exception::permission_error(
                "modify",
                "static_procedure",
                ind.to_term(),
            )),
            Some(Procedure::User(proc)) => {
                if runtime && !proc.dynamic {
                    return Err(exception::permission_error(
                        "modify",
                        "static_procedure",
                        ind.to_term(),
                    ));
                }
                if front {
                    proc.clauses.insert(0, clause);
                } else {
                    proc.clauses.push(clause);
                }
                debug!(target: "hornlog::database", "assert {} ({} clauses)", ind, proc.clauses.len());
                Ok(())
            }
            None => {
                debug!(target: "hornlog::database", "create {} (dynamic: {})", ind, runtime);
                self.procedures.insert(
                    ind,
                    Procedure::User(UserProcedure {
                        clauses: vec![clause],
                        dynamic: runtime,
                    }),
                );
                Ok(())
            }
        }
    }

    /// Removes one specific clause (by identity). Returns whether the
    /// clause was still present.
    pub(crate) fn retract_exact(&mut self, ind: &Indicator, clause: &Arc<Clause>) -> bool {
        if let Some(Procedure::User(proc)) = self.procedures.get_mut(ind) {
            if let Some(pos) = proc.clauses.iter().position(|c| Arc::ptr_eq(c, clause)) {
                proc.clauses.remove(pos);
                debug!(target: "hornlog::database", "retract from {}", ind);
                return true;
            }
        }
        false
    }

    /// Removes a whole procedure. Static procedures and built-ins refuse;
    /// an absent procedure is fine.
    pub(crate) fn abolish(&mut self, ind: &Indicator) -> Result<(), Exception> {
        match self.procedures.get(ind) {
            Some(Procedure::Builtin(_)) => Err(exception::permission_error(
                "modify",
                "static_procedure",
                ind.to_term(),
            )),
            Some(Procedure::User(proc)) if !proc.dynamic => Err(exception::permission_error(
                "modify",
                "static_procedure",
                ind.to_term(),
            )),
            Some(Procedure::User(_)) => {
                self.procedures.remove(ind);
                debug!(target: "hornlog::database", "abolish {}", ind);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Marks a procedure dynamic, creating an empty one if needed.
    pub(crate) fn ensure_dynamic(&mut self, ind: &Indicator) -> Result<(), Exception> {
        match self.procedures.get_mut(ind) {
            Some(Procedure::Builtin(_)) => Err(exception::permission_error(
                "modify",
                "static_procedure",
                ind.to_term(),
            )),
            Some(Procedure::User(proc)) => {
                proc.dynamic = true;
                Ok(())
            }
            None => {
                self.procedures.insert(
                    ind.clone(),
                    Procedure::User(UserProcedure {
                        clauses: Vec::new(),
                        dynamic: true,
                    }),
                );
                Ok(())
            }
        }
    }
}

impl Default for Machine {
    fn default() -> Machine {
        Machine::new()
    }
}

/// Instantiates a clause with fresh variables. Head and body share one
/// renaming, so variables occurring in both stay connected.
pub(crate) fn rename_clause(clause: &Clause) -> (Term, Term) {
    let empty = Env::new();
    let mut map = HashMap::new();
    (
        copy_term(&clause.head, &empty, &mut map),
        copy_term(&clause.body, &empty, &mut map),
    )
}
