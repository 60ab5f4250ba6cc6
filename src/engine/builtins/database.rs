//! Clause database access: assert, retract, abolish, enumeration, and the
//! `dynamic/1` declaration.

use crate::engine::env::Env;
use crate::engine::exception::{self, Exception};
use crate::engine::machine::{rename_clause, Machine, Procedure};
use crate::engine::promise::{Cont, Promise, Thunk};
use crate::engine::term::{rulify, Indicator, Term};
use crate::engine::unify::unify;

pub(super) fn register(m: &mut Machine) {
    m.register_builtin("asserta", 1, bi_asserta);
    m.register_builtin("assertz", 1, bi_assertz);
    m.register_builtin("assert", 1, bi_assertz);
    m.register_builtin("retract", 1, bi_retract);
    m.register_builtin("abolish", 1, bi_abolish);
    m.register_builtin("current_predicate", 1, bi_current_predicate);
    m.register_builtin("dynamic", 1, bi_dynamic);
}

fn bi_asserta(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    match m.assert_clause(&args[0], env, true, true) {
        Ok(()) => k(m, env),
        Err(e) => Promise::error(e),
    }
}

fn bi_assertz(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    match m.assert_clause(&args[0], env, false, true) {
        Ok(()) => k(m, env),
        Err(e) => Promise::error(e),
    }
}

/// `retract(C)`: unify C (rulified) against the clauses in order; each
/// match removes its clause *before* running the continuation, so the
/// removal stands even if a later goal throws. Backtracking removes
/// further matches. The clause list is snapshotted up front.
fn bi_retract(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    let (head_pat, body_pat) = rulify(&args[0], env);
    let ind = match &env.resolve(&head_pat) {
        Term::Var(_) => return Promise::error(exception::instantiation_error()),
        Term::Int(_) | Term::Float(_) => {
            return Promise::error(exception::type_error("callable", env.resolve(&head_pat)))
        }
        callable => Indicator::of(callable, env).expect("callable terms have indicators"),
    };

    let proc = match m.procedure(&ind) {
        Some(Procedure::Builtin(_)) => {
            return Promise::error(exception::permission_error(
                "modify",
                "static_procedure",
                ind.to_term(),
            ))
        }
        Some(Procedure::User(proc)) => {
            if !proc.dynamic {
                return Promise::error(exception::permission_error(
                    "modify",
                    "static_procedure",
                    ind.to_term(),
                ));
            }
            proc
        }
        None => return Promise::fail(),
    };

    let alts: Vec<Thunk> = proc
        .clauses
        .iter()
        .cloned()
        .map(|clause| {
            let head_pat = head_pat.clone();
            let body_pat = body_pat.clone();
            let ind = ind.clone();
            let k = k.clone();
            let env = env.clone();
            Box::new(move |m: &mut Machine| {
                let (head, body) = rename_clause(&clause);
                let matched = unify(&head_pat, &head, &env, false)
                    .and_then(|env| unify(&body_pat, &body, &env, false));
                match matched {
                    Some(env) if m.retract_exact(&ind, &clause) => k(m, &env),
                    _ => Promise::fail(),
                }
            }) as Thunk
        })
        .collect();
    Promise::choice(alts)
}

fn bi_abolish(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    let ind = match parse_indicator(&args[0], env) {
        Ok(ind) => ind,
        Err(e) => return Promise::error(e),
    };
    match m.abolish(&ind) {
        Ok(()) => k(m, env),
        Err(e) => Promise::error(e),
    }
}

/// `current_predicate(F/N)`: enumerate the user-defined procedures.
fn bi_current_predicate(
    m: &mut Machine,
    args: &[Term],
    k: &Cont,
    env: &Env,
    _barrier: u64,
) -> Promise {
    let alts: Vec<Thunk> = m
        .user_indicators()
        .into_iter()
        .map(|ind| {
            let pattern = args[0].clone();
            let k = k.clone();
            let env = env.clone();
            Box::new(move |m: &mut Machine| match unify(&pattern, &ind.to_term(), &env, false) {
                Some(env) => k(m, &env),
                None => Promise::fail(),
            }) as Thunk
        })
        .collect();
    Promise::choice(alts)
}

/// `dynamic(F/N)` or `dynamic((F/N, G/M, ...))`: mark procedures dynamic,
/// creating empty ones as needed.
fn bi_dynamic(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    match declare_dynamic(m, &args[0], env) {
        Ok(()) => k(m, env),
        Err(e) => Promise::error(e),
    }
}

fn declare_dynamic(m: &mut Machine, spec: &Term, env: &Env) -> Result<(), Exception> {
    let spec = env.resolve(spec);
    if let Term::Compound(c) = &spec {
        if c.functor == "," && c.args.len() == 2 {
            declare_dynamic(m, &c.args[0], env)?;
            return declare_dynamic(m, &c.args[1], env);
        }
    }
    let ind = parse_indicator(&spec, env)?;
    m.ensure_dynamic(&ind)
}

/// Parses a `Name/Arity` term into an indicator with the standard error
/// shapes for ill-typed specs.
fn parse_indicator(t: &Term, env: &Env) -> Result<Indicator, Exception> {
    let t = env.resolve(t);
    let c = match &t {
        Term::Var(_) => return Err(exception::instantiation_error()),
        Term::Compound(c) if c.functor == "/" && c.args.len() == 2 => c,
        other => {
            return Err(exception::type_error(
                "predicate_indicator",
                other.clone(),
            ))
        }
    };
    let name = match env.resolve(&c.args[0]) {
        Term::Var(_) => return Err(exception::instantiation_error()),
        Term::Atom(a) => a,
        other => return Err(exception::type_error("atom", other)),
    };
    let arity = match env.resolve(&c.args[1]) {
        Term::Var(_) => return Err(exception::instantiation_error()),
        Term::Int(n) if n < 0 => {
            return Err(exception::domain_error("not_less_than_zero", Term::Int(n)))
        }
        Term::Int(n) => n as usize,
        other => return Err(exception::type_error("integer", other)),
    };
    Ok(Indicator::new(name, arity))
}
