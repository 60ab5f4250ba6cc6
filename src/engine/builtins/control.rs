//! Control constructs: conjunction, disjunction, if-then-else, cut,
//! `call/N`, negation as failure, `catch/3`/`throw/1`, `repeat/0`, and the
//! solution-collecting predicates `findall/3`, `bagof/3`, `setof/3`.

use std::collections::HashMap;
use std::rc::Rc;

use crate::engine::env::Env;
use crate::engine::exception::{self, Exception};
use crate::engine::machine::Machine;
use crate::engine::promise::{CatchFn, Cont, Promise, Search, Thunk};
use crate::engine::term::{
    compare_terms, copy_term, term_variables, variant, Term, Var,
};
use crate::engine::unify::unify;

pub(super) fn register(m: &mut Machine) {
    m.register_builtin("true", 0, bi_true);
    m.register_builtin("fail", 0, bi_fail);
    m.register_builtin("false", 0, bi_fail);
    m.register_builtin(",", 2, bi_conjunction);
    m.register_builtin(";", 2, bi_disjunction);
    m.register_builtin("->", 2, bi_if_then);
    m.register_builtin("!", 0, bi_cut);
    m.register_builtin("\\+", 1, bi_naf);
    for arity in 1..=8 {
        m.register_builtin("call", arity, bi_call);
    }
    m.register_builtin("catch", 3, bi_catch);
    m.register_builtin("throw", 1, bi_throw);
    m.register_builtin("repeat", 0, bi_repeat);
    m.register_builtin("findall", 3, bi_findall);
    m.register_builtin("bagof", 3, bi_bagof);
    m.register_builtin("setof", 3, bi_setof);
}

fn bi_true(m: &mut Machine, _args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    k(m, env)
}

fn bi_fail(_m: &mut Machine, _args: &[Term], _k: &Cont, _env: &Env, _barrier: u64) -> Promise {
    Promise::fail()
}

/// `(A, B)`: solve A; for each of its solutions, solve B. Both run under
/// the caller's barrier.
fn bi_conjunction(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, barrier: u64) -> Promise {
    let second = args[1].clone();
    let k = k.clone();
    let k_then: Cont = Rc::new(move |m, env| m.solve(&second, &k, env, barrier));
    m.solve(&args[0], &k_then, env, barrier)
}

/// `(A ; B)`: alternatives in order. When A is `(C -> T)` this is
/// if-then-else instead. No new barrier: a `!` in either branch prunes
/// outward.
fn bi_disjunction(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, barrier: u64) -> Promise {
    let lhs = env.resolve(&args[0]);
    if let Term::Compound(c) = &lhs {
        if c.functor == "->" && c.args.len() == 2 {
            return if_then_else(
                m,
                &c.args[0],
                &c.args[1],
                Some(&args[1]),
                k,
                env,
                barrier,
            );
        }
    }
    let (a, b) = (args[0].clone(), args[1].clone());
    let (ka, kb) = (k.clone(), k.clone());
    let (ea, eb) = (env.clone(), env.clone());
    Promise::choice(vec![
        Box::new(move |m: &mut Machine| m.solve(&a, &ka, &ea, barrier)),
        Box::new(move |m: &mut Machine| m.solve(&b, &kb, &eb, barrier)),
    ])
}

/// Bare `(C -> T)`: if-then-else with a failing else branch.
fn bi_if_then(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, barrier: u64) -> Promise {
    if_then_else(m, &args[0], &args[1], None, k, env, barrier)
}

/// On the first solution of the condition, commit to the then-branch:
/// remaining condition solutions and the else-branch are both discarded.
/// The condition runs under its own barrier (a `!` inside it is local);
/// the branches run under the caller's barrier and prune outward.
fn if_then_else(
    m: &mut Machine,
    cond: &Term,
    then: &Term,
    else_: Option<&Term>,
    k: &Cont,
    env: &Env,
    barrier: u64,
) -> Promise {
    let cond_barrier = m.new_barrier();

    let commit: Cont = {
        let then = then.clone();
        let k = k.clone();
        Rc::new(move |_m, cond_env| {
            let then = then.clone();
            let k = k.clone();
            let cond_env = cond_env.clone();
            Promise::cut(
                cond_barrier,
                Box::new(move |m: &mut Machine| m.solve(&then, &k, &cond_env, barrier)),
            )
        })
    };

    let mut alts: Vec<Thunk> = vec![{
        let cond = cond.clone();
        let env = env.clone();
        Box::new(move |m: &mut Machine| m.solve(&cond, &commit, &env, cond_barrier))
    }];
    if let Some(else_) = else_ {
        let else_ = else_.clone();
        let k = k.clone();
        let env = env.clone();
        alts.push(Box::new(move |m: &mut Machine| {
            m.solve(&else_, &k, &env, barrier)
        }));
    }
    Promise::cut_scope(cond_barrier, alts)
}

/// `!`: succeed, and on backtracking prune the alternatives up to the
/// current barrier.
fn bi_cut(_m: &mut Machine, _args: &[Term], k: &Cont, env: &Env, barrier: u64) -> Promise {
    let k = k.clone();
    let env = env.clone();
    Promise::cut(barrier, Box::new(move |m: &mut Machine| k(m, &env)))
}

/// `call(G, Extra...)`: append the extra arguments to G and solve it under
/// a fresh barrier, so a `!` inside G is local to G.
fn bi_call(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    let goal = match build_call_goal(&args[0], &args[1..], env) {
        Ok(goal) => goal,
        Err(e) => return Promise::error(e),
    };
    let call_barrier = m.new_barrier();
    let k = k.clone();
    let env = env.clone();
    Promise::cut_scope(
        call_barrier,
        vec![Box::new(move |m: &mut Machine| {
            m.solve(&goal, &k, &env, call_barrier)
        })],
    )
}

fn build_call_goal(goal: &Term, extra: &[Term], env: &Env) -> Result<Term, Exception> {
    let goal = env.resolve(goal);
    match &goal {
        Term::Var(_) => Err(exception::instantiation_error()),
        Term::Int(_) | Term::Float(_) => Err(exception::type_error("callable", goal.clone())),
        Term::Atom(a) => {
            if extra.is_empty() {
                Ok(goal.clone())
            } else {
                Ok(Term::compound(a.as_str(), extra.iter().cloned()))
            }
        }
        Term::Compound(c) => {
            if extra.is_empty() {
                return Ok(goal.clone());
            }
            let args = c.args.iter().cloned().chain(extra.iter().cloned());
            Ok(Term::compound(c.functor.as_str(), args))
        }
    }
}

/// `\+ G`: succeeds iff G has no solution. G runs under a fresh barrier;
/// none of its bindings escape.
fn bi_naf(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    let naf_barrier = m.new_barrier();
    let goal = args[0].clone();
    let commit_fail: Cont = Rc::new(move |_m, _env| {
        Promise::cut(naf_barrier, Box::new(|_m: &mut Machine| Promise::fail()))
    });
    let k = k.clone();
    let env_goal = env.clone();
    let env_then = env.clone();
    Promise::cut_scope(
        naf_barrier,
        vec![
            Box::new(move |m: &mut Machine| m.solve(&goal, &commit_fail, &env_goal, naf_barrier)),
            Box::new(move |m: &mut Machine| k(m, &env_then)),
        ],
    )
}

/// `catch(G, Catcher, Recovery)`: run G under a scope that intercepts
/// exceptions. A ball unifying with Catcher commits those bindings and
/// runs Recovery; anything else keeps unwinding.
fn bi_catch(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    let scope_barrier = m.new_barrier();
    let goal = args[0].clone();
    let pattern = args[1].clone();
    let recovery = args[2].clone();
    let k_recover = k.clone();
    let catch_env = env.clone();

    let catcher: CatchFn = Rc::new(move |m, ball| {
        let env = unify(&pattern, ball.term(), &catch_env, false)?;
        let recovery_barrier = m.new_barrier();
        let recovery = recovery.clone();
        let k = k_recover.clone();
        Some(Promise::cut_scope(
            recovery_barrier,
            vec![Box::new(move |m: &mut Machine| {
                m.solve(&recovery, &k, &env, recovery_barrier)
            })],
        ))
    });

    let k = k.clone();
    let env = env.clone();
    Promise::catch_scope(
        scope_barrier,
        catcher,
        vec![Box::new(move |m: &mut Machine| {
            m.solve(&goal, &k, &env, scope_barrier)
        })],
    )
}

/// `throw(E)`: raise E with the current bindings substituted in, so the
/// ball survives the unwinding of its branch.
fn bi_throw(_m: &mut Machine, args: &[Term], _k: &Cont, env: &Env, _barrier: u64) -> Promise {
    let ball = env.resolve(&args[0]);
    if matches!(ball, Term::Var(_)) {
        return Promise::error(exception::instantiation_error());
    }
    Promise::error(Exception::new(crate::engine::term::resolve_all(&ball, env)))
}

fn bi_repeat(_m: &mut Machine, _args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    repeat_promise(k.clone(), env.clone())
}

fn repeat_promise(k: Cont, env: Env) -> Promise {
    let k2 = k.clone();
    let env2 = env.clone();
    Promise::choice(vec![
        Box::new(move |m: &mut Machine| k(m, &env)),
        Box::new(move |_m: &mut Machine| repeat_promise(k2, env2)),
    ])
}

/// Runs `goal` to exhaustion in a nested search and returns one deep copy
/// of `template` per solution. Exceptions from the nested search propagate.
fn collect_instances(
    m: &mut Machine,
    template: &Term,
    goal: &Term,
    env: &Env,
) -> Result<Vec<Term>, Exception> {
    let resolved = env.resolve(goal);
    if matches!(resolved, Term::Var(_)) {
        return Err(exception::instantiation_error());
    }

    let barrier = m.new_barrier();
    let k: Cont = Rc::new(|_m, env| Promise::ok(env.clone()));
    let root = {
        let goal = resolved.clone();
        let env = env.clone();
        Promise::cut_scope(
            barrier,
            vec![Box::new(move |m: &mut Machine| {
                m.solve(&goal, &k, &env, barrier)
            })],
        )
    };

    let mut search = Search::new(root);
    let mut out = Vec::new();
    while let Some(solution_env) = search.next_solution(m)? {
        let mut map = HashMap::new();
        out.push(copy_term(template, &solution_env, &mut map));
    }
    Ok(out)
}

/// `findall(Template, Goal, List)`: List is the deep-copied instances of
/// Template for every solution of Goal, in solution order. Never fails;
/// no solutions yields the empty list.
fn bi_findall(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    let instances = match collect_instances(m, &args[0], &args[1], env) {
        Ok(instances) => instances,
        Err(e) => return Promise::error(e),
    };
    match unify(&args[2], &Term::list(instances), env, false) {
        Some(env) => k(m, &env),
        None => Promise::fail(),
    }
}

fn bi_bagof(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    solve_grouped(m, args, k, env, false)
}

fn bi_setof(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    solve_grouped(m, args, k, env, true)
}

/// Shared skeleton of `bagof/3` and `setof/3`. Solutions are grouped by
/// the witness: the free variables of the goal that occur neither in the
/// template nor to the left of a `^`. Groups appear in first-witness
/// order; `setof` additionally sorts each group by the standard order and
/// drops duplicates. Fails when the goal has no solution.
fn solve_grouped(
    m: &mut Machine,
    args: &[Term],
    k: &Cont,
    env: &Env,
    sorted: bool,
) -> Promise {
    let template = &args[0];

    // strip ^/2 quantifiers off the goal
    let mut quantified: Vec<Var> = Vec::new();
    let mut goal = env.resolve(&args[1]);
    loop {
        let next = match &goal {
            Term::Compound(c) if c.functor == "^" && c.args.len() == 2 => {
                term_variables(&c.args[0], env, &mut quantified);
                env.resolve(&c.args[1])
            }
            _ => break,
        };
        goal = next;
    }

    let mut goal_vars = Vec::new();
    term_variables(&goal, env, &mut goal_vars);
    let mut template_vars = Vec::new();
    term_variables(template, env, &mut template_vars);

    let witness: Vec<Var> = goal_vars
        .into_iter()
        .filter(|v| !template_vars.contains(v) && !quantified.contains(v))
        .collect();
    let witness_term = Term::list(witness.into_iter().map(Term::Var));

    // collect (witness, template) pairs jointly so sharing is preserved
    let pair_template = Term::compound("-", [witness_term.clone(), template.clone()]);
    let pairs = match collect_instances(m, &pair_template, &goal, env) {
        Ok(pairs) => pairs,
        Err(e) => return Promise::error(e),
    };

    let mut groups: Vec<(Term, Vec<Term>)> = Vec::new();
    for pair in pairs {
        let c = pair.as_compound().expect("collected pair is -/2");
        let (w, t) = (c.args[0].clone(), c.args[1].clone());
        match groups.iter_mut().find(|group| variant(&group.0, &w)) {
            Some(group) => group.1.push(t),
            None => groups.push((w, vec![t])),
        }
    }

    let alts: Vec<Thunk> = groups
        .into_iter()
        .map(|(w, mut members)| {
            if sorted {
                let sort_env = env.clone();
                members.sort_by(|a, b| compare_terms(a, b, &sort_env));
                members.dedup_by(|a, b| {
                    compare_terms(a, b, &sort_env) == std::cmp::Ordering::Equal
                });
            }
            let k = k.clone();
            let env = env.clone();
            let witness_term = witness_term.clone();
            let out = args[2].clone();
            Box::new(move |m: &mut Machine| {
                let got = Term::compound("-", [w, Term::list(members)]);
                let want = Term::compound("-", [witness_term, out]);
                match unify(&want, &got, &env, false) {
                    Some(env) => k(m, &env),
                    None => Promise::fail(),
                }
            }) as Thunk
        })
        .collect();

    // zero groups means zero solutions: bagof and setof fail
    Promise::choice(alts)
}
