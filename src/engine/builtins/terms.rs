//! Term inspection, construction, comparison, and the type-test predicates.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::config::OccursCheck;
use crate::engine::arith;
use crate::engine::env::Env;
use crate::engine::exception::{self, Exception};
use crate::engine::machine::Machine;
use crate::engine::promise::{Cont, Promise};
use crate::engine::term::{
    compare_terms, copy_term, is_acyclic, is_ground, list_view, ListView, Term,
};
use crate::engine::unify::unify;

pub(super) fn register(m: &mut Machine) {
    m.register_builtin("=", 2, bi_unify);
    m.register_builtin("\\=", 2, bi_not_unifiable);
    m.register_builtin("unify_with_occurs_check", 2, bi_unify_occurs_check);
    m.register_builtin("==", 2, order_test(|o| o == Ordering::Equal));
    m.register_builtin("\\==", 2, order_test(|o| o != Ordering::Equal));
    m.register_builtin("@<", 2, order_test(|o| o == Ordering::Less));
    m.register_builtin("@>", 2, order_test(|o| o == Ordering::Greater));
    m.register_builtin("@=<", 2, order_test(|o| o != Ordering::Greater));
    m.register_builtin("@>=", 2, order_test(|o| o != Ordering::Less));
    m.register_builtin("compare", 3, bi_compare);
    m.register_builtin("functor", 3, bi_functor);
    m.register_builtin("arg", 3, bi_arg);
    m.register_builtin("=..", 2, bi_univ);
    m.register_builtin("copy_term", 2, bi_copy_term);
    m.register_builtin("ground", 1, bi_ground);
    m.register_builtin("acyclic_term", 1, bi_acyclic_term);

    m.register_builtin("var", 1, type_test(|t| matches!(t, Term::Var(_))));
    m.register_builtin("nonvar", 1, type_test(|t| !matches!(t, Term::Var(_))));
    m.register_builtin("atom", 1, type_test(|t| matches!(t, Term::Atom(_))));
    m.register_builtin(
        "number",
        1,
        type_test(|t| matches!(t, Term::Int(_) | Term::Float(_))),
    );
    m.register_builtin("integer", 1, type_test(|t| matches!(t, Term::Int(_))));
    m.register_builtin("float", 1, type_test(|t| matches!(t, Term::Float(_))));
    m.register_builtin(
        "atomic",
        1,
        type_test(|t| matches!(t, Term::Atom(_) | Term::Int(_) | Term::Float(_))),
    );
    m.register_builtin("compound", 1, type_test(|t| matches!(t, Term::Compound(_))));
    m.register_builtin(
        "callable",
        1,
        type_test(|t| matches!(t, Term::Atom(_) | Term::Compound(_))),
    );
    m.register_builtin("is_list", 1, bi_is_list);

    m.register_builtin("sort", 2, bi_sort);
    m.register_builtin("msort", 2, bi_msort);

    m.register_builtin("is", 2, bi_is);
    m.register_builtin("=:=", 2, arith_test(|o| o == Ordering::Equal));
    m.register_builtin("=\\=", 2, arith_test(|o| o != Ordering::Equal));
    m.register_builtin("<", 2, arith_test(|o| o == Ordering::Less));
    m.register_builtin(">", 2, arith_test(|o| o == Ordering::Greater));
    m.register_builtin("=<", 2, arith_test(|o| o != Ordering::Greater));
    m.register_builtin(">=", 2, arith_test(|o| o != Ordering::Less));
}

fn bi_unify(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    let occurs = m.flags().occurs_check == OccursCheck::On;
    match unify(&args[0], &args[1], env, occurs) {
        Some(env) => k(m, &env),
        None => Promise::fail(),
    }
}

fn bi_not_unifiable(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    match unify(&args[0], &args[1], env, false) {
        Some(_) => Promise::fail(),
        None => k(m, env),
    }
}

fn bi_unify_occurs_check(
    m: &mut Machine,
    args: &[Term],
    k: &Cont,
    env: &Env,
    _barrier: u64,
) -> Promise {
    match unify(&args[0], &args[1], env, true) {
        Some(env) => k(m, &env),
        None => Promise::fail(),
    }
}

fn order_test(
    accept: impl Fn(Ordering) -> bool + 'static,
) -> impl Fn(&mut Machine, &[Term], &Cont, &Env, u64) -> Promise {
    move |m, args, k, env, _barrier| {
        if accept(compare_terms(&args[0], &args[1], env)) {
            k(m, env)
        } else {
            Promise::fail()
        }
    }
}

fn bi_compare(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    let order = env.resolve(&args[0]);
    match &order {
        Term::Var(_) => {}
        Term::Atom(a) if matches!(a.as_str(), "<" | "=" | ">") => {}
        Term::Atom(_) => {
            return Promise::error(exception::domain_error("order", order.clone()))
        }
        _ => return Promise::error(exception::type_error("atom", order.clone())),
    }
    let symbol = match compare_terms(&args[1], &args[2], env) {
        Ordering::Less => "<",
        Ordering::Equal => "=",
        Ordering::Greater => ">",
    };
    match unify(&order, &Term::atom(symbol), env, false) {
        Some(env) => k(m, &env),
        None => Promise::fail(),
    }
}

fn bi_functor(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    let t = env.resolve(&args[0]);
    match &t {
        Term::Var(_) => build_functor(m, args, k, env),
        Term::Compound(c) => {
            let name = Term::Atom(c.functor.clone());
            let arity = Term::Int(c.args.len() as i64);
            unify_pair(m, k, env, (&args[1], name), (&args[2], arity))
        }
        atomic => {
            let name = (*atomic).clone();
            unify_pair(m, k, env, (&args[1], name), (&args[2], Term::Int(0)))
        }
    }
}

/// `functor(-T, +Name, +Arity)`: construct a fresh term.
fn build_functor(m: &mut Machine, args: &[Term], k: &Cont, env: &Env) -> Promise {
    let arity = match env.resolve(&args[2]) {
        Term::Var(_) => return Promise::error(exception::instantiation_error()),
        Term::Int(n) if n < 0 => {
            return Promise::error(exception::domain_error(
                "not_less_than_zero",
                Term::Int(n),
            ))
        }
        Term::Int(n) => n as usize,
        other => return Promise::error(exception::type_error("integer", other)),
    };
    let name = env.resolve(&args[1]);
    let built = match (&name, arity) {
        (Term::Var(_), _) => return Promise::error(exception::instantiation_error()),
        (_, 0) => match &name {
            Term::Compound(_) => {
                return Promise::error(exception::type_error("atomic", name.clone()))
            }
            atomic => (*atomic).clone(),
        },
        (Term::Atom(a), n) => {
            Term::compound(a.as_str(), std::iter::repeat_with(Term::var).take(n))
        }
        (Term::Int(_) | Term::Float(_), _) => {
            return Promise::error(exception::type_error("atom", name.clone()))
        }
        (Term::Compound(_), _) => {
            return Promise::error(exception::type_error("atomic", name.clone()))
        }
    };
    match unify(&args[0], &built, env, false) {
        Some(env) => k(m, &env),
        None => Promise::fail(),
    }
}

fn unify_pair(
    m: &mut Machine,
    k: &Cont,
    env: &Env,
    (a1, t1): (&Term, Term),
    (a2, t2): (&Term, Term),
) -> Promise {
    let env = match unify(a1, &t1, env, false) {
        Some(env) => env,
        None => return Promise::fail(),
    };
    match unify(a2, &t2, &env, false) {
        Some(env) => k(m, &env),
        None => Promise::fail(),
    }
}

fn bi_arg(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    let n = match env.resolve(&args[0]) {
        Term::Var(_) => return Promise::error(exception::instantiation_error()),
        Term::Int(n) => n,
        other => return Promise::error(exception::type_error("integer", other)),
    };
    let t = env.resolve(&args[1]);
    let c = match &t {
        Term::Var(_) => return Promise::error(exception::instantiation_error()),
        Term::Compound(c) => c,
        other => return Promise::error(exception::type_error("compound", other.clone())),
    };
    if n < 1 || n as usize > c.args.len() {
        return Promise::error(exception::domain_error("argument_index", Term::Int(n)));
    }
    match unify(&args[2], &c.args[n as usize - 1], env, false) {
        Some(env) => k(m, &env),
        None => Promise::fail(),
    }
}

/// `T =.. List`, both directions.
fn bi_univ(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    let t = env.resolve(&args[0]);
    match &t {
        Term::Var(_) => {
            let items = match list_view(&args[1], env) {
                ListView::Proper(items) => items,
                ListView::Partial(_, _) => {
                    return Promise::error(exception::instantiation_error())
                }
                ListView::NotList => {
                    return Promise::error(exception::type_error(
                        "list",
                        env.resolve(&args[1]),
                    ))
                }
            };
            let built = match items.split_first() {
                None => {
                    return Promise::error(exception::domain_error(
                        "non_empty_list",
                        Term::nil(),
                    ))
                }
                Some((head, rest)) => match env.resolve(head) {
                    Term::Atom(a) => Term::compound(a.as_str(), rest.iter().cloned()),
                    Term::Var(_) => return Promise::error(exception::instantiation_error()),
                    Term::Compound(c) => {
                        return Promise::error(exception::type_error(
                            "atomic",
                            Term::Compound(c),
                        ))
                    }
                    number if rest.is_empty() => number,
                    bad => return Promise::error(exception::type_error("atomic", bad)),
                },
            };
            match unify(&args[0], &built, env, false) {
                Some(env) => k(m, &env),
                None => Promise::fail(),
            }
        }
        Term::Compound(c) => {
            let mut items = vec![Term::Atom(c.functor.clone())];
            items.extend(c.args.iter().cloned());
            match unify(&args[1], &Term::list(items), env, false) {
                Some(env) => k(m, &env),
                None => Promise::fail(),
            }
        }
        atomic => match unify(&args[1], &Term::list([(*atomic).clone()]), env, false) {
            Some(env) => k(m, &env),
            None => Promise::fail(),
        },
    }
}

fn bi_copy_term(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    let mut map = HashMap::new();
    let copy = copy_term(&args[0], env, &mut map);
    match unify(&args[1], &copy, env, false) {
        Some(env) => k(m, &env),
        None => Promise::fail(),
    }
}

fn bi_ground(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    if is_ground(&args[0], env) {
        k(m, env)
    } else {
        Promise::fail()
    }
}

fn bi_acyclic_term(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    if is_acyclic(&args[0], env) {
        k(m, env)
    } else {
        Promise::fail()
    }
}

fn type_test(
    accept: impl Fn(&Term) -> bool + 'static,
) -> impl Fn(&mut Machine, &[Term], &Cont, &Env, u64) -> Promise {
    move |m, args, k, env, _barrier| {
        if accept(&env.resolve(&args[0])) {
            k(m, env)
        } else {
            Promise::fail()
        }
    }
}

fn bi_is_list(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    match list_view(&args[0], env) {
        ListView::Proper(_) => k(m, env),
        _ => Promise::fail(),
    }
}

fn sorted_list(args: &[Term], env: &Env, dedup: bool) -> Result<Term, Exception> {
    let mut items = match list_view(&args[0], env) {
        ListView::Proper(items) => items,
        ListView::Partial(_, _) => return Err(exception::instantiation_error()),
        ListView::NotList => {
            return Err(exception::type_error("list", env.resolve(&args[0])))
        }
    };
    items.sort_by(|a, b| compare_terms(a, b, env));
    if dedup {
        items.dedup_by(|a, b| compare_terms(a, b, env) == Ordering::Equal);
    }
    Ok(Term::list(items))
}

/// `sort/2`: standard order, duplicates removed.
fn bi_sort(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    match sorted_list(args, env, true) {
        Ok(sorted) => match unify(&args[1], &sorted, env, false) {
            Some(env) => k(m, &env),
            None => Promise::fail(),
        },
        Err(e) => Promise::error(e),
    }
}

/// `msort/2`: standard order, duplicates kept.
fn bi_msort(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    match sorted_list(args, env, false) {
        Ok(sorted) => match unify(&args[1], &sorted, env, false) {
            Some(env) => k(m, &env),
            None => Promise::fail(),
        },
        Err(e) => Promise::error(e),
    }
}

fn bi_is(m: &mut Machine, args: &[Term], k: &Cont, env: &Env, _barrier: u64) -> Promise {
    match arith::eval(&args[1], env) {
        Ok(n) => match unify(&args[0], &n.to_term(), env, false) {
            Some(env) => k(m, &env),
            None => Promise::fail(),
        },
        Err(e) => Promise::error(e),
    }
}

fn arith_test(
    accept: impl Fn(Ordering) -> bool + 'static,
) -> impl Fn(&mut Machine, &[Term], &Cont, &Env, u64) -> Promise {
    move |m, args, k, env, _barrier| {
        let a = match arith::eval(&args[0], env) {
            Ok(n) => n,
            Err(e) => return Promise::error(e),
        };
        let b = match arith::eval(&args[1], env) {
            Ok(n) => n,
            Err(e) => return Promise::error(e),
        };
        if accept(arith::compare(a, b)) {
            k(m, env)
        } else {
            Promise::fail()
        }
    }
}
