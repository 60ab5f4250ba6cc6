//! End-to-end tests of the resolution engine through the host API:
//! solution order, cut scoping, exceptions, and database updates during
//! backtracking.

use std::collections::HashMap;

use hornlog::{Engine, Error, Term};

fn engine_with(src: &str) -> Engine {
    let mut e = Engine::new();
    e.consult(src).expect("test program should load");
    e
}

/// All solutions of `query`, projected on one variable.
fn bindings(e: &mut Engine, query: &str, var: &str) -> Vec<Term> {
    let mut sols = e.query(query, &[]).unwrap();
    let mut out = Vec::new();
    while sols.next() {
        out.push(sols.get(var).unwrap());
    }
    assert!(sols.err().is_none(), "unexpected error: {:?}", sols.err());
    out
}

fn solution_count(e: &mut Engine, query: &str) -> usize {
    let mut sols = e.query(query, &[]).unwrap();
    let mut n = 0;
    while sols.next() {
        n += 1;
    }
    assert!(sols.err().is_none(), "unexpected error: {:?}", sols.err());
    n
}

fn atoms(names: &[&str]) -> Vec<Term> {
    names.iter().map(Term::atom).collect()
}

#[test]
fn append_enumerates_all_splits() {
    let mut e = engine_with(
        "append([], L, L).
         append([X|L1], L2, [X|L3]) :- append(L1, L2, L3).",
    );

    let mut sols = e.query("append(X, Y, [a, b]).", &[]).unwrap();

    assert!(sols.next());
    assert_eq!(sols.get("X"), Some(Term::nil()));
    assert_eq!(sols.get("Y"), Some(Term::list(atoms(&["a", "b"]))));

    assert!(sols.next());
    assert_eq!(sols.get("X"), Some(Term::list(atoms(&["a"]))));
    assert_eq!(sols.get("Y"), Some(Term::list(atoms(&["b"]))));

    assert!(sols.next());
    assert_eq!(sols.get("X"), Some(Term::list(atoms(&["a", "b"]))));
    assert_eq!(sols.get("Y"), Some(Term::nil()));

    assert!(!sols.next());
    assert!(sols.err().is_none());
}

#[test]
fn cut_prunes_clause_alternatives() {
    let mut e = engine_with("p(a). p(b) :- !. p(c).");

    assert_eq!(bindings(&mut e, "p(X).", "X"), atoms(&["a", "b"]));

    // the cut is local to each call of p/1
    let mut sols = e.query("p(X), p(Y).", &[]).unwrap();
    let mut pairs = Vec::new();
    while sols.next() {
        pairs.push((sols.get("X").unwrap(), sols.get("Y").unwrap()));
    }
    let a = Term::atom("a");
    let b = Term::atom("b");
    assert_eq!(
        pairs,
        vec![
            (a.clone(), a.clone()),
            (a.clone(), b.clone()),
            (b.clone(), a),
            (b.clone(), b)
        ]
    );
}

#[test]
fn call_opens_a_fresh_cut_barrier() {
    let mut e = Engine::new();
    assert_eq!(solution_count(&mut e, "call(!), fail ; true."), 1);
    assert_eq!(solution_count(&mut e, "!, fail ; true."), 0);
}

#[test]
fn cut_in_the_middle_of_a_query() {
    let mut e = engine_with(
        "teaches(dr_fred, history).
         teaches(dr_fred, english).
         teaches(dr_fred, drama).
         teaches(dr_fiona, physics).
         studies(alice, english).
         studies(angus, english).
         studies(amelia, drama).
         studies(alex, physics).",
    );

    assert_eq!(
        bindings(
            &mut e,
            "teaches(dr_fred, Course), studies(Student, Course).",
            "Student"
        ),
        atoms(&["alice", "angus", "amelia"])
    );

    // committing to the first Course before any Student is found
    assert_eq!(
        solution_count(
            &mut e,
            "teaches(dr_fred, Course), !, studies(Student, Course)."
        ),
        0
    );

    // cut after the first full answer
    assert_eq!(
        bindings(
            &mut e,
            "teaches(dr_fred, Course), studies(Student, Course), !.",
            "Student"
        ),
        atoms(&["alice"])
    );

    // cut before anything: no choice points exist yet
    assert_eq!(
        bindings(
            &mut e,
            "!, teaches(dr_fred, Course), studies(Student, Course).",
            "Student"
        ),
        atoms(&["alice", "angus", "amelia"])
    );
}

#[test]
fn if_then_else_commits_to_the_condition() {
    let mut e = engine_with("q(1). q(2).");

    // the condition is deterministic: only its first solution is used
    assert_eq!(bindings(&mut e, "(q(X) -> true ; fail).", "X"), vec![Term::Int(1)]);

    // failing condition runs the else branch
    assert_eq!(
        bindings(&mut e, "(fail -> X = then ; X = else).", "X"),
        atoms(&["else"])
    );

    // bare if-then fails when the condition fails
    assert_eq!(solution_count(&mut e, "(fail -> true)."), 0);
}

#[test]
fn negation_as_failure() {
    let mut e = engine_with("p(a).");

    assert_eq!(solution_count(&mut e, "\\+ true."), 0);
    assert_eq!(solution_count(&mut e, "\\+ fail."), 1);
    assert_eq!(solution_count(&mut e, "\\+ p(a)."), 0);
    assert_eq!(solution_count(&mut e, "\\+ p(b)."), 1);

    // bindings made inside the negated goal do not leak out
    assert_eq!(
        bindings(&mut e, "\\+ (X = 1, fail), X = 2.", "X"),
        vec![Term::Int(2)]
    );
}

#[test]
fn repeat_streams_and_respects_cut() {
    let mut e = Engine::new();
    assert_eq!(solution_count(&mut e, "repeat, !, fail."), 0);

    let mut sols = e.query("repeat, (X = a ; X = b).", &[]).unwrap();
    let mut seen = Vec::new();
    for _ in 0..4 {
        assert!(sols.next());
        seen.push(sols.get("X").unwrap());
    }
    assert_eq!(seen, atoms(&["a", "b", "a", "b"]));
    sols.close();
}

#[test]
fn catch_then_cut_commits_once() {
    let mut e = engine_with(
        "foo :- catch(true, _, true), !.
         foo :- throw(unreachable).",
    );
    let mut sols = e.query("foo.", &[]).unwrap();
    assert!(sols.next());
    assert!(!sols.next());
    assert!(sols.err().is_none());
}

#[test]
fn call_then_cut_commits_once() {
    let mut e = engine_with(
        "foo :- call(true), !.
         foo :- throw(unreachable).",
    );
    let mut sols = e.query("foo.", &[]).unwrap();
    assert!(sols.next());
    assert!(!sols.next());
    assert!(sols.err().is_none());
}

#[test]
fn catch_binds_the_ball_and_runs_recovery() {
    let mut e = Engine::new();
    let sol = e
        .query_solution("catch(throw(oops(1)), oops(N), true).", &[])
        .unwrap();
    assert_eq!(sol.get("N"), Some(&Term::Int(1)));

    // a non-matching catcher rethrows
    let mut sols = e.query("catch(throw(a), b, true).", &[]).unwrap();
    assert!(!sols.next());
    assert_eq!(sols.err(), Some(&Error::Exception(Term::atom("a"))));
}

#[test]
fn throw_requires_an_instantiated_ball() {
    let mut e = Engine::new();
    let mut sols = e.query("throw(_).", &[]).unwrap();
    assert!(!sols.next());
    match sols.err() {
        Some(Error::Exception(t)) => {
            let c = t.as_compound().unwrap();
            assert_eq!(c.args[0], Term::atom("instantiation_error"));
        }
        other => panic!("expected instantiation error, got {:?}", other),
    }
}

#[test]
fn uncaught_exceptions_reach_the_host() {
    let mut e = Engine::new();
    let mut sols = e.query("throw(boom).", &[]).unwrap();
    assert!(!sols.next());
    assert_eq!(sols.err(), Some(&Error::Exception(Term::atom("boom"))));
}

#[test]
fn retract_commits_even_when_a_later_goal_throws() {
    let mut e = engine_with(
        ":- dynamic(foo/1).
         foo(a). foo(b). foo(c).",
    );

    let mut sols = e.query("retract(foo(X)), throw(e).", &[]).unwrap();
    assert!(!sols.next());
    assert_eq!(sols.err(), Some(&Error::Exception(Term::atom("e"))));

    // the first clause is gone for good
    assert_eq!(solution_count(&mut e, "foo(a)."), 0);
    assert_eq!(bindings(&mut e, "foo(X).", "X"), atoms(&["b", "c"]));
}

#[test]
fn retract_backtracks_through_matches() {
    let mut e = engine_with(
        ":- dynamic(foo/1).
         foo(a). foo(b). foo(c).",
    );
    assert_eq!(
        bindings(&mut e, "retract(foo(X)).", "X"),
        atoms(&["a", "b", "c"])
    );
    assert_eq!(solution_count(&mut e, "foo(X)."), 0);
}

#[test]
fn counter_with_retract_and_asserta() {
    let mut e = engine_with(
        ":- dynamic(count/1).
         count(0).
         next(N) :- retract(count(X)), N is X + 1, asserta(count(N)).",
    );

    for expected in 1..=3 {
        let sol = e.query_solution("next(X).", &[]).unwrap();
        assert_eq!(sol.get("X"), Some(&Term::Int(expected)));
    }
}

#[test]
fn occurs_check_and_cyclic_bindings() {
    let mut e = Engine::new();
    assert_eq!(solution_count(&mut e, "unify_with_occurs_check(X, f(X))."), 0);

    // plain unification creates the cyclic binding; acyclic_term sees it
    assert_eq!(solution_count(&mut e, "X = f(X), acyclic_term(X)."), 0);
    assert_eq!(solution_count(&mut e, "acyclic_term(f(a, _))."), 1);
}

#[test]
fn solutions_scan_and_vars() {
    let mut e = engine_with("pair(a, 1).");
    let mut sols = e.query("pair(X, Y).", &[]).unwrap();
    assert_eq!(sols.vars(), vec!["X".to_string(), "Y".to_string()]);

    assert!(sols.next());
    let mut m = HashMap::new();
    sols.scan(&mut m);
    assert_eq!(m["X"], Term::atom("a"));
    assert_eq!(m["Y"], Term::Int(1));
}

#[test]
fn query_placeholders_marshal_host_values() {
    let mut e = engine_with("foo(a, 1, 2.0, [abc, def]).");
    let sol = e.query_solution(
        "foo(?, ?, ?, ?).",
        &[
            "a".into(),
            1i64.into(),
            2.0.into(),
            vec!["abc", "def"].into(),
        ],
    );
    assert!(sol.is_ok());
}

#[test]
fn unknown_flag_controls_missing_procedures() {
    use hornlog::config::Unknown;

    let mut e = Engine::new();
    let mut sols = e.query("no_such_predicate.", &[]).unwrap();
    assert!(!sols.next());
    assert!(matches!(sols.err(), Some(Error::Exception(_))));
    drop(sols);

    e.flags_mut().unknown = Unknown::Fail;
    assert_eq!(solution_count(&mut e, "no_such_predicate."), 0);
}

#[test]
fn double_quotes_flag_changes_string_reading() {
    use hornlog::config::DoubleQuotes;

    let mut e = Engine::new();
    assert_eq!(solution_count(&mut e, "\"ab\" = [97, 98]."), 1);

    e.flags_mut().double_quotes = DoubleQuotes::Chars;
    assert_eq!(solution_count(&mut e, "\"ab\" = [a, b]."), 1);

    e.flags_mut().double_quotes = DoubleQuotes::Atom;
    assert_eq!(solution_count(&mut e, "\"ab\" = ab."), 1);
}

#[test]
fn prelude_forall_and_not() {
    let mut e = engine_with("n(1). n(2). n(3).");
    assert_eq!(solution_count(&mut e, "forall(n(X), X > 0)."), 1);
    assert_eq!(solution_count(&mut e, "forall(n(X), X > 1)."), 0);
    assert_eq!(solution_count(&mut e, "not(n(4))."), 1);
    assert_eq!(solution_count(&mut e, "ignore(n(4)), n(1)."), 1);
}

#[test]
fn deep_recursion_stays_off_the_call_stack() {
    let mut e = engine_with(
        "countdown(0).
         countdown(N) :- N > 0, M is N - 1, countdown(M).",
    );
    assert_eq!(solution_count(&mut e, "countdown(50000)."), 1);
}
