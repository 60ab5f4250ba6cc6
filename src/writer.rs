//! Operator-aware term formatting.
//!
//! Lists print as `[a, b|T]`, known operators print in operator notation
//! with minimal parentheses, atoms are quoted when their spelling requires
//! it. Cyclic bindings print `...` at the point of re-entry.

use std::collections::HashSet;
use std::fmt::Write;

use crate::engine::env::Env;
use crate::engine::term::{Atom, Term};
use crate::ops;

/// Renders `t` with the bindings of `env` substituted in.
pub fn term_to_string(t: &Term, env: &Env) -> String {
    let mut out = String::new();
    let mut path = HashSet::new();
    write_term(&mut out, t, env, 1200, &mut path);
    out
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&term_to_string(self, &Env::new()))
    }
}

fn write_term(out: &mut String, t: &Term, env: &Env, max: u16, path: &mut HashSet<u64>) {
    // resolve one variable hop at a time so cycles stay detectable
    let t = match t {
        Term::Var(v) => match env.lookup(v) {
            Some(bound) => {
                if !path.insert(v.tag()) {
                    out.push_str("...");
                    return;
                }
                let bound = bound.clone();
                write_term(out, &bound, env, max, path);
                path.remove(&v.tag());
                return;
            }
            None => {
                match v.name() {
                    Some(name) => out.push_str(name),
                    None => {
                        let _ = write!(out, "_G{}", v.tag());
                    }
                }
                return;
            }
        },
        other => other.clone(),
    };

    match &t {
        Term::Atom(a) => write_atom(out, a),
        Term::Int(n) => {
            let _ = write!(out, "{}", n);
        }
        Term::Float(f) => write_float(out, *f),
        Term::Var(_) => unreachable!("variables are handled above"),
        Term::Compound(c) => {
            if c.functor == "." && c.args.len() == 2 {
                write_list(out, &t, env, path);
                return;
            }
            if c.args.len() == 2 {
                if let Some(op) = ops::infix(c.functor.as_str()) {
                    let parens = op.priority > max;
                    if parens {
                        out.push('(');
                    }
                    write_term(out, &c.args[0], env, op.left_max(), path);
                    if c.functor == "," {
                        out.push_str(", ");
                    } else {
                        let _ = write!(out, " {} ", c.functor);
                    }
                    write_term(out, &c.args[1], env, op.right_max(), path);
                    if parens {
                        out.push(')');
                    }
                    return;
                }
            }
            if c.args.len() == 1 {
                if let Some(op) = ops::prefix(c.functor.as_str()) {
                    let parens = op.priority > max;
                    if parens {
                        out.push('(');
                    }
                    write_atom(out, &c.functor);
                    out.push(' ');
                    write_term(out, &c.args[0], env, op.right_max(), path);
                    if parens {
                        out.push(')');
                    }
                    return;
                }
            }
            write_atom(out, &c.functor);
            out.push('(');
            for (i, arg) in c.args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_term(out, arg, env, 999, path);
            }
            out.push(')');
        }
    }
}

fn write_list(out: &mut String, t: &Term, env: &Env, path: &mut HashSet<u64>) {
    out.push('[');
    let mut first = true;
    let mut spine: Vec<u64> = Vec::new();
    let mut cur = t.clone();
    loop {
        let next = match &cur {
            Term::Compound(c) if c.functor == "." && c.args.len() == 2 => {
                if !first {
                    out.push_str(", ");
                }
                first = false;
                write_term(out, &c.args[0], env, 999, path);
                c.args[1].clone()
            }
            Term::Atom(a) if *a == "[]" => break,
            Term::Var(v) => match env.lookup(v) {
                Some(bound) => {
                    if spine.contains(&v.tag()) {
                        out.push_str("|...");
                        break;
                    }
                    spine.push(v.tag());
                    bound.clone()
                }
                None => {
                    out.push('|');
                    write_term(out, &cur, env, 999, path);
                    break;
                }
            },
            other => {
                out.push('|');
                write_term(out, other, env, 999, path);
                break;
            }
        };
        cur = next;
    }
    out.push(']');
}

fn write_float(out: &mut String, f: f64) {
    if f.fract() == 0.0 && f.is_finite() && f.abs() < 1e15 {
        let _ = write!(out, "{:.1}", f);
    } else {
        let _ = write!(out, "{}", f);
    }
}

fn write_atom(out: &mut String, a: &Atom) {
    let name = a.as_str();
    if needs_quotes(name) {
        out.push('\'');
        for c in name.chars() {
            match c {
                '\'' => out.push_str("\\'"),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                other => out.push(other),
            }
        }
        out.push('\'');
    } else {
        out.push_str(name);
    }
}

fn needs_quotes(name: &str) -> bool {
    if matches!(name, "[]" | "!" | ";" | "{}") {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        None => true,
        Some(first) if first.is_lowercase() => {
            !name.chars().all(|c| c.is_alphanumeric() || c == '_')
        }
        Some(_) => !name.chars().all(|c| {
            matches!(
                c,
                '+' | '-' | '*' | '/' | '\\' | '^' | '<' | '>' | '=' | '~' | ':' | '.' | '?'
                    | '@' | '#' | '&' | '$'
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::term::Var;

    fn show(t: &Term) -> String {
        term_to_string(t, &Env::new())
    }

    #[test]
    fn test_atoms_and_numbers() {
        assert_eq!(show(&Term::atom("foo")), "foo");
        assert_eq!(show(&Term::Int(-3)), "-3");
        assert_eq!(show(&Term::Float(1.5)), "1.5");
        assert_eq!(show(&Term::Float(2.0)), "2.0");
    }

    #[test]
    fn test_atom_quoting() {
        assert_eq!(show(&Term::atom("hello world")), "'hello world'");
        assert_eq!(show(&Term::atom("Uppercase")), "'Uppercase'");
        assert_eq!(show(&Term::atom(":-")), ":-");
        assert_eq!(show(&Term::atom("[]")), "[]");
        assert_eq!(show(&Term::atom("it's")), "'it\\'s'");
    }

    #[test]
    fn test_canonical_compound() {
        let t = Term::compound("f", [Term::atom("a"), Term::Int(1)]);
        assert_eq!(show(&t), "f(a, 1)");
    }

    #[test]
    fn test_lists() {
        assert_eq!(show(&Term::nil()), "[]");
        let l = Term::list([Term::atom("a"), Term::atom("b")]);
        assert_eq!(show(&l), "[a, b]");
        let partial = Term::list_with_tail([Term::atom("a")], Term::Var(Var::named("T")));
        assert_eq!(show(&partial), "[a|T]");
    }

    #[test]
    fn test_operator_notation() {
        let t = Term::compound(
            ":-",
            [
                Term::atom("a"),
                Term::compound(",", [Term::atom("b"), Term::atom("c")]),
            ],
        );
        assert_eq!(show(&t), "a :- b, c");
    }

    #[test]
    fn test_operator_parenthesization() {
        // (1 + 2) * 3 keeps its parentheses, 1 + (2 * 3) drops them
        let sum = Term::compound("+", [Term::Int(1), Term::Int(2)]);
        let t = Term::compound("*", [sum.clone(), Term::Int(3)]);
        assert_eq!(show(&t), "(1 + 2) * 3");

        let product = Term::compound("*", [Term::Int(2), Term::Int(3)]);
        let t = Term::compound("+", [Term::Int(1), product]);
        assert_eq!(show(&t), "1 + 2 * 3");
    }

    #[test]
    fn test_unbound_variables() {
        assert_eq!(show(&Term::Var(Var::named("X"))), "X");
        let anon = Var::fresh();
        assert_eq!(show(&Term::Var(anon.clone())), format!("_G{}", anon.tag()));
    }

    #[test]
    fn test_bindings_are_substituted() {
        let x = Var::named("X");
        let env = Env::new().extend(&x, Term::atom("bound"));
        assert_eq!(term_to_string(&Term::Var(x), &env), "bound");
    }

    #[test]
    fn test_cyclic_term_prints_finitely() {
        let x = Var::fresh();
        let cyclic = Term::compound("f", [Term::Var(x.clone())]);
        let env = Env::new().extend(&x, cyclic);
        let shown = term_to_string(&Term::Var(x), &env);
        assert_eq!(shown, "f(...)");
    }

    #[test]
    fn test_prefix_operator() {
        let t = Term::compound("\\+", [Term::atom("a")]);
        assert_eq!(show(&t), "\\+ a");
    }
}
