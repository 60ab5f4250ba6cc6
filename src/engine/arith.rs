//! The arithmetic evaluator behind `is/2` and the numeric comparisons.
//!
//! Integers are fixed-width `i64`; every integer operation is checked and
//! overflow raises `evaluation_error(int_overflow)`. Mixed operands promote
//! to float.

use std::cmp::Ordering;

use crate::engine::env::Env;
use crate::engine::exception::{self, Exception};
use crate::engine::term::Term;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn to_term(self) -> Term {
        match self {
            Number::Int(n) => Term::Int(n),
            Number::Float(f) => Term::Float(f),
        }
    }

    fn as_float(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(f) => f,
        }
    }
}

/// Numeric comparison with int/float promotion, as used by `=:=` and
/// friends. Unlike the standard order of terms, `1 =:= 1.0` holds.
pub fn compare(a: Number, b: Number) -> Ordering {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x.cmp(&y),
        _ => a.as_float().total_cmp(&b.as_float()),
    }
}

/// Evaluates an arithmetic expression under `env`.
pub fn eval(t: &Term, env: &Env) -> Result<Number, Exception> {
    let t = env.resolve(t);
    match &t {
        Term::Var(_) => Err(exception::instantiation_error()),
        Term::Int(n) => Ok(Number::Int(*n)),
        Term::Float(f) => Ok(Number::Float(*f)),
        Term::Atom(a) => match a.as_str() {
            "pi" => Ok(Number::Float(std::f64::consts::PI)),
            "e" => Ok(Number::Float(std::f64::consts::E)),
            _ => Err(exception::type_error(
                "evaluable",
                Term::compound("/", [t.clone(), Term::Int(0)]),
            )),
        },
        Term::Compound(c) => {
            let name = c.functor.as_str();
            match (name, c.args.len()) {
                ("-", 1) => neg(eval(&c.args[0], env)?),
                ("+", 1) => eval(&c.args[0], env),
                ("abs", 1) => abs(eval(&c.args[0], env)?),
                ("sign", 1) => sign(eval(&c.args[0], env)?),
                ("float", 1) => Ok(Number::Float(eval(&c.args[0], env)?.as_float())),
                ("truncate", 1) => truncate(eval(&c.args[0], env)?),
                (_, 2) => {
                    let a = eval(&c.args[0], env)?;
                    let b = eval(&c.args[1], env)?;
                    match binary(name, a, b) {
                        Some(result) => result,
                        None => Err(exception::type_error(
                            "evaluable",
                            Term::compound("/", [Term::atom(name), Term::Int(2)]),
                        )),
                    }
                }
                _ => Err(exception::type_error(
                    "evaluable",
                    Term::compound("/", [Term::atom(name), Term::Int(c.args.len() as i64)]),
                )),
            }
        }
    }
}

fn neg(a: Number) -> Result<Number, Exception> {
    match a {
        Number::Int(n) => n
            .checked_neg()
            .map(Number::Int)
            .ok_or_else(exception::int_overflow),
        Number::Float(f) => Ok(Number::Float(-f)),
    }
}

fn abs(a: Number) -> Result<Number, Exception> {
    match a {
        Number::Int(n) => n
            .checked_abs()
            .map(Number::Int)
            .ok_or_else(exception::int_overflow),
        Number::Float(f) => Ok(Number::Float(f.abs())),
    }
}

fn sign(a: Number) -> Result<Number, Exception> {
    Ok(match a {
        Number::Int(n) => Number::Int(n.signum()),
        Number::Float(f) => Number::Float(if f == 0.0 { 0.0 } else { f.signum() }),
    })
}

fn truncate(a: Number) -> Result<Number, Exception> {
    match a {
        Number::Int(n) => Ok(Number::Int(n)),
        Number::Float(f) => {
            if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                Ok(Number::Int(f.trunc() as i64))
            } else {
                Err(exception::int_overflow())
            }
        }
    }
}

/// `None` means the function is unknown at this arity.
fn binary(name: &str, a: Number, b: Number) -> Option<Result<Number, Exception>> {
    use Number::{Float, Int};
    let result = match (name, a, b) {
        ("+", Int(x), Int(y)) => checked(x.checked_add(y)),
        ("-", Int(x), Int(y)) => checked(x.checked_sub(y)),
        ("*", Int(x), Int(y)) => checked(x.checked_mul(y)),
        ("+", _, _) => Ok(Float(a.as_float() + b.as_float())),
        ("-", _, _) => Ok(Float(a.as_float() - b.as_float())),
        ("*", _, _) => Ok(Float(a.as_float() * b.as_float())),

        // integer division on two integers, float division otherwise
        ("/", Int(x), Int(y)) | ("//", Int(x), Int(y)) => int_div(x, y),
        ("/", _, _) => {
            if b.as_float() == 0.0 {
                Err(exception::zero_divisor())
            } else {
                Ok(Float(a.as_float() / b.as_float()))
            }
        }
        ("//", _, _) => return Some(Err(type_error_int(a, b))),

        ("mod", Int(x), Int(y)) => int_mod(x, y),
        ("rem", Int(x), Int(y)) => int_rem(x, y),
        ("mod", _, _) | ("rem", _, _) => return Some(Err(type_error_int(a, b))),

        ("min", _, _) => Ok(if compare(b, a) == Ordering::Less { b } else { a }),
        ("max", _, _) => Ok(if compare(b, a) == Ordering::Greater { b } else { a }),

        ("^", Int(x), Int(y)) if y >= 0 => {
            let exp = u32::try_from(y).ok().ok_or_else(exception::int_overflow);
            match exp {
                Ok(exp) => checked(x.checked_pow(exp)),
                Err(e) => Err(e),
            }
        }
        ("^", _, _) => Ok(Float(a.as_float().powf(b.as_float()))),

        _ => return None,
    };
    Some(result)
}

fn checked(n: Option<i64>) -> Result<Number, Exception> {
    n.map(Number::Int).ok_or_else(exception::int_overflow)
}

fn int_div(x: i64, y: i64) -> Result<Number, Exception> {
    if y == 0 {
        return Err(exception::zero_divisor());
    }
    checked(x.checked_div(y))
}

/// `mod` is floored: the result takes the sign of the divisor.
fn int_mod(x: i64, y: i64) -> Result<Number, Exception> {
    if y == 0 {
        return Err(exception::zero_divisor());
    }
    match x.checked_rem(y) {
        Some(r) if r != 0 && (r < 0) != (y < 0) => Ok(Number::Int(r + y)),
        Some(r) => Ok(Number::Int(r)),
        None => Err(exception::int_overflow()),
    }
}

/// `rem` is truncated: the result takes the sign of the dividend.
fn int_rem(x: i64, y: i64) -> Result<Number, Exception> {
    if y == 0 {
        return Err(exception::zero_divisor());
    }
    x.checked_rem(y)
        .map(Number::Int)
        .ok_or_else(exception::int_overflow)
}

fn type_error_int(a: Number, b: Number) -> Exception {
    let culprit = match (a, b) {
        (Number::Float(f), _) => Term::Float(f),
        (_, Number::Float(f)) => Term::Float(f),
        (Number::Int(n), _) => Term::Int(n),
    };
    exception::type_error("integer", culprit)
}
