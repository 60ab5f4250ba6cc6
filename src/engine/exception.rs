//! Prolog exceptions and the standard `error(Kind, Context)` constructors.
//!
//! Exceptions are first-class terms. They are raised with `throw/1` (or by
//! built-ins), caught with `catch/3`, and only reach the host when no
//! catcher matches.

use std::fmt;

use crate::engine::env::Env;
use crate::engine::term::{Indicator, Term};
use crate::writer;

/// An error carried as a Prolog term.
#[derive(Debug, Clone, PartialEq)]
pub struct Exception {
    term: Term,
}

impl Exception {
    pub fn new(term: Term) -> Exception {
        Exception { term }
    }

    pub fn term(&self) -> &Term {
        &self.term
    }

    pub fn into_term(self) -> Term {
        self.term
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&writer::term_to_string(&self.term, &Env::new()))
    }
}

impl std::error::Error for Exception {}

fn error(kind: Term, info: &str) -> Exception {
    Exception::new(Term::compound("error", [kind, Term::atom(info)]))
}

pub fn instantiation_error() -> Exception {
    error(
        Term::atom("instantiation_error"),
        "Arguments are not sufficiently instantiated.",
    )
}

pub fn type_error(valid_type: &str, culprit: Term) -> Exception {
    error(
        Term::compound("type_error", [Term::atom(valid_type), culprit]),
        &format!("Expected {}.", valid_type),
    )
}

pub fn domain_error(valid_domain: &str, culprit: Term) -> Exception {
    error(
        Term::compound("domain_error", [Term::atom(valid_domain), culprit]),
        &format!("Invalid value for {}.", valid_domain),
    )
}

pub fn existence_error_procedure(indicator: &Indicator) -> Exception {
    error(
        Term::compound(
            "existence_error",
            [Term::atom("procedure"), indicator.to_term()],
        ),
        "Unknown procedure.",
    )
}

pub fn permission_error(operation: &str, permission_type: &str, culprit: Term) -> Exception {
    error(
        Term::compound(
            "permission_error",
            [Term::atom(operation), Term::atom(permission_type), culprit],
        ),
        &format!("Operation {} not allowed for {}.", operation, permission_type),
    )
}

pub fn representation_error(limit: &str) -> Exception {
    error(
        Term::compound("representation_error", [Term::atom(limit)]),
        &format!("Invalid {}.", limit),
    )
}

pub fn evaluation_error(kind: &str, info: &str) -> Exception {
    error(
        Term::compound("evaluation_error", [Term::atom(kind)]),
        info,
    )
}

pub fn int_overflow() -> Exception {
    evaluation_error("int_overflow", "Integer overflow.")
}

pub fn zero_divisor() -> Exception {
    evaluation_error("zero_divisor", "Divided by zero.")
}

pub fn system_error(message: &str) -> Exception {
    error(Term::atom("system_error"), message)
}
