//! Errors crossing the host boundary.

use std::fmt;

use crate::engine::env::Env;
use crate::engine::term::Term;
use crate::reader::SyntaxError;
use crate::writer;

/// What a query or consult can report back to the host.
///
/// Prolog-level failure (no solutions) is not an error for `query`; only
/// `query_solution` turns an empty stream into [`Error::NoSolutions`].
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The source text did not parse.
    Syntax(SyntaxError),
    /// An uncaught Prolog exception, carrying the thrown term.
    Exception(Term),
    /// `query_solution` found no solution.
    NoSolutions,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Syntax(e) => e.fmt(f),
            Error::Exception(t) => {
                write!(f, "uncaught exception: {}", writer::term_to_string(t, &Env::new()))
            }
            Error::NoSolutions => f.write_str("no solutions"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Syntax(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SyntaxError> for Error {
    fn from(e: SyntaxError) -> Error {
        Error::Syntax(e)
    }
}
