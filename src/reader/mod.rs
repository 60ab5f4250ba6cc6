//! The source front end: tokenizer and term parser.
//!
//! The reader turns ISO-flavored Prolog text into terms. `?` placeholder
//! tokens are substituted left to right from marshaled host arguments, so
//! host values never pass through source-text quoting.

mod lexer;
mod parser;

pub use lexer::{Lexer, Span, SyntaxError, Token};
pub use parser::Parser;

use crate::config::Flags;
use crate::engine::term::{Term, Var};

/// Reads a whole program: every clause (and directive) in order.
pub fn read_program(src: &str, flags: Flags, binds: &[Term]) -> Result<Vec<Term>, SyntaxError> {
    let mut parser = Parser::new(src, flags, binds)?;
    let mut clauses = Vec::new();
    while let Some(clause) = parser.next_clause()? {
        clauses.push(clause);
    }
    Ok(clauses)
}

/// Reads exactly one goal, returning it together with its named variables
/// in first-occurrence order.
pub fn read_query(
    src: &str,
    flags: Flags,
    binds: &[Term],
) -> Result<(Term, Vec<(String, Var)>), SyntaxError> {
    let mut parser = Parser::new(src, flags, binds)?;
    let goal = parser
        .next_clause()?
        .ok_or_else(|| SyntaxError::new("empty query", Span::new(1, 1)))?;
    let vars = parser.named_vars();
    if parser.next_clause()?.is_some() {
        return Err(SyntaxError::new(
            "a query must be a single goal",
            Span::new(1, 1),
        ));
    }
    Ok((goal, vars))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_program_splits_clauses() {
        let clauses = read_program("a. b :- c. d.", Flags::default(), &[]).unwrap();
        assert_eq!(clauses.len(), 3);
        assert_eq!(clauses[0], Term::atom("a"));
        assert_eq!(clauses[2], Term::atom("d"));
    }

    #[test]
    fn test_read_query_returns_named_vars() {
        let (goal, vars) = read_query("append(X, Y, [a]).", Flags::default(), &[]).unwrap();
        assert_eq!(goal.as_compound().unwrap().functor, "append");
        let names: Vec<&str> = vars.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["X", "Y"]);
    }

    #[test]
    fn test_read_query_rejects_two_goals() {
        assert!(read_query("a. b.", Flags::default(), &[]).is_err());
        assert!(read_query("", Flags::default(), &[]).is_err());
    }

    #[test]
    fn test_variables_do_not_leak_across_clauses() {
        let clauses = read_program("f(X). g(X).", Flags::default(), &[]).unwrap();
        let x1 = &clauses[0].as_compound().unwrap().args[0];
        let x2 = &clauses[1].as_compound().unwrap().args[0];
        assert_ne!(x1, x2);
    }
}
