//! Operator-precedence parser producing terms from token streams.

use std::collections::HashMap;

use crate::config::{DoubleQuotes, Flags};
use crate::engine::term::{Term, Var};
use crate::ops;
use crate::reader::lexer::{Lexer, Span, SyntaxError, Token};

pub struct Parser<'a> {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    flags: Flags,
    /// `?` placeholders are consumed left to right across the whole input.
    placeholders: &'a [Term],
    next_placeholder: usize,
    /// Source-level variable names of the clause being parsed.
    vars: HashMap<String, Var>,
    var_order: Vec<(String, Var)>,
}

impl<'a> Parser<'a> {
    pub fn new(src: &str, flags: Flags, placeholders: &'a [Term]) -> Result<Parser<'a>, SyntaxError> {
        Ok(Parser {
            tokens: Lexer::new(src).tokenize()?,
            pos: 0,
            flags,
            placeholders,
            next_placeholder: 0,
            vars: HashMap::new(),
            var_order: Vec::new(),
        })
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    fn advance(&mut self) -> (Token, Span) {
        let entry = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        entry
    }

    fn at_eof(&self) -> bool {
        *self.peek() == Token::Eof
    }

    /// Reads the next clause, or `None` at end of input. Variable scope is
    /// one clause: the same name denotes the same variable within a clause
    /// and different variables across clauses.
    pub fn next_clause(&mut self) -> Result<Option<Term>, SyntaxError> {
        if self.at_eof() {
            return Ok(None);
        }
        self.vars.clear();
        self.var_order.clear();
        let term = self.parse(1200)?.0;
        match self.advance() {
            (Token::Dot, _) => Ok(Some(term)),
            (other, span) => Err(SyntaxError::new(
                format!("expected end of clause, found {:?}", other),
                span,
            )),
        }
    }

    /// The named variables of the last parsed clause, in first-occurrence
    /// order.
    pub fn named_vars(&self) -> Vec<(String, Var)> {
        self.var_order.clone()
    }

    pub fn unused_placeholders(&self) -> bool {
        self.next_placeholder < self.placeholders.len()
    }

    fn variable(&mut self, name: String) -> Term {
        if name == "_" {
            return Term::var();
        }
        if let Some(v) = self.vars.get(&name) {
            return Term::Var(v.clone());
        }
        let v = Var::named(&name);
        self.vars.insert(name.clone(), v.clone());
        self.var_order.push((name, v.clone()));
        Term::Var(v)
    }

    fn string_term(&self, s: &str) -> Term {
        match self.flags.double_quotes {
            DoubleQuotes::Codes => Term::list(s.chars().map(|c| Term::Int(c as i64))),
            DoubleQuotes::Chars => Term::list(s.chars().map(|c| Term::atom(c.to_string()))),
            DoubleQuotes::Atom => Term::atom(s),
        }
    }

    /// Parses a term of priority at most `max`. Returns the term and its
    /// priority (0 for anything that is not an operator application).
    fn parse(&mut self, max: u16) -> Result<(Term, u16), SyntaxError> {
        let (mut left, mut left_priority) = self.parse_primary(max)?;
        loop {
            let op = match self.peek() {
                Token::Comma => ops::infix(","),
                Token::Atom(name) => ops::infix(name),
                _ => None,
            };
            let op = match op {
                Some(op) if op.priority <= max && left_priority <= op.left_max() => op,
                _ => break,
            };
            self.advance();
            let (right, _) = self.parse(op.right_max())?;
            left = Term::compound(op.name, [left, right]);
            left_priority = op.priority;
        }
        Ok((left, left_priority))
    }

    fn parse_primary(&mut self, max: u16) -> Result<(Term, u16), SyntaxError> {
        let (token, span) = self.advance();
        let term = match token {
            Token::Int(n) => Term::Int(n),
            Token::Float(f) => Term::Float(f),
            Token::Str(s) => self.string_term(&s),
            Token::Var(name) => self.variable(name),
            Token::Placeholder => {
                let i = self.next_placeholder;
                self.next_placeholder += 1;
                match self.placeholders.get(i) {
                    Some(t) => t.clone(),
                    None => {
                        return Err(SyntaxError::new(
                            "not enough arguments for ? placeholders",
                            span,
                        ))
                    }
                }
            }
            Token::LParen | Token::FunctorLParen => {
                let (term, _) = self.parse(1200)?;
                self.expect(Token::RParen)?;
                term
            }
            Token::LBracket => self.parse_list()?,
            Token::Atom(name) => return self.parse_atom_or_operator(name, max),
            other => {
                return Err(SyntaxError::new(
                    format!("unexpected {:?}", other),
                    span,
                ))
            }
        };
        Ok((term, 0))
    }

    fn parse_atom_or_operator(
        &mut self,
        name: String,
        max: u16,
    ) -> Result<(Term, u16), SyntaxError> {
        // functor application requires the `(` adjacent to the atom;
        // `f (a)` is the atom f applied to nothing
        if *self.peek() == Token::FunctorLParen {
            self.advance();
            let mut args = vec![self.parse(999)?.0];
            while *self.peek() == Token::Comma {
                self.advance();
                args.push(self.parse(999)?.0);
            }
            self.expect(Token::RParen)?;
            return Ok((Term::compound(&name, args), 0));
        }

        if let Some(op) = ops::prefix(&name) {
            if op.priority <= max && self.starts_term() {
                // negative numeric literals fold into the literal
                if name == "-" || name == "+" {
                    match *self.peek() {
                        Token::Int(n) => {
                            self.advance();
                            let n = if name == "-" { -n } else { n };
                            return Ok((Term::Int(n), 0));
                        }
                        Token::Float(f) => {
                            self.advance();
                            let f = if name == "-" { -f } else { f };
                            return Ok((Term::Float(f), 0));
                        }
                        _ => {}
                    }
                }
                let (arg, _) = self.parse(op.right_max())?;
                return Ok((Term::compound(&name, [arg]), op.priority));
            }
        }
        Ok((Term::atom(name), 0))
    }

    /// Whether the upcoming token can begin a term (decides if a prefix
    /// operator applies or stands as a plain atom).
    fn starts_term(&self) -> bool {
        matches!(
            self.peek(),
            Token::Int(_)
                | Token::Float(_)
                | Token::Str(_)
                | Token::Var(_)
                | Token::Atom(_)
                | Token::Placeholder
                | Token::LParen
                | Token::FunctorLParen
                | Token::LBracket
        )
    }

    fn parse_list(&mut self) -> Result<Term, SyntaxError> {
        let mut items = vec![self.parse(999)?.0];
        while *self.peek() == Token::Comma {
            self.advance();
            items.push(self.parse(999)?.0);
        }
        let tail = if *self.peek() == Token::Bar {
            self.advance();
            self.parse(999)?.0
        } else {
            Term::nil()
        };
        self.expect(Token::RBracket)?;
        Ok(Term::list_with_tail(items, tail))
    }

    fn expect(&mut self, want: Token) -> Result<(), SyntaxError> {
        let (got, span) = self.advance();
        if got == want {
            Ok(())
        } else {
            Err(SyntaxError::new(
                format!("expected {:?}, found {:?}", want, got),
                span,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(src: &str) -> Term {
        let mut p = Parser::new(src, Flags::default(), &[]).unwrap();
        p.next_clause().unwrap().unwrap()
    }

    #[test]
    fn test_fact() {
        let t = parse_one("parent(tom, bob).");
        assert_eq!(
            t,
            Term::compound("parent", [Term::atom("tom"), Term::atom("bob")])
        );
    }

    #[test]
    fn test_rule_structure() {
        let t = parse_one("a :- b, c.");
        let c = t.as_compound().unwrap();
        assert_eq!(c.functor, ":-");
        assert_eq!(c.args[0], Term::atom("a"));
        assert_eq!(
            c.args[1],
            Term::compound(",", [Term::atom("b"), Term::atom("c")])
        );
    }

    #[test]
    fn test_conjunction_is_right_associative() {
        let t = parse_one("a, b, c.");
        assert_eq!(
            t,
            Term::compound(
                ",",
                [
                    Term::atom("a"),
                    Term::compound(",", [Term::atom("b"), Term::atom("c")])
                ]
            )
        );
    }

    #[test]
    fn test_arithmetic_priorities() {
        // 1 + 2 * 3 parses as +(1, *(2, 3))
        let t = parse_one("X is 1 + 2 * 3.");
        let is = t.as_compound().unwrap();
        assert_eq!(is.functor, "is");
        assert_eq!(
            is.args[1],
            Term::compound(
                "+",
                [
                    Term::Int(1),
                    Term::compound("*", [Term::Int(2), Term::Int(3)])
                ]
            )
        );
    }

    #[test]
    fn test_left_associative_subtraction() {
        let t = parse_one("X is 10 - 3 - 2.");
        let is = t.as_compound().unwrap();
        assert_eq!(
            is.args[1],
            Term::compound(
                "-",
                [
                    Term::compound("-", [Term::Int(10), Term::Int(3)]),
                    Term::Int(2)
                ]
            )
        );
    }

    #[test]
    fn test_same_variable_shares_identity() {
        let t = parse_one("f(X, X, Y).");
        let c = t.as_compound().unwrap();
        assert_eq!(c.args[0], c.args[1]);
        assert_ne!(c.args[0], c.args[2]);
    }

    #[test]
    fn test_anonymous_variables_are_distinct() {
        let t = parse_one("f(_, _).");
        let c = t.as_compound().unwrap();
        assert_ne!(c.args[0], c.args[1]);
    }

    #[test]
    fn test_lists() {
        assert_eq!(
            parse_one("f([a, b])."),
            Term::compound("f", [Term::list([Term::atom("a"), Term::atom("b")])])
        );
        let t = parse_one("f([H|T]).");
        let c = t.as_compound().unwrap();
        let cell = c.args[0].as_compound().unwrap();
        assert_eq!(cell.functor, ".");
    }

    #[test]
    fn test_negative_literal_folds() {
        assert_eq!(parse_one("f(-42)."), Term::compound("f", [Term::Int(-42)]));
        // but subtraction still parses
        let t = parse_one("g(1-2).");
        assert_eq!(
            t,
            Term::compound("g", [Term::compound("-", [Term::Int(1), Term::Int(2)])])
        );
    }

    #[test]
    fn test_prefix_negation_operator() {
        let t = parse_one("a :- \\+ b.");
        let c = t.as_compound().unwrap();
        assert_eq!(c.args[1], Term::compound("\\+", [Term::atom("b")]));
    }

    #[test]
    fn test_directive() {
        let t = parse_one(":- dynamic(foo/1).");
        let c = t.as_compound().unwrap();
        assert_eq!(c.functor, ":-");
        assert_eq!(c.args.len(), 1);
        assert_eq!(
            c.args[0],
            Term::compound(
                "dynamic",
                [Term::compound("/", [Term::atom("foo"), Term::Int(1)])]
            )
        );
    }

    #[test]
    fn test_if_then_else_structure() {
        let t = parse_one("t :- (a -> b ; c).");
        let body = &t.as_compound().unwrap().args[1];
        let disj = body.as_compound().unwrap();
        assert_eq!(disj.functor, ";");
        let arrow = disj.args[0].as_compound().unwrap();
        assert_eq!(arrow.functor, "->");
    }

    #[test]
    fn test_operator_as_plain_atom() {
        // an operator with no operand after it reads as an atom
        let t = parse_one("f(-).");
        assert_eq!(t, Term::compound("f", [Term::atom("-")]));
    }

    #[test]
    fn test_double_quotes_flag() {
        let mut flags = Flags::default();
        let codes = {
            let mut p = Parser::new("f(\"ab\").", flags, &[]).unwrap();
            p.next_clause().unwrap().unwrap()
        };
        assert_eq!(
            codes,
            Term::compound("f", [Term::list([Term::Int(97), Term::Int(98)])])
        );

        flags.double_quotes = DoubleQuotes::Chars;
        let chars = {
            let mut p = Parser::new("f(\"ab\").", flags, &[]).unwrap();
            p.next_clause().unwrap().unwrap()
        };
        assert_eq!(
            chars,
            Term::compound("f", [Term::list([Term::atom("a"), Term::atom("b")])])
        );

        flags.double_quotes = DoubleQuotes::Atom;
        let atom = {
            let mut p = Parser::new("f(\"ab\").", flags, &[]).unwrap();
            p.next_clause().unwrap().unwrap()
        };
        assert_eq!(atom, Term::compound("f", [Term::atom("ab")]));
    }

    #[test]
    fn test_placeholders_substitute_in_order() {
        let binds = [Term::atom("a"), Term::Int(7)];
        let mut p = Parser::new("f(?, ?).", Flags::default(), &binds).unwrap();
        let t = p.next_clause().unwrap().unwrap();
        assert_eq!(
            t,
            Term::compound("f", [Term::atom("a"), Term::Int(7)])
        );
    }

    #[test]
    fn test_too_few_placeholder_arguments() {
        let mut p = Parser::new("f(?).", Flags::default(), &[]).unwrap();
        let err = p.next_clause().unwrap_err();
        assert!(err.message.contains("placeholder"));
    }

    #[test]
    fn test_missing_dot_is_an_error() {
        let mut p = Parser::new("foo", Flags::default(), &[]).unwrap();
        assert!(p.next_clause().is_err());
    }

    #[test]
    fn test_named_vars_reported_in_order() {
        let mut p = Parser::new("f(B, A, B).", Flags::default(), &[]).unwrap();
        p.next_clause().unwrap().unwrap();
        let names: Vec<String> = p.named_vars().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn test_curly_free_operator_expression() {
        let t = parse_one("p :- q ; r, s.");
        // ; has lower priority than ,
        let body = &t.as_compound().unwrap().args[1];
        let disj = body.as_compound().unwrap();
        assert_eq!(disj.functor, ";");
        assert_eq!(disj.args[0], Term::atom("q"));
        let conj = disj.args[1].as_compound().unwrap();
        assert_eq!(conj.functor, ",");
    }
}
