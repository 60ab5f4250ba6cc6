//! Tokenizer for ISO-flavored Prolog source text.

use std::fmt;

/// Position of a token, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Span {
        Span { line, column }
    }
}

/// A syntax error with location information, shared by lexer and parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> SyntaxError {
        SyntaxError {
            message: message.into(),
            line: span.line,
            column: span.column,
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "syntax error at {}:{}: {}",
            self.line, self.column, self.message
        )
    }
}

impl std::error::Error for SyntaxError {}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Name, symbolic, or quoted atom; also `!`, `;`, `[]`.
    Atom(String),
    /// `Foo`, `_Foo`, or `_`.
    Var(String),
    Int(i64),
    Float(f64),
    /// A `"..."` literal; its term form depends on the `double_quotes` flag.
    Str(String),
    LParen,
    /// `(` immediately following an atom, opening an argument list.
    /// `f(a)` is a compound; `f (a)` is not.
    FunctorLParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Bar,
    /// Clause-terminating `.`.
    Dot,
    /// `?`, substituted from host arguments.
    Placeholder,
    Eof,
}

/// Characters that glue together into symbolic atoms such as `:-` or `=..`.
fn is_symbol_char(c: char) -> bool {
    matches!(
        c,
        '+' | '-' | '*' | '/' | '\\' | '^' | '<' | '>' | '=' | '~' | ':' | '.' | '?' | '@' | '#'
            | '&' | '$'
    )
}

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
    /// Set when the previous token was an atom with `(` directly after it.
    functor_paren: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Lexer<'a> {
        // a leading shebang line is skipped, as in executable scripts
        let (input, line) = if input.starts_with("#!") {
            match input.split_once('\n') {
                Some((_, rest)) => (rest, 2),
                None => ("", 2),
            }
        } else {
            (input, 1)
        };
        Lexer {
            chars: input.chars().peekable(),
            line,
            column: 1,
            functor_paren: false,
        }
    }

    pub fn span(&self) -> Span {
        Span::new(self.line, self.column)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), SyntaxError> {
        loop {
            while let Some(c) = self.peek() {
                if c.is_whitespace() {
                    self.advance();
                } else {
                    break;
                }
            }
            match self.peek() {
                Some('%') => {
                    while let Some(c) = self.advance() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('/') => {
                    // block comment or the atom `/`
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    if lookahead.peek() == Some(&'*') {
                        let start = self.span();
                        self.advance();
                        self.advance();
                        let mut depth = 1;
                        while depth > 0 {
                            match self.advance() {
                                Some('*') if self.peek() == Some('/') => {
                                    self.advance();
                                    depth -= 1;
                                }
                                Some('/') if self.peek() == Some('*') => {
                                    self.advance();
                                    depth += 1;
                                }
                                Some(_) => {}
                                None => {
                                    return Err(SyntaxError::new(
                                        "unterminated block comment",
                                        start,
                                    ))
                                }
                            }
                        }
                    } else {
                        return Ok(());
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn read_while(&mut self, first: char, keep: impl Fn(char) -> bool) -> String {
        let mut s = String::new();
        s.push(first);
        while let Some(c) = self.peek() {
            if keep(c) {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }
        s
    }

    fn read_escape(&mut self, start: Span) -> Result<char, SyntaxError> {
        match self.advance() {
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some('a') => Ok('\x07'),
            Some('b') => Ok('\x08'),
            Some('f') => Ok('\x0c'),
            Some('v') => Ok('\x0b'),
            Some('0') => Ok('\0'),
            Some('\\') => Ok('\\'),
            Some('\'') => Ok('\''),
            Some('"') => Ok('"'),
            Some('`') => Ok('`'),
            Some(c) => Ok(c),
            None => Err(SyntaxError::new("unterminated escape sequence", start)),
        }
    }

    fn read_quoted(&mut self, delimiter: char, start: Span) -> Result<String, SyntaxError> {
        let mut s = String::new();
        loop {
            match self.advance() {
                Some(c) if c == delimiter => {
                    // a doubled delimiter is a literal one
                    if self.peek() == Some(delimiter) {
                        self.advance();
                        s.push(delimiter);
                    } else {
                        return Ok(s);
                    }
                }
                Some('\\') => s.push(self.read_escape(start)?),
                Some(c) => s.push(c),
                None => {
                    return Err(SyntaxError::new(
                        format!("unterminated {} literal", delimiter),
                        start,
                    ))
                }
            }
        }
    }

    fn read_number(&mut self, first: char, start: Span) -> Result<Token, SyntaxError> {
        // 0'c reads the character code of c
        if first == '0' && self.peek() == Some('\'') {
            self.advance();
            let c = match self.advance() {
                Some('\\') => self.read_escape(start)?,
                Some(c) => c,
                None => return Err(SyntaxError::new("unterminated character code", start)),
            };
            return Ok(Token::Int(c as i64));
        }

        let mut digits = self.read_while(first, |c| c.is_ascii_digit());

        // fraction: only when a digit follows the dot, so clause-final
        // dots after an integer stay clause-final
        let mut is_float = false;
        if self.peek() == Some('.') {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if lookahead.peek().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                digits.push('.');
                self.advance();
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        digits.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            let next = lookahead.peek().copied();
            let digit_after_sign = matches!(next, Some('+') | Some('-')) && {
                lookahead.next();
                lookahead.peek().is_some_and(|c| c.is_ascii_digit())
            };
            if next.is_some_and(|c| c.is_ascii_digit()) || digit_after_sign {
                is_float = true;
                digits.push(self.advance().unwrap());
                if matches!(self.peek(), Some('+') | Some('-')) {
                    digits.push(self.advance().unwrap());
                }
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        digits.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        if is_float {
            digits
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| SyntaxError::new(format!("bad float {}", digits), start))
        } else {
            digits
                .parse::<i64>()
                .map(Token::Int)
                .map_err(|_| SyntaxError::new(format!("integer out of range: {}", digits), start))
        }
    }

    pub fn next_token(&mut self) -> Result<(Token, Span), SyntaxError> {
        if std::mem::take(&mut self.functor_paren) && self.peek() == Some('(') {
            let start = self.span();
            self.advance();
            return Ok((Token::FunctorLParen, start));
        }
        self.skip_whitespace_and_comments()?;
        let start = self.span();

        let c = match self.advance() {
            Some(c) => c,
            None => return Ok((Token::Eof, start)),
        };

        let token = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => {
                if self.peek() == Some(']') {
                    self.advance();
                    Token::Atom("[]".to_string())
                } else {
                    Token::LBracket
                }
            }
            ']' => Token::RBracket,
            ',' => Token::Comma,
            '|' => Token::Bar,
            '!' => Token::Atom("!".to_string()),
            ';' => Token::Atom(";".to_string()),
            '\'' => {
                let atom = self.read_quoted('\'', start)?;
                self.functor_paren = self.peek() == Some('(');
                Token::Atom(atom)
            }
            '"' => Token::Str(self.read_quoted('"', start)?),
            '_' => {
                let name = self.read_while('_', |c| c.is_alphanumeric() || c == '_');
                Token::Var(name)
            }
            c if c.is_ascii_digit() => self.read_number(c, start)?,
            c if c.is_lowercase() => {
                let name = self.read_while(c, |c| c.is_alphanumeric() || c == '_');
                self.functor_paren = self.peek() == Some('(');
                Token::Atom(name)
            }
            c if c.is_uppercase() => {
                Token::Var(self.read_while(c, |c| c.is_alphanumeric() || c == '_'))
            }
            c if is_symbol_char(c) => {
                let run = self.read_while(c, is_symbol_char);
                match run.as_str() {
                    "." => Token::Dot,
                    "?" => Token::Placeholder,
                    _ => {
                        self.functor_paren = self.peek() == Some('(');
                        Token::Atom(run)
                    }
                }
            }
            other => {
                return Err(SyntaxError::new(
                    format!("unexpected character {:?}", other),
                    start,
                ))
            }
        };
        Ok((token, start))
    }

    /// Tokenizes the whole input, ending with `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<(Token, Span)>, SyntaxError> {
        let mut tokens = Vec::new();
        loop {
            let (token, span) = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push((token, span));
            if done {
                return Ok(tokens);
            }
        }
    }
}
