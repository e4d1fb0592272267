//! Predicate parser: turns textual predicates into `expr` ASTs.
//!
//! Grammar (one predicate string):
//!
//! ```text
//! pred := cmp ('and' cmp)*
//! cmp  := expr op expr        op := '==' '!=' '<' '<=' '>' '>='
//! expr := term (('+'|'-') term)*
//! term := INT | PARAM '.' IDENT
//! ```
//!
//! `PARAM` is a single capital letter bound by the enclosing pipeline.
//! Parsing happens once per predicate at pipeline build time; the search
//! loop only ever sees the compiled form.

#[cfg(test)]
mod tests;

use common::{SolverError, SolverResult};
use expr::{CmpOp, Comparison, Predicate, Term};

/// Parse one predicate string into a conjunction of comparisons.
pub fn parse_predicate(input: &str) -> SolverResult<Predicate> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        src: input,
    };
    let predicate = parser.predicate()?;
    parser.expect_end()?;
    Ok(predicate)
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Int(i64),
    Ident(String),
    Dot,
    Plus,
    Minus,
    Cmp(CmpOp),
    And,
}

fn tokenize(input: &str) -> SolverResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Cmp(CmpOp::Eq));
                } else {
                    return Err(err(input, "'=' is not an operator; use '=='"));
                }
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Cmp(CmpOp::Ne));
                } else {
                    return Err(err(input, "'!' is not an operator; use '!='"));
                }
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Cmp(CmpOp::Le));
                } else {
                    tokens.push(Token::Cmp(CmpOp::Lt));
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Cmp(CmpOp::Ge));
                } else {
                    tokens.push(Token::Cmp(CmpOp::Gt));
                }
            }
            '0'..='9' => {
                let mut digits = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        digits.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let n = digits
                    .parse::<i64>()
                    .map_err(|_| err(input, &format!("integer literal '{digits}' out of range")))?;
                tokens.push(Token::Int(n));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&a) = chars.peek() {
                    if a.is_ascii_alphanumeric() || a == '_' {
                        ident.push(a);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if ident == "and" {
                    tokens.push(Token::And);
                } else {
                    tokens.push(Token::Ident(ident));
                }
            }
            other => {
                return Err(err(input, &format!("unexpected character '{other}'")));
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    src: &'a str,
}

impl<'a> Parser<'a> {
    fn predicate(&mut self) -> SolverResult<Predicate> {
        let mut comparisons = vec![self.comparison()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            comparisons.push(self.comparison()?);
        }
        Ok(Predicate::new(comparisons))
    }

    fn comparison(&mut self) -> SolverResult<Comparison> {
        let left = self.expr()?;
        let op = match self.next() {
            Some(Token::Cmp(op)) => op,
            Some(other) => {
                return Err(err(
                    self.src,
                    &format!("expected comparison operator, found {}", describe(&other)),
                ))
            }
            None => return Err(err(self.src, "expected comparison operator, found end of input")),
        };
        let right = self.expr()?;
        Ok(Comparison { left, op, right })
    }

    fn expr(&mut self) -> SolverResult<Term> {
        let mut term = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    let rhs = self.term()?;
                    term = Term::Add(Box::new(term), Box::new(rhs));
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    let rhs = self.term()?;
                    term = Term::Sub(Box::new(term), Box::new(rhs));
                }
                _ => break,
            }
        }
        Ok(term)
    }

    fn term(&mut self) -> SolverResult<Term> {
        match self.next() {
            Some(Token::Int(n)) => Ok(Term::Int(n)),
            // Unary minus on a literal only; fields negate via `0 - A.x`.
            Some(Token::Minus) => match self.next() {
                Some(Token::Int(n)) => Ok(Term::Int(-n)),
                _ => Err(err(self.src, "'-' must be followed by an integer literal here")),
            },
            Some(Token::Ident(ident)) => {
                let mut param_chars = ident.chars();
                let param = param_chars.next().unwrap_or('?');
                if param_chars.next().is_some() || !param.is_ascii_uppercase() {
                    return Err(err(
                        self.src,
                        &format!("parameter '{ident}' must be a single capital letter"),
                    ));
                }
                match self.next() {
                    Some(Token::Dot) => {}
                    _ => {
                        return Err(err(
                            self.src,
                            &format!("expected '.' after parameter '{param}'"),
                        ))
                    }
                }
                match self.next() {
                    Some(Token::Ident(name)) => Ok(Term::field(param, name)),
                    _ => Err(err(
                        self.src,
                        &format!("expected field name after '{param}.'"),
                    )),
                }
            }
            Some(other) => Err(err(
                self.src,
                &format!("expected a term, found {}", describe(&other)),
            )),
            None => Err(err(self.src, "expected a term, found end of input")),
        }
    }

    fn expect_end(&mut self) -> SolverResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(tok) => Err(err(
                self.src,
                &format!("trailing input after predicate: {}", describe(tok)),
            )),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Int(n) => format!("integer '{n}'"),
        Token::Ident(s) => format!("identifier '{s}'"),
        Token::Dot => "'.'".to_string(),
        Token::Plus => "'+'".to_string(),
        Token::Minus => "'-'".to_string(),
        Token::Cmp(_) => "comparison operator".to_string(),
        Token::And => "'and'".to_string(),
    }
}

fn err(src: &str, message: &str) -> SolverError {
    SolverError::Predicate(format!("{message} in \"{src}\""))
}
