//! Class references in raw view query text.
//!
//! The cycle pass has to run before a view can be prepared (a cyclic view
//! never prepares), so references are found with a fault-tolerant token scan
//! built from the ECSQL lexer's token parsers rather than the full grammar.
//! Anything in a FROM or JOIN position is reported, including names inside
//! CTE bodies and FROM subqueries. Since CTE bodies are part of the scanned
//! text, a chain `view -> cte -> cte -> class` yields the class directly.

use nom::{
    branch::alt,
    character::complete::{anychar, char},
    combinator::{map, value},
    Parser,
};

use crate::ecsql::common::{
    bare_word, bracketed, double_quoted, is_reserved, numeric_literal, sp, string_literal,
    PResult,
};
use crate::ecsql::errors::EcSqlParsingError;

/// A class name found in a FROM / JOIN position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencedName {
    /// `None` for unqualified names (CTE names or unresolvable classes)
    pub schema: Option<String>,
    pub name: String,
}

impl ReferencedName {
    pub fn qualified(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Word { text: &'a str, quoted: bool },
    Dot,
    Colon,
    Comma,
    LParen,
    RParen,
    Other,
}

impl Token<'_> {
    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word { text, quoted: false } if text.eq_ignore_ascii_case(keyword))
    }
}

fn token(input: &str) -> PResult<'_, Token<'_>> {
    alt((
        value(Token::Other, string_literal),
        map(alt((bracketed, double_quoted)), |text| Token::Word {
            text,
            quoted: true,
        }),
        map(bare_word, |text| Token::Word {
            text,
            quoted: false,
        }),
        value(Token::Other, numeric_literal),
        value(Token::Dot, char('.')),
        value(Token::Colon, char(':')),
        value(Token::Comma, char(',')),
        value(Token::LParen, char('(')),
        value(Token::RParen, char(')')),
    ))
    .parse(input)
}

/// Tokens of `text`. Characters no token parser accepts are skipped one at
/// a time.
fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut input = text;
    loop {
        if let Ok((rest, ())) = sp(input) {
            input = rest;
        }
        // sp only stops at "/*" when the comment is never closed
        if input.is_empty() || input.starts_with("/*") {
            break;
        }
        match token(input) {
            Ok((rest, token)) => {
                tokens.push(token);
                input = rest;
            }
            Err(_) => match anychar::<_, EcSqlParsingError>(input) {
                Ok((rest, _)) => {
                    tokens.push(Token::Other);
                    input = rest;
                }
                Err(_) => break,
            },
        }
    }
    tokens
}

struct Scanner<'a> {
    tokens: Vec<Token<'a>>,
    /// One entry per open parenthesis: whether it opened a FROM subquery
    parens: Vec<bool>,
    found: Vec<ReferencedName>,
}

impl<'a> Scanner<'a> {
    fn token(&self, i: usize) -> Option<&Token<'a>> {
        self.tokens.get(i)
    }

    fn run(mut self) -> Vec<ReferencedName> {
        let mut i = 0;
        while i < self.tokens.len() {
            let token = &self.tokens[i];
            if token.is_keyword("FROM") || token.is_keyword("JOIN") {
                i = self.table_list(i + 1);
            } else if *token == Token::LParen {
                self.parens.push(false);
                i += 1;
            } else if *token == Token::RParen {
                i += 1;
                if self.parens.pop() == Some(true) {
                    i = self.after_table_source(i);
                }
            } else {
                i += 1;
            }
        }
        self.found
    }

    /// Comma-separated table sources starting at `i`.
    fn table_list(&mut self, mut i: usize) -> usize {
        loop {
            if self.token(i) == Some(&Token::LParen) {
                // Subquery: its own FROM clauses are found by the main loop
                self.parens.push(true);
                return i + 1;
            }
            i = self.class_name(i);
            i = self.skip_alias(i);
            if self.token(i) == Some(&Token::Comma) {
                i += 1;
                continue;
            }
            return i;
        }
    }

    fn after_table_source(&mut self, i: usize) -> usize {
        let i = self.skip_alias(i);
        if self.token(i) == Some(&Token::Comma) {
            self.table_list(i + 1)
        } else {
            i
        }
    }

    fn class_name(&mut self, mut i: usize) -> usize {
        while let Some(token) = self.token(i) {
            if token.is_keyword("ONLY") || token.is_keyword("ALL") {
                i += 1;
            } else {
                break;
            }
        }

        let Some(Token::Word { text: first, .. }) = self.token(i).cloned() else {
            return i;
        };
        let (reference, next) = match (self.token(i + 1), self.token(i + 2)) {
            (Some(Token::Dot | Token::Colon), Some(Token::Word { text: second, .. })) => (
                ReferencedName {
                    schema: Some(first.to_string()),
                    name: second.to_string(),
                },
                i + 3,
            ),
            _ => (
                ReferencedName {
                    schema: None,
                    name: first.to_string(),
                },
                i + 1,
            ),
        };

        // Table-valued function, not a class
        if self.token(next) == Some(&Token::LParen) {
            return next;
        }
        if !self.found.contains(&reference) {
            self.found.push(reference);
        }
        next
    }

    fn skip_alias(&self, i: usize) -> usize {
        match self.token(i) {
            Some(token) if token.is_keyword("AS") => match self.token(i + 1) {
                Some(Token::Word { .. }) => i + 2,
                _ => i + 1,
            },
            Some(Token::Word { quoted: true, .. }) => i + 1,
            Some(Token::Word { text, quoted: false }) if !is_reserved(text) => i + 1,
            _ => i,
        }
    }
}

/// Names in FROM / JOIN positions of `query`, in first-seen order, without
/// duplicates.
pub fn extract_references(query: &str) -> Vec<ReferencedName> {
    let scanner = Scanner {
        tokens: tokenize(query),
        parens: Vec::new(),
        found: Vec::new(),
    };
    scanner.run()
}
