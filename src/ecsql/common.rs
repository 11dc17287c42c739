use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_until, take_while, take_while1},
    character::complete::{char, digit1},
    combinator::{opt, recognize},
    error::ParseError,
    multi::many0,
    sequence::{delimited, pair, preceded},
    IResult, Parser,
};

use super::errors::EcSqlParsingError;

pub type PResult<'a, O> = IResult<&'a str, O, EcSqlParsingError<'a>>;

/// Words that cannot be used as bare identifiers or aliases.
const RESERVED_WORDS: &[&str] = &[
    "ALL", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CAST", "CROSS", "DESC", "DISTINCT",
    "ELSE", "END", "ESCAPE", "EXCEPT", "EXISTS", "FALSE", "FROM", "GROUP", "HAVING", "IN",
    "INNER", "INTERSECT", "IS", "JOIN", "LEFT", "LIKE", "LIMIT", "NATURAL", "NOT", "NULL",
    "OFFSET", "ON", "ONLY", "OR", "ORDER", "OUTER", "RECURSIVE", "RIGHT", "SELECT", "THEN",
    "TRUE", "UNION", "USING", "WHEN", "WHERE", "WITH",
];

pub fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS.iter().any(|w| w.eq_ignore_ascii_case(word))
}

pub fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub fn fail<'a, O>(input: &'a str, ctx: &'static str) -> PResult<'a, O> {
    Err(nom::Err::Error(EcSqlParsingError {
        errors: vec![(input, ctx)],
    }))
}

fn line_comment(input: &str) -> PResult<'_, &str> {
    recognize(pair(tag("--"), take_while(|c| c != '\n'))).parse(input)
}

fn block_comment(input: &str) -> PResult<'_, &str> {
    recognize((tag("/*"), take_until("*/"), tag("*/"))).parse(input)
}

fn whitespace1(input: &str) -> PResult<'_, &str> {
    take_while1(|c: char| c.is_whitespace()).parse(input)
}

/// Skip whitespace and comments.
pub fn sp(input: &str) -> PResult<'_, ()> {
    let (input, _) = many0(alt((whitespace1, line_comment, block_comment))).parse(input)?;
    Ok((input, ()))
}

pub fn ws<'a, O, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = EcSqlParsingError<'a>>
where
    F: Parser<&'a str, Output = O, Error = EcSqlParsingError<'a>>,
{
    delimited(sp, inner, sp)
}

fn tag_ci<'a>(word: &'static str, input: &'a str) -> PResult<'a, &'a str> {
    tag_no_case(word).parse(input)
}

/// Case-insensitive keyword that must not run into an identifier character.
pub fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    move |input: &'a str| {
        let (input, _) = sp(input)?;
        let (rest, matched) = tag_ci(word, input)?;
        if rest.starts_with(is_ident_char) {
            return Err(nom::Err::Error(EcSqlParsingError::from_error_kind(
                input,
                nom::error::ErrorKind::Tag,
            )));
        }
        let (rest, _) = sp(rest)?;
        Ok((rest, matched))
    }
}

/// Punctuation or operator token surrounded by optional whitespace.
pub fn symbol<'a>(token: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    move |input: &'a str| {
        let (input, _) = sp(input)?;
        let (rest, matched) = tag(token).parse(input)?;
        let (rest, _) = sp(rest)?;
        Ok((rest, matched))
    }
}

pub fn bare_word(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        take_while1(is_ident_start),
        take_while(is_ident_char),
    ))
    .parse(input)
}

pub fn bracketed(input: &str) -> PResult<'_, &str> {
    delimited(char('['), take_while1(|c| c != ']'), char(']')).parse(input)
}

pub fn double_quoted(input: &str) -> PResult<'_, &str> {
    delimited(char('"'), take_while1(|c| c != '"'), char('"')).parse(input)
}

/// Identifier token without surrounding whitespace; rejects reserved words
/// unless quoted. Returns the unquoted name.
pub fn ident_token(input: &str) -> PResult<'_, &str> {
    alt((bracketed, double_quoted, unreserved_word)).parse(input)
}

fn unreserved_word(input: &str) -> PResult<'_, &str> {
    let (rest, word) = bare_word(input)?;
    if is_reserved(word) {
        return fail(input, "identifier");
    }
    Ok((rest, word))
}

/// Identifier token that may be a reserved word (member access after `.`).
pub fn member_token(input: &str) -> PResult<'_, &str> {
    alt((bracketed, double_quoted, bare_word)).parse(input)
}

pub fn identifier(input: &str) -> PResult<'_, &str> {
    ws(ident_token).parse(input)
}

/// `'text'` with `''` escapes. Returns the text between the quotes.
pub fn string_literal(input: &str) -> PResult<'_, &str> {
    delimited(
        char('\''),
        recognize(many0(alt((tag("''"), take_while1(|c| c != '\''))))),
        char('\''),
    )
    .parse(input)
}

/// Integer, decimal or hex numeric literal text.
pub fn numeric_literal(input: &str) -> PResult<'_, &str> {
    alt((
        recognize(pair(
            tag_no_case("0x"),
            take_while1(|c: char| c.is_ascii_hexdigit()),
        )),
        recognize((
            alt((
                recognize((digit1, opt(pair(char('.'), take_while(|c: char| c.is_ascii_digit()))))),
                recognize(pair(char('.'), digit1)),
            )),
            opt((
                alt((char('e'), char('E'))),
                opt(alt((char('+'), char('-')))),
                digit1,
            )),
        )),
    ))
    .parse(input)
}

/// `?` or `:name`
pub fn parameter(input: &str) -> PResult<'_, &str> {
    alt((tag("?"), recognize(preceded(char(':'), bare_word)))).parse(input)
}
