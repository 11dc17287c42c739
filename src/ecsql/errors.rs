use nom::error::{ContextError, ParseError};
use std::fmt;
use thiserror::Error;

/// nom error type for the ECSQL grammar. Collects the context labels of the
/// failing branch so the prepare error can say what was expected.
#[derive(Debug, PartialEq)]
pub struct EcSqlParsingError<'a> {
    pub errors: Vec<(&'a str, &'static str)>,
}

impl<'a> ParseError<&'a str> for EcSqlParsingError<'a> {
    fn from_error_kind(input: &'a str, _kind: nom::error::ErrorKind) -> Self {
        EcSqlParsingError {
            errors: vec![(input, "unexpected input")],
        }
    }

    fn append(_input: &'a str, _kind: nom::error::ErrorKind, other: Self) -> Self {
        other
    }
}

impl<'a> ContextError<&'a str> for EcSqlParsingError<'a> {
    fn add_context(input: &'a str, ctx: &'static str, mut other: Self) -> Self {
        other.errors.push((input, ctx));
        other
    }
}

impl fmt::Display for EcSqlParsingError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (input, ctx) in &self.errors {
            writeln!(f, "{}: {}", ctx, snippet(input))?;
        }
        Ok(())
    }
}

impl<'a> From<nom::error::Error<&'a str>> for EcSqlParsingError<'a> {
    fn from(err: nom::error::Error<&'a str>) -> Self {
        EcSqlParsingError {
            errors: vec![(err.input, "Unable to parse")],
        }
    }
}

/// First few characters of the remaining input, for error messages.
pub fn snippet(input: &str) -> String {
    let trimmed = input.trim_start();
    let mut out: String = trimmed.chars().take(40).collect();
    if trimmed.chars().count() > 40 {
        out.push_str("...");
    }
    if out.is_empty() {
        out.push_str("<end of input>");
    }
    out
}

/// Errors returned by [`QueryCompiler::prepare`](super::QueryCompiler::prepare).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PrepareError {
    #[error("Syntax error near '{near}'")]
    Syntax { near: String },
    #[error("ECSQL class '{class}' does not exist or could not be loaded.")]
    UnknownClass { class: String },
    #[error("ECSQL class '{class}' cannot be used in a query: it is an invalid view class.")]
    UnusableClass { class: String },
    #[error("Structs cannot be queried directly ('{class}').")]
    StructClassInFrom { class: String },
    #[error("No property or enumeration found for expression '{path}'.")]
    UnknownProperty { path: String },
    #[error("Expression '{path}' is ambiguous; qualify it with a class alias.")]
    AmbiguousProperty { path: String },
    #[error("Unknown alias '{alias}'.")]
    UnknownAlias { alias: String },
    #[error("Unknown function '{name}'.")]
    UnknownFunction { name: String },
    #[error("Function '{name}' expects {expected} argument(s), got {actual}.")]
    FunctionArity {
        name: String,
        expected: String,
        actual: usize,
    },
    #[error("Unknown CAST target type '{target}'.")]
    UnknownCastType { target: String },
    #[error("Common table expression '{cte}' declares {declared} column(s) but its query returns {returned}.")]
    CteColumnCount {
        cte: String,
        declared: usize,
        returned: usize,
    },
    #[error("Duplicate common table expression name '{cte}'.")]
    DuplicateCte { cte: String },
    #[error("All arms of a compound SELECT must return the same number of columns ({expected} <> {actual}).")]
    CompoundColumnCount { expected: usize, actual: usize },
    #[error("Subquery used as an expression must return exactly one column.")]
    ScalarSubqueryColumns,
    #[error("'{text}' is ambiguous: more than one class in FROM; qualify it with a class alias.")]
    AmbiguousInstanceAccess { text: String },
    #[error("'{text}' requires a FROM clause.")]
    InstanceAccessWithoutSource { text: String },
    #[error("Wildcard '{qualifier}.*' does not match any class alias.")]
    UnknownWildcardQualifier { qualifier: String },
    #[error("SELECT * requires a FROM clause.")]
    WildcardWithoutSource,
}
