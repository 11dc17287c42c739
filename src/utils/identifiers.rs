//! ECSQL identifier quoting helpers.

/// Strip one level of `[...]` or `"..."` quoting.
///
/// # Examples
/// ```
/// use ecviews::utils::identifiers::unquote;
///
/// assert_eq!(unquote("[Name]"), "Name");
/// assert_eq!(unquote("\"Name\""), "Name");
/// assert_eq!(unquote("Name"), "Name");
/// ```
pub fn unquote(ident: &str) -> &str {
    let bytes = ident.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'[' && last == b']') || (first == b'"' && last == b'"') {
            return &ident[1..ident.len() - 1];
        }
    }
    ident
}

/// Bracket-quote an identifier. Dotted member access is quoted per segment.
///
/// # Examples
/// ```
/// use ecviews::utils::identifiers::bracket;
///
/// assert_eq!(bracket("Name"), "[Name]");
/// assert_eq!(bracket("Parent.Id"), "[Parent].[Id]");
/// ```
pub fn bracket(ident: &str) -> String {
    ident
        .split('.')
        .map(|segment| format!("[{}]", segment))
        .collect::<Vec<_>>()
        .join(".")
}

/// Bracket-quote an alias as a single identifier, even when it contains dots.
pub fn bracket_alias(alias: &str) -> String {
    format!("[{}]", alias)
}

/// Escape a value for use inside a single-quoted ECSQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
