//! Synthetic column aliases for compiled views.
//!
//! A compiled view renames every output expression of the view query to a
//! positional alias so the outer SELECT can map it back to the class's public
//! property name without caring what the view author called it.
//!
//! ## Format
//! - `K{i}` for a single-slot column at output position `i`
//! - `K{i}_{j}` for slot `j` of a multi-slot column (navigation properties
//!   use `_0` for the id and `_1` for the relationship class id)

/// Alias for a single-slot column.
///
/// # Examples
/// ```
/// use ecviews::utils::synthetic_alias::slot_alias;
///
/// assert_eq!(slot_alias(0), "K0");
/// assert_eq!(slot_alias(12), "K12");
/// ```
pub fn slot_alias(position: usize) -> String {
    format!("K{position}")
}

/// Alias for one slot of a multi-slot column.
///
/// # Examples
/// ```
/// use ecviews::utils::synthetic_alias::sub_slot_alias;
///
/// assert_eq!(sub_slot_alias(3, 0), "K3_0");
/// assert_eq!(sub_slot_alias(3, 1), "K3_1");
/// ```
pub fn sub_slot_alias(position: usize, slot: usize) -> String {
    format!("K{position}_{slot}")
}

/// Parse an alias back into `(position, slot)`.
///
/// # Examples
/// ```
/// use ecviews::utils::synthetic_alias::parse_slot_alias;
///
/// assert_eq!(parse_slot_alias("K4"), Some((4, None)));
/// assert_eq!(parse_slot_alias("K4_1"), Some((4, Some(1))));
/// assert_eq!(parse_slot_alias("Name"), None);
/// assert_eq!(parse_slot_alias("K"), None);
/// ```
pub fn parse_slot_alias(alias: &str) -> Option<(usize, Option<usize>)> {
    let rest = alias.strip_prefix('K')?;
    match rest.split_once('_') {
        Some((position, slot)) => Some((parse_digits(position)?, Some(parse_digits(slot)?))),
        None => Some((parse_digits(rest)?, None)),
    }
}

fn parse_digits(s: &str) -> Option<usize> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
