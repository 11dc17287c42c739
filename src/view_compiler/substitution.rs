//! Text edits that splice compiled views and extraction calls into a
//! prepared query.

use log::trace;

use super::errors::CompileError;
use super::sql_compiler::CompiledViewMap;
use crate::ecsql::functions::{EXTRACT_INSTANCE, EXTRACT_PROPERTY};
use crate::ecsql::{ExtractionSite, PreparedQuery};
use crate::schema_catalog::{ClassId, ECCLASSID, ECINSTANCEID};
use crate::utils::identifiers::{bracket_alias, quote_literal};
use crate::utils::text_edit::TextEdit;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitution {
    pub edits: Vec<TextEdit>,
    /// Deepest nesting among the substituted views, 0 when none
    pub depth: usize,
    pub referenced_views: Vec<ClassId>,
}

/// Call replacing a `$` / `$->Prop` site.
pub fn extraction_call(site: &ExtractionSite) -> String {
    let alias = bracket_alias(&site.alias);
    let class_id = format!("{}.{}", alias, bracket_alias(ECCLASSID));
    let instance_id = format!("{}.{}", alias, bracket_alias(ECINSTANCEID));
    match &site.property {
        None => format!("{}({}, {})", EXTRACT_INSTANCE, class_id, instance_id),
        Some(property) => format!(
            "{}({}, {}, {})",
            EXTRACT_PROPERTY,
            class_id,
            instance_id,
            quote_literal(property)
        ),
    }
}

/// Edits replacing every view class reference with its compiled fragment and
/// every extraction site with the matching function call.
pub fn substitution_edits(
    prepared: &PreparedQuery,
    views: &CompiledViewMap,
) -> Result<Substitution, CompileError> {
    let mut substitution = Substitution::default();

    for reference in prepared.class_references.iter().filter(|r| r.is_view) {
        let view = views
            .get(&reference.class_id)
            .ok_or_else(|| CompileError::MissingCompiledView {
                class: reference.class_name.clone(),
            })?;
        let replacement = if reference.has_alias {
            format!("({})", view.nested_sql)
        } else {
            format!("({}) {}", view.nested_sql, bracket_alias(&reference.class_name))
        };
        trace!("Substituting view {} at {:?}", view.qualified_name, reference.range);
        substitution
            .edits
            .push(TextEdit::new(reference.range.clone(), replacement));
        substitution.depth = substitution.depth.max(view.nesting_depth);
        if !substitution.referenced_views.contains(&view.class_id) {
            substitution.referenced_views.push(view.class_id);
        }
    }

    for site in &prepared.extraction_sites {
        substitution
            .edits
            .push(TextEdit::new(site.range.clone(), extraction_call(site)));
    }
    Ok(substitution)
}
