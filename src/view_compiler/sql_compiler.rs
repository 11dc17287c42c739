//! Rewrites a validated view query into its nested-select fragment.
//!
//! ```text
//! SELECT [K0] AS [ECInstanceId], [K1] AS [ECClassId], [K2] AS [Name]
//! FROM (<view query with each output expression aliased K0..Kn>) [ClassName]
//! ```
//!
//! The rewrite is span based: the select list of every top-level SELECT core
//! (one per UNION arm) is replaced, view class references elsewhere in the
//! text are replaced by their own compiled fragments, and extraction sites by
//! the extraction function calls. Output aliases named in GROUP BY, HAVING or
//! ORDER BY are renamed to the synthetic alias of their column. Nothing is regenerated from the AST, so
//! the author's WHERE, GROUP BY, CTEs and comments survive untouched.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use super::errors::CompileError;
use super::substitution::substitution_edits;
use crate::ecsql::functions::NAVIGATION_VALUE;
use crate::ecsql::{PreparedQuery, SlotSource};
use crate::schema_catalog::{ClassId, ViewClassDefinition};
use crate::utils::identifiers::{bracket, bracket_alias};
use crate::utils::synthetic_alias::{slot_alias, sub_slot_alias};
use crate::utils::text_edit::{apply_edits, render_range, TextEdit};
use crate::view_validation::property_validator::{BindingKind, PropertyBinding};

/// Compiled views keyed by class id.
pub type CompiledViewMap = HashMap<ClassId, Arc<CompiledView>>;

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledView {
    pub class_id: ClassId,
    pub qualified_name: String,
    pub class_name: String,
    pub nested_sql: String,
    /// Public property name to the synthetic alias(es) it reads from
    pub alias_map: Vec<(String, Vec<String>)>,
    /// 1 for a view over physical classes only
    pub nesting_depth: usize,
    pub referenced_views: Vec<ClassId>,
    /// First `$` / `$->Prop` text in this view or any view it reads from
    pub experimental_feature: Option<String>,
}

impl CompiledView {
    pub fn uses_experimental_features(&self) -> bool {
        self.experimental_feature.is_some()
    }

    pub fn aliases_for(&self, property: &str) -> Option<&[String]> {
        self.alias_map
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(property))
            .map(|(_, aliases)| aliases.as_slice())
    }
}

fn render_slot(text: &str, slot: &SlotSource, edits: &[TextEdit]) -> String {
    match slot {
        SlotSource::Span { range, member } => {
            let rendered = render_range(text, range.clone(), edits);
            match member {
                Some(member) => format!("{}.{}", rendered, bracket_alias(member)),
                None => rendered,
            }
        }
        SlotSource::Synthesized(expression) => expression.clone(),
    }
}

fn aliases_of(column: usize, slots: usize) -> Vec<String> {
    if slots == 1 {
        vec![slot_alias(column)]
    } else {
        (0..slots).map(|slot| sub_slot_alias(column, slot)).collect()
    }
}

/// Compile one validated view. `bindings` come from the property validator;
/// every view `prepared` references must already be in `views`.
pub fn compile_view(
    view: &ViewClassDefinition,
    prepared: &PreparedQuery,
    bindings: &[PropertyBinding],
    views: &CompiledViewMap,
    max_nesting_depth: usize,
) -> Result<CompiledView, CompileError> {
    let substitution = substitution_edits(prepared, views)?;
    let nesting_depth = substitution.depth + 1;
    if nesting_depth > max_nesting_depth {
        return Err(CompileError::ViewNestingTooDeep {
            class: view.qualified_name.clone(),
            depth: nesting_depth,
            max: max_nesting_depth,
        });
    }

    let text = view.raw_query_text.as_str();
    let list_spans: Vec<_> = prepared
        .projections
        .iter()
        .map(|p| p.list_span.clone())
        .collect();
    let mut edits: Vec<TextEdit> = substitution
        .edits
        .iter()
        .filter(|edit| {
            !list_spans
                .iter()
                .any(|span| edit.range.start >= span.start && edit.range.end <= span.end)
        })
        .cloned()
        .collect();

    for projection in &prepared.projections {
        let mut items = Vec::new();
        for (column, slots) in projection.columns.iter().enumerate() {
            for (slot, alias) in slots.iter().zip(aliases_of(column, slots.len())) {
                items.push(format!(
                    "{} AS {}",
                    render_slot(text, slot, &substitution.edits),
                    bracket_alias(&alias)
                ));
            }
        }
        edits.push(TextEdit::new(projection.list_span.clone(), items.join(", ")));
    }

    // Navigation columns are ordered and grouped by their id slot
    let slot_counts: Vec<usize> = prepared
        .projections
        .first()
        .map(|p| p.columns.iter().map(Vec::len).collect())
        .unwrap_or_default();
    for reference in &prepared.alias_references {
        let alias = match slot_counts.get(reference.column) {
            Some(&count) if count > 1 => sub_slot_alias(reference.column, 0),
            _ => slot_alias(reference.column),
        };
        edits.push(TextEdit::new(reference.range.clone(), alias));
    }

    let rewritten = apply_edits(text, &edits);
    let inner = rewritten.trim().trim_end_matches(';').trim_end();

    let mut outer = Vec::with_capacity(bindings.len());
    let mut alias_map = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let column = binding.column_index;
        match &binding.kind {
            BindingKind::Single => {
                let alias = slot_alias(column);
                outer.push(format!(
                    "{} AS {}",
                    bracket_alias(&alias),
                    bracket_alias(&binding.name)
                ));
                alias_map.push((binding.name.clone(), vec![alias]));
            }
            BindingKind::Navigation { relationship } => {
                let aliases = aliases_of(column, 2);
                outer.push(format!(
                    "{}({}, {}, {}) AS {}",
                    NAVIGATION_VALUE.to_ascii_uppercase(),
                    bracket(relationship),
                    bracket_alias(&aliases[0]),
                    bracket_alias(&aliases[1]),
                    bracket_alias(&binding.name)
                ));
                alias_map.push((binding.name.clone(), aliases));
            }
        }
    }

    let nested_sql = format!(
        "SELECT {} FROM ({}) {}",
        outer.join(", "),
        inner,
        bracket_alias(&view.class_name)
    );
    debug!(
        "Compiled view {} (depth {}): {}",
        view.qualified_name, nesting_depth, nested_sql
    );

    let experimental_feature = prepared
        .extraction_sites
        .first()
        .and_then(|site| text.get(site.range.clone()))
        .map(str::to_string)
        .or_else(|| {
            substitution
                .referenced_views
                .iter()
                .filter_map(|id| views.get(id))
                .find_map(|v| v.experimental_feature.clone())
        });

    Ok(CompiledView {
        class_id: view.class_id,
        qualified_name: view.qualified_name.clone(),
        class_name: view.class_name.clone(),
        nested_sql,
        alias_map,
        nesting_depth,
        referenced_views: substitution.referenced_views,
        experimental_feature,
    })
}
