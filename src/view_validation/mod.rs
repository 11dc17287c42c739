//! View class validation pass.
//!
//! Runs over every view class of a catalog (committed plus incoming classes):
//!
//! 1. reference graph and cycle detection, on raw query text
//! 2. per view, in dependency order: prepare, resolve the column shape,
//!    validate it against the declared properties, compile
//! 3. summary
//!
//! Validation never stops at the first invalid class; the caller decides
//! what to do with a failed report.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, info};

pub mod dependency_graph;
pub mod diagnostics;
pub mod property_validator;
pub mod reference_extractor;
pub mod shape_resolver;

use crate::config::ViewConfig;
use crate::ecsql::QueryCompiler;
use crate::schema_catalog::{ClassId, SchemaCatalog, ViewClassDefinition};
use crate::view_compiler::{compile_view, CompiledViewMap, CompiledViewScope};
use dependency_graph::DependencyGraph;
use diagnostics::{
    cycle_message, invalid_view_message, parse_failed_message, prepare_failed_message, Issue,
    IssueListener, IssueReporter, ValidationCategory, ValidationReport,
};

pub use diagnostics::{CollectingListener, Severity};

/// Outcome of [`validate_views`].
#[derive(Debug)]
pub struct ViewValidationOutput {
    pub report: ValidationReport,
    /// Compiled views of every valid view class
    pub compiled: CompiledViewMap,
}

impl ViewValidationOutput {
    pub fn passed(&self) -> bool {
        self.report.passed()
    }
}

/// Validate and compile every view class in `catalog`.
pub fn validate_views(
    catalog: &SchemaCatalog,
    compiler: &dyn QueryCompiler,
    listeners: Vec<Arc<dyn IssueListener>>,
    config: &ViewConfig,
) -> ViewValidationOutput {
    let views = ViewClassDefinition::collect(catalog);
    let mut reporter = IssueReporter::new(listeners, config.log_issues);
    let mut invalid: HashSet<ClassId> = HashSet::new();

    let graph = DependencyGraph::build(catalog, &views);
    for cycle in graph.find_cycles() {
        let name = graph.name(cycle.root).unwrap_or_default().to_string();
        let chain = graph.format_chain(&cycle.chain);
        reporter.report(Issue::error(
            &name,
            ValidationCategory::Structural,
            cycle_message(&name, &chain),
        ));
        invalid.insert(cycle.root);
    }

    let by_id: HashMap<ClassId, &ViewClassDefinition> =
        views.iter().map(|v| (v.class_id, v)).collect();
    let mut compiled = CompiledViewMap::new();

    for class_id in graph.dependency_order() {
        let Some(view) = by_id.get(&class_id).copied() else {
            continue;
        };
        let name = view.qualified_name.as_str();

        // Cycle members are prepared too; they fail on their own reference
        let scope = CompiledViewScope {
            catalog,
            views: &compiled,
        };
        let prepared = match compiler.prepare(&view.raw_query_text, &scope) {
            Ok(prepared) => prepared,
            Err(err) => {
                debug!("View {} failed to prepare: {}", name, err);
                reporter.report(Issue::error(
                    name,
                    ValidationCategory::Parse,
                    parse_failed_message(name),
                ));
                reporter.report(Issue::error(
                    name,
                    ValidationCategory::Parse,
                    prepare_failed_message(name, &view.raw_query_text),
                ));
                invalid.insert(class_id);
                continue;
            }
        };
        if invalid.contains(&class_id) {
            continue;
        }

        let shape = shape_resolver::resolve(&prepared);
        let outcome = property_validator::validate(view, &shape);
        if !outcome.is_valid() {
            for issue in outcome.issues {
                reporter.report(issue);
            }
            invalid.insert(class_id);
            continue;
        }

        match compile_view(
            view,
            &prepared,
            &outcome.bindings,
            &compiled,
            config.max_nesting_depth(),
        ) {
            Ok(compiled_view) => {
                compiled.insert(class_id, Arc::new(compiled_view));
            }
            Err(err) => {
                reporter.report(Issue::error(
                    name,
                    ValidationCategory::Compilation,
                    invalid_view_message(name, &err.to_string()),
                ));
                invalid.insert(class_id);
            }
        }
    }

    info!(
        "View validation: {} checked, {} invalid, {} compiled",
        views.len(),
        invalid.len(),
        compiled.len()
    );
    ViewValidationOutput {
        report: reporter.finish(views.len(), invalid.len()),
        compiled,
    }
}
