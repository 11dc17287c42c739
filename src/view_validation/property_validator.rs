//! Cross-checks a view class's declared properties against the column shape
//! its query returns.
//!
//! System columns are checked first, then declared properties in declaration
//! order, then shape entries nothing claimed. Each problem is its own issue.
//! On success the validator also hands back where every public property's
//! value lives in the query output, which is what the SQL compiler needs.

use log::debug;

use super::diagnostics::{invalid_view_message, Issue, ValidationCategory};
use super::shape_resolver::{ColumnShape, ResolvedColumn};
use crate::ecsql::binder::is_system_name;
use crate::schema_catalog::{PropertyDef, PropertyType, ViewClassDefinition, NAV_REL_ECCLASSID};

#[derive(Debug, Clone, PartialEq)]
pub enum BindingKind {
    Single,
    /// Value id and relationship class id slots
    Navigation { relationship: String },
}

/// Public property of the view class mapped onto a query output column.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyBinding {
    pub name: String,
    pub column_index: usize,
    pub kind: BindingKind,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationOutcome {
    pub issues: Vec<Issue>,
    /// System columns first, then declared properties in declaration order.
    /// Only complete when `issues` is empty.
    pub bindings: Vec<PropertyBinding>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// `int` and `long` are interchangeable, and an untyped column (NULL or a
/// parameter) matches any declared type.
fn types_compatible(declared: &PropertyType, returned: Option<&PropertyType>) -> bool {
    let Some(returned) = returned else {
        return true;
    };
    let integral = |t: &PropertyType| t.as_primitive().is_some_and(|p| p.is_integral());
    (integral(declared) && integral(returned)) || declared.matches(returned)
}

struct Validator<'a> {
    view: &'a ViewClassDefinition,
    shape: &'a ColumnShape,
    matched: Vec<bool>,
    outcome: ValidationOutcome,
}

impl<'a> Validator<'a> {
    fn issue(&mut self, category: ValidationCategory, detail: String) {
        let message = invalid_view_message(&self.view.qualified_name, &detail);
        self.outcome
            .issues
            .push(Issue::error(&self.view.qualified_name, category, message));
    }

    fn find(&self, name: &str) -> Option<(usize, &'a ResolvedColumn)> {
        let shape: &'a ColumnShape = self.shape;
        shape.find(name)
    }

    fn check_system_column(&mut self, name: &str) {
        let Some((index, column)) = self.find(name) else {
            self.issue(
                ValidationCategory::SystemColumn,
                format!("View query must return {}.", name),
            );
            return;
        };
        self.matched[index] = true;
        let integral = column
            .column_type
            .as_ref()
            .is_none_or(|t| t.as_primitive().is_some_and(|p| p.is_integral()));
        if !integral {
            self.issue(
                ValidationCategory::SystemColumn,
                format!("View query column '{}' must be a primitive integer or long.", name),
            );
            return;
        }
        self.outcome.bindings.push(PropertyBinding {
            name: name.to_string(),
            column_index: column.column_index,
            kind: BindingKind::Single,
        });
    }

    fn check_property(&mut self, property: &PropertyDef) {
        let Some((index, column)) = self.find(&property.name) else {
            self.issue(
                ValidationCategory::ShapeMismatch,
                format!(
                    "View class has property '{}' which is not returned by view query.",
                    property.name
                ),
            );
            return;
        };
        self.matched[index] = true;

        let kind = match &property.property_type {
            PropertyType::Navigation(relationship) => {
                let companion = self
                    .find(&format!("{}.{}", column.name, NAV_REL_ECCLASSID))
                    .filter(|(_, c)| c.is_navigation_companion);
                match companion {
                    Some((companion_index, _)) if column.is_navigation() => {
                        self.matched[companion_index] = true;
                        BindingKind::Navigation {
                            relationship: relationship.clone(),
                        }
                    }
                    _ => {
                        self.type_mismatch(property, column);
                        return;
                    }
                }
            }
            declared => {
                if !types_compatible(declared, column.column_type.as_ref()) {
                    self.type_mismatch(property, column);
                    return;
                }
                BindingKind::Single
            }
        };
        self.outcome.bindings.push(PropertyBinding {
            name: property.name.clone(),
            column_index: column.column_index,
            kind,
        });
    }

    fn type_mismatch(&mut self, property: &PropertyDef, column: &ResolvedColumn) {
        self.issue(
            ValidationCategory::ShapeMismatch,
            format!(
                "View class property '{}' type does not match the type returned by view query ('{}' <> '{}').",
                property.name,
                property.property_type.type_name(),
                column.type_name
            ),
        );
    }

    fn check_unmatched(&mut self) {
        let kind = self.view.kind();
        let shape = self.shape;
        for (index, column) in shape.columns.iter().enumerate() {
            if self.matched[index] || column.is_navigation_companion {
                continue;
            }
            if kind.is_system_property(&column.name) {
                continue;
            }
            let category = if is_system_name(&column.name) {
                ValidationCategory::SystemColumn
            } else {
                ValidationCategory::ShapeMismatch
            };
            self.issue(
                category,
                format!(
                    "View query returns property '{}' which not defined in view class or is a invalid system property.",
                    column.name
                ),
            );
        }
    }
}

/// Check `shape` against the properties `view` declares.
pub fn validate(view: &ViewClassDefinition, shape: &ColumnShape) -> ValidationOutcome {
    let mut validator = Validator {
        view,
        shape,
        matched: vec![false; shape.len()],
        outcome: ValidationOutcome::default(),
    };
    for name in view.system_columns() {
        validator.check_system_column(name);
    }
    for property in &view.declared_properties {
        validator.check_property(property);
    }
    validator.check_unmatched();

    debug!(
        "Validated view {}: {} column(s), {} issue(s)",
        view.qualified_name,
        shape.len(),
        validator.outcome.issues.len()
    );
    validator.outcome
}
