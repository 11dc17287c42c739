//! # Schema Catalog Error Types
//!
//! Errors raised while appending class definitions to the catalog. These are
//! structural problems with the incoming schema itself (duplicate names,
//! dangling references); view-query problems are reported as validation
//! issues instead, see [`crate::view_validation::diagnostics`].

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaError {
    #[error("Schema '{schema}' is already registered.")]
    DuplicateSchema { schema: String },
    #[error("Schema alias '{alias}' is already used by schema '{schema}'.")]
    DuplicateAlias { alias: String, schema: String },
    #[error("No schema found for `{schema}`.")]
    UnknownSchema { schema: String },
    #[error("Class '{class}' already exists.")]
    DuplicateClass { class: String },
    #[error("Class '{class}' has base class '{base}' which could not be resolved.")]
    UnknownBaseClass { class: String, base: String },
    #[error("Class '{class}' cannot derive from '{base}': base class kind differs.")]
    IncompatibleBaseClass { class: String, base: String },
    #[error("Property '{property}' of class '{class}' references unknown struct class '{struct_class}'.")]
    UnknownStructClass {
        class: String,
        property: String,
        struct_class: String,
    },
    #[error("Property '{property}' of class '{class}' references unknown relationship class '{relationship}'.")]
    UnknownRelationshipClass {
        class: String,
        property: String,
        relationship: String,
    },
    #[error("Relationship class '{class}' has a {end} constraint class '{constraint}' which could not be resolved.")]
    UnknownConstraintClass {
        class: String,
        end: &'static str,
        constraint: String,
    },
    #[error("Class '{class}' declares property '{property}' more than once (or overrides an inherited/system property).")]
    DuplicateProperty { class: String, property: String },
    #[error("Only entity and relationship classes can be view classes ('{class}').")]
    InvalidViewClassKind { class: String },
}
