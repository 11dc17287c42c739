//! ecviews - view classes for an ECSQL object-relational engine
//!
//! A view class is an ECClass whose rows come from an ECSQL query instead of
//! a table. This crate provides:
//! - A schema catalog of entity, relationship and struct classes
//! - A reference ECSQL compiler for the SELECT subset view queries use
//! - View validation: reference cycles, column shape against declared properties
//! - View compilation into nested SQL fragments, and substitution of those
//!   fragments (plus the `$` / `$->Prop` extraction forms) into statements
//! - A connection front end that imports schemas atomically

pub mod config;
pub mod ecsql;
pub mod schema_catalog;
pub mod session;
pub mod utils;
pub mod view_compiler;
pub mod view_validation;

pub use config::{ConfigError, ViewConfig};
pub use schema_catalog::{ClassDefinition, ClassId, SchemaCatalog, SchemaInfo};
pub use session::{Connection, ImportError, SchemaImport, Session, StatementError};
pub use view_validation::diagnostics::{Issue, IssueListener, ValidationCategory, ValidationReport};
