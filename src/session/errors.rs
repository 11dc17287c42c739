use thiserror::Error;

use crate::config::ConfigError;
use crate::ecsql::PrepareError;
use crate::schema_catalog::SchemaError;
use crate::view_compiler::CompileError;
use crate::view_validation::diagnostics::Issue;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Failed to read schema import: {0}")]
    Load(#[from] ConfigError),

    /// Nothing from the import was committed.
    #[error("Schema import failed: {invalid} of {checked} view classes are invalid")]
    ViewValidationFailed {
        checked: usize,
        invalid: usize,
        issues: Vec<Issue>,
    },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StatementError {
    #[error("'{feature}' requires experimental features to be enabled")]
    ExperimentalFeatureDisabled { feature: String },

    #[error(transparent)]
    InvalidStatement(#[from] PrepareError),

    #[error("Statement nests view classes {depth} deep through '{class}' (limit {max})")]
    ViewNestingTooDeep {
        class: String,
        depth: usize,
        max: usize,
    },
}

impl From<CompileError> for StatementError {
    fn from(err: CompileError) -> Self {
        match err {
            CompileError::MissingCompiledView { class } => {
                StatementError::InvalidStatement(PrepareError::UnusableClass { class })
            }
            CompileError::ViewNestingTooDeep { class, depth, max } => {
                StatementError::ViewNestingTooDeep { class, depth, max }
            }
        }
    }
}
