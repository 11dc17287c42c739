use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error("View class '{class}' is referenced but has no compiled view.")]
    MissingCompiledView { class: String },
    #[error("View class '{class}' nests views {depth} levels deep (maximum {max}).")]
    ViewNestingTooDeep {
        class: String,
        depth: usize,
        max: usize,
    },
}
