//! Compiles validated view classes into nested-select fragments and
//! substitutes them (and the instance extraction forms) into queries.

pub mod errors;
pub mod extraction;
pub mod sql_compiler;
pub mod substitution;
pub mod view_cache;

pub use errors::CompileError;
pub use extraction::{
    ExtractionFunctions, InMemoryInstances, InstanceJsonWriter, InstanceReader, InstanceValues,
    PropertyValue, ScalarValue,
};
pub use sql_compiler::{compile_view, CompiledView, CompiledViewMap};
pub use substitution::{substitution_edits, Substitution};
pub use view_cache::{CompiledViewCache, ViewCacheMetrics};

use crate::ecsql::ClassScope;
use crate::schema_catalog::{EcClass, SchemaCatalog};

/// Scope in which a view class is usable only once it has a compiled view.
pub struct CompiledViewScope<'a> {
    pub catalog: &'a SchemaCatalog,
    pub views: &'a CompiledViewMap,
}

impl ClassScope for CompiledViewScope<'_> {
    fn catalog(&self) -> &SchemaCatalog {
        self.catalog
    }

    fn is_usable(&self, class: &EcClass) -> bool {
        !class.is_view() || self.views.contains_key(&class.id)
    }
}
