use std::sync::{Arc, Mutex, RwLock};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::errors::{ImportError, StatementError};
use crate::config::{ConfigError, ViewConfig};
use crate::ecsql::{ColumnInfo, EcSqlCompiler, QueryCompiler};
use crate::schema_catalog::{ClassDefinition, ClassId, SchemaCatalog, SchemaInfo};
use crate::utils::text_edit::apply_edits;
use crate::view_compiler::{
    substitution_edits, CompiledView, CompiledViewCache, CompiledViewMap, CompiledViewScope,
    ExtractionFunctions, InstanceReader,
};
use crate::view_validation::diagnostics::{IssueListener, ValidationReport};
use crate::view_validation::validate_views;

/// A batch of schemas and classes imported in one step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaImport {
    pub schemas: Vec<SchemaInfo>,
    pub classes: Vec<ClassDefinition>,
}

impl SchemaImport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, schema: SchemaInfo) -> Self {
        self.schemas.push(schema);
        self
    }

    pub fn with_class(mut self, class: ClassDefinition) -> Self {
        self.classes.push(class);
        self
    }

    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            field: "schema_import".to_string(),
            value: content.to_string(),
            source: Box::new(e),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSummary {
    pub class_ids: Vec<ClassId>,
    pub report: ValidationReport,
    pub compiled_views: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionOptions {
    pub experimental_features: bool,
}

/// Owns the committed catalog and its compiled views.
///
/// Imports are serialized; statement preparation runs concurrently with them
/// and always sees a catalog together with the views compiled from it.
pub struct Connection {
    config: ViewConfig,
    catalog: RwLock<Arc<SchemaCatalog>>,
    views: CompiledViewCache,
    listeners: RwLock<Vec<Arc<dyn IssueListener>>>,
    compiler: Arc<dyn QueryCompiler>,
    import_lock: Mutex<()>,
}

impl Connection {
    pub fn new(config: ViewConfig) -> Self {
        Self::with_compiler(config, Arc::new(EcSqlCompiler::new()))
    }

    pub fn with_compiler(config: ViewConfig, compiler: Arc<dyn QueryCompiler>) -> Self {
        Connection {
            config,
            catalog: RwLock::new(Arc::new(SchemaCatalog::new())),
            views: CompiledViewCache::new(),
            listeners: RwLock::new(Vec::new()),
            compiler,
            import_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn catalog(&self) -> Arc<SchemaCatalog> {
        self.catalog.read().unwrap().clone()
    }

    pub fn view_cache(&self) -> &CompiledViewCache {
        &self.views
    }

    pub fn compiled_view(&self, class_id: ClassId) -> Option<Arc<CompiledView>> {
        self.views.get(class_id)
    }

    /// Register a listener for issues raised by later validation passes.
    pub fn add_listener(&self, listener: Arc<dyn IssueListener>) {
        self.listeners.write().unwrap().push(listener);
    }

    fn listeners(&self) -> Vec<Arc<dyn IssueListener>> {
        self.listeners.read().unwrap().clone()
    }

    // Catalog and views read under the same lock the import commits under
    fn snapshot(&self) -> (Arc<SchemaCatalog>, Arc<CompiledViewMap>) {
        let catalog = self.catalog.read().unwrap();
        (catalog.clone(), self.views.snapshot())
    }

    /// Stage `import` on top of the committed catalog, validate every view
    /// class, and commit only when all of them are valid.
    pub fn import_schema(&self, import: SchemaImport) -> Result<ImportSummary, ImportError> {
        let _guard = self.import_lock.lock().unwrap();

        let mut staged = (*self.catalog()).clone();
        for schema in import.schemas {
            if staged.schema(&schema.name) == Some(&schema) {
                continue;
            }
            staged.add_schema(schema)?;
        }
        let class_ids = staged.append_all(import.classes)?;
        debug!("Staged {} class(es) for import", class_ids.len());

        let output = validate_views(&staged, self.compiler.as_ref(), self.listeners(), &self.config);
        if !output.passed() {
            warn!(
                "Schema import rolled back: {} of {} view class(es) invalid",
                output.report.invalid, output.report.checked
            );
            return Err(ImportError::ViewValidationFailed {
                checked: output.report.checked,
                invalid: output.report.invalid,
                issues: output.report.issues,
            });
        }

        let compiled_views = output.compiled.len();
        {
            let mut catalog = self.catalog.write().unwrap();
            *catalog = Arc::new(staged);
            self.views.publish(output.compiled);
        }
        info!(
            "Imported {} class(es), {} compiled view(s)",
            class_ids.len(),
            compiled_views
        );
        Ok(ImportSummary {
            class_ids,
            report: output.report,
            compiled_views,
        })
    }

    pub fn import_yaml_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<ImportSummary, ImportError> {
        let import = SchemaImport::from_yaml_file(path)?;
        self.import_schema(import)
    }

    /// Validate the committed catalog again and republish its views.
    pub fn revalidate(&self) -> ValidationReport {
        let _guard = self.import_lock.lock().unwrap();
        let catalog = self.catalog();
        let output = validate_views(&catalog, self.compiler.as_ref(), self.listeners(), &self.config);
        {
            let _catalog = self.catalog.write().unwrap();
            self.views.publish(output.compiled);
        }
        output.report
    }

    pub fn session(&self) -> Session<'_> {
        self.session_with(SessionOptions {
            experimental_features: self.config.experimental_features,
        })
    }

    pub fn session_with(&self, options: SessionOptions) -> Session<'_> {
        Session {
            connection: self,
            experimental_features: options.experimental_features,
        }
    }

    /// Runtime for the functions extraction sites are rewritten into,
    /// bound to the current catalog.
    pub fn extraction_functions(&self, reader: Arc<dyn InstanceReader>) -> ExtractionFunctions {
        ExtractionFunctions::new(self.catalog(), reader)
    }
}

/// A statement whose view references and extraction sites have been
/// rewritten into plain SQL.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStatement {
    pub ecsql: String,
    pub expanded: String,
    pub columns: Vec<ColumnInfo>,
    pub referenced_views: Vec<ClassId>,
}

pub struct Session<'c> {
    connection: &'c Connection,
    experimental_features: bool,
}

impl Session<'_> {
    pub fn experimental_features(&self) -> bool {
        self.experimental_features
    }

    pub fn set_experimental_features(&mut self, enabled: bool) {
        self.experimental_features = enabled;
    }

    pub fn prepare(&self, ecsql: &str) -> Result<PreparedStatement, StatementError> {
        let (catalog, views) = self.connection.snapshot();
        let scope = CompiledViewScope {
            catalog: &catalog,
            views: &views,
        };
        let compiler = self.connection.compiler.as_ref();

        let prepared = compiler.prepare(ecsql, &scope)?;
        if prepared.uses_experimental_features && !self.experimental_features {
            let feature = prepared
                .extraction_sites
                .first()
                .and_then(|site| ecsql.get(site.range.clone()))
                .unwrap_or("$")
                .to_string();
            return Err(StatementError::ExperimentalFeatureDisabled { feature });
        }

        let substitution = substitution_edits(&prepared, &views)?;
        if !self.experimental_features {
            // Views read by the statement carry the forms of their own queries
            let inherited = substitution
                .referenced_views
                .iter()
                .filter_map(|id| views.get(id))
                .find_map(|view| view.experimental_feature.clone());
            if let Some(feature) = inherited {
                return Err(StatementError::ExperimentalFeatureDisabled { feature });
            }
        }
        let max = self.connection.config.max_nesting_depth();
        if substitution.depth > max {
            let class = substitution
                .referenced_views
                .iter()
                .filter_map(|id| views.get(id))
                .max_by_key(|v| v.nesting_depth)
                .map(|v| v.qualified_name.clone())
                .unwrap_or_default();
            return Err(StatementError::ViewNestingTooDeep {
                class,
                depth: substitution.depth,
                max,
            });
        }

        let expanded = apply_edits(ecsql, &substitution.edits);
        compiler.prepare(&expanded, &scope).map_err(|err| {
            warn!("Expanded statement failed to prepare: {}", err);
            err
        })?;
        debug!("Prepared statement: {}", expanded);

        Ok(PreparedStatement {
            ecsql: ecsql.to_string(),
            expanded,
            columns: prepared.columns,
            referenced_views: substitution.referenced_views,
        })
    }
}
