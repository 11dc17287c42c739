//! Reference ECSQL compiler.
//!
//! Parses the SELECT subset view queries are written in and binds it against a
//! [`SchemaCatalog`]. The result is a [`PreparedQuery`]: the output column
//! list plus the byte spans the view compiler needs to rewrite the query text
//! (select lists, output alias uses, class references and instance-extraction
//! sites).

use std::ops::Range;

use crate::schema_catalog::{ClassId, EcClass, PropertyType, SchemaCatalog};

pub mod ast;
pub mod binder;
pub mod common;
pub mod errors;
pub mod expression;
pub mod functions;
pub mod select_statement;

pub use binder::EcSqlCompiler;
pub use errors::PrepareError;
pub use select_statement::parse_ecsql;

/// Name resolution context a query is prepared in.
pub trait ClassScope {
    fn catalog(&self) -> &SchemaCatalog;

    /// Whether `class` may appear in a FROM clause. View classes without a
    /// valid compiled view are not usable.
    fn is_usable(&self, class: &EcClass) -> bool;
}

/// Every class in the catalog is usable.
pub struct CatalogScope<'a>(pub &'a SchemaCatalog);

impl ClassScope for CatalogScope<'_> {
    fn catalog(&self) -> &SchemaCatalog {
        self.0
    }

    fn is_usable(&self, _class: &EcClass) -> bool {
        true
    }
}

pub trait QueryCompiler: Send + Sync {
    fn prepare(&self, ecsql: &str, scope: &dyn ClassScope) -> Result<PreparedQuery, PrepareError>;
}

/// One output column of a prepared query.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    /// Property path the column was selected from, if it is a plain property
    pub origin: Option<String>,
    /// `None` when the type is only known at execution (NULL, parameters)
    pub column_type: Option<PropertyType>,
    pub is_system: bool,
}

impl ColumnInfo {
    pub fn type_name(&self) -> String {
        self.column_type
            .as_ref()
            .map(|t| t.type_name())
            .unwrap_or_else(|| "null".to_string())
    }
}

/// Where the value of one output slot comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotSource {
    /// Text of the query, optionally followed by a member access (`.Id`)
    Span {
        range: Range<usize>,
        member: Option<String>,
    },
    /// Expression text produced by the binder (wildcard expansion)
    Synthesized(String),
}

/// Select list of one top-level SELECT core (one per UNION arm).
#[derive(Debug, Clone, PartialEq)]
pub struct CoreProjection {
    pub list_span: Range<usize>,
    /// Per output column, one slot or two for navigation values
    pub columns: Vec<Vec<SlotSource>>,
}

/// A class named in a FROM or JOIN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassReference {
    /// Span of the reference, modifier included, alias excluded
    pub range: Range<usize>,
    pub class_id: ClassId,
    pub class_name: String,
    pub has_alias: bool,
    pub is_view: bool,
}

/// An output column alias named outside the select list of a top-level
/// SELECT core (GROUP BY, HAVING, ORDER BY).
#[derive(Debug, Clone, PartialEq)]
pub struct AliasReference {
    /// Span of the alias name, without quoting
    pub range: Range<usize>,
    pub column: usize,
}

/// A `$` or `$->Prop` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSite {
    pub range: Range<usize>,
    /// Alias of the FROM source the instance is read from
    pub alias: String,
    pub property: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PreparedQuery {
    pub columns: Vec<ColumnInfo>,
    pub projections: Vec<CoreProjection>,
    pub class_references: Vec<ClassReference>,
    pub alias_references: Vec<AliasReference>,
    pub extraction_sites: Vec<ExtractionSite>,
    pub uses_experimental_features: bool,
}
