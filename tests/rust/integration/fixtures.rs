//! Shared schema fixtures

use std::sync::Arc;

use ecviews::config::ViewConfig;
use ecviews::schema_catalog::{
    ClassDefinition, PrimitiveType, PropertyDef, RelationshipConstraint, SchemaInfo,
};
use ecviews::session::{Connection, ImportError, ImportSummary, SchemaImport};
use ecviews::view_validation::CollectingListener;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn config() -> ViewConfig {
    ViewConfig {
        log_issues: false,
        ..Default::default()
    }
}

/// TestSchema (alias `ts`) with physical classes only:
/// - `Foo`: Name string, Size double, Count int, Parent -> FooOwnsFoo
/// - `Bar`: Name string
/// - `SpecialFoo`: derives from Foo, adds Code string
pub fn base_import() -> SchemaImport {
    SchemaImport::new()
        .with_schema(SchemaInfo::new("TestSchema", "ts"))
        .with_class(
            ClassDefinition::entity("ts", "Foo")
                .with_primitive("Name", PrimitiveType::String)
                .with_primitive("Size", PrimitiveType::Double)
                .with_primitive("Count", PrimitiveType::Integer)
                .with_property(PropertyDef::navigation("Parent", "ts.FooOwnsFoo")),
        )
        .with_class(ClassDefinition::relationship(
            "ts",
            "FooOwnsFoo",
            RelationshipConstraint::new("ts.Foo"),
            RelationshipConstraint::new("ts.Foo"),
        ))
        .with_class(ClassDefinition::entity("ts", "Bar").with_primitive("Name", PrimitiveType::String))
        .with_class(
            ClassDefinition::entity("ts", "SpecialFoo")
                .with_base("ts.Foo")
                .with_primitive("Code", PrimitiveType::String),
        )
}

/// Entity view class declaring `properties`.
pub fn view(name: &str, query: &str, properties: &[(&str, PrimitiveType)]) -> ClassDefinition {
    properties.iter().fold(
        ClassDefinition::entity("ts", name).with_view_query(query),
        |def, (property, ty)| def.with_primitive(property, *ty),
    )
}

/// View class declaring a single `Name` string property.
pub fn name_view(name: &str, query: &str) -> ClassDefinition {
    view(name, query, &[("Name", PrimitiveType::String)])
}

/// Connection with the base schema imported and a collecting listener attached.
pub fn connection() -> (Connection, Arc<CollectingListener>) {
    connection_with(config())
}

pub fn connection_with(config: ViewConfig) -> (Connection, Arc<CollectingListener>) {
    init_logging();
    let conn = Connection::new(config);
    conn.import_schema(base_import())
        .expect("base schema imports cleanly");
    let listener = Arc::new(CollectingListener::new());
    conn.add_listener(listener.clone());
    (conn, listener)
}

/// Import `classes` into TestSchema.
pub fn import(
    conn: &Connection,
    classes: Vec<ClassDefinition>,
) -> Result<ImportSummary, ImportError> {
    conn.import_schema(SchemaImport {
        schemas: Vec::new(),
        classes,
    })
}

/// Messages of a failed import.
pub fn failure_messages(result: Result<ImportSummary, ImportError>) -> Vec<String> {
    match result {
        Err(ImportError::ViewValidationFailed { issues, .. }) => {
            issues.into_iter().map(|i| i.message).collect()
        }
        Err(other) => panic!("Expected view validation failure, got {}", other),
        Ok(summary) => panic!("Expected import to fail, got {:?}", summary.report.messages()),
    }
}
