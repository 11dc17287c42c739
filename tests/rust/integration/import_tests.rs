//! Schema import: atomic commit and rollback, listeners, YAML input, and
//! statement preparation running alongside imports

#[cfg(test)]
mod import_tests {
    use std::io::Write;
    use std::sync::Arc;
    use std::thread;

    use ecviews::schema_catalog::{ClassDefinition, PrimitiveType, SchemaError};
    use ecviews::session::Connection;
    use ecviews::view_validation::CollectingListener;
    use ecviews::ImportError;
    use tempfile::NamedTempFile;

    use crate::fixtures::{base_import, config, connection, import, init_logging, name_view};

    const LEAF: &str = "SELECT ECInstanceId, ECClassId, Name FROM ts.Foo";

    /// Test that one invalid view rolls back the whole batch
    #[test]
    fn test_rollback_discards_valid_classes_too() {
        let (conn, _listener) = connection();
        let classes_before = conn.catalog().len();

        let result = import(
            &conn,
            vec![
                ClassDefinition::entity("ts", "Plain").with_primitive("Name", PrimitiveType::String),
                name_view("Good", LEAF),
                name_view("Bad", "SELECT ECInstanceId, ECClassId FROM ts.Foo"),
            ],
        );
        assert!(matches!(
            result,
            Err(ImportError::ViewValidationFailed { invalid: 1, .. })
        ));

        let catalog = conn.catalog();
        assert_eq!(catalog.len(), classes_before);
        assert!(catalog.find_class("ts", "Plain").is_none());
        assert!(catalog.find_class("ts", "Good").is_none());
        assert!(conn.view_cache().is_empty());
        assert!(conn.session().prepare("SELECT * FROM ts.Good").is_err());
    }

    /// Test that schema errors surface before any view validation
    #[test]
    fn test_schema_errors() {
        let (conn, listener) = connection();
        let err = import(&conn, vec![name_view("V", LEAF), ClassDefinition::entity("nope", "X")])
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::Schema(SchemaError::UnknownSchema { .. })
        ));

        let err = import(&conn, vec![ClassDefinition::entity("ts", "Foo")]).unwrap_err();
        assert!(matches!(
            err,
            ImportError::Schema(SchemaError::DuplicateClass { .. })
        ));
        assert!(listener.issues().is_empty());
    }

    /// Test that views may build on views from an earlier import
    #[test]
    fn test_incremental_imports() {
        let (conn, listener) = connection();
        import(&conn, vec![name_view("Leaf", LEAF)]).unwrap();
        let summary = import(&conn, vec![name_view("Wrapper", "SELECT * FROM ts.Leaf")]).unwrap();

        assert_eq!(summary.compiled_views, 2);
        assert_eq!(conn.view_cache().len(), 2);
        assert_eq!(
            listener.messages(),
            vec![
                "Total of 1 view classes were checked and 0 were found to be invalid.",
                "Total of 2 view classes were checked and 0 were found to be invalid.",
            ]
        );
        assert_eq!(conn.view_cache().metrics().publishes, 3);
    }

    /// Test that a connection works without any listener
    #[test]
    fn test_no_listeners() {
        init_logging();
        let conn = Connection::new(config());
        let batch = base_import().with_class(name_view("Bad", "SELECT 1"));
        assert!(conn.import_schema(batch).is_err());
        assert!(conn.catalog().is_empty());
    }

    /// Test importing a schema described in YAML
    #[test]
    fn test_yaml_import() {
        init_logging();
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
schemas:
  - name: TestSchema
    alias: ts
classes:
  - schema: ts
    name: Foo
    kind: Entity
    properties:
      - name: Name
        property_type: !Primitive string
      - name: Size
        property_type: !Primitive double
  - schema: ts
    name: Big
    kind: Entity
    properties:
      - name: Name
        property_type: !Primitive string
    view_query: SELECT ECInstanceId, ECClassId, Name FROM ts.Foo WHERE Size > 10
"#
        )
        .unwrap();

        let conn = Connection::new(config());
        let listener = Arc::new(CollectingListener::new());
        conn.add_listener(listener.clone());

        let summary = conn.import_yaml_file(file.path()).unwrap();
        assert_eq!(summary.class_ids.len(), 2);
        assert_eq!(summary.compiled_views, 1);
        assert_eq!(listener.issues().len(), 1);
        assert!(conn.session().prepare("SELECT Name FROM ts.Big").is_ok());

        let err = conn.import_yaml_file(file.path().with_extension("missing")).unwrap_err();
        assert!(matches!(err, ImportError::Load(_)));
    }

    /// Test that statements prepared during imports always see a catalog
    /// together with its own compiled views
    #[test]
    fn test_prepare_during_imports() {
        let (conn, _listener) = connection();
        import(&conn, vec![name_view("Stable", LEAF)]).unwrap();
        let conn = Arc::new(conn);

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let conn = conn.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        conn.session()
                            .prepare("SELECT Name FROM ts.Stable")
                            .expect("stable view stays usable");
                    }
                })
            })
            .collect();

        for i in 0..10 {
            let name = format!("Extra{}", i);
            import(&conn, vec![name_view(&name, "SELECT * FROM ts.Stable")]).unwrap();
        }
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(conn.view_cache().len(), 11);
    }
}
