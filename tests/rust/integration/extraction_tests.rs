//! Instance extraction forms: gating, rewriting and runtime values

#[cfg(test)]
mod extraction_tests {
    use std::sync::Arc;

    use ecviews::schema_catalog::{ClassId, PrimitiveType};
    use ecviews::session::SessionOptions;
    use ecviews::view_compiler::{InMemoryInstances, InstanceValues, PropertyValue, ScalarValue};
    use ecviews::StatementError;
    use serde_json::Value;

    use crate::fixtures::{config, connection, connection_with, import, name_view, view};

    const ENABLED: SessionOptions = SessionOptions {
        experimental_features: true,
    };

    /// Test that both forms need experimental features
    #[test]
    fn test_disabled_by_default() {
        let (conn, _listener) = connection();
        let session = conn.session();
        assert!(!session.experimental_features());

        assert_eq!(
            session.prepare("SELECT $ FROM ts.Foo").unwrap_err(),
            StatementError::ExperimentalFeatureDisabled {
                feature: "$".to_string()
            }
        );
        assert!(matches!(
            session.prepare("SELECT f.$->Name FROM ts.Foo f"),
            Err(StatementError::ExperimentalFeatureDisabled { .. })
        ));
        // Statements without the forms are unaffected
        assert!(session.prepare("SELECT Name FROM ts.Foo").is_ok());
    }

    /// Test the rewritten calls
    #[test]
    fn test_rewritten_to_function_calls() {
        let (conn, _listener) = connection();
        let stmt = conn
            .session_with(ENABLED)
            .prepare("SELECT $, f.$->Name FROM ts.Foo f WHERE f.Size > 1")
            .unwrap();
        assert_eq!(
            stmt.expanded,
            "SELECT extract_inst([f].[ECClassId], [f].[ECInstanceId]), \
             extract_prop([f].[ECClassId], [f].[ECInstanceId], 'Name') FROM ts.Foo f WHERE f.Size > 1"
        );
        assert_eq!(stmt.columns[0].type_name(), "string");
    }

    /// Test the session flag and the connection default
    #[test]
    fn test_session_flag() {
        let (conn, _listener) = connection();
        let mut session = conn.session();
        session.set_experimental_features(true);
        assert!(session.prepare("SELECT $ FROM ts.Foo").is_ok());
        session.set_experimental_features(false);
        assert!(session.prepare("SELECT $ FROM ts.Foo").is_err());

        let (conn, _listener) = connection_with(config().with_experimental_features(true));
        assert!(conn.session().prepare("SELECT $->Count FROM ts.Foo").is_ok());
    }

    /// Test that a view using the forms imports with them disabled
    #[test]
    fn test_view_using_extraction_imports_when_disabled() {
        let query = "SELECT ECInstanceId, ECClassId, $->Name AS Name FROM ts.Foo";
        let (conn, listener) = connection();
        let summary = import(&conn, vec![name_view("Extracted", query)]).unwrap();
        assert_eq!(summary.compiled_views, 1);
        assert!(summary.report.passed());
        assert_eq!(
            listener.messages(),
            vec!["Total of 1 view classes were checked and 0 were found to be invalid."]
        );

        let view = conn
            .compiled_view(conn.catalog().find_class("ts", "Extracted").unwrap().id)
            .unwrap();
        assert_eq!(view.experimental_feature.as_deref(), Some("$->Name"));
    }

    /// Test the gate on statements that read such a view
    #[test]
    fn test_gate_applies_to_views_read_by_statement() {
        let (conn, _listener) = connection();
        import(
            &conn,
            vec![
                name_view(
                    "Extracted",
                    "SELECT ECInstanceId, ECClassId, $->Name AS Name FROM ts.Foo",
                ),
                name_view("Outer", "SELECT * FROM ts.Extracted"),
            ],
        )
        .unwrap();

        for ecsql in ["SELECT Name FROM ts.Extracted", "SELECT * FROM ts.Outer o"] {
            assert_eq!(
                conn.session().prepare(ecsql).unwrap_err(),
                StatementError::ExperimentalFeatureDisabled {
                    feature: "$->Name".to_string()
                },
                "{ecsql}"
            );
        }

        let stmt = conn
            .session_with(ENABLED)
            .prepare("SELECT Name FROM ts.Outer")
            .unwrap();
        assert!(stmt
            .expanded
            .contains("extract_prop([Foo].[ECClassId], [Foo].[ECInstanceId], 'Name') AS [K2]"));
    }

    /// Test extraction over a view class and inside a view query
    #[test]
    fn test_views_and_extraction() {
        let query = "SELECT ECInstanceId, ECClassId, $ Json FROM ts.Foo";
        let declared = [("Json", PrimitiveType::String)];

        let (conn, _listener) = connection_with(config().with_experimental_features(true));
        import(
            &conn,
            vec![
                view("JsonView", query, &declared),
                view(
                    "Names",
                    "SELECT ECInstanceId, ECClassId, Name FROM ts.Foo",
                    &[("Name", PrimitiveType::String)],
                ),
            ],
        )
        .unwrap();
        let stmt = conn
            .session()
            .prepare("SELECT n.$->Name FROM ts.Names n")
            .unwrap();
        assert!(stmt
            .expanded
            .starts_with("SELECT extract_prop([n].[ECClassId], [n].[ECInstanceId], 'Name') FROM (SELECT"));
        assert!(conn.session().prepare("SELECT Json FROM ts.JsonView").is_ok());
    }

    fn instances(foo: ClassId, special: ClassId) -> InMemoryInstances {
        let mut instances = InMemoryInstances::new();
        instances.insert(
            InstanceValues::new(foo, 0x1a)
                .with("Name", PropertyValue::String("pipe".to_string()))
                .with("Size", PropertyValue::Double(f64::NAN))
                .with("Count", PropertyValue::Integer(3))
                .with(
                    "Parent",
                    PropertyValue::Navigation {
                        id: 0x1,
                        rel_class_id: Some(foo.0 + 1),
                    },
                ),
        );
        instances.insert(
            InstanceValues::new(special, 0x2b)
                .with("Name", PropertyValue::String("valve".to_string()))
                .with("Size", PropertyValue::Double(0.5))
                .with("Code", PropertyValue::String("V-7".to_string())),
        );
        instances
    }

    /// Test that per-property values match the members of the full instance
    #[test]
    fn test_instance_and_property_agree() {
        let (conn, _listener) = connection();
        let catalog = conn.catalog();
        let foo = catalog.find_class("ts", "Foo").unwrap().id;
        let special = catalog.find_class("ts", "SpecialFoo").unwrap().id;
        let functions = conn.extraction_functions(Arc::new(instances(foo, special)));

        let json = functions.extract_inst(special, 0x2b).unwrap();
        let instance: Value = serde_json::from_str(&json).unwrap();
        let keys: Vec<&String> = instance.as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            vec!["ECInstanceId", "ECClassId", "Name", "Size", "Code"]
        );
        for name in ["ECInstanceId", "ECClassId", "Name", "Size", "Code"] {
            assert_eq!(
                functions.extract_prop(special, 0x2b, name).to_json().to_string(),
                instance[name].to_string(),
                "{name}"
            );
        }
        // Inherited properties resolve case-insensitively
        assert_eq!(
            functions.extract_prop(special, 0x2b, "nAmE"),
            ScalarValue::Text("valve".to_string())
        );
    }

    /// Test the NaN coercion
    #[test]
    fn test_nan_is_null_only_in_json() {
        let (conn, _listener) = connection();
        let catalog = conn.catalog();
        let foo = catalog.find_class("ts", "Foo").unwrap().id;
        let special = catalog.find_class("ts", "SpecialFoo").unwrap().id;
        let functions = conn.extraction_functions(Arc::new(instances(foo, special)));

        let instance: Value =
            serde_json::from_str(&functions.extract_inst(foo, 0x1a).unwrap()).unwrap();
        assert_eq!(instance["Size"], Value::Null);
        assert_eq!(instance["Parent"]["Id"], "0x1");
        assert!(matches!(
            functions.extract_prop(foo, 0x1a, "Size"),
            ScalarValue::Double(d) if d.is_nan()
        ));
        assert_eq!(
            functions.extract_prop(foo, 0x1a, "Parent").to_json().to_string(),
            instance["Parent"].to_string()
        );
    }
}
