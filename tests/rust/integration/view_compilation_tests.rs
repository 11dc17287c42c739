//! Compiled view fragments and their substitution into statements

#[cfg(test)]
mod view_compilation_tests {
    use ecviews::config::ViewConfig;
    use ecviews::ecsql::PrepareError;
    use ecviews::schema_catalog::{ClassDefinition, PrimitiveType, PropertyDef};
    use ecviews::view_validation::diagnostics::ValidationCategory;
    use ecviews::{ImportError, StatementError};
    use test_case::test_case;

    use crate::fixtures::{config, connection, connection_with, import, name_view};

    fn layered() -> Vec<ClassDefinition> {
        vec![
            name_view("Leaf", "SELECT ECInstanceId, ECClassId, Name FROM ts.Foo"),
            name_view("Wrapper", "SELECT * FROM ts.Leaf"),
            name_view(
                "Top",
                "SELECT w.ECInstanceId, w.ECClassId, w.Name FROM ts.Wrapper w WHERE w.Name LIKE 'a%'",
            ),
        ]
    }

    /// Test the compiled fragment of a simple view
    #[test]
    fn test_compiled_fragment() {
        let (conn, _listener) = connection();
        let summary = import(
            &conn,
            vec![name_view("Simple", "SELECT ECInstanceId, ECClassId, Name FROM ts.Foo")],
        )
        .unwrap();

        let compiled = conn.compiled_view(summary.class_ids[0]).unwrap();
        assert_eq!(
            compiled.nested_sql,
            "SELECT [K0] AS [ECInstanceId], [K1] AS [ECClassId], [K2] AS [Name] \
             FROM (SELECT ECInstanceId AS [K0], ECClassId AS [K1], Name AS [K2] FROM ts.Foo) [Simple]"
        );
        assert_eq!(compiled.nesting_depth, 1);
    }

    /// Test that a miss means the class is not view backed
    #[test]
    fn test_physical_class_has_no_compiled_view() {
        let (conn, _listener) = connection();
        let foo = conn.catalog().find_class("ts", "Foo").unwrap().id;
        assert!(conn.compiled_view(foo).is_none());
        assert_eq!(conn.view_cache().metrics().misses, 1);
    }

    /// Test that views over views are fully expanded
    #[test]
    fn test_view_over_view() {
        let (conn, _listener) = connection();
        import(&conn, layered()).unwrap();

        let top = conn.catalog().find_class("ts", "Top").unwrap().id;
        assert_eq!(conn.compiled_view(top).unwrap().nesting_depth, 3);

        let stmt = conn
            .session()
            .prepare("SELECT Name, COUNT(*) FROM ts.Top WHERE Name <> 'x' GROUP BY Name LIMIT 5")
            .unwrap();
        assert_eq!(stmt.columns.len(), 2);
        assert_eq!(stmt.referenced_views, vec![top]);
        for view in ["ts.Top", "ts.Wrapper", "ts.Leaf"] {
            assert!(!stmt.expanded.contains(view), "{}", stmt.expanded);
        }
        assert!(stmt.expanded.contains("FROM ts.Foo"));
        assert!(stmt.expanded.ends_with("WHERE Name <> 'x' GROUP BY Name LIMIT 5"));
    }

    /// Test that an aliased reference keeps its alias
    #[test]
    fn test_aliased_reference() {
        let (conn, _listener) = connection();
        import(&conn, layered()).unwrap();

        let stmt = conn
            .session()
            .prepare("SELECT l.Name, f.Size FROM ts.Leaf l JOIN ts.Foo f ON l.ECInstanceId = f.ECInstanceId")
            .unwrap();
        assert!(stmt.expanded.contains("[Leaf]) l JOIN ts.Foo f"), "{}", stmt.expanded);
        assert_eq!(stmt.columns[1].type_name(), "double");
    }

    /// Test that the nesting limit rejects deep view chains at import
    #[test]
    fn test_nesting_limit() {
        let (conn, _listener) = connection_with(ViewConfig {
            max_view_nesting_depth: 2,
            ..config()
        });
        let issues = match import(&conn, layered()) {
            Err(ImportError::ViewValidationFailed { invalid, issues, .. }) => {
                assert_eq!(invalid, 1);
                issues
            }
            other => panic!("Expected validation failure, got {:?}", other.map(|s| s.report)),
        };
        assert_eq!(issues[0].category, ValidationCategory::Compilation);
        assert_eq!(issues[0].class_name.as_deref(), Some("TestSchema.Top"));
    }

    /// Test that navigation properties round-trip through a view
    #[test]
    fn test_navigation_view() {
        let (conn, _listener) = connection();
        let summary = import(
            &conn,
            vec![ClassDefinition::entity("ts", "NavView")
                .with_primitive("Name", PrimitiveType::String)
                .with_property(PropertyDef::navigation("Parent", "ts.FooOwnsFoo"))
                .with_view_query("SELECT ECInstanceId, ECClassId, Name, Parent FROM ts.Foo")],
        )
        .unwrap();

        let compiled = conn.compiled_view(summary.class_ids[0]).unwrap();
        assert!(compiled
            .nested_sql
            .contains("NAVIGATION_VALUE([TestSchema].[FooOwnsFoo], [K3_0], [K3_1]) AS [Parent]"));

        let stmt = conn.session().prepare("SELECT Parent FROM ts.NavView").unwrap();
        assert_eq!(stmt.columns[0].type_name(), "navigation");
    }

    /// Test statements against absent and failed views
    #[test]
    fn test_invalid_view_statements() {
        let (conn, _listener) = connection();
        let err = conn.session().prepare("SELECT * FROM ts.Missing").unwrap_err();
        assert!(matches!(
            err,
            StatementError::InvalidStatement(PrepareError::UnknownClass { .. })
        ));

        // A failed import leaves nothing behind to query
        assert!(import(&conn, vec![name_view("Broken", "SELECT Nope FROM ts.Foo")]).is_err());
        let err = conn.session().prepare("SELECT * FROM ts.Broken").unwrap_err();
        assert!(matches!(err, StatementError::InvalidStatement(_)));
    }

    /// Test that UNION views rewrite every arm
    #[test]
    fn test_union_view() {
        let (conn, _listener) = connection();
        import(
            &conn,
            vec![name_view(
                "Both",
                "SELECT ECInstanceId, ECClassId, Name FROM ts.Foo UNION ALL SELECT ECInstanceId, ECClassId, Name FROM ts.Bar",
            )],
        )
        .unwrap();

        let stmt = conn.session().prepare("SELECT Name FROM ts.Both").unwrap();
        assert_eq!(stmt.expanded.matches("Name AS [K2]").count(), 2);
    }

    /// Test that output aliases used after the select list survive compilation
    #[test_case("SELECT ECInstanceId, ECClassId, Name AS Label FROM ts.Foo ORDER BY Label" ; "order by alias")]
    #[test_case("SELECT ECInstanceId, ECClassId, Name AS [Label] FROM ts.Foo ORDER BY [Label] DESC, ECInstanceId" ; "quoted alias and system column")]
    #[test_case("SELECT ECInstanceId, ECClassId, Name AS Label FROM ts.Foo GROUP BY ECInstanceId, ECClassId, Label HAVING Label <> ''" ; "group by and having alias")]
    #[test_case("SELECT ECInstanceId, ECClassId, Name AS Label FROM ts.Foo UNION ALL SELECT ECInstanceId, ECClassId, Name FROM ts.Bar ORDER BY Label" ; "compound order by")]
    #[test_case("WITH c AS (SELECT ECInstanceId, ECClassId, Name FROM ts.Foo) SELECT ECInstanceId, ECClassId, Name AS Label FROM c ORDER BY Label" ; "cte order by")]
    fn test_view_with_alias_clauses_is_queryable(query: &str) {
        let (conn, _listener) = connection();
        let summary = import(
            &conn,
            vec![ClassDefinition::entity("ts", "Tagged")
                .with_primitive("Label", PrimitiveType::String)
                .with_view_query(query)],
        )
        .unwrap();
        let compiled = conn.compiled_view(summary.class_ids[0]).unwrap();
        let inner = &compiled.nested_sql[compiled.nested_sql.find("FROM (").unwrap()..];
        assert!(!inner.contains("Label"), "{}", compiled.nested_sql);

        let session = conn.session();
        let stmt = session.prepare("SELECT * FROM ts.Tagged").unwrap();
        assert_eq!(stmt.columns.len(), 3);
        assert!(session
            .prepare("SELECT Label FROM ts.Tagged WHERE Label <> 'x' ORDER BY Label")
            .is_ok());
    }

    /// Test the renamed ORDER BY in the compiled fragment
    #[test]
    fn test_order_by_alias_fragment() {
        let (conn, _listener) = connection();
        let summary = import(
            &conn,
            vec![ClassDefinition::entity("ts", "Sorted")
                .with_primitive("Label", PrimitiveType::String)
                .with_view_query(
                    "SELECT ECInstanceId, ECClassId, Name AS Label FROM ts.Foo ORDER BY Label",
                )],
        )
        .unwrap();
        assert_eq!(
            conn.compiled_view(summary.class_ids[0]).unwrap().nested_sql,
            "SELECT [K0] AS [ECInstanceId], [K1] AS [ECClassId], [K2] AS [Label] \
             FROM (SELECT ECInstanceId AS [K0], ECClassId AS [K1], Name AS [K2] FROM ts.Foo ORDER BY K2) [Sorted]"
        );
    }

    /// Test that HAVING names must resolve
    #[test]
    fn test_having_with_unknown_name_fails_import() {
        let (conn, _listener) = connection();
        let result = import(
            &conn,
            vec![name_view(
                "Grouped",
                "SELECT ECInstanceId, ECClassId, Name FROM ts.Foo GROUP BY ECInstanceId, ECClassId, Name HAVING Bogus > 1",
            )],
        );
        assert!(matches!(
            result,
            Err(ImportError::ViewValidationFailed { invalid: 1, .. })
        ));
    }
}
