//! Column shape validation against declared view class properties

#[cfg(test)]
mod view_shape_tests {
    use ecviews::schema_catalog::{ClassDefinition, PrimitiveType, PropertyDef};
    use ecviews::session::ImportSummary;
    use ecviews::view_validation::diagnostics::ValidationCategory;
    use ecviews::{ImportError, Issue};
    use test_case::test_case;

    use crate::fixtures::{connection, failure_messages, import, name_view, view};

    fn import_issues(result: Result<ImportSummary, ImportError>) -> Vec<Issue> {
        match result {
            Err(ImportError::ViewValidationFailed { issues, .. }) => issues,
            other => panic!("Expected validation failure, got {:?}", other.map(|s| s.report)),
        }
    }

    /// Test that 9 declared + 2 system properties come back from SELECT *
    #[test]
    fn test_wide_view_select_star_column_count() {
        let (conn, _listener) = connection();
        let properties: Vec<(String, PrimitiveType)> = (1..=9)
            .map(|i| {
                let ty = if i % 2 == 0 {
                    PrimitiveType::Long
                } else {
                    PrimitiveType::String
                };
                (format!("P{}", i), ty)
            })
            .collect();

        let physical = properties
            .iter()
            .fold(ClassDefinition::entity("ts", "Wide"), |def, (name, ty)| {
                def.with_primitive(name, *ty)
            });
        let columns: Vec<&str> = properties.iter().map(|(n, _)| n.as_str()).collect();
        let query = format!(
            "SELECT ECInstanceId, ECClassId, {} FROM ts.Wide",
            columns.join(", ")
        );
        let declared: Vec<(&str, PrimitiveType)> =
            properties.iter().map(|(n, ty)| (n.as_str(), *ty)).collect();

        import(&conn, vec![physical, view("WideView", &query, &declared)]).unwrap();

        let stmt = conn.session().prepare("SELECT * FROM ts.WideView").unwrap();
        assert_eq!(stmt.columns.len(), 11);
        assert_eq!(stmt.columns[0].name, "ECInstanceId");
        assert_eq!(stmt.columns[1].name, "ECClassId");
        assert_eq!(stmt.columns[10].name, "P9");
    }

    #[test_case("SELECT ECInstanceId, ECClassId, Name FROM ts.Foo"; "plain select")]
    #[test_case("WITH c(ECInstanceId, ECClassId, Name) AS (SELECT ECInstanceId, ECClassId, Name FROM ts.Foo) SELECT * FROM c"; "cte column list")]
    #[test_case("WITH c AS (SELECT ECInstanceId Id, ECClassId Cls, Name Label FROM ts.Foo) SELECT Id ECInstanceId, Cls ECClassId, Label Name FROM c"; "cte renamed outside")]
    #[test_case("WITH a AS (SELECT * FROM ts.Foo), b AS (SELECT ECInstanceId, ECClassId, Name FROM a) SELECT * FROM b"; "chained ctes")]
    fn test_valid_shape_imports(query: &str) {
        let (conn, _listener) = connection();
        let summary = import(&conn, vec![name_view("V", query)]).unwrap();
        assert_eq!(summary.compiled_views, 1);
        let stmt = conn.session().prepare("SELECT * FROM ts.V").unwrap();
        assert_eq!(stmt.columns.len(), 3);
    }

    #[test_case("SELECT ECInstanceId, ECClassId, Name FROM ts.Foo"; "plain select")]
    #[test_case("WITH c(ECInstanceId, ECClassId, Name) AS (SELECT ECInstanceId, ECClassId, Name FROM ts.Foo) SELECT * FROM c"; "cte column list")]
    fn test_missing_property_is_one_issue(query: &str) {
        let (conn, _listener) = connection();
        let issues = import_issues(import(
            &conn,
            vec![view(
                "V",
                query,
                &[("Name", PrimitiveType::String), ("Size", PrimitiveType::Double)],
            )],
        ));
        // One property issue plus the summary
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].category, ValidationCategory::ShapeMismatch);
        assert_eq!(
            issues[0].message,
            "Invalid view class 'TestSchema.V'. View class has property 'Size' which is not returned by view query."
        );
    }

    #[test_case("SELECT ECInstanceId, ECClassId, Size Name FROM ts.Foo"; "plain select")]
    #[test_case("WITH c(ECInstanceId, ECClassId, Name) AS (SELECT ECInstanceId, ECClassId, Size FROM ts.Foo) SELECT * FROM c"; "cte column list")]
    fn test_type_mismatch_is_one_issue(query: &str) {
        let (conn, _listener) = connection();
        let issues = import_issues(import(&conn, vec![name_view("V", query)]));
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].category, ValidationCategory::ShapeMismatch);
        assert!(
            issues[0].message.contains("('string' <> 'double')"),
            "{}",
            issues[0].message
        );
    }

    /// Test that system columns are checked before declared properties
    #[test]
    fn test_missing_system_columns() {
        let (conn, _listener) = connection();
        let messages = failure_messages(import(
            &conn,
            vec![
                name_view("NoId", "SELECT ECClassId, Name FROM ts.Foo"),
                name_view("TextId", "SELECT Name ECInstanceId, ECClassId, Name FROM ts.Foo"),
            ],
        ));
        assert_eq!(
            messages,
            vec![
                "Invalid view class 'TestSchema.NoId'. View query must return ECInstanceId.",
                "Invalid view class 'TestSchema.TextId'. View query column 'ECInstanceId' must be a primitive integer or long.",
                "Total of 2 view classes were checked and 2 were found to be invalid.",
            ]
        );
    }

    /// Test that extra columns, including misplaced system columns, are reported
    #[test]
    fn test_extra_columns() {
        let (conn, _listener) = connection();
        let issues = import_issues(import(
            &conn,
            vec![name_view(
                "V",
                "SELECT ECInstanceId, ECClassId, Name, Size, ECInstanceId SourceECInstanceId FROM ts.Foo",
            )],
        ));
        assert_eq!(issues.len(), 3);
        assert_eq!(issues[0].category, ValidationCategory::ShapeMismatch);
        assert_eq!(
            issues[0].message,
            "Invalid view class 'TestSchema.V'. View query returns property 'Size' which not defined in view class or is a invalid system property."
        );
        assert_eq!(issues[1].category, ValidationCategory::SystemColumn);
        assert!(issues[1].message.contains("'SourceECInstanceId'"));
    }

    /// Test that a navigation property needs both of its columns
    #[test]
    fn test_navigation_property() {
        let (conn, _listener) = connection();
        let nav_view = |name: &str, query: &str| {
            ClassDefinition::entity("ts", name)
                .with_primitive("Name", PrimitiveType::String)
                .with_property(PropertyDef::navigation("Parent", "ts.FooOwnsFoo"))
                .with_view_query(query)
        };

        import(
            &conn,
            vec![nav_view("Good", "SELECT ECInstanceId, ECClassId, Name, Parent FROM ts.Foo")],
        )
        .unwrap();

        let issues = import_issues(import(
            &conn,
            vec![nav_view(
                "Flat",
                "SELECT f.ECInstanceId, f.ECClassId, f.Name, f.Parent.Id Parent FROM ts.Foo f",
            )],
        ));
        assert_eq!(issues.len(), 2);
        assert!(issues[0].message.contains("('navigation' <> 'long')"));
    }

    /// Test that a relationship view must return its end columns
    #[test]
    fn test_relationship_view_end_columns() {
        use ecviews::schema_catalog::RelationshipConstraint;

        let (conn, _listener) = connection();
        let rel_view = |name: &str, query: &str| {
            ClassDefinition::relationship(
                "ts",
                name,
                RelationshipConstraint::new("ts.Foo"),
                RelationshipConstraint::new("ts.Foo"),
            )
            .with_view_query(query)
        };

        import(
            &conn,
            vec![rel_view(
                "Owns",
                "SELECT ECInstanceId, ECClassId, SourceECInstanceId, SourceECClassId, TargetECInstanceId, TargetECClassId FROM ts.FooOwnsFoo",
            )],
        )
        .unwrap();

        let messages = failure_messages(import(
            &conn,
            vec![rel_view(
                "Partial",
                "SELECT ECInstanceId, ECClassId, SourceECInstanceId, SourceECClassId FROM ts.FooOwnsFoo",
            )],
        ));
        assert_eq!(
            messages,
            vec![
                "Invalid view class 'TestSchema.Partial'. View query must return TargetECInstanceId.",
                "Invalid view class 'TestSchema.Partial'. View query must return TargetECClassId.",
                "Total of 2 view classes were checked and 1 were found to be invalid.",
            ]
        );
    }

    /// Test that validating the same schema twice gives identical issues
    #[test]
    fn test_revalidation_is_idempotent() {
        let (conn, listener) = connection();
        import(&conn, vec![name_view("V", "SELECT ECInstanceId, ECClassId, Name FROM ts.Foo")]).unwrap();
        let first = conn.revalidate();
        let second = conn.revalidate();
        assert_eq!(first, second);
        assert!(first.passed());
        assert_eq!(conn.view_cache().len(), 1);

        listener.clear();
        let bad = || vec![name_view("Bad", "SELECT ECInstanceId, ECClassId, Size FROM ts.Foo")];
        let once = failure_messages(import(&conn, bad()));
        let twice = failure_messages(import(&conn, bad()));
        assert_eq!(once, twice);
        assert_eq!(listener.messages().len(), once.len() * 2);
    }
}
