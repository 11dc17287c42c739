//! Reference cycle detection through schema import

#[cfg(test)]
mod cycle_detection_tests {
    use ecviews::view_validation::diagnostics::ValidationCategory;
    use ecviews::ImportError;

    use crate::fixtures::{connection, failure_messages, import, name_view};

    const SELECT_NAME: &str = "SELECT ECInstanceId, ECClassId, Name FROM";

    fn query(class: &str) -> String {
        format!("{} {}", SELECT_NAME, class)
    }

    /// Test that a chain of views over each other imports with no structural issue
    #[test]
    fn test_acyclic_graph_has_no_structural_issues() {
        let (conn, listener) = connection();
        let summary = import(
            &conn,
            vec![
                name_view("Top", "SELECT t.ECInstanceId, t.ECClassId, t.Name FROM ts.Mid t JOIN ts.Leaf l ON t.ECInstanceId = l.ECInstanceId"),
                name_view("Mid", &query("ts.Leaf")),
                name_view("Leaf", &query("ts.Foo")),
            ],
        )
        .unwrap();

        assert!(summary.report.passed());
        assert_eq!(summary.compiled_views, 3);
        assert!(!summary
            .report
            .issues
            .iter()
            .any(|i| i.category == ValidationCategory::Structural));
        assert_eq!(
            listener.messages(),
            vec!["Total of 3 view classes were checked and 0 were found to be invalid."]
        );
    }

    /// Test the exact message sequence for a view selecting from itself
    #[test]
    fn test_self_reference() {
        let (conn, listener) = connection();
        let self_query = query("ts.A");
        let messages = failure_messages(import(&conn, vec![name_view("A", &self_query)]));

        let expected = vec![
            "Invalid View Class 'TestSchema.A'. View query references itself recusively (TestSchema.A -> TestSchema.A).".to_string(),
            "Invalid View Class 'TestSchema.A'. View ECSQL failed to parse.".to_string(),
            format!("Invalid view class 'TestSchema.A'. Failed to prepare view query ({})", self_query),
            "Total of 1 view classes were checked and 1 were found to be invalid.".to_string(),
        ];
        assert_eq!(messages, expected);
        // Listeners see the same stream in the same order
        assert_eq!(listener.messages(), expected);
        assert!(conn.catalog().find_class("ts", "A").is_none());
    }

    /// Test a 3-cycle next to 3 valid views
    #[test]
    fn test_three_cycle_reports_every_rotation() {
        let (conn, _listener) = connection();
        let result = import(
            &conn,
            vec![
                name_view("V1", &query("ts.V2")),
                name_view("V2", &query("ts.V3")),
                name_view("V3", &query("ts.V1")),
                name_view("Ok1", &query("ts.Foo")),
                name_view("Ok2", &query("ts.Bar")),
                name_view("Ok3", &query("ts.Ok1")),
            ],
        );
        let issues = match result {
            Err(ImportError::ViewValidationFailed {
                checked,
                invalid,
                issues,
            }) => {
                assert_eq!(checked, 6);
                assert_eq!(invalid, 3);
                issues
            }
            other => panic!("Expected validation failure, got {:?}", other.map(|s| s.report)),
        };

        let cycles: Vec<&str> = issues
            .iter()
            .filter(|i| i.category == ValidationCategory::Structural)
            .map(|i| i.message.as_str())
            .collect();
        assert_eq!(
            cycles,
            vec![
                "Invalid View Class 'TestSchema.V1'. View query references itself recusively (TestSchema.V1 -> TestSchema.V2 -> TestSchema.V3 -> TestSchema.V1).",
                "Invalid View Class 'TestSchema.V2'. View query references itself recusively (TestSchema.V2 -> TestSchema.V3 -> TestSchema.V1 -> TestSchema.V2).",
                "Invalid View Class 'TestSchema.V3'. View query references itself recusively (TestSchema.V3 -> TestSchema.V1 -> TestSchema.V2 -> TestSchema.V3).",
            ]
        );

        // Cycle messages first, one parse failure pair per cycle member, summary last
        assert!(issues[..3]
            .iter()
            .all(|i| i.category == ValidationCategory::Structural));
        let parse_failures = issues
            .iter()
            .filter(|i| i.category == ValidationCategory::Parse)
            .count();
        assert_eq!(parse_failures, 6);
        for name in ["TestSchema.Ok1", "TestSchema.Ok2", "TestSchema.Ok3"] {
            assert!(!issues.iter().any(|i| i.class_name.as_deref() == Some(name)));
        }
        assert_eq!(
            issues.last().unwrap().message,
            "Total of 6 view classes were checked and 3 were found to be invalid."
        );
    }

    /// Test that a cycle hidden inside a CTE body is still found
    #[test]
    fn test_cycle_through_cte() {
        let (conn, _listener) = connection();
        let messages = failure_messages(import(
            &conn,
            vec![
                name_view(
                    "A",
                    "WITH c AS (SELECT ECInstanceId, ECClassId, Name FROM ts.B) SELECT * FROM c",
                ),
                name_view("B", &query("ts.A")),
            ],
        ));
        assert!(messages[0].contains("(TestSchema.A -> TestSchema.B -> TestSchema.A)"));
        assert!(messages[1].contains("(TestSchema.B -> TestSchema.A -> TestSchema.B)"));
    }
}
