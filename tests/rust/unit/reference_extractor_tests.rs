//! Table-driven tests for the raw-text class reference scan

#[cfg(test)]
mod reference_extractor_tests {
    use ecviews::view_validation::reference_extractor::{extract_references, ReferencedName};
    use test_case::test_case;

    fn qualified(query: &str) -> Vec<String> {
        extract_references(query)
            .iter()
            .map(ReferencedName::qualified)
            .collect()
    }

    #[test_case("SELECT * FROM ts.A", &["ts.A"]; "single class")]
    #[test_case("SELECT * FROM [ts].[A] a JOIN ts.B b ON a.x = b.y", &["ts.A", "ts.B"]; "bracketed and joined")]
    #[test_case("SELECT * FROM ts.A, ts.A", &["ts.A"]; "duplicates collapse")]
    #[test_case("SELECT * FROM ts.V WHERE ECInstanceId IN (SELECT ECInstanceId FROM ts.V)", &["ts.V"]; "self reference in subquery")]
    #[test_case("WITH c AS (SELECT * FROM ts.A) SELECT * FROM c", &["ts.A", "c"]; "cte body scanned")]
    #[test_case("SELECT 1", &[]; "no from clause")]
    #[test_case("SELECT 'FROM ts.X' FROM ts.Y", &["ts.Y"]; "string literal ignored")]
    #[test_case("SELECT * FROM ts.A WHERE (((", &["ts.A"]; "unbalanced parens")]
    fn test_references(query: &str, expected: &[&str]) {
        assert_eq!(qualified(query), expected);
    }

    #[test]
    fn test_unqualified_names_have_no_schema() {
        let refs = extract_references("WITH c AS (SELECT 1) SELECT * FROM c");
        assert_eq!(
            refs,
            vec![ReferencedName {
                schema: None,
                name: "c".to_string()
            }]
        );
    }
}
