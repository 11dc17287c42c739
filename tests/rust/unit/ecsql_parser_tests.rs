//! Parser robustness tests for the ECSQL subset
//!
//! These only check that statements are accepted or rejected; binding is
//! covered by the integration suite.

#[cfg(test)]
mod ecsql_parser_tests {
    use ecviews::ecsql::{parse_ecsql, PrepareError};
    use test_case::test_case;

    #[test_case("SELECT ECInstanceId, ECClassId, Name FROM ts.Foo"; "plain select")]
    #[test_case("SELECT * FROM ts.Foo f WHERE f.Name LIKE 'a%' ORDER BY f.Name DESC LIMIT 10 OFFSET 2"; "filters and paging")]
    #[test_case("SELECT DISTINCT Name FROM ONLY ts.Foo"; "distinct and only")]
    #[test_case("WITH c(Id) AS (SELECT ECInstanceId FROM ts.Foo) SELECT Id FROM c"; "cte with columns")]
    #[test_case("WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < 3) SELECT x FROM n"; "recursive cte")]
    #[test_case("SELECT a.Name FROM ts.Foo a LEFT OUTER JOIN ts.Bar b ON a.Name = b.Name"; "outer join")]
    #[test_case("SELECT CASE WHEN Size > 1 THEN 'big' ELSE 'small' END Kind FROM ts.Foo"; "case expression")]
    #[test_case("SELECT CAST(Size AS TEXT) FROM ts.Foo"; "cast")]
    #[test_case("SELECT $, f.$->Name FROM ts.Foo f"; "instance access forms")]
    #[test_case("SELECT [Name] AS [Label] FROM [ts].[Foo];"; "bracketed identifiers and semicolon")]
    #[test_case("SELECT Name FROM ts.Foo -- trailing comment"; "trailing comment")]
    fn test_accepted(ecsql: &str) {
        let result = parse_ecsql(ecsql);
        assert!(result.is_ok(), "{ecsql}: {:?}", result.err());
    }

    #[test_case(""; "empty")]
    #[test_case("SELECT"; "select only")]
    #[test_case("SELECT FROM ts.Foo"; "missing list")]
    #[test_case("SELECT Name FROM"; "missing class")]
    #[test_case("SELECT Name FROM ts.Foo WHERE"; "dangling where")]
    #[test_case("SELECT (Name FROM ts.Foo"; "unbalanced paren")]
    #[test_case("SELECT 'open FROM ts.Foo"; "unterminated string")]
    #[test_case("INSERT INTO ts.Foo VALUES (1)"; "not a select")]
    fn test_rejected(ecsql: &str) {
        match parse_ecsql(ecsql) {
            Err(PrepareError::Syntax { .. }) => {}
            other => panic!("{ecsql}: expected syntax error, got {:?}", other),
        }
    }
}
