//! Tests for ViewConfig loading from the environment and from YAML files

#[cfg(test)]
mod view_config_tests {
    use std::env;
    use std::io::Write;

    use ecviews::config::{ConfigError, ViewConfig};
    use serial_test::serial;
    use tempfile::NamedTempFile;

    const VARS: [&str; 3] = [
        "ECVIEWS_EXPERIMENTAL_FEATURES",
        "ECVIEWS_MAX_VIEW_NESTING_DEPTH",
        "ECVIEWS_LOG_ISSUES",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = ViewConfig::from_env().unwrap();
        assert_eq!(config, ViewConfig::default());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        env::set_var("ECVIEWS_EXPERIMENTAL_FEATURES", "true");
        env::set_var("ECVIEWS_MAX_VIEW_NESTING_DEPTH", "4");
        env::set_var("ECVIEWS_LOG_ISSUES", "false");

        let config = ViewConfig::from_env().unwrap();
        clear_env();

        assert!(config.experimental_features);
        assert_eq!(config.max_view_nesting_depth, 4);
        assert!(!config.log_issues);
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_values() {
        clear_env();
        env::set_var("ECVIEWS_MAX_VIEW_NESTING_DEPTH", "deep");
        let err = ViewConfig::from_env().unwrap_err();
        clear_env();
        match err {
            ConfigError::Parse { field, value, .. } => {
                assert_eq!(field, "ECVIEWS_MAX_VIEW_NESTING_DEPTH");
                assert_eq!(value, "deep");
            }
            other => panic!("Expected parse error, got {:?}", other),
        }

        env::set_var("ECVIEWS_MAX_VIEW_NESTING_DEPTH", "0");
        let err = ViewConfig::from_env().unwrap_err();
        clear_env();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "experimental_features: true").unwrap();
        writeln!(file, "max_view_nesting_depth: 8").unwrap();

        let config = ViewConfig::from_yaml_file(file.path()).unwrap();
        assert!(config.experimental_features);
        assert_eq!(config.max_view_nesting_depth, 8);
        // Unset fields keep their defaults
        assert!(config.log_issues);
    }

    #[test]
    fn test_from_missing_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ViewConfig::from_yaml_file(dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
