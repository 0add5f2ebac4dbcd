use shrink_core::config::{dirs_path, GlobalConfig, ResolverConfig, DEFAULT_REGISTRY};
use tempfile::TempDir;

#[test]
fn test_resolver_config_defaults() {
    let config = ResolverConfig::default();
    assert_eq!(config.registry, DEFAULT_REGISTRY);
    assert!(!config.production);
    assert_eq!(config.limit, 10);
    assert!(config.optimize);
    assert_eq!(config.timeout, 30);
}

#[test]
fn test_empty_toml_gives_defaults() {
    let config: GlobalConfig = toml::from_str("").unwrap();
    assert_eq!(config.resolver, ResolverConfig::default());
}

#[test]
fn test_partial_resolver_table() {
    let toml = r#"
[resolver]
production = true
limit = 4
"#;
    let config: GlobalConfig = toml::from_str(toml).unwrap();
    assert!(config.resolver.production);
    assert_eq!(config.resolver.limit, 4);
    assert!(config.resolver.optimize);
    assert_eq!(config.resolver.registry, DEFAULT_REGISTRY);
}

#[test]
fn test_validate_rejects_zero_limit() {
    let config = ResolverConfig {
        limit: 0,
        ..Default::default()
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("limit"), "got: {err}");
}

#[test]
fn test_validate_rejects_non_http_registry() {
    let config = ResolverConfig {
        registry: "ftp://example.com".to_string(),
        ..Default::default()
    };
    assert!(config.validate().is_err());
    assert!(ResolverConfig::default().validate().is_ok());
}

#[test]
fn test_load_from_missing_file_is_default() {
    let tmp = TempDir::new().unwrap();
    let config = GlobalConfig::load_from(&tmp.path().join("config.toml")).unwrap();
    assert_eq!(config.resolver, ResolverConfig::default());
}

#[test]
fn test_load_from_invalid_toml_fails() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "[resolver\nlimit = ").unwrap();
    let err = GlobalConfig::load_from(&path).unwrap_err();
    assert!(err.to_string().contains("Configuration error"), "got: {err}");
}

#[test]
fn test_dirs_path_contains_shrink() {
    assert!(dirs_path().ends_with(".shrink"));
}
