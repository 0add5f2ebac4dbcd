use shrink_core::manifest::{DependencyKind, License, Manifest};
use tempfile::TempDir;

const PACKAGE_JSON: &str = r#"{
  "name": "my-app",
  "version": "1.2.3",
  "description": "demo",
  "license": "MIT",
  "author": { "name": "Jane Doe", "email": "jane@example.com" },
  "dependencies": { "react": "^18.2.0", "lodash": "^4.17.21" },
  "devDependencies": { "lodash": "^4.17.21", "jest": "~29.7.0" },
  "peerDependencies": { "react-dom": ">=18" },
  "optionalDependencies": { "fsevents": "2.x" },
  "scripts": { "test": "jest" }
}"#;

#[test]
fn test_parse_full_manifest() {
    let m = Manifest::from_str(PACKAGE_JSON).unwrap();
    assert_eq!(m.name, "my-app");
    assert_eq!(m.version, "1.2.3");
    assert_eq!(m.description.as_deref(), Some("demo"));
    assert_eq!(m.license, Some(License::Text("MIT".to_string())));
    assert_eq!(m.author.as_ref().and_then(|a| a.name()), Some("Jane Doe"));
    assert_eq!(m.dependencies.len(), 2);
    assert_eq!(m.dev_dependencies.len(), 2);
    assert_eq!(m.peer_dependencies["react-dom"], ">=18");
    assert_eq!(m.optional_dependencies["fsevents"], "2.x");
}

#[test]
fn test_entries_follow_group_order() {
    let m = Manifest::from_str(PACKAGE_JSON).unwrap();
    let kinds = [DependencyKind::Dependencies, DependencyKind::OptionalDependencies];
    let entries: Vec<_> = m.entries(&kinds).collect();
    assert_eq!(
        entries,
        vec![
            (DependencyKind::Dependencies, "lodash", "^4.17.21"),
            (DependencyKind::Dependencies, "react", "^18.2.0"),
            (DependencyKind::OptionalDependencies, "fsevents", "2.x"),
        ]
    );
}

#[test]
fn test_legacy_licenses_array() {
    let m = Manifest::from_str(
        r#"{"name":"old","version":"0.1.0","licenses":[{"type":"MIT","url":"http://x"},"BSD"]}"#,
    )
    .unwrap();
    assert_eq!(m.license_names(), vec!["MIT".to_string(), "BSD".to_string()]);
}

#[test]
fn test_empty_object_has_no_dependencies() {
    let m = Manifest::from_str("{}").unwrap();
    assert!(m.has_no_dependencies());
    assert_eq!(m.name, "");
}

#[test]
fn test_invalid_json_is_invalid_manifest() {
    let err = Manifest::from_str("{ not json").unwrap_err();
    assert!(err.to_string().contains("Invalid manifest"), "got: {err}");
}

#[test]
fn test_from_path_missing_file() {
    let tmp = TempDir::new().unwrap();
    let err = Manifest::from_path(&tmp.path().join("package.json")).unwrap_err();
    assert!(err.to_string().contains("Failed to read"), "got: {err}");
}

#[test]
fn test_from_path_reads_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("package.json");
    std::fs::write(&path, PACKAGE_JSON).unwrap();
    let m = Manifest::from_path(&path).unwrap();
    assert_eq!(m.name, "my-app");
}
