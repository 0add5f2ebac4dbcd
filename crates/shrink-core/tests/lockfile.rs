use std::collections::BTreeMap;

use shrink_core::lockfile::{LockedDependency, Shrinkwrap};
use tempfile::TempDir;

fn sample() -> Shrinkwrap {
    let mut inner = BTreeMap::new();
    inner.insert(
        "js-tokens".to_string(),
        LockedDependency {
            version: "4.0.0".to_string(),
            shasum: Some("19203fb59991df98e3a287050d4647cdeaf32499".to_string()),
            released: Some("2017-11-11T10:38:40.165Z".to_string()),
            dependencies: BTreeMap::new(),
        },
    );
    let mut deps = BTreeMap::new();
    deps.insert(
        "loose-envify".to_string(),
        LockedDependency {
            version: "1.4.0".to_string(),
            shasum: None,
            released: None,
            dependencies: inner,
        },
    );
    Shrinkwrap {
        name: "app".to_string(),
        version: "1.0.0".to_string(),
        dependencies: deps,
    }
}

#[test]
fn write_then_read_back() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("npm-shrinkwrap.json");
    let wrap = sample();
    wrap.write_to(&path).unwrap();
    let loaded = Shrinkwrap::from_path(&path).unwrap();
    assert_eq!(loaded, wrap);
    assert_eq!(loaded.package_count(), 2);
}

#[test]
fn empty_fields_are_omitted() {
    let json = sample().to_string_pretty().unwrap();
    assert!(json.ends_with('\n'));
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let loose = &value["dependencies"]["loose-envify"];
    assert!(loose.get("shasum").is_none());
    assert!(loose.get("released").is_none());
    assert_eq!(
        loose["dependencies"]["js-tokens"]["version"],
        serde_json::json!("4.0.0")
    );
    assert!(loose["dependencies"]["js-tokens"].get("dependencies").is_none());
}

#[test]
fn empty_tree_has_only_name_and_version() {
    let wrap = Shrinkwrap {
        name: "empty".to_string(),
        version: "0.0.1".to_string(),
        dependencies: BTreeMap::new(),
    };
    let value: serde_json::Value = serde_json::from_str(&wrap.to_string_pretty().unwrap()).unwrap();
    assert_eq!(value, serde_json::json!({"name": "empty", "version": "0.0.1"}));
    assert_eq!(wrap.package_count(), 0);
}

#[test]
fn reading_garbage_fails() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("npm-shrinkwrap.json");
    std::fs::write(&path, "not json").unwrap();
    let err = Shrinkwrap::from_path(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse lockfile"), "got: {err}");
}
