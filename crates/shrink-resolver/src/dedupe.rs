//! Manifest deduplication: drop devDependencies already covered by dependencies.

use shrink_core::manifest::Manifest;
use shrink_registry::version::ranges_equal;

/// Return `manifest` without the devDependencies entries whose range is
/// exactly equal to the dependencies entry of the same name.
///
/// Overlapping ranges are kept; only equal constraints are dropped. A range
/// that fails to parse is never equal to anything. In production mode the
/// devDependencies are not resolved at all, so the manifest is left as is.
pub fn dedupe(manifest: &Manifest, production: bool) -> Manifest {
    let mut out = manifest.clone();
    if production || manifest.dependencies.is_empty() || manifest.dev_dependencies.is_empty() {
        return out;
    }

    out.dev_dependencies.retain(|name, dev_range| {
        let duplicate = manifest
            .dependencies
            .get(name)
            .is_some_and(|range| ranges_equal(range, dev_range));
        if duplicate {
            tracing::debug!("dedupe: dropping devDependency {name}@{dev_range}");
        }
        !duplicate
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(json: &str) -> Manifest {
        Manifest::from_str(json).unwrap()
    }

    #[test]
    fn drops_equal_dev_dependency() {
        let m = manifest(
            r#"{"dependencies":{"lodash":"^4.0.0"},"devDependencies":{"lodash":"^4.0.0","mocha":"^10.0.0"}}"#,
        );
        let out = dedupe(&m, false);
        assert!(!out.dev_dependencies.contains_key("lodash"));
        assert_eq!(out.dev_dependencies["mocha"], "^10.0.0");
        assert_eq!(out.dependencies["lodash"], "^4.0.0");
    }

    #[test]
    fn equal_after_desugaring() {
        let m = manifest(
            r#"{"dependencies":{"a":"^1.2.0"},"devDependencies":{"a":">=1.2.0 <2.0.0"}}"#,
        );
        assert!(dedupe(&m, false).dev_dependencies.is_empty());
    }

    #[test]
    fn overlapping_ranges_are_kept() {
        let m = manifest(r#"{"dependencies":{"a":"^1.0.0"},"devDependencies":{"a":"~1.2.0"}}"#);
        assert_eq!(dedupe(&m, false), m);
    }

    #[test]
    fn malformed_range_is_not_equal() {
        let m = manifest(r#"{"dependencies":{"a":"not a range"},"devDependencies":{"a":"not a range"}}"#);
        assert_eq!(dedupe(&m, false), m);
    }

    #[test]
    fn production_mode_is_a_no_op() {
        let m = manifest(r#"{"dependencies":{"a":"^1.0.0"},"devDependencies":{"a":"^1.0.0"}}"#);
        assert_eq!(dedupe(&m, true), m);
    }

    #[test]
    fn fixed_point() {
        let m = manifest(
            r#"{"dependencies":{"a":"^1.0.0","b":"2.x"},"devDependencies":{"a":"^1.0.0","b":"^2.1.0","c":"*"}}"#,
        );
        let once = dedupe(&m, false);
        assert_eq!(dedupe(&once, false), once);
    }
}
