//! Registry endpoint abstraction: base URL and package document layout.

use shrink_core::config::DEFAULT_REGISTRY;

/// A configured registry endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEndpoint {
    pub url: String,
}

impl RegistryEndpoint {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
        }
    }

    /// Construct the public npm registry endpoint.
    pub fn npmjs() -> Self {
        Self::new(DEFAULT_REGISTRY)
    }

    /// URL of the package document for `name`.
    ///
    /// Scoped names keep their `@` but escape the separator:
    /// `@types/node` becomes `@types%2fnode`.
    pub fn package_url(&self, name: &str) -> String {
        format!("{}/{}", self.url, escape_name(name))
    }
}

impl Default for RegistryEndpoint {
    fn default() -> Self {
        Self::npmjs()
    }
}

fn escape_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, ch) in name.chars().enumerate() {
        match ch {
            '@' if i == 0 => out.push('@'),
            '/' => out.push_str("%2f"),
            c if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~') => out.push(c),
            c => {
                let mut buf = [0u8; 4];
                for b in c.encode_utf8(&mut buf).bytes() {
                    out.push_str(&format!("%{b:02X}"));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_package_url() {
        let reg = RegistryEndpoint::npmjs();
        assert_eq!(reg.package_url("lodash"), "https://registry.npmjs.org/lodash");
    }

    #[test]
    fn scoped_package_url() {
        let reg = RegistryEndpoint::new("https://npm.example.com/");
        assert_eq!(
            reg.package_url("@types/node"),
            "https://npm.example.com/@types%2fnode"
        );
    }

    #[test]
    fn odd_characters_are_percent_encoded() {
        let reg = RegistryEndpoint::new("http://localhost:4873");
        assert_eq!(reg.package_url("a b"), "http://localhost:4873/a%20b");
    }
}
