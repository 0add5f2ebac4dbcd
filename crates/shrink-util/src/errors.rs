use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all shrink operations.
///
/// Registry and resolution failures are collected per dependency rather than
/// aborting, so every variant except [`ShrinkError::Io`] is `Clone`-friendly
/// data (strings and codes only).
#[derive(Debug, Error, Diagnostic)]
pub enum ShrinkError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The root manifest (package.json) could not be read or parsed.
    #[error("Invalid manifest: {message}")]
    #[diagnostic(help("Check your package.json for syntax errors"))]
    InvalidManifest { message: String },

    /// Transport-level failure talking to the registry.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The registry answered with something other than 200.
    #[error("HTTP {code} fetching {url}")]
    HttpStatus { code: u16, url: String },

    /// The registry body was not valid JSON.
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// The registry body was JSON but lacked the expected shape.
    #[error("Malformed registry data: {message}")]
    MalformedData { message: String },

    /// No published version satisfies the requested range.
    #[error("No version of {name} satisfies {range}")]
    UnsatisfiableRange { name: String, range: String },

    /// A single registry lookup exceeded its deadline.
    #[error("Lookup for {spec} timed out after {secs}s")]
    Timeout { spec: String, secs: u64 },

    /// Resolution was cancelled before the queue drained.
    #[error("Resolution cancelled")]
    Cancelled,

    /// Invalid resolver configuration.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check ~/.shrink/config.toml and the command-line flags"))]
    Config { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

impl ShrinkError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ShrinkError::Network { .. } | ShrinkError::Timeout { .. } => true,
            ShrinkError::HttpStatus { code, .. } => *code >= 500,
            _ => false,
        }
    }
}

impl Clone for ShrinkError {
    fn clone(&self) -> Self {
        match self {
            ShrinkError::Io(e) => ShrinkError::Io(std::io::Error::new(e.kind(), e.to_string())),
            ShrinkError::InvalidManifest { message } => ShrinkError::InvalidManifest {
                message: message.clone(),
            },
            ShrinkError::Network { message } => ShrinkError::Network {
                message: message.clone(),
            },
            ShrinkError::HttpStatus { code, url } => ShrinkError::HttpStatus {
                code: *code,
                url: url.clone(),
            },
            ShrinkError::Parse { message } => ShrinkError::Parse {
                message: message.clone(),
            },
            ShrinkError::MalformedData { message } => ShrinkError::MalformedData {
                message: message.clone(),
            },
            ShrinkError::UnsatisfiableRange { name, range } => ShrinkError::UnsatisfiableRange {
                name: name.clone(),
                range: range.clone(),
            },
            ShrinkError::Timeout { spec, secs } => ShrinkError::Timeout {
                spec: spec.clone(),
                secs: *secs,
            },
            ShrinkError::Cancelled => ShrinkError::Cancelled,
            ShrinkError::Config { message } => ShrinkError::Config {
                message: message.clone(),
            },
            ShrinkError::Generic { message } => ShrinkError::Generic {
                message: message.clone(),
            },
        }
    }
}

/// Convenience alias for `miette::Result<T>`.
pub type ShrinkResult<T> = miette::Result<T>;
