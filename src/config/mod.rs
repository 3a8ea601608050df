//! Server configuration in the `serve.json` shape.
//!
//! The configuration is loaded and validated once before any request is
//! served, then shared read-only (typically behind an [`Arc`](std::sync::Arc)).
//!
//! ```json
//! {
//!   "public": "dist",
//!   "cleanUrls": true,
//!   "trailingSlash": false,
//!   "rewrites": [{ "source": "/blog/:slug", "destination": "/posts/:slug.html" }],
//!   "redirects": [{ "source": "/old", "destination": "/new", "type": 302 }],
//!   "headers": [{ "source": "**/*.js", "headers": [{ "key": "Cache-Control", "value": "max-age=3600" }] }],
//!   "directoryListing": ["/downloads/**"],
//!   "unlisted": ["*.map"]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::http::StatusCode;
use crate::pattern::PatternError;

pub mod compiled;

pub use compiled::{CompiledConfig, CompiledHeaderRule, CompiledRule, CompiledToggle};

/// Errors raised while loading or validating a [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid pattern in `{option}`: {source}")]
    Pattern {
        option: &'static str,
        #[source]
        source: PatternError,
    },

    #[error("redirect for `{source_pattern}` uses {status}, which is not a redirect status")]
    NotARedirect {
        source_pattern: String,
        status: u16,
    },

    #[error("header rule for `{source_pattern}` has an empty key")]
    EmptyHeaderKey { source_pattern: String },
}

/// Either a global on/off switch or a list of patterns the option applies to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Toggle {
    Enabled(bool),
    Patterns(Vec<String>),
}

impl Default for Toggle {
    fn default() -> Self {
        Self::Enabled(true)
    }
}

/// A rewrite or redirect rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub source: String,
    pub destination: String,
    /// Redirect status; ignored for rewrites. Defaults to 301.
    #[serde(default, rename = "type", alias = "statusCode")]
    pub status: Option<StatusCode>,
}

impl Rule {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            status: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }
}

/// One custom header. A `null` value removes the header from the response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeaderPair {
    pub key: String,
    pub value: Option<String>,
}

/// Headers added to every response whose file path matches `source`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeaderRule {
    pub source: String,
    pub headers: Vec<HeaderPair>,
}

impl HeaderRule {
    pub fn new<K, V>(source: impl Into<String>, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            source: source.into(),
            headers: headers
                .into_iter()
                .map(|(key, value)| HeaderPair {
                    key: key.into(),
                    value: Some(value.into()),
                })
                .collect(),
        }
    }
}

/// Resolution options.
///
/// | Field              | Default                                 |
/// |--------------------|-----------------------------------------|
/// | `public`           | serve root itself                       |
/// | `clean_urls`       | enabled everywhere                      |
/// | `trailing_slash`   | unset (no slash normalization)          |
/// | `directory_listing`| enabled everywhere                      |
/// | `render_single`    | `false`                                 |
/// | `symlinks`         | `false` (symbolic links are not served) |
///
/// Unknown keys are ignored so a shared `serve.json` can carry options for
/// other tools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub public: Option<PathBuf>,
    pub clean_urls: Toggle,
    pub trailing_slash: Option<bool>,
    pub rewrites: Vec<Rule>,
    pub redirects: Vec<Rule>,
    pub headers: Vec<HeaderRule>,
    pub directory_listing: Toggle,
    pub unlisted: Vec<String>,
    pub render_single: bool,
    pub symlinks: bool,
}

impl Config {
    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed JSON or wrong field types, and any
    /// error from [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Read`] if the file cannot be read, plus everything
    /// [`from_json_str`](Self::from_json_str) reports.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Checks every pattern compiles, every redirect uses a 3xx status and
    /// every custom header has a name.
    ///
    /// # Errors
    ///
    /// Returns the first problem [`compile`](Self::compile) finds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.compile().map(|_| ())
    }

    /// Directory files are served from: `root` joined with `public`.
    pub fn serve_root(&self, root: impl AsRef<Path>) -> PathBuf {
        match &self.public {
            Some(public) => root.as_ref().join(public),
            None => root.as_ref().to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::from_json_str("{}").unwrap();
        assert_eq!(config.clean_urls, Toggle::Enabled(true));
        assert_eq!(config.directory_listing, Toggle::Enabled(true));
        assert_eq!(config.trailing_slash, None);
        assert!(config.rewrites.is_empty());
        assert!(!config.symlinks);
        assert!(!config.render_single);
    }

    #[test]
    fn full_document() {
        let config = Config::from_json_str(
            r#"{
                "public": "dist",
                "cleanUrls": ["/blog/**"],
                "trailingSlash": true,
                "rewrites": [{ "source": "/app/**", "destination": "/index.html" }],
                "redirects": [{ "source": "/old", "destination": "/new", "type": 302 }],
                "headers": [{
                    "source": "**/*.js",
                    "headers": [
                        { "key": "Cache-Control", "value": "max-age=60" },
                        { "key": "X-Powered-By", "value": null }
                    ]
                }],
                "directoryListing": false,
                "unlisted": ["*.map"],
                "renderSingle": true,
                "etag": true
            }"#,
        )
        .unwrap();

        assert_eq!(config.public.as_deref(), Some(Path::new("dist")));
        assert_eq!(config.clean_urls, Toggle::Patterns(vec!["/blog/**".into()]));
        assert_eq!(config.trailing_slash, Some(true));
        assert_eq!(config.redirects[0].status, Some(StatusCode::Found));
        assert_eq!(config.headers[0].headers[1].value, None);
        assert_eq!(config.directory_listing, Toggle::Enabled(false));
        assert!(config.render_single);
        assert_eq!(config.serve_root("/srv"), PathBuf::from("/srv/dist"));
    }

    #[test]
    fn rejects_non_redirect_status() {
        let err = Config::from_json_str(
            r#"{ "redirects": [{ "source": "/a", "destination": "/b", "type": 200 }] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::NotARedirect { status: 200, .. }));
    }

    #[test]
    fn rejects_unknown_status() {
        let err = Config::from_json_str(
            r#"{ "redirects": [{ "source": "/a", "destination": "/b", "type": 399 }] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_bad_pattern() {
        let err = Config::from_json_str(r#"{ "unlisted": ["[z-a]"] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Pattern { option: "unlisted", .. }));
    }

    #[test]
    fn rejects_empty_header_key() {
        let err = Config::from_json_str(
            r#"{ "headers": [{ "source": "*", "headers": [{ "key": " ", "value": "x" }] }] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyHeaderKey { .. }));
    }

    #[test]
    fn from_path_reports_missing_file() {
        let err = Config::from_path("/definitely/not/here/serve.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
