//! Configuration with every pattern compiled, built once at startup.

use crate::http::StatusCode;
use crate::pattern::{PatternError, SourcePattern};

use super::{Config, ConfigError, HeaderPair, HeaderRule, Rule, Toggle};

/// A [`Toggle`] whose patterns are compiled.
#[derive(Debug, Clone)]
pub enum CompiledToggle {
    Enabled(bool),
    Patterns(Vec<SourcePattern>),
}

impl CompiledToggle {
    fn compile(toggle: &Toggle, option: &'static str) -> Result<Self, ConfigError> {
        Ok(match toggle {
            Toggle::Enabled(enabled) => Self::Enabled(*enabled),
            Toggle::Patterns(patterns) => Self::Patterns(
                patterns
                    .iter()
                    .map(|source| glob(option, source))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        })
    }

    /// Returns `true` if the option applies to `path`.
    pub fn applies(&self, path: &str) -> bool {
        match self {
            Self::Enabled(enabled) => *enabled,
            Self::Patterns(patterns) => patterns.iter().any(|pattern| pattern.is_match(path)),
        }
    }
}

/// A rewrite or redirect [`Rule`] with its source compiled in both dialects.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub source: SourcePattern,
    pub destination: String,
    pub status: Option<StatusCode>,
}

impl Rule {
    /// Compiles the rule's source.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if the source is not a valid glob.
    pub fn compile(&self) -> Result<CompiledRule, PatternError> {
        Ok(CompiledRule {
            source: SourcePattern::with_segments(&self.source)?,
            destination: self.destination.clone(),
            status: self.status,
        })
    }
}

/// A [`HeaderRule`] with its source compiled.
#[derive(Debug, Clone)]
pub struct CompiledHeaderRule {
    pub source: SourcePattern,
    pub headers: Vec<HeaderPair>,
}

impl HeaderRule {
    /// Compiles the rule's source.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if the source is not a valid glob.
    pub fn compile(&self) -> Result<CompiledHeaderRule, PatternError> {
        Ok(CompiledHeaderRule {
            source: SourcePattern::new(&self.source)?,
            headers: self.headers.clone(),
        })
    }
}

/// Everything request resolution reads from a [`Config`], with patterns
/// compiled. Built by [`Config::compile`].
#[derive(Debug, Clone)]
pub struct CompiledConfig {
    pub clean_urls: CompiledToggle,
    pub trailing_slash: Option<bool>,
    pub rewrites: Vec<CompiledRule>,
    pub redirects: Vec<CompiledRule>,
    pub headers: Vec<CompiledHeaderRule>,
    pub directory_listing: CompiledToggle,
    pub unlisted: Vec<SourcePattern>,
    pub render_single: bool,
    pub symlinks: bool,
}

impl Config {
    /// Validates the configuration and compiles every pattern in it.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Pattern`] for a source that does not compile,
    /// [`ConfigError::NotARedirect`] for a redirect with a non-3xx status and
    /// [`ConfigError::EmptyHeaderKey`] for a nameless custom header.
    pub fn compile(&self) -> Result<CompiledConfig, ConfigError> {
        let compile_rule = |option: &'static str, rule: &Rule| {
            rule.compile()
                .map_err(|source| ConfigError::Pattern { option, source })
        };

        let redirects: Vec<CompiledRule> = self
            .redirects
            .iter()
            .map(|redirect| {
                if let Some(status) = redirect.status.filter(|s| !s.is_redirection()) {
                    return Err(ConfigError::NotARedirect {
                        source_pattern: redirect.source.clone(),
                        status: status.as_u16(),
                    });
                }
                compile_rule("redirects", redirect)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let headers: Vec<CompiledHeaderRule> = self
            .headers
            .iter()
            .map(|header| {
                if header.headers.iter().any(|pair| pair.key.trim().is_empty()) {
                    return Err(ConfigError::EmptyHeaderKey {
                        source_pattern: header.source.clone(),
                    });
                }
                header
                    .compile()
                    .map_err(|source| ConfigError::Pattern {
                        option: "headers",
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CompiledConfig {
            clean_urls: CompiledToggle::compile(&self.clean_urls, "cleanUrls")?,
            trailing_slash: self.trailing_slash,
            rewrites: self
                .rewrites
                .iter()
                .map(|rewrite| compile_rule("rewrites", rewrite))
                .collect::<Result<Vec<_>, _>>()?,
            redirects,
            headers,
            directory_listing: CompiledToggle::compile(
                &self.directory_listing,
                "directoryListing",
            )?,
            unlisted: self
                .unlisted
                .iter()
                .map(|source| glob("unlisted", source))
                .collect::<Result<Vec<_>, _>>()?,
            render_single: self.render_single,
            symlinks: self.symlinks,
        })
    }
}

fn glob(option: &'static str, source: &str) -> Result<SourcePattern, ConfigError> {
    SourcePattern::new(source).map_err(|source| ConfigError::Pattern { option, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_enables_everything() {
        let compiled = Config::default().compile().unwrap();
        assert!(compiled.clean_urls.applies("/any"));
        assert!(compiled.directory_listing.applies("/any"));
        assert_eq!(compiled.trailing_slash, None);
        assert!(compiled.rewrites.is_empty() && compiled.unlisted.is_empty());
    }

    #[test]
    fn toggle_patterns_apply_per_path() {
        let config = Config {
            clean_urls: Toggle::Patterns(vec!["/blog/**".into()]),
            directory_listing: Toggle::Enabled(false),
            ..Config::default()
        };
        let compiled = config.compile().unwrap();
        assert!(compiled.clean_urls.applies("/blog/post"));
        assert!(compiled.clean_urls.applies("/blog"));
        assert!(!compiled.clean_urls.applies("/about"));
        assert!(!compiled.directory_listing.applies("/blog/post"));
    }

    #[test]
    fn rules_keep_order_and_fields() {
        let config = Config {
            redirects: vec![
                Rule::new("/old/:id", "/new/:id").with_status(StatusCode::Found),
                Rule::new("/gone", "/"),
            ],
            headers: vec![HeaderRule::new("**/*.js", [("Cache-Control", "no-cache")])],
            ..Config::default()
        };
        let compiled = config.compile().unwrap();

        assert_eq!(compiled.redirects[0].source.as_str(), "/old/:id");
        assert_eq!(compiled.redirects[0].status, Some(StatusCode::Found));
        assert_eq!(compiled.redirects[1].destination, "/");
        let captures = compiled.redirects[0].source.captures("/old/7").unwrap();
        assert_eq!(captures.get("id"), Some("7"));

        assert!(compiled.headers[0].source.is_match("/js/app.js"));
        assert_eq!(compiled.headers[0].headers[0].key, "Cache-Control");
    }

    #[test]
    fn compile_reports_the_option() {
        let config = Config {
            rewrites: vec![Rule::new("/[z-a]", "/x")],
            ..Config::default()
        };
        let err = config.compile().unwrap_err();
        assert!(matches!(err, ConfigError::Pattern { option: "rewrites", .. }));
    }
}
