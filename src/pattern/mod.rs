//! Source-pattern matching shared by every rule type.
//!
//! A pattern is matched two ways:
//!
//! | Dialect  | Used for                                  | Example            |
//! |----------|-------------------------------------------|--------------------|
//! | glob     | boolean applicability (headers, listing)  | `/assets/**/*.js`  |
//! | capture  | rewrites and redirects with placeholders  | `/blog/:slug`      |
//!
//! Both the pattern and the candidate path are normalized to a leading-slash,
//! forward-slash form before comparison, and matching is case-sensitive.
//! A [`SourcePattern`] is compiled once per configured rule and tries the
//! capture dialect first (when it has one), falling back to the glob dialect,
//! in which case the match carries no captures.

use thiserror::Error;

pub mod capture;
pub mod glob;

pub use capture::CapturePattern;
pub use glob::Glob;

/// A pattern string that cannot be compiled.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid glob `{pattern}`: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("invalid capture pattern `{pattern}`: {source}")]
    Capture {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl PatternError {
    /// The offending pattern, as compiled.
    pub fn pattern(&self) -> &str {
        match self {
            Self::Glob { pattern, .. } | Self::Capture { pattern, .. } => pattern,
        }
    }
}

/// Captures produced by a successful match, in pattern order.
///
/// Named placeholders keep their name; unnamed groups (including the one a bare
/// `*` turns into) are numbered from `"0"`. A group that did not participate in
/// the match captures the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    names: Vec<String>,
    values: Vec<String>,
}

impl MatchResult {
    pub(crate) fn new(names: Vec<String>, values: Vec<String>) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self { names, values }
    }

    /// Placeholder names in the order they appear in the pattern.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Captured values, positionally aligned with [`names`](Self::names).
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Returns the value captured for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|index| self.values[index].as_str())
    }

    /// Returns `true` if the match carries no captures (glob-only match).
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Normalizes a path-like value to a leading-slash POSIX form.
///
/// Empty and `.` segments are dropped, `..` pops a segment (never above the
/// root), and a trailing slash is preserved.
///
/// ```
/// use rserve::pattern::normalize;
///
/// assert_eq!(normalize("a//b/./c/"), "/a/b/c/");
/// assert_eq!(normalize("/a/../../b"), "/b");
/// assert_eq!(normalize(""), "/");
/// ```
pub fn normalize(value: &str) -> String {
    let trailing = value.ends_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in value.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    let mut out = String::with_capacity(value.len() + 1);
    out.push('/');
    out.push_str(&parts.join("/"));
    if trailing && !parts.is_empty() {
        out.push('/');
    }
    out
}

/// Like [`normalize`], but without a trailing slash (except for the root).
pub fn resolve(value: &str) -> String {
    let mut out = normalize(value);
    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

/// Normalizes a pattern, keeping a leading `!` negation marker in front.
pub fn slasher(value: &str) -> String {
    match value.strip_prefix('!') {
        Some(rest) => format!("!{}", normalize(rest)),
        None => normalize(value),
    }
}

/// A rule `source` compiled for repeated matching.
///
/// # Examples
///
/// ```
/// use rserve::pattern::SourcePattern;
///
/// let pattern = SourcePattern::with_segments("/blog/:slug").unwrap();
/// let result = pattern.captures("/blog/hello/").unwrap();
/// assert_eq!(result.get("slug"), Some("hello"));
/// assert!(pattern.captures("/about").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct SourcePattern {
    source: String,
    glob: Glob,
    capture: Option<CapturePattern>,
}

impl SourcePattern {
    /// Compiles `source` in the glob dialect only.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if the glob does not compile.
    pub fn new(source: &str) -> Result<Self, PatternError> {
        Ok(Self {
            source: source.to_owned(),
            glob: Glob::new(&slasher(source))?,
            capture: None,
        })
    }

    /// Compiles `source` in both dialects. The first `*` becomes an unnamed
    /// capture group. A source the capture dialect rejects still matches as
    /// a glob.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if the glob does not compile.
    pub fn with_segments(source: &str) -> Result<Self, PatternError> {
        let mut pattern = Self::new(source)?;
        let expression = slasher(source).replacen('*', "(.*)", 1);
        match CapturePattern::compile(&expression) {
            Ok(capture) => pattern.capture = Some(capture),
            Err(e) => tracing::debug!(error = %e, "capture pattern rejected, using glob only"),
        }
        Ok(pattern)
    }

    /// The source as written in the configuration.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Matches `path`, returning captures from the capture dialect or an
    /// empty [`MatchResult`] for a glob-only match.
    pub fn captures(&self, path: &str) -> Option<MatchResult> {
        let resolved = resolve(path);
        if let Some(result) = self.capture.as_ref().and_then(|c| c.captures(&resolved)) {
            return Some(result);
        }
        self.glob
            .is_match(&resolved)
            .then(MatchResult::default)
    }

    /// Boolean glob match, ignoring the capture dialect.
    pub fn is_match(&self, path: &str) -> bool {
        self.glob.is_match(&resolve(path))
    }
}

/// Compiles `source` and matches `path` against it once.
///
/// With `allow_segments`, the capture dialect is tried first. Sources that
/// cannot be compiled never match. Anything matched per request should hold
/// a [`SourcePattern`] instead.
pub fn source_matches(source: &str, path: &str, allow_segments: bool) -> Option<MatchResult> {
    let compiled = if allow_segments {
        SourcePattern::with_segments(source)
    } else {
        SourcePattern::new(source)
    };
    compiled.ok()?.captures(path)
}

/// Checks that `source` compiles in the glob dialect.
///
/// # Errors
///
/// Returns [`PatternError`] describing the offending pattern.
pub fn validate(source: &str) -> Result<(), PatternError> {
    SourcePattern::new(source).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_forms() {
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("index.html"), "/index.html");
        assert_eq!(normalize("/a/b/../c"), "/a/c");
        assert_eq!(normalize("//a///b//"), "/a/b/");
    }

    #[test]
    fn resolve_drops_trailing_slash() {
        assert_eq!(resolve("/docs/"), "/docs");
        assert_eq!(resolve("/"), "/");
    }

    #[test]
    fn slasher_keeps_negation() {
        assert_eq!(slasher("!*.md"), "!/*.md");
        assert_eq!(slasher("*.md"), "/*.md");
    }

    #[test]
    fn glob_match_without_captures() {
        let result = source_matches("*.js", "/app.js", false).unwrap();
        assert!(result.is_empty());
        assert!(source_matches("*.js", "/lib/app.js", false).is_none());
    }

    #[test]
    fn named_capture() {
        let result = source_matches("/blog/:slug", "/blog/hello", true).unwrap();
        assert_eq!(result.names(), ["slug".to_owned()]);
        assert_eq!(result.get("slug"), Some("hello"));
    }

    #[test]
    fn star_becomes_capture_group() {
        let result = source_matches("/docs/*", "/docs/a/b.html", true).unwrap();
        assert_eq!(result.get("0"), Some("a/b.html"));
    }

    #[test]
    fn glob_fallback_when_capture_fails() {
        // `**` is not meaningful to the capture dialect but still matches as a glob.
        let result = source_matches("/assets/**/*.css", "/assets/a/b/site.css", true).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn case_sensitive() {
        assert!(source_matches("/About", "/about", true).is_none());
        assert!(!SourcePattern::new("/About").unwrap().is_match("/about"));
    }

    #[test]
    fn candidate_path_is_resolved() {
        assert!(SourcePattern::new("/a/b").unwrap().is_match("/a/./x/../b/"));
    }

    #[test]
    fn compiled_source_is_reusable() {
        let pattern = SourcePattern::with_segments("/docs/*").unwrap();
        assert_eq!(pattern.as_str(), "/docs/*");
        for page in ["a", "b/c"] {
            let result = pattern.captures(&format!("/docs/{page}")).unwrap();
            assert_eq!(result.get("0"), Some(page));
        }
        assert!(pattern.is_match("/docs/a"));
        assert!(!pattern.is_match("/docs/b/c"));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = validate("[z-a]").unwrap_err();
        assert_eq!(err.pattern(), "/[z-a]");
        assert!(source_matches("[z-a]", "/a", false).is_none());
    }
}
