//! Glob dialect, built on [`globset`].
//!
//! Supported syntax: `*`, `**` as a whole segment, `?`, `[...]` and `[!...]`
//! classes, `{a,b}` alternation, `\` escapes and a leading `!` negation.
//! Wildcards never match a leading `.` in a path segment unless a pattern
//! segment itself starts with a literal `.`.

use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

use super::PatternError;

/// A compiled glob pattern.
///
/// # Examples
///
/// ```
/// use rserve::pattern::Glob;
///
/// let glob = Glob::new("/assets/**/*.{js,css}").unwrap();
/// assert!(glob.is_match("/assets/app.js"));
/// assert!(glob.is_match("/assets/v1/site.css"));
/// assert!(!glob.is_match("/assets/.cache/site.css"));
/// ```
#[derive(Debug, Clone)]
pub struct Glob {
    set: GlobSet,
    // Pattern segments spelled with a leading dot; only these may match a
    // dot-led path segment.
    dot_segments: Vec<GlobMatcher>,
    negated: bool,
}

impl Glob {
    /// Compiles `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Glob`] for syntax `globset` rejects, e.g. a
    /// reversed class range `[z-a]` or an unclosed class.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let mut body = pattern;
        let mut negated = false;
        while let Some(rest) = body.strip_prefix('!') {
            negated = !negated;
            body = rest;
        }

        let error = |source| PatternError::Glob {
            pattern: pattern.to_owned(),
            source,
        };

        let mut builder = GlobSetBuilder::new();
        builder.add(build(body).map_err(error)?);
        // `/docs/**` also matches `/docs` itself.
        if let Some(parent) = body.strip_suffix("/**").filter(|p| !p.is_empty()) {
            builder.add(build(parent).map_err(error)?);
        }
        let set = builder.build().map_err(error)?;

        let dot_segments = body
            .split('/')
            .filter(|segment| segment.starts_with('.'))
            .map(|segment| build(segment).map(|glob| glob.compile_matcher()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(error)?;

        Ok(Self {
            set,
            dot_segments,
            negated,
        })
    }

    /// Returns `true` if `path` matches (or, for a negated glob, does not match).
    pub fn is_match(&self, path: &str) -> bool {
        let hit = self.set.is_match(path)
            && path
                .split('/')
                .filter(|segment| segment.starts_with('.'))
                .all(|segment| self.dot_segments.iter().any(|m| m.is_match(segment)));
        hit != self.negated
    }
}

fn build(pattern: &str) -> Result<globset::Glob, globset::Error> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glob(pattern: &str) -> Glob {
        Glob::new(pattern).unwrap()
    }

    #[test]
    fn star_stays_in_segment() {
        let g = glob("/*.html");
        assert!(g.is_match("/index.html"));
        assert!(!g.is_match("/docs/index.html"));
    }

    #[test]
    fn globstar_spans_segments() {
        let g = glob("/docs/**");
        assert!(g.is_match("/docs"));
        assert!(g.is_match("/docs/a/b/c.md"));
        assert!(!g.is_match("/doc"));

        let g = glob("/**/*.md");
        assert!(g.is_match("/readme.md"));
        assert!(g.is_match("/a/b/readme.md"));
    }

    #[test]
    fn wildcards_skip_dotfiles() {
        assert!(!glob("/*").is_match("/.env"));
        assert!(glob("/.*").is_match("/.env"));
        assert!(glob("/.git").is_match("/.git"));
        assert!(!glob("/**/config").is_match("/.git/config"));
        assert!(glob("/**/.well-known/*").is_match("/.well-known/security.txt"));
    }

    #[test]
    fn question_mark_and_classes() {
        assert!(glob("/file?.txt").is_match("/file1.txt"));
        assert!(!glob("/file?.txt").is_match("/file10.txt"));
        assert!(glob("/[abc].js").is_match("/b.js"));
        assert!(!glob("/[!abc].js").is_match("/b.js"));
        assert!(glob("/[!abc].js").is_match("/d.js"));
        assert!(glob("/v[0-9]").is_match("/v7"));
    }

    #[test]
    fn braces_alternate() {
        let g = glob("/a.{js,css}");
        assert!(g.is_match("/a.js"));
        assert!(g.is_match("/a.css"));
        assert!(!g.is_match("/a.md"));
    }

    #[test]
    fn negation() {
        let g = glob("!/*.md");
        assert!(g.is_match("/index.html"));
        assert!(!g.is_match("/readme.md"));
    }

    #[test]
    fn escapes_are_literal() {
        assert!(glob(r"/\*.txt").is_match("/*.txt"));
        assert!(!glob(r"/\*.txt").is_match("/a.txt"));
        assert!(glob("/a+b(1).txt").is_match("/a+b(1).txt"));
    }

    #[test]
    fn invalid_syntax_is_rejected() {
        assert!(matches!(Glob::new("/[abc"), Err(PatternError::Glob { .. })));
        assert!(Glob::new("/[z-a]").is_err());
    }
}
