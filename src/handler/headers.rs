//! Response header composition for served files.

use std::time::SystemTime;

use chrono::{DateTime, Utc};
use mime_guess::mime;

use crate::config::CompiledHeaderRule;
use crate::http::Headers;

use super::files::Found;

/// Builds the headers for a file response.
///
/// Computed defaults come first: `Content-Type` (looked up from `relative`,
/// then from `rewritten`, then from the served file's name), `Content-Length`,
/// `Last-Modified` and an inline `Content-Disposition`. Every rule whose `source` matches `relative` is then
/// applied in order on top, so custom values win and a later rule overrides an
/// earlier one. A `null` custom value removes the header.
///
/// # Examples
///
/// ```
/// use rserve::config::HeaderRule;
/// use rserve::handler::compose_headers;
///
/// let rules = [HeaderRule::new("**/*.css", [("Cache-Control", "max-age=60")])
///     .compile()
///     .unwrap()];
/// let headers = compose_headers(&rules, "/css/site.css", None, None);
/// assert_eq!(headers.get("cache-control"), Some("max-age=60"));
/// assert_eq!(headers.get("content-type"), Some("text/css; charset=utf-8"));
/// ```
pub fn compose_headers(
    rules: &[CompiledHeaderRule],
    relative: &str,
    rewritten: Option<&str>,
    file: Option<&Found>,
) -> Headers {
    let mut custom: Vec<(&str, Option<&str>)> = Vec::new();
    for rule in rules
        .iter()
        .filter(|rule| rule.source.is_match(relative))
    {
        for pair in &rule.headers {
            let value = pair.value.as_deref();
            match custom
                .iter_mut()
                .find(|(key, _)| key.eq_ignore_ascii_case(&pair.key))
            {
                Some(slot) => slot.1 = value,
                None => custom.push((&pair.key, value)),
            }
        }
    }

    let mut headers = Headers::with_capacity(4 + custom.len());

    let served = file.map(|found| found.path.to_string_lossy());
    if let Some(content_type) = content_type(relative)
        .or_else(|| rewritten.and_then(content_type))
        .or_else(|| served.as_deref().and_then(content_type))
    {
        headers.insert("Content-Type", content_type);
    }

    if let Some(Found { path, metadata }) = file {
        headers.insert("Content-Length", metadata.len.to_string());
        if let Some(modified) = metadata.modified {
            headers.insert("Last-Modified", http_date(modified));
        }
        if let Some(base) = path.file_name() {
            headers.insert(
                "Content-Disposition",
                format!("inline; filename=\"{}\"", base.to_string_lossy().replace('"', "\\\"")),
            );
        }
    }

    for (key, value) in custom {
        match value {
            Some(value) => headers.set(key, value),
            None => {
                headers.remove(key);
            }
        }
    }

    headers
}

/// MIME type for `path`, with a UTF-8 charset for textual types.
pub fn content_type(path: &str) -> Option<String> {
    let mime = mime_guess::from_path(path).first()?;
    let textual = mime.type_() == mime::TEXT
        || matches!(mime.subtype().as_str(), "javascript" | "json" | "xml");
    Some(if textual {
        format!("{mime}; charset=utf-8")
    } else {
        mime.to_string()
    })
}

/// Formats a timestamp as an IMF-fixdate, e.g. `Mon, 01 Jan 2024 00:00:00 GMT`.
pub fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HeaderPair, HeaderRule};
    use crate::fs::{EntryKind, Metadata};
    use std::path::PathBuf;
    use std::time::Duration;

    fn compile<const N: usize>(rules: [HeaderRule; N]) -> Vec<CompiledHeaderRule> {
        rules.iter().map(|rule| rule.compile().unwrap()).collect()
    }

    fn file(len: u64) -> Found {
        file_at("/srv/index.html", len)
    }

    fn file_at(path: &str, len: u64) -> Found {
        Found {
            path: PathBuf::from(path),
            metadata: Metadata {
                kind: EntryKind::File,
                len,
                modified: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_067_200)),
            },
        }
    }

    #[test]
    fn later_rule_wins() {
        let rules = compile([
            HeaderRule::new("*.js", [("X", "1")]),
            HeaderRule::new("*.js", [("X", "2")]),
        ]);
        let headers = compose_headers(&rules, "/app.js", None, Some(&file(3)));
        assert_eq!(headers.get("X"), Some("2"));
        assert_eq!(headers.iter().filter(|(k, _)| *k == "X").count(), 1);
    }

    #[test]
    fn non_matching_rules_are_ignored() {
        let rules = compile([HeaderRule::new("*.css", [("X", "css")])]);
        let headers = compose_headers(&rules, "/app.js", None, None);
        assert!(!headers.contains("X"));
    }

    #[test]
    fn defaults_from_metadata() {
        let headers = compose_headers(&[], "/index.html", None, Some(&file(42)));
        assert_eq!(headers.get("Content-Type"), Some("text/html; charset=utf-8"));
        assert_eq!(headers.get("Content-Length"), Some("42"));
        assert_eq!(headers.get("Last-Modified"), Some("Mon, 01 Jan 2024 00:00:00 GMT"));
        assert_eq!(
            headers.get("Content-Disposition"),
            Some("inline; filename=\"index.html\"")
        );
    }

    #[test]
    fn custom_overrides_default() {
        let rules = compile([HeaderRule::new("**", [("Content-Type", "text/plain")])]);
        let headers = compose_headers(&rules, "/data/x.json", None, Some(&file(1)));
        assert_eq!(headers.get("content-type"), Some("text/plain"));
    }

    #[test]
    fn null_value_removes_header() {
        let rules = compile([HeaderRule {
            source: "**".into(),
            headers: vec![HeaderPair {
                key: "Last-Modified".into(),
                value: None,
            }],
        }]);
        let headers = compose_headers(&rules, "/a.txt", None, Some(&file(1)));
        assert!(!headers.contains("last-modified"));
    }

    #[test]
    fn content_type_falls_back_to_rewrite() {
        let headers = compose_headers(&[], "/blog/hello", Some("/posts/hello.html"), None);
        assert_eq!(headers.get("Content-Type"), Some("text/html; charset=utf-8"));
    }

    #[test]
    fn served_file_names_clean_urls() {
        let found = file_at("/srv/about.html", 5);
        let headers = compose_headers(&[], "/about", None, Some(&found));
        assert_eq!(headers.get("Content-Type"), Some("text/html; charset=utf-8"));
        assert_eq!(
            headers.get("Content-Disposition"),
            Some("inline; filename=\"about.html\"")
        );
    }

    #[test]
    fn binary_types_have_no_charset() {
        assert_eq!(content_type("/logo.png").as_deref(), Some("image/png"));
        assert_eq!(content_type("/no-extension"), None);
    }
}
