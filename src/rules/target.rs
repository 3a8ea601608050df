//! Destination templates.

use std::collections::HashMap;

use crate::pattern::{SourcePattern, slasher};

/// Resolves `destination` for `path` when `path` matches `source`.
///
/// Captured values replace `:name` placeholders in the destination. A
/// destination with a URL scheme (`https://...`) is used verbatim apart from
/// substitution; anything else is normalized like a path. Placeholders with no
/// capture of that name are left as written.
///
/// Returns `None` if `source` does not match.
///
/// # Examples
///
/// ```
/// use rserve::pattern::SourcePattern;
/// use rserve::rules::to_target;
///
/// let source = SourcePattern::with_segments("/blog/:slug").unwrap();
/// assert_eq!(
///     to_target(&source, "/posts/:slug.html", "/blog/hello").as_deref(),
///     Some("/posts/hello.html"),
/// );
/// assert_eq!(to_target(&source, "/posts/:slug.html", "/about"), None);
/// ```
pub fn to_target(source: &SourcePattern, destination: &str, path: &str) -> Option<String> {
    let result = source.captures(path)?;
    let props: HashMap<&str, &str> = result
        .names()
        .iter()
        .map(String::as_str)
        .zip(result.values().iter().map(String::as_str))
        .collect();

    let normalized = if has_protocol(destination) {
        destination.to_owned()
    } else {
        slasher(destination)
    };

    Some(substitute(&normalized, &props))
}

/// Returns `true` if `value` starts with a URL scheme such as `https:`.
pub(crate) fn has_protocol(value: &str) -> bool {
    let Some((scheme, _)) = value.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn substitute(template: &str, props: &HashMap<&str, &str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(':') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let end = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let name = &after[..end];

        match props.get(name) {
            Some(value) if !name.is_empty() => out.push_str(value),
            _ => {
                out.push(':');
                out.push_str(name);
            }
        }
        rest = &after[end..];
    }

    out.push_str(rest);
    out
}
