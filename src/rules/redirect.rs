//! Redirect decisions: clean URLs, trailing slashes and explicit rules.

use std::borrow::Cow;

use crate::config::CompiledConfig;
use crate::http::StatusCode;

use super::to_target;

/// Suffixes removed from a path when clean URLs apply. `.html` is listed before
/// `.htm` so the longer suffix wins.
const CLEAN_SUFFIXES: [&str; 2] = [".html", ".htm"];
const INDEX_SUFFIX: &str = "/index";

/// A redirect the client should follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub target: String,
    pub status: StatusCode,
}

impl Redirect {
    fn permanent(target: impl Into<String>) -> Self {
        Self {
            target: ensure_slash_start(target.into()),
            status: StatusCode::MovedPermanently,
        }
    }
}

/// Decides whether `decoded_path` must be redirected.
///
/// `clean_url` is whether clean URLs apply to this path. Precedence, first
/// applicable wins:
///
/// 1. Strip a clean-URL suffix (`.html`, `.htm`, then `/index`) and remember it.
/// 2. With `trailing_slash` set, add or remove the trailing slash on the
///    (possibly stripped) path, and collapse runs of slashes. A collapse
///    overrides the add/remove target. A target here wins outright.
/// 3. Otherwise a stripped suffix redirects to the stripped path.
/// 4. Otherwise the first matching redirect rule.
///
/// All but rule-defined redirects use `301`. Steps 1 and 2 together produce a
/// single redirect, e.g. `/about.html` → `/about/`.
pub fn should_redirect(
    decoded_path: &str,
    config: &CompiledConfig,
    clean_url: bool,
) -> Option<Redirect> {
    let slashing = config.trailing_slash;
    if config.redirects.is_empty() && slashing.is_none() && !clean_url {
        return None;
    }

    let mut path = Cow::Borrowed(decoded_path);
    let mut cleaned = false;

    if clean_url {
        if let Some(stripped) = strip_clean_suffix(&path) {
            path = Cow::Owned(stripped);
            cleaned = true;
        }
    }

    if let Some(trailing_slash) = slashing {
        let trailed = path.ends_with('/');
        let (name, extension) = split_base(&path);

        let mut target = if !trailing_slash && trailed {
            Some(path[..path.len() - 1].to_owned())
        } else if trailing_slash && !trailed && extension.is_empty() && !name.starts_with('.') {
            Some(format!("{path}/"))
        } else {
            None
        };

        if path.contains("//") {
            target = Some(collapse_slashes(&path));
        }

        if let Some(target) = target.filter(|t| !t.is_empty()) {
            return Some(Redirect::permanent(target));
        }
    }

    if cleaned {
        return Some(Redirect::permanent(path.into_owned()));
    }

    config.redirects.iter().find_map(|rule| {
        to_target(&rule.source, &rule.destination, decoded_path).map(|target| Redirect {
            target,
            status: rule.status.unwrap_or(StatusCode::MovedPermanently),
        })
    })
}

fn strip_clean_suffix(path: &str) -> Option<String> {
    let mut stripped = path;
    if let Some(rest) = CLEAN_SUFFIXES.iter().find_map(|suffix| stripped.strip_suffix(suffix)) {
        stripped = rest;
    }
    if let Some(rest) = stripped.strip_suffix(INDEX_SUFFIX) {
        stripped = rest;
    }
    (stripped.len() != path.len()).then(|| stripped.to_owned())
}

// Last segment split into (name, extension), ignoring one trailing slash.
// A leading dot is part of the name, so `.env` has no extension.
fn split_base(path: &str) -> (&str, &str) {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    let base = trimmed.rsplit('/').next().unwrap_or(trimmed);
    match base.rfind('.') {
        Some(0) | None => (base, ""),
        Some(dot) => (&base[..dot], &base[dot..]),
    }
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if !(c == '/' && out.ends_with('/')) {
            out.push(c);
        }
    }
    out
}

fn ensure_slash_start(target: String) -> String {
    if target.starts_with('/') {
        target
    } else {
        format!("/{target}")
    }
}
