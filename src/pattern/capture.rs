//! Capture dialect: path patterns with placeholders.
//!
//! | Token            | Meaning                                        |
//! |------------------|------------------------------------------------|
//! | `:name`          | one segment, captured as `name`                |
//! | `:name(\d+)`     | custom sub-expression, captured as `name`      |
//! | `( ... )`        | unnamed group, captured as `"0"`, `"1"`, ...   |
//! | `?` after token  | the token (and its leading `/`) is optional    |
//! | `*` / `+`        | zero-or-more / one-or-more `/`-joined repeats  |
//! | `\x`             | literal `x`                                    |
//!
//! Everything else is literal. The compiled expression is anchored, accepts an
//! optional trailing slash and is case-sensitive.

use regex::Regex;

use super::{MatchResult, PatternError};

/// A compiled capture pattern.
///
/// # Examples
///
/// ```
/// use rserve::pattern::CapturePattern;
///
/// let pattern = CapturePattern::compile("/users/:id(\\d+)/:tab?").unwrap();
/// let result = pattern.captures("/users/42").unwrap();
/// assert_eq!(result.get("id"), Some("42"));
/// assert_eq!(result.get("tab"), Some(""));
/// assert!(pattern.captures("/users/abc").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct CapturePattern {
    regex: Regex,
    keys: Vec<String>,
}

// Default sub-expression for a named placeholder: one non-empty segment.
const SEGMENT: &str = "[^/]+?";

impl CapturePattern {
    /// Compiles `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if a custom sub-expression is not a valid regex
    /// or a group is left unclosed.
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        let chars: Vec<char> = pattern.chars().collect();
        let mut expression = String::from("^");
        let mut literal = String::new();
        let mut keys: Vec<String> = Vec::new();
        let mut unnamed = 0usize;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            let token = match c {
                '\\' if i + 1 < chars.len() => {
                    literal.push(chars[i + 1]);
                    i += 2;
                    continue;
                }
                ':' if chars.get(i + 1).is_some_and(|n| is_word(*n)) => {
                    let start = i + 1;
                    i = start;
                    while chars.get(i).is_some_and(|n| is_word(*n)) {
                        i += 1;
                    }
                    let name: String = chars[start..i].iter().collect();
                    let sub = if chars.get(i) == Some(&'(') {
                        let (sub, next) = group(&chars, i, pattern)?;
                        i = next;
                        sub
                    } else {
                        SEGMENT.to_owned()
                    };
                    (name, sub)
                }
                '(' => {
                    let (sub, next) = group(&chars, i, pattern)?;
                    i = next;
                    let name = unnamed.to_string();
                    unnamed += 1;
                    (name, sub)
                }
                other => {
                    literal.push(other);
                    i += 1;
                    continue;
                }
            };

            let modifier = match chars.get(i) {
                Some(m @ ('?' | '*' | '+')) => {
                    i += 1;
                    Some(*m)
                }
                _ => None,
            };

            let prefix = if literal.ends_with('/') {
                literal.pop();
                "/"
            } else {
                ""
            };
            expression.push_str(&regex::escape(&literal));
            literal.clear();

            let (name, sub) = token;
            let group_name = format!("k{}", keys.len());
            let repeated = format!("(?:{sub})(?:/(?:{sub}))*");
            let fragment = match modifier {
                None => format!("{prefix}(?P<{group_name}>{sub})"),
                Some('?') => format!("(?:{prefix}(?P<{group_name}>{sub}))?"),
                Some('*') => format!("(?:{prefix}(?P<{group_name}>{repeated}))?"),
                Some(_) => format!("{prefix}(?P<{group_name}>{repeated})"),
            };
            expression.push_str(&fragment);
            keys.push(name);
        }

        expression.push_str(&regex::escape(&literal));
        if !expression.ends_with('/') {
            expression.push_str("/?");
        }
        expression.push('$');

        let regex = Regex::new(&expression).map_err(|source| PatternError::Capture {
            pattern: pattern.to_owned(),
            source,
        })?;

        Ok(Self { regex, keys })
    }

    /// Matches `path` exactly and returns the captured values.
    pub fn captures(&self, path: &str) -> Option<MatchResult> {
        let caps = self.regex.captures(path)?;
        let values = (0..self.keys.len())
            .map(|index| {
                caps.name(&format!("k{index}"))
                    .map_or_else(String::new, |m| m.as_str().to_owned())
            })
            .collect();
        Some(MatchResult::new(self.keys.clone(), values))
    }

    /// Placeholder names in pattern order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

// Reads a balanced `( ... )` starting at `open`; returns its contents and the
// index just past the closing paren.
fn group(chars: &[char], open: usize, pattern: &str) -> Result<(String, usize), PatternError> {
    let mut depth = 0usize;
    let mut i = open;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((chars[open + 1..i].iter().collect(), i + 1));
                }
            }
            _ => {}
        }
        i += 1;
    }

    // Let the regex parser produce the error message for the unclosed group.
    let source = match Regex::new(&chars[open..].iter().collect::<String>()) {
        Err(e) => e,
        Ok(_) => regex::Error::Syntax(format!("unclosed group in `{pattern}`")),
    };
    Err(PatternError::Capture {
        pattern: pattern.to_owned(),
        source,
    })
}
