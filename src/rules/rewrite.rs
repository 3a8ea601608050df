//! Rewrite chaining.

use crate::config::CompiledRule;
use crate::pattern::slasher;

use super::to_target;

/// Applies `rewrites` to `path` and returns the final target, or `None` if no
/// rule matched at all.
///
/// Rules are scanned in order. When one fires, it is removed from the working
/// set and the scan restarts on the rewritten path, so a chain like
/// `/a → /b → /c` resolves in one call while every rule fires at most once.
/// The loop therefore runs at most `rewrites.len()` times, even for a rule
/// whose destination matches its own source. The caller's slice is not
/// modified.
///
/// # Examples
///
/// ```
/// use rserve::config::Rule;
/// use rserve::rules::apply_rewrites;
///
/// let rules = [Rule::new("/a", "/b"), Rule::new("/b", "/c")]
///     .map(|rule| rule.compile().unwrap());
/// assert_eq!(apply_rewrites("/a", &rules).as_deref(), Some("/c"));
/// assert_eq!(apply_rewrites("/z", &rules), None);
/// ```
pub fn apply_rewrites(path: &str, rewrites: &[CompiledRule]) -> Option<String> {
    let mut remaining: Vec<&CompiledRule> = rewrites.iter().collect();
    let mut current: Option<String> = None;

    loop {
        let input = current.as_deref().unwrap_or(path);
        let hit = remaining.iter().enumerate().find_map(|(index, rule)| {
            to_target(&rule.source, &rule.destination, input).map(|target| (index, target))
        });

        match hit {
            Some((index, target)) => {
                remaining.remove(index);
                current = Some(slasher(&target));
            }
            None => return current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Rule;

    fn compile<const N: usize>(rules: [Rule; N]) -> Vec<CompiledRule> {
        rules.iter().map(|rule| rule.compile().unwrap()).collect()
    }

    #[test]
    fn empty_rules_mean_no_rewrite() {
        assert_eq!(apply_rewrites("/anything", &[]), None);
    }

    #[test]
    fn single_hop() {
        let rules = compile([Rule::new("/blog/:slug", "/posts/:slug.html")]);
        assert_eq!(
            apply_rewrites("/blog/hello", &rules).as_deref(),
            Some("/posts/hello.html")
        );
    }

    #[test]
    fn chains_across_rules_in_any_order() {
        let rules = compile([Rule::new("/b", "/c"), Rule::new("/a", "/b")]);
        assert_eq!(apply_rewrites("/a", &rules).as_deref(), Some("/c"));
    }

    #[test]
    fn self_matching_rule_fires_once() {
        let rules = compile([Rule::new("/**", "/index.html")]);
        assert_eq!(apply_rewrites("/x/y", &rules).as_deref(), Some("/index.html"));
    }

    #[test]
    fn cycle_terminates_after_each_rule_fired_once() {
        let rules = compile([Rule::new("/a", "/b"), Rule::new("/b", "/a")]);
        // /a -> /b (rule 0), /b -> /a (rule 1), no rules left.
        assert_eq!(apply_rewrites("/a", &rules).as_deref(), Some("/a"));
    }

    #[test]
    fn hop_count_is_bounded_by_rule_count() {
        let rules: Vec<CompiledRule> = (0..20)
            .map(|_| Rule::new("/:page", "/:page-x").compile().unwrap())
            .collect();
        let target = apply_rewrites("/p", &rules).unwrap();
        assert_eq!(target, format!("/p{}", "-x".repeat(20)));
    }

    #[test]
    fn compiled_rules_are_reused_across_requests() {
        let rules = compile([Rule::new("/a", "/b"), Rule::new("/b", "/c")]);
        for _ in 0..2 {
            assert_eq!(apply_rewrites("/a", &rules).as_deref(), Some("/c"));
        }
        assert_eq!(rules.len(), 2);
    }
}
