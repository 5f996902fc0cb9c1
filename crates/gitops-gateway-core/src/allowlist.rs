//! Repository allowlist policy.

/// Decides which repositories may trigger command execution.
pub trait RepoAllowlistChecker: Send + Sync {
    /// Whether `repo_full_name` (`owner/name`) on `vcs_hostname` is allowed.
    fn is_allowlisted(&self, repo_full_name: &str, vcs_hostname: &str) -> bool;
}

/// Allowlist built from comma-separated rules such as
/// `github.com/acme/*,ghe.example.com/team/infra`.
///
/// Rules are matched case-insensitively against `{hostname}/{owner}/{name}`.
/// A `*` matches any suffix, so it is only meaningful at the end of a rule;
/// `*` on its own allows everything.
///
/// # Examples
///
/// ```rust
/// use gitops_gateway_core::allowlist::{PatternAllowlist, RepoAllowlistChecker};
///
/// let allowlist = PatternAllowlist::new("github.com/acme/*").unwrap();
/// assert!(allowlist.is_allowlisted("acme/infra", "github.com"));
/// assert!(!allowlist.is_allowlisted("other/infra", "github.com"));
/// ```
#[derive(Debug, Clone)]
pub struct PatternAllowlist {
    rules: Vec<String>,
}

/// The allowlist could not be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllowlistError {
    #[error("allowlist contains no rules")]
    Empty,

    #[error("allowlist rule {rule:?} must not contain a scheme")]
    SchemeInRule { rule: String },
}

const WILDCARD: char = '*';

impl PatternAllowlist {
    /// Parse a comma-separated rule list.
    ///
    /// # Errors
    ///
    /// [`AllowlistError::Empty`] if no rules remain after trimming, and
    /// [`AllowlistError::SchemeInRule`] for rules written as URLs.
    pub fn new(rules: &str) -> Result<Self, AllowlistError> {
        let rules: Vec<String> = rules
            .split(',')
            .map(|rule| rule.trim().to_lowercase())
            .filter(|rule| !rule.is_empty())
            .collect();

        if rules.is_empty() {
            return Err(AllowlistError::Empty);
        }
        if let Some(rule) = rules.iter().find(|rule| rule.contains("://")) {
            return Err(AllowlistError::SchemeInRule { rule: rule.clone() });
        }

        Ok(Self { rules })
    }

    fn matches_rule(rule: &str, candidate: &str) -> bool {
        match rule.find(WILDCARD) {
            None => candidate == rule,
            Some(idx) => candidate.len() >= idx && candidate.get(..idx) == rule.get(..idx),
        }
    }
}

impl RepoAllowlistChecker for PatternAllowlist {
    fn is_allowlisted(&self, repo_full_name: &str, vcs_hostname: &str) -> bool {
        let candidate = format!("{vcs_hostname}/{repo_full_name}").to_lowercase();
        self.rules
            .iter()
            .any(|rule| Self::matches_rule(rule, &candidate))
    }
}

#[cfg(test)]
#[path = "allowlist_tests.rs"]
mod tests;
