// src/ignore.rs

//! Ignore-list matching.
//!
//! A pattern excludes a domain through four rules. The same table drives the
//! in-memory check used by the domain aggregations and the SQL exclusion
//! clauses emitted by the query builder, so both read paths agree on what a
//! pattern means.

/// One way an ignore pattern can match a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreRule {
    /// `google.com` == `google.com`
    Exact,
    /// `youtube` matches `youtube.com`
    LeadingLabel,
    /// `google` matches `accounts.google`
    TrailingSuffix,
    /// `google` matches `accounts.google.com`
    EmbeddedLabel,
}

impl IgnoreRule {
    /// Order in which the SQL exclusion clauses are emitted per pattern.
    pub const SQL_ORDER: [IgnoreRule; 4] = [
        IgnoreRule::Exact,
        IgnoreRule::TrailingSuffix,
        IgnoreRule::LeadingLabel,
        IgnoreRule::EmbeddedLabel,
    ];

    pub fn matches(self, candidate: &str, pattern: &str) -> bool {
        match self {
            IgnoreRule::Exact => candidate == pattern,
            IgnoreRule::LeadingLabel => candidate
                .strip_prefix(pattern)
                .is_some_and(|rest| rest.starts_with('.')),
            IgnoreRule::TrailingSuffix => candidate
                .strip_suffix(pattern)
                .is_some_and(|rest| rest.ends_with('.')),
            IgnoreRule::EmbeddedLabel => candidate.contains(&format!(".{pattern}.")),
        }
    }

    /// SQL fragment excluding rows this rule matches.
    ///
    /// Exact and suffix rules test the precomputed domain column, coalesced so
    /// a NULL compares as an empty string instead of unknown. The label rules
    /// fall back to the URL for rows whose domain column is unset.
    pub fn sql_clause(self) -> &'static str {
        match self {
            IgnoreRule::Exact => " AND COALESCE(hi.domain_expansion, '') != ?",
            IgnoreRule::TrailingSuffix => " AND COALESCE(hi.domain_expansion, '') NOT LIKE ?",
            IgnoreRule::LeadingLabel => " AND hi.url NOT LIKE ?",
            IgnoreRule::EmbeddedLabel => " AND hi.url NOT LIKE ?",
        }
    }

    /// Bound argument for [`IgnoreRule::sql_clause`].
    pub fn sql_arg(self, pattern: &str) -> String {
        match self {
            IgnoreRule::Exact => pattern.to_string(),
            IgnoreRule::TrailingSuffix => format!("%.{pattern}"),
            IgnoreRule::LeadingLabel => format!("%://{pattern}.%"),
            IgnoreRule::EmbeddedLabel => format!("%://%.{pattern}.%"),
        }
    }
}

/// True when `pattern` matches `candidate` under any rule.
pub fn matches(candidate: &str, pattern: &str) -> bool {
    IgnoreRule::SQL_ORDER
        .iter()
        .any(|rule| rule.matches(candidate, pattern))
}

/// True when any non-empty pattern matches `domain`.
pub fn should_ignore<S: AsRef<str>>(domain: &str, patterns: &[S]) -> bool {
    patterns
        .iter()
        .map(AsRef::as_ref)
        .filter(|p| !p.is_empty())
        .any(|p| matches(domain, p))
}
