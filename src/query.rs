// src/query.rs

use crate::ignore::IgnoreRule;
use crate::model::SearchFilter;
use crate::timestamp;
use chrono::{DateTime, Duration, Utc};
use rusqlite::types::Value;

/// Composes filter clauses and their bound arguments on top of a base query.
///
/// The base query must end in an open `WHERE` (the read paths use
/// `WHERE 1=1`) so every filter can be appended as ` AND ...`. Empty inputs
/// never touch the query text or the argument list. Ordering and paging
/// clauses have to come after all filters.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    base_query: String,
    clauses: String,
    args: Vec<Value>,
}

impl QueryBuilder {
    pub fn new(base_query: impl Into<String>) -> Self {
        Self {
            base_query: base_query.into(),
            clauses: String::new(),
            args: Vec::new(),
        }
    }

    /// Substring match over URL and title.
    pub fn with_keyword(mut self, keyword: &str) -> Self {
        if !keyword.is_empty() {
            self.clauses.push_str(" AND (hi.url LIKE ? OR hv.title LIKE ?)");
            let pattern = format!("%{keyword}%");
            self.args.push(Value::Text(pattern.clone()));
            self.args.push(Value::Text(pattern));
        }
        self
    }

    pub fn with_domain(mut self, domain: &str) -> Self {
        if !domain.is_empty() {
            self.clauses.push_str(" AND hi.domain_expansion = ?");
            self.args.push(Value::Text(domain.to_string()));
        }
        self
    }

    /// Excludes every row matched by a non-empty pattern, four clauses per pattern.
    pub fn with_ignore_domains<S: AsRef<str>>(mut self, domains: &[S]) -> Self {
        for pattern in domains.iter().map(AsRef::as_ref).filter(|d| !d.is_empty()) {
            for rule in IgnoreRule::SQL_ORDER {
                self.clauses.push_str(rule.sql_clause());
                self.args.push(Value::Text(rule.sql_arg(pattern)));
            }
        }
        self
    }

    /// Restricts visit time to `[from, to]`; `to` covers through 23:59:59 of its day.
    pub fn with_date_range(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        if let Some(from) = from {
            self.clauses.push_str(" AND hv.visit_time >= ?");
            self.args.push(Value::Real(timestamp::encode(from)));
        }
        if let Some(to) = to {
            let end_of_day = to + Duration::hours(24) - Duration::seconds(1);
            self.clauses.push_str(" AND hv.visit_time <= ?");
            self.args.push(Value::Real(timestamp::encode(end_of_day)));
        }
        self
    }

    /// Applies keyword, domain, date range and ignore list, in that order.
    pub fn with_filter(self, filter: &SearchFilter) -> Self {
        self.with_keyword(&filter.keyword)
            .with_domain(&filter.domain)
            .with_date_range(filter.from, filter.to)
            .with_ignore_domains(&filter.ignore_domains)
    }

    /// `column` is written verbatim; only pass known column names.
    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.clauses.push_str(" ORDER BY ");
        self.clauses.push_str(column);
        self.clauses.push_str(" DESC");
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.clauses.push_str(" LIMIT ?");
        self.args.push(Value::Integer(limit));
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.clauses.push_str(" OFFSET ?");
        self.args.push(Value::Integer(offset));
        self
    }

    /// Final query text and arguments. Does not alter the builder.
    pub fn build(&self) -> (String, Vec<Value>) {
        (format!("{}{}", self.base_query, self.clauses), self.args.clone())
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }
}
