// src/model.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single visit to a URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub url: String,
    pub title: String,
    /// Precomputed domain, or the host extracted from the URL when the store has none
    pub domain: String,
    pub visit_time: DateTime<Utc>,
}

/// Search criteria applied across every read path.
///
/// Empty strings and `None` bounds mean "no filter".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    /// Substring matched against URL and title
    pub keyword: String,
    /// Exact match on the precomputed domain
    pub domain: String,
    /// Inclusive lower bound
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound; the whole calendar day is included
    pub to: Option<DateTime<Utc>>,
    pub ignore_domains: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainStats {
    pub domain: String,
    pub visit_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubdomainStats {
    pub subdomain: String,
    pub count: u64,
}

/// Visits grouped under a registrable base domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchicalDomainStats {
    pub base_domain: String,
    /// Sum of every entry in `subdomains`
    pub total_count: u64,
    /// More than one distinct hostname contributed to this bucket
    pub has_subdomains: bool,
    pub subdomains: Vec<SubdomainStats>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyStats {
    pub hour: u32,
    pub visit_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    /// YYYY-MM-DD
    pub date: String,
    pub visit_count: u64,
}

/// The complete results of a report run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub total_visits: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recent_visits: Vec<Visit>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain_stats: Vec<DomainStats>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hierarchical_stats: Vec<HierarchicalDomainStats>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hourly_stats: Vec<HourlyStats>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub daily_stats: Vec<DailyStats>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn json_round_trip_keeps_visits() {
        let result = AnalysisResult {
            total_visits: 100,
            recent_visits: vec![Visit {
                url: "https://example.com".into(),
                title: "Example".into(),
                domain: "example".into(),
                visit_time: Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap(),
            }],
            domain_stats: vec![DomainStats { domain: "example".into(), visit_count: 50 }],
            hourly_stats: vec![HourlyStats { hour: 10, visit_count: 20 }],
            daily_stats: vec![DailyStats { date: "2025-01-01".into(), visit_count: 30 }],
            ..Default::default()
        };

        let json = serde_json::to_string(&result).unwrap();
        let decoded: AnalysisResult = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, result);
        assert!(json.contains("\"visit_time\":\"2025-01-01T10:00:00Z\""));
    }

    #[test]
    fn empty_sections_are_omitted() {
        let result = AnalysisResult { total_visits: 50, ..Default::default() };
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"total_visits":50}"#);
    }
}
