// src/analyzer.rs

use crate::domain::{extract_base_domain, extract_host, group_hierarchical};
use crate::error::{store_err, Result};
use crate::ignore::should_ignore;
use crate::model::*;
use crate::query::QueryBuilder;
use crate::timestamp;
use chrono::{DateTime, Duration, Timelike, Utc};
use rusqlite::{params_from_iter, Connection};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Label used for items whose URL carries no host
pub const UNKNOWN_DOMAIN: &str = "(unknown)";

const HISTORY_BASE_QUERY: &str = "
    SELECT
        hi.url,
        COALESCE(hv.title, '') AS title,
        COALESCE(hi.domain_expansion, '') AS domain,
        hv.visit_time
    FROM history_visits hv
    JOIN history_items hi ON hv.history_item = hi.id
    WHERE 1=1";

const VISIT_TIME_BASE_QUERY: &str = "
    SELECT hv.visit_time FROM history_visits hv
    JOIN history_items hi ON hv.history_item = hi.id
    WHERE 1=1";

const VISIT_COUNT_BASE_QUERY: &str = "
    SELECT COUNT(*) FROM history_visits hv
    JOIN history_items hi ON hv.history_item = hi.id
    WHERE 1=1";

const ITEM_COUNTS_QUERY: &str = "SELECT hi.url, hi.visit_count FROM history_items hi";

/// SQLite integers are signed; larger counts saturate.
fn to_sql_int(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Most recent visits matching `filter`, newest first.
pub fn recent_visits(conn: &Connection, limit: usize, filter: &SearchFilter) -> Result<Vec<Visit>> {
    let qb = QueryBuilder::new(HISTORY_BASE_QUERY)
        .with_filter(filter)
        .order_by_desc("hv.visit_time")
        .limit(to_sql_int(limit));
    fetch_visits(conn, &qb)
}

/// Like [`recent_visits`], skipping the first `offset` rows.
pub fn recent_visits_page(
    conn: &Connection,
    limit: usize,
    offset: usize,
    filter: &SearchFilter,
) -> Result<Vec<Visit>> {
    let qb = QueryBuilder::new(HISTORY_BASE_QUERY)
        .with_filter(filter)
        .order_by_desc("hv.visit_time")
        .limit(to_sql_int(limit))
        .offset(to_sql_int(offset));
    fetch_visits(conn, &qb)
}

fn fetch_visits(conn: &Connection, qb: &QueryBuilder) -> Result<Vec<Visit>> {
    let (query, args) = qb.build();
    debug!(%query, args = args.len(), "fetching visits");

    let mut stmt = conn.prepare(&query).map_err(store_err("recent visits"))?;
    let rows = stmt
        .query_map(params_from_iter(args.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })
        .map_err(store_err("recent visits"))?;

    let mut visits = Vec::new();
    for row in rows {
        let (url, title, mut domain, visit_time) = row.map_err(store_err("recent visits"))?;
        if domain.is_empty() {
            domain = extract_host(&url).to_string();
        }
        visits.push(Visit {
            url,
            title,
            domain,
            visit_time: timestamp::decode(visit_time),
        });
    }
    Ok(visits)
}

/// Per-item `(host, visit_count)` pairs, hosts taken from the URL.
fn fetch_item_counts(conn: &Connection, what: &'static str) -> Result<Vec<(String, u64)>> {
    debug!(query = ITEM_COUNTS_QUERY, "fetching item counts");
    let mut stmt = conn.prepare(ITEM_COUNTS_QUERY).map_err(store_err(what))?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<i64>>(1)?)))
        .map_err(store_err(what))?;

    let mut items = Vec::new();
    for row in rows {
        let (url, count) = row.map_err(store_err(what))?;
        let host = match extract_host(&url) {
            "" => UNKNOWN_DOMAIN.to_string(),
            host => host.to_string(),
        };
        items.push((host, count.unwrap_or(0).max(0) as u64));
    }
    Ok(items)
}

/// Visit counts per host, largest first, excluding ignored hosts.
///
/// Counts come from each item's own visit counter; only the ignore list of
/// `filter` applies. A `limit` of 0 keeps every domain.
pub fn domain_stats(conn: &Connection, limit: usize, filter: &SearchFilter) -> Result<Vec<DomainStats>> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for (host, count) in fetch_item_counts(conn, "domain stats")? {
        if should_ignore(&host, &filter.ignore_domains) {
            continue;
        }
        *counts.entry(host).or_default() += count;
    }

    let mut stats: Vec<DomainStats> = counts
        .into_iter()
        .map(|(domain, visit_count)| DomainStats { domain, visit_count })
        .collect();
    stats.sort_by(|a, b| b.visit_count.cmp(&a.visit_count).then_with(|| a.domain.cmp(&b.domain)));
    if limit > 0 {
        stats.truncate(limit);
    }
    Ok(stats)
}

/// Visit counts grouped by base domain.
///
/// A host is dropped when the ignore list matches either the host itself or
/// its base domain. `domain_limit` caps the number of buckets (0 keeps all);
/// `path_limit` caps the subdomains listed per bucket without changing its total.
pub fn hierarchical_domain_stats(
    conn: &Connection,
    domain_limit: usize,
    path_limit: Option<usize>,
    filter: &SearchFilter,
) -> Result<Vec<HierarchicalDomainStats>> {
    let items = fetch_item_counts(conn, "hierarchical domain stats")?;
    let kept = items.iter().filter(|(host, _)| {
        !should_ignore(extract_base_domain(host), &filter.ignore_domains)
            && !should_ignore(host, &filter.ignore_domains)
    });

    let mut stats = group_hierarchical(kept.map(|(host, count)| (host.as_str(), *count)));
    if domain_limit > 0 {
        stats.truncate(domain_limit);
    }
    if let Some(path_limit) = path_limit {
        for bucket in &mut stats {
            bucket.subdomains.truncate(path_limit);
        }
    }
    Ok(stats)
}

fn fetch_visit_times(conn: &Connection, filter: &SearchFilter, what: &'static str) -> Result<Vec<DateTime<Utc>>> {
    let (query, args) = QueryBuilder::new(VISIT_TIME_BASE_QUERY).with_filter(filter).build();
    debug!(%query, args = args.len(), "fetching visit times");

    let mut stmt = conn.prepare(&query).map_err(store_err(what))?;
    let rows = stmt
        .query_map(params_from_iter(args.iter()), |row| row.get::<_, f64>(0))
        .map_err(store_err(what))?;

    let mut times = Vec::new();
    for row in rows {
        times.push(timestamp::decode(row.map_err(store_err(what))?));
    }
    Ok(times)
}

/// Visits per hour of day (UTC), always 24 entries.
pub fn hourly_stats(conn: &Connection, filter: &SearchFilter) -> Result<Vec<HourlyStats>> {
    let mut counts = [0u64; 24];
    for t in fetch_visit_times(conn, filter, "hourly stats")? {
        counts[t.hour() as usize] += 1;
    }

    Ok(counts
        .iter()
        .enumerate()
        .map(|(hour, &visit_count)| HourlyStats { hour: hour as u32, visit_count })
        .collect())
}

/// Visits per calendar day over the last `days` days, newest day first.
pub fn daily_stats(conn: &Connection, days: u32, filter: &SearchFilter) -> Result<Vec<DailyStats>> {
    daily_stats_at(conn, days, filter, Utc::now())
}

/// [`daily_stats`] with an explicit notion of "now".
pub fn daily_stats_at(
    conn: &Connection,
    days: u32,
    filter: &SearchFilter,
    now: DateTime<Utc>,
) -> Result<Vec<DailyStats>> {
    let cutoff = now - Duration::days(i64::from(days));
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for t in fetch_visit_times(conn, filter, "daily stats")? {
        if t > cutoff {
            *counts.entry(t.format("%Y-%m-%d").to_string()).or_default() += 1;
        }
    }

    Ok(counts
        .into_iter()
        .rev()
        .map(|(date, visit_count)| DailyStats { date, visit_count })
        .collect())
}

/// Every stored visit, ignoring filters.
pub fn total_visits(conn: &Connection) -> Result<u64> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM history_visits", [], |row| row.get(0))
        .map_err(store_err("total visits"))?;
    Ok(count.max(0) as u64)
}

/// Visits matching `filter`.
pub fn filtered_visits(conn: &Connection, filter: &SearchFilter) -> Result<u64> {
    let (query, args) = QueryBuilder::new(VISIT_COUNT_BASE_QUERY).with_filter(filter).build();
    debug!(%query, args = args.len(), "counting visits");
    let count: i64 = conn
        .query_row(&query, params_from_iter(args.iter()), |row| row.get(0))
        .map_err(store_err("filtered visits"))?;
    Ok(count.max(0) as u64)
}
