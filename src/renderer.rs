// src/renderer.rs

use crate::cli::{OutputFormat, Sections};
use crate::model::*;
use colored::Colorize;
use std::io::{self, Write};

const BAR_WIDTH: usize = 20;
const TITLE_WIDTH: usize = 50;
const RULE: &str = "─────────────────────────────────────────";

pub fn write_report<W: Write>(out: &mut W, result: &AnalysisResult, sections: Sections, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Text => write_text(out, result, sections),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, result)?;
            writeln!(out)
        }
        OutputFormat::Csv => write_delimited(out, result, sections, ','),
        OutputFormat::Tsv => write_delimited(out, result, sections, '\t'),
    }
}

/// Shortens `s` to at most `max` characters, marking the cut with "...".
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(max.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

/// A bar of up to `BAR_WIDTH` cells scaled against `max`.
pub fn bar(count: u64, max: u64) -> String {
    if max == 0 {
        return String::new();
    }
    let len = (count as f64 / max as f64 * BAR_WIDTH as f64) as usize;
    "█".repeat(len)
}

pub fn display_title(title: &str) -> &str {
    if title.is_empty() {
        "(no title)"
    } else {
        title
    }
}

fn write_text<W: Write>(out: &mut W, result: &AnalysisResult, sections: Sections) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "Safari history report".bold())?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "Total visits: {}", result.total_visits)?;
    writeln!(out)?;

    if sections.history && !result.recent_visits.is_empty() {
        writeln!(out, "{}", "Recent visits".bold())?;
        writeln!(out, "{RULE}")?;
        for v in &result.recent_visits {
            let title = truncate(display_title(&v.title), TITLE_WIDTH);
            writeln!(out, "  {}  {}", v.visit_time.format("%Y-%m-%d %H:%M"), title)?;
            if !v.domain.is_empty() {
                writeln!(out, "                    {}", v.domain.cyan())?;
            }
        }
        writeln!(out)?;
    }

    if sections.domains && !result.domain_stats.is_empty() {
        writeln!(out, "{}", format!("Visits by domain (top {})", result.domain_stats.len()).bold())?;
        writeln!(out, "{RULE}")?;
        let max = result.domain_stats[0].visit_count;
        for s in &result.domain_stats {
            writeln!(out, "  {:<30} {} {}", s.domain, bar(s.visit_count, max), s.visit_count)?;
        }
        writeln!(out)?;
    }

    if sections.hierarchy && !result.hierarchical_stats.is_empty() {
        writeln!(out, "{}", "Visits by base domain".bold())?;
        writeln!(out, "{RULE}")?;
        let max = result.hierarchical_stats[0].total_count;
        for bucket in &result.hierarchical_stats {
            writeln!(out, "  {:<30} {} {}", bucket.base_domain, bar(bucket.total_count, max), bucket.total_count)?;
            if bucket.has_subdomains {
                for sub in &bucket.subdomains {
                    writeln!(out, "    └ {:<26} {}", sub.subdomain, sub.count)?;
                }
            }
        }
        writeln!(out)?;
    }

    if sections.hourly && !result.hourly_stats.is_empty() {
        writeln!(out, "{}", "Visits by hour".bold())?;
        writeln!(out, "{RULE}")?;
        let max = result.hourly_stats.iter().map(|s| s.visit_count).max().unwrap_or(0);
        for s in &result.hourly_stats {
            writeln!(out, "  {:02}:00  {} {}", s.hour, bar(s.visit_count, max), s.visit_count)?;
        }
        writeln!(out)?;
    }

    if sections.daily && !result.daily_stats.is_empty() {
        writeln!(out, "{}", format!("Visits by day (last {} days)", result.daily_stats.len()).bold())?;
        writeln!(out, "{RULE}")?;
        let max = result.daily_stats.iter().map(|s| s.visit_count).max().unwrap_or(0);
        for s in &result.daily_stats {
            writeln!(out, "  {}  {} {}", s.date, bar(s.visit_count, max), s.visit_count)?;
        }
        writeln!(out)?;
    }

    Ok(())
}

fn escape_field(field: &str, delimiter: char) -> String {
    let needs_quote = field.contains(delimiter) || field.contains('"') || field.contains('\n') || field.contains('\r');
    if !needs_quote {
        return field.to_string();
    }
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Writes CSV-style records, one header row per section and an empty record between sections.
fn write_delimited<W: Write>(out: &mut W, result: &AnalysisResult, sections: Sections, delimiter: char) -> io::Result<()> {
    let mut tables: Vec<(Vec<&str>, Vec<Vec<String>>)> = Vec::new();

    if sections.history && !result.recent_visits.is_empty() {
        let rows = result
            .recent_visits
            .iter()
            .map(|v| {
                vec![
                    v.visit_time.format("%Y-%m-%d %H:%M:%S").to_string(),
                    v.title.clone(),
                    v.domain.clone(),
                    v.url.clone(),
                ]
            })
            .collect();
        tables.push((vec!["visit_time", "title", "domain", "url"], rows));
    }
    if sections.domains && !result.domain_stats.is_empty() {
        let rows = result
            .domain_stats
            .iter()
            .map(|s| vec![s.domain.clone(), s.visit_count.to_string()])
            .collect();
        tables.push((vec!["domain", "visit_count"], rows));
    }
    if sections.hierarchy && !result.hierarchical_stats.is_empty() {
        let rows = result
            .hierarchical_stats
            .iter()
            .flat_map(|b| {
                b.subdomains.iter().map(move |s| {
                    vec![b.base_domain.clone(), b.total_count.to_string(), s.subdomain.clone(), s.count.to_string()]
                })
            })
            .collect();
        tables.push((vec!["base_domain", "total_count", "subdomain", "count"], rows));
    }
    if sections.hourly && !result.hourly_stats.is_empty() {
        let rows = result
            .hourly_stats
            .iter()
            .map(|s| vec![format!("{:02}:00", s.hour), s.visit_count.to_string()])
            .collect();
        tables.push((vec!["hour", "visit_count"], rows));
    }
    if sections.daily && !result.daily_stats.is_empty() {
        let rows = result
            .daily_stats
            .iter()
            .map(|s| vec![s.date.clone(), s.visit_count.to_string()])
            .collect();
        tables.push((vec!["date", "visit_count"], rows));
    }

    let sep = delimiter.to_string();
    for (i, (header, rows)) in tables.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "{}", header.join(&sep))?;
        for row in rows {
            let fields: Vec<String> = row.iter().map(|f| escape_field(f, delimiter)).collect();
            writeln!(out, "{}", fields.join(&sep))?;
        }
    }
    Ok(())
}
