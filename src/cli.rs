// src/cli.rs

use crate::error::{HistError, Result};
use crate::model::SearchFilter;
use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const DEFAULT_DOMAIN_LIMIT: usize = 10;
pub const DEFAULT_PATH_LIMIT: usize = 5;
pub const DEFAULT_DAILY_DAYS: u32 = 7;
pub const DEFAULT_WEB_PORT: u16 = 8080;

#[derive(Parser, Debug)]
#[command(author, version, about = "Analyze local Safari browsing history", long_about = None)]
pub struct Args {
    /// Path to the history database (defaults to ~/Library/Safari/History.db)
    #[arg(long, env = "HIST_DB")]
    pub db: Option<PathBuf>,

    /// Number of history entries to show
    #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
    pub limit: usize,

    /// Number of history entries to skip
    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    /// Number of domains to show in domain statistics
    #[arg(long = "domains", default_value_t = DEFAULT_DOMAIN_LIMIT)]
    pub domain_limit: usize,

    /// Number of subdomains listed under each base domain
    #[arg(long, default_value_t = DEFAULT_PATH_LIMIT)]
    pub path_limit: usize,

    /// Number of days covered by daily statistics
    #[arg(long, default_value_t = DEFAULT_DAILY_DAYS)]
    pub days: u32,

    /// Show recent visits
    #[arg(long)]
    pub history: bool,

    /// Show visit counts per domain
    #[arg(long)]
    pub domain_stats: bool,

    /// Show visit counts grouped by base domain
    #[arg(long)]
    pub hierarchy: bool,

    /// Show visits per hour of day
    #[arg(long)]
    pub hourly: bool,

    /// Show visits per day
    #[arg(long)]
    pub daily: bool,

    /// Show every section
    #[arg(long)]
    pub all: bool,

    /// Keyword matched against URL and title
    #[arg(long)]
    pub search: Option<String>,

    /// Only visits whose stored domain equals this value
    #[arg(long)]
    pub domain: Option<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub from: Option<DateTime<Utc>>,

    /// End date, inclusive (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub to: Option<DateTime<Utc>>,

    #[arg(long, conflicts_with_all = ["csv", "tsv"])]
    pub json: bool,

    #[arg(long, conflicts_with = "tsv")]
    pub csv: bool,

    #[arg(long)]
    pub tsv: bool,

    /// Write the report to this file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Browse history interactively
    #[arg(short, long, conflicts_with = "serve")]
    pub interactive: bool,

    /// Serve the web dashboard
    #[arg(long)]
    pub serve: bool,

    /// Port for the web dashboard
    #[arg(long, default_value_t = DEFAULT_WEB_PORT)]
    pub port: u16,

    /// Add a domain pattern to the ignore list
    #[arg(long, value_name = "DOMAIN")]
    pub ignore_add: Option<String>,

    /// Remove a domain pattern from the ignore list
    #[arg(long, value_name = "DOMAIN")]
    pub ignore_remove: Option<String>,

    /// Print the ignore list
    #[arg(long)]
    pub ignore_list: bool,

    /// Run without applying the ignore list
    #[arg(long)]
    pub no_ignore: bool,
}

/// What a single invocation does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    IgnoreList,
    IgnoreAdd(String),
    IgnoreRemove(String),
    Interactive,
    Serve,
    Report,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
    Tsv,
}

/// Report sections to compute and print
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sections {
    pub history: bool,
    pub domains: bool,
    pub hierarchy: bool,
    pub hourly: bool,
    pub daily: bool,
}

impl Args {
    pub fn mode(&self) -> Mode {
        if self.ignore_list {
            Mode::IgnoreList
        } else if let Some(domain) = &self.ignore_add {
            Mode::IgnoreAdd(domain.clone())
        } else if let Some(domain) = &self.ignore_remove {
            Mode::IgnoreRemove(domain.clone())
        } else if self.interactive {
            Mode::Interactive
        } else if self.serve {
            Mode::Serve
        } else {
            Mode::Report
        }
    }

    pub fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else if self.csv {
            OutputFormat::Csv
        } else if self.tsv {
            OutputFormat::Tsv
        } else {
            OutputFormat::Text
        }
    }

    /// Selected sections; history alone when nothing was asked for.
    pub fn sections(&self) -> Sections {
        if self.all {
            return Sections { history: true, domains: true, hierarchy: true, hourly: true, daily: true };
        }
        let sections = Sections {
            history: self.history,
            domains: self.domain_stats,
            hierarchy: self.hierarchy,
            hourly: self.hourly,
            daily: self.daily,
        };
        if sections == Sections::default() {
            Sections { history: true, ..sections }
        } else {
            sections
        }
    }

    pub fn filter(&self, ignore_domains: Vec<String>) -> SearchFilter {
        SearchFilter {
            keyword: self.search.clone().unwrap_or_default(),
            domain: self.domain.clone().unwrap_or_default(),
            from: self.from,
            to: self.to,
            ignore_domains,
        }
    }
}

/// Parses `YYYY-MM-DD` as midnight UTC.
pub fn parse_date(s: &str) -> Result<DateTime<Utc>> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| HistError::InvalidDate(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("hist").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let args = parse(&[]);
        assert_eq!(args.limit, 20);
        assert_eq!(args.domain_limit, 10);
        assert_eq!(args.days, 7);
        assert_eq!(args.port, 8080);
        assert_eq!(args.mode(), Mode::Report);
        assert_eq!(args.format(), OutputFormat::Text);
        assert_eq!(args.sections(), Sections { history: true, ..Default::default() });
    }

    #[test]
    fn all_enables_every_section() {
        let s = parse(&["--all"]).sections();
        assert!(s.history && s.domains && s.hierarchy && s.hourly && s.daily);
    }

    #[test]
    fn explicit_sections_replace_the_default() {
        let s = parse(&["--hourly", "--domain-stats"]).sections();
        assert_eq!(s, Sections { domains: true, hourly: true, ..Default::default() });
    }

    #[test]
    fn filter_from_flags() {
        let args = parse(&["--search", "rust", "--domain", "github", "--from", "2025-01-01", "--to", "2025-01-31"]);
        let filter = args.filter(vec!["youtube".into()]);
        assert_eq!(filter.keyword, "rust");
        assert_eq!(filter.domain, "github");
        assert_eq!(filter.from, Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(filter.to, Some(Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap()));
        assert_eq!(filter.ignore_domains, ["youtube"]);
    }

    #[test]
    fn malformed_dates_are_rejected() {
        assert!(Args::try_parse_from(["hist", "--from", "2025/01/01"]).is_err());
        assert!(matches!(parse_date("yesterday"), Err(HistError::InvalidDate(_))));
        assert!(parse_date("2025-02-30").is_err());
    }

    #[test]
    fn modes() {
        assert_eq!(parse(&["--ignore-list"]).mode(), Mode::IgnoreList);
        assert_eq!(parse(&["--ignore-add", "a.com"]).mode(), Mode::IgnoreAdd("a.com".into()));
        assert_eq!(parse(&["-i"]).mode(), Mode::Interactive);
        assert_eq!(parse(&["--serve", "--port", "9000"]).mode(), Mode::Serve);
        assert!(Args::try_parse_from(["hist", "-i", "--serve"]).is_err());
    }

    #[test]
    fn output_formats() {
        assert_eq!(parse(&["--json"]).format(), OutputFormat::Json);
        assert_eq!(parse(&["--csv"]).format(), OutputFormat::Csv);
        assert_eq!(parse(&["--tsv"]).format(), OutputFormat::Tsv);
        assert!(Args::try_parse_from(["hist", "--json", "--csv"]).is_err());
    }
}
