// src/main.rs

mod analyzer;
mod cli;
mod config;
mod domain;
mod error;
mod ignore;
mod interactive;
mod model;
mod query;
mod renderer;
mod server;
mod store;
mod timestamp;

use anyhow::Context;
use clap::Parser;
use cli::{Args, Mode, Sections};
use config::IgnoreList;
use indicatif::{ProgressBar, ProgressStyle};
use model::{AnalysisResult, SearchFilter};
use rusqlite::Connection;
use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(io::stderr)
        .init();
}

/// Disables colors unless the report goes straight to a terminal.
fn configure_colors(output: Option<&Path>) {
    if output.is_some() || !io::stdout().is_terminal() {
        colored::control::set_override(false);
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mode = args.mode();
    init_tracing(if mode == Mode::Serve { "hist=info" } else { "hist=warn" });

    let ignore_list = IgnoreList::default_location()?;
    match &mode {
        Mode::IgnoreList => {
            let domains = ignore_list.load()?;
            if domains.is_empty() {
                println!("Ignore list is empty ({})", ignore_list.path().display());
            } else {
                println!("Ignored domains ({}):", ignore_list.path().display());
                for domain in domains {
                    println!("  {domain}");
                }
            }
            return Ok(());
        }
        Mode::IgnoreAdd(domain) => {
            if ignore_list.add(domain)? {
                println!("Added '{domain}' to the ignore list");
            } else {
                println!("'{domain}' is already ignored");
            }
            return Ok(());
        }
        Mode::IgnoreRemove(domain) => {
            if ignore_list.remove(domain)? {
                println!("Removed '{domain}' from the ignore list");
            } else {
                println!("'{domain}' is not in the ignore list");
            }
            return Ok(());
        }
        Mode::Interactive | Mode::Serve | Mode::Report => {}
    }

    let ignore_domains = if args.no_ignore { Vec::new() } else { ignore_list.load()? };
    debug!(count = ignore_domains.len(), "loaded ignore list");

    let db_path = match &args.db {
        Some(path) => path.clone(),
        None => store::default_db_path()?,
    };
    let conn = store::open(&db_path)?;
    info!(path = %db_path.display(), "opened history database");

    match mode {
        Mode::Interactive => interactive::run_interactive(&conn, args.filter(ignore_domains))?,
        Mode::Serve => {
            let state = server::AppState::new(conn, ignore_domains, server::Pages::default());
            println!("Serving dashboard on http://127.0.0.1:{}", args.port);
            tokio::runtime::Runtime::new()
                .context("failed to start the async runtime")?
                .block_on(server::serve(state, args.port))?;
        }
        _ => run_report(&args, &conn, args.filter(ignore_domains))?,
    }
    Ok(())
}

fn run_report(args: &Args, conn: &Connection, filter: SearchFilter) -> anyhow::Result<()> {
    let sections = args.sections();
    configure_colors(args.output.as_deref());
    let start_time = Instant::now();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = analyze(args, conn, &filter, sections, &spinner);
    spinner.finish_and_clear();
    let result = result?;
    info!("analysis finished in {:.2?}", start_time.elapsed());

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("could not create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    renderer::write_report(&mut out, &result, sections, args.format())?;
    out.flush()?;

    if let Some(path) = &args.output {
        eprintln!("Report written to {}", path.display());
    }
    Ok(())
}

fn analyze(
    args: &Args,
    conn: &Connection,
    filter: &SearchFilter,
    sections: Sections,
    spinner: &ProgressBar,
) -> error::Result<AnalysisResult> {
    let mut result = AnalysisResult {
        total_visits: analyzer::total_visits(conn)?,
        ..Default::default()
    };

    if sections.history {
        spinner.set_message("Loading recent visits...");
        result.recent_visits = analyzer::recent_visits_page(conn, args.limit, args.offset, filter)?;
    }
    if sections.domains {
        spinner.set_message("Counting visits per domain...");
        result.domain_stats = analyzer::domain_stats(conn, args.domain_limit, filter)?;
    }
    if sections.hierarchy {
        spinner.set_message("Grouping domains...");
        result.hierarchical_stats =
            analyzer::hierarchical_domain_stats(conn, args.domain_limit, Some(args.path_limit), filter)?;
    }
    if sections.hourly {
        spinner.set_message("Counting visits per hour...");
        result.hourly_stats = analyzer::hourly_stats(conn, filter)?;
    }
    if sections.daily {
        spinner.set_message("Counting visits per day...");
        result.daily_stats = analyzer::daily_stats(conn, args.days, filter)?;
    }
    Ok(result)
}
