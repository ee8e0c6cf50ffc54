// src/interactive.rs

//! Line-oriented history browser for the terminal.

use crate::analyzer::{filtered_visits, recent_visits_page, total_visits};
use crate::error::Result;
use crate::model::{SearchFilter, Visit};
use crate::renderer::{display_title, truncate};
use colored::Colorize;
use rusqlite::Connection;
use std::io::{BufRead, Write};

pub const DEFAULT_PAGE_SIZE: usize = 15;
const TITLE_WIDTH: usize = 60;
const RULE: &str = "──────────────────────────────────────────────────";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Next,
    Prev,
    Search(String),
    ClearSearch,
    Detail(usize),
    Reload,
    Quit,
    Unknown(String),
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if let Some(keyword) = line.strip_prefix('/') {
        let keyword = keyword.trim();
        return if keyword.is_empty() {
            Command::ClearSearch
        } else {
            Command::Search(keyword.to_string())
        };
    }
    match line {
        "n" | "" => Command::Next,
        "p" => Command::Prev,
        "r" => Command::Reload,
        "q" | "quit" | "exit" => Command::Quit,
        other => match other.parse::<usize>() {
            Ok(n) if n > 0 => Command::Detail(n),
            _ => Command::Unknown(other.to_string()),
        },
    }
}

/// Paged view over recent visits, driven by one command per input line.
pub struct Browser<'a> {
    conn: &'a Connection,
    filter: SearchFilter,
    page_size: usize,
    page: usize,
    visits: Vec<Visit>,
    matching: u64,
    total: u64,
}

impl<'a> Browser<'a> {
    pub fn new(conn: &'a Connection, filter: SearchFilter, page_size: usize) -> Self {
        Self {
            conn,
            filter,
            page_size: page_size.max(1),
            page: 0,
            visits: Vec::new(),
            matching: 0,
            total: 0,
        }
    }

    fn load(&mut self) -> Result<()> {
        self.visits = recent_visits_page(self.conn, self.page_size, self.page * self.page_size, &self.filter)?;
        self.matching = filtered_visits(self.conn, &self.filter)?;
        self.total = total_visits(self.conn)?;
        Ok(())
    }

    fn page_count(&self) -> usize {
        (self.matching as usize).div_ceil(self.page_size).max(1)
    }

    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
        self.load()?;
        self.render_list(out)?;

        for line in input.lines() {
            match parse_command(&line?) {
                Command::Quit => break,
                Command::Next => {
                    if self.page + 1 < self.page_count() {
                        self.page += 1;
                        self.load()?;
                    }
                }
                Command::Prev => {
                    if self.page > 0 {
                        self.page -= 1;
                        self.load()?;
                    }
                }
                Command::Search(keyword) => {
                    self.filter.keyword = keyword;
                    self.page = 0;
                    self.load()?;
                }
                Command::ClearSearch => {
                    self.filter.keyword.clear();
                    self.page = 0;
                    self.load()?;
                }
                Command::Reload => self.load()?,
                Command::Detail(n) => {
                    match self.visits.get(n - 1) {
                        Some(visit) => render_detail(out, visit)?,
                        None => writeln!(out, "No entry {n} on this page")?,
                    }
                    continue;
                }
                Command::Unknown(cmd) => {
                    writeln!(out, "Unknown command '{cmd}'")?;
                    continue;
                }
            }
            self.render_list(out)?;
        }
        Ok(())
    }

    fn render_list<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "{}", "Safari history browser".magenta().bold())?;
        writeln!(out, "{RULE}")?;
        if !self.filter.keyword.is_empty() {
            writeln!(out, "Searching: {:?} (/ to clear)", self.filter.keyword)?;
        }

        if self.visits.is_empty() {
            writeln!(out, "No history")?;
        }
        for (i, v) in self.visits.iter().enumerate() {
            let title = truncate(display_title(&v.title), TITLE_WIDTH);
            writeln!(out, "{:>3}. {}  {}", i + 1, v.visit_time.format("%m/%d %H:%M"), title)?;
            if !v.domain.is_empty() {
                writeln!(out, "                   {}", v.domain.blue())?;
            }
        }

        writeln!(out, "{RULE}")?;
        writeln!(
            out,
            "Page {}/{}  Matching: {}  Total visits: {}",
            self.page + 1,
            self.page_count(),
            self.matching,
            self.total
        )?;
        writeln!(out, "{}", "n:next  p:prev  N:details  /text:search  /:clear  r:reload  q:quit".dimmed())?;
        Ok(())
    }
}

fn render_detail<W: Write>(out: &mut W, v: &Visit) -> Result<()> {
    writeln!(out, "{}", "Visit details".magenta().bold())?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "Title:  {}", display_title(&v.title))?;
    writeln!(out, "URL:    {}", v.url)?;
    writeln!(out, "Domain: {}", v.domain)?;
    writeln!(out, "Time:   {}", v.visit_time.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out, "{RULE}")?;
    Ok(())
}

/// Runs the browser on stdin/stdout until `q` or end of input.
pub fn run_interactive(conn: &Connection, filter: SearchFilter) -> Result<()> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    Browser::new(conn, filter, DEFAULT_PAGE_SIZE).run(stdin.lock(), &mut stdout)
}
