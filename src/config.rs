// src/config.rs

//! The ignore list lives in a plain text file, one pattern per line.
//! Blank lines and `#` comments are skipped when loading.

use crate::error::{HistError, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = "hist";
const IGNORE_FILE_NAME: &str = "ignore.txt";

/// `$XDG_CONFIG_HOME/hist`, falling back to `~/.config/hist`
pub fn config_dir() -> Result<PathBuf> {
    let base = match std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => dirs::home_dir().ok_or(HistError::NoHomeDir)?.join(".config"),
    };
    Ok(base.join(CONFIG_DIR_NAME))
}

/// Ignore-list file stored at a fixed path.
#[derive(Debug, Clone)]
pub struct IgnoreList {
    path: PathBuf,
}

impl IgnoreList {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The ignore list in the user's config directory.
    pub fn default_location() -> Result<Self> {
        Ok(Self::at(config_dir()?.join(IGNORE_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the patterns; a missing file is an empty list.
    pub fn load(&self) -> Result<Vec<String>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(String::from)
            .collect())
    }

    /// Overwrites the file with `domains`, creating the directory if needed.
    pub fn save(&self, domains: &[String]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut file = fs::File::create(&self.path)?;
        for domain in domains {
            writeln!(file, "{domain}")?;
        }
        Ok(())
    }

    /// Returns false when the domain was already listed.
    pub fn add(&self, domain: &str) -> Result<bool> {
        let mut domains = self.load()?;
        if domains.iter().any(|d| d == domain) {
            return Ok(false);
        }
        domains.push(domain.to_string());
        self.save(&domains)?;
        Ok(true)
    }

    /// Returns false when the domain was not listed.
    pub fn remove(&self, domain: &str) -> Result<bool> {
        let domains = self.load()?;
        let kept: Vec<String> = domains.iter().filter(|d| *d != domain).cloned().collect();
        if kept.len() == domains.len() {
            return Ok(false);
        }
        self.save(&kept)?;
        Ok(true)
    }
}
