//! Persistent dedup ledger
//!
//! The ledger is a plain-text file with one previously emitted URL per line,
//! in the same `URL;` syntax as the output lists. It is read once at run start
//! into a [`LedgerSnapshot`] and only appended to after a run succeeds.
//!
//! Lookups compare percent-decoded URLs, so a ledger holding raw names such
//! as `.../Wind Rain.mp3` still matches the encoded candidate URL.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::constants::output::LINE_TERMINATOR;
use crate::errors::{LedgerError, LedgerResult};

/// Frozen set of normalized URLs loaded at run start
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    urls: HashSet<String>,
}

impl LedgerSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the URL was emitted by an earlier run
    pub fn contains(&self, url: &str) -> bool {
        match match_key(url) {
            Some(key) => self.urls.contains(&key),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for LedgerSnapshot {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            urls: iter
                .into_iter()
                .filter_map(|line| match_key(line.as_ref()))
                .collect(),
        }
    }
}

/// Normalize one ledger line or URL
///
/// Trims surrounding whitespace and a single trailing terminator. Returns
/// `None` for lines that are empty after normalization.
pub fn normalize(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let trimmed = trimmed
        .strip_suffix(LINE_TERMINATOR)
        .unwrap_or(trimmed)
        .trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Comparison key: the normalized URL with percent escapes decoded
fn match_key(line: &str) -> Option<String> {
    let url = normalize(line)?;
    match urlencoding::decode(&url) {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(_) => Some(url),
    }
}

/// Ledger file handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupLedger {
    path: PathBuf,
}

impl DedupLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the ledger, a missing file is an empty ledger
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Io` if the file exists but cannot be read
    pub async fn load(&self) -> LedgerResult<LedgerSnapshot> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No ledger at {}, starting empty", self.path.display());
                return Ok(LedgerSnapshot::new());
            }
            Err(source) => {
                return Err(LedgerError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let snapshot: LedgerSnapshot = content.lines().collect();
        debug!(
            "Loaded {} ledger entries from {}",
            snapshot.len(),
            self.path.display()
        );
        Ok(snapshot)
    }

    /// Append URLs, one complete line per URL
    ///
    /// Creates the file and its parent directories when missing. Returns the
    /// number of lines written.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Io` if the file cannot be created or written
    pub async fn append<I, S>(&self, urls: I) -> LedgerResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let io_error = |source| LedgerError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(io_error)?;

        let mut written = 0;
        for url in urls {
            if let Some(url) = normalize(url.as_ref()) {
                let line = format!("{}{}\n", url, LINE_TERMINATOR);
                file.write_all(line.as_bytes()).await.map_err(io_error)?;
                written += 1;
            }
        }
        file.flush().await.map_err(io_error)?;

        info!("Appended {} URLs to ledger {}", written, self.path.display());
        Ok(written)
    }
}
