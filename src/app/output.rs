//! Output list artifacts
//!
//! Each successful run writes its batch to a brand-new file in the output
//! directory. Files are opened with `create_new`, so an existing list is never
//! overwritten; the naming policy only decides which name to try next.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::app::models::ResultBatch;
use crate::constants::output;
use crate::errors::{OutputError, OutputResult};

/// Upper bound on names tried before giving up
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// How output files are named
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum NamingPolicy {
    /// `prefix` + zero-padded number one above the highest existing one
    Progressive { prefix: String, width: usize },
    /// `prefix` + local timestamp, with `_N` appended on collision
    Timestamp { prefix: String },
}

impl Default for NamingPolicy {
    fn default() -> Self {
        NamingPolicy::Progressive {
            prefix: output::DEFAULT_PREFIX.to_string(),
            width: output::DEFAULT_NUMBER_WIDTH,
        }
    }
}

impl NamingPolicy {
    /// File name for the given sequence number or timestamp attempt
    fn file_name(&self, number: u32, stamp: &str) -> String {
        match self {
            NamingPolicy::Progressive { prefix, width } => format!(
                "{}{:0width$}{}",
                prefix,
                number,
                output::LIST_EXTENSION,
                width = *width
            ),
            NamingPolicy::Timestamp { prefix } if number == 0 => {
                format!("{}{}{}", prefix, stamp, output::LIST_EXTENSION)
            }
            NamingPolicy::Timestamp { prefix } => {
                format!("{}{}_{}{}", prefix, stamp, number, output::LIST_EXTENSION)
            }
        }
    }
}

/// Render a batch in list syntax, one `URL;` per line
pub fn render(batch: &ResultBatch) -> String {
    let mut content = String::new();
    for url in batch.urls() {
        content.push_str(url);
        content.push(output::LINE_TERMINATOR);
        content.push('\n');
    }
    content
}

/// Highest progressive number present in `dir` for `prefix`
async fn highest_number(dir: &Path, prefix: &str) -> OutputResult<u32> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|source| OutputError::DirectoryNotAccessible {
            path: dir.to_path_buf(),
            source,
        })?;

    let mut highest = 0;
    loop {
        let entry = entries
            .next_entry()
            .await
            .map_err(|source| OutputError::DirectoryNotAccessible {
                path: dir.to_path_buf(),
                source,
            })?;
        let Some(entry) = entry else { break };

        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let number = name
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(output::LIST_EXTENSION))
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<u32>().ok());
        if let Some(number) = number {
            highest = highest.max(number);
        }
    }
    Ok(highest)
}

/// Writes result batches to new list files
#[derive(Debug, Clone)]
pub struct OutputWriter {
    out_dir: PathBuf,
    naming: NamingPolicy,
    latest: Option<PathBuf>,
}

impl OutputWriter {
    pub fn new(out_dir: impl Into<PathBuf>, naming: NamingPolicy) -> Self {
        Self {
            out_dir: out_dir.into(),
            naming,
            latest: None,
        }
    }

    /// Also copy every written list to a fixed "latest" file
    pub fn with_latest(mut self, latest: Option<PathBuf>) -> Self {
        self.latest = latest;
        self
    }

    /// Write the batch to a new file and return its path
    ///
    /// # Errors
    ///
    /// Returns `OutputError` if the directory cannot be created or scanned,
    /// if writing fails, or if no free name is found
    pub async fn write(&self, batch: &ResultBatch) -> OutputResult<PathBuf> {
        let stamp = Local::now().format(output::TIMESTAMP_FORMAT).to_string();
        self.write_with_stamp(batch, &stamp).await
    }

    async fn write_with_stamp(&self, batch: &ResultBatch, stamp: &str) -> OutputResult<PathBuf> {
        fs::create_dir_all(&self.out_dir)
            .await
            .map_err(|source| OutputError::DirectoryNotAccessible {
                path: self.out_dir.clone(),
                source,
            })?;

        let content = render(batch);
        let exhausted = || OutputError::NamingExhausted {
            dir: self.out_dir.clone(),
        };
        let mut number = match &self.naming {
            NamingPolicy::Progressive { prefix, .. } => highest_number(&self.out_dir, prefix)
                .await?
                .checked_add(1)
                .ok_or_else(exhausted)?,
            NamingPolicy::Timestamp { .. } => 0,
        };

        for _ in 0..MAX_NAME_ATTEMPTS {
            let path = self.out_dir.join(self.naming.file_name(number, stamp));
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(mut file) => {
                    let write_error = |source| OutputError::Write {
                        path: path.clone(),
                        source,
                    };
                    file.write_all(content.as_bytes())
                        .await
                        .map_err(write_error)?;
                    file.flush().await.map_err(write_error)?;
                    info!("Wrote {} URLs to {}", batch.len(), path.display());

                    self.write_latest(&content).await?;
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    debug!("{} already exists, trying next name", path.display());
                    number = number.checked_add(1).ok_or_else(exhausted)?;
                }
                Err(source) => return Err(OutputError::Write { path, source }),
            }
        }

        Err(exhausted())
    }

    async fn write_latest(&self, content: &str) -> OutputResult<()> {
        let Some(latest) = &self.latest else {
            return Ok(());
        };

        if let Some(parent) = latest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| OutputError::DirectoryNotAccessible {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        fs::write(latest, content)
            .await
            .map_err(|source| OutputError::Write {
                path: latest.clone(),
                source,
            })?;
        debug!("Updated latest list {}", latest.display());
        Ok(())
    }
}
