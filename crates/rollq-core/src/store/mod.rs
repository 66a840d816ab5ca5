//! Response store: transient holding area for completed transfer artifacts.
//!
//! Large bodies are spooled to files under `<base>/rollq/<pid>/` so many
//! concurrently completing responses do not pile up in memory; accessors
//! reload them on demand. Every entry is owned by exactly one response and
//! its files are removed when the entry is released or dropped.

mod entry;
mod sweep;

pub use entry::StoreEntry;
pub use sweep::sweep_stale;

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Directory under the temp dir (or configured spool dir) holding per-process roots.
pub const STORE_DIR_NAME: &str = "rollq";

/// Default parent of all per-process store roots.
pub fn default_base() -> PathBuf {
    std::env::temp_dir().join(STORE_DIR_NAME)
}

/// Parent of all per-process store roots: `<spool_dir>/rollq`, or [`default_base`].
/// Only this directory is ever swept, never `spool_dir` itself.
pub fn store_base(spool_dir: Option<&Path>) -> PathBuf {
    match spool_dir {
        Some(dir) => dir.join(STORE_DIR_NAME),
        None => default_base(),
    }
}

/// Creates entries for completed transfers, spooling large ones to disk.
#[derive(Debug, Clone)]
pub struct ResponseStore {
    root: PathBuf,
    spool_threshold: Option<usize>,
}

impl ResponseStore {
    /// Store rooted at `<spool_dir>/rollq/<pid>` (see [`store_base`]).
    /// Bodies of at least `spool_threshold` bytes are spooled; `None` never spools.
    /// Sweeps roots left by dead processes and registers this root for the exit sweep.
    pub fn new(spool_dir: Option<&Path>, spool_threshold: Option<usize>) -> Self {
        let base = store_base(spool_dir);
        match sweep_stale(&base) {
            Ok(0) => {}
            Ok(n) => tracing::info!(removed = n, "swept stale response store roots"),
            Err(e) => tracing::debug!("stale store sweep skipped: {:#}", e),
        }
        let root = base.join(std::process::id().to_string());
        sweep::register_exit_sweep(&root);
        Self {
            root,
            spool_threshold,
        }
    }

    /// Store that keeps everything in memory.
    pub fn in_memory() -> Self {
        Self {
            root: default_base().join(std::process::id().to_string()),
            spool_threshold: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn spool_threshold(&self) -> Option<usize> {
        self.spool_threshold
    }

    /// Takes ownership of `headers` and `body`. Spooling failures fall back to memory.
    pub fn put(&self, headers: Vec<u8>, body: Vec<u8>) -> StoreEntry {
        let spool = self
            .spool_threshold
            .map(|threshold| body.len() >= threshold)
            .unwrap_or(false);
        if !spool {
            return StoreEntry::memory(headers, body);
        }
        let key = uuid::Uuid::new_v4().simple().to_string();
        match self.spool(&key, &headers, &body) {
            Ok((hdr_path, bod_path)) => StoreEntry::spooled(
                key,
                hdr_path,
                headers.len() as u64,
                bod_path,
                body.len() as u64,
            ),
            Err(e) => {
                tracing::warn!(root = %self.root.display(), "response spooling failed, keeping in memory: {:#}", e);
                StoreEntry::memory(headers, body)
            }
        }
    }

    fn spool(&self, key: &str, headers: &[u8], body: &[u8]) -> Result<(PathBuf, PathBuf)> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create store root {}", self.root.display()))?;
        let hdr_path = self.root.join(format!("hdr-{}", key));
        let bod_path = self.root.join(format!("bod-{}", key));
        write_new(&hdr_path, headers)?;
        if let Err(e) = write_new(&bod_path, body) {
            let _ = fs::remove_file(&hdr_path);
            return Err(e);
        }
        Ok((hdr_path, bod_path))
    }
}

/// Writes `data` to a file that must not exist yet.
fn write_new(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = File::options()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("failed to create spool file {}", path.display()))?;
    file.write_all(data)
        .with_context(|| format!("failed to write spool file {}", path.display()))?;
    Ok(())
}
