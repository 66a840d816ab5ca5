//! One response's stored artifacts (header block + body).

use anyhow::{Context, Result};
use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug)]
enum Backing {
    Memory(Vec<u8>),
    Spooled { path: PathBuf, len: u64 },
    Released,
}

impl Backing {
    fn load(&self) -> Result<Cow<'_, [u8]>> {
        match self {
            Backing::Memory(bytes) => Ok(Cow::Borrowed(bytes)),
            Backing::Spooled { path, len } => {
                let bytes = fs::read(path)
                    .with_context(|| format!("failed to reload spool file {}", path.display()))?;
                if bytes.len() as u64 != *len {
                    anyhow::bail!(
                        "spool file {} changed size: expected {} bytes, found {}",
                        path.display(),
                        len,
                        bytes.len()
                    );
                }
                Ok(Cow::Owned(bytes))
            }
            Backing::Released => anyhow::bail!("response artifacts already released"),
        }
    }

    fn path(&self) -> Option<&Path> {
        match self {
            Backing::Spooled { path, .. } => Some(path),
            _ => None,
        }
    }

    fn release(&mut self) {
        if let Backing::Spooled { path, .. } = std::mem::replace(self, Backing::Released) {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path = %path.display(), "failed to remove spool file: {}", e),
            }
        }
    }
}

/// Exclusively owned store entry. Spool files are deleted on [`release`](Self::release)
/// or drop, whichever comes first.
#[derive(Debug)]
pub struct StoreEntry {
    key: Option<String>,
    headers: Backing,
    body: Backing,
}

impl StoreEntry {
    pub(super) fn memory(headers: Vec<u8>, body: Vec<u8>) -> Self {
        Self {
            key: None,
            headers: Backing::Memory(headers),
            body: Backing::Memory(body),
        }
    }

    pub(super) fn spooled(
        key: String,
        headers_path: PathBuf,
        headers_len: u64,
        body_path: PathBuf,
        body_len: u64,
    ) -> Self {
        Self {
            key: Some(key),
            headers: Backing::Spooled {
                path: headers_path,
                len: headers_len,
            },
            body: Backing::Spooled {
                path: body_path,
                len: body_len,
            },
        }
    }

    /// Unique token naming this entry's spool files, if spooled.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn is_spooled(&self) -> bool {
        self.body.path().is_some()
    }

    pub fn is_released(&self) -> bool {
        matches!(self.body, Backing::Released)
    }

    /// Paths of the spool files (headers, body), if spooled.
    pub fn spool_paths(&self) -> Option<(&Path, &Path)> {
        Some((self.headers.path()?, self.body.path()?))
    }

    pub fn headers(&self) -> Result<Cow<'_, [u8]>> {
        self.headers.load()
    }

    pub fn body(&self) -> Result<Cow<'_, [u8]>> {
        self.body.load()
    }

    /// Deletes spool files and drops in-memory copies. Safe to call repeatedly.
    pub fn release(&mut self) {
        self.headers.release();
        self.body.release();
    }
}

impl Drop for StoreEntry {
    fn drop(&mut self) {
        self.release();
    }
}
