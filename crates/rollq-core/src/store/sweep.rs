//! Backstops for spool files that outlive their responses: an exit-time sweep
//! of this process's roots and a startup sweep of roots owned by dead processes.

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once, OnceLock};

static EXIT_ROOTS: OnceLock<Mutex<Vec<PathBuf>>> = OnceLock::new();
static EXIT_HOOK: Once = Once::new();

fn exit_roots() -> &'static Mutex<Vec<PathBuf>> {
    EXIT_ROOTS.get_or_init(|| Mutex::new(Vec::new()))
}

/// Remember `root` for removal at normal process exit. The hook is installed once.
pub(crate) fn register_exit_sweep(root: &Path) {
    if let Ok(mut roots) = exit_roots().lock() {
        if !roots.iter().any(|r| r == root) {
            roots.push(root.to_path_buf());
        }
    }
    EXIT_HOOK.call_once(|| {
        #[cfg(unix)]
        {
            let r = unsafe { libc::atexit(sweep_at_exit) };
            if r != 0 {
                tracing::debug!("atexit registration failed; exit sweep disabled");
            }
        }
    });
}

#[cfg(unix)]
extern "C" fn sweep_at_exit() {
    sweep_registered();
}

fn sweep_registered() {
    let Some(roots) = EXIT_ROOTS.get() else {
        return;
    };
    if let Ok(roots) = roots.lock() {
        for root in roots.iter() {
            let _ = fs::remove_dir_all(root);
        }
    }
}

/// Removes per-process roots under `base` whose process no longer exists.
/// Directories not named by a pid, and this process's own root, are left alone.
/// Returns how many roots were removed.
pub fn sweep_stale(base: &Path) -> Result<usize> {
    let entries = match fs::read_dir(base) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to list store base {}", base.display()))
        }
    };
    let own = std::process::id();
    let mut removed = 0;
    for entry in entries.flatten() {
        let Some(pid) = entry.file_name().to_str().and_then(|n| n.parse::<u32>().ok()) else {
            continue;
        };
        if pid == own || process_alive(pid) {
            continue;
        }
        let path = entry.path();
        match fs::remove_dir_all(&path) {
            Ok(()) => {
                tracing::debug!(pid, path = %path.display(), "removed stale store root");
                removed += 1;
            }
            Err(e) => tracing::warn!(path = %path.display(), "failed to remove stale store root: {}", e),
        }
    }
    Ok(removed)
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    let r = unsafe { libc::kill(pid, 0) };
    r == 0 || io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Without a portable liveness check nothing is considered stale.
#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_base_sweeps_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(sweep_stale(&dir.path().join("absent")).unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn dead_pid_roots_are_removed_live_ones_kept() {
        let dir = tempfile::tempdir().unwrap();
        let own = dir.path().join(std::process::id().to_string());
        let dead = dir.path().join("2147483646");
        let unrelated = dir.path().join("not-a-pid");
        for d in [&own, &dead, &unrelated] {
            fs::create_dir_all(d).unwrap();
            fs::write(d.join("bod-x"), b"x").unwrap();
        }
        assert_eq!(sweep_stale(dir.path()).unwrap(), 1);
        assert!(own.exists());
        assert!(!dead.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn registered_roots_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir_all(&root).unwrap();
        register_exit_sweep(&root);
        register_exit_sweep(&root);
        let count = exit_roots()
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.as_path() == root)
            .count();
        assert_eq!(count, 1);
    }
}
