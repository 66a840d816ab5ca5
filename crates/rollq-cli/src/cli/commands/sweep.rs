//! `rollq sweep` – remove spool roots of dead processes.

use anyhow::Result;
use rollq_core::config::RollqConfig;
use rollq_core::store;

pub fn run_sweep(cfg: &RollqConfig) -> Result<()> {
    let base = store::store_base(cfg.spool_dir.as_deref());
    let removed = store::sweep_stale(&base)?;
    println!("Removed {} stale spool root(s) under {}", removed, base.display());
    Ok(())
}
