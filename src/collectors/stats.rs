//! Per-LUN Counter Reader
//!
//! Reads the cumulative transfer counters the target core keeps under
//! `statistics/scsi_tgt_port/` in each LUN's configfs directory. Values are
//! returned raw, in the kernel's coarse MiB unit; conversion to bytes is
//! the emitter's job.

use crate::error::{ExporterError, Result};
use crate::fs::PseudoFs;
use std::path::Path;

/// Raw cumulative counters for one LUN. `read_units` and `write_units` are
/// in MiB as reported by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LunCounters {
    pub read_units: u64,
    pub write_units: u64,
    pub ops: u64,
}

pub fn read_lun_counters(
    fs: &dyn PseudoFs,
    configfs: &Path,
    iqn: &str,
    tpgt: &str,
    lun: &str,
) -> Result<LunCounters> {
    let stats_dir = configfs
        .join("target/iscsi")
        .join(iqn)
        .join(format!("tpgt_{tpgt}"))
        .join("lun")
        .join(format!("lun_{lun}"))
        .join("statistics/scsi_tgt_port");

    Ok(LunCounters {
        read_units: read_counter(fs, &stats_dir, "read_mbytes")?,
        write_units: read_counter(fs, &stats_dir, "write_mbytes")?,
        ops: read_counter(fs, &stats_dir, "in_cmds")?,
    })
}

fn read_counter(fs: &dyn PseudoFs, stats_dir: &Path, file: &str) -> Result<u64> {
    let path = stats_dir.join(file);
    let raw = fs
        .read_file(&path)
        .map_err(|e| ExporterError::Stats(format!("{}: {e}", path.display())))?;
    raw.trim()
        .parse()
        .map_err(|e| ExporterError::Stats(format!("{}: {e}", path.display())))
}
