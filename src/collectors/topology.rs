//! Export Topology Scan
//!
//! Parses the configfs side of the LIO target tree:
//!
//! ```text
//! {configfs}/target/iscsi/iqn*/tpgt_*/lun/lun_*/{symlink}
//! ```
//!
//! Each LUN directory holds a symlink back into the core tree,
//! `{configfs}/target/core/{backstore}_{type_number}/{object_name}/`, which
//! is the only join point between the export-side records and the backstore
//! identities and counters. The scan captures that link's parsed form on
//! every [`LunEntry`]; the adapters resolve it later.
//!
//! The whole topology is re-read from scratch each collection cycle.

use crate::error::{ExporterError, Result};
use crate::fs::PseudoFs;
use std::path::{Component, Path, PathBuf};

const TARGET_ISCSI_DIR: &str = "target/iscsi";

/// Known backstore implementations. Anything else is `Unknown`, which the
/// walker skips without error so newer kernels don't break the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackstoreType {
    Fileio,
    Iblock,
    Rbd,
    Rdmcp,
    Unknown,
}

impl BackstoreType {
    pub fn parse(token: &str) -> Self {
        match token {
            "fileio" => Self::Fileio,
            "iblock" => Self::Iblock,
            "rbd" => Self::Rbd,
            "rdmcp" => Self::Rdmcp,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fileio => "fileio",
            Self::Iblock => "iblock",
            Self::Rbd => "rbd",
            Self::Rdmcp => "rdmcp",
            Self::Unknown => "unknown",
        }
    }
}

/// One iSCSI target, keyed by IQN.
#[derive(Debug)]
pub struct Target {
    pub iqn: String,
    pub port_groups: Vec<PortGroup>,
}

/// One target portal group. Disabled groups are scanned but never emitted.
#[derive(Debug)]
pub struct PortGroup {
    pub tag: String,
    pub enabled: bool,
    pub luns: Vec<LunEntry>,
}

/// One exported LUN with its parsed backstore link.
#[derive(Debug)]
pub struct LunEntry {
    pub lun: String,
    pub backstore: BackstoreType,
    pub object_name: String,
    pub type_number: String,
}

/// Enumerate every target, portal group and LUN under the configfs tree.
///
/// Any failure here (including the tree being absent because the target
/// module is not loaded) surfaces as an error; the caller treats that as
/// "no data this cycle".
pub fn scan(fs: &dyn PseudoFs, configfs: &Path) -> Result<Vec<Target>> {
    let base = configfs.join(TARGET_ISCSI_DIR);
    let mut targets = Vec::new();

    for name in fs.list_dir(&base)? {
        if !name.starts_with("iqn") {
            continue;
        }
        let target_dir = base.join(&name);
        let mut port_groups = Vec::new();

        for entry in fs.list_dir(&target_dir)? {
            let Some(tag) = entry.strip_prefix("tpgt_") else {
                continue;
            };
            let tpgt_dir = target_dir.join(&entry);
            let enabled = fs.read_file(&tpgt_dir.join("enable"))?.trim() == "1";
            port_groups.push(PortGroup {
                tag: tag.to_string(),
                enabled,
                luns: scan_luns(fs, &tpgt_dir)?,
            });
        }

        targets.push(Target {
            iqn: name,
            port_groups,
        });
    }

    Ok(targets)
}

fn scan_luns(fs: &dyn PseudoFs, tpgt_dir: &Path) -> Result<Vec<LunEntry>> {
    let lun_base = tpgt_dir.join("lun");
    let mut luns = Vec::new();

    for entry in fs.list_dir(&lun_base)? {
        let Some(lun) = entry.strip_prefix("lun_") else {
            continue;
        };
        let link = backstore_link(fs, &lun_base.join(&entry))?;
        let (backstore, type_number, object_name) = parse_backstore_link(&link)?;
        luns.push(LunEntry {
            lun: lun.to_string(),
            backstore,
            object_name,
            type_number,
        });
    }

    Ok(luns)
}

/// Find the backstore symlink inside a LUN directory. The link name is not
/// fixed, so probe every entry.
fn backstore_link(fs: &dyn PseudoFs, lun_dir: &Path) -> Result<PathBuf> {
    for entry in fs.list_dir(lun_dir)? {
        if let Ok(target) = fs.read_link(&lun_dir.join(&entry)) {
            return Ok(target);
        }
    }
    Err(ExporterError::Lookup(format!(
        "no backstore link under {}",
        lun_dir.display()
    )))
}

/// Split a link target like `../../../target/core/fileio_3/obj1` into
/// `(Fileio, "3", "obj1")`. The instance directory is split at its last
/// underscore.
fn parse_backstore_link(target: &Path) -> Result<(BackstoreType, String, String)> {
    let mut tail = target.components().rev().filter_map(|c| match c {
        Component::Normal(part) => part.to_str(),
        _ => None,
    });
    let (Some(object_name), Some(instance)) = (tail.next(), tail.next()) else {
        return Err(malformed(target));
    };
    let Some(split) = instance.rfind('_') else {
        return Err(malformed(target));
    };
    let (token, type_number) = (&instance[..split], &instance[split + 1..]);
    Ok((
        BackstoreType::parse(token),
        type_number.to_string(),
        object_name.to_string(),
    ))
}

fn malformed(target: &Path) -> ExporterError {
    ExporterError::Lookup(format!(
        "malformed backstore link target {}",
        target.display()
    ))
}
