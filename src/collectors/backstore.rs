//! Backstore Adapters
//!
//! One resolver per known backstore type. fileio and iblock are
//! deterministic: the CorrelationKey's hints name the exact core directory.
//! rbd needs a two-stage join through the sysfs device tree, and rdmcp is a
//! bare directory-presence probe.
//!
//! `Ok(None)` from the rbd and rdmcp resolvers means "no identity this
//! cycle" and produces no samples; only an unreadable path is an error.

use crate::error::{ExporterError, Result};
use crate::fs::PseudoFs;
use std::path::Path;

const TARGET_CORE_DIR: &str = "target/core";
const RBD_DEVICE_DIR: &str = "devices/rbd";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileioIdentity {
    pub name: String,
    pub object_name: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IblockIdentity {
    pub name: String,
    pub object_name: String,
    pub block_device: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RbdIdentity {
    pub name: String,
    pub pool: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdmcpIdentity {
    pub name: String,
    pub object_name: String,
}

/// `{configfs}/target/core/fileio_{n}/{object}/udev_path` names the backing
/// file.
pub fn fileio_identity(
    fs: &dyn PseudoFs,
    configfs: &Path,
    type_number: &str,
    object_name: &str,
) -> Result<FileioIdentity> {
    let name = format!("fileio_{type_number}");
    let filename = read_udev_path(fs, configfs, &name, object_name)?;
    Ok(FileioIdentity {
        name,
        object_name: object_name.to_string(),
        filename,
    })
}

/// `{configfs}/target/core/iblock_{n}/{object}/udev_path` names the backing
/// block device.
pub fn iblock_identity(
    fs: &dyn PseudoFs,
    configfs: &Path,
    type_number: &str,
    object_name: &str,
) -> Result<IblockIdentity> {
    let name = format!("iblock_{type_number}");
    let block_device = read_udev_path(fs, configfs, &name, object_name)?;
    Ok(IblockIdentity {
        name,
        object_name: object_name.to_string(),
        block_device,
    })
}

fn read_udev_path(
    fs: &dyn PseudoFs,
    configfs: &Path,
    name: &str,
    object_name: &str,
) -> Result<String> {
    let path = configfs
        .join(TARGET_CORE_DIR)
        .join(name)
        .join(object_name)
        .join("udev_path");
    let contents = fs
        .read_file(&path)
        .map_err(|e| ExporterError::Lookup(format!("{name}/{object_name}: {e}")))?;
    Ok(contents.trim().to_string())
}

/// Two-stage join for RBD-backed LUNs.
///
/// The export-side symlink only encodes a `{pool}-{image}` composite as the
/// object name; the authoritative pool and image fields live under
/// `{sysfs}/devices/rbd/{id}/`. Scan the numeric device directories and
/// return the first whose composite matches. No matching device means the
/// mapping is gone, which is a normal state, not an error.
pub fn rbd_identity(
    fs: &dyn PseudoFs,
    sysfs: &Path,
    object_name: &str,
) -> Result<Option<RbdIdentity>> {
    let base = sysfs.join(RBD_DEVICE_DIR);
    let entries = match fs.list_dir(&base) {
        Ok(entries) => entries,
        Err(ExporterError::NotFound(_)) => return Ok(None),
        Err(e) => return Err(ExporterError::Lookup(format!("rbd devices: {e}"))),
    };

    for entry in entries {
        if !entry.chars().all(|c| c.is_ascii_digit()) || entry.is_empty() {
            continue;
        }
        let device = base.join(&entry);
        let pool = read_attr(fs, &device, "pool")?;
        let image = read_attr(fs, &device, "name")?;
        if format!("{pool}-{image}") == object_name {
            return Ok(Some(RbdIdentity {
                name: format!("rbd_{entry}"),
                pool,
                image,
            }));
        }
    }

    Ok(None)
}

fn read_attr(fs: &dyn PseudoFs, device: &Path, attr: &str) -> Result<String> {
    let path = device.join(attr);
    let contents = fs
        .read_file(&path)
        .map_err(|e| ExporterError::Lookup(format!("rbd device attribute {attr}: {e}")))?;
    Ok(contents.trim().to_string())
}

/// RAM disks have no backing file, so the identity is just the core
/// directory itself. A missing directory means "unmapped", not an error.
pub fn rdmcp_identity(
    fs: &dyn PseudoFs,
    configfs: &Path,
    type_number: &str,
    object_name: &str,
) -> Result<Option<RdmcpIdentity>> {
    let name = format!("rdmcp_{type_number}");
    let dir = configfs.join(TARGET_CORE_DIR).join(&name).join(object_name);
    match fs.list_dir(&dir) {
        Ok(_) => Ok(Some(RdmcpIdentity {
            name,
            object_name: object_name.to_string(),
        })),
        Err(ExporterError::NotFound(_)) => Ok(None),
        Err(e) => Err(ExporterError::Lookup(format!("{name}/{object_name}: {e}"))),
    }
}
