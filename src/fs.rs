//! Pseudo-Filesystem Access
//!
//! Thin reader abstraction over the kernel pseudo-filesystems (configfs and
//! sysfs) the collector walks. Everything the collector learns about the
//! target topology comes through these three operations, which keeps the
//! walk testable against an in-memory tree.
//!
//! `NotFound` is a first-class outcome here, not an exceptional one: a
//! missing configfs tree means the target subsystem is not loaded, and a
//! missing backstore directory means "no identity this cycle".

use crate::error::{ExporterError, Result};
use std::path::{Path, PathBuf};

/// Read access to a pseudo-filesystem tree.
pub trait PseudoFs: Send + Sync {
    /// Read a file's contents as UTF-8 text.
    fn read_file(&self, path: &Path) -> Result<String>;

    /// Resolve a symbolic link's target path (not followed).
    fn read_link(&self, path: &Path) -> Result<PathBuf>;

    /// List a directory's entry names, in a stable order.
    fn list_dir(&self, path: &Path) -> Result<Vec<String>>;
}

/// [`PseudoFs`] backed by the real filesystem.
pub struct SysFs;

impl PseudoFs for SysFs {
    fn read_file(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| map_io(path, e))
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf> {
        std::fs::read_link(path).map_err(|e| map_io(path, e))
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(path).map_err(|e| map_io(path, e))? {
            let entry = entry.map_err(|e| map_io(path, e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        // read_dir order is not stable across scans
        names.sort();
        Ok(names)
    }
}

fn map_io(path: &Path, err: std::io::Error) -> ExporterError {
    if err.kind() == std::io::ErrorKind::NotFound {
        ExporterError::NotFound(path.to_path_buf())
    } else {
        ExporterError::Io(err)
    }
}
