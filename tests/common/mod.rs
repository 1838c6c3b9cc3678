//! In-memory pseudo-filesystem fake shared by the integration tests.

use lio_exporter::error::{ExporterError, Result};
use lio_exporter::fs::PseudoFs;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// A `PseudoFs` over in-memory maps. Parent directories of every inserted
/// node are created implicitly, and listings come back sorted like the real
/// implementation's.
#[derive(Default)]
pub struct FakeFs {
    files: BTreeMap<PathBuf, String>,
    links: BTreeMap<PathBuf, PathBuf>,
    dirs: BTreeSet<PathBuf>,
}

impl FakeFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: &str, contents: &str) -> Self {
        let path = PathBuf::from(path);
        self.add_ancestors(&path);
        self.files.insert(path, contents.to_string());
        self
    }

    pub fn link(mut self, path: &str, target: &str) -> Self {
        let path = PathBuf::from(path);
        self.add_ancestors(&path);
        self.links.insert(path, PathBuf::from(target));
        self
    }

    pub fn dir(mut self, path: &str) -> Self {
        let path = PathBuf::from(path);
        self.add_ancestors(&path);
        self.dirs.insert(path);
        self
    }

    fn add_ancestors(&mut self, path: &Path) {
        let mut current = path.parent();
        while let Some(parent) = current {
            if parent.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(parent.to_path_buf());
            current = parent.parent();
        }
    }

    fn not_found(path: &Path) -> ExporterError {
        ExporterError::NotFound(path.to_path_buf())
    }
}

impl PseudoFs for FakeFs {
    fn read_file(&self, path: &Path) -> Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| Self::not_found(path))
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf> {
        self.links
            .get(path)
            .cloned()
            .ok_or_else(|| Self::not_found(path))
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>> {
        if !self.dirs.contains(path) {
            return Err(Self::not_found(path));
        }
        let mut names: Vec<String> = self
            .files
            .keys()
            .chain(self.links.keys())
            .chain(self.dirs.iter())
            .filter(|candidate| candidate.parent() == Some(path))
            .filter_map(|candidate| candidate.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}
