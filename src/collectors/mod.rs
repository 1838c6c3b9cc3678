//! LIO Collection Cycle
//!
//! The correlation engine: walk every exported LUN recorded under the
//! configfs export tree, join it to its backstore identity through the
//! parsed symlink, read its counters, and emit three labeled samples per
//! resolved LUN.
//!
//! # Architecture
//!
//! - [`topology`] scans the export tree into `Target`/`PortGroup`/`LunEntry`
//! - [`backstore`] resolves a LUN's identity, dispatched by backstore type
//! - [`stats`] reads the raw per-LUN counters
//! - [`LioCollector::collect`] drives one full cycle and pushes samples into
//!   the sink channel
//!
//! # Error Handling
//!
//! An unreadable configfs tree means the target subsystem is not loaded;
//! the cycle degrades to zero samples and that is not an error. A single
//! LUN failure aborts the remainder of the cycle at warn severity, keeping
//! whatever was already emitted. Only a closed sink propagates to the
//! caller. Nothing here ever aborts the process.

use crate::config::LioConfig;
use crate::error::{ExporterError, Result};
use crate::fs::PseudoFs;
use crate::metrics::{mib_to_bytes, push, BackstoreDescs, LioDescs, Sample, SampleSender};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

pub mod backstore;
pub mod stats;
pub mod topology;

use topology::{BackstoreType, Target};

/// Export identity plus backstore-lookup hints for one LUN. Built fresh per
/// LUN per cycle and discarded once its three samples are emitted.
#[derive(Debug, Clone)]
pub struct CorrelationKey {
    pub iqn: String,
    pub tpgt: String,
    pub lun: String,
    pub backstore: BackstoreType,
    pub object_name: String,
    pub type_number: String,
}

/// Walks the LIO topology and emits per-LUN counter samples.
///
/// Holds nothing across cycles but the filesystem handle, the two tree
/// roots and the immutable descriptor set.
pub struct LioCollector {
    fs: Arc<dyn PseudoFs>,
    descs: Arc<LioDescs>,
    sysfs: PathBuf,
    configfs: PathBuf,
}

impl LioCollector {
    pub fn new(fs: Arc<dyn PseudoFs>, config: &LioConfig) -> Self {
        Self {
            fs,
            descs: Arc::new(LioDescs::new()),
            sysfs: PathBuf::from(&config.sysfs_path),
            configfs: PathBuf::from(&config.configfs_path),
        }
    }

    pub fn descs(&self) -> Arc<LioDescs> {
        Arc::clone(&self.descs)
    }

    /// Run one collection cycle, emitting into `sink`.
    ///
    /// Returns `Ok(())` for every outcome except a closed sink, including
    /// the degrade-to-empty and abort-mid-cycle paths described in the
    /// module docs.
    pub fn collect(&self, sink: &SampleSender) -> Result<()> {
        let targets = match topology::scan(self.fs.as_ref(), &self.configfs) {
            Ok(targets) => targets,
            Err(e) => {
                // An unloaded target module is a normal deployment state.
                debug!("lio: kernel configfs may be not available: {e}");
                return Ok(());
            }
        };

        for target in &targets {
            if let Err(e) = self.collect_target(sink, target) {
                if matches!(e, ExporterError::SinkClosed) {
                    return Err(e);
                }
                warn!("lio: aborting collection cycle: {e}");
                return Ok(());
            }
        }
        Ok(())
    }

    fn collect_target(&self, sink: &SampleSender, target: &Target) -> Result<()> {
        for group in &target.port_groups {
            debug!(
                "lio: {} tpgt_{} enabled={}",
                target.iqn, group.tag, group.enabled
            );
            // Disabled groups would only add misleading series in bigger
            // clusters.
            if !group.enabled {
                continue;
            }

            for lun in &group.luns {
                let key = CorrelationKey {
                    iqn: target.iqn.clone(),
                    tpgt: group.tag.clone(),
                    lun: lun.lun.clone(),
                    backstore: lun.backstore,
                    object_name: lun.object_name.clone(),
                    type_number: lun.type_number.clone(),
                };
                debug!(
                    "lio: iqn={}, tpgt={}, lun={}, type={}, object={}, typeNumber={}",
                    key.iqn,
                    key.tpgt,
                    key.lun,
                    key.backstore.as_str(),
                    key.object_name,
                    key.type_number
                );

                match key.backstore {
                    BackstoreType::Fileio => self.collect_fileio(sink, &key)?,
                    BackstoreType::Iblock => self.collect_iblock(sink, &key)?,
                    BackstoreType::Rbd => self.collect_rbd(sink, &key)?,
                    BackstoreType::Rdmcp => self.collect_rdmcp(sink, &key)?,
                    BackstoreType::Unknown => continue,
                }
            }
        }
        Ok(())
    }

    fn collect_fileio(&self, sink: &SampleSender, key: &CorrelationKey) -> Result<()> {
        let identity = backstore::fileio_identity(
            self.fs.as_ref(),
            &self.configfs,
            &key.type_number,
            &key.object_name,
        )?;
        let labels = vec![
            key.iqn.clone(),
            key.tpgt.clone(),
            key.lun.clone(),
            identity.name,
            identity.object_name,
            identity.filename,
        ];
        self.emit(sink, &self.descs.fileio, key, labels)
    }

    fn collect_iblock(&self, sink: &SampleSender, key: &CorrelationKey) -> Result<()> {
        let identity = backstore::iblock_identity(
            self.fs.as_ref(),
            &self.configfs,
            &key.type_number,
            &key.object_name,
        )?;
        let labels = vec![
            key.iqn.clone(),
            key.tpgt.clone(),
            key.lun.clone(),
            identity.name,
            identity.object_name,
            identity.block_device,
        ];
        self.emit(sink, &self.descs.iblock, key, labels)
    }

    fn collect_rbd(&self, sink: &SampleSender, key: &CorrelationKey) -> Result<()> {
        let Some(identity) =
            backstore::rbd_identity(self.fs.as_ref(), &self.sysfs, &key.object_name)?
        else {
            return Ok(());
        };
        let labels = vec![
            key.iqn.clone(),
            key.tpgt.clone(),
            key.lun.clone(),
            identity.name,
            identity.pool,
            identity.image,
        ];
        self.emit(sink, &self.descs.rbd, key, labels)
    }

    fn collect_rdmcp(&self, sink: &SampleSender, key: &CorrelationKey) -> Result<()> {
        let Some(identity) = backstore::rdmcp_identity(
            self.fs.as_ref(),
            &self.configfs,
            &key.type_number,
            &key.object_name,
        )?
        else {
            return Ok(());
        };
        let labels = vec![
            key.iqn.clone(),
            key.tpgt.clone(),
            key.lun.clone(),
            identity.name,
            identity.object_name,
        ];
        self.emit(sink, &self.descs.rdmcp, key, labels)
    }

    /// Read the LUN's counters and push its read/write/iops samples.
    fn emit(
        &self,
        sink: &SampleSender,
        descs: &BackstoreDescs,
        key: &CorrelationKey,
        labels: Vec<String>,
    ) -> Result<()> {
        let counters = stats::read_lun_counters(
            self.fs.as_ref(),
            &self.configfs,
            &key.iqn,
            &key.tpgt,
            &key.lun,
        )?;
        push(
            sink,
            Sample {
                desc: Arc::clone(&descs.read),
                value: mib_to_bytes(counters.read_units),
                labels: labels.clone(),
            },
        )?;
        push(
            sink,
            Sample {
                desc: Arc::clone(&descs.write),
                value: mib_to_bytes(counters.write_units),
                labels: labels.clone(),
            },
        )?;
        push(
            sink,
            Sample {
                desc: Arc::clone(&descs.iops),
                value: counters.ops as f64,
                labels,
            },
        )?;
        Ok(())
    }
}
