//! Prometheus Metrics Definitions
//!
//! This module defines the fixed descriptor set exposed by the LIO exporter
//! and the sample stream the collector emits into.
//!
//! # Metric Categories
//!
//! Twelve counters, three per backstore type:
//! - `lio_fileio_{iops,read,write}_total` - file-backed LUNs
//! - `lio_iblock_{iops,read,write}_total` - block-device-backed LUNs
//! - `lio_rbd_{iops,read,write}_total` - RBD-backed LUNs
//! - `lio_rdmcp_{iops,read,write}_total` - RAM-disk-backed LUNs
//!
//! The descriptor set is built once at collector construction and shared
//! read-only for the process lifetime. A collection cycle produces
//! [`Sample`]s referencing those descriptors; rendering groups a drained
//! batch into a fresh `prometheus` registry and encodes it as text.
//!
//! The kernel reports read/write counters in MiB; [`mib_to_bytes`] performs
//! the exact shift-by-20 conversion to bytes.

use crate::error::{ExporterError, Result};
use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

const NAMESPACE: &str = "lio";

const FILEIO_LABELS: &[&str] = &["iqn", "tpgt", "lun", "fileio", "object", "filename"];
const IBLOCK_LABELS: &[&str] = &["iqn", "tpgt", "lun", "iblock", "object", "blockname"];
const RBD_LABELS: &[&str] = &["iqn", "tpgt", "lun", "rbd", "pool", "image"];
const RDMCP_LABELS: &[&str] = &["iqn", "tpgt", "lun", "rdmcp", "object"];

/// Sending half of the sample channel a collection cycle emits into.
pub type SampleSender = mpsc::UnboundedSender<Sample>;
/// Receiving half, drained by the scrape handler.
pub type SampleReceiver = mpsc::UnboundedReceiver<Sample>;

/// Prometheus value semantics of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Counter,
    Gauge,
}

/// Immutable description of one exported metric.
#[derive(Debug)]
pub struct MetricDesc {
    pub subsystem: &'static str,
    pub name: &'static str,
    pub help: String,
    pub kind: ValueKind,
    pub label_names: &'static [&'static str],
}

impl MetricDesc {
    fn counter(
        subsystem: &'static str,
        name: &'static str,
        help: String,
        label_names: &'static [&'static str],
    ) -> Arc<Self> {
        Arc::new(Self {
            subsystem,
            name,
            help,
            kind: ValueKind::Counter,
            label_names,
        })
    }

    /// Fully qualified metric name, e.g. `lio_fileio_iops_total`.
    pub fn fq_name(&self) -> String {
        format!("{}_{}_{}", NAMESPACE, self.subsystem, self.name)
    }
}

/// One labeled measurement, pushed onto the sample channel by the emitter.
#[derive(Debug, Clone)]
pub struct Sample {
    pub desc: Arc<MetricDesc>,
    pub value: f64,
    pub labels: Vec<String>,
}

/// The iops/read/write descriptor trio of one backstore type.
pub struct BackstoreDescs {
    pub iops: Arc<MetricDesc>,
    pub read: Arc<MetricDesc>,
    pub write: Arc<MetricDesc>,
}

impl BackstoreDescs {
    fn new(
        subsystem: &'static str,
        display: &str,
        label_names: &'static [&'static str],
    ) -> Self {
        Self {
            iops: MetricDesc::counter(
                subsystem,
                "iops_total",
                format!("iSCSI {display} backstore transport operations."),
                label_names,
            ),
            read: MetricDesc::counter(
                subsystem,
                "read_total",
                format!("iSCSI {display} backstore Read in byte."),
                label_names,
            ),
            write: MetricDesc::counter(
                subsystem,
                "write_total",
                format!("iSCSI {display} backstore Write in byte."),
                label_names,
            ),
        }
    }
}

/// The full, fixed descriptor set. Constructed once, shared via `Arc`.
pub struct LioDescs {
    pub fileio: BackstoreDescs,
    pub iblock: BackstoreDescs,
    pub rbd: BackstoreDescs,
    pub rdmcp: BackstoreDescs,
}

impl LioDescs {
    pub fn new() -> Self {
        Self {
            fileio: BackstoreDescs::new("fileio", "FileIO", FILEIO_LABELS),
            iblock: BackstoreDescs::new("iblock", "IBlock", IBLOCK_LABELS),
            rbd: BackstoreDescs::new("rbd", "RBD", RBD_LABELS),
            rdmcp: BackstoreDescs::new("rdmcp", "Memory Copy RAMDisk", RDMCP_LABELS),
        }
    }

    pub fn all(&self) -> [&Arc<MetricDesc>; 12] {
        [
            &self.fileio.iops,
            &self.fileio.read,
            &self.fileio.write,
            &self.iblock.iops,
            &self.iblock.read,
            &self.iblock.write,
            &self.rbd.iops,
            &self.rbd.read,
            &self.rbd.write,
            &self.rdmcp.iops,
            &self.rdmcp.read,
            &self.rdmcp.write,
        ]
    }

    /// Render a drained sample batch in Prometheus text format.
    ///
    /// Each scrape gets a fresh registry; counters carry cumulative values
    /// read from the kernel, so a new vec incremented once per sample
    /// reproduces them exactly.
    pub fn render(&self, samples: &[Sample]) -> anyhow::Result<String> {
        let registry = Registry::new();
        let mut vecs: HashMap<String, VecHandle> = HashMap::new();

        for desc in self.all() {
            let opts = Opts::new(desc.name, desc.help.clone())
                .namespace(NAMESPACE)
                .subsystem(desc.subsystem);
            let handle = match desc.kind {
                ValueKind::Counter => {
                    let vec = CounterVec::new(opts, desc.label_names)?;
                    registry.register(Box::new(vec.clone()))?;
                    VecHandle::Counter(vec)
                }
                ValueKind::Gauge => {
                    let vec = GaugeVec::new(opts, desc.label_names)?;
                    registry.register(Box::new(vec.clone()))?;
                    VecHandle::Gauge(vec)
                }
            };
            vecs.insert(desc.fq_name(), handle);
        }

        for sample in samples {
            let labels: Vec<&str> = sample.labels.iter().map(String::as_str).collect();
            match vecs.get(&sample.desc.fq_name()) {
                Some(VecHandle::Counter(vec)) => {
                    vec.get_metric_with_label_values(&labels)?.inc_by(sample.value);
                }
                Some(VecHandle::Gauge(vec)) => {
                    vec.get_metric_with_label_values(&labels)?.set(sample.value);
                }
                None => anyhow::bail!("sample for unknown descriptor {}", sample.desc.fq_name()),
            }
        }

        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for LioDescs {
    fn default() -> Self {
        Self::new()
    }
}

enum VecHandle {
    Counter(CounterVec),
    Gauge(GaugeVec),
}

/// Exact MiB-to-byte conversion: `1 unit = 1,048,576 bytes`.
///
/// The shift happens in integer space before the float cast, so counters up
/// to 2^44 MiB convert losslessly.
pub fn mib_to_bytes(units: u64) -> f64 {
    (units << 20) as f64
}

/// Push one sample onto the sink. A closed sink is fatal to the cycle.
pub fn push(sink: &SampleSender, sample: Sample) -> Result<()> {
    sink.send(sample).map_err(|_| ExporterError::SinkClosed)
}
