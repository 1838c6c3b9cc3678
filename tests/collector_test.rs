//! Collection-cycle tests against an in-memory pseudo-filesystem.

mod common;

use common::FakeFs;
use lio_exporter::collectors::LioCollector;
use lio_exporter::config::LioConfig;
use lio_exporter::error::ExporterError;
use lio_exporter::metrics::Sample;
use std::sync::Arc;
use tokio::sync::mpsc;

const CONFIGFS: &str = "/cfg";
const SYSFS: &str = "/sysfs";

fn collector(fs: FakeFs) -> LioCollector {
    let config = LioConfig {
        sysfs_path: SYSFS.to_string(),
        configfs_path: CONFIGFS.to_string(),
    };
    LioCollector::new(Arc::new(fs), &config)
}

/// Run one cycle and drain everything it emitted.
fn run_cycle(collector: &LioCollector) -> Vec<Sample> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    collector.collect(&tx).expect("cycle should not fail");
    drop(tx);
    let mut samples = Vec::new();
    while let Ok(sample) = rx.try_recv() {
        samples.push(sample);
    }
    samples
}

fn lun_stats(fs: FakeFs, iqn: &str, tpgt: &str, lun: &str, read: &str, write: &str, ops: &str) -> FakeFs {
    let base = format!("{CONFIGFS}/target/iscsi/{iqn}/tpgt_{tpgt}/lun/lun_{lun}/statistics/scsi_tgt_port");
    fs.file(&format!("{base}/read_mbytes"), read)
        .file(&format!("{base}/write_mbytes"), write)
        .file(&format!("{base}/in_cmds"), ops)
}

/// The canonical single-LUN fileio layout: one enabled target `iqn.test:1`,
/// portal group 1, LUN 0 backed by `fileio_3/obj1`.
fn fileio_fixture(enabled: &str) -> FakeFs {
    let fs = FakeFs::new()
        .file("/cfg/target/iscsi/iqn.test:1/tpgt_1/enable", enabled)
        .link(
            "/cfg/target/iscsi/iqn.test:1/tpgt_1/lun/lun_0/obj1",
            "../../../../../../target/core/fileio_3/obj1",
        )
        .file("/cfg/target/core/fileio_3/obj1/udev_path", "/backing/file.img\n");
    lun_stats(fs, "iqn.test:1", "1", "0", "2\n", "1\n", "10\n")
}

#[test]
fn fileio_end_to_end() {
    // Given: one enabled fileio LUN with read=2, write=1, ops=10
    let collector = collector(fileio_fixture("1\n"));

    // When: running one collection cycle
    let samples = run_cycle(&collector);

    // Then: exactly three samples, read/write converted MiB -> bytes
    assert_eq!(samples.len(), 3);
    assert_eq!(samples[0].desc.fq_name(), "lio_fileio_read_total");
    assert_eq!(samples[0].value, 2_097_152.0);
    assert_eq!(samples[1].desc.fq_name(), "lio_fileio_write_total");
    assert_eq!(samples[1].value, 1_048_576.0);
    assert_eq!(samples[2].desc.fq_name(), "lio_fileio_iops_total");
    assert_eq!(samples[2].value, 10.0);

    let expected_labels = vec![
        "iqn.test:1".to_string(),
        "1".to_string(),
        "0".to_string(),
        "fileio_3".to_string(),
        "obj1".to_string(),
        "/backing/file.img".to_string(),
    ];
    for sample in &samples {
        assert_eq!(sample.labels, expected_labels);
    }
}

#[test]
fn disabled_port_group_emits_nothing() {
    // Given: the same LUN but with its portal group disabled
    let collector = collector(fileio_fixture("0\n"));

    // Then: zero samples, no error
    assert!(run_cycle(&collector).is_empty());
}

#[test]
fn enabled_and_disabled_groups_mix() {
    // Given: tpgt_1 disabled, tpgt_2 enabled, one fileio LUN each
    let fs = FakeFs::new()
        .file("/cfg/target/iscsi/iqn.test:1/tpgt_1/enable", "0\n")
        .link(
            "/cfg/target/iscsi/iqn.test:1/tpgt_1/lun/lun_0/obj1",
            "../../../../../../target/core/fileio_3/obj1",
        )
        .file("/cfg/target/iscsi/iqn.test:1/tpgt_2/enable", "1\n")
        .link(
            "/cfg/target/iscsi/iqn.test:1/tpgt_2/lun/lun_0/obj1",
            "../../../../../../target/core/fileio_3/obj1",
        )
        .file("/cfg/target/core/fileio_3/obj1/udev_path", "/backing/file.img\n");
    let fs = lun_stats(fs, "iqn.test:1", "2", "0", "5\n", "4\n", "3\n");
    let collector = collector(fs);

    // When: running one cycle
    let samples = run_cycle(&collector);

    // Then: only the enabled group's LUN is represented
    assert_eq!(samples.len(), 3);
    for sample in &samples {
        assert_eq!(sample.labels[1], "2", "expected only tpgt 2 samples");
    }
}

#[test]
fn unknown_backstore_type_is_skipped_without_error() {
    // Given: a LUN whose link points at an unrecognized backstore kind
    let fs = FakeFs::new()
        .file("/cfg/target/iscsi/iqn.test:1/tpgt_1/enable", "1\n")
        .link(
            "/cfg/target/iscsi/iqn.test:1/tpgt_1/lun/lun_0/mem0",
            "../../../../../../target/core/ramdisk_7/mem0",
        );
    let collector = collector(fs);

    // Then: the LUN is silently skipped
    assert!(run_cycle(&collector).is_empty());
}

#[test]
fn iblock_end_to_end() {
    let fs = FakeFs::new()
        .file("/cfg/target/iscsi/iqn.test:1/tpgt_1/enable", "1\n")
        .link(
            "/cfg/target/iscsi/iqn.test:1/tpgt_1/lun/lun_0/block0",
            "../../../../../../target/core/iblock_0/block0",
        )
        .file("/cfg/target/core/iblock_0/block0/udev_path", "/dev/sdb\n");
    let fs = lun_stats(fs, "iqn.test:1", "1", "0", "8\n", "6\n", "20\n");
    let collector = collector(fs);

    let samples = run_cycle(&collector);

    assert_eq!(samples.len(), 3);
    assert_eq!(samples[0].desc.fq_name(), "lio_iblock_read_total");
    assert_eq!(samples[0].value, 8.0 * 1_048_576.0);
    let expected_labels = vec![
        "iqn.test:1".to_string(),
        "1".to_string(),
        "0".to_string(),
        "iblock_0".to_string(),
        "block0".to_string(),
        "/dev/sdb".to_string(),
    ];
    assert_eq!(samples[0].labels, expected_labels);
}

fn rbd_fixture() -> FakeFs {
    let fs = FakeFs::new()
        .file("/cfg/target/iscsi/iqn.test:1/tpgt_1/enable", "1\n")
        .link(
            "/cfg/target/iscsi/iqn.test:1/tpgt_1/lun/lun_0/p2-i2",
            "../../../../../../target/core/rbd_0/p2-i2",
        );
    lun_stats(fs, "iqn.test:1", "1", "0", "4\n", "3\n", "7\n")
}

#[test]
fn rbd_two_stage_join_selects_matching_device() {
    // Given: two mapped RBD devices and a LUN whose composite object name
    // matches the second one
    let fs = rbd_fixture()
        .file("/sysfs/devices/rbd/1/pool", "p1\n")
        .file("/sysfs/devices/rbd/1/name", "i1\n")
        .file("/sysfs/devices/rbd/2/pool", "p2\n")
        .file("/sysfs/devices/rbd/2/name", "i2\n");
    let collector = collector(fs);

    // When: running one cycle
    let samples = run_cycle(&collector);

    // Then: device 2's identity is attached, not device 1's
    assert_eq!(samples.len(), 3);
    let expected_labels = vec![
        "iqn.test:1".to_string(),
        "1".to_string(),
        "0".to_string(),
        "rbd_2".to_string(),
        "p2".to_string(),
        "i2".to_string(),
    ];
    for sample in &samples {
        assert_eq!(sample.labels, expected_labels);
    }
    assert_eq!(samples[0].value, 4.0 * 1_048_576.0);
    assert_eq!(samples[2].value, 7.0);
}

#[test]
fn rbd_without_matching_device_is_silent() {
    // Given: mapped devices exist but none matches the composite name
    let fs = rbd_fixture()
        .file("/sysfs/devices/rbd/0/pool", "other\n")
        .file("/sysfs/devices/rbd/0/name", "image\n");
    let collector = collector(fs);

    // Then: no samples and no error
    assert!(run_cycle(&collector).is_empty());
}

#[test]
fn rbd_device_tree_absent_is_silent() {
    // Given: no /sys/devices/rbd tree at all
    let collector = collector(rbd_fixture());

    assert!(run_cycle(&collector).is_empty());
}

#[test]
fn rdmcp_present_emits_object_labels() {
    let fs = FakeFs::new()
        .file("/cfg/target/iscsi/iqn.test:1/tpgt_1/enable", "1\n")
        .link(
            "/cfg/target/iscsi/iqn.test:1/tpgt_1/lun/lun_0/ram0",
            "../../../../../../target/core/rdmcp_0/ram0",
        )
        .dir("/cfg/target/core/rdmcp_0/ram0");
    let fs = lun_stats(fs, "iqn.test:1", "1", "0", "1\n", "1\n", "2\n");
    let collector = collector(fs);

    let samples = run_cycle(&collector);

    assert_eq!(samples.len(), 3);
    let expected_labels = vec![
        "iqn.test:1".to_string(),
        "1".to_string(),
        "0".to_string(),
        "rdmcp_0".to_string(),
        "ram0".to_string(),
    ];
    assert_eq!(samples[0].labels, expected_labels);
}

#[test]
fn rdmcp_absent_is_silent() {
    // Given: the rdmcp core directory is gone
    let fs = FakeFs::new()
        .file("/cfg/target/iscsi/iqn.test:1/tpgt_1/enable", "1\n")
        .link(
            "/cfg/target/iscsi/iqn.test:1/tpgt_1/lun/lun_0/ram0",
            "../../../../../../target/core/rdmcp_0/ram0",
        );
    let collector = collector(fs);

    assert!(run_cycle(&collector).is_empty());
}

#[test]
fn missing_configfs_tree_degrades_to_empty() {
    // Given: nothing at all (kernel target module not loaded)
    let collector = collector(FakeFs::new());

    // Then: a clean, empty cycle
    assert!(run_cycle(&collector).is_empty());
}

#[test]
fn missing_counters_abort_cycle_without_error() {
    // Given: a resolvable fileio LUN whose in_cmds counter is missing
    let fs = FakeFs::new()
        .file("/cfg/target/iscsi/iqn.test:1/tpgt_1/enable", "1\n")
        .link(
            "/cfg/target/iscsi/iqn.test:1/tpgt_1/lun/lun_0/obj1",
            "../../../../../../target/core/fileio_3/obj1",
        )
        .file("/cfg/target/core/fileio_3/obj1/udev_path", "/backing/file.img\n")
        .file(
            "/cfg/target/iscsi/iqn.test:1/tpgt_1/lun/lun_0/statistics/scsi_tgt_port/read_mbytes",
            "2\n",
        )
        .file(
            "/cfg/target/iscsi/iqn.test:1/tpgt_1/lun/lun_0/statistics/scsi_tgt_port/write_mbytes",
            "1\n",
        );
    let collector = collector(fs);

    // Then: nothing emitted for that LUN, cycle still reports Ok
    assert!(run_cycle(&collector).is_empty());
}

#[test]
fn lookup_failure_aborts_remainder_of_cycle() {
    // Given: lun_0 is fully resolvable, lun_1's core directory is missing
    let fs = fileio_fixture("1\n").link(
        "/cfg/target/iscsi/iqn.test:1/tpgt_1/lun/lun_1/obj2",
        "../../../../../../target/core/fileio_4/obj2",
    );
    let fs = lun_stats(fs, "iqn.test:1", "1", "1", "9\n", "9\n", "9\n");
    let collector = collector(fs);

    // When: running one cycle
    let samples = run_cycle(&collector);

    // Then: the samples emitted before the failure stand, nothing after
    assert_eq!(samples.len(), 3);
    for sample in &samples {
        assert_eq!(sample.labels[2], "0", "only lun 0 should have emitted");
    }
}

#[test]
fn closed_sink_is_fatal_to_the_cycle() {
    let collector = collector(fileio_fixture("1\n"));
    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);

    let result = collector.collect(&tx);
    assert!(matches!(result, Err(ExporterError::SinkClosed)));
}

#[test]
fn consecutive_cycles_are_idempotent() {
    // Given: unchanged filesystem state across two cycles
    let collector = collector(fileio_fixture("1\n"));

    let first = run_cycle(&collector);
    let second = run_cycle(&collector);

    // Then: identical descriptors, labels and values
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.desc.fq_name(), b.desc.fq_name());
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.value.to_bits(), b.value.to_bits());
    }
}
