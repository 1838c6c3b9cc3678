//! iSCSI LIO Prometheus Exporter
//!
//! A Prometheus metrics exporter for Linux iSCSI target (LIO) statistics.
//!
//! # Overview
//!
//! The exporter discovers the LIO export topology from two parallel kernel
//! pseudo-filesystem trees and correlates each exported LUN with its backing
//! storage object. Export records live under configfs, keyed by
//! IQN/TPGT/LUN; backstore identities and I/O counters live under a second,
//! differently keyed tree, joined only through a symbolic link. Per-LUN
//! read/write/IOPS counters are exposed in Prometheus format.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐   read-only    ┌──────────────┐
//! │ configfs /    │ ◄───────────── │   Exporter   │
//! │ sysfs (LIO)   │    walk        │              │
//! └───────────────┘                │ ┌──────────┐ │      HTTP      ┌────────────┐
//!                                  │ │Collector │ │ ◄────────────► │ Prometheus │
//!                                  │ └────┬─────┘ │   /metrics     └────────────┘
//!                                  │      ▼       │
//!                                  │ ┌──────────┐ │
//!                                  │ │ Samples  │ │
//!                                  │ └──────────┘ │
//!                                  └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`collectors`] - topology walk, backstore adapters, counter reader
//! - [`fs`] - pseudo-filesystem access trait
//! - [`metrics`] - metric descriptors and sample rendering
//! - [`server`] - HTTP server and scrape handling
//! - [`config`] - configuration management
//! - [`error`] - error types
//!
//! # Quick Start
//!
//! ```no_run
//! use lio_exporter::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/Default.toml")?;
//!     server::start(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - ✅ Per-LUN read/write/IOPS counters for every enabled portal group
//! - ✅ fileio, iblock, rbd and rdmcp backstore correlation
//! - ✅ RBD pool/image resolution through the sysfs device tree
//! - ✅ Graceful empty scrapes when the target subsystem is not loaded
//! - ✅ Strictly read-only; never touches target configuration

pub mod collectors;
pub mod config;
pub mod error;
pub mod fs;
pub mod metrics;
pub mod server;
