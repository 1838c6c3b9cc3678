use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub lio: LioConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Roots of the two kernel pseudo-filesystem trees the collector reads.
#[derive(Debug, Deserialize, Clone)]
pub struct LioConfig {
    #[serde(default = "default_sysfs_path")]
    pub sysfs_path: String,
    #[serde(default = "default_configfs_path")]
    pub configfs_path: String,
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9638
}

fn default_sysfs_path() -> String {
    "/sys".to_string()
}

fn default_configfs_path() -> String {
    "/sys/kernel/config".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
        }
    }
}

impl Default for LioConfig {
    fn default() -> Self {
        Self {
            sysfs_path: default_sysfs_path(),
            configfs_path: default_configfs_path(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("LIO_EXPORTER").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
