//! External Configuration

use crate::error::{Result, ShimError};
use std::path::{Path, PathBuf};

pub const DEFAULT_DEVICE_DIR: &'static str = "/dev/input";
pub const DEFAULT_NODE_PATTERN: &'static str = "event[0-9]+$";

/// Where and how often event devices are discovered.
#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
	pub device_dir: PathBuf,
	/// matched against the full node path
	pub node_pattern: String,
	/// polling cadence for consumers that rediscover hot-plugged controllers
	pub rescan_interval_secs: u64
}
impl Default for ScanConfig {
	fn default() -> Self {
		ScanConfig {
			device_dir: PathBuf::from(DEFAULT_DEVICE_DIR),
			node_pattern: String::from(DEFAULT_NODE_PATTERN),
			rescan_interval_secs: 3
		}
	}
}
impl ScanConfig {
	pub fn load<P: AsRef<Path> + ?Sized>(path: &P) -> Result<Self> {
		let text = std::fs::read_to_string(path)?;
		Self::parse(&text)
	}
	pub fn parse(text: &str) -> Result<Self> {
		toml::from_str(text).map_err(|e| ShimError::invalid_argument(format!("config: {e}")))
	}

	pub fn node_regex(&self) -> Result<regex::Regex> {
		regex::Regex::new(&self.node_pattern)
			.map_err(|e| ShimError::invalid_argument(format!("node_pattern: {e}")))
	}
	pub fn rescan_interval(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.rescan_interval_secs)
	}
}
