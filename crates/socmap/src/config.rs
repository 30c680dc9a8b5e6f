//! Platform configuration for a build.
//!
//! This module defines the settings read at the root of the composition. It provides:
//! 1. **Defaults:** Baseline values used when a key is absent.
//! 2. **Structure:** `PlatformConfig` with the top base address, per-peripheral addressing
//!    overrides, and the listing switch.
//!
//! Configuration is supplied as JSON (addresses may be numbers or `"0x..."` strings), or built
//! directly with `PlatformConfig::with_base`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::common::addr::deserialize_opt_literal;
use crate::common::error::LoadError;
use crate::design::Addressing;

/// Default configuration values.
mod defaults {
    /// Log the flattened memory map after a successful build.
    pub const LOG_MEMORYMAP: bool = true;

    pub const fn log_memorymap() -> bool {
        LOG_MEMORYMAP
    }
}

/// Root configuration of a build.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PlatformConfig {
    /// Absolute base address of the top memory map; address assignment fails without it.
    #[serde(default, deserialize_with = "deserialize_opt_literal")]
    pub base_address: Option<u64>,

    /// Addressing overrides keyed by peripheral label.
    #[serde(default)]
    pub peripherals: BTreeMap<String, Addressing>,

    /// Emit the human-readable listing through `tracing` after export.
    #[serde(default = "defaults::log_memorymap")]
    pub log_memorymap: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_address: None,
            peripherals: BTreeMap::new(),
            log_memorymap: defaults::LOG_MEMORYMAP,
        }
    }
}

impl PlatformConfig {
    /// Creates a configuration with the given top base address.
    pub fn with_base(base_address: u64) -> Self {
        Self {
            base_address: Some(base_address),
            ..Self::default()
        }
    }

    /// Overrides the addressing of the peripheral labelled `label`.
    #[must_use]
    pub fn with_peripheral(mut self, label: impl Into<String>, addressing: Addressing) -> Self {
        let _ = self.peripherals.insert(label.into(), addressing);
        self
    }

    /// Parses a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads and parses a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Returns the addressing override for a peripheral label, if any.
    pub fn addressing_for(&self, label: &str) -> Option<Addressing> {
        self.peripherals.get(label).copied()
    }
}
