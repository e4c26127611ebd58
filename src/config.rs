//! Run configuration.
//!
//! Everything that would otherwise be process-global (I/O constructor
//! markers, opaque aliases, schema rules) lives here and is passed into the
//! generation run read-only.
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::schema::RuleSources;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenConfig {
    /// Marker types tried, in order, when looking for an I/O constructor.
    /// `""` stands for the default constructor.
    pub io_constructor_types: Vec<String>,
    /// Aliases that are never desugared.
    pub opaque_aliases: Vec<String>,
    pub rules: RuleSources,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            io_constructor_types: vec!["TRootIOCtor".into(), String::new()],
            opaque_aliases: vec!["Double32_t".into(), "Float16_t".into()],
            rules: RuleSources::default(),
        }
    }
}

impl GenConfig {
    pub fn from_json_str(src: &str) -> Result<Self> {
        crate::path_de::from_str_with_path(src).map_err(|e| anyhow!("invalid configuration {e}"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json_str(&src).with_context(|| format!("in {}", path.display()))
    }

    /// Apply command-line additions. Extra marker types are tried before the
    /// configured ones.
    pub fn with_overrides(mut self, io_ctors: &[String], opaque: &[String]) -> Self {
        if !io_ctors.is_empty() {
            let mut markers = io_ctors.to_vec();
            markers.extend(self.io_constructor_types.into_iter().filter(|m| !io_ctors.contains(m)));
            self.io_constructor_types = markers;
        }
        for alias in opaque {
            if !self.opaque_aliases.contains(alias) {
                self.opaque_aliases.push(alias.clone());
            }
        }
        self
    }
}
