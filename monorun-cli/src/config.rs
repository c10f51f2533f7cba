//! Layered CLI configuration: embedded defaults, optional user file, flags.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use monorun_core::PipelineConfig;
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl CliConfig {
    /// Configuration shipped with the binary.
    pub fn embedded() -> Result<Self> {
        toml::from_str(DEFAULT_CONFIG).context("embedded default config is invalid")
    }

    /// Apply command-line overrides; unset flags leave values alone.
    pub fn apply(&mut self, overrides: &Overrides) {
        let pipeline = &mut self.pipeline;
        if let Some(queue_capacity) = overrides.queue_capacity {
            pipeline.queue_capacity = queue_capacity;
        }
        if let Some(batch_size) = overrides.batch_size {
            pipeline.batch_size = batch_size;
        }
        if let Some(max_concurrency) = overrides.max_concurrency {
            pipeline.analyzer.max_concurrency = Some(max_concurrency);
        }
        if let Some(initial_capacity) = overrides.initial_capacity {
            pipeline.analyzer.initial_stream_capacity = initial_capacity;
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to render configuration")
    }
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    pub queue_capacity: Option<usize>,
    pub batch_size: Option<usize>,
    pub max_concurrency: Option<usize>,
    pub initial_capacity: Option<usize>,
}

pub struct ConfigManager {
    path: Option<PathBuf>,
    config: CliConfig,
}

impl ConfigManager {
    /// Embedded defaults only.
    pub fn load() -> Result<Self> {
        Ok(Self {
            path: None,
            config: CliConfig::embedded()?,
        })
    }

    /// Embedded defaults with the file at `path` layered on top.
    ///
    /// Keys missing from the file keep their default values.
    pub fn load_with_path<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let user: toml::Table = toml::from_str(&contents)
            .with_context(|| format!("invalid config at {}", path.display()))?;

        let mut merged: toml::Table =
            toml::from_str(DEFAULT_CONFIG).context("embedded default config is invalid")?;
        merge_tables(&mut merged, user);
        let config: CliConfig = toml::Value::Table(merged)
            .try_into()
            .with_context(|| format!("invalid config at {}", path.display()))?;

        Ok(Self {
            path: Some(path),
            config,
        })
    }

    /// Load from `path` when given, otherwise embedded defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(Self::load, Self::load_with_path)
    }

    #[must_use]
    pub const fn config(&self) -> &CliConfig {
        &self.config
    }

    pub const fn config_mut(&mut self) -> &mut CliConfig {
        &mut self.config
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

// Tables carrying a `mode` tag select an enum variant and replace wholesale.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table))
                if !overlay_table.contains_key("mode") =>
            {
                merge_tables(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_matches_library_defaults() {
        assert_eq!(CliConfig::embedded().unwrap(), CliConfig::default());
    }

    #[test]
    fn test_merge_replaces_leaves_and_keeps_siblings() {
        let mut base: toml::Table = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Table = toml::from_str("[a]\ny = 3\n").unwrap();

        merge_tables(&mut base, overlay);

        assert_eq!(base["a"]["x"].as_integer(), Some(1));
        assert_eq!(base["a"]["y"].as_integer(), Some(3));
    }

    #[test]
    fn test_tagged_table_replaced_not_merged() {
        let mut base: toml::Table =
            toml::from_str("[p]\nmode = \"pooled\"\nmax_retained_per_bucket = 16\n").unwrap();
        let overlay: toml::Table = toml::from_str("[p]\nmode = \"disabled\"\n").unwrap();

        merge_tables(&mut base, overlay);

        assert_eq!(base["p"]["mode"].as_str(), Some("disabled"));
        assert!(base["p"].get("max_retained_per_bucket").is_none());
    }

    #[test]
    fn test_overrides_apply_only_set_values() {
        let mut config = CliConfig::default();
        config.apply(&Overrides {
            batch_size: Some(8),
            max_concurrency: Some(3),
            ..Overrides::default()
        });

        assert_eq!(config.pipeline.batch_size, 8);
        assert_eq!(config.pipeline.analyzer.max_concurrency, Some(3));
        assert_eq!(config.pipeline.queue_capacity, 1000);
    }
}
