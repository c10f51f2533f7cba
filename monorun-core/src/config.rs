//! Construction-time configuration for the analyzer and the streaming pipeline.
//!
//! Everything an analyzer needs (its name for diagnostics, how many analyses may
//! run at once, how stream buffers are pooled) is supplied here explicitly. All
//! structs deserialize with per-field defaults so partial TOML/JSON documents work.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default bounded queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Default number of items drained into a single batch.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// Default number of analysis results buffered ahead of the consumer.
pub const DEFAULT_RESULT_BUFFER: usize = 64;

/// Default initial capacity of the streaming adapter's buffer.
pub const DEFAULT_INITIAL_STREAM_CAPACITY: usize = 4096;

/// Default number of idle buffers retained per pool size class.
pub const DEFAULT_MAX_RETAINED_PER_BUCKET: usize = 16;

/// Largest queue capacity, result buffer or concurrency limit. Each of these is
/// backed by a tokio semaphore.
pub const MAX_CAPACITY: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// Errors raised when a configuration cannot be used.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A capacity or size that must be positive was zero
    #[error("{field} must be greater than zero")]
    Zero {
        /// Name of the offending field
        field: &'static str,
    },

    /// A capacity or limit exceeded what the runtime can represent
    #[error("{field} must be at most {max}, got {value}")]
    TooLarge {
        /// Name of the offending field
        field: &'static str,
        /// Value supplied
        value: usize,
        /// Largest accepted value
        max: usize,
    },
}

const fn check_range(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Zero { field });
    }
    if value > MAX_CAPACITY {
        return Err(ConfigError::TooLarge {
            field,
            value,
            max: MAX_CAPACITY,
        });
    }
    Ok(())
}

/// How the analyzer obtains buffers for streamed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PoolingStrategy {
    /// Returned buffers are kept for reuse, up to a bound per size class
    Pooled {
        /// Idle buffers retained per power-of-two size class
        #[serde(default = "default_max_retained")]
        max_retained_per_bucket: usize,
    },
    /// Every rent allocates; returned buffers are freed
    Disabled,
}

impl PoolingStrategy {
    /// Number of idle buffers the pool keeps per size class.
    #[must_use]
    pub const fn max_retained_per_bucket(self) -> usize {
        match self {
            Self::Pooled {
                max_retained_per_bucket,
            } => max_retained_per_bucket,
            Self::Disabled => 0,
        }
    }
}

impl Default for PoolingStrategy {
    fn default() -> Self {
        Self::Pooled {
            max_retained_per_bucket: DEFAULT_MAX_RETAINED_PER_BUCKET,
        }
    }
}

const fn default_max_retained() -> usize {
    DEFAULT_MAX_RETAINED_PER_BUCKET
}

/// Sequence analyzer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Name attached to log events emitted by this analyzer
    pub name: String,
    /// Maximum simultaneous analyses; `None` uses the available parallelism
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
    /// Capacity of the first buffer rented by `analyze_stream`
    pub initial_stream_capacity: usize,
    /// Buffer pooling behaviour
    pub pooling: PoolingStrategy,
}

impl AnalyzerConfig {
    /// Effective concurrency limit after resolving the `None` default.
    #[must_use]
    pub fn resolved_max_concurrency(&self) -> usize {
        self.max_concurrency.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        })
    }

    /// Reject values the analyzer cannot operate with.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Zero`] for a zero concurrency limit or stream capacity
    /// - [`ConfigError::TooLarge`] for a concurrency limit above [`MAX_CAPACITY`]
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if let Some(max_concurrency) = self.max_concurrency {
            if let Err(err) = check_range("max_concurrency", max_concurrency) {
                return Err(err);
            }
        }
        if self.initial_stream_capacity == 0 {
            return Err(ConfigError::Zero {
                field: "initial_stream_capacity",
            });
        }
        Ok(())
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            name: "sequence-analyzer".to_string(),
            max_concurrency: None,
            initial_stream_capacity: DEFAULT_INITIAL_STREAM_CAPACITY,
            pooling: PoolingStrategy::default(),
        }
    }
}

/// Streaming pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Bounded queue capacity; producers suspend once it is reached
    pub queue_capacity: usize,
    /// Upper bound on items per analyzed batch
    pub batch_size: usize,
    /// Results buffered ahead of a slow consumer before the collector waits
    pub result_buffer: usize,
    /// Analyzer settings
    pub analyzer: AnalyzerConfig,
}

impl PipelineConfig {
    /// Reject values the pipeline cannot operate with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Zero`] or [`ConfigError::TooLarge`] naming the
    /// first field out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("queue_capacity", self.queue_capacity)?;
        if self.batch_size == 0 {
            return Err(ConfigError::Zero {
                field: "batch_size",
            });
        }
        check_range("result_buffer", self.result_buffer)?;
        self.analyzer.validate()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            batch_size: DEFAULT_BATCH_SIZE,
            result_buffer: DEFAULT_RESULT_BUFFER,
            analyzer: AnalyzerConfig::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.queue_capacity, 1000);
        assert_eq!(config.batch_size, 1024);
        assert_eq!(config.analyzer.initial_stream_capacity, 4096);
        assert!(config.analyzer.max_concurrency.is_none());
        assert!(config.analyzer.resolved_max_concurrency() >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_values_rejected() {
        let config = PipelineConfig {
            batch_size: 0,
            ..PipelineConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero {
                field: "batch_size"
            })
        );

        let mut config = PipelineConfig::default();
        config.analyzer.max_concurrency = Some(0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero {
                field: "max_concurrency"
            })
        );
    }

    #[test]
    fn test_values_beyond_semaphore_limit_rejected() {
        let analyzer = AnalyzerConfig {
            max_concurrency: Some(usize::MAX),
            ..AnalyzerConfig::default()
        };
        assert_eq!(
            analyzer.validate(),
            Err(ConfigError::TooLarge {
                field: "max_concurrency",
                value: usize::MAX,
                max: MAX_CAPACITY,
            })
        );

        let config = PipelineConfig {
            queue_capacity: MAX_CAPACITY + 1,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooLarge {
                field: "queue_capacity",
                ..
            })
        ));

        let config = PipelineConfig {
            result_buffer: MAX_CAPACITY,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"queue_capacity": 8, "analyzer": {"pooling": {"mode": "disabled"}}}"#,
        )
        .unwrap();

        assert_eq!(config.queue_capacity, 8);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.analyzer.pooling, PoolingStrategy::Disabled);
        assert_eq!(config.analyzer.pooling.max_retained_per_bucket(), 0);
    }

    #[test]
    fn test_pooled_strategy_fills_default_retention() {
        let strategy: PoolingStrategy = serde_json::from_str(r#"{"mode": "pooled"}"#).unwrap();
        assert_eq!(
            strategy.max_retained_per_bucket(),
            DEFAULT_MAX_RETAINED_PER_BUCKET
        );
    }
}
