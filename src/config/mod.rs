//! Layered configuration
//!
//! Implements the 3-layer configuration merge:
//! 1. Built-in defaults
//! 2. Config file (`.devicefarm/lane.toml`, or `--config`)
//! 3. CLI flags

mod defaults;
mod effective;

pub use defaults::{LaneConfig, PollSettings, DEFAULT_CONFIG_PATH};
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig};
