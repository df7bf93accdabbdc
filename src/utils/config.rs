//! Configuration and constants for tracer construction.

use super::error::ConfigError;
use crate::tracer::{ConfiguredTracer, PassThroughTracer, SamplingTracer};
use log::debug;
use std::num::NonZeroU32;

/// Current summary schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Environment variable holding the sampling rate (sample every Nth call)
pub const SAMPLE_RATE_ENV: &str = "CALLPATH_SAMPLE_RATE";

/// Environment variable switching tracing on/off ("off", "0", "false" disable it)
pub const TRACING_ENV: &str = "CALLPATH_TRACING";

/// Environment variable holding the trace channel capacity
pub const CHANNEL_CAPACITY_ENV: &str = "CALLPATH_CHANNEL_CAPACITY";

/// Buffered traces per channel before slow subscribers start lagging
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// A child is shown individually only if it carries at least
/// `parent_counter / PRUNE_DIVISOR` samples (1%).
pub const PRUNE_DIVISOR: u64 = 100;

/// Deepest call path we are willing to capture
pub const MAX_CAPTURE_DEPTH: usize = 128;

/// Root id of the caller-to-callee tree
pub const TOP_DOWN_ROOT: &str = "topDown";

/// Root id of the callee-to-caller tree
pub const BOTTOM_UP_ROOT: &str = "bottomUp";

/// Key under which pruned children are accumulated
pub const SKIPPED_KEY: &str = "skipped";

/// Tracer settings, normally read once at process start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracerConfig {
    /// When false, a pass-through tracer is built
    pub enabled: bool,

    /// Sample every `sample_rate`-th observed call
    pub sample_rate: NonZeroU32,

    /// Capacity of the trace broadcast channel
    pub channel_capacity: usize,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_rate: NonZeroU32::MIN,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl TracerConfig {
    /// Read configuration from the process environment
    ///
    /// Unset variables keep their defaults; set-but-invalid ones are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    ///
    /// **Public** - lets callers plug in their own configuration source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(TRACING_ENV) {
            config.enabled = parse_switch(TRACING_ENV, &raw)?;
        }

        if let Some(raw) = lookup(SAMPLE_RATE_ENV) {
            config.sample_rate = parse_sample_rate(&raw)?;
        }

        if let Some(raw) = lookup(CHANNEL_CAPACITY_ENV) {
            let capacity: usize = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: CHANNEL_CAPACITY_ENV,
                value: raw.clone(),
                reason: "expected a positive integer",
            })?;
            if capacity == 0 {
                return Err(ConfigError::ZeroCapacity);
            }
            config.channel_capacity = capacity;
        }

        debug!("Tracer config: {:?}", config);
        Ok(config)
    }

    /// Override the sample rate (0 is rejected)
    pub fn with_sample_rate(mut self, rate: u32) -> Result<Self, ConfigError> {
        self.sample_rate = NonZeroU32::new(rate).ok_or(ConfigError::ZeroSampleRate)?;
        Ok(self)
    }

    /// Build the tracer this configuration describes
    pub fn build_tracer(&self) -> ConfiguredTracer {
        if self.enabled {
            ConfiguredTracer::Sampling(SamplingTracer::with_capacity(
                self.sample_rate,
                self.channel_capacity,
            ))
        } else {
            ConfiguredTracer::PassThrough(PassThroughTracer)
        }
    }
}

fn parse_sample_rate(raw: &str) -> Result<NonZeroU32, ConfigError> {
    let rate: u32 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var: SAMPLE_RATE_ENV,
        value: raw.to_string(),
        reason: "expected a positive integer",
    })?;
    NonZeroU32::new(rate).ok_or(ConfigError::ZeroSampleRate)
}

fn parse_switch(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "on" | "true" | "yes" => Ok(true),
        "0" | "off" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: raw.to_string(),
            reason: "expected on/off",
        }),
    }
}
