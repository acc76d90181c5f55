//! # Configuration
//!
//! Tunables for capture and symbol resolution.
//!
//! Both structs have sensible defaults and can be overridden from the
//! environment:
//!
//! - `SALVE_STACK_CAPACITY`: maximum number of frames per capture (default: 128)
//! - `SALVE_SYMBOL_PROBES`: failed availability probes before symbol lookup is
//!   switched off for the rest of the process (default: 8)
//!
//! Values that do not parse, or are zero where zero makes no sense, are
//! ignored with a warning.

use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::types::DEFAULT_CAPACITY;

/// Environment variable overriding [`CaptureConfig::capacity`].
pub const STACK_CAPACITY_ENV: &str = "SALVE_STACK_CAPACITY";

/// Environment variable overriding [`ResolverConfig::max_probes`].
pub const SYMBOL_PROBES_ENV: &str = "SALVE_SYMBOL_PROBES";

/// Default number of failed availability probes tolerated.
pub const DEFAULT_MAX_PROBES: u32 = 8;

/// Settings for [`capture`](crate::unwind::capture) callers that do not pick a capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig
{
    /// Maximum number of frames kept per capture.
    pub capacity: usize,
}

impl Default for CaptureConfig
{
    fn default() -> Self
    {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl CaptureConfig
{
    /// Defaults overridden by `SALVE_STACK_CAPACITY` when set.
    pub fn from_env() -> Self
    {
        let mut config = Self::default();
        if let Some(capacity) = read_positive::<usize>(STACK_CAPACITY_ENV) {
            config.capacity = capacity;
        }
        config
    }
}

/// Settings for the symbol resolver session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig
{
    /// Failed availability probes before symbols are declared unavailable.
    ///
    /// Zero is treated as one: at least one probe always runs.
    pub max_probes: u32,
}

impl Default for ResolverConfig
{
    fn default() -> Self
    {
        Self {
            max_probes: DEFAULT_MAX_PROBES,
        }
    }
}

impl ResolverConfig
{
    /// Defaults overridden by `SALVE_SYMBOL_PROBES` when set.
    pub fn from_env() -> Self
    {
        let mut config = Self::default();
        if let Some(max_probes) = read_positive::<u32>(SYMBOL_PROBES_ENV) {
            config.max_probes = max_probes;
        }
        config
    }
}

fn read_positive<T>(key: &str) -> Option<T>
where
    T: FromStr + PartialEq + Default,
{
    let raw = env::var(key).ok()?;
    parse_positive(key, &raw)
}

fn parse_positive<T>(key: &str, raw: &str) -> Option<T>
where
    T: FromStr + PartialEq + Default,
{
    match raw.trim().parse::<T>() {
        Ok(value) if value != T::default() => Some(value),
        _ => {
            warn!(key, value = raw, "ignoring invalid configuration value");
            None
        }
    }
}
