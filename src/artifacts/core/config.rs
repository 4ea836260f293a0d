//! Filter configuration
//!
//! Settings live in the repository's local git config under the `fastcdc`
//! section. They are read once when a command starts and passed down from
//! there; nothing re-reads them mid-session.

use anyhow::Context;

pub const ONDISK_KEY: &str = "fastcdc.ondisk";
pub const WINDOW_KEY: &str = "fastcdc.window";
pub const SNAPSHOT_CAPACITY_KEY: &str = "fastcdc.snapshotCapacity";

/// Snapshot units consulted when deciding whether a chunk is already indexed
pub const DEFAULT_WINDOW: usize = 8;

/// Chunk entries per snapshot unit
pub const DEFAULT_SNAPSHOT_CAPACITY: usize = 50_000;

/// Where clean buffers file content before chunking it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpoolMode {
    #[default]
    Memory,
    OnDisk,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    pub spool: SpoolMode,
    pub window: usize,
    pub snapshot_capacity: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            spool: SpoolMode::Memory,
            window: DEFAULT_WINDOW,
            snapshot_capacity: DEFAULT_SNAPSHOT_CAPACITY,
        }
    }
}

impl FilterConfig {
    /// Build the configuration from a key lookup. Missing keys fall back to
    /// their defaults; present but invalid values are errors.
    pub fn from_lookup(
        mut lookup: impl FnMut(&str) -> anyhow::Result<Option<String>>,
    ) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let ondisk = match lookup(ONDISK_KEY)? {
            Some(value) => parse_bool(&value).with_context(|| format!("Invalid {ONDISK_KEY}"))?,
            None => false,
        };
        let spool = if ondisk {
            SpoolMode::OnDisk
        } else {
            SpoolMode::Memory
        };

        let window = match lookup(WINDOW_KEY)? {
            Some(value) => parse_positive(&value).with_context(|| format!("Invalid {WINDOW_KEY}"))?,
            None => defaults.window,
        };

        let snapshot_capacity = match lookup(SNAPSHOT_CAPACITY_KEY)? {
            Some(value) => parse_positive(&value)
                .with_context(|| format!("Invalid {SNAPSHOT_CAPACITY_KEY}"))?,
            None => defaults.snapshot_capacity,
        };

        Ok(Self {
            spool,
            window,
            snapshot_capacity,
        })
    }
}

/// Interpret a boolean the way git does
pub fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" | "" => Ok(false),
        other => Err(anyhow::anyhow!("{other:?} is not a boolean")),
    }
}

fn parse_positive(value: &str) -> anyhow::Result<usize> {
    let parsed = value
        .trim()
        .parse::<usize>()
        .with_context(|| format!("{value:?} is not a number"))?;
    if parsed == 0 {
        anyhow::bail!("value must be greater than zero");
    }

    Ok(parsed)
}
