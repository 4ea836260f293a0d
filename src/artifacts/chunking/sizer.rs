//! Average chunk size derivation
//!
//! The raw target (`size / divisor`) is rounded down to its `depth` most
//! significant bits, so files of similar size share the exact same average
//! and therefore the same chunk boundaries. The result never drops below
//! `floor`.

/// Inputs are split into roughly this many chunks before quantization
pub const DEFAULT_DIVISOR: u64 = 16;

/// Significant bits kept when quantizing
pub const DEFAULT_DEPTH: u32 = 4;

/// Smallest average chunk size ever used
pub const DEFAULT_FLOOR: u64 = 256 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSizer {
    divisor: u64,
    depth: u32,
    floor: u64,
}

impl Default for ChunkSizer {
    fn default() -> Self {
        Self {
            divisor: DEFAULT_DIVISOR,
            depth: DEFAULT_DEPTH,
            floor: DEFAULT_FLOOR,
        }
    }
}

impl ChunkSizer {
    pub fn new(divisor: u64, depth: u32, floor: u64) -> anyhow::Result<Self> {
        if divisor == 0 {
            anyhow::bail!("Chunk size divisor must be positive");
        }
        if depth == 0 {
            anyhow::bail!("Quantization depth must be positive");
        }

        Ok(Self {
            divisor,
            depth,
            floor,
        })
    }

    /// Target average chunk size for an input of `size` bytes
    pub fn average_size(&self, size: u64) -> u64 {
        self.quantize(size / self.divisor).max(self.floor)
    }

    /// Zero every bit below the `depth` most significant ones
    pub fn quantize(&self, value: u64) -> u64 {
        let bits = u64::BITS - value.leading_zeros();
        let shift = bits.saturating_sub(self.depth);

        (value >> shift) << shift
    }
}
