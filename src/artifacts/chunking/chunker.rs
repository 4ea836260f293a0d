//! FastCDC chunk boundaries
//!
//! The rolling hash itself comes from the `fastcdc` crate. This module fixes
//! the minimum and maximum chunk sizes relative to the average and keeps all
//! three inside the ranges the crate accepts.

use anyhow::Context;
use fastcdc::v2020::{
    AVERAGE_MAX, AVERAGE_MIN, FastCDC, MAXIMUM_MAX, MAXIMUM_MIN, MINIMUM_MAX, MINIMUM_MIN,
    StreamCDC,
};
use std::io::Read;

/// Byte range of one chunk within its input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    pub offset: u64,
    pub length: usize,
}

impl ChunkRange {
    pub fn end(&self) -> u64 {
        self.offset + self.length as u64
    }
}

/// Minimum, average and maximum chunk size handed to FastCDC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBounds {
    pub min: u32,
    pub avg: u32,
    pub max: u32,
}

impl ChunkBounds {
    /// Bounds for a target average: a quarter of it at least, eight times it
    /// at most.
    pub fn for_average(average: u64) -> Self {
        let avg = average.clamp(AVERAGE_MIN as u64, AVERAGE_MAX as u64);

        Self {
            min: (avg / 4).clamp(MINIMUM_MIN as u64, MINIMUM_MAX as u64) as u32,
            avg: avg as u32,
            max: avg
                .saturating_mul(8)
                .clamp(MAXIMUM_MIN as u64, MAXIMUM_MAX as u64) as u32,
        }
    }
}

/// Chunk an in-memory buffer
pub fn chunk_slice(data: &[u8], bounds: ChunkBounds) -> impl Iterator<Item = ChunkRange> + '_ {
    FastCDC::new(data, bounds.min, bounds.avg, bounds.max).map(|chunk| ChunkRange {
        offset: chunk.offset as u64,
        length: chunk.length,
    })
}

/// Chunk a stream, yielding each range together with its bytes. Produces the
/// same boundaries as `chunk_slice` over the same content.
pub fn chunk_stream<R: Read>(
    source: R,
    bounds: ChunkBounds,
) -> impl Iterator<Item = anyhow::Result<(ChunkRange, Vec<u8>)>> {
    StreamCDC::new(source, bounds.min, bounds.avg, bounds.max).map(|chunk| {
        let chunk = chunk
            .map_err(|err| anyhow::anyhow!("{err:?}"))
            .context("Unable to read chunk from spooled content")?;

        Ok((
            ChunkRange {
                offset: chunk.offset,
                length: chunk.length,
            },
            chunk.data,
        ))
    })
}
