//! Buffering of clean input
//!
//! Chunking needs the total size before the first boundary is computed, so
//! clean reads the whole input first: into memory, or into an anonymous
//! temporary file for repositories with files too large to hold in memory.

use crate::artifacts::chunking::chunker::{ChunkBounds, ChunkRange, chunk_slice, chunk_stream};
use crate::artifacts::core::config::SpoolMode;
use crate::artifacts::protocol::ProtocolError;
use crate::artifacts::protocol::pkt_line::PktLineReader;
use anyhow::Context;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

#[derive(Debug)]
pub enum Spool {
    Memory(Vec<u8>),
    OnDisk { file: File, len: u64 },
}

impl Spool {
    /// Prepare an empty spool. On-disk spools live in `dir` and disappear
    /// when dropped.
    pub fn create(mode: SpoolMode, dir: &Path) -> anyhow::Result<Self> {
        match mode {
            SpoolMode::Memory => Ok(Spool::Memory(Vec::new())),
            SpoolMode::OnDisk => {
                let file = tempfile::tempfile_in(dir).with_context(|| {
                    format!("Unable to create spool file in {}", dir.display())
                })?;
                Ok(Spool::OnDisk { file, len: 0 })
            }
        }
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        Spool::Memory(data)
    }

    /// Consume content packets up to the next flush packet.
    ///
    /// The outer error is a transport failure and ends the session. The inner
    /// error is a spool write failure; the transport has still been drained to
    /// the flush packet, so the session can answer with an error status and
    /// carry on.
    pub fn fill<R: Read>(
        &mut self,
        reader: &mut PktLineReader<R>,
    ) -> Result<anyhow::Result<()>, ProtocolError> {
        let mut failure = None;

        reader.read_until_flush(|payload| {
            if failure.is_none()
                && let Err(err) = self.append(payload)
            {
                failure = Some(err);
            }
            Ok(())
        })?;

        Ok(match failure {
            Some(err) => Err(anyhow::Error::new(err).context("Unable to spool filter input")),
            None => Ok(()),
        })
    }

    pub fn append(&mut self, payload: &[u8]) -> std::io::Result<()> {
        match self {
            Spool::Memory(buffer) => buffer.extend_from_slice(payload),
            Spool::OnDisk { file, len } => {
                file.write_all(payload)?;
                *len += payload.len() as u64;
            }
        }

        Ok(())
    }

    pub fn len(&self) -> u64 {
        match self {
            Spool::Memory(buffer) => buffer.len() as u64,
            Spool::OnDisk { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hand every chunk of the spooled content to `visit`, in order
    pub fn for_each_chunk(
        &mut self,
        bounds: ChunkBounds,
        mut visit: impl FnMut(ChunkRange, &[u8]) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        match self {
            Spool::Memory(buffer) => {
                for range in chunk_slice(buffer, bounds) {
                    let start = range.offset as usize;
                    visit(range, &buffer[start..start + range.length])?;
                }
            }
            Spool::OnDisk { file, .. } => {
                file.flush()?;
                file.seek(SeekFrom::Start(0))
                    .context("Unable to rewind spool file")?;
                for chunk in chunk_stream(&mut *file, bounds) {
                    let (range, data) = chunk?;
                    visit(range, &data)?;
                }
            }
        }

        Ok(())
    }
}
