//! Manifests: what git stores in place of a chunked file
//!
//! ```text
//! 3b18e512dba79e4c8300dd08aeb37f8e728b8dad.cdc
//! 9f2c0e6c4f1a2b3c4d5e6f708192a3b4c5d6e7f8.cdc
//! ```
//!
//! One chunk reference per line, in file order, each line newline terminated.

pub mod chunk_ref;
pub mod hint;
pub mod path_kind;

use crate::artifacts::manifest::chunk_ref::ChunkRef;

/// Ordered chunk references of one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    chunks: Vec<ChunkRef>,
}

impl Manifest {
    pub fn new(chunks: Vec<ChunkRef>) -> Self {
        Self { chunks }
    }

    /// Parse manifest text. Blank lines and lines that do not hold a chunk
    /// reference are skipped.
    pub fn parse(text: &str) -> Self {
        Self {
            chunks: text.lines().filter_map(ChunkRef::parse).collect(),
        }
    }

    pub fn push(&mut self, chunk: ChunkRef) {
        self.chunks.push(chunk);
    }

    pub fn chunks(&self) -> &[ChunkRef] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl std::fmt::Display for Manifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for chunk in &self.chunks {
            writeln!(f, "{chunk}")?;
        }

        Ok(())
    }
}
