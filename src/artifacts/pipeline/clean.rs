use crate::artifacts::chunking::chunker::ChunkBounds;
use crate::artifacts::chunking::sizer::ChunkSizer;
use crate::artifacts::database::ObjectStore;
use crate::artifacts::index::working_set::WorkingSet;
use crate::artifacts::manifest::Manifest;
use crate::artifacts::manifest::chunk_ref::ChunkRef;
use crate::artifacts::manifest::hint::Hint;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::pipeline::spool::Spool;
use std::collections::HashMap;
use tracing::debug;

/// Counters accumulated over every file a cleaner processed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub files: usize,
    pub chunks: usize,
    pub stored: usize,
}

/// Turns file content into manifests, storing each chunk as a blob
pub struct Cleaner<'s, S> {
    store: &'s S,
    sizer: ChunkSizer,
    working: WorkingSet,
    // Local SHA-1 of chunk bytes to the id the store assigned them
    stored: HashMap<ObjectId, ObjectId>,
    stats: CleanStats,
}

impl<'s, S: ObjectStore> Cleaner<'s, S> {
    pub fn new(store: &'s S, sizer: ChunkSizer) -> Self {
        Self {
            store,
            sizer,
            working: WorkingSet::default(),
            stored: HashMap::new(),
            stats: CleanStats::default(),
        }
    }

    /// Chunk bounds for content of `size` bytes
    pub fn bounds_for(&self, size: u64) -> ChunkBounds {
        ChunkBounds::for_average(self.sizer.average_size(size))
    }

    /// Chunk the spooled content, store every chunk and hand each reference to
    /// `emit` in file order. Returns the number of chunks.
    pub fn clean(
        &mut self,
        spool: &mut Spool,
        bounds: ChunkBounds,
        hint: Option<&Hint>,
        mut emit: impl FnMut(&ChunkRef) -> anyhow::Result<()>,
    ) -> anyhow::Result<usize> {
        let mut chunks = 0;

        spool.for_each_chunk(bounds, |range, data| {
            let oid = self.store_chunk(data)?;
            debug!(offset = range.offset, length = range.length, %oid, "Chunk");
            self.working.record(oid.clone(), hint.cloned());
            emit(&ChunkRef::new(oid))?;
            chunks += 1;

            Ok(())
        })?;

        self.stats.files += 1;
        self.stats.chunks += chunks;

        Ok(chunks)
    }

    /// Clean an in-memory buffer into its manifest
    pub fn clean_bytes(&mut self, content: &[u8], hint: Option<&Hint>) -> anyhow::Result<Manifest> {
        let bounds = self.bounds_for(content.len() as u64);
        let mut spool = Spool::from_bytes(content.to_vec());
        let mut manifest = Manifest::default();

        self.clean(&mut spool, bounds, hint, |chunk| {
            manifest.push(chunk.clone());
            Ok(())
        })?;

        Ok(manifest)
    }

    pub fn stats(&self) -> CleanStats {
        self.stats
    }

    pub fn into_working_set(self) -> WorkingSet {
        self.working
    }

    fn store_chunk(&mut self, data: &[u8]) -> anyhow::Result<ObjectId> {
        let local = ObjectId::for_blob(data);
        if let Some(oid) = self.stored.get(&local) {
            return Ok(oid.clone());
        }

        let oid = self.store.write_blob(data)?;
        self.stats.stored += 1;
        self.stored.insert(local, oid.clone());

        Ok(oid)
    }
}
