use crate::artifacts::objects::object_id::ObjectId;
use derive_new::new;

/// Extension marking a name as a chunk reference
pub const CHUNK_EXTENSION: &str = "cdc";

/// Reference to a stored chunk, written as `<hash>.cdc`
#[derive(Debug, Clone, PartialEq, Eq, Hash, new)]
pub struct ChunkRef {
    oid: ObjectId,
}

impl ChunkRef {
    /// Parse one manifest line. Surrounding whitespace is ignored; anything
    /// that is not `<hash>.cdc` yields `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let stem = line.trim().strip_suffix(CHUNK_EXTENSION)?.strip_suffix('.')?;

        ObjectId::try_parse(stem.to_string()).ok().map(Self::new)
    }

    pub fn oid(&self) -> &ObjectId {
        &self.oid
    }
}

impl std::fmt::Display for ChunkRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.oid, CHUNK_EXTENSION)
    }
}
