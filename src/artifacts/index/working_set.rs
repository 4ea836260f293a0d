use crate::artifacts::index::IndexEntries;
use crate::artifacts::manifest::hint::Hint;
use crate::artifacts::objects::object_id::ObjectId;
use std::collections::HashSet;

/// Chunk hashes produced during one filter session, each with the hint of the
/// last file that produced it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingSet {
    entries: IndexEntries,
}

impl WorkingSet {
    /// Record a chunk; returns `true` the first time a hash is seen
    pub fn record(&mut self, oid: ObjectId, hint: Option<Hint>) -> bool {
        match self.entries.insert(oid, hint) {
            Some(_) => false,
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &IndexEntries {
        &self.entries
    }

    /// Entries whose hash is not in `known`
    pub fn minus(&self, known: &HashSet<ObjectId>) -> IndexEntries {
        self.entries
            .iter()
            .filter(|(oid, _)| !known.contains(*oid))
            .map(|(oid, hint)| (oid.clone(), hint.clone()))
            .collect()
    }
}
