//! Object store boundary
//!
//! Everything this crate persists lives in git's object database. The traits in
//! this module are the only way the rest of the crate reaches it:
//!
//! - `ObjectStore`: content-addressed blobs, trees and commits
//! - `RefStore`: named references to commits
//! - `BlobReader`: streaming lookups, served by `git cat-file --batch` in
//!   production
//!
//! `areas::database::GitDatabase` implements them on top of the `git` CLI;
//! `memory::MemoryStore` implements them in memory.

pub mod database_entry;
pub mod memory;

use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::objects::object_id::ObjectId;
use bytes::Bytes;

pub trait ObjectStore {
    /// Store `content` as a blob and return its object ID. Idempotent.
    fn write_blob(&self, content: &[u8]) -> anyhow::Result<ObjectId>;

    fn read_blob(&self, oid: &ObjectId) -> anyhow::Result<Bytes>;

    fn read_tree(&self, oid: &ObjectId) -> anyhow::Result<Vec<DatabaseEntry>>;

    fn write_tree(&self, entries: &[DatabaseEntry]) -> anyhow::Result<ObjectId>;

    fn write_commit(
        &self,
        tree: &ObjectId,
        parent: Option<&ObjectId>,
        message: &str,
    ) -> anyhow::Result<ObjectId>;

    /// Resolve the tree a commit points to
    fn commit_tree(&self, commit: &ObjectId) -> anyhow::Result<ObjectId>;

    /// Commits reachable from `tip`, newest first, at most `limit` of them
    fn history(&self, tip: &ObjectId, limit: Option<usize>) -> anyhow::Result<Vec<ObjectId>>;
}

pub trait RefStore {
    /// Resolve a fully qualified reference name. A missing reference is `None`.
    fn read_ref(&self, name: &str) -> anyhow::Result<Option<ObjectId>>;

    /// Point `name` at `new` if it currently points at `expected`
    /// (`None` meaning the reference must not exist yet).
    ///
    /// Returns `false` when another writer moved the reference first.
    fn update_ref(
        &self,
        name: &str,
        new: &ObjectId,
        expected: Option<&ObjectId>,
    ) -> anyhow::Result<bool>;
}

pub trait BlobReader {
    /// Stream the content of a blob to `sink` in pieces of at most
    /// `piece_size` bytes, returning the total size.
    fn stream_blob(
        &mut self,
        oid: &ObjectId,
        piece_size: usize,
        sink: &mut dyn FnMut(&[u8]) -> anyhow::Result<()>,
    ) -> anyhow::Result<u64>;
}
