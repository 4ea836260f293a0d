//! In-memory object store
//!
//! Blob IDs are computed exactly like git computes them, so manifests produced
//! against this store are identical to the ones produced against a real
//! repository. Tree and commit IDs are deterministic hashes of their content
//! but do not follow git's binary encoding.

use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::database::{BlobReader, ObjectStore, RefStore};
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct MemoryCommit {
    tree: ObjectId,
    parent: Option<ObjectId>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RefCell<HashMap<ObjectId, Bytes>>,
    trees: RefCell<HashMap<ObjectId, Vec<DatabaseEntry>>>,
    commits: RefCell<HashMap<ObjectId, MemoryCommit>>,
    refs: RefCell<HashMap<String, ObjectId>>,
    blob_writes: Cell<usize>,
    ref_updates: Cell<usize>,
    racing_update: RefCell<Option<(String, ObjectId)>>,
}

impl MemoryStore {
    /// Number of distinct blobs held by the store
    pub fn blob_count(&self) -> usize {
        self.blobs.borrow().len()
    }

    /// Number of `write_blob` calls, including ones for content already stored
    pub fn blob_writes(&self) -> usize {
        self.blob_writes.get()
    }

    pub fn commit_count(&self) -> usize {
        self.commits.borrow().len()
    }

    /// Number of successful reference updates
    pub fn ref_updates(&self) -> usize {
        self.ref_updates.get()
    }

    /// Make another writer move `name` to `oid` right before the next
    /// `update_ref` call, so that call observes a concurrent update.
    pub fn race_next_ref_update(&self, name: &str, oid: ObjectId) {
        *self.racing_update.borrow_mut() = Some((name.to_string(), oid));
    }

    fn digest(kind: &str, body: &str) -> ObjectId {
        let mut hasher = Sha1::new();
        hasher.update(kind.as_bytes());
        hasher.update(b"\0");
        hasher.update(body.as_bytes());

        ObjectId::for_blob(&hasher.finalize())
    }
}

impl ObjectStore for MemoryStore {
    fn write_blob(&self, content: &[u8]) -> anyhow::Result<ObjectId> {
        let oid = ObjectId::for_blob(content);
        self.blob_writes.set(self.blob_writes.get() + 1);
        self.blobs
            .borrow_mut()
            .entry(oid.clone())
            .or_insert_with(|| Bytes::copy_from_slice(content));

        Ok(oid)
    }

    fn read_blob(&self, oid: &ObjectId) -> anyhow::Result<Bytes> {
        self.blobs
            .borrow()
            .get(oid)
            .cloned()
            .with_context(|| format!("Blob {oid} not found"))
    }

    fn read_tree(&self, oid: &ObjectId) -> anyhow::Result<Vec<DatabaseEntry>> {
        self.trees
            .borrow()
            .get(oid)
            .cloned()
            .with_context(|| format!("Tree {oid} not found"))
    }

    fn write_tree(&self, entries: &[DatabaseEntry]) -> anyhow::Result<ObjectId> {
        let mut entries = entries.to_vec();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        {
            let blobs = self.blobs.borrow();
            if let Some(missing) = entries
                .iter()
                .find(|entry| entry.is_blob() && !blobs.contains_key(&entry.oid))
            {
                anyhow::bail!("Tree entry {} points at missing blob {}", missing.name, missing.oid);
            }
        }

        let body = entries
            .iter()
            .map(DatabaseEntry::to_mktree_record)
            .collect::<Vec<_>>()
            .join("\n");
        let oid = Self::digest("tree", &body);
        self.trees.borrow_mut().insert(oid.clone(), entries);

        Ok(oid)
    }

    fn write_commit(
        &self,
        tree: &ObjectId,
        parent: Option<&ObjectId>,
        message: &str,
    ) -> anyhow::Result<ObjectId> {
        if !self.trees.borrow().contains_key(tree) {
            anyhow::bail!("Tree {tree} not found");
        }

        let body = match parent {
            Some(parent) => format!("tree {tree}\nparent {parent}\n\n{message}"),
            None => format!("tree {tree}\n\n{message}"),
        };
        let oid = Self::digest("commit", &body);
        self.commits.borrow_mut().insert(
            oid.clone(),
            MemoryCommit {
                tree: tree.clone(),
                parent: parent.cloned(),
            },
        );

        Ok(oid)
    }

    fn commit_tree(&self, commit: &ObjectId) -> anyhow::Result<ObjectId> {
        self.commits
            .borrow()
            .get(commit)
            .map(|commit| commit.tree.clone())
            .with_context(|| format!("Commit {commit} not found"))
    }

    fn history(&self, tip: &ObjectId, limit: Option<usize>) -> anyhow::Result<Vec<ObjectId>> {
        let commits = self.commits.borrow();
        let limit = limit.unwrap_or(usize::MAX);
        let mut history = Vec::new();
        let mut next = Some(tip.clone());

        while let Some(oid) = next {
            if history.len() >= limit {
                break;
            }
            let commit = commits
                .get(&oid)
                .with_context(|| format!("Commit {oid} not found"))?;
            next = commit.parent.clone();
            history.push(oid);
        }

        Ok(history)
    }
}

impl RefStore for MemoryStore {
    fn read_ref(&self, name: &str) -> anyhow::Result<Option<ObjectId>> {
        Ok(self.refs.borrow().get(name).cloned())
    }

    fn update_ref(
        &self,
        name: &str,
        new: &ObjectId,
        expected: Option<&ObjectId>,
    ) -> anyhow::Result<bool> {
        if let Some((racing_name, racing_oid)) = self.racing_update.borrow_mut().take() {
            self.refs.borrow_mut().insert(racing_name, racing_oid);
        }

        let mut refs = self.refs.borrow_mut();
        if refs.get(name) != expected {
            return Ok(false);
        }

        refs.insert(name.to_string(), new.clone());
        self.ref_updates.set(self.ref_updates.get() + 1);

        Ok(true)
    }
}

/// Shared references read blobs too, so one store can back both the object
/// store and the blob reader of a filter session.
impl BlobReader for &MemoryStore {
    fn stream_blob(
        &mut self,
        oid: &ObjectId,
        piece_size: usize,
        sink: &mut dyn FnMut(&[u8]) -> anyhow::Result<()>,
    ) -> anyhow::Result<u64> {
        let content = self.read_blob(oid)?;
        for piece in content.chunks(piece_size.max(1)) {
            sink(piece)?;
        }

        Ok(content.len() as u64)
    }
}
