//! Dedup index
//!
//! The index records which chunk hashes are already known. It lives on the
//! `git-fastcdc` branch as a chain of commits, each commit a snapshot unit
//! whose tree lists up to `snapshot_capacity` chunk entries plus an attributes
//! file marking them binary:
//!
//! ```text
//! git-fastcdc ──> unit N ──> unit N-1 ──> ... ──> unit 1
//!                  │
//!                  └─ tree: .gitattributes
//!                           assets-logo-<hash>.cdc
//!                           <hash>.cdc
//! ```
//!
//! The index content is the union of every reachable unit. Units are never
//! rewritten; new hashes are appended as new units on top of the tip. Because
//! tree entries point at the chunk blobs themselves, the branch also keeps
//! every indexed chunk reachable for `git gc`.
//!
//! ## Reads
//!
//! - `known(window)`: only the newest `window` units, cheap enough to run at
//!   the end of every filter session
//! - `full_scan`: every unit, used by reconciliation
//!
//! ## Writes
//!
//! The branch is moved with a compare-and-swap. When another process moved it
//! in the meantime, the delta is recomputed against the new tip and the write
//! retried a bounded number of times.

pub mod entry_name;
pub mod working_set;

use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::database::{ObjectStore, RefStore};
use crate::artifacts::index::entry_name::{entry_name, parse_entry};
use crate::artifacts::index::working_set::WorkingSet;
use crate::artifacts::manifest::hint::Hint;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

/// Reference of the branch holding the index
pub const INDEX_REF: &str = "refs/heads/git-fastcdc";

/// Auxiliary entry present in every snapshot unit
pub const ATTRIBUTES_ENTRY: &str = ".gitattributes";

/// Content of the auxiliary entry: chunk entries are opaque binary to git
pub const ATTRIBUTES_CONTENT: &[u8] = b"*.cdc binary\n";

/// Commit message of snapshot units
pub const SNAPSHOT_MESSAGE: &str = "cdc";

/// Attempts at moving the index branch before giving up on a write
pub const MAX_APPEND_ATTEMPTS: usize = 3;

/// Chunk hash to optional hint, ordered by hash
pub type IndexEntries = BTreeMap<ObjectId, Option<Hint>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanProgress {
    pub scanned: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Nothing new to record, the branch was left alone
    Unchanged,
    /// `units` snapshot units were written and the branch now points at `tip`
    Appended { units: usize, tip: ObjectId },
    /// Other writers kept moving the branch; this write was dropped
    Conflicted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Distinct hashes referenced by tracked manifests
    pub tracked: usize,
    /// Distinct hashes in the index before reconciling
    pub indexed: usize,
    /// Tracked hashes the index did not know
    pub missing: usize,
    /// Indexed hashes no tracked manifest references anymore
    pub stale: usize,
    pub outcome: AppendOutcome,
}

/// What a write attempt should do, decided against the tip it observed
enum Plan {
    Append(IndexEntries),
    Rebuild(IndexEntries),
}

pub struct DedupIndex<'s, S> {
    store: &'s S,
    snapshot_capacity: usize,
}

impl<'s, S: ObjectStore + RefStore> DedupIndex<'s, S> {
    pub fn new(store: &'s S, snapshot_capacity: usize) -> Self {
        Self {
            store,
            snapshot_capacity: snapshot_capacity.max(1),
        }
    }

    /// Current tip of the index branch, `None` before the first write
    pub fn tip(&self) -> anyhow::Result<Option<ObjectId>> {
        self.store.read_ref(INDEX_REF)
    }

    /// Hashes recorded in the newest `window` snapshot units
    pub fn known(&self, window: usize) -> anyhow::Result<HashSet<ObjectId>> {
        self.known_at(self.tip()?.as_ref(), window)
    }

    fn known_at(&self, tip: Option<&ObjectId>, window: usize) -> anyhow::Result<HashSet<ObjectId>> {
        match tip {
            Some(tip) => Ok(self.scan(tip, Some(window))?.into_keys().collect()),
            None => Ok(HashSet::new()),
        }
    }

    /// Every hash the index ever recorded, with its hint. Reports progress
    /// once per snapshot unit.
    pub fn full_scan(
        &self,
        mut progress: impl FnMut(ScanProgress),
    ) -> anyhow::Result<IndexEntries> {
        let Some(tip) = self.tip()? else {
            return Ok(IndexEntries::new());
        };

        let history = self.store.history(&tip, None)?;
        let total = history.len();
        let mut entries = IndexEntries::new();
        for (position, unit) in history.iter().enumerate() {
            self.merge_unit(unit, &mut entries)?;
            progress(ScanProgress {
                scanned: position + 1,
                total,
            });
        }

        Ok(entries)
    }

    /// Record `entries` on top of the current tip. Hashes the tip unit
    /// already holds are left out; when nothing remains the branch is left
    /// alone.
    pub fn append(&self, entries: &IndexEntries) -> anyhow::Result<AppendOutcome> {
        self.advance(|tip| {
            let covered = self.known_at(tip, 1)?;

            Ok(Plan::Append(
                entries
                    .iter()
                    .filter(|(oid, _)| !covered.contains(*oid))
                    .map(|(oid, hint)| (oid.clone(), hint.clone()))
                    .collect(),
            ))
        })
    }

    /// Persist the chunks a filter session produced that the newest `window`
    /// units do not already cover
    pub fn record_session(
        &self,
        working: &WorkingSet,
        window: usize,
    ) -> anyhow::Result<AppendOutcome> {
        self.advance(|tip| {
            let known = self.known_at(tip, window)?;
            let delta = working.minus(&known);
            debug!(
                session = working.len(),
                known = known.len(),
                delta = delta.len(),
                "Computed index delta"
            );

            Ok(Plan::Append(delta))
        })
    }

    /// Bring the index in line with the hashes referenced by tracked files.
    ///
    /// Missing hashes are appended. With `force`, every tracked hash is
    /// appended again so the newest units cover the whole working tree. With
    /// `prune`, an index holding stale hashes is replaced by a fresh lineage
    /// containing exactly the tracked ones.
    pub fn reconcile(
        &self,
        tracked: &IndexEntries,
        force: bool,
        prune: bool,
        mut progress: impl FnMut(ScanProgress),
    ) -> anyhow::Result<ReconcileReport> {
        let mut counts = (0, 0, 0);

        let outcome = self.advance(|_| {
            let indexed = self.full_scan(&mut progress)?;
            let missing = tracked
                .iter()
                .filter(|(oid, _)| !indexed.contains_key(*oid))
                .map(|(oid, hint)| (oid.clone(), hint.clone()))
                .collect::<IndexEntries>();
            let stale = indexed
                .keys()
                .filter(|oid| !tracked.contains_key(*oid))
                .count();
            counts = (indexed.len(), missing.len(), stale);

            Ok(if prune && stale > 0 {
                Plan::Rebuild(tracked.clone())
            } else if force {
                Plan::Append(tracked.clone())
            } else {
                Plan::Append(missing)
            })
        })?;

        let (indexed, missing, stale) = counts;
        info!(
            tracked = tracked.len(),
            indexed, missing, stale, "Reconciled index"
        );

        Ok(ReconcileReport {
            tracked: tracked.len(),
            indexed,
            missing,
            stale,
            outcome,
        })
    }

    fn advance(
        &self,
        mut plan: impl FnMut(Option<&ObjectId>) -> anyhow::Result<Plan>,
    ) -> anyhow::Result<AppendOutcome> {
        for attempt in 1..=MAX_APPEND_ATTEMPTS {
            let tip = self.tip()?;

            let (parent, entries) = match plan(tip.as_ref())? {
                Plan::Append(entries) if entries.is_empty() => {
                    return Ok(AppendOutcome::Unchanged);
                }
                Plan::Append(entries) => (tip.as_ref(), entries),
                Plan::Rebuild(entries) => (None, entries),
            };

            let Some((units, new_tip)) = self.write_units(parent, &entries)? else {
                debug!("Snapshot matches the index tip, skipping write");
                return Ok(AppendOutcome::Unchanged);
            };

            if self.store.update_ref(INDEX_REF, &new_tip, tip.as_ref())? {
                info!(
                    entries = entries.len(),
                    units,
                    tip = %new_tip.to_short_oid(),
                    "Advanced index"
                );
                return Ok(AppendOutcome::Appended {
                    units,
                    tip: new_tip,
                });
            }

            debug!(attempt, "Index branch moved concurrently, retrying");
        }

        warn!(
            attempts = MAX_APPEND_ATTEMPTS,
            "Index branch kept moving, dropping this index update; run `git-fastcdc update` to repair"
        );
        Ok(AppendOutcome::Conflicted)
    }

    /// Write `entries` as a chain of snapshot units on top of `parent`.
    /// Returns the number of units and the new tip, or `None` when the single
    /// resulting unit would repeat the parent's tree.
    fn write_units(
        &self,
        parent: Option<&ObjectId>,
        entries: &IndexEntries,
    ) -> anyhow::Result<Option<(usize, ObjectId)>> {
        let attributes = self
            .store
            .write_blob(ATTRIBUTES_CONTENT)
            .context("Unable to store index attributes")?;

        let ordered = entries.iter().collect::<Vec<_>>();
        let mut trees = Vec::new();
        for page in ordered.chunks(self.snapshot_capacity) {
            trees.push(self.write_unit_tree(page, &attributes)?);
        }
        if trees.is_empty() {
            trees.push(self.write_unit_tree(&[], &attributes)?);
        }

        if let (Some(parent), [tree]) = (parent, trees.as_slice())
            && &self.store.commit_tree(parent)? == tree
        {
            return Ok(None);
        }

        let mut tip = parent.cloned();
        for tree in &trees {
            tip = Some(
                self.store
                    .write_commit(tree, tip.as_ref(), SNAPSHOT_MESSAGE)
                    .context("Unable to write index snapshot unit")?,
            );
        }

        Ok(tip.map(|tip| (trees.len(), tip)))
    }

    fn write_unit_tree(
        &self,
        page: &[(&ObjectId, &Option<Hint>)],
        attributes: &ObjectId,
    ) -> anyhow::Result<ObjectId> {
        let mut tree = page
            .iter()
            .map(|(oid, hint)| DatabaseEntry::blob((*oid).clone(), entry_name(oid, hint.as_ref())))
            .collect::<Vec<_>>();
        tree.push(DatabaseEntry::blob(
            attributes.clone(),
            ATTRIBUTES_ENTRY.to_string(),
        ));

        self.store
            .write_tree(&tree)
            .context("Unable to write index snapshot tree")
    }

    fn scan(&self, tip: &ObjectId, limit: Option<usize>) -> anyhow::Result<IndexEntries> {
        let mut entries = IndexEntries::new();
        for unit in self.store.history(tip, limit)? {
            self.merge_unit(&unit, &mut entries)?;
        }

        Ok(entries)
    }

    /// Add the chunk entries of one unit. Newer units are merged first, so an
    /// existing hint is kept and only a missing one is filled in.
    fn merge_unit(&self, unit: &ObjectId, entries: &mut IndexEntries) -> anyhow::Result<()> {
        let tree = self.store.commit_tree(unit)?;
        for entry in self.store.read_tree(&tree)? {
            if let Some((oid, hint)) = parse_entry(&entry) {
                let slot = entries.entry(oid).or_insert(None);
                if slot.is_none() {
                    *slot = hint;
                }
            }
        }

        Ok(())
    }
}
