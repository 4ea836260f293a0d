//! Names of chunk entries inside index snapshot trees
//!
//! `<hash>.cdc` or `<hint>-<hash>.cdc`. The hint never contains the hash, so
//! the last `-` separates the two.

use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::manifest::chunk_ref::CHUNK_EXTENSION;
use crate::artifacts::manifest::hint::Hint;
use crate::artifacts::objects::object_id::ObjectId;

pub fn entry_name(oid: &ObjectId, hint: Option<&Hint>) -> String {
    match hint {
        Some(hint) => format!("{hint}-{oid}.{CHUNK_EXTENSION}"),
        None => format!("{oid}.{CHUNK_EXTENSION}"),
    }
}

/// Recover the chunk hash and hint from a snapshot tree entry. Entries that
/// are not chunk references (such as the attributes file) yield `None`.
pub fn parse_entry(entry: &DatabaseEntry) -> Option<(ObjectId, Option<Hint>)> {
    if !entry.is_blob() {
        return None;
    }

    let stem = entry
        .name
        .strip_suffix(CHUNK_EXTENSION)?
        .strip_suffix('.')?;
    let hint = stem
        .rsplit_once('-')
        .and_then(|(hint, _)| Hint::from_stored(hint));

    Some((entry.oid.clone(), hint))
}
