//! Git object identifiers and types
//!
//! Chunks, manifests and index snapshots all live in git's object database.
//! This module only models what is needed to address those objects:
//!
//! - **ObjectId**: hexadecimal object hash (SHA-1 or SHA-256)
//! - **ObjectType**: blob, tree or commit, as reported by `ls-tree` and `cat-file`

pub mod object_id;
pub mod object_type;

/// Length of a SHA-1 hash in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 40;

/// Length of a SHA-256 hash in hexadecimal format
pub const SHA256_OBJECT_ID_LENGTH: usize = 64;
