//! Content-defined chunking filter for git
//!
//! Large files are stored as manifests of FastCDC chunks, each chunk a blob in
//! the repository's own object database. Chunks shared between files or
//! revisions are stored once.
//!
//! - `areas`: repository components backed by git
//! - `artifacts`: filter data structures and algorithms
//! - `commands`: command implementations

pub mod areas;
pub mod artifacts;
pub mod commands;

#[cfg(test)]
mod testutil;
