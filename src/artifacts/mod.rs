//! Chunking filter data structures and algorithms
//!
//! This module contains everything that does not talk to git directly:
//!
//! - `chunking`: chunk size derivation and FastCDC boundaries
//! - `core`: filter configuration
//! - `database`: object store traits and the in-memory store
//! - `index`: the dedup index kept on the `git-fastcdc` branch
//! - `manifest`: manifests, chunk references and path hints
//! - `objects`: object IDs and types
//! - `pipeline`: clean and smudge
//! - `protocol`: pkt-line framing and the long-running filter session

pub mod chunking;
pub mod core;
pub mod database;
pub mod index;
pub mod manifest;
pub mod objects;
pub mod pipeline;
pub mod protocol;
