//! Repository components backed by git itself
//!
//! - `batch`: persistent `git cat-file --batch` channel for chunk reads
//! - `database`: object and reference store on top of the `git` CLI
//! - `git`: `git` subprocess invocation
//! - `repository`: top-level repository handle and its configuration
//! - `workspace`: working tree files and the attributes file

pub mod batch;
pub mod database;
pub(crate) mod git;
pub mod repository;
pub mod workspace;
