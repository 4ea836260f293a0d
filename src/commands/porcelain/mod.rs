//! Porcelain commands
//!
//! ## Commands
//!
//! - `update`: reconcile the dedup index with the working tree
//! - `install`: register the filter in the repository
//! - `remove`: unregister the filter
//! - `ondisk`: toggle on-disk spooling for clean
//! - `track`: route file patterns through the filter

pub mod install;
pub mod ondisk;
pub mod remove;
pub mod track;
pub mod update;
