//! Command implementations
//!
//! Commands are methods on `areas::repository::Repository`, split the way git
//! splits its own:
//!
//! - `plumbing`: the filter process git starts
//! - `porcelain`: commands people run to set up and maintain the filter

pub mod plumbing;
pub mod porcelain;
