//! Plumbing commands
//!
//! Invoked by git rather than by people.
//!
//! ## Commands
//!
//! - `process`: long-running clean/smudge filter process

pub mod process;
