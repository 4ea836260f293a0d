//! Shared settings
//!
//! - `config`: filter settings resolved once per process from git config

pub mod config;
