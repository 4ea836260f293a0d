#![allow(dead_code)]

pub mod command;
pub mod file;

pub use command::{fastcdc_command, git_command, git_output};
