use crate::artifacts::manifest::hint::Hint;
use std::path::{Component, Path};

/// Directory whose files are never chunked
pub const CHUNK_DIR: &str = ".cdc";

/// How a filter command treats the path it was invoked for. Resolved once per
/// command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathKind {
    /// Regular tracked file: chunked on clean, reassembled on smudge
    Chunked { hint: Option<Hint> },
    /// Content inside the chunk directory, passed through unchanged
    Passthrough,
}

impl PathKind {
    pub fn resolve(pathname: &Path) -> Self {
        let first = pathname
            .components()
            .find(|component| !matches!(component, Component::CurDir));

        match first {
            Some(Component::Normal(name)) if name == CHUNK_DIR => PathKind::Passthrough,
            _ => PathKind::Chunked {
                hint: Hint::from_path(pathname),
            },
        }
    }
}
