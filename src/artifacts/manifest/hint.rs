//! Human-readable hints for stored chunks
//!
//! A hint is derived from the path of the file a chunk came from: its parent
//! directories and its stem, e.g. `assets/img/logo.png` becomes
//! `assets-img-logo`. Hints only decorate index entry names.

use regex::Regex;
use std::path::{Component, Path};
use std::sync::LazyLock;

/// Longest hint attached to an index entry
pub const MAX_HINT_LENGTH: usize = 96;

const DISALLOWED_REGEX: &str = r"[^A-Za-z0-9._-]+";

static DISALLOWED: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(DISALLOWED_REGEX).ok());

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hint(String);

impl Hint {
    pub fn from_path(path: &Path) -> Option<Self> {
        let mut parts = path
            .parent()
            .into_iter()
            .flat_map(Path::components)
            .filter_map(|component| match component {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>();
        parts.push(path.file_stem()?.to_string_lossy().into_owned());

        Self::sanitize(&parts.join("-"))
    }

    /// Restrict `raw` to the hint character set, or `None` if nothing is left
    pub fn sanitize(raw: &str) -> Option<Self> {
        let mut hint = DISALLOWED
            .as_ref()?
            .replace_all(raw, "_")
            .into_owned();
        hint.truncate(MAX_HINT_LENGTH);

        Self::checked(hint)
    }

    /// Take a hint read back from an index entry name. Names written by
    /// [`crate::artifacts::index::entry_name::entry_name`] are already in the
    /// hint character set and are kept as they are; anything else is
    /// sanitized.
    pub fn from_stored(raw: &str) -> Option<Self> {
        let allowed = raw.len() <= MAX_HINT_LENGTH
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'));

        if allowed {
            Self::checked(raw.to_string())
        } else {
            Self::sanitize(raw)
        }
    }

    fn checked(hint: String) -> Option<Self> {
        if hint.trim_matches(|c| c == '_' || c == '.' || c == '-').is_empty() {
            None
        } else {
            Some(Self(hint))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Hint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
