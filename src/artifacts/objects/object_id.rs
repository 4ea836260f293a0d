//! Git object identifier
//!
//! Object IDs are hexadecimal strings: 40 characters for SHA-1 repositories,
//! 64 characters for SHA-256 repositories. Chunk identity is the object ID of
//! the blob holding the chunk bytes.

use crate::artifacts::objects::{OBJECT_ID_LENGTH, SHA256_OBJECT_ID_LENGTH};
use sha1::{Digest, Sha1};

/// Git object identifier
///
/// A validated, lowercase hexadecimal hash that uniquely identifies an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse and validate an object ID from a string
    ///
    /// # Arguments
    ///
    /// * `id` - 40 or 64 character hexadecimal string
    ///
    /// # Returns
    ///
    /// Validated ObjectId or error if invalid length/characters
    pub fn try_parse(id: String) -> anyhow::Result<Self> {
        if id.len() != OBJECT_ID_LENGTH && id.len() != SHA256_OBJECT_ID_LENGTH {
            return Err(anyhow::anyhow!("Invalid object ID length: {}", id.len()));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow::anyhow!("Invalid object ID characters: {}", id));
        }
        Ok(Self(id.to_ascii_lowercase()))
    }

    /// Compute the SHA-1 object ID git assigns to a blob with the given content
    ///
    /// Git hashes `blob <size>\0<content>`, so identical bytes always map to
    /// the same ID regardless of where they came from.
    pub fn for_blob(content: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(format!("blob {}\0", content.len()).as_bytes());
        hasher.update(content);

        Self(format!("{:x}", hasher.finalize()))
    }

    /// Get abbreviated form of the object ID
    ///
    /// # Returns
    ///
    /// First 7 characters of the hash (standard Git abbreviation)
    pub fn to_short_oid(&self) -> String {
        self.0.split_at(7).0.to_string()
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
