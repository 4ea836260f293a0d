use fake::Fake;
use fake::faker::lorem::en::Word;
use sha1::{Digest, Sha1};
use std::path::Path;

/// Incompressible, reproducible content
pub fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(len + 20);
    let mut counter = 0u64;
    while bytes.len() < len {
        let mut hasher = Sha1::new();
        hasher.update(seed.to_le_bytes());
        hasher.update(counter.to_le_bytes());
        bytes.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    bytes.truncate(len);
    bytes
}

/// A random file name with the given extension
pub fn file_name(extension: &str) -> String {
    format!("{}.{extension}", Word().fake::<String>())
}

pub fn write_file(root: &Path, relative: &str, content: &[u8]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directories");
    }
    std::fs::write(path, content).expect("Failed to write file");
}

/// Manifest lines git stores for a staged path
pub fn staged_manifest(root: &Path, relative: &str) -> Vec<String> {
    let output = crate::common::git_output(root, &["cat-file", "blob", &format!(":{relative}")]);
    String::from_utf8(output)
        .expect("manifest is text")
        .lines()
        .map(str::to_string)
        .collect()
}
