use sha1::{Digest, Sha1};

/// Deterministic incompressible test content: SHA-1 in counter mode
pub fn pseudo_random_bytes(seed: u64, len: usize) -> Vec<u8> {
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
