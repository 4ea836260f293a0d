//! Clean and smudge
//!
//! - `spool`: buffers clean input until its size is known
//! - `clean`: content to manifest, storing every chunk
//! - `smudge`: manifest back to content
//!
//! Both directions are driven by `protocol::session`, which owns the framing.

pub mod clean;
pub mod smudge;
pub mod spool;

#[cfg(test)]
mod tests {
    use super::clean::Cleaner;
    use super::smudge::smudge;
    use crate::artifacts::chunking::sizer::ChunkSizer;
    use crate::artifacts::database::memory::MemoryStore;
    use crate::artifacts::manifest::Manifest;
    use crate::artifacts::manifest::hint::Hint;
    use crate::artifacts::protocol::pkt_line::MAX_PAYLOAD;
    use crate::testutil::pseudo_random_bytes;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use regex::Regex;
    use rstest::{fixture, rstest};

    const MIB: usize = 1024 * 1024;

    #[fixture]
    fn store() -> MemoryStore {
        MemoryStore::default()
    }

    fn restore(store: &MemoryStore, manifest: &Manifest) -> Vec<u8> {
        let mut content = Vec::new();
        let mut blobs = store;
        let size = smudge(&mut blobs, manifest, &mut |piece| {
            assert!(piece.len() <= MAX_PAYLOAD);
            content.extend_from_slice(piece);
            Ok(())
        })
        .unwrap();

        assert_eq!(size, content.len() as u64);
        content
    }

    #[rstest]
    fn test_two_mib_scenario(store: MemoryStore) {
        let content = pseudo_random_bytes(2024, 2 * MIB);
        let mut cleaner = Cleaner::new(&store, ChunkSizer::default());

        let manifest = cleaner.clean_bytes(&content, None).unwrap();
        let again = cleaner.clean_bytes(&content, None).unwrap();

        assert!(
            (3..=16).contains(&manifest.len()),
            "unexpected chunk count {}",
            manifest.len()
        );
        let line = Regex::new(r"^([0-9a-f]{40}|[0-9a-f]{64})\.cdc$").unwrap();
        for chunk in manifest.chunks() {
            assert!(line.is_match(&chunk.to_string()), "{chunk}");
        }
        assert_eq!(again, manifest);
        assert_eq!(restore(&store, &manifest), content);
    }

    #[rstest]
    fn test_empty_input_has_empty_manifest(store: MemoryStore) {
        let mut cleaner = Cleaner::new(&store, ChunkSizer::default());

        let manifest = cleaner.clean_bytes(b"", None).unwrap();

        assert!(manifest.is_empty());
        assert_eq!(manifest.to_string(), "");
        assert!(restore(&store, &manifest).is_empty());
        assert_eq!(cleaner.stats().files, 1);
    }

    #[rstest]
    fn test_repeated_chunks_are_stored_once_per_session(store: MemoryStore) {
        let content = pseudo_random_bytes(5, MIB);
        let mut cleaner = Cleaner::new(&store, ChunkSizer::default());

        let first = cleaner.clean_bytes(&content, None).unwrap();
        let writes = store.blob_writes();
        let second = cleaner.clean_bytes(&content, None).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.blob_writes(), writes);
        assert_eq!(cleaner.stats().stored, first.len());
        assert_eq!(cleaner.stats().chunks, first.len() * 2);
    }

    #[rstest]
    fn test_shared_prefix_shares_chunks(store: MemoryStore) {
        let sizer = ChunkSizer::new(16, 4, 4096).unwrap();
        let base = pseudo_random_bytes(11, 512 * 1024);
        let mut edited = base.clone();
        edited.extend_from_slice(&pseudo_random_bytes(12, 4096));
        let mut cleaner = Cleaner::new(&store, sizer);

        let before = cleaner.clean_bytes(&base, None).unwrap();
        let after = cleaner.clean_bytes(&edited, None).unwrap();

        let shared = before
            .chunks()
            .iter()
            .filter(|chunk| after.chunks().contains(chunk))
            .count();
        assert!(shared > 0);
        assert!(store.blob_count() < before.len() + after.len());
        assert_eq!(restore(&store, &after), edited);
    }

    #[rstest]
    fn test_working_set_carries_last_hint(store: MemoryStore) {
        let content = pseudo_random_bytes(3, 300_000);
        let mut cleaner = Cleaner::new(&store, ChunkSizer::default());
        let first = Hint::sanitize("first");
        let second = Hint::sanitize("second");

        let manifest = cleaner.clean_bytes(&content, first.as_ref()).unwrap();
        cleaner.clean_bytes(&content, second.as_ref()).unwrap();

        let working = cleaner.into_working_set();
        assert_eq!(working.len(), manifest.len());
        for chunk in manifest.chunks() {
            assert_eq!(working.entries()[chunk.oid()], second);
        }
    }

    #[rstest]
    fn test_unknown_chunk_fails_smudge(store: MemoryStore) {
        let manifest = Manifest::parse(&format!("{}.cdc\n", "ab".repeat(20)));
        let mut blobs = &store;

        let result = smudge(&mut blobs, &manifest, &mut |_| Ok(()));

        assert!(result.is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn test_round_trip_is_lossless(seed in any::<u64>(), len in 0usize..200_000) {
            let store = MemoryStore::default();
            let content = pseudo_random_bytes(seed, len);
            let mut cleaner = Cleaner::new(&store, ChunkSizer::new(16, 4, 1024).unwrap());

            let manifest = cleaner.clean_bytes(&content, None).unwrap();

            prop_assert_eq!(restore(&store, &manifest), content);
        }

        #[test]
        fn test_clean_is_deterministic(seed in any::<u64>(), len in 1usize..200_000) {
            let content = pseudo_random_bytes(seed, len);
            let sizer = ChunkSizer::new(16, 4, 1024).unwrap();
            let first_store = MemoryStore::default();
            let second_store = MemoryStore::default();

            let first = Cleaner::new(&first_store, sizer).clean_bytes(&content, None).unwrap();
            let second = Cleaner::new(&second_store, sizer).clean_bytes(&content, None).unwrap();

            prop_assert_eq!(first.to_string(), second.to_string());
        }
    }
}
