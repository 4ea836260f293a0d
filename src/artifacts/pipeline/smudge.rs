use crate::artifacts::database::BlobReader;
use crate::artifacts::manifest::Manifest;
use crate::artifacts::protocol::pkt_line::MAX_PAYLOAD;
use anyhow::Context;

/// Reassemble a file from its manifest, handing the content to `emit` in
/// pieces that each fit into one packet. Returns the file size.
pub fn smudge<B: BlobReader>(
    blobs: &mut B,
    manifest: &Manifest,
    emit: &mut dyn FnMut(&[u8]) -> anyhow::Result<()>,
) -> anyhow::Result<u64> {
    let mut size = 0;
    for chunk in manifest.chunks() {
        size += blobs
            .stream_blob(chunk.oid(), MAX_PAYLOAD, emit)
            .with_context(|| format!("Unable to restore chunk {chunk}"))?;
    }

    Ok(size)
}
