//! Sequential back-end of the chunk processing

use crate::{cutflow::Cutflow, event::ChunkMeta, Result};

/// Process chunks in sequential mode, in chunk order
pub fn run_chunks_impl(
    chunks: &[ChunkMeta],
    process_chunk: impl Send + Sync + Fn(&ChunkMeta) -> Result<Cutflow>,
) -> Result<Cutflow> {
    let mut cutflow = Cutflow::new();
    for chunk in chunks {
        cutflow.merge(process_chunk(chunk)?);
    }
    Ok(cutflow)
}
