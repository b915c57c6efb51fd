//! This module takes care of scheduling the chunk processing work,
//! encapsulating use of multiple threads

#[cfg(not(feature = "multi-threading"))] mod sequential;
#[cfg(feature = "multi-threading")] mod multi_threading;

use crate::{cutflow::Cutflow, event::ChunkMeta, Result};


/// Process chunks of events in the manner that was configured at build time.
///
/// Takes as parameters the chunks to be processed, and a kernel that processes
/// one chunk and returns its cutflow.
///
/// Returns the merged cutflow of all chunks, or the error of the first chunk
/// that failed (in chunk order).
///
pub fn run_chunks(
    chunks: &[ChunkMeta],
    process_chunk: impl Send + Sync + Fn(&ChunkMeta) -> Result<Cutflow>,
) -> Result<Cutflow> {
    // Nothing to do, nothing to merge
    if chunks.is_empty() {
        return Ok(Cutflow::new());
    }

    // ...in sequential mode
    #[cfg(not(feature = "multi-threading"))]
    { sequential::run_chunks_impl(chunks, process_chunk) }

    // ...in multi-threaded mode
    #[cfg(feature = "multi-threading")]
    { multi_threading::run_chunks_impl(chunks, process_chunk) }
}
