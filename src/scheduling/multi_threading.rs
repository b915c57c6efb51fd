//! Multi-threaded back-end of the chunk processing

#[cfg(feature = "faster-threading")]
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{cutflow::Cutflow, event::ChunkMeta, Result};

use log::debug;

use std::sync::Mutex;

/// Process chunks in multi-threaded mode
///
/// Each chunk is processed by its own task. Chunk results are merged in chunk
/// order by default, or as soon as they arrive with the "faster-threading"
/// feature.
///
pub fn run_chunks_impl(
    chunks: &[ChunkMeta],
    process_chunk: impl Send + Sync + Fn(&ChunkMeta) -> Result<Cutflow>,
) -> Result<Cutflow> {
    // Some double-checking cannot hurt...
    assert!(!chunks.is_empty(), "Must process at least one chunk");
    debug!(
        "Processing {} chunks on {} threads",
        chunks.len(),
        rayon::current_num_threads()
    );

    // The results of parallel tasks will be aggregated...
    let accumulator = {
        // ...in a way that does not depend on task completion order
        #[cfg(not(feature = "faster-threading"))]
        {
            ReproducibleAccumulator::new(chunks.len())
        }

        // ...in a way that is optimized for computational performance
        #[cfg(feature = "faster-threading")]
        {
            FastAccumulator::new(chunks.len())
        }
    };

    // This function is a synchronization scope: it will only return
    // once all inner tasks have been executed
    rayon::scope(|scope| {
        for (chunk_id, chunk) in chunks.iter().enumerate() {
            let accumulator_ref = &accumulator;
            let process_chunk_ref = &process_chunk;
            scope.spawn(move |_| {
                let result = process_chunk_ref(chunk);
                accumulator_ref.set_task_result(chunk_id, result);
            });
        }
    });

    // Extract the results from the accumulator
    accumulator.get_merged_result()
}

/// Chunk-ordered results accumulation mechanism
#[cfg(not(feature = "faster-threading"))]
struct ReproducibleAccumulator {
    /// Storage for the results of parallel tasks
    results: Box<[Mutex<Option<Result<Cutflow>>>]>,
}
//
#[cfg(not(feature = "faster-threading"))]
impl ReproducibleAccumulator {
    /// Set up results storage for N parallel tasks
    fn new(num_tasks: usize) -> Self {
        assert!(num_tasks > 0, "There should be at least one task");
        Self {
            results: (0..num_tasks)
                .map(|_| Mutex::new(None))
                .collect::<Vec<_>>()
                .into_boxed_slice(),
        }
    }

    /// Record the result of the n-th task
    fn set_task_result(&self, task_id: usize, result: Result<Cutflow>) {
        let mut lock = self.results[task_id]
            .lock()
            .expect("Mutex data should be valid");
        assert!(lock.is_none(), "Tasks should not report results twice");
        *lock = Some(result);
    }

    /// Merge the results in chunk order, stopping at the first error
    fn get_merged_result(self) -> Result<Cutflow> {
        let mut merged = Cutflow::new();
        for entry in self.results.into_vec() {
            let result = entry
                .into_inner()
                .expect("Mutex data should be valid")
                .expect("Result should be ready");
            merged.merge(result?);
        }
        Ok(merged)
    }
}

/// Speed-optimized results accumulation mechanism
#[cfg(feature = "faster-threading")]
struct FastAccumulator {
    /// Storage location in which results will be merged out of order, or
    /// first error that was reported
    merged_result: Mutex<Result<Cutflow>>,

    /// Truth that each task has reported its results
    task_finished: Box<[AtomicBool]>,
}
//
#[cfg(feature = "faster-threading")]
impl FastAccumulator {
    /// Set up results storage for N parallel tasks
    fn new(num_tasks: usize) -> Self {
        assert!(num_tasks > 0, "There should be at least one task");
        Self {
            merged_result: Mutex::new(Ok(Cutflow::new())),
            task_finished: (0..num_tasks)
                .map(|_| AtomicBool::new(false))
                .collect::<Vec<_>>()
                .into_boxed_slice(),
        }
    }

    /// Merge the result of the n-th task into the accumulated result
    fn set_task_result(&self, task_id: usize, result: Result<Cutflow>) {
        let mut lock = self
            .merged_result
            .lock()
            .expect("Mutex data should be valid");
        match result {
            // Keep merging as long as no task has failed
            Ok(cutflow) => {
                if let Ok(accumulator) = &mut *lock {
                    accumulator.merge(cutflow);
                }
            }

            // The first error replaces the accumulated result, later ones are
            // dropped
            Err(error) => {
                if lock.is_ok() {
                    *lock = Err(error);
                }
            }
        }
        drop(lock);

        // Remember that this task has completed its work
        let was_finished = self.task_finished[task_id].swap(true, Ordering::Relaxed);
        assert!(!was_finished, "Tasks should not set their result twice");
    }

    /// Extract the merged result
    fn get_merged_result(self) -> Result<Cutflow> {
        // Check that all tasks have completed their work
        for ready in self.task_finished.into_vec().into_iter() {
            assert!(
                ready.load(Ordering::Relaxed),
                "All tasks should have completed their work"
            );
        }

        self.merged_result
            .into_inner()
            .expect("Mutex data should be valid")
    }
}
