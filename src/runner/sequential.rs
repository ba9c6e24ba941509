//! # Sequential Runner
//!
//! Baseline: un solo worker (id 0) che processa i task nell'ordine di listing.

use crate::file_manager::FileManager;
use crate::image_processor::ImageProcessor;
use crate::progress::ProgressManager;
use crate::report::WorkerResult;
use crate::task::Task;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::warn;

/// Worker id of the single sequential worker
pub const SEQUENTIAL_WORKER_ID: usize = 0;

/// Processes tasks one at a time, in listing order
pub struct SequentialRunner<'a> {
    processor: &'a ImageProcessor,
    output_root: PathBuf,
    progress: ProgressManager,
}

impl<'a> SequentialRunner<'a> {
    pub fn new(processor: &'a ImageProcessor, output_root: &Path) -> Self {
        Self {
            processor,
            output_root: output_root.to_path_buf(),
            progress: ProgressManager::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressManager) -> Self {
        self.progress = progress;
        self
    }

    /// Run every task and time the whole loop
    pub fn run(&self, tasks: &[Task]) -> WorkerResult {
        let start = Instant::now();
        let processed_count = process_slice(
            self.processor,
            SEQUENTIAL_WORKER_ID,
            tasks,
            &self.output_root,
            &self.progress,
        );

        WorkerResult {
            worker_id: SEQUENTIAL_WORKER_ID,
            assigned_count: tasks.len(),
            processed_count,
            elapsed_seconds: start.elapsed().as_secs_f64(),
        }
    }
}

/// Process `tasks` in order on the calling thread and count successes
fn process_slice(
    processor: &ImageProcessor,
    worker_id: usize,
    tasks: &[Task],
    output_root: &Path,
    progress: &ProgressManager,
) -> usize {
    let mut processed = 0;
    for task in tasks {
        if process_one(processor, worker_id, task, output_root, progress) {
            processed += 1;
        }
    }
    processed
}

/// Transform one task, logging a failure with the worker identity
pub(crate) fn process_one(
    processor: &ImageProcessor,
    worker_id: usize,
    task: &Task,
    output_root: &Path,
    progress: &ProgressManager,
) -> bool {
    let outcome = processor.process(task, output_root);
    let name = FileManager::display_name(&task.input_path);

    if outcome.succeeded {
        progress.update(&format!("[OK] {}", name));
    } else {
        warn!(
            worker = worker_id,
            path = %task.input_path.display(),
            "Error processing image: {}",
            outcome.error.as_deref().unwrap_or("unknown error")
        );
        progress.update(&format!("[ERROR] {}", name));
    }

    outcome.succeeded
}
