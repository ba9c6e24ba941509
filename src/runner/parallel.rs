//! # Parallel Runner
//!
//! Pool di `worker_count` thread nello stesso address space che svuotano una
//! coda condivisa.
//!
//! ## Modello:
//! - La coda (canale crossbeam) viene riempita con tutti i task e il sender
//!   chiuso PRIMA dell'avvio dei worker
//! - `recv()` è il claim: mutuamente esclusivo, ogni task va a un solo worker
//! - Quando la coda è vuota `recv()` ritorna subito errore e il worker termina
//! - Il tempo del run va da prima del primo claim a dopo l'ultimo join
//!
//! Ogni run dello sweep usa una coda nuova seminata dalla stessa lista.

use crate::error::{BatchError, Result};
use crate::image_processor::ImageProcessor;
use crate::progress::ProgressManager;
use crate::report::{RunSummary, WorkerResult};
use crate::runner::sequential::process_one;
use crate::runner::Strategy;
use crate::task::Task;
use crossbeam::channel;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Thread pool runner sharing one claim queue
pub struct ParallelRunner<'a> {
    processor: &'a ImageProcessor,
    output_root: PathBuf,
    worker_count: usize,
    progress: ProgressManager,
}

impl<'a> ParallelRunner<'a> {
    pub fn new(processor: &'a ImageProcessor, output_root: &Path, worker_count: usize) -> Self {
        Self {
            processor,
            output_root: output_root.to_path_buf(),
            worker_count,
            progress: ProgressManager::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressManager) -> Self {
        self.progress = progress;
        self
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Run the pool once over a fresh queue
    pub fn run(&self, tasks: &[Task]) -> Result<RunSummary> {
        if self.worker_count == 0 {
            return Err(BatchError::Validation(
                "Number of workers must be greater than 0".to_string(),
            ));
        }

        debug!(
            "Starting pool: {} workers, {} tasks",
            self.worker_count,
            tasks.len()
        );

        let start = Instant::now();
        let workers = drain_queue(tasks, self.worker_count, |worker_id, task| {
            process_one(
                self.processor,
                worker_id,
                task,
                &self.output_root,
                &self.progress,
            )
        })?;
        let elapsed = start.elapsed().as_secs_f64();

        let summary = RunSummary::new(
            Strategy::Parallel,
            self.worker_count,
            tasks.len(),
            elapsed,
            workers,
        );
        info!(
            "Workers: {} | Time: {:.2} seconds | Processed: {} images",
            self.worker_count, elapsed, summary.total_processed
        );
        Ok(summary)
    }

    /// Run the pool once per worker count, each over a fresh queue
    pub fn sweep(
        processor: &ImageProcessor,
        output_root: &Path,
        tasks: &[Task],
        worker_counts: &[usize],
        show_progress: bool,
    ) -> Result<Vec<RunSummary>> {
        worker_counts
            .iter()
            .map(|&workers| {
                let progress = ProgressManager::new(tasks.len() as u64, show_progress);
                let summary = ParallelRunner::new(processor, output_root, workers)
                    .with_progress(progress.clone())
                    .run(tasks)?;
                progress.finish(&summary.format_summary());
                Ok(summary)
            })
            .collect()
    }
}

/// Seed a queue with `tasks` and let `worker_count` scoped threads drain it.
///
/// `work` returns whether the task succeeded. Worker ids are `1..=worker_count`.
/// Every worker is joined before returning; a panicking worker is reported
/// as `WorkerPanicked`.
pub fn drain_queue<F>(tasks: &[Task], worker_count: usize, work: F) -> Result<Vec<WorkerResult>>
where
    F: Fn(usize, &Task) -> bool + Sync,
{
    let (sender, receiver) = channel::unbounded::<&Task>();
    for task in tasks {
        // the receiver is alive, an unbounded send cannot fail
        let _ = sender.send(task);
    }
    drop(sender);

    let work = &work;
    let joined: Vec<(usize, std::thread::Result<WorkerResult>)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (1..=worker_count)
            .map(|worker_id| {
                let receiver = receiver.clone();
                let handle = scope.spawn(move || {
                    let start = Instant::now();
                    let mut assigned_count = 0;
                    let mut processed_count = 0;

                    while let Ok(task) = receiver.recv() {
                        assigned_count += 1;
                        if work(worker_id, task) {
                            processed_count += 1;
                        }
                    }

                    WorkerResult {
                        worker_id,
                        assigned_count,
                        processed_count,
                        elapsed_seconds: start.elapsed().as_secs_f64(),
                    }
                });
                (worker_id, handle)
            })
            .collect();

        // join all before inspecting, so no panicked thread is left to the scope
        handles
            .into_iter()
            .map(|(worker_id, handle)| (worker_id, handle.join()))
            .collect()
    });

    joined
        .into_iter()
        .map(|(worker_id, result)| result.map_err(|_| BatchError::WorkerPanicked { worker_id }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_manager::FileManager;
    use crate::image_processor::test_support::*;
    use crate::image_processor::TransformSettings;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn fake_tasks(n: usize) -> Vec<Task> {
        (0..n)
            .map(|i| {
                Task::new(
                    PathBuf::from(format!("/in/{}.png", i)),
                    PathBuf::new(),
                    format!("{}.png", i),
                )
            })
            .collect()
    }

    #[test]
    fn test_every_task_claimed_exactly_once() {
        let tasks = fake_tasks(100);
        let claims: Mutex<HashMap<PathBuf, usize>> = Mutex::new(HashMap::new());

        let workers = drain_queue(&tasks, 4, |_, task| {
            *claims
                .lock()
                .unwrap()
                .entry(task.input_path.clone())
                .or_insert(0) += 1;
            true
        })
        .unwrap();

        let claims = claims.into_inner().unwrap();
        assert_eq!(claims.len(), 100);
        assert!(claims.values().all(|&count| count == 1));

        assert_eq!(workers.len(), 4);
        assert_eq!(workers.iter().map(|w| w.assigned_count).sum::<usize>(), 100);
        assert_eq!(workers.iter().map(|w| w.processed_count).sum::<usize>(), 100);
        let mut ids: Vec<usize> = workers.iter().map(|w| w.worker_id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_more_workers_than_tasks_terminates() {
        let tasks = fake_tasks(3);
        let workers = drain_queue(&tasks, 8, |_, _| true).unwrap();
        assert_eq!(workers.len(), 8);
        assert_eq!(workers.iter().map(|w| w.assigned_count).sum::<usize>(), 3);
    }

    #[test]
    fn test_failures_are_counted_per_worker() {
        let tasks = fake_tasks(20);
        let workers = drain_queue(&tasks, 3, |_, task| !task.file_name.starts_with('1')).unwrap();
        // "1.png" and "10.png".."19.png"
        assert_eq!(workers.iter().map(|w| w.processed_count).sum::<usize>(), 9);
        assert_eq!(workers.iter().map(|w| w.failed_count()).sum::<usize>(), 11);
    }

    #[test]
    fn test_panicking_worker_is_reported() {
        let tasks = fake_tasks(10);
        let result = drain_queue(&tasks, 2, |_, task| {
            if task.file_name == "5.png" {
                panic!("boom");
            }
            true
        });
        assert!(matches!(result, Err(BatchError::WorkerPanicked { .. })));
    }

    #[test]
    fn test_pool_processes_real_images_with_one_failure() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_images(input.path(), 10);
        write_corrupt(&input.path().join("odd"), "broken.png");

        let tasks = list(input.path());
        let processor = ImageProcessor::without_text_rendering(TransformSettings::default());
        let summary = ParallelRunner::new(&processor, output.path(), 4)
            .run(&tasks)
            .unwrap();

        assert_eq!(summary.total_tasks, 11);
        assert_eq!(summary.total_processed, 10);
        assert_eq!(summary.total_failed, 1);
        assert_eq!(summary.per_worker.len(), 4);
        assert_eq!(FileManager::count_files(output.path()), 10);
    }

    #[test]
    fn test_sweep_runs_each_worker_count() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_images(input.path(), 6);

        let tasks = list(input.path());
        let processor = ImageProcessor::without_text_rendering(TransformSettings::default());
        let runs = ParallelRunner::sweep(&processor, output.path(), &tasks, &[1, 2, 4], false).unwrap();

        assert_eq!(runs.iter().map(|r| r.worker_count).collect::<Vec<_>>(), vec![1, 2, 4]);
        assert!(runs.iter().all(|r| r.total_processed == 6));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let output = TempDir::new().unwrap();
        let processor = ImageProcessor::without_text_rendering(TransformSettings::default());
        assert!(ParallelRunner::new(&processor, output.path(), 0).run(&[]).is_err());
    }
}
