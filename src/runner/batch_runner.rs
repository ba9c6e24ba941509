//! # Batch Runner
//!
//! Orchestratore principale: lista i task una volta, applica le guardie e
//! delega a ciascuna strategia richiesta.
//!
//! ## Flusso di esecuzione:
//! 1. Verifica la root di input (mancante o vuota: zero processate, nessuna cartella creata)
//! 2. Lista i task in ordine deterministico
//! 3. Per ogni strategia crea la sua output root ed esegue il run
//! 4. Stampa il summary (log umani su stderr oppure JSON su stdout)
//!
//! In una sequenza `all` il tempo del run sequenziale diventa la durata di
//! riferimento per l'efficienza del run distribuito, salvo valore esplicito.

use crate::config::Config;
use crate::file_manager::{FileManager, RootStatus};
use crate::image_processor::ImageProcessor;
use crate::json_output::JsonMessage;
use crate::progress::ProgressManager;
use crate::report::{format_metric, RunSummary, SpeedupTable, METRIC_EFFICIENCY};
use crate::runner::distributed::{DistributedRunner, NodeLauncher, ProcessLauncher};
use crate::runner::parallel::ParallelRunner;
use crate::runner::sequential::SequentialRunner;
use crate::runner::Strategy;
use crate::task::Task;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// What a batch invocation ended with
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    /// Input root missing or not a directory, nothing was run
    MissingRoot,
    /// Input root holds no supported image, nothing was run
    NoImages,
    /// Every requested strategy ran
    Completed {
        summaries: Vec<RunSummary>,
        speedup: Option<SpeedupTable>,
    },
}

impl BatchOutcome {
    pub fn summaries(&self) -> &[RunSummary] {
        match self {
            BatchOutcome::Completed { summaries, .. } => summaries,
            _ => &[],
        }
    }

    pub fn summary(&self, strategy: Strategy) -> Option<&RunSummary> {
        self.summaries().iter().find(|s| s.strategy == strategy)
    }
}

/// Orchestratore dei run
pub struct BatchRunner {
    config: Config,
    launcher: Arc<dyn NodeLauncher>,
    disable_text: bool,
}

impl BatchRunner {
    /// Validate the configuration; distributed nodes run as child processes of this executable
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let launcher = ProcessLauncher::current_exe().context("Failed to locate the node executable")?;

        Ok(Self {
            config,
            launcher: Arc::new(launcher),
            disable_text: false,
        })
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn NodeLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    /// Resize only, no font resolution or text drawing
    pub fn without_text_rendering(mut self) -> Self {
        self.disable_text = true;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the given strategies in order over the same task list
    pub async fn run(&self, strategies: &[Strategy]) -> Result<BatchOutcome> {
        let input_dir = &self.config.input_dir;

        match FileManager::root_status(input_dir) {
            RootStatus::Missing => {
                warn!("Input directory does not exist: {}", input_dir.display());
                self.report_nothing_to_do(strategies);
                return Ok(BatchOutcome::MissingRoot);
            }
            RootStatus::NotADirectory => {
                warn!("Input path is not a directory: {}", input_dir.display());
                self.report_nothing_to_do(strategies);
                return Ok(BatchOutcome::MissingRoot);
            }
            RootStatus::Ready => {}
        }

        let tasks = FileManager::find_images(input_dir);
        if tasks.is_empty() {
            info!("No images found in {}", input_dir.display());
            self.report_nothing_to_do(strategies);
            return Ok(BatchOutcome::NoImages);
        }

        if self.config.json_output {
            JsonMessage::start(&self.config, tasks.len()).emit();
        } else {
            info!(
                "Found {} images in {} | Target: {}x{} | Watermark: \"{}\"",
                tasks.len(),
                input_dir.display(),
                self.config.width,
                self.config.height,
                self.config.watermark_text
            );
        }

        let tasks = Arc::new(tasks);
        let processor = Arc::new(self.processor()?);
        let mut summaries = Vec::with_capacity(strategies.len());
        let mut speedup = None;
        let mut measured_reference = None;

        for &strategy in strategies {
            match strategy {
                Strategy::Sequential => {
                    let summary = self.run_sequential(&tasks, &processor).await?;
                    measured_reference = Some(summary.total_elapsed_seconds);
                    self.report_summary(&summary);
                    summaries.push(summary);
                }
                Strategy::Parallel => {
                    let runs = self.run_parallel(&tasks, &processor).await?;
                    let table = SpeedupTable::from_runs(&runs);
                    for run in &runs {
                        self.report_summary(run);
                    }
                    self.report_speedup(&table);
                    summaries.extend(runs);
                    speedup = Some(table);
                }
                Strategy::Distributed => {
                    let reference = self.config.reference_sequential_secs.or(measured_reference);
                    let mut summary = self.run_distributed(&tasks).await?;
                    if let Some(reference) = reference {
                        summary = summary.with_reference(reference);
                    }
                    self.report_summary(&summary);
                    summaries.push(summary);
                }
            }
        }

        Ok(BatchOutcome::Completed { summaries, speedup })
    }

    /// Built once up front, so an unreadable font fails before any run starts
    fn processor(&self) -> Result<ImageProcessor> {
        let settings = self.config.transform_settings();
        if self.disable_text {
            return Ok(ImageProcessor::without_text_rendering(settings));
        }

        ImageProcessor::new(settings).context("Failed to prepare the transform")
    }

    fn show_progress(&self) -> bool {
        self.config.show_progress && !self.config.json_output
    }

    async fn run_sequential(
        &self,
        tasks: &Arc<Vec<Task>>,
        processor: &Arc<ImageProcessor>,
    ) -> Result<RunSummary> {
        let output_root = self.prepare_output(Strategy::Sequential)?;
        let progress = ProgressManager::new(tasks.len() as u64, self.show_progress());

        let worker = {
            let tasks = Arc::clone(tasks);
            let processor = Arc::clone(processor);
            let progress = progress.clone();
            tokio::task::spawn_blocking(move || {
                SequentialRunner::new(&processor, &output_root)
                    .with_progress(progress)
                    .run(&tasks)
            })
            .await
            .context("Sequential worker aborted")?
        };

        let summary = RunSummary::new(
            Strategy::Sequential,
            1,
            tasks.len(),
            worker.elapsed_seconds,
            vec![worker],
        );
        progress.finish(&summary.format_summary());
        Ok(summary)
    }

    async fn run_parallel(
        &self,
        tasks: &Arc<Vec<Task>>,
        processor: &Arc<ImageProcessor>,
    ) -> Result<Vec<RunSummary>> {
        let output_root = self.prepare_output(Strategy::Parallel)?;
        let tasks = Arc::clone(tasks);
        let processor = Arc::clone(processor);
        let worker_counts = self.config.worker_counts.clone();
        let show_progress = self.show_progress();

        let runs = tokio::task::spawn_blocking(move || {
            ParallelRunner::sweep(&processor, &output_root, &tasks, &worker_counts, show_progress)
        })
        .await
        .context("Parallel sweep aborted")??;

        Ok(runs)
    }

    async fn run_distributed(&self, tasks: &[Task]) -> Result<RunSummary> {
        let output_root = self.prepare_output(Strategy::Distributed)?;

        let mut runner = DistributedRunner::new(
            self.config.node_count,
            Arc::clone(&self.launcher),
            self.config.transform_settings(),
            &output_root,
        )
        .with_timeout(self.config.node_timeout())
        .with_progress(self.show_progress());
        if self.disable_text {
            runner = runner.without_text_rendering();
        }

        let summary = runner
            .run(tasks)
            .await
            .context("Distributed run did not complete")?;
        Ok(summary)
    }

    fn prepare_output(&self, strategy: Strategy) -> Result<std::path::PathBuf> {
        let output_root = self.config.output_root(strategy);
        FileManager::ensure_dir(&output_root).with_context(|| {
            format!("Failed to create output directory {}", output_root.display())
        })?;
        Ok(output_root)
    }

    fn report_nothing_to_do(&self, strategies: &[Strategy]) {
        for &strategy in strategies {
            let summary = RunSummary::empty(strategy, 0);
            if self.config.json_output {
                JsonMessage::run_complete(&summary).emit();
            } else {
                info!("{}: processed 0 images", strategy);
            }
        }
    }

    fn report_summary(&self, summary: &RunSummary) {
        if self.config.json_output {
            JsonMessage::run_complete(summary).emit();
            return;
        }

        info!("=== {} run complete ===", summary.strategy);
        for line in summary.format_workers() {
            info!("  {}", line);
        }
        info!("{}", summary.format_summary());
        if summary.strategy == Strategy::Distributed {
            info!(
                "Efficiency: {}",
                format_metric(summary.metric(METRIC_EFFICIENCY), "")
            );
        }
    }

    fn report_speedup(&self, table: &SpeedupTable) {
        if self.config.json_output {
            JsonMessage::speedup(table).emit();
            return;
        }

        info!("=== Speedup ===");
        for line in table.render().lines() {
            info!("{}", line);
        }
    }
}
