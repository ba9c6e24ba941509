//! # Distributed Runner
//!
//! Simulazione locale di N nodi isolati (default 2).
//!
//! ## Modello:
//! - Partizione statica: N slice contigue, decise una volta prima del lancio
//! - Ogni nodo riceve SOLO la sua slice e il suo id, senza memoria condivisa
//! - Report fan-in: ogni nodo invia esattamente un messaggio sul canale dei risultati
//! - Il coordinatore drena il canale finché tutti i sender sono chiusi, quindi
//!   aspetta ogni nodo indipendentemente: un nodo in crash toglie solo il proprio report
//! - Un report mancante fa fallire il run (mai un risultato a zero inventato)
//!
//! ## Launcher:
//! - `ProcessLauncher`: processo figlio `image-batch node` (isolamento reale)
//! - `InProcessLauncher`: thread bloccante con dati owned (test, `--in-process`)

use crate::error::{BatchError, Result};
use crate::image_processor::TransformSettings;
use crate::progress::ProgressManager;
use crate::report::{RunSummary, WorkerResult};
use crate::runner::node::{parse_report, NodeAssignment};
use crate::runner::partition::split_contiguous;
use crate::runner::Strategy;
use crate::task::Task;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Starts one isolated node and resolves to its report
pub trait NodeLauncher: Send + Sync + 'static {
    fn launch(&self, assignment: NodeAssignment) -> BoxFuture<'static, Result<WorkerResult>>;

    fn name(&self) -> &'static str;
}

/// Runs each node as a child process speaking the stdin/stdout node protocol
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Launch nodes with the currently running executable
    pub fn current_exe() -> Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }
}

impl NodeLauncher for ProcessLauncher {
    fn launch(&self, assignment: NodeAssignment) -> BoxFuture<'static, Result<WorkerResult>> {
        let program = self.program.clone();
        async move {
            let node_id = assignment.node_id;
            let payload = serde_json::to_vec(&assignment)?;

            let mut child = Command::new(&program)
                .arg("node")
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .kill_on_drop(true)
                .spawn()?;
            debug!("[Node {}] spawned {}", node_id, program.display());

            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| BatchError::NodeProtocol(format!("node {} has no stdin", node_id)))?;

            // write the assignment while reading stdout, so neither pipe can fill up
            let send = async move {
                stdin.write_all(&payload).await?;
                stdin.shutdown().await
            };
            let (sent, output) = futures::future::join(send, child.wait_with_output()).await;
            let output = output?;

            if !output.status.success() {
                return Err(BatchError::NodeProtocol(format!(
                    "node {} exited with {}",
                    node_id, output.status
                )));
            }
            sent?;

            parse_report(&output.stdout, node_id)
        }
        .boxed()
    }

    fn name(&self) -> &'static str {
        "process"
    }
}

/// Runs each node on a blocking thread that owns its assignment.
///
/// Dropping the launch future (node timeout) stops the thread before its
/// next task; the task already in flight still completes.
#[derive(Debug, Clone, Default)]
pub struct InProcessLauncher;

/// Raises the flag when the owning future is dropped
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

impl NodeLauncher for InProcessLauncher {
    fn launch(&self, assignment: NodeAssignment) -> BoxFuture<'static, Result<WorkerResult>> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let guard = CancelOnDrop(Arc::clone(&cancelled));
        async move {
            let _guard = guard;
            let node_id = assignment.node_id;
            tokio::task::spawn_blocking(move || assignment.execute_until(&cancelled))
                .await
                .map_err(|e| BatchError::NodeProtocol(format!("node {} aborted: {}", node_id, e)))?
        }
        .boxed()
    }

    fn name(&self) -> &'static str {
        "in-process"
    }
}

/// Coordinator of the isolated nodes
pub struct DistributedRunner {
    node_count: usize,
    launcher: Arc<dyn NodeLauncher>,
    settings: TransformSettings,
    output_root: PathBuf,
    node_timeout: Option<Duration>,
    disable_text: bool,
    show_progress: bool,
}

impl DistributedRunner {
    pub fn new(
        node_count: usize,
        launcher: Arc<dyn NodeLauncher>,
        settings: TransformSettings,
        output_root: &Path,
    ) -> Self {
        Self {
            node_count,
            launcher,
            settings,
            output_root: output_root.to_path_buf(),
            node_timeout: None,
            disable_text: false,
            show_progress: false,
        }
    }

    /// Give up on a node that has not reported within `timeout`.
    ///
    /// A child process is killed; an in-process node stops before its next task.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.node_timeout = timeout;
        self
    }

    /// Nodes skip font resolution and text drawing
    pub fn without_text_rendering(mut self) -> Self {
        self.disable_text = true;
        self
    }

    pub fn with_progress(mut self, visible: bool) -> Self {
        self.show_progress = visible;
        self
    }

    /// Owned assignments, one per node, ids `1..=node_count`
    pub fn assignments(&self, tasks: &[Task]) -> Vec<NodeAssignment> {
        split_contiguous(tasks, self.node_count)
            .into_iter()
            .enumerate()
            .map(|(index, slice)| NodeAssignment {
                node_id: index + 1,
                output_root: self.output_root.clone(),
                settings: self.settings.clone(),
                tasks: slice.to_vec(),
                disable_text: self.disable_text,
            })
            .collect()
    }

    /// Launch every node, wait for all of them and collect exactly one report each
    pub async fn run(&self, tasks: &[Task]) -> Result<RunSummary> {
        if self.node_count == 0 {
            return Err(BatchError::Validation(
                "Number of nodes must be greater than 0".to_string(),
            ));
        }

        let assignments = self.assignments(tasks);
        let expected: BTreeMap<usize, usize> = assignments
            .iter()
            .map(|a| (a.node_id, a.tasks.len()))
            .collect();
        let sizes: Vec<String> = assignments
            .iter()
            .map(|a| format!("Node {}: {}", a.node_id, a.tasks.len()))
            .collect();
        info!(
            "Total images: {} ({}) via {} launcher",
            tasks.len(),
            sizes.join(", "),
            self.launcher.name()
        );

        let spinner = ProgressManager::spinner(
            &format!("Waiting for {} nodes", self.node_count),
            self.show_progress,
        );
        let (sender, mut receiver) = mpsc::unbounded_channel::<(usize, Result<WorkerResult>)>();

        let start = Instant::now();
        for assignment in assignments {
            let node_id = assignment.node_id;
            let launch = self.launcher.launch(assignment);
            let timeout = self.node_timeout;
            let sender = sender.clone();

            tokio::spawn(async move {
                let result = match timeout {
                    Some(limit) => match tokio::time::timeout(limit, launch).await {
                        Ok(result) => result,
                        Err(_) => Err(BatchError::NodeProtocol(format!(
                            "node {} timed out after {:?}",
                            node_id, limit
                        ))),
                    },
                    None => launch.await,
                };
                // the coordinator outlives every node task
                let _ = sender.send((node_id, result));
            });
        }
        drop(sender);

        let mut reports: BTreeMap<usize, Result<WorkerResult>> = BTreeMap::new();
        while let Some((node_id, result)) = receiver.recv().await {
            match &result {
                Ok(report) => debug!(
                    "[Node {}] reported {}/{} in {:.2}s",
                    node_id, report.processed_count, report.assigned_count, report.elapsed_seconds
                ),
                Err(e) => error!("[Node {}] failed: {}", node_id, e),
            }
            reports.insert(node_id, result);
            spinner.set_message(&format!("{}/{} nodes reported", reports.len(), self.node_count));
        }
        let elapsed = start.elapsed().as_secs_f64();
        spinner.finish(&format!("{} nodes done", reports.len()));

        let mut workers = Vec::with_capacity(self.node_count);
        for node_id in 1..=self.node_count {
            match reports.remove(&node_id) {
                Some(Ok(report)) => {
                    let assigned = expected.get(&node_id).copied().unwrap_or(0);
                    check_report(&report, assigned)
                        .map_err(|reason| BatchError::MissingReport { node_id, reason })?;
                    workers.push(report);
                }
                Some(Err(e)) => {
                    return Err(BatchError::MissingReport {
                        node_id,
                        reason: e.to_string(),
                    })
                }
                None => {
                    return Err(BatchError::MissingReport {
                        node_id,
                        reason: "node terminated without reporting".to_string(),
                    })
                }
            }
        }

        Ok(RunSummary::new(
            Strategy::Distributed,
            self.node_count,
            tasks.len(),
            elapsed,
            workers,
        ))
    }
}

/// A report must account for exactly the slice the node was given
fn check_report(report: &WorkerResult, assigned: usize) -> std::result::Result<(), String> {
    if report.assigned_count != assigned {
        return Err(format!(
            "reported {} assigned tasks, expected {}",
            report.assigned_count, assigned
        ));
    }
    if report.processed_count > report.assigned_count {
        return Err(format!(
            "reported {} processed out of {} assigned",
            report.processed_count, report.assigned_count
        ));
    }
    Ok(())
}
