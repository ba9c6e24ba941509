//! # Node Module
//!
//! Il singolo nodo isolato della modalità distribuita.
//!
//! ## Protocollo:
//! - Input: un `NodeAssignment` JSON su stdin (id, slice di task, settings)
//! - Output: una riga JSON con il `WorkerResult` su stdout
//! - Log: su stderr, ereditato dal coordinatore
//!
//! Il nodo non condivide memoria con il coordinatore: costruisce il proprio
//! `ImageProcessor` dalle settings ricevute e processa la slice in ordine.

use crate::error::{BatchError, Result};
use crate::image_processor::{ImageProcessor, TransformSettings};
use crate::progress::ProgressManager;
use crate::report::WorkerResult;
use crate::runner::sequential::process_one;
use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::debug;

/// Everything an isolated node needs, handed over once at launch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAssignment {
    pub node_id: usize,
    pub output_root: PathBuf,
    pub settings: TransformSettings,
    pub tasks: Vec<Task>,
    /// Skip font resolution and text drawing
    #[serde(default)]
    pub disable_text: bool,
}

impl NodeAssignment {
    /// Process the slice in order and time it
    pub fn execute(&self) -> Result<WorkerResult> {
        self.execute_until(&AtomicBool::new(false))
    }

    /// Like `execute`, but stops before the next task once `cancelled` is set
    pub fn execute_until(&self, cancelled: &AtomicBool) -> Result<WorkerResult> {
        let processor = if self.disable_text {
            ImageProcessor::without_text_rendering(self.settings.clone())
        } else {
            ImageProcessor::new(self.settings.clone())?
        };

        debug!(
            "[Node {}] processing {} images",
            self.node_id,
            self.tasks.len()
        );

        let start = Instant::now();
        let progress = ProgressManager::hidden();
        let mut processed_count = 0;
        for task in &self.tasks {
            if cancelled.load(Ordering::Relaxed) {
                debug!("[Node {}] cancelled", self.node_id);
                break;
            }
            if process_one(&processor, self.node_id, task, &self.output_root, &progress) {
                processed_count += 1;
            }
        }

        Ok(WorkerResult {
            worker_id: self.node_id,
            assigned_count: self.tasks.len(),
            processed_count,
            elapsed_seconds: start.elapsed().as_secs_f64(),
        })
    }
}

/// Node entry point: read the assignment from `input`, write the report to `output`
pub fn serve<R: Read, W: Write>(mut input: R, mut output: W) -> Result<WorkerResult> {
    let mut raw = String::new();
    input.read_to_string(&mut raw)?;
    let assignment: NodeAssignment = serde_json::from_str(&raw)?;

    let result = assignment.execute()?;

    serde_json::to_writer(&mut output, &result)?;
    writeln!(output)?;
    output.flush()?;
    Ok(result)
}

/// Parse a node's stdout into its report, checking it came from `expected_id`
pub fn parse_report(stdout: &[u8], expected_id: usize) -> Result<WorkerResult> {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| BatchError::NodeProtocol(format!("node {} wrote no report", expected_id)))?;

    let report: WorkerResult = serde_json::from_str(line.trim())?;
    if report.worker_id != expected_id {
        return Err(BatchError::NodeProtocol(format!(
            "expected report from node {}, got node {}",
            expected_id, report.worker_id
        )));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_manager::FileManager;
    use crate::image_processor::test_support::*;
    use tempfile::TempDir;

    fn assignment(node_id: usize, input: &TempDir, output: &TempDir) -> NodeAssignment {
        NodeAssignment {
            node_id,
            output_root: output.path().to_path_buf(),
            settings: TransformSettings::default(),
            tasks: list(input.path()),
            disable_text: true,
        }
    }

    #[test]
    fn test_serve_round_trip() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_images(input.path(), 3);
        write_corrupt(input.path(), "zz.jpg");

        let request = serde_json::to_vec(&assignment(2, &input, &output)).unwrap();
        let mut stdout = Vec::new();
        let result = serve(request.as_slice(), &mut stdout).unwrap();

        assert_eq!(result.worker_id, 2);
        assert_eq!(result.assigned_count, 4);
        assert_eq!(result.processed_count, 3);
        assert_eq!(parse_report(&stdout, 2).unwrap(), result);
        assert_eq!(FileManager::count_files(output.path()), 3);
    }

    #[test]
    fn test_cancelled_node_writes_nothing() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_images(input.path(), 4);

        let cancelled = AtomicBool::new(true);
        let result = assignment(1, &input, &output)
            .execute_until(&cancelled)
            .unwrap();

        assert_eq!(result.assigned_count, 4);
        assert_eq!(result.processed_count, 0);
        assert_eq!(FileManager::count_files(output.path()), 0);
    }

    #[test]
    fn test_parse_report_rejects_wrong_node() {
        let report = WorkerResult {
            worker_id: 1,
            assigned_count: 1,
            processed_count: 1,
            elapsed_seconds: 0.1,
        };
        let line = serde_json::to_string(&report).unwrap();
        assert!(parse_report(line.as_bytes(), 1).is_ok());
        assert!(matches!(
            parse_report(line.as_bytes(), 2),
            Err(BatchError::NodeProtocol(_))
        ));
    }

    #[test]
    fn test_parse_report_rejects_empty_or_garbage() {
        assert!(parse_report(b"", 1).is_err());
        assert!(parse_report(b"\n  \n", 1).is_err());
        assert!(parse_report(b"not json\n", 1).is_err());
    }

    #[test]
    fn test_malformed_assignment_is_an_error() {
        let mut stdout = Vec::new();
        assert!(serve(&b"{ \"node_id\": 1 }"[..], &mut stdout).is_err());
        assert!(stdout.is_empty());
    }
}
