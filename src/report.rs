//! # Run Report and Metrics Module
//!
//! Questo modulo aggrega i risultati dei worker e calcola le metriche derivate.
//!
//! ## Responsabilità:
//! - `WorkerResult`: conteggio e tempo di un singolo worker (anche formato wire dei nodi)
//! - `RunSummary`: totali di un run, per-worker ordinati per id, metriche derivate
//! - `SpeedupTable`: confronto dello sweep di worker contro la baseline a 1 worker
//! - Guardia unica contro divisioni per zero: metrica "undefined", mai panic o infinito
//!
//! ## Metriche:
//! - **throughput**: immagini processate al secondo
//! - **efficiency**: durata di riferimento / durata osservata
//! - **speedup**: tempo baseline (1 worker) / tempo osservato
//!
//! ## Esempio output:
//! ```text
//! Workers  | Time (s) | Speedup | Efficiency
//! -------- | -------- | ------- | ----------
//! 1        | 0.84     | 1.00x   | 1.00
//! 2        | 0.45     | 1.87x   | 0.93
//! ```

use crate::runner::Strategy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

pub const METRIC_THROUGHPUT: &str = "throughput";
pub const METRIC_EFFICIENCY: &str = "efficiency";

/// Per-worker outcome of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResult {
    pub worker_id: usize,
    /// Tasks claimed (parallel) or assigned (distributed) to this worker
    pub assigned_count: usize,
    /// Tasks that succeeded
    pub processed_count: usize,
    pub elapsed_seconds: f64,
}

impl WorkerResult {
    pub fn failed_count(&self) -> usize {
        self.assigned_count.saturating_sub(self.processed_count)
    }

    pub fn throughput(&self) -> Option<f64> {
        ratio(self.processed_count as f64, self.elapsed_seconds)
    }
}

/// `numerator / denominator`, undefined for a non-positive or non-finite denominator
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator.is_finite() && denominator > 0.0 && numerator.is_finite() {
        Some(numerator / denominator)
    } else {
        None
    }
}

/// Efficiency of a run against a reference duration
pub fn efficiency(reference_seconds: f64, elapsed_seconds: f64) -> Option<f64> {
    if reference_seconds <= 0.0 {
        return None;
    }
    ratio(reference_seconds, elapsed_seconds)
}

/// Render an optional metric, `N/A` when undefined
pub fn format_metric(value: Option<f64>, suffix: &str) -> String {
    match value {
        Some(v) => format!("{:.2}{}", v, suffix),
        None => "N/A".to_string(),
    }
}

/// Terminal artifact of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub strategy: Strategy,
    pub worker_count: usize,
    pub total_tasks: usize,
    pub total_processed: usize,
    pub total_failed: usize,
    pub total_elapsed_seconds: f64,
    pub per_worker: Vec<WorkerResult>,
    pub derived_metrics: BTreeMap<String, f64>,
}

impl RunSummary {
    pub fn new(
        strategy: Strategy,
        worker_count: usize,
        total_tasks: usize,
        total_elapsed_seconds: f64,
        mut per_worker: Vec<WorkerResult>,
    ) -> Self {
        per_worker.sort_by_key(|w| w.worker_id);
        let total_processed: usize = per_worker.iter().map(|w| w.processed_count).sum();

        let mut summary = Self {
            strategy,
            worker_count,
            total_tasks,
            total_processed,
            total_failed: total_tasks.saturating_sub(total_processed),
            total_elapsed_seconds,
            per_worker,
            derived_metrics: BTreeMap::new(),
        };

        if let Some(throughput) = ratio(total_processed as f64, total_elapsed_seconds) {
            summary
                .derived_metrics
                .insert(METRIC_THROUGHPUT.to_string(), throughput);
        }

        summary
    }

    /// Summary of a run that had nothing to do
    pub fn empty(strategy: Strategy, worker_count: usize) -> Self {
        Self::new(strategy, worker_count, 0, 0.0, Vec::new())
    }

    /// Add the efficiency metric against a reference duration
    pub fn with_reference(mut self, reference_seconds: f64) -> Self {
        if let Some(value) = efficiency(reference_seconds, self.total_elapsed_seconds) {
            self.derived_metrics
                .insert(METRIC_EFFICIENCY.to_string(), value);
        }
        self
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.derived_metrics.get(name).copied()
    }

    pub fn format_summary(&self) -> String {
        format!(
            "{} | Workers: {} | Processed: {}/{} | Failed: {} | Time: {:.2}s | Throughput: {}",
            self.strategy,
            self.worker_count,
            self.total_processed,
            self.total_tasks,
            self.total_failed,
            self.total_elapsed_seconds,
            format_metric(self.metric(METRIC_THROUGHPUT), " img/s"),
        )
    }

    /// One line per worker, e.g. `Node 1 processed 3 images in 0.40s`
    pub fn format_workers(&self) -> Vec<String> {
        let label = match self.strategy {
            Strategy::Distributed => "Node",
            _ => "Worker",
        };
        self.per_worker
            .iter()
            .map(|w| {
                format!(
                    "{} {} processed {}/{} images in {:.2}s ({})",
                    label,
                    w.worker_id,
                    w.processed_count,
                    w.assigned_count,
                    w.elapsed_seconds,
                    format_metric(w.throughput(), " img/s"),
                )
            })
            .collect()
    }
}

/// One row of the worker-count sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedupRow {
    pub workers: usize,
    pub elapsed_seconds: f64,
    pub processed: usize,
    pub speedup: Option<f64>,
    pub efficiency: Option<f64>,
}

/// Speedup of each sweep run against the single-worker run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeedupTable {
    pub rows: Vec<SpeedupRow>,
}

impl SpeedupTable {
    pub fn from_runs(runs: &[RunSummary]) -> Self {
        let baseline = runs
            .iter()
            .find(|run| run.worker_count == 1)
            .map(|run| run.total_elapsed_seconds);

        let rows = runs
            .iter()
            .map(|run| {
                let speedup = baseline.and_then(|base| {
                    if base <= 0.0 {
                        None
                    } else {
                        ratio(base, run.total_elapsed_seconds)
                    }
                });
                SpeedupRow {
                    workers: run.worker_count,
                    elapsed_seconds: run.total_elapsed_seconds,
                    processed: run.total_processed,
                    speedup,
                    efficiency: speedup.and_then(|s| ratio(s, run.worker_count as f64)),
                }
            })
            .collect();

        Self { rows }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Workers  | Time (s) | Speedup | Efficiency");
        let _ = writeln!(out, "-------- | -------- | ------- | ----------");
        for row in &self.rows {
            let _ = writeln!(
                out,
                "{:<8} | {:<8.2} | {:<7} | {}",
                row.workers,
                row.elapsed_seconds,
                format_metric(row.speedup, "x"),
                format_metric(row.efficiency, ""),
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(id: usize, assigned: usize, processed: usize, secs: f64) -> WorkerResult {
        WorkerResult {
            worker_id: id,
            assigned_count: assigned,
            processed_count: processed,
            elapsed_seconds: secs,
        }
    }

    fn run(workers: usize, secs: f64) -> RunSummary {
        RunSummary::new(Strategy::Parallel, workers, 10, secs, vec![worker(1, 10, 10, secs)])
    }

    #[test]
    fn test_totals_are_sums_over_workers() {
        let summary = RunSummary::new(
            Strategy::Distributed,
            2,
            7,
            1.0,
            vec![worker(2, 4, 4, 0.8), worker(1, 3, 2, 0.6)],
        );
        assert_eq!(summary.total_processed, 6);
        assert_eq!(summary.total_failed, 1);
        assert_eq!(summary.per_worker[0].worker_id, 1);
        assert_eq!(summary.per_worker[1].failed_count(), 0);
        assert_eq!(summary.metric(METRIC_THROUGHPUT), Some(6.0));
    }

    #[test]
    fn test_efficiency_guard() {
        assert_eq!(efficiency(0.71, 0.0), None);
        assert_eq!(efficiency(0.71, -1.0), None);
        assert_eq!(efficiency(0.0, 1.0), None);
        assert_eq!(efficiency(1.0, 0.5), Some(2.0));
        assert_eq!(ratio(1.0, f64::NAN), None);
        assert_eq!(ratio(1.0, f64::INFINITY), None);
    }

    #[test]
    fn test_zero_elapsed_has_no_metrics() {
        let summary = RunSummary::new(Strategy::Sequential, 1, 3, 0.0, vec![worker(0, 3, 3, 0.0)])
            .with_reference(0.71);
        assert!(summary.metric(METRIC_THROUGHPUT).is_none());
        assert!(summary.metric(METRIC_EFFICIENCY).is_none());
        assert!(summary.format_summary().contains("N/A"));
    }

    #[test]
    fn test_with_reference_adds_efficiency() {
        let summary = RunSummary::new(Strategy::Distributed, 2, 4, 0.5, vec![worker(1, 4, 4, 0.5)])
            .with_reference(1.0);
        assert_eq!(summary.metric(METRIC_EFFICIENCY), Some(2.0));
    }

    #[test]
    fn test_speedup_against_single_worker() {
        let table = SpeedupTable::from_runs(&[run(1, 4.0), run(2, 2.0), run(4, 1.0)]);
        assert_eq!(table.rows[0].speedup, Some(1.0));
        assert_eq!(table.rows[1].speedup, Some(2.0));
        assert_eq!(table.rows[2].speedup, Some(4.0));
        assert_eq!(table.rows[2].efficiency, Some(1.0));
    }

    #[test]
    fn test_speedup_undefined_without_usable_baseline() {
        let zero_baseline = SpeedupTable::from_runs(&[run(1, 0.0), run(2, 1.0)]);
        assert!(zero_baseline.rows.iter().all(|r| r.speedup.is_none()));

        let no_baseline = SpeedupTable::from_runs(&[run(2, 1.0), run(4, 0.5)]);
        assert!(no_baseline.rows.iter().all(|r| r.speedup.is_none()));
        assert!(no_baseline.render().contains("N/A"));
    }

    #[test]
    fn test_worker_lines_use_node_label_for_distributed() {
        let summary = RunSummary::new(Strategy::Distributed, 2, 2, 1.0, vec![worker(1, 1, 1, 0.5), worker(2, 1, 1, 0.5)]);
        let lines = summary.format_workers();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Node 1 processed 1/1"));
    }
}
