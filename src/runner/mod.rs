//! # Runner Module
//!
//! Strategie di esecuzione sullo stesso transform, separate in sottomoduli:
//! - `batch_runner`: Orchestratore principale (listing, guardie, summary)
//! - `sequential`: Un solo worker, ordine di listing
//! - `parallel`: Pool di thread che condividono una coda di claim
//! - `distributed`: Nodi isolati con partizioni statiche e report fan-in
//! - `node`: Entry point del singolo nodo isolato
//! - `partition`: Split contiguo e bilanciato della lista di task

pub mod batch_runner;
pub mod distributed;
pub mod node;
pub mod parallel;
pub mod partition;
pub mod sequential;

pub use batch_runner::{BatchOutcome, BatchRunner};
pub use distributed::{DistributedRunner, InProcessLauncher, NodeLauncher, ProcessLauncher};
pub use node::NodeAssignment;
pub use parallel::ParallelRunner;
pub use sequential::SequentialRunner;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution strategy of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Sequential,
    Parallel,
    Distributed,
}

impl Strategy {
    /// Name of this strategy's output tree under the output base directory
    pub fn output_dir_name(&self) -> &'static str {
        match self {
            Strategy::Sequential => "output_seq",
            Strategy::Parallel => "output_parallel",
            Strategy::Distributed => "output_distributed",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Sequential => "Sequential",
            Strategy::Parallel => "Parallel",
            Strategy::Distributed => "Distributed",
        };
        f.write_str(name)
    }
}
