//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per l'uso programmatico
//! del batch (script di benchmark, pipeline CI).
//!
//! ## Responsabilità:
//! - Emette un messaggio JSON per riga su stdout
//! - Riutilizza le strutture del report (`RunSummary`, `SpeedupRow`) senza duplicarle
//! - I log restano su stderr, quindi stdout contiene solo JSON
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio batch con numero di task e configurazione
//! - `run_complete`: Fine di un run con il suo `RunSummary`
//! - `speedup`: Tabella di speedup dello sweep parallelo
//! - `error`: Errore fatale

use crate::config::Config;
use crate::report::{RunSummary, SpeedupRow, SpeedupTable};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Inizio del batch
    #[serde(rename = "start")]
    Start {
        input_dir: PathBuf,
        output_dir: PathBuf,
        total_tasks: usize,
        config: JsonConfig,
    },

    /// Un run è terminato
    #[serde(rename = "run_complete")]
    RunComplete { summary: RunSummary },

    /// Confronto dello sweep contro la baseline a 1 worker
    #[serde(rename = "speedup")]
    Speedup { rows: Vec<SpeedupRow> },

    /// Errore generale
    #[serde(rename = "error")]
    Error {
        message: String,
        details: Option<String>,
    },
}

/// Configurazione per output JSON
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonConfig {
    pub width: u32,
    pub height: u32,
    pub watermark_text: String,
    pub worker_counts: Vec<usize>,
    pub node_count: usize,
    pub reference_sequential_secs: Option<f64>,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(config: &Config, total_tasks: usize) -> Self {
        Self::Start {
            input_dir: config.input_dir.clone(),
            output_dir: config.output_dir.clone(),
            total_tasks,
            config: JsonConfig::from(config),
        }
    }

    pub fn run_complete(summary: &RunSummary) -> Self {
        Self::RunComplete {
            summary: summary.clone(),
        }
    }

    pub fn speedup(table: &SpeedupTable) -> Self {
        Self::Speedup {
            rows: table.rows.clone(),
        }
    }

    /// Crea un messaggio di errore
    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        Self {
            width: config.width,
            height: config.height,
            watermark_text: config.watermark_text.clone(),
            worker_counts: config.worker_counts.clone(),
            node_count: config.node_count,
            reference_sequential_secs: config.reference_sequential_secs,
        }
    }
}
