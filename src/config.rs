//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri del batch
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//! - Deriva le `TransformSettings` passate a ogni worker
//!
//! ## Parametri di configurazione:
//! - `input_dir`: Directory sorgente (default: `images_dataset`)
//! - `output_dir`: Directory base di output; ogni strategia scrive nella sua sottocartella
//! - `width` / `height`: Risoluzione finale (default: 128x128)
//! - `watermark_text`: Testo del watermark (default: "Image")
//! - `worker_counts`: Sweep del pool di thread (default: 1, 2, 4, 8)
//! - `node_count`: Numero di nodi isolati in modalità distribuita (default: 2)
//! - `reference_sequential_secs`: Durata di riferimento per l'efficienza (default: None)
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     width: 256,
//!     height: 256,
//!     node_count: 4,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::error::{BatchError, Result};
use crate::image_processor::TransformSettings;
use crate::runner::Strategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the input image tree
    pub input_dir: PathBuf,
    /// Base directory under which each strategy writes its own output tree
    pub output_dir: PathBuf,
    /// Target width in pixels
    pub width: u32,
    /// Target height in pixels
    pub height: u32,
    /// Watermark text drawn in the bottom-right corner
    pub watermark_text: String,
    /// Distance in pixels between the watermark and the image border
    pub watermark_margin: u32,
    /// Watermark font size in pixels
    pub font_size: f32,
    /// Font file for the watermark (None = look for a system font)
    pub font_path: Option<PathBuf>,
    /// Worker counts swept by the parallel strategy
    pub worker_counts: Vec<usize>,
    /// Number of isolated nodes in distributed mode
    pub node_count: usize,
    /// Reference duration used for the efficiency metric
    pub reference_sequential_secs: Option<f64>,
    /// Per-node timeout in distributed mode (None = wait forever)
    pub node_timeout_secs: Option<u64>,
    /// Show progress bars
    pub show_progress: bool,
    /// Output progress and summaries as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("images_dataset"),
            output_dir: PathBuf::from("."),
            width: 128,
            height: 128,
            watermark_text: "Image".to_string(),
            watermark_margin: 10,
            font_size: 12.0,
            font_path: None,
            worker_counts: vec![1, 2, 4, 8],
            node_count: 2,
            reference_sequential_secs: None,
            node_timeout_secs: None,
            show_progress: true,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(BatchError::Validation(format!(
                "Target resolution must be positive, got {}x{}",
                self.width, self.height
            )));
        }

        if self.worker_counts.is_empty() {
            return Err(BatchError::Validation(
                "At least one worker count is required".to_string(),
            ));
        }

        if self.worker_counts.contains(&0) {
            return Err(BatchError::Validation(
                "Number of workers must be greater than 0".to_string(),
            ));
        }

        if self.node_count == 0 {
            return Err(BatchError::Validation(
                "Number of nodes must be greater than 0".to_string(),
            ));
        }

        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(BatchError::Validation(format!(
                "Font size must be positive, got {}",
                self.font_size
            )));
        }

        if let Some(reference) = self.reference_sequential_secs {
            if !reference.is_finite() || reference < 0.0 {
                return Err(BatchError::Validation(format!(
                    "Reference duration must be a non-negative number, got {}",
                    reference
                )));
            }
        }

        if self.node_timeout_secs == Some(0) {
            return Err(BatchError::Validation(
                "Node timeout must be greater than 0 seconds".to_string(),
            ));
        }

        Ok(())
    }

    /// Output tree for one strategy, e.g. `<output_dir>/output_parallel`
    pub fn output_root(&self, strategy: Strategy) -> PathBuf {
        self.output_dir.join(strategy.output_dir_name())
    }

    /// Transform parameters shared by every worker
    pub fn transform_settings(&self) -> TransformSettings {
        TransformSettings {
            width: self.width,
            height: self.height,
            watermark_text: self.watermark_text.clone(),
            margin: self.watermark_margin,
            font_size: self.font_size,
            font_path: self.font_path.clone(),
        }
    }

    pub fn node_timeout(&self) -> Option<Duration> {
        self.node_timeout_secs.map(Duration::from_secs)
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file not found: {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
