//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della libreria.
//!
//! ## Responsabilità:
//! - Definisce `BatchError` enum per categorizzare gli errori possibili
//! - Integra con `thiserror` per automatic error conversion
//! - Distingue errori locali al singolo task da errori strutturali del run
//!
//! ## Categorie di errori:
//! - `Io` / `Image` / `Encode`: fallimenti di un singolo task (mai propagati oltre il task)
//! - `Font`: font del watermark non caricabile
//! - `Validation`: parametri di configurazione non validi
//! - `WorkerPanicked`: un thread del pool è terminato in panic
//! - `MissingReport`: un nodo distribuito non ha consegnato il suo risultato
//! - `NodeProtocol` / `Json`: handoff assignment/report malformato
//!
//! ## Esempio:
//! ```rust,ignore
//! if reports.len() < node_count {
//!     return Err(BatchError::MissingReport { node_id, reason: "no report".into() });
//! }
//! ```

/// Custom error types for batch processing
#[derive(thiserror::Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unsupported output format: {0}")]
    Encode(String),

    #[error("Font error: {0}")]
    Font(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Worker {worker_id} panicked")]
    WorkerPanicked { worker_id: usize },

    #[error("Node {node_id} did not report a result: {reason}")]
    MissingReport { node_id: usize, reason: String },

    #[error("Node protocol error: {0}")]
    NodeProtocol(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = BatchError> = std::result::Result<T, E>;
