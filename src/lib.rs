//! # Image Batch Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per i test di integrazione
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom
//! - `task`: Modello dati di un task (input, percorso relativo, nome)
//! - `file_manager`: Discovery delle immagini e creazione cartelle di output
//! - `watermark`: Font, misura e posizionamento del testo
//! - `image_processor`: Transform condiviso (decode, resize, watermark, encode)
//! - `runner`: Strategie sequenziale, parallela e distribuita + orchestratore
//! - `report`: Summary per run, metriche derivate, tabella di speedup
//! - `progress`: Progress bar e spinner
//! - `json_output`: Eventi JSON su stdout
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use image_batch::{BatchRunner, Config, Strategy};
//!
//! let runner = BatchRunner::new(Config::default())?;
//! let outcome = runner.run(&[Strategy::Sequential, Strategy::Parallel]).await?;
//! ```

pub mod config;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod json_output;
pub mod progress;
pub mod report;
pub mod runner;
pub mod task;
pub mod watermark;

pub use config::Config;
pub use error::BatchError;
pub use image_processor::{ImageProcessor, TransformSettings};
pub use report::{RunSummary, SpeedupTable, WorkerResult};
pub use runner::{BatchOutcome, BatchRunner, Strategy};
pub use task::Task;
