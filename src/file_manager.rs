//! # File Management Module
//!
//! Questo modulo gestisce la discovery delle immagini e le operazioni sul filesystem.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva delle immagini nella directory di input
//! - Ordine di visita deterministico (walkdir ordinato per nome)
//! - Costruzione dei `Task` con path relativo per il mirroring dell'output
//! - Creazione idempotente delle directory di output
//!
//! ## Formati riconosciuti (case-insensitive):
//! - JPG, JPEG, PNG, BMP, JFIF, WebP
//!
//! ## Esempio:
//! ```rust,ignore
//! let tasks = FileManager::find_images(Path::new("images_dataset"));
//! if tasks.is_empty() {
//!     // niente da fare, non è un errore
//! }
//! ```

use crate::task::Task;
use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Recognized image extensions, lowercase
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "jfif", "webp"];

/// State of the input root before listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootStatus {
    Missing,
    NotADirectory,
    Ready,
}

/// Manages file discovery and output directories
pub struct FileManager;

impl FileManager {
    /// Classify the input root so callers can report "missing" apart from "empty"
    pub fn root_status(root: &Path) -> RootStatus {
        if !root.exists() {
            RootStatus::Missing
        } else if !root.is_dir() {
            RootStatus::NotADirectory
        } else {
            RootStatus::Ready
        }
    }

    /// Find all supported images under `root`, in deterministic walk order.
    ///
    /// A missing root or a tree without images yields an empty vector.
    pub fn find_images(root: &Path) -> Vec<Task> {
        if !root.is_dir() {
            return Vec::new();
        }

        let mut tasks = Vec::new();

        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    debug!("Skipping unreadable entry: {}", err);
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if !Self::is_supported_image(path) {
                continue;
            }

            let relative_dir = path
                .parent()
                .and_then(|parent| parent.strip_prefix(root).ok())
                .map(Path::to_path_buf)
                .unwrap_or_default();
            let file_name = entry.file_name().to_string_lossy().into_owned();

            tasks.push(Task::new(path.to_path_buf(), relative_dir, file_name));
        }

        tasks
    }

    /// Check if a file has a recognized image extension
    pub fn is_supported_image(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Create `dir` and its parents; succeeds if it already exists.
    ///
    /// Several workers may race to create the same parent, so an
    /// `AlreadyExists` from a concurrent creator is not an error.
    pub fn ensure_dir(dir: &Path) -> io::Result<()> {
        match std::fs::create_dir_all(dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Count regular files under `root` (used to verify mirrored output trees)
    pub fn count_files(root: &Path) -> usize {
        WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .count()
    }

    /// Human-readable path for log lines
    pub fn display_name(path: &Path) -> String {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    }
}
