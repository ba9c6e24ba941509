//! # Task Data Model
//!
//! Un `Task` è una singola immagine da trasformare: immutabile, creato dal
//! lister, consumato esattamente una volta da un solo worker.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One image to transform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Absolute (or root-joined) path of the source image
    pub input_path: PathBuf,
    /// Parent directory of the image relative to the input root ("" at the root)
    pub relative_dir: PathBuf,
    /// File name, reused unchanged for the output
    pub file_name: String,
}

impl Task {
    pub fn new(input_path: PathBuf, relative_dir: PathBuf, file_name: String) -> Self {
        Self {
            input_path,
            relative_dir,
            file_name,
        }
    }

    /// Directory that will hold this task's output under `output_root`
    pub fn output_dir(&self, output_root: &Path) -> PathBuf {
        output_root.join(&self.relative_dir)
    }

    /// Mirrored output path under `output_root`
    pub fn output_path(&self, output_root: &Path) -> PathBuf {
        self.output_dir(output_root).join(&self.file_name)
    }
}

/// Result of transforming a single task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub succeeded: bool,
    pub error: Option<String>,
}

impl TaskOutcome {
    pub fn success() -> Self {
        Self {
            succeeded: true,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_mirrors_relative_dir() {
        let task = Task::new(
            PathBuf::from("/data/in/cats/a.png"),
            PathBuf::from("cats"),
            "a.png".to_string(),
        );
        assert_eq!(
            task.output_path(Path::new("/data/out")),
            PathBuf::from("/data/out/cats/a.png")
        );
    }

    #[test]
    fn test_output_path_at_root() {
        let task = Task::new(
            PathBuf::from("/data/in/a.png"),
            PathBuf::new(),
            "a.png".to_string(),
        );
        assert_eq!(
            task.output_path(Path::new("/data/out")),
            PathBuf::from("/data/out/a.png")
        );
    }

    #[test]
    fn test_outcome_constructors() {
        assert!(TaskOutcome::success().succeeded);
        let failed = TaskOutcome::failure("bad header");
        assert!(!failed.succeeded);
        assert_eq!(failed.error.as_deref(), Some("bad header"));
    }
}
