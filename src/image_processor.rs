//! # Image Processor Module
//!
//! Il transform unico condiviso da tutte le strategie di esecuzione.
//!
//! ## Responsabilità:
//! - Decodifica dell'immagine sorgente (formato dedotto dal contenuto)
//! - Normalizzazione a RGB8 e resize alla risoluzione target
//! - Watermark testuale tramite il modulo `watermark`
//! - Scrittura nel percorso specchiato, con formato scelto dall'estensione
//!
//! Ogni errore resta confinato al singolo task: `process` restituisce un
//! `TaskOutcome` fallito e il worker passa al task successivo.

use crate::error::{BatchError, Result};
use crate::file_manager::FileManager;
use crate::task::{Task, TaskOutcome};
use crate::watermark::Watermark;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, ImageReader, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parameters of the fixed transform, shared by every worker.
///
/// Serializable because distributed nodes receive them through their
/// assignment instead of sharing the coordinator's memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformSettings {
    pub width: u32,
    pub height: u32,
    pub watermark_text: String,
    pub margin: u32,
    pub font_size: f32,
    pub font_path: Option<PathBuf>,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            width: 128,
            height: 128,
            watermark_text: "Image".to_string(),
            margin: 10,
            font_size: 12.0,
            font_path: None,
        }
    }
}

/// # Image Processor
///
/// The single transform applied by every execution strategy:
/// decode → RGB8 → resize → watermark → encode → write.
///
/// ## Contract
/// - Works on one task at a time and holds no mutable state, so one instance
///   can be shared by all threads of the pool (`&self`, `Send + Sync`)
/// - Creates the mirrored output directory idempotently; concurrent workers
///   writing siblings under the same parent do not interfere
/// - Never panics or propagates past `process`: any decode/encode/I-O error
///   becomes a failed `TaskOutcome` for that task only
///
/// ## Output format
/// Chosen from the output file extension (`jfif` is written as JPEG), so the
/// mirrored file keeps its original name.
pub struct ImageProcessor {
    settings: TransformSettings,
    watermark: Watermark,
}

impl ImageProcessor {
    /// Creates a processor, resolving the watermark font once.
    ///
    /// # Errors
    /// Returns `BatchError::Font` if an explicit font path cannot be loaded.
    pub fn new(settings: TransformSettings) -> Result<Self> {
        let watermark = Watermark::new(
            &settings.watermark_text,
            settings.margin,
            settings.font_size,
            settings.font_path.as_deref(),
        )?;
        Ok(Self {
            settings,
            watermark,
        })
    }

    /// Processor whose watermark step is a no-op
    pub fn without_text_rendering(settings: TransformSettings) -> Self {
        let watermark = Watermark::disabled(&settings.watermark_text, settings.margin);
        Self {
            settings,
            watermark,
        }
    }

    pub fn settings(&self) -> &TransformSettings {
        &self.settings
    }

    pub fn watermark(&self) -> &Watermark {
        &self.watermark
    }

    /// Transform one task, reporting failure instead of returning an error
    pub fn process(&self, task: &Task, output_root: &Path) -> TaskOutcome {
        match self.transform(task, output_root) {
            Ok(output_path) => {
                debug!(
                    "Wrote {} -> {}",
                    task.input_path.display(),
                    output_path.display()
                );
                TaskOutcome::success()
            }
            Err(e) => TaskOutcome::failure(e.to_string()),
        }
    }

    /// Transform one task and return the written output path
    pub fn transform(&self, task: &Task, output_root: &Path) -> Result<PathBuf> {
        let output_path = task.output_path(output_root);
        let format = Self::output_format(&output_path)?;

        let decoded = ImageReader::open(&task.input_path)?
            .with_guessed_format()?
            .decode()?;
        let rendered = self.render(decoded);

        FileManager::ensure_dir(&task.output_dir(output_root))?;
        rendered.save_with_format(&output_path, format)?;

        Ok(output_path)
    }

    /// Normalize to RGB8, resize to the target resolution and draw the watermark
    pub fn render(&self, image: DynamicImage) -> RgbImage {
        let rgb = image.into_rgb8();
        let mut resized = imageops::resize(
            &rgb,
            self.settings.width,
            self.settings.height,
            FilterType::Triangle,
        );
        self.watermark.apply(&mut resized);
        resized
    }

    /// Encoder for an output path, from its extension
    pub fn output_format(path: &Path) -> Result<ImageFormat> {
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "jpg" | "jpeg" | "jfif" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            "bmp" => Ok(ImageFormat::Bmp),
            "webp" => Ok(ImageFormat::WebP),
            _ => Err(BatchError::Encode(path.display().to_string())),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixture helpers shared by the runner tests

    use crate::file_manager::FileManager;
    use crate::task::Task;
    use image::{Rgb, RgbImage};
    use std::path::Path;

    /// Write `count` small valid PNGs spread over two subdirectories
    pub fn write_images(root: &Path, count: usize) {
        for i in 0..count {
            let dir = if i % 2 == 0 { root.join("even") } else { root.join("odd") };
            std::fs::create_dir_all(&dir).unwrap();
            let img = RgbImage::from_pixel(40, 30, Rgb([(i * 20 % 255) as u8, 80, 160]));
            img.save(dir.join(format!("img_{:03}.png", i))).unwrap();
        }
    }

    /// Write a file with an image extension and garbage content
    pub fn write_corrupt(root: &Path, name: &str) {
        std::fs::create_dir_all(root).unwrap();
        std::fs::write(root.join(name), b"definitely not an image").unwrap();
    }

    pub fn list(root: &Path) -> Vec<Task> {
        FileManager::find_images(root)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn processor() -> ImageProcessor {
        ImageProcessor::without_text_rendering(TransformSettings::default())
    }

    #[test]
    fn test_output_format_from_extension() {
        assert_eq!(ImageProcessor::output_format(Path::new("a.JPG")).unwrap(), ImageFormat::Jpeg);
        assert_eq!(ImageProcessor::output_format(Path::new("a.jfif")).unwrap(), ImageFormat::Jpeg);
        assert_eq!(ImageProcessor::output_format(Path::new("a.png")).unwrap(), ImageFormat::Png);
        assert_eq!(ImageProcessor::output_format(Path::new("a.bmp")).unwrap(), ImageFormat::Bmp);
        assert_eq!(ImageProcessor::output_format(Path::new("a.webp")).unwrap(), ImageFormat::WebP);
        assert!(ImageProcessor::output_format(Path::new("a.gif")).is_err());
    }

    #[test]
    fn test_render_resizes_to_target() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 200, Rgb([9, 9, 9])));
        let rendered = processor().render(img);
        assert_eq!(rendered.dimensions(), (128, 128));
    }

    #[test]
    fn test_transform_writes_mirrored_output() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_images(input.path(), 2);

        let tasks = list(input.path());
        let processor = processor();
        for task in &tasks {
            let outcome = processor.process(task, output.path());
            assert!(outcome.succeeded, "{:?}", outcome.error);
        }

        let written = output.path().join("even/img_000.png");
        let reopened = image::open(&written).unwrap();
        assert_eq!((reopened.width(), reopened.height()), (128, 128));
        assert!(output.path().join("odd/img_001.png").exists());
    }

    #[test]
    fn test_jfif_and_bmp_round_trip() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let img = RgbImage::from_pixel(20, 20, Rgb([200, 10, 10]));
        img.save_with_format(input.path().join("photo.jfif"), ImageFormat::Jpeg).unwrap();
        img.save_with_format(input.path().join("scan.bmp"), ImageFormat::Bmp).unwrap();

        let processor = processor();
        for task in list(input.path()) {
            assert!(processor.process(&task, output.path()).succeeded);
        }
        assert!(output.path().join("photo.jfif").exists());
        assert!(output.path().join("scan.bmp").exists());
    }

    #[test]
    fn test_corrupt_input_is_a_failed_outcome() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_corrupt(input.path(), "broken.jpg");

        let tasks = list(input.path());
        assert_eq!(tasks.len(), 1);
        let outcome = processor().process(&tasks[0], output.path());
        assert!(!outcome.succeeded);
        assert!(outcome.error.is_some());
        assert!(!output.path().join("broken.jpg").exists());
    }

    #[test]
    fn test_missing_input_is_a_failed_outcome() {
        let output = TempDir::new().unwrap();
        let task = Task::new(
            output.path().join("gone.png"),
            PathBuf::new(),
            "gone.png".to_string(),
        );
        assert!(!processor().process(&task, output.path()).succeeded);
    }
}
