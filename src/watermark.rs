//! # Watermark Module
//!
//! Disegna il testo del watermark nell'angolo in basso a destra.
//!
//! ## Responsabilità:
//! - Risoluzione del font (path esplicito, altrimenti font di sistema)
//! - Misura del testo PRIMA del posizionamento
//! - Ancoraggio bottom-right con margine fisso, sempre dentro i bordi
//!
//! Se nessun font è disponibile il watermark viene saltato: il task resta
//! valido, il resize viene comunque applicato.

use crate::error::{BatchError, Result};
use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::path::Path;
use tracing::{debug, warn};

/// Magenta text color
pub const WATERMARK_COLOR: Rgb<u8> = Rgb([255, 0, 255]);

const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/System/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Text watermark renderer
pub struct Watermark {
    text: String,
    margin: u32,
    scale: PxScale,
    font: Option<FontVec>,
}

impl Watermark {
    /// Build a watermark, resolving the font.
    ///
    /// An explicit `font_path` must load; without one the first readable
    /// system font is used, and if there is none the text is skipped.
    pub fn new(text: &str, margin: u32, font_size: f32, font_path: Option<&Path>) -> Result<Self> {
        let font = match font_path {
            Some(path) => Some(Self::load_font(path)?),
            None => Self::system_font(),
        };

        if font.is_none() && !text.is_empty() {
            warn!("No usable font found, watermark text will be skipped");
        }

        Ok(Self {
            text: text.to_string(),
            margin,
            scale: PxScale::from(font_size),
            font,
        })
    }

    /// Watermark that never draws (used when no text rendering is wanted)
    pub fn disabled(text: &str, margin: u32) -> Self {
        Self {
            text: text.to_string(),
            margin,
            scale: PxScale::from(12.0),
            font: None,
        }
    }

    /// Load a TrueType/OpenType font from disk
    pub fn load_font(path: &Path) -> Result<FontVec> {
        let data = std::fs::read(path)
            .map_err(|e| BatchError::Font(format!("{}: {}", path.display(), e)))?;
        FontVec::try_from_vec(data)
            .map_err(|_| BatchError::Font(format!("Failed to parse font file: {}", path.display())))
    }

    /// First readable font among well-known system locations
    pub fn system_font() -> Option<FontVec> {
        for path in SYSTEM_FONT_PATHS {
            if let Ok(font) = Self::load_font(Path::new(path)) {
                debug!("Loaded system font: {}", path);
                return Some(font);
            }
        }
        None
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Rendered text dimensions, if a font is available
    pub fn measure(&self) -> Option<(u32, u32)> {
        let font = self.font.as_ref()?;
        Some(text_size(self.scale, font, &self.text))
    }

    /// Top-left corner of a `text_w x text_h` box anchored bottom-right.
    ///
    /// Clamped to the image origin when the text is larger than the space
    /// left by the margin.
    pub fn anchor(
        image_w: u32,
        image_h: u32,
        text_w: u32,
        text_h: u32,
        margin: u32,
    ) -> (i32, i32) {
        let x = image_w.saturating_sub(text_w).saturating_sub(margin);
        let y = image_h.saturating_sub(text_h).saturating_sub(margin);
        (
            i32::try_from(x).unwrap_or(i32::MAX),
            i32::try_from(y).unwrap_or(i32::MAX),
        )
    }

    /// Draw the watermark onto `img`; no-op without font or text
    pub fn apply(&self, img: &mut RgbImage) {
        let Some(font) = self.font.as_ref() else {
            return;
        };
        if self.text.is_empty() {
            return;
        }

        let (text_w, text_h) = text_size(self.scale, font, &self.text);
        let (x, y) = Self::anchor(img.width(), img.height(), text_w, text_h, self.margin);
        draw_text_mut(img, WATERMARK_COLOR, x, y, self.scale, font, &self.text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_anchor_bottom_right_with_margin() {
        assert_eq!(Watermark::anchor(128, 128, 30, 12, 10), (88, 106));
    }

    #[test]
    fn test_longer_text_moves_left() {
        let (short_x, _) = Watermark::anchor(128, 128, 20, 12, 10);
        let (long_x, _) = Watermark::anchor(128, 128, 60, 12, 10);
        assert!(long_x < short_x);
        assert!(long_x as u32 + 60 <= 128);
    }

    #[test]
    fn test_anchor_clamps_oversized_text() {
        assert_eq!(Watermark::anchor(16, 16, 200, 40, 10), (0, 0));
    }

    #[test]
    fn test_anchor_saturates_instead_of_wrapping() {
        assert_eq!(
            Watermark::anchor(u32::MAX, u32::MAX, 0, 0, 0),
            (i32::MAX, i32::MAX)
        );
        let (x, y) = Watermark::anchor(u32::MAX, 100, 10, 10, 10);
        assert_eq!((x, y), (i32::MAX, 80));
    }

    #[test]
    fn test_disabled_watermark_leaves_image_untouched() {
        let mut img = RgbImage::from_pixel(32, 32, Rgb([1, 2, 3]));
        let watermark = Watermark::disabled("Image", 10);
        watermark.apply(&mut img);
        assert!(img.pixels().all(|p| *p == Rgb([1, 2, 3])));
        assert!(watermark.measure().is_none());
    }

    #[test]
    fn test_invalid_explicit_font_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let bogus = temp_dir.path().join("bogus.ttf");
        std::fs::write(&bogus, b"not a font").unwrap();
        assert!(matches!(
            Watermark::new("Image", 10, 12.0, Some(&bogus)),
            Err(BatchError::Font(_))
        ));
        assert!(Watermark::new("Image", 10, 12.0, Some(&temp_dir.path().join("missing.ttf"))).is_err());
    }

    #[test]
    fn test_system_font_draws_inside_bounds() {
        // Only meaningful on hosts that ship one of the known fonts
        let watermark = Watermark::new("Image", 10, 12.0, None).unwrap();
        if !watermark.has_font() {
            return;
        }
        let mut img = RgbImage::new(128, 128);
        watermark.apply(&mut img);
        assert!(img.pixels().any(|p| p.0 != [0, 0, 0]));

        let (w, h) = watermark.measure().unwrap();
        assert!(w > 0 && h > 0);
        assert!(w + 10 <= 128);
    }
}
