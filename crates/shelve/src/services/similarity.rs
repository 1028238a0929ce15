use crate::error::{Result, ShelveError};
use image::imageops::FilterType;
use image::GrayImage;
use std::cell::Cell;
use std::path::Path;

const THUMB_SIZE: u32 = 64;
// Stabilizers for 8-bit luminance: (0.01 * 255)^2 and (0.03 * 255)^2.
const C1: f64 = 6.5025;
const C2: f64 = 58.5225;

/// Scores how visually alike two files are, from 0.0 (unrelated) to 1.0.
pub trait SimilarityScorer {
    fn score(&self, base: &Path, candidate: &Path) -> Result<f64>;
}

/// Global structural similarity over grayscale thumbnails.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageSimilarity;

impl ImageSimilarity {
    fn thumbnail(path: &Path) -> Result<GrayImage> {
        let img = image::open(path).map_err(|e| ShelveError::ExternalTool {
            tool: "image".to_string(),
            message: format!("{}: {}", path.display(), e),
        })?;
        Ok(img
            .resize_exact(THUMB_SIZE, THUMB_SIZE, FilterType::Triangle)
            .to_luma8())
    }
}

impl SimilarityScorer for ImageSimilarity {
    fn score(&self, base: &Path, candidate: &Path) -> Result<f64> {
        let a = Self::thumbnail(base)?;
        let b = Self::thumbnail(candidate)?;
        Ok(ssim(&a, &b))
    }
}

fn ssim(a: &GrayImage, b: &GrayImage) -> f64 {
    let xs: Vec<f64> = a.pixels().map(|p| p.0[0] as f64).collect();
    let ys: Vec<f64> = b.pixels().map(|p| p.0[0] as f64).collect();
    let n = xs.len().min(ys.len()) as f64;
    if n == 0.0 {
        return 0.0;
    }

    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let (mut var_x, mut var_y, mut cov) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(&ys) {
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
        cov += (x - mean_x) * (y - mean_y);
    }
    var_x /= n;
    var_y /= n;
    cov /= n;

    let score = ((2.0 * mean_x * mean_y + C1) * (2.0 * cov + C2))
        / ((mean_x.powi(2) + mean_y.powi(2) + C1) * (var_x + var_y + C2));
    score.clamp(0.0, 1.0)
}

/// Returns the same score for every pair and counts calls.
#[derive(Debug, Default)]
pub struct FixedSimilarity {
    pub value: f64,
    calls: Cell<usize>,
}

impl FixedSimilarity {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl SimilarityScorer for FixedSimilarity {
    fn score(&self, _base: &Path, _candidate: &Path) -> Result<f64> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.value)
    }
}
