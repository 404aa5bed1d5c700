// Upstream hazard detection for the runner: overlays a `b x b` grid on a grayscale
// survey image and flags every cell whose pixel spread falls inside a brightness-
// adjusted band. The planner itself never sees pixels, only the flagged labels.
//
// Scales: the per-cell standard deviation is measured on 16-bit samples, but the
// brightness that shifts the band is the mean on the 8-bit scale, divided by the
// 16-bit maximum. The shift is therefore small (a mid-gray image moves the band from
// (10000, 20000) to (9980, 19960)), which is the behavior the thresholds were tuned for.

use anyhow::{Context, Result};
use hazard_survey::core_modules::cell::cell::{CellLabel, Coordinate, GridGeometry};
use image::{ImageBuffer, Luma};
use std::collections::BTreeMap;
use std::path::Path;

const BASE_MIN_THRESHOLD: f64 = 10_000.0;
const BASE_MAX_THRESHOLD: f64 = 20_000.0;
const LUMA16_MAX: f64 = u16::MAX as f64;
/// `to_luma16` widens an 8-bit sample `v` to `v * 257`.
const LUMA8_TO_LUMA16: f64 = 257.0;

type Gray16Image = ImageBuffer<Luma<u16>, Vec<u16>>;

/// The result of scanning one image.
#[derive(Debug, Clone)]
pub struct HazardScan {
    pub image_width: u32,
    pub image_height: u32,
    pub geometry: GridGeometry,
    pub thresholds: (f64, f64),
    /// Flagged labels, ascending.
    pub flagged: Vec<CellLabel>,
    /// Pixel-space center of every flagged cell.
    pub centers: BTreeMap<CellLabel, Coordinate>,
}

pub fn scan_image(path: &Path, dimension: u32) -> Result<HazardScan> {
    let gray = image::open(path)
        .with_context(|| format!("failed to open image {}", path.display()))?
        .to_luma16();
    scan_luma(&gray, dimension)
}

pub fn scan_luma(gray: &Gray16Image, dimension: u32) -> Result<HazardScan> {
    let (width, height) = gray.dimensions();
    let geometry = GridGeometry::from_image_size(width, height, dimension)
        .with_context(|| format!("a {dimension}x{dimension} grid does not fit a {width}x{height} image"))?;
    let cell_width = width / dimension;
    let cell_height = height / dimension;

    let thresholds = dynamic_thresholds(mean_brightness(gray) / LUMA8_TO_LUMA16);
    let (min_threshold, max_threshold) = thresholds;

    let mut flagged = Vec::new();
    let mut centers = BTreeMap::new();
    for row in 0..dimension {
        for col in 0..dimension {
            let spread = cell_std_dev(gray, col * cell_width, row * cell_height, cell_width, cell_height);
            if (min_threshold..=max_threshold).contains(&spread) {
                let label = row * dimension + col + 1;
                centers.insert(label, geometry.cell_center(label)?);
                flagged.push(label);
            }
        }
    }

    Ok(HazardScan {
        image_width: width,
        image_height: height,
        geometry,
        thresholds,
        flagged,
        centers,
    })
}

/// Brighter images get a lower band. `mean_brightness` is on the 8-bit scale.
pub fn dynamic_thresholds(mean_brightness: f64) -> (f64, f64) {
    let adjustment = mean_brightness / LUMA16_MAX;
    (
        (BASE_MIN_THRESHOLD * (1.0 - adjustment)).trunc(),
        (BASE_MAX_THRESHOLD * (1.0 - adjustment)).trunc(),
    )
}

fn mean_brightness(gray: &Gray16Image) -> f64 {
    let count = gray.width() as usize * gray.height() as usize;
    if count == 0 {
        return 0.0;
    }
    gray.pixels().map(|p| p.0[0] as f64).sum::<f64>() / count as f64
}

/// Population standard deviation of the pixels in one cell.
fn cell_std_dev(gray: &Gray16Image, left: u32, top: u32, width: u32, height: u32) -> f64 {
    let count = (width * height) as f64;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in top..top + height {
        for x in left..left + width {
            let value = gray.get_pixel(x, y).0[0] as f64;
            sum += value;
            sum_sq += value * value;
        }
    }
    let mean = sum / count;
    (sum_sq / count - mean * mean).max(0.0).sqrt()
}
