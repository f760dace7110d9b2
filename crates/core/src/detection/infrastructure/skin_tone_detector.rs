//! Model-free fallback detector: skin-tone mask + connected components.
//!
//! Every pixel is classified with a fixed RGB rule, the resulting mask is
//! segmented into 4-connected regions by an explicit-stack flood fill, and
//! sufficiently large regions become face candidates. Accuracy is modest;
//! the point is that it always loads.

use crate::detection::domain::face_candidate::FaceCandidate;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::math::sort_by_confidence;

/// Components smaller than this are noise, not regions.
pub const MIN_REGION_AREA: usize = 500;

/// Regions smaller than this are not promoted to face candidates.
pub const MIN_FACE_AREA: usize = 1000;

/// Area at which confidence would reach 1.0 before capping.
const CONFIDENCE_AREA_SCALE: f64 = 10_000.0;

const MAX_CONFIDENCE: f64 = 0.9;

/// A connected group of skin pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct SkinRegion {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    /// Pixel count (not bounding-box area).
    pub area: usize,
}

impl SkinRegion {
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(
            self.min_x as f64,
            self.min_y as f64,
            (self.max_x - self.min_x + 1) as f64,
            (self.max_y - self.min_y + 1) as f64,
        )
    }

    pub fn confidence(&self) -> f64 {
        (self.area as f64 / CONFIDENCE_AREA_SCALE).min(MAX_CONFIDENCE)
    }
}

/// Skin rule over RGB channel relationships: red dominant, enough spread
/// between channels, and red clearly above both green and blue.
pub fn is_skin([r, g, b]: [u8; 3]) -> bool {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    r > 95 && g > 40 && b > 20 && max - min > 15 && (r - g).abs() > 15 && r > g && r > b
}

/// Skin-tone heuristic backend. Keeps its mask buffers between frames.
#[derive(Default)]
pub struct SkinToneDetector {
    mask: Vec<bool>,
    visited: Vec<bool>,
    stack: Vec<(u32, u32)>,
}

impl SkinToneDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds every skin region of at least [`MIN_REGION_AREA`] pixels.
    pub fn find_regions(&mut self, frame: &Frame) -> Vec<SkinRegion> {
        let w = frame.width();
        let h = frame.height();
        let len = w as usize * h as usize;

        self.mask.clear();
        self.mask.reserve(len);
        for y in 0..h {
            for x in 0..w {
                self.mask.push(is_skin(frame.rgb_at(x, y)));
            }
        }
        self.visited.clear();
        self.visited.resize(len, false);

        let mut regions = Vec::new();
        for y in 0..h {
            for x in 0..w {
                let idx = y as usize * w as usize + x as usize;
                if !self.mask[idx] || self.visited[idx] {
                    continue;
                }
                let region = self.flood_fill(x, y, w, h);
                if region.area >= MIN_REGION_AREA {
                    regions.push(region);
                }
            }
        }
        regions
    }

    fn flood_fill(&mut self, start_x: u32, start_y: u32, w: u32, h: u32) -> SkinRegion {
        let mut region = SkinRegion {
            min_x: start_x,
            min_y: start_y,
            max_x: start_x,
            max_y: start_y,
            area: 0,
        };

        self.stack.clear();
        self.stack.push((start_x, start_y));
        self.visited[start_y as usize * w as usize + start_x as usize] = true;

        while let Some((x, y)) = self.stack.pop() {
            region.area += 1;
            region.min_x = region.min_x.min(x);
            region.min_y = region.min_y.min(y);
            region.max_x = region.max_x.max(x);
            region.max_y = region.max_y.max(y);

            let neighbors = [
                (x.checked_sub(1), Some(y)),
                ((x + 1 < w).then_some(x + 1), Some(y)),
                (Some(x), y.checked_sub(1)),
                (Some(x), (y + 1 < h).then_some(y + 1)),
            ];
            for (nx, ny) in neighbors {
                let (Some(nx), Some(ny)) = (nx, ny) else {
                    continue;
                };
                let idx = ny as usize * w as usize + nx as usize;
                if self.mask[idx] && !self.visited[idx] {
                    self.visited[idx] = true;
                    self.stack.push((nx, ny));
                }
            }
        }
        region
    }
}

impl FaceDetector for SkinToneDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceCandidate>, Box<dyn std::error::Error>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }
        let mut candidates: Vec<FaceCandidate> = self
            .find_regions(frame)
            .into_iter()
            .filter(|r| r.area >= MIN_FACE_AREA)
            .map(|r| FaceCandidate::new(r.bounding_box(), r.confidence()))
            .collect();
        sort_by_confidence(&mut candidates);
        Ok(candidates)
    }

    fn release(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.mask = Vec::new();
        self.visited = Vec::new();
        self.stack = Vec::new();
        Ok(())
    }
}
