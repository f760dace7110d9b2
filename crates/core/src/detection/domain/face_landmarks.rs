//! Per-face reference points produced by landmark-capable backends.
//!
//! The five core keypoints follow the WIDER FACE ordering used by the
//! landmark model: left eye, right eye, nose tip, left and right mouth
//! corners. Forehead and chin are optional contour points; when present
//! they give a direct estimate of face height.

pub const LEFT_EYE: usize = 0;
pub const RIGHT_EYE: usize = 1;
pub const NOSE: usize = 2;
pub const LEFT_MOUTH: usize = 3;
pub const RIGHT_MOUTH: usize = 4;

pub type Point = (f64, f64);

#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    /// Points with x <= 0 are treated as invisible.
    points: [Point; 5],
    forehead: Option<Point>,
    chin: Option<Point>,
}

impl FaceLandmarks {
    pub fn new(points: [Point; 5]) -> Self {
        Self {
            points,
            forehead: None,
            chin: None,
        }
    }

    pub fn with_contour(mut self, forehead: Point, chin: Point) -> Self {
        self.forehead = Some(forehead);
        self.chin = Some(chin);
        self
    }

    pub fn points(&self) -> &[Point; 5] {
        &self.points
    }

    pub fn nose(&self) -> Option<Point> {
        self.visible(NOSE)
    }

    pub fn left_eye(&self) -> Option<Point> {
        self.visible(LEFT_EYE)
    }

    pub fn right_eye(&self) -> Option<Point> {
        self.visible(RIGHT_EYE)
    }

    /// Midpoint between the two eyes, if both are visible.
    pub fn eye_midpoint(&self) -> Option<Point> {
        let (l, r) = (self.left_eye()?, self.right_eye()?);
        Some(((l.0 + r.0) / 2.0, (l.1 + r.1) / 2.0))
    }

    /// Euclidean distance between the eyes, if both are visible.
    pub fn eye_span(&self) -> Option<f64> {
        let (l, r) = (self.left_eye()?, self.right_eye()?);
        Some((r.0 - l.0).hypot(r.1 - l.1))
    }

    /// Forehead-to-chin distance, when the contour points are known.
    pub fn contour_height(&self) -> Option<f64> {
        let (f, c) = (self.forehead?, self.chin?);
        let h = (c.0 - f.0).hypot(c.1 - f.1);
        (h > 0.0).then_some(h)
    }

    fn visible(&self, idx: usize) -> Option<Point> {
        let p = self.points[idx];
        (p.0 > 0.0).then_some(p)
    }
}
