/// Box-only face detector: BlazeFace short-range model via `ort`.
///
/// Lightweight and landmark-free; it stands in for a platform face
/// detector when the landmark model is unavailable.
use std::path::Path;

use crate::detection::domain::face_candidate::FaceCandidate;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::execution_provider::build_session;
use super::math::{nms, sigmoid};

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

const NMS_IOU_THRESH: f64 = 0.3;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// Regressor values per anchor: box (4) + 6 keypoints (12), keypoints unused.
const REGRESSOR_STRIDE: usize = 16;

pub struct OnnxBoxDetector {
    session: Option<ort::session::Session>,
    confidence: f64,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBoxDetector {
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: Some(build_session(model_path)?),
            confidence,
            anchors: generate_anchors(),
        })
    }
}

impl FaceDetector for OnnxBoxDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceCandidate>, Box<dyn std::error::Error>> {
        let session = self.session.as_mut().ok_or("box model released")?;

        let input_tensor = preprocess(frame, INPUT_SIZE);
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = session.run(ort::inputs![input_value])?;

        // regressors: [1, 896, 16], classificators: [1, 896, 1]
        if outputs.len() < 2 {
            return Err(format!("box model expected 2 outputs, got {}", outputs.len()).into());
        }
        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let reg_data = regressors.as_slice().ok_or("Cannot get regressor slice")?;
        let score_data = scores.as_slice().ok_or("Cannot get score slice")?;

        let raw = decode_anchors(
            reg_data,
            score_data,
            &self.anchors,
            self.confidence,
            frame.width(),
            frame.height(),
        );
        Ok(nms(raw, NMS_IOU_THRESH))
    }

    fn release(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.session = None;
        Ok(())
    }
}

/// Decodes anchor-relative boxes with sigmoid scores above `min_confidence`
/// into frame-clamped candidates.
fn decode_anchors(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    min_confidence: f64,
    fw: u32,
    fh: u32,
) -> Vec<FaceCandidate> {
    let size = INPUT_SIZE as f32;
    let mut candidates = Vec::new();

    for (i, &raw_score) in score_data.iter().enumerate().take(anchors.len()) {
        let score = sigmoid(raw_score);
        if (score as f64) < min_confidence {
            continue;
        }
        let offset = i * REGRESSOR_STRIDE;
        if offset + 4 > reg_data.len() {
            break;
        }

        let anchor = anchors[i];
        let cx = anchor[0] + reg_data[offset] / size;
        let cy = anchor[1] + reg_data[offset + 1] / size;
        let w = reg_data[offset + 2] / size;
        let h = reg_data[offset + 3] / size;

        let bbox = BoundingBox::from_corners(
            ((cx - w / 2.0) * fw as f32) as f64,
            ((cy - h / 2.0) * fh as f32) as f64,
            ((cx + w / 2.0) * fw as f32) as f64,
            ((cy + h / 2.0) * fh as f32) as f64,
        )
        .clamp_to(fw, fh);

        if !bbox.is_empty() {
            candidates.push(FaceCandidate::new(bbox, score as f64));
        }
    }
    candidates
}

/// Resize frame to `size × size` and normalize to [0,1] NCHW float32.
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    tensor
}

/// BlazeFace short-range anchors: 16×16 grid with 2 anchors per cell,
/// then 8×8 with 6.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)]; // (stride, anchors_per_cell)
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_preprocess_shape() {
        let frame = Frame::filled(200, 100, [128, 128, 128], 0);
        assert_eq!(preprocess(&frame, 128).shape(), &[1, 3, 128, 128]);
    }

    #[test]
    fn test_preprocess_normalized() {
        let frame = Frame::filled(50, 50, [255, 255, 255], 0);
        assert!((preprocess(&frame, 128)[[0, 0, 0, 0]] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_generate_anchors_count_and_range() {
        let anchors = generate_anchors();
        assert_eq!(anchors.len(), NUM_ANCHORS);
        assert!(anchors
            .iter()
            .all(|a| a[0] > 0.0 && a[0] < 1.0 && a[1] > 0.0 && a[1] < 1.0));
    }

    #[test]
    fn test_decode_single_confident_anchor() {
        let anchors = vec![[0.5f32, 0.5]];
        // Box 32x32 model px centered on the anchor: 0.25 of the frame each way
        let mut reg = vec![0.0f32; REGRESSOR_STRIDE];
        reg[2] = 32.0;
        reg[3] = 32.0;
        let scores = vec![5.0f32];

        let faces = decode_anchors(&reg, &scores, &anchors, 0.5, 400, 200);

        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].bounding_box, BoundingBox::new(150.0, 75.0, 100.0, 50.0));
        assert_relative_eq!(faces[0].confidence, sigmoid(5.0) as f64, epsilon = 1e-6);
        assert!(faces[0].landmarks.is_none());
    }

    #[test]
    fn test_decode_skips_low_scores() {
        let anchors = vec![[0.5f32, 0.5]];
        let reg = vec![0.0f32; REGRESSOR_STRIDE];
        let faces = decode_anchors(&reg, &[-5.0], &anchors, 0.5, 100, 100);
        assert!(faces.is_empty());
    }

    #[test]
    fn test_decode_clamps_to_frame() {
        let anchors = vec![[0.0f32, 0.0]];
        let mut reg = vec![0.0f32; REGRESSOR_STRIDE];
        reg[2] = 64.0;
        reg[3] = 64.0;
        let faces = decode_anchors(&reg, &[5.0], &anchors, 0.5, 100, 100);
        assert_eq!(faces[0].bounding_box, BoundingBox::new(0.0, 0.0, 25.0, 25.0));
    }
}
