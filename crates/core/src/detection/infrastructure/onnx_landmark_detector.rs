/// Landmark-capable face detector: YOLO pose-head face model via `ort`.
///
/// Handles letterbox preprocessing, inference, keypoint decoding and NMS.
/// Each candidate carries the five WIDER FACE keypoints, which the head
/// pose estimator prefers over box geometry.
use std::path::Path;

use crate::detection::domain::face_candidate::FaceCandidate;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::execution_provider::build_session;
use super::math::nms;

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default confidence threshold for face detection.
pub const DEFAULT_CONFIDENCE: f64 = 0.25;

const NMS_IOU_THRESH: f64 = 0.45;

/// Number of keypoint values per detection (5 landmarks × x, y, conf).
const NUM_KEYPOINT_VALUES: usize = 15;

/// Minimum keypoint confidence to treat a landmark as visible.
const KEYPOINT_CONF_THRESH: f64 = 0.5;

pub struct OnnxLandmarkDetector {
    session: Option<ort::session::Session>,
    confidence: f64,
    input_size: u32,
}

impl OnnxLandmarkDetector {
    /// Load the model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (NCHW),
    /// falling back to 640 when the shape is dynamic.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = build_session(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    (shape.len() >= 4 && shape[2] > 0).then(|| shape[2] as u32)
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        Ok(Self {
            session: Some(session),
            confidence,
            input_size,
        })
    }
}

impl FaceDetector for OnnxLandmarkDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceCandidate>, Box<dyn std::error::Error>> {
        let session = self.session.as_mut().ok_or("landmark model released")?;

        let (input_tensor, letterbox) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("landmark model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let raw = decode_output(data, &shape, &letterbox, self.confidence)?;
        let candidates = nms(raw, NMS_IOU_THRESH)
            .into_iter()
            .map(|c| FaceCandidate {
                bounding_box: c.bounding_box.clamp_to(frame.width(), frame.height()),
                ..c
            })
            .filter(|c| !c.bounding_box.is_empty())
            .collect();
        Ok(candidates)
    }

    fn release(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.session = None;
        Ok(())
    }
}

/// Mapping from letterboxed model coordinates back to the source frame.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn unmap(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

/// Decodes raw model output into candidates in source-frame coordinates.
///
/// Output shape is `[1, features, detections]` (transposed) or
/// `[1, detections, features]`; both are accepted. Row layout:
/// `[cx, cy, w, h, conf, kp0_x, kp0_y, kp0_conf, ...]`.
fn decode_output(
    data: &[f32],
    shape: &[usize],
    letterbox: &Letterbox,
    min_confidence: f64,
) -> Result<Vec<FaceCandidate>, Box<dyn std::error::Error>> {
    if shape.len() != 3 {
        return Err(format!("Unexpected landmark model output shape: {shape:?}").into());
    }
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if data.len() < num_dets * num_feats {
        return Err("landmark model output shorter than its shape".into());
    }

    let mut candidates = Vec::new();
    for i in 0..num_dets {
        let row: Vec<f32> = if transposed {
            (0..num_feats).map(|f| data[f * num_dets + i]).collect()
        } else {
            data[i * num_feats..(i + 1) * num_feats].to_vec()
        };
        if row.len() < 5 {
            continue;
        }
        let conf = row[4] as f64;
        if conf < min_confidence {
            continue;
        }

        let (cx, cy, w, h) = (row[0] as f64, row[1] as f64, row[2] as f64, row[3] as f64);
        let (x1, y1) = letterbox.unmap(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.unmap(cx + w / 2.0, cy + h / 2.0);
        let mut candidate = FaceCandidate::new(BoundingBox::from_corners(x1, y1, x2, y2), conf);

        if row.len() >= 5 + NUM_KEYPOINT_VALUES {
            let mut pts = [(0.0f64, 0.0f64); 5];
            for (k, pt) in pts.iter_mut().enumerate() {
                let base = 5 + k * 3;
                if row[base + 2] as f64 >= KEYPOINT_CONF_THRESH {
                    *pt = letterbox.unmap(row[base] as f64, row[base + 1] as f64);
                }
                // else: stays (0, 0), treated as invisible by FaceLandmarks
            }
            candidate = candidate.with_landmarks(FaceLandmarks::new(pts));
        }
        candidates.push(candidate);
    }
    Ok(candidates)
}

/// Letterbox-resize a frame to `target_size` × `target_size` (NCHW, [0,1]).
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding is 114/255 gray, YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn identity() -> Letterbox {
        Letterbox {
            scale: 1.0,
            pad_x: 0,
            pad_y: 0,
        }
    }

    /// Row-major output with `rows` detections of 20 features; only the
    /// first row is filled in. More rows than features keeps the layout
    /// unambiguous.
    fn row_major(first: &[f32], rows: usize) -> (Vec<f32>, Vec<usize>) {
        let mut data = vec![0.0f32; rows * 20];
        data[..first.len()].copy_from_slice(first);
        (data, vec![1, rows, 20])
    }

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // 200x100 → 640: scale 3.2, new 640x320, pad_y 160
        let frame = Frame::filled(200, 100, [128, 128, 128], 0);
        let (tensor, lb) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_relative_eq!(lb.scale, 3.2, epsilon = 0.01);
        assert_eq!(lb.pad_x, 0);
        assert_eq!(lb.pad_y, 160);
    }

    #[test]
    fn test_letterbox_values_normalized() {
        let frame = Frame::filled(100, 50, [255, 255, 255], 0);
        let (tensor, lb) = letterbox(&frame, 640);

        let y = lb.pad_y as usize + 1;
        assert!((tensor[[0, 0, y, 1]] - 1.0).abs() < 0.01);
        assert!((tensor[[0, 0, 0, 0]] - 114.0 / 255.0).abs() < 0.01);
    }

    #[test]
    fn test_unmap_inverts_letterbox() {
        let lb = Letterbox {
            scale: 2.0,
            pad_x: 0,
            pad_y: 40,
        };
        assert_eq!(lb.unmap(100.0, 140.0), (50.0, 50.0));
    }

    #[test]
    fn test_decode_row_major_with_keypoints() {
        // One detection, 20 features: box + conf + 5 keypoints
        let mut row = vec![100.0f32, 100.0, 40.0, 60.0, 0.9];
        for (x, y) in [(90.0, 90.0), (110.0, 90.0), (100.0, 100.0), (92.0, 115.0), (108.0, 115.0)] {
            row.extend_from_slice(&[x, y, 0.95]);
        }
        let (data, shape) = row_major(&row, 25);
        let faces = decode_output(&data, &shape, &identity(), 0.25).unwrap();

        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].bounding_box, BoundingBox::new(80.0, 70.0, 40.0, 60.0));
        let lm = faces[0].landmarks.as_ref().unwrap();
        assert_eq!(lm.nose(), Some((100.0, 100.0)));
        assert_eq!(lm.eye_midpoint(), Some((100.0, 90.0)));
    }

    #[test]
    fn test_decode_transposed_layout() {
        // Six detections × 5 features, stored feature-major: [1, 5, 6].
        // Only the first detection clears the confidence threshold.
        let mut data = vec![0.0f32; 30];
        let first = [10.0f32, 10.0, 4.0, 4.0, 0.9];
        for (f, v) in first.iter().enumerate() {
            data[f * 6] = *v;
        }
        let faces = decode_output(&data, &[1, 5, 6], &identity(), 0.25).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].bounding_box, BoundingBox::new(8.0, 8.0, 4.0, 4.0));
        assert!(faces[0].landmarks.is_none());
    }

    #[test]
    fn test_low_confidence_keypoints_are_invisible() {
        let mut row = vec![100.0f32, 100.0, 40.0, 60.0, 0.9];
        for _ in 0..5 {
            row.extend_from_slice(&[95.0, 95.0, 0.1]);
        }
        let (data, shape) = row_major(&row, 25);
        let faces = decode_output(&data, &shape, &identity(), 0.25).unwrap();
        let lm = faces[0].landmarks.as_ref().unwrap();
        assert!(lm.nose().is_none());
        assert!(lm.eye_midpoint().is_none());
    }

    #[test]
    fn test_decode_rejects_bad_shape() {
        assert!(decode_output(&[0.0; 4], &[4], &identity(), 0.25).is_err());
        assert!(decode_output(&[0.0; 4], &[1, 1, 20], &identity(), 0.25).is_err());
    }
}
