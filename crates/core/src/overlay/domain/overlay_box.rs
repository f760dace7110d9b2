use crate::shared::bounding_box::BoundingBox;
use crate::shared::detected_face::DetectedFace;

pub const EYE_CONTACT_COLOR: [u8; 3] = [0, 200, 0];
pub const NO_EYE_CONTACT_COLOR: [u8; 3] = [220, 0, 0];

/// One face box ready to draw onto a display surface.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayBox {
    /// In target-surface coordinates.
    pub bounding_box: BoundingBox,
    pub color: [u8; 3],
    pub label: String,
    /// Rounded percentage, e.g. `"87%"`.
    pub confidence_text: String,
}

/// Maps detected faces from source-frame pixels onto a target surface of
/// a possibly different size.
pub fn build_overlay(
    faces: &[DetectedFace],
    source: (u32, u32),
    target: (u32, u32),
) -> Vec<OverlayBox> {
    if source.0 == 0 || source.1 == 0 {
        return Vec::new();
    }
    let sx = target.0 as f64 / source.0 as f64;
    let sy = target.1 as f64 / source.1 as f64;

    faces
        .iter()
        .map(|face| {
            let (color, status) = if face.eye_contact {
                (EYE_CONTACT_COLOR, "eye contact")
            } else {
                (NO_EYE_CONTACT_COLOR, "looking away")
            };
            OverlayBox {
                bounding_box: face.bounding_box.scale(sx, sy).clamp_to(target.0, target.1),
                color,
                label: format!("{}: {status}", face.id),
                confidence_text: format!("{:.0}%", face.confidence * 100.0),
            }
        })
        .collect()
}
