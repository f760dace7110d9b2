use crate::overlay::domain::overlay_box::OverlayBox;
use crate::shared::frame::Frame;

/// Outline thickness in pixels.
const STROKE: u32 = 2;

/// Strokes each box outline into an RGB frame in place. Text is left to
/// richer renderers; the box color carries the eye-contact state.
pub fn draw_overlay(frame: &mut Frame, boxes: &[OverlayBox]) {
    if frame.channels() < 3 || frame.width() == 0 || frame.height() == 0 {
        return;
    }
    for b in boxes {
        let bbox = b.bounding_box.clamp_to(frame.width(), frame.height());
        if bbox.is_empty() {
            continue;
        }
        let x1 = bbox.x as u32;
        let y1 = bbox.y as u32;
        let x2 = ((bbox.x + bbox.width).ceil() as u32).min(frame.width()) - 1;
        let y2 = ((bbox.y + bbox.height).ceil() as u32).min(frame.height()) - 1;
        stroke_rect(frame, (x1, y1, x2, y2), b.color);
    }
}

/// Inclusive pixel corners.
fn stroke_rect(frame: &mut Frame, (x1, y1, x2, y2): (u32, u32, u32, u32), color: [u8; 3]) {
    let mut pixels = frame.as_ndarray_mut();
    let mut put = |x: u32, y: u32| {
        for (c, value) in color.iter().enumerate() {
            pixels[[y as usize, x as usize, c]] = *value;
        }
    };

    for t in 0..STROKE {
        let top = (y1 + t).min(y2);
        let bottom = y2.saturating_sub(t).max(y1);
        for x in x1..=x2 {
            put(x, top);
            put(x, bottom);
        }
        let left = (x1 + t).min(x2);
        let right = x2.saturating_sub(t).max(x1);
        for y in y1..=y2 {
            put(left, y);
            put(right, y);
        }
    }
}
