use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::video::domain::frame_pacer::FramePacer;
use crate::video::domain::video_source::VideoSource;

/// Replays a directory of still images, sorted by file name, as a live
/// source at a fixed frame rate. Images are decoded lazily with `image`
/// and resized to the first image's dimensions when they differ.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    width: u32,
    height: u32,
    pacer: FramePacer,
    closed: bool,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path, fps: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let paths = list_images(dir)?;
        let first = paths
            .first()
            .ok_or_else(|| format!("No images found in {}", dir.display()))?;
        let (width, height) = image::image_dimensions(first)?;

        log::info!(
            "Opened {} image(s) from {} ({width}x{height})",
            paths.len(),
            dir.display()
        );

        Ok(Self {
            paths,
            width,
            height,
            pacer: FramePacer::new(fps),
            closed: false,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn decode(&self, index: usize) -> Result<Frame, Box<dyn std::error::Error>> {
        let mut img = image::open(&self.paths[index])?.to_rgb8();
        if img.dimensions() != (self.width, self.height) {
            img = image::imageops::resize(
                &img,
                self.width,
                self.height,
                image::imageops::FilterType::Triangle,
            );
        }
        Ok(Frame::new(img.into_raw(), self.width, self.height, 3, index))
    }
}

/// Image files directly inside `dir`, sorted by name.
fn list_images(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_image(p))
        .collect();
    paths.sort();
    Ok(paths)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl VideoSource for ImageSequenceSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn is_ready(&self) -> bool {
        !self.closed
    }

    fn capture(&mut self, now: Instant) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if self.closed || self.is_exhausted() {
            return Ok(None);
        }
        let Some(target) = self.pacer.due(now) else {
            return Ok(None);
        };
        let index = target.min(self.paths.len() - 1);
        if self.pacer.last_emitted() == Some(index) {
            return Ok(None);
        }

        // Mark before decoding so an unreadable image is skipped, not retried.
        self.pacer.mark_emitted(index);
        self.decode(index).map(Some)
    }

    fn is_exhausted(&self) -> bool {
        self.pacer.last_emitted() == Some(self.paths.len().saturating_sub(1))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn write_png(dir: &Path, name: &str, w: u32, h: u32, rgb: [u8; 3]) {
        image::RgbImage::from_pixel(w, h, image::Rgb(rgb))
            .save(dir.join(name))
            .unwrap();
    }

    fn sequence(count: usize) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..count {
            write_png(dir.path(), &format!("img_{i:03}.png"), 32, 24, [i as u8 * 10, 0, 0]);
        }
        dir
    }

    #[test]
    fn test_open_reads_dimensions_from_first_image() {
        let dir = sequence(3);
        let source = ImageSequenceSource::open(dir.path(), 10.0).unwrap();
        assert_eq!(source.dimensions(), (32, 24));
        assert_eq!(source.len(), 3);
        assert!(source.is_ready());
    }

    #[test]
    fn test_open_empty_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"not an image").unwrap();
        assert!(ImageSequenceSource::open(dir.path(), 10.0).is_err());
    }

    #[test]
    fn test_frames_follow_name_order_and_clock() {
        let dir = sequence(3);
        let mut source = ImageSequenceSource::open(dir.path(), 10.0).unwrap();
        let t0 = Instant::now();

        let first = source.capture(t0).unwrap().unwrap();
        assert_eq!(first.index(), 0);
        assert_eq!(first.rgb_at(0, 0), [0, 0, 0]);
        assert!(source.capture(t0 + Duration::from_millis(50)).unwrap().is_none());

        let second = source.capture(t0 + Duration::from_millis(100)).unwrap().unwrap();
        assert_eq!(second.index(), 1);
        assert_eq!(second.rgb_at(0, 0), [10, 0, 0]);
    }

    #[test]
    fn test_exhausts_after_last_image() {
        let dir = sequence(2);
        let mut source = ImageSequenceSource::open(dir.path(), 10.0).unwrap();
        let t0 = Instant::now();
        source.capture(t0).unwrap();
        let last = source.capture(t0 + Duration::from_secs(10)).unwrap().unwrap();
        assert_eq!(last.index(), 1);
        assert!(source.is_exhausted());
        assert!(source.capture(t0 + Duration::from_secs(11)).unwrap().is_none());
    }

    #[test]
    fn test_mismatched_image_is_resized() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", 32, 24, [200, 100, 50]);
        write_png(dir.path(), "b.png", 64, 48, [200, 100, 50]);
        let mut source = ImageSequenceSource::open(dir.path(), 10.0).unwrap();
        let t0 = Instant::now();
        source.capture(t0).unwrap();
        let frame = source.capture(t0 + Duration::from_millis(100)).unwrap().unwrap();
        assert_eq!((frame.width(), frame.height()), (32, 24));
    }

    #[test]
    fn test_closed_source_is_not_ready() {
        let dir = sequence(1);
        let mut source = ImageSequenceSource::open(dir.path(), 10.0).unwrap();
        source.close();
        assert!(!source.is_ready());
        assert!(source.capture(Instant::now()).unwrap().is_none());
    }
}
