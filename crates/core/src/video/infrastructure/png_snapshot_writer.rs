use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;
use crate::video::domain::snapshot_writer::SnapshotWriter;

/// Writes each frame as `frame_NNNNNN.png` under one directory, using the
/// `image` crate.
pub struct PngSnapshotWriter {
    dir: PathBuf,
    written: usize,
}

impl PngSnapshotWriter {
    /// Creates the directory if needed.
    pub fn new(dir: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: 0,
        })
    }

    pub fn path_for(&self, frame_index: usize) -> PathBuf {
        self.dir.join(format!("frame_{frame_index:06}.png"))
    }
}

impl SnapshotWriter for PngSnapshotWriter {
    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if frame.channels() != 3 {
            return Err(format!("expected RGB frame, got {} channels", frame.channels()).into());
        }
        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("Failed to create image from frame data")?;
        img.save(self.path_for(frame.index()))?;
        self.written += 1;
        Ok(())
    }

    fn written(&self) -> usize {
        self.written
    }
}
