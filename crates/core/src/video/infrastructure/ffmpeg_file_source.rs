use std::path::Path;
use std::time::Instant;

use crate::shared::frame::Frame;
use crate::video::domain::frame_pacer::FramePacer;
use crate::video::domain::video_source::VideoSource;

/// Replays a video file as a live source via ffmpeg-next.
///
/// Frames are decoded on demand and paced against the caller's clock at
/// the container's native frame rate. When capture falls behind, the
/// frames in between are decoded and dropped so only the current one is
/// delivered.
pub struct FfmpegFileSource {
    ictx: Option<ffmpeg_next::format::context::Input>,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    video_stream_index: usize,
    width: u32,
    height: u32,
    pacer: FramePacer,
    next_index: usize,
    flushing: bool,
    done: bool,
}

// Safety: FfmpegFileSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegFileSource {}

impl FfmpegFileSource {
    pub fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(path)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::info!(
            "Opened {} ({width}x{height} @ {fps:.2} fps)",
            path.display()
        );

        Ok(Self {
            ictx: Some(ictx),
            decoder,
            scaler,
            video_stream_index,
            width,
            height,
            pacer: FramePacer::new(fps),
            next_index: 0,
            flushing: false,
            done: false,
        })
    }

    pub fn fps(&self) -> f64 {
        self.pacer.fps()
    }

    fn try_receive(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&decoded, &mut rgb_frame)?;

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, 3, self.next_index);
        self.next_index += 1;
        Ok(Some(frame))
    }

    /// Decodes the next frame in stream order, `None` at end of stream.
    fn decode_next(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if self.done {
            return Ok(None);
        }
        if let Some(frame) = self.try_receive()? {
            return Ok(Some(frame));
        }
        if self.flushing {
            self.done = true;
            return Ok(None);
        }

        loop {
            let Some(ictx) = self.ictx.as_mut() else {
                self.done = true;
                return Ok(None);
            };
            let Some((stream, packet)) = ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                if let Some(frame) = self.try_receive()? {
                    return Ok(Some(frame));
                }
                self.done = true;
                return Ok(None);
            };

            if stream.index() != self.video_stream_index {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            if let Some(frame) = self.try_receive()? {
                return Ok(Some(frame));
            }
        }
    }
}

impl VideoSource for FfmpegFileSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn is_ready(&self) -> bool {
        self.ictx.is_some()
    }

    fn capture(&mut self, now: Instant) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if !self.is_ready() {
            return Ok(None);
        }
        let Some(target) = self.pacer.due(now) else {
            return Ok(None);
        };

        let mut latest = None;
        let mut skipped = 0usize;
        while self.next_index <= target {
            match self.decode_next()? {
                Some(frame) => {
                    if latest.replace(frame).is_some() {
                        skipped += 1;
                    }
                }
                None => break,
            }
        }
        if skipped > 0 {
            log::debug!("Dropped {skipped} frame(s) behind the clock");
        }

        Ok(latest.inspect(|frame| self.pacer.mark_emitted(frame.index())))
    }

    fn is_exhausted(&self) -> bool {
        self.done
    }

    fn close(&mut self) {
        self.ictx = None;
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// stripping any per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
