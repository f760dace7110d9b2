use ndarray::{ArrayView3, ArrayViewMut3};

/// A single captured video frame: contiguous RGB bytes in row-major order.
///
/// `index` is the source's monotonically increasing frame number; the
/// scheduler uses it to guarantee a frame is never analyzed twice.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// Solid-color RGB frame, mostly useful for synthetic inputs.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], index: usize) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self::new(data, width, height, 3, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn area(&self) -> f64 {
        self.width as f64 * self.height as f64
    }

    /// RGB triple at `(x, y)`. Frames with fewer than 3 channels repeat
    /// the first channel.
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let ch = self.channels as usize;
        let offset = (y as usize * self.width as usize + x as usize) * ch;
        if ch >= 3 {
            [
                self.data[offset],
                self.data[offset + 1],
                self.data[offset + 2],
            ]
        } else {
            let v = self.data[offset];
            [v, v, v]
        }
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 3, 0);
    }

    #[test]
    fn test_filled_repeats_color() {
        let frame = Frame::filled(3, 2, [10, 20, 30], 0);
        assert_eq!(frame.data().len(), 18);
        assert_eq!(frame.rgb_at(2, 1), [10, 20, 30]);
        assert_eq!(frame.rgb_at(0, 0), [10, 20, 30]);
    }

    #[test]
    fn test_rgb_at_addresses_row_major() {
        let mut data = vec![0u8; 12];
        data[6] = 255; // row=1, col=0, R
        data[5] = 7; // row=0, col=1, B
        let frame = Frame::new(data, 2, 2, 3, 0);
        assert_eq!(frame.rgb_at(0, 1), [255, 0, 0]);
        assert_eq!(frame.rgb_at(1, 0), [0, 0, 7]);
    }

    #[test]
    fn test_rgb_at_grayscale_repeats_channel() {
        let frame = Frame::new(vec![1, 2, 3, 4], 2, 2, 1, 0);
        assert_eq!(frame.rgb_at(1, 1), [4, 4, 4]);
    }

    #[test]
    fn test_area() {
        let frame = Frame::filled(640, 480, [0, 0, 0], 0);
        assert_eq!(frame.area(), 307_200.0);
    }

    #[test]
    fn test_as_ndarray_shape() {
        let frame = Frame::new(vec![0u8; 24], 4, 2, 3, 0);
        assert_eq!(frame.as_ndarray().shape(), &[2, 4, 3]);
    }

    #[test]
    fn test_as_ndarray_mut_modification() {
        let mut frame = Frame::new(vec![0u8; 12], 2, 2, 3, 0);
        {
            let mut arr = frame.as_ndarray_mut();
            arr[[0, 1, 2]] = 128;
        }
        assert_eq!(frame.rgb_at(1, 0), [0, 0, 128]);
    }
}
