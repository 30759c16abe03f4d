use ndarray::ArrayView3;

/// A single video/image frame: contiguous RGB bytes in row-major order.
///
/// Color conversion and decoding happen at I/O boundaries only; the
/// numeric stages see interleaved RGB and nothing else.
#[derive(Clone, Debug, PartialEq)]
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

    /// Solid-color RGB frame.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], index: usize) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&rgb);
        }
        Self::new(data, width, height, 3, index)
    }

    pub fn from_rgb_image(image: image::RgbImage, index: usize) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, 3, index)
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

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copy of the pixel rectangle `[x1, x2) × [y1, y2)`.
    ///
    /// The caller clamps the rectangle; coordinates past the frame edge
    /// are clipped again here so the copy never reads out of bounds.
    pub fn crop(&self, x1: u32, y1: u32, x2: u32, y2: u32) -> Frame {
        let x2 = x2.min(self.width);
        let y2 = y2.min(self.height);
        let x1 = x1.min(x2);
        let y1 = y1.min(y2);
        let c = self.channels as usize;
        let row_len = (x2 - x1) as usize * c;

        let mut data = Vec::with_capacity(row_len * (y2 - y1) as usize);
        for y in y1..y2 {
            let start = (y as usize * self.width as usize + x1 as usize) * c;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }
        Frame::new(data, x2 - x1, y2 - y1, self.channels, self.index)
    }

    /// Bilinear sample of channel `c` at a sub-pixel location.
    ///
    /// Neighbours that fall outside the frame contribute `fill`.
    pub fn sample_bilinear(&self, x: f64, y: f64, c: usize, fill: u8) -> f64 {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let at = |px: i64, py: i64| -> f64 {
            if px >= 0 && py >= 0 && px < self.width as i64 && py < self.height as i64 {
                let offset =
                    (py as usize * self.width as usize + px as usize) * self.channels as usize + c;
                self.data[offset] as f64
            } else {
                fill as f64
            }
        };

        at(x0, y0) * (1.0 - fx) * (1.0 - fy)
            + at(x0 + 1, y0) * fx * (1.0 - fy)
            + at(x0, y0 + 1) * (1.0 - fx) * fy
            + at(x0 + 1, y0 + 1) * fx * fy
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
