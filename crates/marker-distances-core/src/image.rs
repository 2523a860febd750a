/// Errors raised when a raw buffer does not describe a grayscale image.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageLayoutError {
    #[error("invalid grayscale image dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
    #[error("invalid grayscale image buffer length (expected {expected} bytes, got {got})")]
    InvalidBuffer { expected: usize, got: usize },
}

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

impl<'a> GrayImageView<'a> {
    /// Wrap a row-major buffer, checking that its length matches the dimensions.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, ImageLayoutError> {
        let expected = width
            .checked_mul(height)
            .ok_or(ImageLayoutError::InvalidDimensions { width, height })?;
        if data.len() != expected {
            return Err(ImageLayoutError::InvalidBuffer {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel value, or 0 outside the image.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.data[y as usize * self.width + x as usize]
    }
}

#[derive(Clone, Debug)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Image filled with a constant value.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    /// Copy `src` into this image with its top-left corner at `(x0, y0)`.
    ///
    /// Pixels falling outside the destination are dropped.
    pub fn paste(&mut self, src: &GrayImage, x0: usize, y0: usize) {
        for y in 0..src.height {
            let dy = y0 + y;
            if dy >= self.height {
                break;
            }
            for x in 0..src.width {
                let dx = x0 + x;
                if dx >= self.width {
                    break;
                }
                self.data[dy * self.width + dx] = src.data[y * src.width + x];
            }
        }
    }
}
