//! Decoded frame container.

use image::RgbaImage;

/// A decoded video frame ready to paint.
///
/// The pixel buffer is moved, never copied, between the decode thread and
/// the paint path. Painting consumes the bitmap, so the buffer is released
/// as soon as the blit completes.
#[derive(Debug)]
pub struct Bitmap {
    image: RgbaImage,
}

impl Bitmap {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub(crate) fn into_image(self) -> RgbaImage {
        self.image
    }
}
