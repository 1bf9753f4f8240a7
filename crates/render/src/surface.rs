//! Fixed-aspect paint target.

use image::imageops::FilterType;
use image::RgbaImage;

use crate::bitmap::Bitmap;

/// Surface dimensions: 1280x720, 16:9.
pub const SURFACE_WIDTH: u32 = 1280;
pub const SURFACE_HEIGHT: u32 = 720;

/// The target every decoded frame is painted onto.
///
/// The backing buffer is (re)allocated only when the target dimensions
/// change, never per frame.
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Option<RgbaImage>,
    paints: u64,
}

impl Surface {
    pub fn new() -> Self {
        Self::with_dimensions(SURFACE_WIDTH, SURFACE_HEIGHT)
    }

    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: None,
            paints: 0,
        }
    }

    /// Paint a decoded bitmap scaled to fill the surface.
    ///
    /// Consumes the bitmap; its buffer is released as soon as the blit
    /// completes.
    pub fn paint(&mut self, bitmap: Bitmap) {
        let image = bitmap.into_image();
        let scaled = if (image.width(), image.height()) == (self.width, self.height) {
            image
        } else {
            image::imageops::resize(&image, self.width, self.height, FilterType::Triangle)
        };
        // Every pixel is overwritten, which is the clear + draw in one step.
        self.pixels = Some(scaled);
        self.paints += 1;
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of frames painted so far.
    pub fn paint_count(&self) -> u64 {
        self.paints
    }

    /// The last painted frame, if any.
    pub fn frame(&self) -> Option<&RgbaImage> {
        self.pixels.as_ref()
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap(width: u32, height: u32) -> Bitmap {
        Bitmap::new(RgbaImage::from_pixel(
            width,
            height,
            image::Rgba([10, 20, 30, 255]),
        ))
    }

    #[test]
    fn starts_blank_at_fixed_dimensions() {
        let surface = Surface::new();
        assert_eq!(surface.dimensions(), (SURFACE_WIDTH, SURFACE_HEIGHT));
        assert_eq!(surface.paint_count(), 0);
        assert!(surface.frame().is_none());
    }

    #[test]
    fn paint_scales_to_fill() {
        let mut surface = Surface::with_dimensions(64, 36);
        surface.paint(bitmap(8, 8));

        let frame = surface.frame().unwrap();
        assert_eq!((frame.width(), frame.height()), (64, 36));
        assert_eq!(surface.paint_count(), 1);
    }

    #[test]
    fn matching_dimensions_skip_the_resize() {
        let mut surface = Surface::with_dimensions(16, 9);
        surface.paint(bitmap(16, 9));

        let frame = surface.frame().unwrap();
        assert_eq!(frame.get_pixel(0, 0), &image::Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn each_paint_replaces_the_previous_frame() {
        let mut surface = Surface::with_dimensions(4, 4);
        surface.paint(bitmap(4, 4));
        surface.paint(Bitmap::new(RgbaImage::from_pixel(
            4,
            4,
            image::Rgba([200, 0, 0, 255]),
        )));

        assert_eq!(surface.paint_count(), 2);
        assert_eq!(
            surface.frame().unwrap().get_pixel(2, 2),
            &image::Rgba([200, 0, 0, 255])
        );
    }
}
