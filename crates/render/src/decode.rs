//! Frame decode strategies.
//!
//! One seam, three implementations, chosen once at pipeline init:
//!
//! 1. [`WorkerDecoder`](crate::worker::WorkerDecoder) — decode on a
//!    dedicated thread so the cost never lands on the dispatch loop.
//! 2. [`JpegDecoder`] — direct JPEG decode on the calling task.
//! 3. [`SniffingDecoder`] — format-sniffing decode as the last resort for
//!    payloads the direct path rejects.
//!
//! All three converge on the same visible result; the pipeline degrades
//! from one to the next when a path is unavailable or fails.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::ImageFormat;

use crate::bitmap::Bitmap;

/// Errors from payload decode.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload is not valid base64.
    #[error("invalid base64 frame payload: {0}")]
    Payload(#[from] base64::DecodeError),

    /// The decoded bytes are not a decodable image.
    #[error("frame decode failed: {0}")]
    Decode(#[from] image::ImageError),

    /// The decode worker thread is gone.
    #[error("decode worker unavailable")]
    WorkerUnavailable,
}

/// A frame decode strategy.
#[async_trait]
pub trait FrameDecode: Send + Sync {
    /// Decode a base64 image payload into a paintable bitmap.
    async fn decode(&self, payload: &str) -> Result<Bitmap, FrameError>;

    /// Strategy name for logs.
    fn name(&self) -> &'static str;
}

/// Decode a base64 JPEG payload directly.
pub(crate) fn decode_jpeg(payload: &str) -> Result<Bitmap, FrameError> {
    let bytes = BASE64.decode(payload.trim())?;
    let image = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)?;
    Ok(Bitmap::new(image.to_rgba8()))
}

/// Decode a base64 payload of any supported image format.
pub(crate) fn decode_sniffed(payload: &str) -> Result<Bitmap, FrameError> {
    let bytes = BASE64.decode(payload.trim())?;
    let image = image::load_from_memory(&bytes)?;
    Ok(Bitmap::new(image.to_rgba8()))
}

/// Direct JPEG decode on the calling task.
#[derive(Debug, Default)]
pub struct JpegDecoder;

#[async_trait]
impl FrameDecode for JpegDecoder {
    async fn decode(&self, payload: &str) -> Result<Bitmap, FrameError> {
        decode_jpeg(payload)
    }

    fn name(&self) -> &'static str {
        "jpeg"
    }
}

/// Format-sniffing decode, the last-resort path.
#[derive(Debug, Default)]
pub struct SniffingDecoder;

#[async_trait]
impl FrameDecode for SniffingDecoder {
    async fn decode(&self, payload: &str) -> Result<Bitmap, FrameError> {
        decode_sniffed(payload)
    }

    fn name(&self) -> &'static str {
        "sniffing"
    }
}

/// Select the decode strategy at initialization.
///
/// Prefers the worker-thread decoder; falls back to the inline JPEG
/// decoder when the worker thread cannot be spawned or offloading is
/// disabled.
pub fn select_decoder(offload: bool) -> std::sync::Arc<dyn FrameDecode> {
    if offload {
        match crate::worker::WorkerDecoder::spawn() {
            Ok(worker) => return std::sync::Arc::new(worker),
            Err(e) => {
                tracing::warn!(error = %e, "Decode worker unavailable, decoding inline");
            }
        }
    }
    std::sync::Arc::new(JpegDecoder)
}

/// Build a base64 JPEG payload for tests.
#[cfg(test)]
pub(crate) fn jpeg_payload(width: u32, height: u32) -> String {
    let image = image::RgbImage::from_pixel(width, height, image::Rgb([0, 128, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Jpeg)
        .expect("in-memory jpeg encode");
    BASE64.encode(&bytes)
}
