//! Frame decode and paint pipeline for the vista viewer.
//!
//! Turns base64 JPEG payloads from the stream into pixels on a fixed
//! 1280x720 surface without blocking message dispatch:
//!
//! - [`FrameDecode`] — the decode strategy seam, with a worker-thread
//!   implementation ([`WorkerDecoder`]), a direct JPEG decoder, and a
//!   format-sniffing last resort.
//! - [`PaintGate`] — paint-rate throttling (one paint per 30 ms).
//! - [`Surface`] — the fixed-aspect paint target.
//! - [`FramePipeline`] — ties the above together with a latest-frame-wins
//!   drop policy and funnels decode faults into the error tracker.

pub mod bitmap;
pub mod decode;
pub mod pipeline;
pub mod surface;
pub mod throttle;
pub mod worker;

pub use bitmap::Bitmap;
pub use decode::{select_decoder, FrameDecode, FrameError, JpegDecoder, SniffingDecoder};
pub use pipeline::FramePipeline;
pub use surface::{Surface, SURFACE_HEIGHT, SURFACE_WIDTH};
pub use throttle::{PaintGate, MIN_PAINT_INTERVAL};
pub use worker::WorkerDecoder;
