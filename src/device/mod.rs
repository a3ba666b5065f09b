pub mod framebuffer;

use crate::error::DeviceError;
use crate::media::{CanvasSize, RenderedFrame};

pub use framebuffer::Framebuffer;

/// Pixel sink the slideshow draws into.
pub trait Device: Send {
    fn bounds(&self) -> CanvasSize;

    /// Copies `frame` into the device's back buffer. Nothing is visible until
    /// [`Device::flush`].
    fn push_frame(&mut self, frame: &RenderedFrame) -> Result<(), DeviceError>;

    fn flush(&mut self) -> Result<(), DeviceError>;

    fn close(&mut self) -> Result<(), DeviceError>;
}
