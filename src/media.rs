use std::fmt;
use std::sync::Arc;

use image::RgbaImage;

/// Stable handle naming one item in the remote library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaId(Arc<str>);

impl MediaId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MediaId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

/// Short-lived download URL for one media item.
///
/// Obtained from [`crate::catalog::Catalog::resolve`] right before a fetch and
/// dropped with the render cycle that asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchableLocation(String);

impl FetchableLocation {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FetchableLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for CanvasSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A composed RGBA raster whose dimensions equal the device bounds.
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    image: RgbaImage,
}

impl RenderedFrame {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn size(&self) -> CanvasSize {
        CanvasSize::new(self.image.width(), self.image.height())
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}
