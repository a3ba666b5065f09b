#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gphotos_frame::catalog::{Catalog, Fetch, MediaItem, Page};
use gphotos_frame::device::Device;
use gphotos_frame::error::{CatalogError, DeviceError, FetchError, RenderError};
use gphotos_frame::media::{CanvasSize, FetchableLocation, MediaId, RenderedFrame};
use gphotos_frame::pipeline::Renderer;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use parking_lot::Mutex;

/// What a [`MemoryDevice`] saw; shared so tests can inspect it after the
/// device has been moved away.
#[derive(Debug, Default)]
pub struct DeviceLog {
    pub frames: Vec<RgbaImage>,
    pub flushes: usize,
    pub closes: usize,
}

pub struct MemoryDevice {
    bounds: CanvasSize,
    log: Arc<Mutex<DeviceLog>>,
}

impl MemoryDevice {
    pub fn new(width: u32, height: u32) -> (Self, Arc<Mutex<DeviceLog>>) {
        let log = Arc::new(Mutex::new(DeviceLog::default()));
        let device = Self {
            bounds: CanvasSize::new(width, height),
            log: log.clone(),
        };
        (device, log)
    }
}

impl Device for MemoryDevice {
    fn bounds(&self) -> CanvasSize {
        self.bounds
    }

    fn push_frame(&mut self, frame: &RenderedFrame) -> Result<(), DeviceError> {
        let mut log = self.log.lock();
        if log.closes > 0 {
            return Err(DeviceError::Closed);
        }
        if frame.size() != self.bounds {
            return Err(DeviceError::SizeMismatch {
                frame: frame.size().to_string(),
                device: self.bounds.to_string(),
            });
        }
        log.frames.push(frame.image().clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DeviceError> {
        self.log.lock().flushes += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        self.log.lock().closes += 1;
        Ok(())
    }
}

/// Renderer that records every id it is asked for and paints a blank frame.
#[derive(Default)]
pub struct RecordingRenderer {
    started: Mutex<Vec<MediaId>>,
    completed: Mutex<Vec<MediaId>>,
    fail_first: Mutex<usize>,
    work: Duration,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each render takes `work` of (virtual) time before presenting.
    pub fn with_work(work: Duration) -> Self {
        Self {
            work,
            ..Self::default()
        }
    }

    /// The first `n` renders fail with a decode error.
    pub fn failing_first(n: usize) -> Self {
        Self {
            fail_first: Mutex::new(n),
            ..Self::default()
        }
    }

    pub fn started(&self) -> Vec<MediaId> {
        self.started.lock().clone()
    }

    pub fn completed(&self) -> Vec<MediaId> {
        self.completed.lock().clone()
    }
}

#[async_trait]
impl Renderer for RecordingRenderer {
    async fn render(
        &self,
        id: &MediaId,
        canvas: CanvasSize,
        device: &mut dyn Device,
    ) -> Result<(), RenderError> {
        self.started.lock().push(id.clone());
        if !self.work.is_zero() {
            tokio::time::sleep(self.work).await;
        }
        {
            let mut remaining = self.fail_first.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(RenderError::Decode(image::ImageError::IoError(
                    std::io::Error::other("corrupt image"),
                )));
            }
        }
        let frame = RenderedFrame::new(RgbaImage::from_pixel(
            canvas.width,
            canvas.height,
            Rgba([0, 0, 0, 255]),
        ));
        device.push_frame(&frame)?;
        device.flush()?;
        self.completed.lock().push(id.clone());
        Ok(())
    }
}

/// How a [`PagedCatalog`] listing ends.
pub enum Ending {
    /// Last page has no continuation token.
    Complete,
    /// The request after the last page fails.
    Fail(fn() -> CatalogError),
    /// The request after the last page never answers.
    Hang,
}

/// In-memory catalog serving fixed pages; resolves `id` to `mem://id`.
pub struct PagedCatalog {
    pages: Vec<Vec<MediaItem>>,
    ending: Ending,
    missing: HashSet<String>,
    pub list_calls: Mutex<usize>,
    pub resolve_calls: Mutex<Vec<MediaId>>,
}

impl PagedCatalog {
    pub fn new(pages: Vec<Vec<MediaItem>>) -> Self {
        Self {
            pages,
            ending: Ending::Complete,
            missing: HashSet::new(),
            list_calls: Mutex::new(0),
            resolve_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn ending(mut self, ending: Ending) -> Self {
        self.ending = ending;
        self
    }

    /// Resolving `id` reports [`CatalogError::NotFound`].
    pub fn without(mut self, id: &str) -> Self {
        self.missing.insert(id.to_string());
        self
    }

    fn page_at(&self, idx: usize) -> Page {
        let last = idx + 1 == self.pages.len();
        let next_page_token = match (&self.ending, last) {
            (Ending::Complete, true) => None,
            _ => Some(format!("p{}", idx + 1)),
        };
        Page {
            items: self.pages[idx].clone(),
            next_page_token,
        }
    }
}

#[async_trait]
impl Catalog for PagedCatalog {
    async fn list_page(&self, page_token: Option<&str>) -> Result<Page, CatalogError> {
        *self.list_calls.lock() += 1;
        let idx = match page_token {
            None => 0,
            Some(token) => token
                .trim_start_matches('p')
                .parse::<usize>()
                .map_err(|_| CatalogError::Malformed(format!("bad token {token}")))?,
        };
        if idx < self.pages.len() {
            return Ok(self.page_at(idx));
        }
        match &self.ending {
            Ending::Complete => Ok(Page::default()),
            Ending::Fail(make) => Err(make()),
            Ending::Hang => std::future::pending().await,
        }
    }

    async fn resolve(&self, id: &MediaId) -> Result<FetchableLocation, CatalogError> {
        self.resolve_calls.lock().push(id.clone());
        if self.missing.contains(id.as_str()) {
            return Err(CatalogError::NotFound(id.to_string()));
        }
        Ok(FetchableLocation::new(format!("mem://{id}")))
    }
}

/// Serves encoded images keyed by location.
#[derive(Default)]
pub struct MemoryFetch {
    blobs: HashMap<String, Vec<u8>>,
    pub requests: Mutex<Vec<(String, CanvasSize)>>,
}

impl MemoryFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: &str, bytes: Vec<u8>) -> Self {
        self.blobs.insert(format!("mem://{id}"), bytes);
        self
    }
}

#[async_trait]
impl Fetch for MemoryFetch {
    async fn fetch(
        &self,
        location: &FetchableLocation,
        size_hint: CanvasSize,
    ) -> Result<Vec<u8>, FetchError> {
        self.requests
            .lock()
            .push((location.as_str().to_string(), size_hint));
        self.blobs
            .get(location.as_str())
            .cloned()
            .ok_or(FetchError::Status { status: 404 })
    }
}

pub fn photos(ids: &[&str]) -> Vec<MediaItem> {
    ids.iter().map(|id| MediaItem::photo(*id)).collect()
}

pub fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}
