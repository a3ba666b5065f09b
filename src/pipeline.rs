use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::catalog::{Catalog, Fetch};
use crate::device::Device;
use crate::error::RenderError;
use crate::media::{CanvasSize, MediaId};
use crate::processing::{FitMode, compose, decode_rgba8};

/// One rotation cycle: put the photo named by `id` on `device`.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(
        &self,
        id: &MediaId,
        canvas: CanvasSize,
        device: &mut dyn Device,
    ) -> Result<(), RenderError>;
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub fit: FitMode,
    pub max_upscale: f32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            fit: FitMode::Fit,
            max_upscale: 1.0,
        }
    }
}

/// Resolve, download, decode, compose and present a single photo.
pub struct ImagePipeline<C: ?Sized, F: ?Sized> {
    catalog: Arc<C>,
    fetcher: Arc<F>,
    options: PipelineOptions,
}

impl<C: ?Sized, F: ?Sized> ImagePipeline<C, F> {
    pub fn new(catalog: Arc<C>, fetcher: Arc<F>, options: PipelineOptions) -> Self {
        Self {
            catalog,
            fetcher,
            options,
        }
    }
}

#[async_trait]
impl<C, F> Renderer for ImagePipeline<C, F>
where
    C: Catalog + ?Sized,
    F: Fetch + ?Sized,
{
    #[instrument(skip_all, fields(id = %id, canvas = %canvas))]
    async fn render(
        &self,
        id: &MediaId,
        canvas: CanvasSize,
        device: &mut dyn Device,
    ) -> Result<(), RenderError> {
        // Locations expire, so resolve on every cycle.
        let location = self
            .catalog
            .resolve(id)
            .await
            .map_err(RenderError::Resolve)?;
        let bytes = self.fetcher.fetch(&location, canvas).await?;
        debug!(bytes = bytes.len(), "image downloaded");

        let options = self.options;
        let frame = tokio::task::spawn_blocking(move || {
            let image = decode_rgba8(&bytes)?;
            debug!(width = image.width(), height = image.height(), "image decoded");
            compose(&image, canvas, options.fit, options.max_upscale).map_err(RenderError::Compose)
        })
        .await??;

        device.push_frame(&frame)?;
        device.flush()?;
        Ok(())
    }
}
