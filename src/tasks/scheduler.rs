use std::time::Duration;

use tokio::select;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::error::TaskError;
use crate::index::SharedIndex;
use crate::media::CanvasSize;
use crate::pipeline::Renderer;

/// Fixed for the life of the process.
#[derive(Debug, Clone, Copy)]
pub struct RotationConfig {
    pub interval: Duration,
    pub canvas: CanvasSize,
}

/// Rotates the display until `cancel` fires.
///
/// The first rotation happens one interval after start. A tick with an empty
/// index is skipped, a failed render is logged and skipped, and a render that
/// is already running always finishes before cancellation is observed.
/// Always returns [`TaskError::Cancelled`].
pub async fn run<R>(
    index: &SharedIndex,
    renderer: &R,
    device: &mut dyn Device,
    rotation: RotationConfig,
    cancel: &CancellationToken,
) -> Result<(), TaskError>
where
    R: Renderer + ?Sized,
{
    let mut ticker = interval_at(Instant::now() + rotation.interval, rotation.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
        interval = ?rotation.interval,
        canvas = %rotation.canvas,
        "rotation scheduler started"
    );

    let mut presented = 0usize;
    let mut failed = 0usize;
    loop {
        select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        if cancel.is_cancelled() {
            break;
        }

        let Some(id) = index.random_pick() else {
            debug!("library is empty; waiting for the next tick");
            continue;
        };

        info!(id = %id, indexed = index.len(), "rotating to photo");
        let started = Instant::now();
        match renderer.render(&id, rotation.canvas, device).await {
            Ok(()) => {
                presented += 1;
                debug!(elapsed = ?started.elapsed(), "photo presented");
            }
            Err(err) => {
                failed += 1;
                warn!(id = %id, "render failed: {err}");
            }
        }
    }

    info!(presented, failed, "rotation scheduler stopped");
    Err(TaskError::Cancelled)
}
