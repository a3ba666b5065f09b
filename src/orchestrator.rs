use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::catalog::Catalog;
use crate::device::Device;
use crate::error::TaskError;
use crate::index::SharedIndex;
use crate::pipeline::Renderer;
use crate::tasks::scheduler::RotationConfig;
use crate::tasks::{loader, scheduler};

/// Runs the catalog walk and the rotation loop side by side until shutdown.
///
/// The first task to fail for a reason other than cancellation trips `cancel`
/// and its error becomes the result. An externally triggered cancellation ends
/// with `Ok(())`. `device` is closed exactly once, after both tasks returned.
pub async fn run<C, R, D>(
    catalog: &C,
    renderer: &R,
    mut device: D,
    index: &SharedIndex,
    interval: Duration,
    cancel: CancellationToken,
) -> Result<()>
where
    C: Catalog + ?Sized,
    R: Renderer + ?Sized,
    D: Device,
{
    let rotation = RotationConfig {
        interval,
        canvas: device.bounds(),
    };

    let (loader_failure, scheduler_failure) = {
        let loader = supervise("loader", &cancel, loader::run(catalog, index, &cancel));
        let scheduler = supervise(
            "scheduler",
            &cancel,
            scheduler::run(index, renderer, &mut device, rotation, &cancel),
        );
        tokio::join!(loader, scheduler)
    };

    let closed = device.close();
    match first_failure([loader_failure, scheduler_failure]) {
        Some(err) => {
            if let Err(close_err) = closed {
                warn!("failed to close device: {close_err}");
            }
            Err(err)
        }
        None => {
            closed.context("failed to close device")?;
            info!("slideshow shut down cleanly");
            Ok(())
        }
    }
}

struct Failure {
    error: anyhow::Error,
    /// The token was still live when this task failed, so this failure is
    /// what stopped the others.
    tripped: bool,
}

async fn supervise<F, T>(task: &'static str, cancel: &CancellationToken, fut: F) -> Option<Failure>
where
    F: Future<Output = Result<T, TaskError>>,
{
    match fut.await {
        Ok(_) => {
            debug!(task, "task finished");
            None
        }
        Err(TaskError::Cancelled) => {
            debug!(task, "task cancelled");
            None
        }
        Err(err) => {
            error!(task, "task failed: {err}");
            let tripped = !cancel.is_cancelled();
            cancel.cancel();
            Some(Failure {
                error: anyhow::Error::new(err).context(format!("{task} task failed")),
                tripped,
            })
        }
    }
}

/// The failure that tripped cancellation wins; later ones are dropped.
fn first_failure<const N: usize>(failures: [Option<Failure>; N]) -> Option<anyhow::Error> {
    let mut failures: Vec<Failure> = failures.into_iter().flatten().collect();
    failures.sort_by_key(|failure| !failure.tripped);
    failures.into_iter().next().map(|failure| failure.error)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::CatalogError;

    async fn fail_after(after: Duration, reason: &'static str) -> Result<(), TaskError> {
        tokio::time::sleep(after).await;
        Err(TaskError::Catalog(CatalogError::Malformed(reason.into())))
    }

    #[tokio::test(start_paused = true)]
    async fn earliest_failure_is_reported() {
        let cancel = CancellationToken::new();
        let (late, early) = tokio::join!(
            supervise("late", &cancel, fail_after(Duration::from_secs(2), "second")),
            supervise("early", &cancel, fail_after(Duration::from_secs(1), "first")),
        );

        assert!(cancel.is_cancelled());
        let err = first_failure([late, early]).unwrap();
        assert!(format!("{err:#}").contains("first"), "{err:#}");
    }

    #[tokio::test]
    async fn cancellation_alone_is_not_a_failure() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = supervise("task", &cancel, async { Err::<(), _>(TaskError::Cancelled) }).await;
        assert!(first_failure([outcome]).is_none());
    }
}
