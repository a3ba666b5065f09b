use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::catalog::Catalog;
use crate::error::TaskError;
use crate::index::SharedIndex;
use crate::media::MediaId;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub pages: usize,
    pub pushed: usize,
    pub skipped: usize,
}

/// Walks the whole catalog once and feeds every photo id into `index`.
///
/// - Each page is pushed as soon as it arrives, so rotation can start early.
/// - A catalog error ends the walk; ids pushed so far stay in the index.
/// - Cancellation is honoured between pages and while a page is in flight.
#[instrument(skip_all)]
pub async fn run<C>(
    catalog: &C,
    index: &SharedIndex,
    cancel: &CancellationToken,
) -> Result<LoadSummary, TaskError>
where
    C: Catalog + ?Sized,
{
    let mut summary = LoadSummary::default();
    let mut token: Option<String> = None;

    loop {
        if cancel.is_cancelled() {
            return Err(TaskError::Cancelled);
        }

        let page = select! {
            _ = cancel.cancelled() => return Err(TaskError::Cancelled),
            page = catalog.list_page(token.as_deref()) => page?,
        };
        summary.pages += 1;

        let total = page.items.len();
        let batch: Vec<MediaId> = page
            .items
            .iter()
            .filter(|item| item.is_photo())
            .map(|item| item.id.clone())
            .collect();
        summary.skipped += total - batch.len();
        summary.pushed += batch.len();
        index.push(batch);

        debug!(
            page = summary.pages,
            items = total,
            indexed = index.len(),
            "catalog page loaded"
        );

        match page.next_token() {
            Some(next) => token = Some(next.to_string()),
            None => break,
        }
    }

    info!(
        pages = summary.pages,
        photos = summary.pushed,
        skipped = summary.skipped,
        "catalog walk complete"
    );
    Ok(summary)
}
