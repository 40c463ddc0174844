//! Batch cache warming with a bounded number of extractions in flight.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::extractor::{ExtractError, ExtractionResult, Extractor};
use crate::urls::normalize_url;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PrewarmReport {
    /// Freshly extracted and cached.
    pub warmed: usize,
    /// Already fresh in the cache; not fetched.
    pub cached: usize,
    pub failed: usize,
}

type Outcome = (String, Result<ExtractionResult, ExtractError>);

/// Extract and cache every URL in `urls`, at most `concurrency` at a time.
///
/// URLs that normalize to the same key are warmed once. A failing URL (or a
/// panicking task) is logged and counted; it never stops the batch.
pub async fn prewarm<I>(extractor: &Extractor, urls: I, concurrency: usize) -> PrewarmReport
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let batch = Uuid::new_v4();
    run_batch(extractor, urls, concurrency.max(1))
        .instrument(info_span!("prewarm", batch = %batch))
        .await
}

async fn run_batch<I>(extractor: &Extractor, urls: I, concurrency: usize) -> PrewarmReport
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks: JoinSet<Outcome> = JoinSet::new();
    let mut seen = HashSet::new();
    let mut report = PrewarmReport::default();

    info!(concurrency, "prewarm started");

    for url in urls {
        let url = url.as_ref().trim().to_string();
        if url.is_empty() || !seen.insert(normalize_url(&url)) {
            continue;
        }
        if extractor.get_cached_extraction(&url).is_some() {
            report.cached += 1;
            continue;
        }

        // Waits here until one of the in-flight extractions finishes.
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        while let Some(joined) = tasks.try_join_next() {
            record(&mut report, joined);
        }

        let extractor = extractor.clone();
        tasks.spawn(
            async move {
                let _permit = permit; // Hold permit until extraction completes
                let outcome = extractor.extract_article_cached(&url).await;
                (url, outcome)
            }
            .in_current_span(),
        );
    }

    while let Some(joined) = tasks.join_next().await {
        record(&mut report, joined);
    }

    info!(
        warmed = report.warmed,
        cached = report.cached,
        failed = report.failed,
        "prewarm finished"
    );
    report
}

fn record(report: &mut PrewarmReport, joined: Result<Outcome, JoinError>) {
    match joined {
        Ok((url, Ok(result))) => {
            report.warmed += 1;
            debug!(%url, strategy = %result.metadata.strategy, "warmed");
        }
        Ok((url, Err(e))) => {
            report.failed += 1;
            warn!(%url, error = %e, "prewarm extraction failed");
        }
        Err(e) => {
            report.failed += 1;
            error!(error = %e, "prewarm task aborted");
        }
    }
}
