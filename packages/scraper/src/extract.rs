//! Paginated extraction.
//!
//! [`Extractor::extract_pages`] walks the search results page by page. The
//! remote total is taken from the first page only; the run ends on the first
//! empty page, once the requested maximum has been reached, or once the
//! offset passes the remote total. A failed page is yielded as an error and
//! ends the stream, so everything yielded before it remains usable.
//! [`Extractor::extract_all`] flattens the pages into offers.

use std::path::Path;
use std::sync::Arc;

use apd_offer_models::{ExtractionMetadata, Offer, SearchFilters};
use async_stream::stream;
use futures::{Stream, StreamExt as _};
use serde::Serialize;

use crate::pacing::Pacer;
use crate::progress::ProgressCallback;
use crate::{PageResult, ScrapeError, SearchBackend};

/// Records between progress log lines in [`Extractor::collect_run`].
const LOG_EVERY: usize = 1000;

/// Drives a [`SearchBackend`] through every page of a query.
///
/// Holds no per-run state, so one extractor may serve several runs.
pub struct Extractor<B, P> {
    backend: B,
    pacer: P,
}

/// Everything a drained extraction produced.
#[derive(Debug)]
pub struct ExtractionRun {
    /// Offers yielded before the run ended.
    pub offers: Vec<Offer>,
    /// Remote total from the first page, if one was fetched.
    pub total_found: Option<u64>,
    /// The error that ended the run early, if any.
    pub error: Option<ScrapeError>,
}

impl ExtractionRun {
    /// Whether the run ended because of an error.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.error.is_some()
    }
}

impl<B: SearchBackend, P: Pacer> Extractor<B, P> {
    #[must_use]
    pub const fn new(backend: B, pacer: P) -> Self {
        Self { backend, pacer }
    }

    /// The wrapped backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Streams the pages matching `filters`, `page_size` records per
    /// request, stopping after `max_records` when set.
    ///
    /// Every yielded page carries the total of the first page, and the page
    /// that reaches `max_records` is cut to fit. With a remote total `T` the
    /// stream makes `ceil(min(T, max_records) / page_size)` requests and
    /// pauses only between them. A `page_size` of zero yields a single
    /// [`ScrapeError::Format`]; `max_records == Some(0)` yields nothing
    /// without any request.
    pub fn extract_pages<'a>(
        &'a self,
        page_size: u32,
        max_records: Option<u64>,
        filters: &'a SearchFilters,
    ) -> impl Stream<Item = Result<PageResult, ScrapeError>> + Send + 'a {
        stream! {
            if page_size == 0 {
                yield Err(ScrapeError::Format("page size must be greater than zero".to_owned()));
                return;
            }
            if max_records == Some(0) {
                log::info!("Maximum of 0 records requested, nothing to extract");
                return;
            }

            let name = self.backend.name();
            let mut offset: u64 = 0;
            let mut total_found: Option<u64> = None;
            let mut yielded: u64 = 0;

            loop {
                log::info!("[{name}] Fetching offers from offset {offset}");
                let mut page = match self.backend.fetch_page(offset, page_size, filters).await {
                    Ok(page) => page,
                    Err(e) => {
                        log::error!("[{name}] Request at offset {offset} failed: {e}");
                        yield Err(e);
                        return;
                    }
                };

                let total = *total_found.get_or_insert_with(|| {
                    log::info!("[{name}] Total offers found: {}", page.total_found);
                    page.total_found
                });
                page.total_found = total;

                if page.docs.is_empty() {
                    log::info!("[{name}] No more offers");
                    return;
                }

                if let Some(max) = max_records {
                    let room = usize::try_from(max - yielded).unwrap_or(usize::MAX);
                    page.docs.truncate(room);
                }
                yielded += page.docs.len() as u64;
                yield Ok(page);

                if max_records.is_some_and(|max| yielded >= max) {
                    log::info!("[{name}] Reached the maximum of {yielded} offers");
                    return;
                }

                offset += u64::from(page_size);
                if offset >= total {
                    log::info!("[{name}] All offers extracted");
                    return;
                }

                self.pacer.pause().await;
            }
        }
    }

    /// Streams every offer of [`extract_pages`](Self::extract_pages) in
    /// server order.
    pub fn extract_all<'a>(
        &'a self,
        page_size: u32,
        max_records: Option<u64>,
        filters: &'a SearchFilters,
    ) -> impl Stream<Item = Result<Offer, ScrapeError>> + Send + 'a {
        stream! {
            let pages = self.extract_pages(page_size, max_records, filters);
            futures::pin_mut!(pages);

            while let Some(page) = pages.next().await {
                match page {
                    Ok(page) => {
                        for offer in page.docs {
                            yield Ok(offer);
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }
    }

    /// Drains [`extract_pages`](Self::extract_pages) into memory.
    ///
    /// Offers yielded before a failure are kept; the failure is returned in
    /// [`ExtractionRun::error`] rather than discarding them.
    pub async fn collect_run(
        &self,
        page_size: u32,
        max_records: Option<u64>,
        filters: &SearchFilters,
        progress: &Arc<dyn ProgressCallback>,
    ) -> ExtractionRun {
        let pages = self.extract_pages(page_size, max_records, filters);
        futures::pin_mut!(pages);

        let mut offers: Vec<Offer> = Vec::new();
        let mut total_found = None;
        let mut error = None;

        while let Some(item) = pages.next().await {
            match item {
                Ok(page) => {
                    if total_found.is_none() {
                        total_found = Some(page.total_found);
                        progress.set_total(
                            max_records.map_or(page.total_found, |max| page.total_found.min(max)),
                        );
                    }
                    let before = offers.len();
                    offers.extend(page.docs);
                    progress.inc((offers.len() - before) as u64);
                    if offers.len() / LOG_EVERY > before / LOG_EVERY {
                        log::info!("Extracted {} offers...", offers.len());
                    }
                }
                Err(e) => {
                    log::warn!(
                        "Extraction stopped early, keeping {} offers already extracted",
                        offers.len()
                    );
                    error = Some(e);
                    break;
                }
            }
        }

        progress.finish(format!("{} offers extracted", offers.len()));

        ExtractionRun {
            offers,
            total_found,
            error,
        }
    }
}

#[derive(Serialize)]
struct ExtractionFileRef<'a> {
    metadata: &'a ExtractionMetadata,
    ofertas: &'a [Offer],
}

/// Writes an offers file (`{metadata, ofertas}`) as pretty UTF-8 JSON.
///
/// # Errors
///
/// Returns [`ScrapeError::File`] if the file cannot be written.
pub fn save_extraction(
    offers: &[Offer],
    metadata: &ExtractionMetadata,
    path: &Path,
) -> Result<(), ScrapeError> {
    apd_files::write_json_pretty(
        path,
        &ExtractionFileRef {
            metadata,
            ofertas: offers,
        },
    )?;
    log::info!("Saved {} offers to {}", offers.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use apd_offer_models::ExtractionFile;
    use futures::{StreamExt as _, TryStreamExt as _};

    use super::*;
    use crate::pacing::NoDelay;
    use crate::progress::null_progress;

    /// Serves `total` numbered documents, optionally failing at one call.
    struct ScriptedBackend {
        total: u64,
        fail_on_call: Option<usize>,
        calls: AtomicUsize,
        requests: Mutex<Vec<(u64, u32)>>,
    }

    impl ScriptedBackend {
        fn new(total: u64) -> Self {
            Self {
                total,
                fail_on_call: None,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing_on(mut self, call: usize) -> Self {
            self.fail_on_call = Some(call);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SearchBackend for ScriptedBackend {
        async fn fetch_page(
            &self,
            offset: u64,
            rows: u32,
            _filters: &SearchFilters,
        ) -> Result<PageResult, ScrapeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push((offset, rows));
            if self.fail_on_call == Some(call) {
                return Err(ScrapeError::Format("scripted failure".to_owned()));
            }
            let end = (offset + u64::from(rows)).min(self.total);
            let docs = (offset..end)
                .map(|i| Offer::from_value(serde_json::json!({"idoferta": i})).unwrap())
                .collect();
            Ok(PageResult {
                total_found: self.total,
                docs,
            })
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    /// Replays fixed pages regardless of the requested offset.
    struct ReplayBackend {
        pages: Mutex<VecDeque<PageResult>>,
        calls: AtomicUsize,
    }

    impl SearchBackend for ReplayBackend {
        async fn fetch_page(
            &self,
            _offset: u64,
            _rows: u32,
            _filters: &SearchFilters,
        ) -> Result<PageResult, ScrapeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.pages.lock().unwrap().pop_front().unwrap_or_default())
        }

        fn name(&self) -> &'static str {
            "replay"
        }
    }

    async fn collect(
        extractor: &Extractor<ScriptedBackend, NoDelay>,
        page_size: u32,
        max: Option<u64>,
    ) -> Vec<Offer> {
        let filters = SearchFilters::new();
        extractor
            .extract_all(page_size, max, &filters)
            .try_collect()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn request_count_is_ceiling_of_total_over_page_size() {
        for (total, page_size, max, expected_records, expected_calls) in [
            (250, 100, None, 250, 3),
            (200, 100, None, 200, 2),
            (5, 100, None, 5, 1),
            (250, 100, Some(120), 120, 2),
            (250, 50, Some(100), 100, 2),
            (1, 1, None, 1, 1),
        ] {
            let extractor = Extractor::new(ScriptedBackend::new(total), NoDelay);
            let offers = collect(&extractor, page_size, max).await;
            assert_eq!(offers.len(), expected_records, "total={total} page={page_size}");
            assert_eq!(
                extractor.backend().calls(),
                expected_calls,
                "total={total} page={page_size}"
            );
        }
    }

    #[tokio::test]
    async fn max_larger_than_remote_total_uses_one_request() {
        let extractor = Extractor::new(ScriptedBackend::new(5), NoDelay);
        let offers = collect(&extractor, 100, Some(10)).await;
        assert_eq!(offers.len(), 5);
        assert_eq!(extractor.backend().calls(), 1);
    }

    #[tokio::test]
    async fn offsets_advance_by_page_size_in_order() {
        let extractor = Extractor::new(ScriptedBackend::new(25), NoDelay);
        let offers = collect(&extractor, 10, None).await;
        assert_eq!(
            *extractor.backend().requests.lock().unwrap(),
            vec![(0, 10), (10, 10), (20, 10)]
        );
        let ids: Vec<_> = offers
            .iter()
            .map(|o| o.listing_id().unwrap().into_owned())
            .collect();
        assert_eq!(ids.first().map(String::as_str), Some("0"));
        assert_eq!(ids.last().map(String::as_str), Some("24"));
    }

    #[tokio::test]
    async fn empty_remote_result_ends_after_one_request() {
        let extractor = Extractor::new(ScriptedBackend::new(0), NoDelay);
        assert!(collect(&extractor, 100, None).await.is_empty());
        assert_eq!(extractor.backend().calls(), 1);
    }

    #[tokio::test]
    async fn zero_max_issues_no_request() {
        let extractor = Extractor::new(ScriptedBackend::new(50), NoDelay);
        assert!(collect(&extractor, 10, Some(0)).await.is_empty());
        assert_eq!(extractor.backend().calls(), 0);
    }

    #[tokio::test]
    async fn zero_page_size_is_a_single_format_error() {
        let extractor = Extractor::new(ScriptedBackend::new(50), NoDelay);
        let filters = SearchFilters::new();
        let items: Vec<_> = extractor.extract_all(0, None, &filters).collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(ScrapeError::Format(_))));
        assert_eq!(extractor.backend().calls(), 0);
    }

    #[tokio::test]
    async fn total_is_taken_from_first_page_only() {
        let backend = ReplayBackend {
            pages: Mutex::new(VecDeque::from([
                PageResult {
                    total_found: 4,
                    docs: vec![Offer::default(), Offer::default()],
                },
                PageResult {
                    total_found: 1000,
                    docs: vec![Offer::default(), Offer::default()],
                },
                PageResult {
                    total_found: 1000,
                    docs: vec![Offer::default()],
                },
            ])),
            calls: AtomicUsize::new(0),
        };
        let extractor = Extractor::new(backend, NoDelay);
        let run = extractor
            .collect_run(2, None, &SearchFilters::new(), &null_progress())
            .await;
        assert_eq!(run.offers.len(), 4);
        assert_eq!(run.total_found, Some(4));
        assert_eq!(extractor.backend().calls.load(Ordering::SeqCst), 2);
    }

    /// Counts pauses instead of sleeping.
    #[derive(Default)]
    struct CountingPacer {
        pauses: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Pacer for CountingPacer {
        async fn pause(&self) {
            self.pauses.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn pauses_only_between_requests() {
        for (total, page_size, max, expected_calls, expected_pauses) in [
            (250, 100, None, 3, 2),
            (50, 100, None, 1, 0),
            (250, 100, Some(120), 2, 1),
            (250, 100, Some(100), 1, 0),
            (0, 100, None, 1, 0),
        ] {
            let extractor =
                Extractor::new(ScriptedBackend::new(total), CountingPacer::default());
            let filters = SearchFilters::new();
            let offers: Vec<_> = extractor
                .extract_all(page_size, max, &filters)
                .try_collect()
                .await
                .unwrap();
            assert_eq!(offers.len() as u64, max.map_or(total, |m| total.min(m)));
            assert_eq!(extractor.backend().calls(), expected_calls, "total={total}");
            assert_eq!(
                extractor.pacer.pauses.load(Ordering::SeqCst),
                expected_pauses,
                "total={total} max={max:?}"
            );
        }
    }

    #[tokio::test]
    async fn pages_carry_first_total_and_are_cut_at_max() {
        let extractor = Extractor::new(ScriptedBackend::new(250), NoDelay);
        let filters = SearchFilters::new();
        let pages: Vec<PageResult> = extractor
            .extract_pages(100, Some(150), &filters)
            .try_collect()
            .await
            .unwrap();
        let sizes: Vec<_> = pages.iter().map(|p| p.docs.len()).collect();
        assert_eq!(sizes, vec![100, 50]);
        assert!(pages.iter().all(|p| p.total_found == 250));
    }

    #[tokio::test]
    async fn one_extractor_serves_independent_runs() {
        let extractor = Extractor::new(ScriptedBackend::new(30), NoDelay);
        let first = extractor
            .collect_run(10, Some(5), &SearchFilters::new(), &null_progress())
            .await;
        let second = extractor
            .collect_run(10, None, &SearchFilters::new(), &null_progress())
            .await;
        assert_eq!(first.offers.len(), 5);
        assert_eq!(second.offers.len(), 30);
        assert_eq!(first.total_found, Some(30));
        assert_eq!(second.total_found, Some(30));
    }

    #[tokio::test]
    async fn failed_page_keeps_earlier_offers() {
        let extractor = Extractor::new(ScriptedBackend::new(300).failing_on(2), NoDelay);
        let run = extractor
            .collect_run(100, None, &SearchFilters::new(), &null_progress())
            .await;
        assert_eq!(run.offers.len(), 200);
        assert!(run.is_partial());
        assert!(matches!(run.error, Some(ScrapeError::Format(_))));
        assert_eq!(run.total_found, Some(300));
        assert_eq!(extractor.backend().calls(), 3);
    }

    #[tokio::test]
    async fn failure_on_first_page_yields_nothing() {
        let extractor = Extractor::new(ScriptedBackend::new(300).failing_on(0), NoDelay);
        let run = extractor
            .collect_run(100, None, &SearchFilters::new(), &null_progress())
            .await;
        assert!(run.offers.is_empty());
        assert!(run.is_partial());
        assert_eq!(run.total_found, None);
    }

    #[test]
    fn saved_extraction_reloads() {
        let dir = std::env::temp_dir().join("apd_scraper_save_extraction");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("ofertas.json");

        let offers = vec![
            Offer::from_value(serde_json::json!({"cargo": "Educación Física", "idoferta": 1}))
                .unwrap(),
        ];
        let metadata = ExtractionMetadata::for_run(
            1,
            Some(1),
            Some(SearchFilters::new().with_status("Publicada")),
        );
        save_extraction(&offers, &metadata, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Educación Física"));

        let file: ExtractionFile = apd_files::read_json(&path).unwrap();
        assert_eq!(file.ofertas, offers);
        assert_eq!(file.metadata, metadata);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
