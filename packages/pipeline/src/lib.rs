#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! End-to-end operations behind the `apd` binary: extract offers from the
//! search API, enrich and validate them against the reference catalog, and
//! write reports.
//!
//! Every operation reads and writes whole JSON/CSV files; nothing is kept
//! between runs.

pub mod interactive;
pub mod settings;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use apd_catalog::{Catalog, CatalogError};
use apd_files::FileError;
use apd_matcher::{enrich_all, validate_batch};
use apd_offer_models::query::OfferQuery;
use apd_offer_models::{ExtractionFile, ExtractionMetadata, Offer, SearchFilters};
use apd_report::ReportError;
use apd_report::report::{ReportPaths, write_report};
use apd_report::stats::OfferStats;
use apd_report::suggest::{suggest_missing, write_suggestions};
use apd_report::summary::{Summary, summarize};
use apd_scraper::extract::{Extractor, save_extraction};
use apd_scraper::pacing::{FixedDelay, Pacer};
use apd_scraper::progress::{ProgressCallback, null_progress};
use apd_scraper::solr::SolrSearchClient;
use apd_scraper::{ScrapeError, SearchBackend};

use crate::settings::Settings;

/// Status used for per-category extraction unless overridden.
pub const PUBLISHED_STATUS: &str = "Publicada";

/// Per-category cap used unless overridden.
pub const DEFAULT_MAX_PER_CATEGORY: u64 = 150;

/// Errors surfaced by pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Settings are missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    File(#[from] FileError),
}

/// The production extractor: HTTP backend with a fixed pause.
pub type SolrExtractor = Extractor<SolrSearchClient, FixedDelay>;

/// Builds the production extractor from `settings`.
///
/// # Errors
///
/// Returns [`PipelineError::Config`] if no endpoint is configured and
/// [`PipelineError::Scrape`] if the HTTP client cannot be built.
pub fn solr_extractor(settings: &Settings) -> Result<SolrExtractor, PipelineError> {
    let config = settings.scrape_config()?;
    let pacer = FixedDelay::from_millis(config.delay_ms);
    Ok(Extractor::new(SolrSearchClient::new(config)?, pacer))
}

/// Asks the search API how many offers match `filters`.
///
/// # Errors
///
/// Returns [`PipelineError`] if the endpoint is missing or the request
/// fails.
pub async fn probe_total(settings: &Settings, filters: &SearchFilters) -> Result<u64, PipelineError> {
    let client = SolrSearchClient::new(settings.scrape_config()?)?;
    let total = client.probe_total(filters).await?;
    log::info!("The search API reports {total} matching offers");
    Ok(total)
}

/// Outcome of [`extract_offers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// Offers written to the output file.
    pub written: usize,
    /// Remote total reported by the first page.
    pub total_found: Option<u64>,
}

/// Extracts offers matching `filters` and writes them to `output`.
///
/// When a page fails mid-run, the offers already extracted are still written
/// before the error is returned.
///
/// # Errors
///
/// Returns [`PipelineError::Scrape`] if a page request failed or the
/// output cannot be written.
pub async fn extract_offers<B: SearchBackend, P: Pacer>(
    extractor: &Extractor<B, P>,
    page_size: u32,
    max_records: Option<u64>,
    filters: &SearchFilters,
    output: &Path,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<ExtractionSummary, PipelineError> {
    let run = extractor
        .collect_run(page_size, max_records, filters, progress)
        .await;

    let metadata = ExtractionMetadata::for_run(
        run.offers.len() as u64,
        run.total_found,
        (!filters.is_empty()).then(|| filters.clone()),
    );
    save_extraction(&run.offers, &metadata, output)?;

    if let Some(e) = run.error {
        log::warn!(
            "Extraction incomplete: saved {} offers before the error",
            run.offers.len()
        );
        return Err(e.into());
    }

    Ok(ExtractionSummary {
        written: run.offers.len(),
        total_found: run.total_found,
    })
}

/// Outcome of [`extract_by_category`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryExtractionSummary {
    /// Distinct category codes searched.
    pub searched: usize,
    /// Codes that returned at least one offer.
    pub with_offers: usize,
    /// Codes whose run ended with an error.
    pub failed: usize,
    /// Offers written.
    pub written: usize,
}

/// Runs one extraction per catalog code (filtered by `status` when given)
/// and writes every offer found to a single file.
///
/// Entries without a code and repeated codes are skipped. A failing code is
/// logged and the run moves on, keeping whatever that code yielded.
///
/// # Errors
///
/// Returns [`PipelineError`] if the output cannot be written.
#[allow(clippy::too_many_arguments)]
pub async fn extract_by_category<B: SearchBackend, P: Pacer>(
    extractor: &Extractor<B, P>,
    catalog: &Catalog,
    page_size: u32,
    max_per_category: Option<u64>,
    status: Option<&str>,
    output: &Path,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<CategoryExtractionSummary, PipelineError> {
    let mut seen = HashSet::new();
    let categories: Vec<_> = catalog
        .iter()
        .filter(|c| !c.code.trim().is_empty() && seen.insert(c.code.to_lowercase()))
        .collect();

    progress.set_total(categories.len() as u64);
    let quiet = null_progress();

    let mut offers: Vec<Offer> = Vec::new();
    let mut with_offers = 0;
    let mut failed = 0;

    for (i, category) in categories.iter().enumerate() {
        log::info!(
            "[{}/{}] Searching offers for {} ({} | {})",
            i + 1,
            categories.len(),
            category.area,
            category.group,
            category.code
        );
        progress.set_message(category.code.clone());

        let mut filters = SearchFilters::new().with_area_code(&category.code);
        if let Some(status) = status {
            filters = filters.with_status(status);
        }

        let run = extractor
            .collect_run(page_size, max_per_category, &filters, &quiet)
            .await;

        if let Some(e) = &run.error {
            log::error!("Search for {} failed: {e}", category.code);
            failed += 1;
        }
        if run.offers.is_empty() {
            log::info!("  no offers");
        } else {
            log::info!("  {} offers", run.offers.len());
            with_offers += 1;
            offers.extend(run.offers);
        }
        progress.inc(1);
    }

    let mut metadata = ExtractionMetadata::for_run(offers.len() as u64, None, None);
    metadata.total_cargos_buscados = Some(categories.len() as u64);
    metadata.cargos_con_ofertas = Some(with_offers as u64);
    save_extraction(&offers, &metadata, output)?;

    progress.finish(format!(
        "{with_offers}/{} categories with offers",
        categories.len()
    ));

    Ok(CategoryExtractionSummary {
        searched: categories.len(),
        with_offers,
        failed,
        written: offers.len(),
    })
}

/// Reads an offers file.
///
/// # Errors
///
/// Returns [`PipelineError::File`] if the file is missing or malformed.
pub fn load_offers(path: &Path) -> Result<ExtractionFile, PipelineError> {
    let file: ExtractionFile = apd_files::read_json(path)?;
    log::info!("Loaded {} offers from {}", file.ofertas.len(), path.display());
    Ok(file)
}

/// Enriches the offers in `offers_path` and writes them to `output`.
///
/// # Errors
///
/// Returns [`PipelineError`] if an input cannot be loaded or the output
/// cannot be written.
pub fn enrich_file(
    offers_path: &Path,
    catalog_path: &Path,
    output: &Path,
) -> Result<ExtractionFile, PipelineError> {
    let catalog = Catalog::load(catalog_path)?;
    let file = load_offers(offers_path)?;
    let enriched = enrich_all(&file, &catalog);
    apd_files::write_json_pretty(output, &enriched)?;
    log::info!("Enriched offers saved to {}", output.display());
    Ok(enriched)
}

/// Outcome of [`validate_file`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationSummary {
    pub summary: Summary,
    pub paths: ReportPaths,
    /// Suggestions written, when requested.
    pub suggestions: Option<usize>,
}

/// Validates the offers in `offers_path`, writes the report (and
/// optionally catalog suggestions).
///
/// # Errors
///
/// Returns [`PipelineError`] if an input cannot be loaded or an output
/// cannot be written.
pub fn validate_file(
    offers_path: &Path,
    catalog_path: &Path,
    report_path: &Path,
    suggestions_path: Option<&Path>,
) -> Result<ValidationSummary, PipelineError> {
    let catalog = Catalog::load(catalog_path)?;
    let file = load_offers(offers_path)?;

    let outcomes = validate_batch(&file.ofertas, &catalog);
    let summary = summarize(&outcomes);
    let paths = write_report(&summary, &outcomes, report_path)?;

    let suggestions = match suggestions_path {
        Some(path) => {
            let suggested = suggest_missing(&outcomes);
            write_suggestions(&suggested, path)?;
            Some(suggested.len())
        }
        None => None,
    };

    Ok(ValidationSummary {
        summary,
        paths,
        suggestions,
    })
}

/// Writes catalog suggestions for the unmatched offers in `offers_path`.
///
/// # Errors
///
/// Returns [`PipelineError`] if an input cannot be loaded or the output
/// cannot be written.
pub fn suggest_file(
    offers_path: &Path,
    catalog_path: &Path,
    output: &Path,
) -> Result<usize, PipelineError> {
    let catalog = Catalog::load(catalog_path)?;
    let file = load_offers(offers_path)?;
    let suggested = suggest_missing(&validate_batch(&file.ofertas, &catalog));
    write_suggestions(&suggested, output)?;
    Ok(suggested.len())
}

/// Reads an offers file keeping only the offers `query` matches.
///
/// # Errors
///
/// Returns [`PipelineError::File`] if the file is missing or malformed.
pub fn load_matching_offers(
    path: &Path,
    query: &OfferQuery,
) -> Result<Vec<Offer>, PipelineError> {
    let mut offers = load_offers(path)?.ofertas;
    let before = offers.len();
    offers.retain(|o| query.matches(o));
    if offers.len() != before {
        log::info!("{} of {before} offers match the filters", offers.len());
    }
    Ok(offers)
}

/// Descriptive statistics of the offers in `offers_path` that `query`
/// matches.
///
/// # Errors
///
/// Returns [`PipelineError::File`] if the file cannot be loaded.
pub fn offer_stats(offers_path: &Path, query: &OfferQuery) -> Result<OfferStats, PipelineError> {
    Ok(OfferStats::from_offers(&load_matching_offers(offers_path, query)?))
}

/// Exports the offers in `offers_path` that `query` matches as CSV.
///
/// # Errors
///
/// Returns [`PipelineError`] if the input cannot be loaded or the CSV
/// cannot be written.
pub fn export_offers(
    offers_path: &Path,
    query: &OfferQuery,
    csv_path: &Path,
) -> Result<usize, PipelineError> {
    let offers = load_matching_offers(offers_path, query)?;
    Ok(apd_report::export::export_offers_csv(&offers, csv_path)?)
}
