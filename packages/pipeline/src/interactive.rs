#![allow(clippy::module_name_repetitions)]

//! Interactive menu for the `apd` binary.
//!
//! Runs when no subcommand is given, prompting for the same operations the
//! CLI exposes.

use std::path::PathBuf;
use std::time::Instant;

use apd_catalog::Catalog;
use apd_cli_utils::{IndicatifProgress, MultiProgress};
use apd_offer_models::SearchFilters;
use apd_offer_models::query::OfferQuery;
use dialoguer::{Confirm, Input, Select};

use crate::settings::Settings;

/// Top-level actions available in the interactive menu.
enum Action {
    Extract,
    ExtractByCategory,
    Validate,
    Enrich,
    Suggest,
    Stats,
    SearchCatalog,
    Probe,
}

impl Action {
    const ALL: &[Self] = &[
        Self::Extract,
        Self::ExtractByCategory,
        Self::Validate,
        Self::Enrich,
        Self::Suggest,
        Self::Stats,
        Self::SearchCatalog,
        Self::Probe,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Extract => "Extract offers",
            Self::ExtractByCategory => "Extract offers per catalog code",
            Self::Validate => "Validate offers against the catalog",
            Self::Enrich => "Enrich offers with catalog info",
            Self::Suggest => "Suggest missing catalog entries",
            Self::Stats => "Offer statistics",
            Self::SearchCatalog => "Search the catalog",
            Self::Probe => "Count matching offers",
        }
    }
}

/// Runs the interactive menu, prompting the user to select and configure
/// one operation.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected operation fails.
pub async fn run(settings: &Settings, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Action::ALL[idx] {
        Action::Extract => extract(settings, multi).await?,
        Action::ExtractByCategory => extract_by_category(settings, multi).await?,
        Action::Validate => {
            let suggest = Confirm::new()
                .with_prompt("Also write catalog suggestions?")
                .default(false)
                .interact()?;
            let validation = crate::validate_file(
                &prompt_path("Offers file", &settings.files.offers)?,
                &prompt_path("Catalog file", &settings.files.catalog)?,
                &settings.files.report,
                suggest.then_some(settings.files.suggestions.as_path()),
            )?;
            println!("{}", validation.summary.render(10));
        }
        Action::Enrich => {
            let output = prompt_path("Output file", &settings.files.enriched)?;
            crate::enrich_file(
                &prompt_path("Offers file", &settings.files.offers)?,
                &prompt_path("Catalog file", &settings.files.catalog)?,
                &output,
            )?;
            println!("Enriched offers written to {}", output.display());
        }
        Action::Suggest => {
            let count = crate::suggest_file(
                &prompt_path("Offers file", &settings.files.offers)?,
                &prompt_path("Catalog file", &settings.files.catalog)?,
                &settings.files.suggestions,
            )?;
            println!(
                "{count} suggested categories: {}",
                settings.files.suggestions.display()
            );
        }
        Action::Stats => {
            let input = prompt_path("Offers file", &settings.files.offers)?;
            let mut query = OfferQuery::new();
            if let Some(level) = prompt_optional_text("Level (empty for any)")? {
                query = query.with_level(&level);
            }
            if let Some(district) = prompt_optional_text("District (empty for any)")? {
                query = query.with_district(&district);
            }
            if let Some(text) = prompt_optional_text("Text search (empty for none)")? {
                query = query.with_text(&text);
            }
            println!("{}", crate::offer_stats(&input, &query)?.render(10));
        }
        Action::SearchCatalog => search_catalog(settings)?,
        Action::Probe => {
            let filters = prompt_filters()?;
            let total = crate::probe_total(settings, &filters).await?;
            println!("{total} matching offers");
        }
    }

    Ok(())
}

/// Prompts for filters and limits, then extracts offers.
async fn extract(settings: &Settings, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let filters = prompt_filters()?;
    let max = prompt_optional_u64("Maximum offers (empty for all)")?;
    let output = prompt_path("Output file", &settings.files.offers)?;

    let extractor = crate::solr_extractor(settings)?;
    let progress = IndicatifProgress::records_bar(multi, "Extracting offers");

    let start = Instant::now();
    let summary = crate::extract_offers(
        &extractor,
        settings.api.page_size,
        max,
        &filters,
        &output,
        &progress,
    )
    .await?;

    log::info!(
        "Extraction complete: {} offers in {:.1}s",
        summary.written,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Prompts for a catalog group and per-code limit, then searches each code.
async fn extract_by_category(
    settings: &Settings,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut catalog = Catalog::load(&prompt_path("Catalog file", &settings.files.catalog)?)?;

    let groups = catalog.groups();
    let mut labels = vec!["All groups"];
    labels.extend(groups.iter().copied());
    let choice = Select::new()
        .with_prompt("Which group?")
        .items(&labels)
        .default(0)
        .interact()?;
    if choice > 0 {
        let group = labels[choice].to_owned();
        catalog = catalog.filter_group(&group);
    }

    let max = prompt_optional_u64("Maximum offers per code (empty for 150)")?
        .unwrap_or(crate::DEFAULT_MAX_PER_CATEGORY);
    let published_only = Confirm::new()
        .with_prompt("Only published offers?")
        .default(true)
        .interact()?;

    let extractor = crate::solr_extractor(settings)?;
    let progress =
        IndicatifProgress::steps_bar(multi, "Searching categories", catalog.len() as u64);

    let summary = crate::extract_by_category(
        &extractor,
        &catalog,
        settings.api.page_size,
        Some(max),
        published_only.then_some(crate::PUBLISHED_STATUS),
        &PathBuf::from("ofertas_por_cargos.json"),
        &progress,
    )
    .await?;

    log::info!(
        "Searched {} codes, {} with offers, {} offers saved",
        summary.searched,
        summary.with_offers,
        summary.written
    );

    Ok(())
}

/// Prompts for a keyword and lists the matching catalog entries.
fn search_catalog(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::load_or_empty(&settings.files.catalog)?;
    if catalog.is_empty() {
        println!("The catalog is empty.");
        return Ok(());
    }

    let keyword: String = Input::new().with_prompt("Keyword").interact_text()?;
    let found = catalog.search(keyword.trim());
    if found.is_empty() {
        println!("No categories contain '{}'.", keyword.trim());
    }
    for c in found {
        println!("{:<12} {:<20} {}", c.code, c.group, c.area);
    }

    Ok(())
}

/// Prompts for each search filter. Empty answers leave it unset.
fn prompt_filters() -> Result<SearchFilters, Box<dyn std::error::Error>> {
    let mut filters = SearchFilters::new();
    if let Some(v) = prompt_optional_text("District (empty for any)")? {
        filters = filters.with_district(&v);
    }
    if let Some(v) = prompt_optional_text("Status (empty for any)")? {
        filters = filters.with_status(&v);
    }
    if let Some(v) = prompt_optional_text("Position title (empty for any)")? {
        filters = filters.with_position_title(&v);
    }
    if let Some(v) = prompt_optional_text("Area code (empty for any)")? {
        filters = filters.with_area_code(&v);
    }
    Ok(filters)
}

/// Prompts for a path, offering `default`.
fn prompt_path(prompt: &str, default: &std::path::Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .default(default.display().to_string())
        .interact_text()?;
    Ok(PathBuf::from(input.trim()))
}

/// Prompts for optional text. Returns `None` if the input is empty.
fn prompt_optional_text(prompt: &str) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;

    let input = input.trim();
    Ok((!input.is_empty()).then(|| input.to_owned()))
}

/// Prompts the user for an optional `u64` value. Returns `None` if the
/// input is empty.
fn prompt_optional_u64(prompt: &str) -> Result<Option<u64>, Box<dyn std::error::Error>> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;

    if input.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(input.trim().parse()?))
    }
}
