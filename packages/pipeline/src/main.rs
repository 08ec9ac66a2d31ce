#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the APD offer toolkit.

use std::path::{Path, PathBuf};
use std::time::Instant;

use apd_catalog::Catalog;
use apd_catalog::html_import::{DEFAULT_DESCRIPTION, DEFAULT_OUTPUT_FILE, import_catalog_html};
use apd_cli_utils::{IndicatifProgress, MultiProgress};
use apd_offer_models::query::OfferQuery;
use apd_offer_models::{SearchFilters, parse_offer_date};
use apd_pipeline::settings::Settings;
use apd_pipeline::{
    DEFAULT_MAX_PER_CATEGORY, PUBLISHED_STATUS, enrich_file, export_offers, extract_by_category,
    extract_offers, offer_stats, probe_total, solr_extractor, suggest_file, validate_file,
};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "apd", about = "APD teaching offer extraction and validation")]
struct Cli {
    /// TOML settings file (defaults to `apd.toml` when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Search API constraints shared by the extraction commands.
#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// District name (`descdistrito`)
    #[arg(long)]
    district: Option<String>,
    /// Offer status (`estado`), e.g. "Publicada"
    #[arg(long)]
    status: Option<String>,
    /// Position title (`cargo`)
    #[arg(long)]
    title: Option<String>,
    /// Area code (`areaincumbencia`)
    #[arg(long)]
    area_code: Option<String>,
    /// Listing id (`idoferta`)
    #[arg(long)]
    listing_id: Option<String>,
}

impl FilterArgs {
    fn into_filters(self) -> SearchFilters {
        let mut filters = SearchFilters::new();
        if let Some(v) = self.district {
            filters = filters.with_district(&v);
        }
        if let Some(v) = self.status {
            filters = filters.with_status(&v);
        }
        if let Some(v) = self.title {
            filters = filters.with_position_title(&v);
        }
        if let Some(v) = self.area_code {
            filters = filters.with_area_code(&v);
        }
        if let Some(v) = self.listing_id {
            filters = filters.with_listing_id(&v);
        }
        filters
    }
}

/// Local filters applied to a loaded offers file.
#[derive(Args, Debug, Default)]
struct QueryArgs {
    /// Level / modality (`descnivelmodalidad`)
    #[arg(long)]
    level: Option<String>,
    /// District (`descdistrito`)
    #[arg(long)]
    district: Option<String>,
    /// Area code (`areaincumbencia`)
    #[arg(long)]
    area_code: Option<String>,
    /// Status (`estado`)
    #[arg(long)]
    status: Option<String>,
    /// Case-insensitive text in the title, area description or district
    #[arg(long)]
    text: Option<String>,
    /// Earliest closing date, e.g. 2024-03-01
    #[arg(long, value_parser = parse_date_arg)]
    closing_from: Option<chrono::NaiveDateTime>,
    /// Latest closing date
    #[arg(long, value_parser = parse_date_arg)]
    closing_to: Option<chrono::NaiveDateTime>,
}

fn parse_date_arg(value: &str) -> Result<chrono::NaiveDateTime, String> {
    parse_offer_date(value).ok_or_else(|| format!("not a date: {value}"))
}

impl QueryArgs {
    fn into_query(self) -> OfferQuery {
        let mut query = OfferQuery::new().with_closing_range(self.closing_from, self.closing_to);
        if let Some(v) = self.level {
            query = query.with_level(&v);
        }
        if let Some(v) = self.district {
            query = query.with_district(&v);
        }
        if let Some(v) = self.area_code {
            query = query.with_area_code(&v);
        }
        if let Some(v) = self.status {
            query = query.with_status(&v);
        }
        if let Some(v) = self.text {
            query = query.with_text(&v);
        }
        query
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract offers from the search API into an offers file
    Extract {
        /// Maximum number of offers to extract
        #[arg(long)]
        max: Option<u64>,
        /// Records per request (overrides the configured page size)
        #[arg(long)]
        page_size: Option<u32>,
        #[command(flatten)]
        filters: FilterArgs,
        /// Output file (defaults to the configured offers file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Extract offers once per catalog code
    ExtractByCategory {
        /// Catalog file (defaults to the configured catalog)
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Only search codes of this group
        #[arg(long)]
        group: Option<String>,
        /// Maximum offers per code
        #[arg(long, default_value_t = DEFAULT_MAX_PER_CATEGORY)]
        max_per_category: u64,
        /// Offer status to search for; empty for any
        #[arg(long, default_value = PUBLISHED_STATUS)]
        status: String,
        /// Output file
        #[arg(short, long, default_value = "ofertas_por_cargos.json")]
        output: PathBuf,
    },
    /// Attach `cargo_info` to every offer of an offers file
    Enrich {
        /// Offers file
        #[arg(long)]
        input: Option<PathBuf>,
        /// Catalog file
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate offers against the catalog and write the report
    Validate {
        /// Offers file
        #[arg(long)]
        input: Option<PathBuf>,
        /// Catalog file
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Report file (a `.csv` twin is written next to it)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write catalog suggestions for unmatched offers
        #[arg(long)]
        suggest: bool,
        /// Rows listed per frequency table
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Propose catalog entries for unmatched offers
    Suggest {
        /// Offers file
        #[arg(long)]
        input: Option<PathBuf>,
        /// Catalog file
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Build a grouped catalog file from a saved catalog HTML page
    ImportCatalog {
        /// HTML page
        html: PathBuf,
        /// Output catalog file
        #[arg(short, long, default_value = DEFAULT_OUTPUT_FILE)]
        output: PathBuf,
        /// `descripcion` stored in the catalog metadata
        #[arg(long, default_value = DEFAULT_DESCRIPTION)]
        description: String,
    },
    /// Inspect the catalog
    Catalog {
        /// Catalog file
        #[arg(long)]
        catalog: Option<PathBuf>,
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Print descriptive statistics of an offers file
    Stats {
        /// Offers file
        #[arg(long)]
        input: Option<PathBuf>,
        /// Rows listed per frequency table
        #[arg(long, default_value_t = 10)]
        top: usize,
        /// Also export the offers as CSV to this path
        #[arg(long)]
        csv: Option<PathBuf>,
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Ask the search API how many offers match the filters
    Probe {
        #[command(flatten)]
        filters: FilterArgs,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List every category
    List,
    /// Categories whose area contains a keyword
    Search { keyword: String },
    /// Categories of one group
    Group { group: String },
}

fn print_categories<'a>(categories: impl IntoIterator<Item = &'a apd_catalog_models::Category>) {
    println!("{:<12} {:<20} {:>6}  AREA", "CODE", "GROUP", "WEIGHT");
    println!("{}", "-".repeat(70));
    let mut count = 0;
    for c in categories {
        println!("{:<12} {:<20} {:>6.2}  {}", c.code, c.group, c.weight, c.area);
        count += 1;
    }
    println!("{count} categories");
}

fn or_default(path: Option<PathBuf>, default: &Path) -> PathBuf {
    path.unwrap_or_else(|| default.to_path_buf())
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi: MultiProgress = apd_cli_utils::init_logger();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    let Some(command) = cli.command else {
        return apd_pipeline::interactive::run(&settings, &multi).await;
    };

    let files = &settings.files;

    match command {
        Commands::Extract {
            max,
            page_size,
            filters,
            output,
        } => {
            let output = or_default(output, &files.offers);
            let filters = filters.into_filters();
            let extractor = solr_extractor(&settings)?;
            let progress = IndicatifProgress::records_bar(&multi, "Extracting offers");

            let start = Instant::now();
            let summary = extract_offers(
                &extractor,
                page_size.unwrap_or(settings.api.page_size),
                max,
                &filters,
                &output,
                &progress,
            )
            .await?;
            log::info!(
                "Extraction complete: {} of {} offers in {:.1}s",
                summary.written,
                summary
                    .total_found
                    .map_or_else(|| "?".to_owned(), |t| t.to_string()),
                start.elapsed().as_secs_f64()
            );
        }
        Commands::ExtractByCategory {
            catalog,
            group,
            max_per_category,
            status,
            output,
        } => {
            let mut catalog = Catalog::load(&or_default(catalog, &files.catalog))?;
            if let Some(group) = group {
                catalog = catalog.filter_group(&group);
            }
            let extractor = solr_extractor(&settings)?;
            let progress =
                IndicatifProgress::steps_bar(&multi, "Searching categories", catalog.len() as u64);
            let status = Some(status.trim()).filter(|s| !s.is_empty());

            let summary = extract_by_category(
                &extractor,
                &catalog,
                settings.api.page_size,
                Some(max_per_category),
                status,
                &output,
                &progress,
            )
            .await?;
            log::info!(
                "Searched {} codes, {} with offers ({} failed), {} offers saved",
                summary.searched,
                summary.with_offers,
                summary.failed,
                summary.written
            );
        }
        Commands::Enrich {
            input,
            catalog,
            output,
        } => {
            let enriched = enrich_file(
                &or_default(input, &files.offers),
                &or_default(catalog, &files.catalog),
                &or_default(output, &files.enriched),
            )?;
            println!(
                "Validated {} of {} offers ({:.2}%)",
                enriched.metadata.ofertas_validadas.unwrap_or_default(),
                enriched.metadata.total_ofertas,
                enriched.metadata.porcentaje_validacion.unwrap_or_default()
            );
        }
        Commands::Validate {
            input,
            catalog,
            output,
            suggest,
            top,
        } => {
            let suggestions = suggest.then_some(files.suggestions.as_path());
            let validation = validate_file(
                &or_default(input, &files.offers),
                &or_default(catalog, &files.catalog),
                &or_default(output, &files.report),
                suggestions,
            )?;
            println!("{}", validation.summary.render(top));
            println!();
            println!("Report: {}", validation.paths.json.display());
            println!("CSV:    {}", validation.paths.csv.display());
            if let Some(count) = validation.suggestions {
                println!("{count} suggested categories: {}", files.suggestions.display());
            }
        }
        Commands::Suggest {
            input,
            catalog,
            output,
        } => {
            let output = or_default(output, &files.suggestions);
            let count = suggest_file(
                &or_default(input, &files.offers),
                &or_default(catalog, &files.catalog),
                &output,
            )?;
            println!("{count} suggested categories: {}", output.display());
        }
        Commands::ImportCatalog {
            html,
            output,
            description,
        } => {
            import_catalog_html(&html, &output, &description)?;
            println!("Catalog written to {}", output.display());
        }
        Commands::Catalog { catalog, action } => {
            let catalog = Catalog::load_or_empty(&or_default(catalog, &files.catalog))?;
            match action {
                CatalogAction::List => print_categories(&catalog),
                CatalogAction::Search { keyword } => print_categories(catalog.search(&keyword)),
                CatalogAction::Group { group } => print_categories(catalog.find_by_group(&group)),
            }
        }
        Commands::Stats {
            input,
            top,
            csv,
            query,
        } => {
            let input = or_default(input, &files.offers);
            let query = query.into_query();
            println!("{}", offer_stats(&input, &query)?.render(top));
            if let Some(csv) = csv {
                let rows = export_offers(&input, &query, &csv)?;
                println!("\nExported {rows} offers to {}", csv.display());
            }
        }
        Commands::Probe { filters } => {
            let total = probe_total(&settings, &filters.into_filters()).await?;
            println!("{total}");
        }
    }

    Ok(())
}
