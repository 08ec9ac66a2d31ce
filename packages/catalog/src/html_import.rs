//! Converts the official category table page into a grouped catalog file.
//!
//! The page lists the positions a degree gives access to in two tables
//! with a light green background: the first holds qualifying positions, the
//! second bonus positions. Each row reads `group | area (CODE) | weight`.

use std::collections::BTreeMap;
use std::path::Path;

use apd_catalog_models::{Category, GroupedCatalog};
use apd_scraper::html_table::{HtmlTable, TableRows};
use regex::Regex;

use crate::CatalogError;

/// Inline style that marks the category tables.
pub const CATALOG_TABLE_STYLE: &str = "background-color: #ECF8D9";

/// File the importer writes to when no output is given. Kept apart from
/// the working catalog so an import never replaces it unasked.
pub const DEFAULT_OUTPUT_FILE: &str = "cargos_completos.json";

/// Description written into the metadata when none is given.
pub const DEFAULT_DESCRIPTION: &str = "Cargos docentes";

/// Parses the category page into a grouped catalog.
///
/// Missing tables yield empty groups. Rows with fewer than three cells are
/// ignored; rows whose weight is not a number are skipped with a warning.
///
/// # Errors
///
/// Returns [`CatalogError::Html`] if the document cannot be parsed.
pub fn parse_catalog_html(html: &str, description: &str) -> Result<GroupedCatalog, CatalogError> {
    let tables = HtmlTable::new()
        .with_style_containing(CATALOG_TABLE_STYLE)
        .parse(html)
        .map_err(|e| CatalogError::Html(e.to_string()))?;

    if tables.is_empty() {
        log::warn!("No category tables found in the document");
    }

    let mut tables = tables.into_iter();
    let habilitantes = tables.next().map(|t| parse_table(&t)).unwrap_or_default();
    let bonificantes = tables.next().map(|t| parse_table(&t)).unwrap_or_default();

    Ok(GroupedCatalog {
        metadata: Some(serde_json::json!({
            "total_habilitantes": habilitantes.len(),
            "total_bonificantes": bonificantes.len(),
            "descripcion": description,
        })),
        habilitantes: Some(habilitantes),
        bonificantes: Some(bonificantes),
    })
}

/// Reads `html_path`, parses it, and writes the grouped catalog to
/// `output_path`.
///
/// # Errors
///
/// * [`CatalogError::NotFound`] if `html_path` does not exist.
/// * [`CatalogError::Html`] if the page cannot be parsed.
/// * [`CatalogError::File`] if reading or writing fails otherwise.
pub fn import_catalog_html(
    html_path: &Path,
    output_path: &Path,
    description: &str,
) -> Result<GroupedCatalog, CatalogError> {
    let html = match std::fs::read_to_string(html_path) {
        Ok(html) => html,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CatalogError::NotFound {
                path: html_path.display().to_string(),
            });
        }
        Err(e) => {
            return Err(apd_files::FileError::Io {
                path: html_path.display().to_string(),
                source: e,
            }
            .into());
        }
    };

    let catalog = parse_catalog_html(&html, description)?;
    apd_files::write_json_pretty(output_path, &catalog)?;

    let habilitantes = catalog.habilitantes.as_deref().unwrap_or_default();
    let bonificantes = catalog.bonificantes.as_deref().unwrap_or_default();
    log::info!(
        "Imported {} qualifying and {} bonus categories into {}",
        habilitantes.len(),
        bonificantes.len(),
        output_path.display()
    );
    log_group_summary("qualifying", habilitantes);
    log_group_summary("bonus", bonificantes);

    Ok(catalog)
}

fn parse_table(rows: &TableRows) -> Vec<Category> {
    let code_re = Regex::new(r"\(([^)]+)\)").unwrap_or_else(|_| unreachable!());
    let strip_re = Regex::new(r"\([^)]+\)\s*").unwrap_or_else(|_| unreachable!());

    rows.iter()
        .filter(|cells| cells.len() >= 3)
        .filter_map(|cells| {
            let group = cells[0].trim();
            let area_text = cells[1].as_str();
            let raw_weight = cells[2].trim();

            let Ok(weight) = raw_weight.replace(',', ".").parse::<f64>() else {
                log::warn!("Skipping '{area_text}': weight '{raw_weight}' is not a number");
                return None;
            };

            let code = code_re
                .captures(area_text)
                .and_then(|c| c.get(1))
                .map_or("", |m| m.as_str());
            let area = strip_re.replace_all(area_text, "");

            Some(Category::new(group, code, area.trim()).with_weight(weight))
        })
        .collect()
}

fn log_group_summary(label: &str, categories: &[Category]) {
    let mut per_group: BTreeMap<&str, usize> = BTreeMap::new();
    for category in categories {
        *per_group.entry(category.group.as_str()).or_default() += 1;
    }
    for (group, count) in per_group {
        log::info!("  [{label}] {group:30} {count:3} categories");
    }
}
