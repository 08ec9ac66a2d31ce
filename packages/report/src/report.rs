//! The validation report: `{metadata, resultados}` JSON plus a CSV twin.

use std::path::{Path, PathBuf};

use apd_catalog_models::Category;
use apd_matcher::ValidationOutcome;
use apd_offer_models::{Offer, render_scalar};
use serde::{Deserialize, Deserializer, Serialize};

use crate::ReportError;
use crate::summary::Summary;

/// CSV column order, shared with the JSON row keys.
pub const CSV_COLUMNS: [&str; 7] = [
    "ige",
    "cargo_oferta",
    "codigo_oferta",
    "distrito",
    "modalidad",
    "validado",
    "cargo_conocido",
];

/// One validated offer as it appears in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRow {
    #[serde(default, deserialize_with = "scalar_text")]
    pub ige: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub cargo_oferta: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub codigo_oferta: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub distrito: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub modalidad: Option<String>,
    pub validado: bool,
    /// Snapshot of the matched catalog entry.
    #[serde(default)]
    pub cargo_conocido: Option<Category>,
}

/// Accepts any JSON scalar (older reports store `ige` as a number).
fn scalar_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_null()).map(|v| render_scalar(&v)))
}

impl ValidationRow {
    /// Builds the row for one outcome.
    #[must_use]
    pub fn from_outcome(outcome: &ValidationOutcome<'_>) -> Self {
        let offer: &Offer = outcome.offer;
        Self {
            ige: offer.ige().map(Into::into),
            cargo_oferta: offer.title().map(Into::into),
            codigo_oferta: offer.area_code().map(Into::into),
            distrito: offer.district().map(Into::into),
            modalidad: offer.level().map(Into::into),
            validado: outcome.is_matched(),
            cargo_conocido: outcome.category().cloned(),
        }
    }

    /// Cell values in [`CSV_COLUMNS`] order.
    #[must_use]
    pub fn csv_record(&self) -> [String; 7] {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        [
            text(&self.ige),
            text(&self.cargo_oferta),
            text(&self.codigo_oferta),
            text(&self.distrito),
            text(&self.modalidad),
            self.validado.to_string(),
            self.cargo_conocido
                .as_ref()
                .and_then(|c| serde_json::to_string(c).ok())
                .unwrap_or_default(),
        ]
    }
}

/// A validation report as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub metadata: Summary,
    #[serde(default)]
    pub resultados: Vec<ValidationRow>,
}

/// Where [`write_report`] put its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub csv: PathBuf,
}

/// Writes the report to `json_path` and its rows to the same path with a
/// `.csv` extension.
///
/// # Errors
///
/// Returns [`ReportError`] if either file cannot be written.
pub fn write_report(
    summary: &Summary,
    outcomes: &[ValidationOutcome<'_>],
    json_path: &Path,
) -> Result<ReportPaths, ReportError> {
    let report = ValidationReport {
        metadata: summary.clone(),
        resultados: outcomes.iter().map(ValidationRow::from_outcome).collect(),
    };
    apd_files::write_json_pretty(json_path, &report)?;

    let csv_path = json_path.with_extension("csv");
    let bytes = crate::csv_bytes(
        &CSV_COLUMNS,
        report.resultados.iter().map(ValidationRow::csv_record),
    )?;
    apd_files::write_bytes_atomic(&csv_path, &bytes)?;

    log::info!(
        "Report saved to {} and {}",
        json_path.display(),
        csv_path.display()
    );
    Ok(ReportPaths {
        json: json_path.to_path_buf(),
        csv: csv_path,
    })
}

/// Reads a report written by [`write_report`].
///
/// # Errors
///
/// Returns [`ReportError::File`] if the file is missing or malformed.
pub fn load_report(path: &Path) -> Result<ValidationReport, ReportError> {
    Ok(apd_files::read_json(path)?)
}
