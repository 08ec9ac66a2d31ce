#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Job offer records and the file formats built around them.
//!
//! The remote search API returns flat documents whose field set varies
//! between offers. [`Offer`] keeps the whole document verbatim (field order
//! included) and exposes typed accessors only for the handful of fields the
//! matcher and the reports depend on.

pub mod fields;
pub mod query;

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One offer ("oferta") as returned by the search API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Offer(Map<String, Value>);

impl Offer {
    /// Wraps an already-parsed document.
    #[must_use]
    pub const fn from_map(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Converts a JSON value into an offer, returning the value back if it
    /// is not an object.
    ///
    /// # Errors
    ///
    /// Returns the original value when it is not a JSON object.
    pub fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }

    /// The underlying field map.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the offer, returning its field map.
    #[must_use]
    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    /// Raw access to any field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// A copy of this offer with `field` set to `value`. The receiver is
    /// left untouched.
    #[must_use]
    pub fn with_field(&self, field: &str, value: Value) -> Self {
        let mut fields = self.0.clone();
        fields.insert(field.to_owned(), value);
        Self(fields)
    }

    /// Renders a scalar field as text.
    ///
    /// Strings are returned as-is, numbers and booleans via their JSON text,
    /// nested values as compact JSON. `null` and missing fields yield
    /// `None`.
    #[must_use]
    pub fn text(&self, field: &str) -> Option<Cow<'_, str>> {
        match self.0.get(field)? {
            Value::Null => None,
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            other => Some(Cow::Owned(render_scalar(other))),
        }
    }

    /// Like [`text`](Self::text), but blank values also yield `None`.
    #[must_use]
    pub fn non_empty_text(&self, field: &str) -> Option<Cow<'_, str>> {
        self.text(field).filter(|s| !s.trim().is_empty())
    }

    /// Position title (`cargo`), matched against catalog areas.
    #[must_use]
    pub fn title(&self) -> Option<Cow<'_, str>> {
        self.text(fields::TITLE)
    }

    /// Area code (`areaincumbencia`), matched against catalog codes.
    #[must_use]
    pub fn area_code(&self) -> Option<Cow<'_, str>> {
        self.text(fields::AREA_CODE)
    }

    /// Offer status (`estado`).
    #[must_use]
    pub fn status(&self) -> Option<Cow<'_, str>> {
        self.text(fields::STATUS)
    }

    /// District name (`descdistrito`).
    #[must_use]
    pub fn district(&self) -> Option<Cow<'_, str>> {
        self.text(fields::DISTRICT)
    }

    /// Level / modality (`descnivelmodalidad`).
    #[must_use]
    pub fn level(&self) -> Option<Cow<'_, str>> {
        self.text(fields::LEVEL)
    }

    /// School name (`escuela`).
    #[must_use]
    pub fn school(&self) -> Option<Cow<'_, str>> {
        self.text(fields::SCHOOL)
    }

    /// School identifier (`ige`).
    #[must_use]
    pub fn ige(&self) -> Option<Cow<'_, str>> {
        self.text(fields::IGE)
    }

    /// Listing identifier (`idoferta`).
    #[must_use]
    pub fn listing_id(&self) -> Option<Cow<'_, str>> {
        self.text(fields::LISTING_ID)
    }

    /// Offer type (`tipooferta`).
    #[must_use]
    pub fn offer_type(&self) -> Option<Cow<'_, str>> {
        self.text(fields::OFFER_TYPE)
    }

    /// Hours or modules (`hsmodulos`), from a number or a numeric string.
    #[must_use]
    pub fn hours(&self) -> Option<f64> {
        match self.0.get(fields::HOURS)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Closing date (`finoferta`), parsed leniently.
    #[must_use]
    pub fn closing_date(&self) -> Option<NaiveDateTime> {
        parse_offer_date(&self.text(fields::CLOSING_DATE)?)
    }

    /// The enrichment sub-object, if this offer has been enriched.
    #[must_use]
    pub fn category_info(&self) -> Option<CategoryInfo> {
        serde_json::from_value(self.0.get(fields::CATEGORY_INFO)?.clone()).ok()
    }
}

/// Renders a non-string JSON value as display text.
#[must_use]
pub fn render_scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

/// Parses the date formats seen in offer documents: RFC 3339 with offset,
/// ISO-8601 without offset (optional fractional seconds), a space-separated
/// variant, and bare dates (midnight).
#[must_use]
pub fn parse_offer_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Field-equality constraints for an extraction run.
///
/// Serialized with the keys used in extraction metadata (`distrito`,
/// `estado`, ...); unset constraints are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Exact district (`descdistrito`).
    #[serde(rename = "distrito", default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    /// Exact status (`estado`), e.g. `"Publicada"`.
    #[serde(rename = "estado", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Exact position title (`cargo`).
    #[serde(rename = "cargo", default, skip_serializing_if = "Option::is_none")]
    pub position_title: Option<String>,
    /// Exact area code (`areaincumbencia`).
    #[serde(
        rename = "areaincumbencia",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub area_code: Option<String>,
    /// Exact listing id (`idoferta`).
    #[serde(rename = "idoferta", default, skip_serializing_if = "Option::is_none")]
    pub listing_id: Option<String>,
}

impl SearchFilters {
    /// No constraints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to a district.
    #[must_use]
    pub fn with_district(mut self, district: &str) -> Self {
        self.district = Some(district.to_owned());
        self
    }

    /// Restricts to a status.
    #[must_use]
    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_owned());
        self
    }

    /// Restricts to a position title.
    #[must_use]
    pub fn with_position_title(mut self, title: &str) -> Self {
        self.position_title = Some(title.to_owned());
        self
    }

    /// Restricts to an area code.
    #[must_use]
    pub fn with_area_code(mut self, code: &str) -> Self {
        self.area_code = Some(code.to_owned());
        self
    }

    /// Restricts to a single listing.
    #[must_use]
    pub fn with_listing_id(mut self, id: &str) -> Self {
        self.listing_id = Some(id.to_owned());
        self
    }

    /// Whether no constraint is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.district.is_none()
            && self.status.is_none()
            && self.position_title.is_none()
            && self.area_code.is_none()
            && self.listing_id.is_none()
    }

    /// `(remote field, value)` pairs in their fixed query order.
    #[must_use]
    pub fn clauses(&self) -> Vec<(&'static str, &str)> {
        [
            (fields::DISTRICT, self.district.as_deref()),
            (fields::STATUS, self.status.as_deref()),
            (fields::TITLE, self.position_title.as_deref()),
            (fields::AREA_CODE, self.area_code.as_deref()),
            (fields::LISTING_ID, self.listing_id.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, v)))
        .collect()
    }

    /// The filter query (`fq`): every clause as `field:"value"`, joined with
    /// ` AND `. `None` when no constraint is set.
    #[must_use]
    pub fn filter_query(&self) -> Option<String> {
        let clauses = self.clauses();
        if clauses.is_empty() {
            return None;
        }
        Some(
            clauses
                .into_iter()
                .map(|(field, value)| format!("{field}:\"{}\"", escape_phrase(value)))
                .collect::<Vec<_>>()
                .join(" AND "),
        )
    }
}

/// Escapes backslashes and double quotes inside a quoted query phrase.
fn escape_phrase(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// The `cargo_info` sub-object attached to enriched offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInfo {
    /// Whether the offer resolved to a catalog category.
    #[serde(rename = "validado")]
    pub validated: bool,
    /// Group of the matched category.
    #[serde(rename = "modalidad_cargo")]
    pub matched_group: Option<String>,
    /// Code of the matched category.
    #[serde(rename = "codigo_cargo")]
    pub matched_code: Option<String>,
    /// Weight of the matched category, `0.0` when unmatched.
    #[serde(rename = "valor")]
    pub weight: f64,
}

impl CategoryInfo {
    /// The annotation for an offer that did not match.
    #[must_use]
    pub const fn unmatched() -> Self {
        Self {
            validated: false,
            matched_group: None,
            matched_code: None,
            weight: 0.0,
        }
    }

    /// The JSON object stored under `cargo_info`, with the same keys the
    /// serde derive uses.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "validado": self.validated,
            "modalidad_cargo": self.matched_group,
            "codigo_cargo": self.matched_code,
            "valor": self.weight,
        })
    }
}

/// Metadata header of an offers file.
///
/// Keys this type does not know about are kept in [`extra`](Self::extra)
/// and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    /// Number of offers in the file.
    #[serde(default)]
    pub total_ofertas: u64,
    /// Remote total reported by the first page of the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_encontradas: Option<u64>,
    /// Wall-clock time the extraction finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fecha_extraccion: Option<NaiveDateTime>,
    /// Filters the run used.
    #[serde(default)]
    pub filtros: Option<SearchFilters>,
    /// Categories searched (per-category runs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cargos_buscados: Option<u64>,
    /// Categories that returned at least one offer (per-category runs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cargos_con_ofertas: Option<u64>,
    /// Offers that matched the catalog (enriched files).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ofertas_validadas: Option<u64>,
    /// Percentage of matched offers, two decimals (enriched files).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub porcentaje_validacion: Option<f64>,
    /// Any other metadata key.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExtractionMetadata {
    /// Metadata for a run that just finished, stamped with the current
    /// local time.
    #[must_use]
    pub fn for_run(
        total_ofertas: u64,
        total_encontradas: Option<u64>,
        filtros: Option<SearchFilters>,
    ) -> Self {
        Self {
            total_ofertas,
            total_encontradas,
            fecha_extraccion: Some(chrono::Local::now().naive_local()),
            filtros,
            ..Self::default()
        }
    }
}

/// An offers file: `{metadata, ofertas}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionFile {
    /// File header.
    pub metadata: ExtractionMetadata,
    /// Offers in extraction order.
    #[serde(default)]
    pub ofertas: Vec<Offer>,
}

/// Rounds a ratio to a percentage with two decimals. Zero when `total` is
/// zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 10_000.0).round() / 100.0
}
