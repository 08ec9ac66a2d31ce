#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Validation of offers against the reference catalog.
//!
//! An offer matches when its position title equals a catalog area (ignoring
//! case), or failing that, when its area code equals a catalog code. The
//! first catalog entry in load order wins, so results are deterministic even
//! with duplicate entries.

use apd_catalog::Catalog;
use apd_catalog_models::Category;
use apd_offer_models::{CategoryInfo, ExtractionFile, ExtractionMetadata, Offer, fields, percentage};
use strum_macros::{AsRefStr, Display};

/// Which offer field produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum MatchSource {
    /// The position title equals the category area.
    Area,
    /// The area code equals the category code.
    Code,
}

/// A catalog entry an offer resolved to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryMatch<'a> {
    pub category: &'a Category,
    pub via: MatchSource,
}

/// The result of matching one offer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationOutcome<'a> {
    pub offer: &'a Offer,
    pub matched: Option<CategoryMatch<'a>>,
}

impl<'a> ValidationOutcome<'a> {
    /// Whether the offer resolved to a category.
    #[must_use]
    pub const fn is_matched(&self) -> bool {
        self.matched.is_some()
    }

    /// The matched category, if any.
    #[must_use]
    pub fn category(&self) -> Option<&'a Category> {
        self.matched.map(|m| m.category)
    }

    /// The `cargo_info` annotation describing this outcome.
    #[must_use]
    pub fn category_info(&self) -> CategoryInfo {
        self.category().map_or_else(CategoryInfo::unmatched, |c| CategoryInfo {
            validated: true,
            matched_group: Some(c.group.clone()),
            matched_code: Some(c.code.clone()),
            weight: c.weight,
        })
    }
}

/// Resolves `offer` against `catalog`.
///
/// Blank titles and blank area codes are treated as absent.
#[must_use]
pub fn match_offer<'a>(offer: &'a Offer, catalog: &'a Catalog) -> ValidationOutcome<'a> {
    let by_area = offer
        .non_empty_text(fields::TITLE)
        .and_then(|title| catalog.find_by_exact_area(&title))
        .map(|category| CategoryMatch {
            category,
            via: MatchSource::Area,
        });

    let matched = by_area.or_else(|| {
        offer
            .non_empty_text(fields::AREA_CODE)
            .and_then(|code| catalog.find_by_code(&code))
            .map(|category| CategoryMatch {
                category,
                via: MatchSource::Code,
            })
    });

    ValidationOutcome { offer, matched }
}

/// Matches every offer independently, in input order.
#[must_use]
pub fn validate_batch<'a>(offers: &'a [Offer], catalog: &'a Catalog) -> Vec<ValidationOutcome<'a>> {
    offers.iter().map(|offer| match_offer(offer, catalog)).collect()
}

/// Returns a copy of `offer` carrying its `cargo_info` annotation. An
/// existing annotation is replaced in the copy; the input is never
/// modified.
#[must_use]
pub fn enrich(offer: &Offer, catalog: &Catalog) -> Offer {
    let info = match_offer(offer, catalog).category_info();
    offer.with_field(fields::CATEGORY_INFO, info.to_value())
}

/// Enriches every offer of an extraction file and records the match rate
/// in its metadata.
#[must_use]
pub fn enrich_all(file: &ExtractionFile, catalog: &Catalog) -> ExtractionFile {
    let outcomes = validate_batch(&file.ofertas, catalog);
    let validated = outcomes.iter().filter(|o| o.is_matched()).count() as u64;
    let total = outcomes.len() as u64;

    let ofertas = outcomes
        .iter()
        .map(|outcome| {
            outcome
                .offer
                .with_field(fields::CATEGORY_INFO, outcome.category_info().to_value())
        })
        .collect();

    let porcentaje = percentage(validated, total);
    log::info!("Validated {validated} of {total} offers ({porcentaje:.2}%)");

    ExtractionFile {
        metadata: ExtractionMetadata {
            total_ofertas: total,
            ofertas_validadas: Some(validated),
            porcentaje_validacion: Some(porcentaje),
            ..file.metadata.clone()
        },
        ofertas,
    }
}
