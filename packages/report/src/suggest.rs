//! Catalog entries proposed from unmatched offers.

use std::collections::HashSet;
use std::path::Path;

use apd_catalog_models::{Category, DEFAULT_WEIGHT, UNKNOWN_CODE};
use apd_matcher::ValidationOutcome;

use crate::ReportError;

/// One suggestion per distinct unmatched `(title, area code, level)`, in
/// first-seen order. Offers without an area code are proposed under
/// [`UNKNOWN_CODE`], so a missing and a blank code are the same key.
#[must_use]
pub fn suggest_missing(outcomes: &[ValidationOutcome<'_>]) -> Vec<Category> {
    let mut seen = HashSet::new();
    outcomes
        .iter()
        .filter(|o| !o.is_matched())
        .filter_map(|o| {
            let title = o.offer.title().map(Into::<String>::into);
            let code = o
                .offer
                .area_code()
                .map(|c| c.trim().to_owned())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| UNKNOWN_CODE.to_owned());
            let level = o.offer.level().map(Into::<String>::into);
            if !seen.insert((title.clone(), code.clone(), level.clone())) {
                return None;
            }
            Some(
                Category::new(
                    level.as_deref().unwrap_or_default(),
                    &code,
                    title.as_deref().unwrap_or_default(),
                )
                .with_weight(DEFAULT_WEIGHT),
            )
        })
        .collect()
}

/// Writes suggestions as a flat catalog array.
///
/// # Errors
///
/// Returns [`ReportError::File`] if the file cannot be written.
pub fn write_suggestions(suggestions: &[Category], path: &Path) -> Result<(), ReportError> {
    apd_files::write_json_pretty(path, suggestions)?;
    log::info!(
        "Saved {} suggested categories to {}",
        suggestions.len(),
        path.display()
    );
    Ok(())
}
