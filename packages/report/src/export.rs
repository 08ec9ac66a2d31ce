//! Flat CSV export of offers.

use std::collections::HashSet;
use std::path::Path;

use apd_offer_models::{Offer, render_scalar};

use crate::ReportError;

/// Column names: every key of every offer, in first-seen order.
#[must_use]
pub fn offer_columns(offers: &[Offer]) -> Vec<&str> {
    let mut seen = HashSet::new();
    offers
        .iter()
        .flat_map(|o| o.fields().keys())
        .map(String::as_str)
        .filter(|k| seen.insert(*k))
        .collect()
}

/// Writes `offers` as CSV: one column per key, scalars as text, nested
/// values as compact JSON, missing values empty. Returns the number of rows
/// written.
///
/// # Errors
///
/// Returns [`ReportError`] if encoding or writing fails.
pub fn export_offers_csv(offers: &[Offer], path: &Path) -> Result<usize, ReportError> {
    let columns = offer_columns(offers);
    let bytes = crate::csv_bytes(
        &columns,
        offers.iter().map(|offer| {
            columns
                .iter()
                .map(|column| offer.get(column).map(render_scalar).unwrap_or_default())
                .collect::<Vec<_>>()
        }),
    )?;
    apd_files::write_bytes_atomic(path, &bytes)?;

    log::info!(
        "Exported {} offers ({} columns) to {}",
        offers.len(),
        columns.len(),
        path.display()
    );
    Ok(offers.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CSV_BOM;

    #[test]
    fn columns_are_union_in_first_seen_order() {
        let offers: Vec<Offer> = serde_json::from_value(serde_json::json!([
            {"idoferta": 1, "cargo": "A"},
            {"cargo": "B", "estado": "Publicada", "idoferta": 2}
        ]))
        .unwrap();
        assert_eq!(offer_columns(&offers), vec!["idoferta", "cargo", "estado"]);
    }

    #[test]
    fn writes_scalars_and_nested_values() {
        let offers: Vec<Offer> = serde_json::from_value(serde_json::json!([
            {"idoferta": 1, "cargo": "Danza", "cargo_info": {"validado": true}},
            {"idoferta": 2, "hsmodulos": 4.5, "escuela": null}
        ]))
        .unwrap();
        let dir = std::env::temp_dir().join("apd_report_export");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("ofertas.csv");

        assert_eq!(export_offers_csv(&offers, &path).unwrap(), 2);

        let bytes = std::fs::read(&path).unwrap();
        let text = String::from_utf8(bytes[CSV_BOM.len()..].to_vec()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "idoferta,cargo,cargo_info,hsmodulos,escuela");
        assert_eq!(lines[1], r#"1,Danza,"{""validado"":true}",,"#);
        assert_eq!(lines[2], "2,,,4.5,");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
