//! Descriptive statistics of an offers file.

use apd_offer_models::{Offer, fields};
use serde::Serialize;

use crate::summary::{FrequencyEntry, frequency_table};

/// Fields whose missing values are counted.
const KEY_FIELDS: [&str; 7] = [
    fields::TITLE,
    fields::AREA_CODE,
    fields::DISTRICT,
    fields::LEVEL,
    fields::STATUS,
    fields::CLOSING_DATE,
    fields::HOURS,
];

/// Summary statistics of `hsmodulos`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoursStats {
    pub count: u64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl HoursStats {
    #[allow(clippy::cast_precision_loss)]
    fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let sum: f64 = values.iter().sum();
        Some(Self {
            count: values.len() as u64,
            mean: sum / values.len() as f64,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

/// Value counts and completeness of a loaded offer list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferStats {
    pub total: u64,
    pub by_status: Vec<FrequencyEntry>,
    pub by_district: Vec<FrequencyEntry>,
    pub by_title: Vec<FrequencyEntry>,
    pub by_level: Vec<FrequencyEntry>,
    pub by_offer_type: Vec<FrequencyEntry>,
    pub hours: Option<HoursStats>,
    /// `(field, offers lacking it)` for each key field, zeros included.
    pub missing: Vec<(String, u64)>,
}

impl OfferStats {
    /// Computes statistics over `offers`. Missing values are left out of
    /// the value counts and reported in [`missing`](Self::missing).
    #[must_use]
    pub fn from_offers(offers: &[Offer]) -> Self {
        let counts = |field: &str| {
            frequency_table(
                offers
                    .iter()
                    .filter_map(|o| o.non_empty_text(field))
                    .map(std::borrow::Cow::into_owned),
            )
        };

        let hours: Vec<f64> = offers.iter().filter_map(Offer::hours).collect();

        let missing = KEY_FIELDS
            .iter()
            .map(|field| {
                let absent = offers
                    .iter()
                    .filter(|o| o.non_empty_text(field).is_none())
                    .count() as u64;
                ((*field).to_owned(), absent)
            })
            .collect();

        Self {
            total: offers.len() as u64,
            by_status: counts(fields::STATUS),
            by_district: counts(fields::DISTRICT),
            by_title: counts(fields::TITLE),
            by_level: counts(fields::LEVEL),
            by_offer_type: counts(fields::OFFER_TYPE),
            hours: HoursStats::from_values(&hours),
            missing,
        }
    }

    /// Plain-text rendering listing at most `top` values per table.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn render(&self, top: usize) -> String {
        let mut lines = vec![format!("Total offers: {}", self.total)];

        for (title, table) in [
            ("By status", &self.by_status),
            ("Top districts", &self.by_district),
            ("Top titles", &self.by_title),
            ("By level", &self.by_level),
            ("By offer type", &self.by_offer_type),
        ] {
            lines.push(String::new());
            lines.push(format!("{title}:"));
            if table.is_empty() {
                lines.push("  (none)".to_owned());
            }
            for entry in table.iter().take(top) {
                let share = if self.total == 0 {
                    0.0
                } else {
                    entry.cantidad as f64 / self.total as f64 * 100.0
                };
                lines.push(format!(
                    "  {:<45} {:>6} ({share:5.1}%)",
                    entry.valor, entry.cantidad
                ));
            }
        }

        lines.push(String::new());
        match &self.hours {
            Some(h) => lines.push(format!(
                "Hours/modules: count {} mean {:.2} min {} max {}",
                h.count, h.mean, h.min, h.max
            )),
            None => lines.push("Hours/modules: no data".to_owned()),
        }

        lines.push(String::new());
        lines.push("Missing values:".to_owned());
        for (field, count) in &self.missing {
            lines.push(format!("  {field:<25} {count:>6}"));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offers() -> Vec<Offer> {
        serde_json::from_value(serde_json::json!([
            {"estado": "Publicada", "descdistrito": "LA PLATA", "cargo": "Preceptor", "hsmodulos": 4},
            {"estado": "Publicada", "descdistrito": "QUILMES", "cargo": "Preceptor", "hsmodulos": "10"},
            {"estado": "Designada", "descdistrito": "LA PLATA", "hsmodulos": "n/a"}
        ]))
        .unwrap()
    }

    #[test]
    fn counts_values_and_missing_fields() {
        let stats = OfferStats::from_offers(&offers());
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_status[0].valor, "Publicada");
        assert_eq!(stats.by_status[0].cantidad, 2);
        assert_eq!(stats.by_district[0].valor, "LA PLATA");
        assert_eq!(stats.by_title.len(), 1);
        assert!(stats.by_level.is_empty());

        let missing: std::collections::BTreeMap<_, _> = stats.missing.iter().cloned().collect();
        assert_eq!(missing["cargo"], 1);
        assert_eq!(missing["descnivelmodalidad"], 3);
        assert_eq!(missing["estado"], 0);
    }

    #[test]
    fn hours_ignore_non_numeric_values() {
        let hours = OfferStats::from_offers(&offers()).hours.unwrap();
        assert_eq!(hours.count, 2);
        assert!((hours.mean - 7.0).abs() < f64::EPSILON);
        assert!((hours.min - 4.0).abs() < f64::EPSILON);
        assert!((hours.max - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn render_limits_rows() {
        let text = OfferStats::from_offers(&offers()).render(1);
        assert!(text.contains("Total offers: 3"));
        assert!(text.contains("LA PLATA"));
        assert!(!text.contains("QUILMES"));
    }

    #[test]
    fn empty_input() {
        let stats = OfferStats::from_offers(&[]);
        assert_eq!(stats.total, 0);
        assert!(stats.hours.is_none());
        assert!(stats.render(5).contains("no data"));
    }
}
