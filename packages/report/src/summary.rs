//! Match-rate summary of a validation run.

use std::borrow::Cow;
use std::collections::BTreeMap;

use apd_matcher::ValidationOutcome;
use apd_offer_models::percentage;
use serde::{Deserialize, Serialize};

/// Label counted for offers that lack the grouped field.
pub const MISSING_LABEL: &str = "(sin dato)";

/// One row of a frequency table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub valor: String,
    pub cantidad: u64,
}

/// Counts `values`, most frequent first. Ties keep first-seen order.
#[must_use]
pub fn frequency_table<I, S>(values: I) -> Vec<FrequencyEntry>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut index: BTreeMap<String, usize> = BTreeMap::new();
    let mut entries: Vec<FrequencyEntry> = Vec::new();

    for value in values {
        let value = value.into();
        if let Some(&i) = index.get(&value) {
            entries[i].cantidad += 1;
        } else {
            index.insert(value.clone(), entries.len());
            entries.push(FrequencyEntry {
                valor: value,
                cantidad: 1,
            });
        }
    }

    entries.sort_by(|a, b| b.cantidad.cmp(&a.cantidad));
    entries
}

/// Totals and unmatched breakdowns of a validation run. Written as the
/// `metadata` of the validation report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_ofertas: u64,
    pub ofertas_validadas: u64,
    pub ofertas_no_validadas: u64,
    /// Percentage of matched offers, two decimals; `0.0` for an empty run.
    pub porcentaje_validadas: f64,
    /// Unmatched offers per position title.
    #[serde(default)]
    pub no_validadas_por_cargo: Vec<FrequencyEntry>,
    /// Unmatched offers per level / modality.
    #[serde(default)]
    pub no_validadas_por_modalidad: Vec<FrequencyEntry>,
}

/// Summarizes a batch of outcomes.
#[must_use]
pub fn summarize(outcomes: &[ValidationOutcome<'_>]) -> Summary {
    let total = outcomes.len() as u64;
    let unmatched: Vec<_> = outcomes.iter().filter(|o| !o.is_matched()).collect();
    let not_validated = unmatched.len() as u64;
    let validated = total - not_validated;

    Summary {
        total_ofertas: total,
        ofertas_validadas: validated,
        ofertas_no_validadas: not_validated,
        porcentaje_validadas: percentage(validated, total),
        no_validadas_por_cargo: frequency_table(unmatched.iter().map(|o| label(o.offer.title()))),
        no_validadas_por_modalidad: frequency_table(
            unmatched.iter().map(|o| label(o.offer.level())),
        ),
    }
}

fn label(value: Option<Cow<'_, str>>) -> String {
    value.map_or_else(|| MISSING_LABEL.to_owned(), Cow::into_owned)
}

impl Summary {
    /// Plain-text rendering for the terminal, listing at most `top` rows per
    /// frequency table.
    #[must_use]
    pub fn render(&self, top: usize) -> String {
        let mut lines = vec![
            format!("Total offers:         {}", self.total_ofertas),
            format!(
                "Validated offers:     {} ({:.2}%)",
                self.ofertas_validadas, self.porcentaje_validadas
            ),
            format!("Not validated:        {}", self.ofertas_no_validadas),
        ];

        for (title, table) in [
            ("Top unmatched titles", &self.no_validadas_por_cargo),
            ("Unmatched by level", &self.no_validadas_por_modalidad),
        ] {
            if table.is_empty() {
                continue;
            }
            lines.push(String::new());
            lines.push(format!("{title}:"));
            lines.extend(
                table
                    .iter()
                    .take(top)
                    .map(|e| format!("  {:<50} {:>6}", e.valor, e.cantidad)),
            );
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use apd_catalog_models::Category;
    use apd_matcher::{CategoryMatch, MatchSource};
    use apd_offer_models::Offer;

    use super::*;

    fn offer(value: serde_json::Value) -> Offer {
        Offer::from_value(value).unwrap()
    }

    #[test]
    fn frequency_table_orders_by_count_then_first_seen() {
        let table = frequency_table(["b", "a", "c", "a", "c", "d"]);
        let order: Vec<_> = table.iter().map(|e| (e.valor.as_str(), e.cantidad)).collect();
        assert_eq!(order, vec![("a", 2), ("c", 2), ("b", 1), ("d", 1)]);
    }

    #[test]
    fn seventy_three_of_a_hundred() {
        let category = Category::new("PRIMARIA", "A1", "Maestro de Grado");
        let offers: Vec<Offer> = (0..100)
            .map(|i| offer(serde_json::json!({"ige": i, "cargo": "Maestro de Grado"})))
            .collect();
        let outcomes: Vec<_> = offers
            .iter()
            .enumerate()
            .map(|(i, o)| ValidationOutcome {
                offer: o,
                matched: (i < 73).then_some(CategoryMatch {
                    category: &category,
                    via: MatchSource::Area,
                }),
            })
            .collect();

        let summary = summarize(&outcomes);
        assert_eq!(summary.total_ofertas, 100);
        assert_eq!(summary.ofertas_validadas, 73);
        assert_eq!(summary.ofertas_no_validadas, 27);
        assert!((summary.porcentaje_validadas - 73.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unmatched_tables_label_missing_values() {
        let offers = [
            offer(serde_json::json!({"cargo": "Preceptor", "descnivelmodalidad": "SECUNDARIA"})),
            offer(serde_json::json!({"cargo": "Preceptor"})),
            offer(serde_json::json!({"descnivelmodalidad": "SECUNDARIA"})),
        ];
        let outcomes: Vec<_> = offers
            .iter()
            .map(|o| ValidationOutcome {
                offer: o,
                matched: None,
            })
            .collect();

        let summary = summarize(&outcomes);
        assert_eq!(
            summary.no_validadas_por_cargo,
            vec![
                FrequencyEntry { valor: "Preceptor".to_owned(), cantidad: 2 },
                FrequencyEntry { valor: MISSING_LABEL.to_owned(), cantidad: 1 },
            ]
        );
        assert_eq!(summary.no_validadas_por_modalidad[0].valor, "SECUNDARIA");
        assert_eq!(summary.no_validadas_por_modalidad[0].cantidad, 2);
    }

    #[test]
    fn empty_run_has_zero_percentage() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_ofertas, 0);
        assert!(summary.porcentaje_validadas.abs() < f64::EPSILON);
        assert!(summary.render(10).contains("Total offers"));
    }
}
