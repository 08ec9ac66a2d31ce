//! In-memory filtering of loaded offers.

use chrono::NaiveDateTime;

use crate::{Offer, fields};

/// Filters over a loaded offer list. Every unset criterion matches
/// everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfferQuery {
    /// Exact level / modality.
    pub level: Option<String>,
    /// Exact district.
    pub district: Option<String>,
    /// Exact area code.
    pub area_code: Option<String>,
    /// Exact status.
    pub status: Option<String>,
    /// Case-insensitive substring over title, area description and district.
    pub text: Option<String>,
    /// Inclusive lower bound on the closing date.
    pub closing_from: Option<NaiveDateTime>,
    /// Inclusive upper bound on the closing date.
    pub closing_to: Option<NaiveDateTime>,
}

impl OfferQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_level(mut self, level: &str) -> Self {
        self.level = Some(level.to_owned());
        self
    }

    #[must_use]
    pub fn with_district(mut self, district: &str) -> Self {
        self.district = Some(district.to_owned());
        self
    }

    #[must_use]
    pub fn with_area_code(mut self, code: &str) -> Self {
        self.area_code = Some(code.to_owned());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_owned());
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_lowercase());
        self
    }

    #[must_use]
    pub const fn with_closing_range(
        mut self,
        from: Option<NaiveDateTime>,
        to: Option<NaiveDateTime>,
    ) -> Self {
        self.closing_from = from;
        self.closing_to = to;
        self
    }

    /// Whether `offer` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, offer: &Offer) -> bool {
        let exact = [
            (fields::LEVEL, &self.level),
            (fields::DISTRICT, &self.district),
            (fields::AREA_CODE, &self.area_code),
            (fields::STATUS, &self.status),
        ];
        for (field, wanted) in exact {
            if let Some(wanted) = wanted
                && offer.text(field).as_deref() != Some(wanted.as_str())
            {
                return false;
            }
        }

        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let found = [fields::TITLE, fields::AREA_DESCRIPTION, fields::DISTRICT]
                .into_iter()
                .filter_map(|field| offer.text(field))
                .any(|value| value.to_lowercase().contains(&needle));
            if !found {
                return false;
            }
        }

        if self.closing_from.is_some() || self.closing_to.is_some() {
            let Some(closing) = offer.closing_date() else {
                return false;
            };
            if self.closing_from.is_some_and(|from| closing < from)
                || self.closing_to.is_some_and(|to| closing > to)
            {
                return false;
            }
        }

        true
    }

    /// The offers that match, in their original order.
    #[must_use]
    pub fn apply<'a>(&self, offers: &'a [Offer]) -> Vec<&'a Offer> {
        offers.iter().filter(|o| self.matches(o)).collect()
    }
}
