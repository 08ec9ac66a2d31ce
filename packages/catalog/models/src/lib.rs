#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reference catalog types.
//!
//! A [`Category`] is one recognised teaching position ("cargo"): the level
//! or modality it belongs to, its area code, the descriptive area text that
//! offers are matched against, and a numeric weight. Catalog files come in
//! two shapes, captured by [`CatalogFile`].

use serde::{Deserialize, Deserializer, Serialize, de};
use strum_macros::{AsRefStr, Display, EnumString};

/// Default weight for a category whose file entry omits `valor`.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Placeholder code used for suggested categories whose source offer had
/// no area code.
pub const UNKNOWN_CODE: &str = "UNKNOWN";

/// Which group of a grouped catalog file a category came from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CategoryKind {
    /// Listed under `habilitantes`: the degree qualifies for the position.
    Qualifying,
    /// Listed under `bonificantes`: the degree adds bonus points.
    Bonus,
}

/// One entry of the reference catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Level or modality the position belongs to (e.g. `"PRIMARIA"`).
    #[serde(rename = "modalidad")]
    pub group: String,
    /// Area code (`areaincumbencia` in offers).
    #[serde(rename = "codigo")]
    pub code: String,
    /// Descriptive area text, matched against an offer's `cargo`.
    pub area: String,
    /// Score weight of the position.
    #[serde(rename = "valor", default = "default_weight")]
    pub weight: f64,
    /// Derived at load time from the group the entry was listed under.
    /// Never written to catalog files.
    #[serde(skip)]
    pub kind: Option<CategoryKind>,
}

const fn default_weight() -> f64 {
    DEFAULT_WEIGHT
}

impl Category {
    /// Creates a category with the default weight and no kind.
    #[must_use]
    pub fn new(group: &str, code: &str, area: &str) -> Self {
        Self {
            group: group.to_owned(),
            code: code.to_owned(),
            area: area.to_owned(),
            weight: DEFAULT_WEIGHT,
            kind: None,
        }
    }

    /// Sets the weight.
    #[must_use]
    pub const fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Sets the kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: CategoryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Case-insensitive exact comparison against the code.
    #[must_use]
    pub fn is_code(&self, code: &str) -> bool {
        self.code.to_lowercase() == code.to_lowercase()
    }

    /// Case-insensitive exact comparison against the group.
    #[must_use]
    pub fn is_group(&self, group: &str) -> bool {
        self.group.to_lowercase() == group.to_lowercase()
    }

    /// Case-insensitive exact comparison against the area text. No
    /// whitespace or accent normalisation is applied.
    #[must_use]
    pub fn has_area(&self, area: &str) -> bool {
        self.area.to_lowercase() == area.to_lowercase()
    }

    /// Case-insensitive substring test against the area text.
    #[must_use]
    pub fn area_contains(&self, word: &str) -> bool {
        self.area.to_lowercase().contains(&word.to_lowercase())
    }
}

/// The two on-disk shapes of a catalog file.
///
/// Resolved once when a catalog is loaded; nothing downstream inspects the
/// original shape again.
///
/// The root decides the shape: an array is always [`Flat`](Self::Flat) and
/// an object always [`Grouped`](Self::Grouped), so a bad entry in one shape
/// is reported as such instead of being read as the other.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CatalogFile {
    /// A bare JSON array of categories.
    Flat(Vec<Category>),
    /// An object with optional `habilitantes` and `bonificantes` groups.
    Grouped(GroupedCatalog),
}

/// The grouped catalog shape produced by the HTML importer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupedCatalog {
    /// Free-form metadata (counts, description).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Qualifying categories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub habilitantes: Option<Vec<Category>>,
    /// Bonus categories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonificantes: Option<Vec<Category>>,
}

impl<'de> Deserialize<'de> for CatalogFile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Array(_) => serde_json::from_value(value)
                .map(Self::Flat)
                .map_err(|e| de::Error::custom(format!("invalid category entry: {e}"))),
            serde_json::Value::Object(_) => serde_json::from_value(value)
                .map(Self::Grouped)
                .map_err(|e| de::Error::custom(format!("invalid category group: {e}"))),
            _ => Err(de::Error::custom("root must be an array or an object")),
        }
    }
}

impl CatalogFile {
    /// Flattens the file into one ordered list, tagging grouped entries with
    /// their [`CategoryKind`]. Qualifying entries come first.
    #[must_use]
    pub fn into_categories(self) -> Vec<Category> {
        match self {
            Self::Flat(categories) => categories,
            Self::Grouped(grouped) => {
                let qualifying = grouped
                    .habilitantes
                    .unwrap_or_default()
                    .into_iter()
                    .map(|c| c.with_kind(CategoryKind::Qualifying));
                let bonus = grouped
                    .bonificantes
                    .unwrap_or_default()
                    .into_iter()
                    .map(|c| c.with_kind(CategoryKind::Bonus));
                qualifying.chain(bonus).collect()
            }
        }
    }
}
