#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The reference catalog of known teaching positions.
//!
//! A [`Catalog`] is loaded once per run from either catalog file shape (see
//! [`CatalogFile`]) and is read-only afterwards. Every lookup is a linear,
//! case-insensitive scan that returns the first entry in load order, so
//! duplicate codes or areas resolve deterministically.
//!
//! [`html_import`] converts the official HTML category table into a grouped
//! catalog file.

pub mod html_import;

use std::collections::BTreeSet;
use std::path::Path;

use apd_catalog_models::{CatalogFile, Category};
use apd_files::FileError;

/// Errors that can occur while loading or saving a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The catalog file does not exist.
    #[error("Catalog file not found: {path}")]
    NotFound {
        /// The missing path.
        path: String,
    },

    /// The file is not valid JSON or its root has an unrecognised shape.
    #[error("Invalid catalog format in {path}: {message}")]
    Format {
        /// The offending file.
        path: String,
        /// What was wrong with it.
        message: String,
    },

    /// Reading or writing a file failed.
    #[error(transparent)]
    File(#[from] FileError),

    /// The HTML importer could not parse its input.
    #[error("HTML import error: {0}")]
    Html(String),
}

/// An ordered, immutable collection of [`Category`] entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    categories: Vec<Category>,
}

impl Catalog {
    /// Builds a catalog from an already-ordered list.
    #[must_use]
    pub const fn from_categories(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// Loads a catalog file in either the flat or the grouped shape.
    ///
    /// # Errors
    ///
    /// * [`CatalogError::NotFound`] if `path` does not exist.
    /// * [`CatalogError::Format`] if the file is not JSON or its root is
    ///   neither an array of categories nor an object with category groups.
    /// * [`CatalogError::File`] for any other I/O failure.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CatalogError::NotFound {
                    path: path.display().to_string(),
                });
            }
            Err(e) => {
                return Err(FileError::Io {
                    path: path.display().to_string(),
                    source: e,
                }
                .into());
            }
        };

        let catalog = Self::parse(&text).map_err(|message| CatalogError::Format {
            path: path.display().to_string(),
            message,
        })?;

        log::info!(
            "Loaded {} categories from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Like [`load`](Self::load), but a missing file yields an empty
    /// catalog.
    ///
    /// # Errors
    ///
    /// Returns every [`load`](Self::load) error except
    /// [`CatalogError::NotFound`].
    pub fn load_or_empty(path: &Path) -> Result<Self, CatalogError> {
        match Self::load(path) {
            Err(CatalogError::NotFound { path }) => {
                log::warn!("Catalog {path} not found, continuing with an empty catalog");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Parses catalog JSON text, returning a human-readable message on
    /// failure.
    fn parse(text: &str) -> Result<Self, String> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| format!("not valid JSON: {e}"))?;

        let file: CatalogFile = serde_json::from_value(value).map_err(|e| e.to_string())?;

        Ok(Self::from_categories(file.into_categories()))
    }

    /// Writes the whole catalog as a flat JSON array.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::File`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        apd_files::write_json_pretty(path, &self.categories)?;
        log::info!(
            "Saved {} categories to {}",
            self.categories.len(),
            path.display()
        );
        Ok(())
    }

    /// Number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether the catalog has no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Iterates entries in load order.
    pub fn iter(&self) -> std::slice::Iter<'_, Category> {
        self.categories.iter()
    }

    /// All entries in load order.
    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// First entry whose area equals `text`, ignoring case only.
    #[must_use]
    pub fn find_by_exact_area(&self, text: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.has_area(text))
    }

    /// First entry whose code equals `code`, ignoring case.
    #[must_use]
    pub fn find_by_code(&self, code: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.is_code(code))
    }

    /// Every entry in `group`, ignoring case, in load order.
    #[must_use]
    pub fn find_by_group(&self, group: &str) -> Vec<&Category> {
        self.categories.iter().filter(|c| c.is_group(group)).collect()
    }

    /// Every entry whose area, code, or group contains `keyword`, ignoring
    /// case.
    #[must_use]
    pub fn search(&self, keyword: &str) -> Vec<&Category> {
        let keyword = keyword.to_lowercase();
        self.categories
            .iter()
            .filter(|c| {
                c.area.to_lowercase().contains(&keyword)
                    || c.code.to_lowercase().contains(&keyword)
                    || c.group.to_lowercase().contains(&keyword)
            })
            .collect()
    }

    /// A new catalog holding only the entries of `group`.
    #[must_use]
    pub fn filter_group(&self, group: &str) -> Self {
        Self::from_categories(self.find_by_group(group).into_iter().cloned().collect())
    }

    /// Distinct groups, sorted.
    #[must_use]
    pub fn groups(&self) -> Vec<&str> {
        self.categories
            .iter()
            .map(|c| c.group.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// All codes, sorted (duplicates kept).
    #[must_use]
    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.categories.iter().map(|c| c.code.as_str()).collect();
        codes.sort_unstable();
        codes
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Category;
    type IntoIter = std::slice::Iter<'a, Category>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use apd_catalog_models::CategoryKind;

    use super::*;

    fn scratch_file(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("apd_catalog_tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn sample() -> Catalog {
        Catalog::from_categories(vec![
            Category::new("PRIMARIA", "A1", "Maestro de Grado"),
            Category::new("SECUNDARIA", "MS", "Matemática"),
            Category::new("ARTISTICA", "DZ", "Danza").with_weight(0.5),
            Category::new("primaria", "a1", "Duplicado"),
        ])
    }

    #[test]
    fn loads_flat_file_and_finds_by_code() {
        let path = scratch_file(
            "flat.json",
            r#"[{"modalidad":"PRIMARIA","codigo":"A1","area":"Maestro de Grado","valor":1.0}]"#,
        );
        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.find_by_code("a1").unwrap().area, "Maestro de Grado");
        assert!(catalog.find_by_code("Z9").is_none());
    }

    #[test]
    fn loads_grouped_file_in_group_order() {
        let path = scratch_file(
            "grouped.json",
            r#"{
                "metadata": {"total_habilitantes": 1, "total_bonificantes": 1},
                "habilitantes": [{"modalidad":"ARTISTICA","codigo":"DZ","area":"Danza","valor":2.0}],
                "bonificantes": [{"modalidad":"ARTISTICA","codigo":"EF","area":"Expresión Corporal"}]
            }"#,
        );
        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.categories()[0].kind, Some(CategoryKind::Qualifying));
        let bonus = catalog.find_by_code("ef").unwrap();
        assert_eq!(bonus.kind, Some(CategoryKind::Bonus));
        assert!((bonus.weight - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn object_without_groups_is_empty_catalog() {
        let path = scratch_file("no_groups.json", r#"{"metadata": {}}"#);
        assert!(Catalog::load(&path).unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_not_found() {
        let path = std::env::temp_dir().join("apd_catalog_tests_missing.json");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            Catalog::load(&path),
            Err(CatalogError::NotFound { .. })
        ));
        assert!(Catalog::load_or_empty(&path).unwrap().is_empty());
    }

    #[test]
    fn scalar_root_is_format_error() {
        let path = scratch_file("scalar.json", r#""cargos""#);
        assert!(matches!(
            Catalog::load(&path),
            Err(CatalogError::Format { .. })
        ));
    }

    #[test]
    fn malformed_group_is_format_error() {
        let path = scratch_file("bad_group.json", r#"{"habilitantes": "nope"}"#);
        assert!(matches!(
            Catalog::load(&path),
            Err(CatalogError::Format { .. })
        ));
    }

    #[test]
    fn flat_file_with_bad_entry_is_format_error() {
        for (name, content) in [
            (
                "missing_code.json",
                r#"[{"modalidad":"PRIMARIA","area":"Maestro de Grado"}]"#,
            ),
            (
                "string_weight.json",
                r#"[{"modalidad":"PRIMARIA","codigo":"A1","area":"Maestro de Grado","valor":"alto"}]"#,
            ),
            ("two_bad.json", r#"[{"x":1}, null]"#),
        ] {
            let path = scratch_file(name, content);
            assert!(
                matches!(Catalog::load(&path), Err(CatalogError::Format { .. })),
                "{name} should not load"
            );
        }
    }

    #[test]
    fn empty_flat_file_is_empty_catalog() {
        let path = scratch_file("empty_flat.json", "[]");
        assert!(Catalog::load(&path).unwrap().is_empty());
    }

    #[test]
    fn lookups_return_first_match() {
        let catalog = sample();
        assert_eq!(catalog.find_by_code("A1").unwrap().area, "Maestro de Grado");
        assert_eq!(
            catalog.find_by_exact_area("maestro de grado").unwrap().code,
            "A1"
        );
        assert!(catalog.find_by_exact_area("Maestro de Grado ").is_none());
    }

    #[test]
    fn group_lookup_is_case_insensitive_and_ordered() {
        let catalog = sample();
        let primaria = catalog.find_by_group("Primaria");
        assert_eq!(primaria.len(), 2);
        assert_eq!(primaria[0].area, "Maestro de Grado");
        assert_eq!(primaria[1].area, "Duplicado");
        assert_eq!(catalog.filter_group("PRIMARIA").len(), 2);
    }

    #[test]
    fn search_covers_area_code_and_group() {
        let catalog = sample();
        assert_eq!(catalog.search("danza").len(), 1);
        assert_eq!(catalog.search("ms").len(), 1);
        assert_eq!(catalog.search("artis").len(), 1);
        assert!(catalog.search("química").is_empty());
    }

    #[test]
    fn groups_and_codes_are_sorted() {
        let catalog = sample();
        assert_eq!(
            catalog.groups(),
            vec!["ARTISTICA", "PRIMARIA", "SECUNDARIA", "primaria"]
        );
        assert_eq!(catalog.codes(), vec!["A1", "DZ", "MS", "a1"]);
    }

    #[test]
    fn save_writes_flat_array_that_reloads() {
        let catalog = sample();
        let path = std::env::temp_dir()
            .join("apd_catalog_tests")
            .join("saved.json");
        catalog.save(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(value.is_array());

        let reloaded = Catalog::load(&path).unwrap();
        assert_eq!(reloaded, catalog);
    }
}
