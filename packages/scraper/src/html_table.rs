//! HTML table parser.
//!
//! Locates `<table>` elements in an HTML document via CSS selector and
//! extracts every row as a list of trimmed cell texts. Unlike an API page,
//! the document is parsed from a string the caller already has (a saved
//! page or an embedded fixture).

use scraper::{ElementRef, Html, Selector};

use crate::ScrapeError;

/// Rows of cell texts for one table, in document order.
pub type TableRows = Vec<Vec<String>>;

/// Selector configuration for extracting tables.
///
/// The defaults pick up every `<table>`, every `<tr>` inside it, and every
/// `<td>` inside a row. Header cells (`<th>`) are therefore skipped unless
/// the cell selector is overridden.
#[derive(Debug, Clone)]
pub struct HtmlTable {
    /// CSS selector for the target table elements.
    table_selector: String,
    /// CSS selector for rows inside a table.
    row_selector: String,
    /// CSS selector for cells within a row.
    cell_selector: String,
    /// Keep only tables whose `style` attribute contains this text.
    style_contains: Option<String>,
}

impl Default for HtmlTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlTable {
    /// Creates a parser with default selectors and no style filter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table_selector: "table".to_owned(),
            row_selector: "tr".to_owned(),
            cell_selector: "td".to_owned(),
            style_contains: None,
        }
    }

    /// Overrides the CSS selector used to locate table elements.
    #[must_use]
    pub fn with_table_selector(mut self, selector: &str) -> Self {
        selector.clone_into(&mut self.table_selector);
        self
    }

    /// Overrides the CSS selector used to locate rows.
    #[must_use]
    pub fn with_row_selector(mut self, selector: &str) -> Self {
        selector.clone_into(&mut self.row_selector);
        self
    }

    /// Overrides the CSS selector used to locate cells within a row.
    #[must_use]
    pub fn with_cell_selector(mut self, selector: &str) -> Self {
        selector.clone_into(&mut self.cell_selector);
        self
    }

    /// Keeps only tables whose inline `style` contains `needle`. Matching
    /// ignores ASCII case.
    #[must_use]
    pub fn with_style_containing(mut self, needle: &str) -> Self {
        self.style_contains = Some(needle.to_ascii_lowercase());
        self
    }

    /// Parses a CSS selector string, returning a [`ScrapeError`] on failure.
    fn parse_selector(selector: &str) -> Result<Selector, ScrapeError> {
        Selector::parse(selector)
            .map_err(|e| ScrapeError::Format(format!("invalid CSS selector '{selector}': {e}")))
    }

    fn style_matches(&self, table: &ElementRef<'_>) -> bool {
        self.style_contains.as_ref().is_none_or(|needle| {
            table
                .value()
                .attr("style")
                .is_some_and(|style| style.to_ascii_lowercase().contains(needle.as_str()))
        })
    }

    /// Extracts every matching table.
    ///
    /// Rows without any matching cell are dropped. Nested tables are not
    /// treated specially: their rows also appear under the outer table.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Format`] if a configured selector is invalid.
    pub fn parse(&self, html: &str) -> Result<Vec<TableRows>, ScrapeError> {
        let document = Html::parse_document(html);

        let table_sel = Self::parse_selector(&self.table_selector)?;
        let row_sel = Self::parse_selector(&self.row_selector)?;
        let cell_sel = Self::parse_selector(&self.cell_selector)?;

        let tables = document
            .select(&table_sel)
            .filter(|table| self.style_matches(table))
            .map(|table| {
                table
                    .select(&row_sel)
                    .map(|row| {
                        row.select(&cell_sel)
                            .map(|el| el.text().collect::<Vec<_>>().join("").trim().to_owned())
                            .collect::<Vec<_>>()
                    })
                    .filter(|cells| !cells.is_empty())
                    .collect::<TableRows>()
            })
            .collect::<Vec<_>>();

        log::debug!("Parsed {} matching tables", tables.len());
        Ok(tables)
    }
}
