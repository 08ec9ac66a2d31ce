//! Runtime settings.
//!
//! Resolution order, later wins: built-in defaults, the TOML config file,
//! `.env`, process environment, and finally CLI flags (applied by the
//! binary).
//!
//! ```toml
//! [api]
//! endpoint = "https://.../select"
//! page_size = 100
//! delay_ms = 500
//!
//! [files]
//! catalog = "cargos_ejemplo.json"
//! ```

use std::path::{Path, PathBuf};

use apd_scraper::ScrapeConfig;
use serde::{Deserialize, Serialize};

use crate::PipelineError;

/// Config file read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "apd.toml";

/// Environment variables holding the search endpoint, in priority order.
pub const ENDPOINT_VARS: [&str; 2] = ["APD_END_POINT", "END_POINT"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub files: FileSettings,
}

/// Search API connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub endpoint: Option<String>,
    pub page_size: u32,
    pub delay_ms: u64,
    pub timeout_secs: u64,
    pub sort: String,
    pub charset: String,
    pub accept_invalid_certs: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            page_size: apd_scraper::DEFAULT_PAGE_SIZE,
            delay_ms: apd_scraper::DEFAULT_DELAY_MS,
            timeout_secs: apd_scraper::DEFAULT_TIMEOUT_SECS,
            sort: apd_scraper::DEFAULT_SORT.to_owned(),
            charset: apd_scraper::DEFAULT_CHARSET.to_owned(),
            accept_invalid_certs: true,
        }
    }
}

/// Default artifact paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub catalog: PathBuf,
    pub offers: PathBuf,
    pub enriched: PathBuf,
    pub report: PathBuf,
    pub suggestions: PathBuf,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from("cargos_ejemplo.json"),
            offers: PathBuf::from("ofertas_muestra.json"),
            enriched: PathBuf::from("ofertas_enriquecidas.json"),
            report: PathBuf::from("reporte_validacion_cargos.json"),
            suggestions: PathBuf::from("cargos_sugeridos.json"),
        }
    }
}

impl Settings {
    /// Parses a TOML document. Missing tables and keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the document is invalid.
    pub fn from_toml_str(text: &str) -> Result<Self, PipelineError> {
        toml::from_str(text).map_err(|e| PipelineError::Config(format!("invalid config: {e}")))
    }

    /// Loads settings from `config_path` (which must exist when given) or
    /// from [`DEFAULT_CONFIG_FILE`] when present, then applies `.env` and
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the file cannot be read or
    /// parsed, or an environment override is not a number.
    pub fn load(config_path: Option<&Path>) -> Result<Self, PipelineError> {
        let path = config_path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);

        let mut settings = match std::fs::read_to_string(&path) {
            Ok(text) => {
                log::debug!("Reading settings from {}", path.display());
                Self::from_toml_str(&text)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && config_path.is_none() => {
                Self::default()
            }
            Err(e) => {
                return Err(PipelineError::Config(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };

        if let Err(e) = dotenvy::dotenv()
            && !e.not_found()
        {
            log::warn!("Ignoring unreadable .env file: {e}");
        }

        settings.apply_env(|name| std::env::var(name).ok())?;
        Ok(settings)
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if a numeric variable does not
    /// parse.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), PipelineError> {
        if let Some(endpoint) = ENDPOINT_VARS
            .iter()
            .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
        {
            self.api.endpoint = Some(endpoint.trim().to_owned());
        }
        if let Some(size) = lookup("APD_PAGE_SIZE") {
            self.api.page_size = parse_var("APD_PAGE_SIZE", &size)?;
        }
        if let Some(delay) = lookup("APD_DELAY_MS") {
            self.api.delay_ms = parse_var("APD_DELAY_MS", &delay)?;
        }
        Ok(())
    }

    /// The scraper configuration for these settings.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if no endpoint is configured.
    pub fn scrape_config(&self) -> Result<ScrapeConfig, PipelineError> {
        let endpoint = self.api.endpoint.as_deref().ok_or_else(|| {
            PipelineError::Config(
                "no search endpoint configured: set END_POINT in .env or [api] endpoint in apd.toml"
                    .to_owned(),
            )
        })?;
        Ok(ScrapeConfig::new(endpoint)
            .with_page_size(self.api.page_size)
            .with_delay_ms(self.api.delay_ms)
            .with_timeout_secs(self.api.timeout_secs)
            .with_sort(&self.api.sort)
            .with_charset(&self.api.charset)
            .with_accept_invalid_certs(self.api.accept_invalid_certs))
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, PipelineError> {
    value
        .trim()
        .parse()
        .map_err(|_| PipelineError::Config(format!("{name} must be a number, got '{value}'")))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.api.page_size, 100);
        assert_eq!(settings.api.delay_ms, 500);
        assert_eq!(settings.api.timeout_secs, 30);
        assert_eq!(settings.api.sort, "finoferta desc");
        assert_eq!(settings.files.catalog, PathBuf::from("cargos_ejemplo.json"));
        assert!(settings.api.endpoint.is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            [api]
            endpoint = "https://example.test/select"
            page_size = 50

            [files]
            report = "out/reporte.json"
            "#,
        )
        .unwrap();
        assert_eq!(settings.api.endpoint.as_deref(), Some("https://example.test/select"));
        assert_eq!(settings.api.page_size, 50);
        assert_eq!(settings.api.delay_ms, 500);
        assert_eq!(settings.files.report, PathBuf::from("out/reporte.json"));
        assert_eq!(settings.files.offers, PathBuf::from("ofertas_muestra.json"));
    }

    #[test]
    fn invalid_toml_is_config_error() {
        assert!(matches!(
            Settings::from_toml_str("[api]\npage_size = \"many\""),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[
                ("END_POINT", "https://legacy.test"),
                ("APD_END_POINT", "https://new.test"),
                ("APD_PAGE_SIZE", "25"),
            ]))
            .unwrap();
        assert_eq!(settings.api.endpoint.as_deref(), Some("https://new.test"));
        assert_eq!(settings.api.page_size, 25);

        let mut settings = Settings::default();
        settings.apply_env(env(&[("END_POINT", "https://legacy.test")])).unwrap();
        assert_eq!(settings.api.endpoint.as_deref(), Some("https://legacy.test"));
    }

    #[test]
    fn non_numeric_override_is_rejected() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.apply_env(env(&[("APD_DELAY_MS", "soon")])),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn scrape_config_requires_endpoint() {
        let mut settings = Settings::default();
        assert!(matches!(settings.scrape_config(), Err(PipelineError::Config(_))));

        settings.api.endpoint = Some("https://example.test/select".to_owned());
        settings.api.delay_ms = 0;
        let config = settings.scrape_config().unwrap();
        assert_eq!(config.endpoint, "https://example.test/select");
        assert_eq!(config.delay_ms, 0);
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let missing = std::env::temp_dir().join("apd_pipeline_missing_config.toml");
        let _ = std::fs::remove_file(&missing);
        assert!(matches!(
            Settings::load(Some(&missing)),
            Err(PipelineError::Config(_))
        ));
    }
}
