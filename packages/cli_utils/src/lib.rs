#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Progress bars and logger setup for the `apd` binary.

use std::sync::Arc;
use std::time::Duration;

use apd_scraper::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;

pub use indicatif::MultiProgress;

const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {msg} ({pos} offers, {elapsed})";
const RECORDS_TEMPLATE: &str = "{msg:30} [{wide_bar:.cyan/blue}] {pos}/{len} offers ({eta})";
const STEPS_TEMPLATE: &str =
    "{msg:20} [{wide_bar:.green/white}] {pos}/{len} codes ({elapsed_precise})";

/// Builds a bar style, falling back to the plain bar on a bad template.
fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// A [`ProgressBar`] attached to the shared [`MultiProgress`], reporting
/// extraction progress.
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Applied when the total becomes known.
    length_style: ProgressStyle,
}

impl IndicatifProgress {
    fn attach(
        multi: &MultiProgress,
        bar: ProgressBar,
        message: &str,
        length_style: ProgressStyle,
    ) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(bar);
        bar.set_message(message.to_owned());
        Arc::new(Self { bar, length_style })
    }

    /// Progress of a single extraction run. Spins until the first page
    /// reports how many offers match.
    #[must_use]
    pub fn records_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let spinner = ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(120));
        Self::attach(multi, spinner, message, bar_style(RECORDS_TEMPLATE))
    }

    /// Progress over the catalog codes of a per-category extraction.
    #[must_use]
    pub fn steps_bar(
        multi: &MultiProgress,
        message: &str,
        total: u64,
    ) -> Arc<dyn ProgressCallback> {
        let style = bar_style(STEPS_TEMPLATE);
        let bar = ProgressBar::new(total).with_style(style.clone());
        Self::attach(multi, bar, message, style)
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_style(self.length_style.clone());
        self.bar.set_length(total);
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Installs `pretty_env_logger` behind `indicatif-log-bridge` and returns
/// the [`MultiProgress`] every bar must be added to, so log lines print
/// above the bars instead of through them.
///
/// The level is `info` unless `RUST_LOG` overrides it. Calling this twice
/// keeps the first logger.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    let logger = builder.build();
    let max_level = logger.filter();

    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(max_level);
    }

    multi
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_bar_switches_to_known_length() {
        let multi = MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden());
        let progress = IndicatifProgress::records_bar(&multi, "Extracting");
        progress.set_total(10);
        progress.inc(3);
        progress.finish("done".to_owned());
    }

    #[test]
    fn steps_bar_counts_codes() {
        let multi = MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden());
        let progress = IndicatifProgress::steps_bar(&multi, "Codes", 2);
        progress.set_message("A1".to_owned());
        progress.inc(1);
        progress.inc(1);
        progress.finish("2/2".to_owned());
    }

    #[test]
    fn second_init_keeps_first_logger() {
        let _first = init_logger();
        let _second = init_logger();
        assert!(log::max_level() >= LevelFilter::Error);
    }
}
