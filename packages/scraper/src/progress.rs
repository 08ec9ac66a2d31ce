//! Progress reporting for extraction runs.
//!
//! [`ProgressCallback`] keeps the extractor free of any rendering backend.
//! The CLI plugs in `indicatif` bars; tests and library callers use
//! [`NullProgress`].

use std::sync::Arc;

/// Observer of an extraction run: offers pulled in a single run, or codes
/// searched in a per-category run.
pub trait ProgressCallback: Send + Sync {
    /// Number of offers (or codes) the run expects, once known.
    fn set_total(&self, total: u64);

    /// `delta` more offers (or codes) are done.
    fn inc(&self, delta: u64);

    /// Names the item in flight, e.g. the code being searched.
    fn set_message(&self, msg: String);

    /// The run ended; `msg` describes the outcome.
    fn finish(&self, msg: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// A [`NullProgress`] behind the trait object callers pass around.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
