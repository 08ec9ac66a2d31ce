#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reporting over validated and raw offers.
//!
//! * [`summary`]: match-rate summary and frequency tables of unmatched
//!   offers.
//! * [`report`]: the validation report (JSON plus a CSV twin) and its
//!   loader.
//! * [`suggest`]: catalog entries proposed from unmatched offers.
//! * [`stats`]: descriptive statistics of an offers file.
//! * [`export`]: flat CSV export of offers.

pub mod export;
pub mod report;
pub mod stats;
pub mod suggest;
pub mod summary;

use apd_files::FileError;

/// UTF-8 byte order mark written at the start of every CSV so spreadsheet
/// tools detect the encoding.
pub const CSV_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Errors that can occur while writing or reading reports.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Reading or writing a JSON artifact failed.
    #[error(transparent)]
    File(#[from] FileError),

    /// Encoding a CSV record failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Flushing CSV output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Encodes `records` as CSV (header first) prefixed with [`CSV_BOM`].
pub(crate) fn csv_bytes<I, R>(header: &[&str], records: I) -> Result<Vec<u8>, ReportError>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut writer = csv::Writer::from_writer(CSV_BOM.to_vec());
    writer.write_record(header)?;
    for record in records {
        writer.write_record(record)?;
    }
    writer.into_inner().map_err(|e| ReportError::Io(e.into_error()))
}
