//! Request validation and year-code resolution.
//!
//! Validation failures are terminal and local: a request that fails here
//! never reaches the backend.

use chrono::{Datelike, NaiveDate};

use crate::AnalysisError;
use crate::config::AnalysisConfig;

/// Integer offset from the configured base year, used both as a loss
/// pixel value and as a query-window bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearCode(pub u16);

impl YearCode {
    /// The code as an expression constant.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        f64::from(self.0)
    }
}

/// A validated loss window in both year-code and calendar-year form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedWindow {
    /// First year-code of the window (inclusive).
    pub begin: YearCode,
    /// Last year-code of the window (inclusive).
    pub end: YearCode,
    /// First calendar year, echoed back in results.
    pub begin_year: i32,
    /// Last calendar year, echoed back in results.
    pub end_year: i32,
}

impl ResolvedWindow {
    /// Iterates every `(code, calendar_year)` pair in the closed window.
    pub fn years(&self) -> impl Iterator<Item = (YearCode, i32)> + '_ {
        let offset = self.begin_year - i32::from(self.begin.0);
        (self.begin.0..=self.end.0).map(move |code| (YearCode(code), offset + i32::from(code)))
    }
}

/// Checks a canopy-cover threshold is within `[0, 100]`.
///
/// # Errors
///
/// Returns [`AnalysisError::Validation`] otherwise.
pub fn validate_threshold(threshold: u32) -> Result<(), AnalysisError> {
    if threshold > 100 {
        return Err(AnalysisError::Validation {
            message: format!("Threshold {threshold} is outside [0, 100]"),
        });
    }
    Ok(())
}

/// Resolves begin/end dates to year codes relative to the configured
/// base year.
///
/// # Errors
///
/// Returns [`AnalysisError::Validation`] if either year falls outside
/// `[base_year, data_end_year]` or the end year precedes the begin year.
pub fn resolve_window(
    config: &AnalysisConfig,
    begin: NaiveDate,
    end: NaiveDate,
) -> Result<ResolvedWindow, AnalysisError> {
    let begin_year = begin.year();
    let end_year = end.year();

    if end_year < begin_year {
        return Err(AnalysisError::Validation {
            message: format!("End year {end_year} precedes begin year {begin_year}"),
        });
    }

    let begin_code = year_code(config, begin_year)?;
    let end_code = year_code(config, end_year)?;

    Ok(ResolvedWindow {
        begin: begin_code,
        end: end_code,
        begin_year,
        end_year,
    })
}

fn year_code(config: &AnalysisConfig, year: i32) -> Result<YearCode, AnalysisError> {
    if year < config.base_year || year > config.data_end_year {
        return Err(AnalysisError::Validation {
            message: format!(
                "Year {year} is outside the data range [{}, {}]",
                config.base_year, config.data_end_year
            ),
        });
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(YearCode((year - config.base_year) as u16))
}
