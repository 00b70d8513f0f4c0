//! Change-significance evaluation.
//!
//! [`value_changed`] decides whether a candidate sample differs enough from
//! the previously delivered one to be queued. The filter configuration is
//! validated once, when an item is created or modified, never per sample.

use crate::range::EngineeringRange;
use crate::value::{Sample, Variant};
use thiserror::Error;

/// The kind of deadband applied before a numeric change is reportable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeadbandKind {
    /// Every value or status difference is significant.
    #[default]
    None,
    /// Significant when `|candidate - previous| > deadband_value`.
    Absolute,
    /// Significant when the change exceeds `deadband_value` percent of the
    /// source's engineering range.
    Percent,
}

/// Configuration rejected at create/modify time.
#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum FilterError {
    #[error("deadband value {0} is negative")]
    NegativeDeadband(f64),
    #[error("deadband filters require a numeric source")]
    NotNumeric,
    #[error("percent deadband requires an engineering range")]
    MissingRange,
}

/// A data-change filter for one monitored item.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataChangeFilter {
    pub deadband: DeadbandKind,
    pub deadband_value: f64,
}

impl DataChangeFilter {
    pub const fn none() -> Self {
        Self {
            deadband: DeadbandKind::None,
            deadband_value: 0.0,
        }
    }

    pub const fn absolute(deadband_value: f64) -> Self {
        Self {
            deadband: DeadbandKind::Absolute,
            deadband_value,
        }
    }

    pub const fn percent(deadband_value: f64) -> Self {
        Self {
            deadband: DeadbandKind::Percent,
            deadband_value,
        }
    }

    /// Validates the filter against the source's capabilities.
    ///
    /// Called once at configure time; a filter that passes here never
    /// fails during evaluation.
    pub fn validate(
        &self,
        numeric_source: bool,
        range: Option<&EngineeringRange>,
    ) -> Result<(), FilterError> {
        if self.deadband_value < 0.0 {
            return Err(FilterError::NegativeDeadband(self.deadband_value));
        }
        match self.deadband {
            DeadbandKind::None => Ok(()),
            DeadbandKind::Absolute => {
                if numeric_source {
                    Ok(())
                } else {
                    Err(FilterError::NotNumeric)
                }
            }
            DeadbandKind::Percent => {
                if !numeric_source {
                    Err(FilterError::NotNumeric)
                } else if range.is_none() {
                    Err(FilterError::MissingRange)
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Returns true when `candidate` is significant relative to `previous`.
///
/// `range_span` is the resolved `high - low` of the source's engineering
/// range, used only by percent deadband. A missing previous sample is
/// always significant (the initial report). A crossing between good and
/// non-good status is always significant regardless of the deadband.
pub fn value_changed(
    candidate: &Sample,
    previous: Option<&Sample>,
    filter: &DataChangeFilter,
    range_span: f64,
) -> bool {
    let Some(previous) = previous else {
        return true;
    };

    let candidate_status = candidate.effective_status();
    let previous_status = previous.effective_status();

    if !candidate_status.same_severity_class(previous_status) {
        return true;
    }

    match filter.deadband {
        DeadbandKind::None => {
            candidate.value.value != previous.value.value || candidate_status != previous_status
        }
        DeadbandKind::Absolute => exceeds_deadband(
            &previous.value.value,
            &candidate.value.value,
            filter.deadband_value,
        ),
        DeadbandKind::Percent => exceeds_deadband(
            &previous.value.value,
            &candidate.value.value,
            filter.deadband_value / 100.0 * range_span,
        ),
    }
}

/// Non-numeric values fall back to exact-equality semantics.
fn exceeds_deadband(previous: &Variant, candidate: &Variant, threshold: f64) -> bool {
    match (previous.as_numeric(), candidate.as_numeric()) {
        (Some(previous), Some(candidate)) => (candidate - previous).abs() > threshold,
        _ => previous != candidate,
    }
}
