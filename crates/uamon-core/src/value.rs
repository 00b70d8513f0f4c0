//! Variant values and timestamped samples.
//!
//! [`Variant`] is the tagged union carried by every monitored attribute;
//! the change filter dispatches on the tag instead of inspecting runtime
//! types. [`DataValue`] adds a status code and source/server timestamps,
//! and [`Sample`] pairs a value with the out-of-band read error that may
//! accompany it.

use crate::status::StatusCode;
use std::time::SystemTime;

/// The value of a monitored attribute.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Variant {
    #[default]
    Null,
    Boolean(bool),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
    Opaque(Vec<u8>),
}

impl Variant {
    /// Numeric projection used by deadband evaluation.
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Variant::Boolean(v) => Some(u8::from(*v) as f64),
            Variant::Unsigned(v) => Some(*v as f64),
            Variant::Signed(v) => Some(*v as f64),
            Variant::Float(v) => Some(*v),
            Variant::Null | Variant::Text(_) | Variant::Opaque(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_numeric().is_some()
    }
}

/// A value together with its status and timestamps.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataValue {
    pub value: Variant,
    pub status: StatusCode,
    pub source_timestamp: Option<SystemTime>,
    pub server_timestamp: Option<SystemTime>,
}

impl DataValue {
    /// A good value with no timestamps.
    pub fn new(value: Variant) -> Self {
        Self {
            value,
            status: StatusCode::GOOD,
            source_timestamp: None,
            server_timestamp: None,
        }
    }

    /// A null value carrying only a status code.
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            value: Variant::Null,
            status,
            source_timestamp: None,
            server_timestamp: None,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_source_timestamp(mut self, ts: SystemTime) -> Self {
        self.source_timestamp = Some(ts);
        self
    }

    pub fn with_server_timestamp(mut self, ts: SystemTime) -> Self {
        self.server_timestamp = Some(ts);
        self
    }
}

/// A (value, error) pair as produced by a source read.
///
/// A failed read is data, not a fault: the error is captured alongside a
/// null value so the engine can report the transition like any other
/// change.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    pub value: DataValue,
    pub error: Option<StatusCode>,
}

impl Sample {
    pub fn new(value: DataValue) -> Self {
        Self { value, error: None }
    }

    /// A sample representing a failed source read.
    pub fn from_error(error: StatusCode) -> Self {
        Self {
            value: DataValue::from_status(error),
            error: Some(error),
        }
    }

    /// The status the consumer will observe: a non-good out-of-band error
    /// overrides the value's own status.
    pub fn effective_status(&self) -> StatusCode {
        match self.error {
            Some(error) if !error.is_good() => error,
            _ => self.value.status,
        }
    }
}
