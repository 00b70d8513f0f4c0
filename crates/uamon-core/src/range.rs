/// An engineering-unit range for an analog source.
///
/// Percent deadband is expressed as a fraction of `high - low`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineeringRange {
    pub low: f64,
    pub high: f64,
}

impl EngineeringRange {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn span(&self) -> f64 {
        self.high - self.low
    }
}
