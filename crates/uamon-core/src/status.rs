use core::fmt;

/// A 32-bit status code attached to every sample.
///
/// The severity lives in the top two bits: `10` is bad, `01` is uncertain,
/// `00` is good. Bits 14 and 15 carry the semantics-changed and
/// structure-changed info flags that a publish cycle can OR into the first
/// notification after a model change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusCode(pub u32);

impl StatusCode {
    pub const GOOD: StatusCode = StatusCode(0x0000_0000);
    pub const BAD_INTERNAL_ERROR: StatusCode = StatusCode(0x8002_0000);
    pub const BAD_TIMEOUT: StatusCode = StatusCode(0x800A_0000);
    pub const BAD_WAITING_FOR_INITIAL_DATA: StatusCode = StatusCode(0x8032_0000);
    pub const BAD_NODE_ID_UNKNOWN: StatusCode = StatusCode(0x8034_0000);
    pub const BAD_ATTRIBUTE_ID_INVALID: StatusCode = StatusCode(0x8035_0000);
    pub const BAD_NOT_READABLE: StatusCode = StatusCode(0x803A_0000);
    pub const BAD_OUT_OF_RANGE: StatusCode = StatusCode(0x803C_0000);

    const SEVERITY_MASK: u32 = 0xC000_0000;
    const SEVERITY_BAD: u32 = 0x8000_0000;
    const SEVERITY_UNCERTAIN: u32 = 0x4000_0000;
    const SEMANTICS_CHANGED: u32 = 0x0000_4000;
    const STRUCTURE_CHANGED: u32 = 0x0000_8000;

    /// Severity is good (neither bad nor uncertain).
    pub const fn is_good(self) -> bool {
        self.0 & Self::SEVERITY_MASK == 0
    }

    pub const fn is_bad(self) -> bool {
        self.0 & Self::SEVERITY_MASK == Self::SEVERITY_BAD
    }

    pub const fn is_uncertain(self) -> bool {
        self.0 & Self::SEVERITY_MASK == Self::SEVERITY_UNCERTAIN
    }

    /// Whether `self` and `other` fall in the same good/non-good class.
    ///
    /// Change filtering treats any crossing between good and non-good as
    /// significant regardless of the deadband.
    pub const fn same_severity_class(self, other: StatusCode) -> bool {
        self.is_good() == other.is_good()
    }

    /// Returns the code with the semantics-changed info bit set.
    pub const fn with_semantics_changed(self) -> StatusCode {
        StatusCode(self.0 | Self::SEMANTICS_CHANGED)
    }

    /// Returns the code with the structure-changed info bit set.
    pub const fn with_structure_changed(self) -> StatusCode {
        StatusCode(self.0 | Self::STRUCTURE_CHANGED)
    }

    pub const fn semantics_changed(self) -> bool {
        self.0 & Self::SEMANTICS_CHANGED != 0
    }

    pub const fn structure_changed(self) -> bool {
        self.0 & Self::STRUCTURE_CHANGED != 0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}
