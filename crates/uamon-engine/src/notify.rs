//! Outbound notifications.

use uamon_core::DataValue;

/// Which timestamps survive into delivered notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimestampsToReturn {
    Source,
    Server,
    #[default]
    Both,
    Neither,
}

impl TimestampsToReturn {
    /// Strips the timestamps the policy does not request.
    pub(crate) fn apply(self, value: &mut DataValue) {
        if !matches!(self, TimestampsToReturn::Server | TimestampsToReturn::Both) {
            value.server_timestamp = None;
        }
        if !matches!(self, TimestampsToReturn::Source | TimestampsToReturn::Both) {
            value.source_timestamp = None;
        }
    }
}

/// One deliverable change notification.
///
/// The wire encoding is the outer layer's concern; the engine only echoes
/// the client handle and the stored value with its status and the
/// timestamps permitted by the item's policy.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Notification {
    pub client_handle: u32,
    pub value: DataValue,
}

#[cfg(test)]
mod tests {
    use super::TimestampsToReturn;
    use std::time::SystemTime;
    use uamon_core::{DataValue, Variant};

    fn stamped() -> DataValue {
        DataValue::new(Variant::Float(1.0))
            .with_source_timestamp(SystemTime::UNIX_EPOCH)
            .with_server_timestamp(SystemTime::now())
    }

    #[test]
    fn policies_strip_timestamps() {
        let mut value = stamped();
        TimestampsToReturn::Both.apply(&mut value);
        assert!(value.source_timestamp.is_some());
        assert!(value.server_timestamp.is_some());

        let mut value = stamped();
        TimestampsToReturn::Source.apply(&mut value);
        assert!(value.source_timestamp.is_some());
        assert!(value.server_timestamp.is_none());

        let mut value = stamped();
        TimestampsToReturn::Server.apply(&mut value);
        assert!(value.source_timestamp.is_none());
        assert!(value.server_timestamp.is_some());

        let mut value = stamped();
        TimestampsToReturn::Neither.apply(&mut value);
        assert!(value.source_timestamp.is_none());
        assert!(value.server_timestamp.is_none());
    }
}
