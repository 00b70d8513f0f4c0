//! Lightweight in-memory address space.
//!
//! [`SimulatedAddressSpace`] backs tests and demos without a real server:
//! nodes hold a settable value, capabilities for filter validation, and a
//! failure toggle to exercise bad-status sampling.

use crate::source::{AddressSpace, NodeId, TargetCapabilities, TargetRef};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};
use uamon_core::{DataValue, EngineeringRange, Sample, StatusCode, Variant};

/// One simulated node.
#[derive(Debug, Clone)]
pub struct SimulatedNode {
    pub value: Variant,
    pub status: StatusCode,
    /// Supports numeric deadband filters.
    pub numeric: bool,
    pub eu_range: Option<EngineeringRange>,
    pub minimum_sampling_interval: Duration,
    /// Requires active polling; false for push-style nodes.
    pub polled: bool,
    /// When set, reads fail with an internal error.
    pub failing: bool,
}

impl SimulatedNode {
    /// A numeric, polled node with no range and no minimum interval.
    pub fn analog(value: Variant) -> Self {
        Self {
            value,
            status: StatusCode::GOOD,
            numeric: true,
            eu_range: None,
            minimum_sampling_interval: Duration::ZERO,
            polled: true,
            failing: false,
        }
    }

    /// A non-numeric, polled text node.
    pub fn text(value: &str) -> Self {
        Self {
            value: Variant::Text(value.to_string()),
            status: StatusCode::GOOD,
            numeric: false,
            eu_range: None,
            minimum_sampling_interval: Duration::ZERO,
            polled: true,
            failing: false,
        }
    }
}

/// An in-memory [`AddressSpace`].
#[derive(Debug, Default)]
pub struct SimulatedAddressSpace {
    nodes: RwLock<HashMap<NodeId, SimulatedNode>>,
}

impl SimulatedAddressSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&self, id: NodeId, node: SimulatedNode) {
        write_lock(&self.nodes).insert(id, node);
    }

    /// Updates a node's value in place. Returns false for unknown nodes.
    pub fn set_value(&self, id: NodeId, value: Variant) -> bool {
        match write_lock(&self.nodes).get_mut(&id) {
            Some(node) => {
                node.value = value;
                true
            }
            None => false,
        }
    }

    /// Toggles read failures for a node.
    pub fn set_failing(&self, id: NodeId, failing: bool) -> bool {
        match write_lock(&self.nodes).get_mut(&id) {
            Some(node) => {
                node.failing = failing;
                true
            }
            None => false,
        }
    }

    /// A good sample of `value` stamped with the current time, as a push
    /// source would deliver it.
    pub fn sample_of(value: Variant) -> Sample {
        let now = SystemTime::now();
        Sample::new(
            DataValue::new(value)
                .with_source_timestamp(now)
                .with_server_timestamp(now),
        )
    }
}

impl AddressSpace for SimulatedAddressSpace {
    fn read_current_value(&self, target: &TargetRef) -> Sample {
        let nodes = read_lock(&self.nodes);
        match nodes.get(&target.node) {
            Some(node) if node.failing => Sample::from_error(StatusCode::BAD_INTERNAL_ERROR),
            Some(node) => {
                let now = SystemTime::now();
                Sample::new(
                    DataValue::new(node.value.clone())
                        .with_status(node.status)
                        .with_source_timestamp(now)
                        .with_server_timestamp(now),
                )
            }
            None => Sample::from_error(StatusCode::BAD_NODE_ID_UNKNOWN),
        }
    }

    fn requires_active_polling(&self, target: &TargetRef) -> bool {
        read_lock(&self.nodes)
            .get(&target.node)
            .map_or(true, |node| node.polled)
    }

    fn target_capabilities(&self, target: &TargetRef) -> Option<TargetCapabilities> {
        read_lock(&self.nodes)
            .get(&target.node)
            .map(|node| TargetCapabilities {
                numeric: node.numeric,
                eu_range: node.eu_range,
                minimum_sampling_interval: node.minimum_sampling_interval,
            })
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::{SimulatedAddressSpace, SimulatedNode};
    use crate::source::{AddressSpace, NodeId, TargetRef};
    use uamon_core::{StatusCode, Variant};

    #[test]
    fn reads_and_failures() {
        let space = SimulatedAddressSpace::new();
        let id = NodeId::new(0, 1);
        space.add_node(id, SimulatedNode::analog(Variant::Float(1.5)));
        let target = TargetRef::value_of(id);

        let sample = space.read_current_value(&target);
        assert_eq!(sample.value.value, Variant::Float(1.5));
        assert!(sample.value.source_timestamp.is_some());

        assert!(space.set_failing(id, true));
        let sample = space.read_current_value(&target);
        assert_eq!(sample.effective_status(), StatusCode::BAD_INTERNAL_ERROR);

        let unknown = TargetRef::value_of(NodeId::new(9, 9));
        let sample = space.read_current_value(&unknown);
        assert_eq!(sample.effective_status(), StatusCode::BAD_NODE_ID_UNKNOWN);
        assert!(space.target_capabilities(&unknown).is_none());
    }

    #[test]
    fn set_value_updates_reads() {
        let space = SimulatedAddressSpace::new();
        let id = NodeId::new(0, 2);
        space.add_node(id, SimulatedNode::analog(Variant::Float(0.0)));
        assert!(space.set_value(id, Variant::Float(9.0)));
        let sample = space.read_current_value(&TargetRef::value_of(id));
        assert_eq!(sample.value.value, Variant::Float(9.0));
        assert!(!space.set_value(NodeId::new(9, 9), Variant::Null));
    }
}
