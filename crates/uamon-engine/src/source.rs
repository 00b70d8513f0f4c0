//! The boundary between the engine and the address space.
//!
//! The engine never owns the data it monitors: it borrows a description of
//! the target attribute and asks the address space for current values. A
//! failing read must come back as a bad-status [`Sample`], bounded by
//! whatever timeout the implementation chooses — it must not block a
//! scheduler tick indefinitely.

use std::time::Duration;
use uamon_core::{EngineeringRange, Sample};

/// Identifies a node in the address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId {
    pub namespace: u16,
    pub id: u32,
}

impl NodeId {
    pub const fn new(namespace: u16, id: u32) -> Self {
        Self { namespace, id }
    }
}

/// The attribute of a node being monitored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeId {
    DisplayName,
    Description,
    #[default]
    Value,
    DataType,
    AccessLevel,
}

/// A non-owning reference to one monitored attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetRef {
    pub node: NodeId,
    pub attribute: AttributeId,
    /// Optional (first, last) element selector for array values.
    pub index_range: Option<(u32, u32)>,
    /// Optional alternate data encoding name.
    pub encoding: Option<String>,
}

impl TargetRef {
    /// The value attribute of `node`, no sub-range, default encoding.
    pub fn value_of(node: NodeId) -> Self {
        Self {
            node,
            attribute: AttributeId::Value,
            index_range: None,
            encoding: None,
        }
    }
}

/// What the address space knows about a target, resolved at item
/// creation time for filter validation and interval revision.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetCapabilities {
    /// The underlying type supports numeric deadband evaluation.
    pub numeric: bool,
    /// Engineering range, required for percent deadband.
    pub eu_range: Option<EngineeringRange>,
    /// The fastest rate the source can be sampled; zero for push sources.
    pub minimum_sampling_interval: Duration,
}

/// The capabilities the engine needs from the address-space collaborator.
pub trait AddressSpace: Send + Sync {
    /// Reads the target's current value. Errors are returned as bad-status
    /// samples, never panics or indefinite blocking.
    fn read_current_value(&self, target: &TargetRef) -> Sample;

    /// Whether the target must be actively polled. Push-based sources
    /// return false and deliver changes through
    /// [`MonitorEngine::on_source_changed`](crate::MonitorEngine::on_source_changed).
    fn requires_active_polling(&self, target: &TargetRef) -> bool;

    /// Resolves the target's capabilities, or `None` when the target does
    /// not exist.
    fn target_capabilities(&self, target: &TargetRef) -> Option<TargetCapabilities>;
}
