//! Value-change monitoring and sampling engine.
//!
//! `uamon-engine` turns a live, possibly slowly-polled data source into a
//! stream of filtered, queued, and deliverable change notifications. Each
//! monitored item carries its own sampling interval, deadband filter,
//! queue depth, and overflow policy; one shared background scheduler
//! drives all actively polled items, and the outer protocol layer drains
//! ready items on its own cadence.
//!
//! The address space is an external collaborator reached through the
//! [`AddressSpace`] trait; push-based sources bypass the scheduler and
//! feed [`MonitorEngine::on_source_changed`] directly.
//!
//! # Feature flags
//!
//! - **`serde`** — derives `Serialize`/`Deserialize` on configuration and
//!   parameter types.

/// Engine error types.
pub mod error;
/// The per-item state machine.
pub mod item;
/// The owning manager: item registry and the external API.
pub mod manager;
/// Outbound notifications and timestamp-return policies.
pub mod notify;
/// The shared background sampling scheduler.
pub mod scheduler;
/// An in-memory address space for tests and demos.
pub mod simulator;
/// The address-space trait boundary.
pub mod source;

pub use error::EngineError;
pub use item::{MonitoredItem, MonitoringMode};
pub use manager::{CreateResult, EngineConfig, ModifyResult, MonitorEngine, MonitoredItemSpec};
pub use notify::{Notification, TimestampsToReturn};
pub use scheduler::{SamplingScheduler, SamplingSchedulerBuilder};
pub use simulator::{SimulatedAddressSpace, SimulatedNode};
pub use source::{AddressSpace, AttributeId, NodeId, TargetCapabilities, TargetRef};
