//! Core building blocks for the uamon value-change monitoring engine.
//!
//! `uamon-core` provides the pure, I/O-free pieces of the engine: status
//! codes, variant values with timestamps, engineering ranges, the
//! data-change (deadband) filter, and the bounded per-item sample queue.
//! It has no async runtime dependency and can be used standalone to
//! evaluate change significance or model notification queues.
//!
//! # Feature flags
//!
//! - **`serde`** — derives `Serialize`/`Deserialize` on configuration and
//!   value types.

/// Data-change significance evaluation and deadband filter configuration.
pub mod filter;
/// Bounded per-item sample queues with configurable overflow policy.
pub mod queue;
/// Engineering-unit ranges used by percent deadband.
pub mod range;
/// Status codes with severity classes and change-notification info bits.
pub mod status;
/// Variant values, timestamped data values, and samples.
pub mod value;

pub use filter::{value_changed, DataChangeFilter, DeadbandKind, FilterError};
pub use queue::{DiscardPolicy, SampleQueue};
pub use range::EngineeringRange;
pub use status::StatusCode;
pub use value::{DataValue, Sample, Variant};
