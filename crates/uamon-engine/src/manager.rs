//! The owning manager.
//!
//! [`MonitorEngine`] holds the item registry and the list of items that
//! need active polling, and exposes the create/modify/mode/resend/delete/
//! drain API to the outer subscription layer. Registration lists are
//! guarded by one manager lock; each item guards its own mutable state, so
//! a slow drain of one item never blocks sampling of another.

use crate::error::EngineError;
use crate::item::{MonitoredItem, MonitoringMode};
use crate::notify::{Notification, TimestampsToReturn};
use crate::source::{AddressSpace, AttributeId, TargetRef};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use uamon_core::{DataChangeFilter, DeadbandKind, DiscardPolicy, Sample, StatusCode};

/// Engine-wide limits and the shared scheduler granularity.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// The floor and rounding unit for revised sampling intervals; also
    /// the tick granularity of the shared scheduler.
    pub min_sampling_interval: Duration,
    /// Upper bound applied to requested queue sizes.
    pub max_queue_size: u32,
    /// Upper bound on concurrently existing monitored items.
    pub max_monitored_items: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_sampling_interval: Duration::from_millis(100),
            max_queue_size: 1000,
            max_monitored_items: 10_000,
        }
    }
}

/// Parameters for creating a monitored item.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MonitoredItemSpec {
    /// Opaque client handle echoed in every notification.
    pub client_handle: u32,
    /// The subscription that consumes this item's notifications.
    pub owner: u32,
    pub mode: MonitoringMode,
    /// Zero means "as fast as the source changes".
    pub sampling_interval: Duration,
    pub queue_size: u32,
    pub discard_policy: DiscardPolicy,
    pub filter: DataChangeFilter,
    /// Bypass the filter entirely and report every update.
    pub always_report: bool,
    pub timestamps: TimestampsToReturn,
}

impl Default for MonitoredItemSpec {
    fn default() -> Self {
        Self {
            client_handle: 0,
            owner: 0,
            mode: MonitoringMode::Reporting,
            sampling_interval: Duration::from_secs(1),
            queue_size: 1,
            discard_policy: DiscardPolicy::DiscardOldest,
            filter: DataChangeFilter::none(),
            always_report: false,
            timestamps: TimestampsToReturn::Both,
        }
    }
}

/// The revised parameters returned from a create request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateResult {
    pub id: u32,
    pub revised_sampling_interval: Duration,
    pub revised_queue_size: u32,
}

/// The revised parameters returned from a modify request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModifyResult {
    pub revised_sampling_interval: Duration,
    pub revised_queue_size: u32,
}

struct Registry {
    items: HashMap<u32, Arc<Mutex<MonitoredItem>>>,
    /// Ids of enabled items whose targets require active polling.
    sampled: Vec<u32>,
}

/// The value-change monitoring engine.
pub struct MonitorEngine<A: AddressSpace> {
    address_space: Arc<A>,
    config: EngineConfig,
    registry: Mutex<Registry>,
    next_id: AtomicU32,
}

impl<A: AddressSpace> MonitorEngine<A> {
    pub fn new(address_space: Arc<A>, config: EngineConfig) -> Self {
        Self {
            address_space,
            config,
            registry: Mutex::new(Registry {
                items: HashMap::new(),
                sampled: Vec::new(),
            }),
            next_id: AtomicU32::new(0),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn item_count(&self) -> usize {
        lock(&self.registry).items.len()
    }

    /// Creates a monitored item for `target`, returning its id and the
    /// revised sampling interval and queue size.
    ///
    /// The filter is validated here, once; the initial value is read and
    /// queued with filters bypassed so the observer always receives a
    /// baseline; targets that require polling are registered with the
    /// shared scheduler.
    pub fn create_item(
        &self,
        target: TargetRef,
        spec: MonitoredItemSpec,
    ) -> Result<CreateResult, EngineError> {
        let caps = self
            .address_space
            .target_capabilities(&target)
            .ok_or(EngineError::UnknownTarget)?;

        if spec.filter.deadband != DeadbandKind::None && target.attribute != AttributeId::Value {
            return Err(EngineError::FilterUnsupported);
        }
        spec.filter.validate(caps.numeric, caps.eu_range.as_ref())?;
        let range_span = caps.eu_range.map_or(0.0, |range| range.span());

        let revised_interval =
            self.revise_interval(spec.sampling_interval, caps.minimum_sampling_interval);
        let revised_queue_size = spec.queue_size.clamp(1, self.config.max_queue_size);

        // A failed first read still seeds a baseline: the observer gets a
        // waiting-for-initial-data placeholder instead of the raw read
        // error, and the first successful poll replaces it.
        let initial = self.address_space.read_current_value(&target);
        let initial = if initial.effective_status().is_bad() {
            Sample::from_error(StatusCode::BAD_WAITING_FOR_INITIAL_DATA)
        } else {
            initial
        };
        let polls = self.address_space.requires_active_polling(&target);

        let mut registry = lock(&self.registry);
        if registry.items.len() >= self.config.max_monitored_items {
            return Err(EngineError::TooManyItems {
                limit: self.config.max_monitored_items,
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let now = Instant::now();
        let mut item = MonitoredItem::new(
            id,
            spec.client_handle,
            spec.owner,
            target,
            spec.mode,
            revised_interval,
            revised_queue_size,
            spec.discard_policy,
            spec.filter,
            range_span,
            spec.always_report,
            spec.timestamps,
            now,
        );

        // Initial report; a no-op when created disabled, in which case the
        // first poll after enabling supplies the baseline instead.
        item.evaluate(initial, true);

        if polls && spec.mode != MonitoringMode::Disabled {
            registry.sampled.push(id);
        }
        registry.items.insert(id, Arc::new(Mutex::new(item)));
        log::debug!(
            "created monitored item {id} (interval {revised_interval:?}, queue {revised_queue_size})"
        );

        Ok(CreateResult {
            id,
            revised_sampling_interval: revised_interval,
            revised_queue_size,
        })
    }

    /// Applies new parameters to an existing item.
    pub fn modify_item(
        &self,
        id: u32,
        sampling_interval: Duration,
        queue_size: u32,
        discard_policy: DiscardPolicy,
        filter: DataChangeFilter,
    ) -> Result<ModifyResult, EngineError> {
        let item = self.item(id)?;
        let mut item = lock(&item);

        let caps = self
            .address_space
            .target_capabilities(item.target())
            .ok_or(EngineError::UnknownTarget)?;
        if filter.deadband != DeadbandKind::None && item.target().attribute != AttributeId::Value {
            return Err(EngineError::FilterUnsupported);
        }
        filter.validate(caps.numeric, caps.eu_range.as_ref())?;
        let range_span = caps.eu_range.map_or(0.0, |range| range.span());

        let revised_interval =
            self.revise_interval(sampling_interval, caps.minimum_sampling_interval);
        let revised_queue_size = queue_size.clamp(1, self.config.max_queue_size);

        item.modify(
            revised_interval,
            revised_queue_size,
            discard_policy,
            filter,
            range_span,
            Instant::now(),
        );
        log::debug!("modified monitored item {id} (interval {revised_interval:?})");

        Ok(ModifyResult {
            revised_sampling_interval: revised_interval,
            revised_queue_size,
        })
    }

    /// Changes an item's monitoring mode, returning the previous mode and
    /// maintaining the active-polling registration.
    pub fn set_mode(&self, id: u32, mode: MonitoringMode) -> Result<MonitoringMode, EngineError> {
        let mut registry = lock(&self.registry);
        let item = registry
            .items
            .get(&id)
            .cloned()
            .ok_or(EngineError::UnknownItem(id))?;

        let (previous, polls) = {
            let mut item = lock(&item);
            let previous = item.set_mode(mode, Instant::now());
            (previous, self.address_space.requires_active_polling(item.target()))
        };

        if mode == MonitoringMode::Disabled {
            registry.sampled.retain(|&sampled| sampled != id);
        } else if polls && !registry.sampled.contains(&id) {
            registry.sampled.push(id);
        }

        Ok(previous)
    }

    /// Forces re-delivery of the last value on the next drain. Fails
    /// unless the item is reporting.
    pub fn request_resend(&self, id: u32) -> Result<(), EngineError> {
        let item = self.item(id)?;
        let mut item = lock(&item);
        if item.request_resend() {
            Ok(())
        } else {
            Err(EngineError::NotReporting(id))
        }
    }

    /// Moves an item to a different consumer, keeping its accumulated
    /// state and arming a baseline resend when reporting.
    pub fn transfer_item(&self, id: u32, new_owner: u32) -> Result<(), EngineError> {
        let item = self.item(id)?;
        lock(&item).transfer(new_owner);
        Ok(())
    }

    /// Destroys an item, releasing its scheduler registration first.
    pub fn delete_item(&self, id: u32) -> Result<(), EngineError> {
        let mut registry = lock(&self.registry);
        registry.sampled.retain(|&sampled| sampled != id);
        registry
            .items
            .remove(&id)
            .map(|_| log::debug!("deleted monitored item {id}"))
            .ok_or(EngineError::UnknownItem(id))
    }

    /// Drains up to `max_count` ready notifications from one item.
    pub fn drain(&self, id: u32, max_count: u32) -> Result<(Vec<Notification>, bool), EngineError> {
        let item = self.item(id)?;
        let result = lock(&item).publish(max_count, Instant::now());
        Ok(result)
    }

    pub fn is_ready_to_publish(&self, id: u32) -> Result<bool, EngineError> {
        let item = self.item(id)?;
        let ready = lock(&item).is_ready_to_publish(Instant::now());
        Ok(ready)
    }

    pub fn time_to_next_sample(&self, id: u32) -> Result<Duration, EngineError> {
        let item = self.item(id)?;
        let remaining = lock(&item).time_to_next_sample(Instant::now());
        Ok(remaining)
    }

    /// Entry point for push-based sources: evaluates `sample` on every
    /// item monitoring the changed attribute.
    ///
    /// Fan-out matches on node and attribute only: items selecting a
    /// sub-range or alternate encoding of the attribute receive the full
    /// sample unsliced. Slicing is the source's concern; a source that
    /// distinguishes sub-ranges delivers them as separate change events.
    pub fn on_source_changed(&self, target: &TargetRef, sample: Sample) {
        let matching: Vec<Arc<Mutex<MonitoredItem>>> = {
            let registry = lock(&self.registry);
            registry
                .items
                .values()
                .filter(|item| {
                    let item = lock(item);
                    item.target().node == target.node
                        && item.target().attribute == target.attribute
                })
                .cloned()
                .collect()
        };
        for item in matching {
            lock(&item).evaluate(sample.clone(), false);
        }
    }

    /// Flags every item on `node` so its next reported value carries the
    /// semantics-changed bit.
    pub fn set_semantics_changed(&self, node: crate::source::NodeId) {
        self.for_each_on_node(node, MonitoredItem::set_semantics_changed);
    }

    /// Flags every item on `node` so its next reported value carries the
    /// structure-changed bit.
    pub fn set_structure_changed(&self, node: crate::source::NodeId) {
        self.for_each_on_node(node, MonitoredItem::set_structure_changed);
    }

    /// One scheduler tick: polls every registered item that is due within
    /// `granularity` and runs it through the evaluate path.
    ///
    /// Source reads happen outside the item lock so a slow read never
    /// blocks drains of that item from observing a consistent queue.
    pub fn sample_due_items(&self, now: Instant, granularity: Duration) {
        let due: Vec<(Arc<Mutex<MonitoredItem>>, TargetRef)> = {
            let registry = lock(&self.registry);
            registry
                .sampled
                .iter()
                .filter_map(|id| registry.items.get(id))
                .filter_map(|item| {
                    let guard = lock(item);
                    (guard.time_to_next_sample(now) < granularity)
                        .then(|| (Arc::clone(item), guard.target().clone()))
                })
                .collect()
        };

        for (item, target) in due {
            let sample = self.address_space.read_current_value(&target);
            lock(&item).evaluate(sample, false);
        }
    }

    fn item(&self, id: u32) -> Result<Arc<Mutex<MonitoredItem>>, EngineError> {
        lock(&self.registry)
            .items
            .get(&id)
            .cloned()
            .ok_or(EngineError::UnknownItem(id))
    }

    fn for_each_on_node(&self, node: crate::source::NodeId, apply: fn(&mut MonitoredItem)) {
        let registry = lock(&self.registry);
        for item in registry.items.values() {
            let mut item = lock(item);
            if item.target().node == node {
                apply(&mut item);
            }
        }
    }

    /// Clamps the requested interval to the target's minimum and rounds it
    /// up to a whole multiple of the scheduler granularity. Zero survives
    /// untouched when the target has no minimum.
    fn revise_interval(&self, requested: Duration, target_minimum: Duration) -> Duration {
        let interval = requested.max(target_minimum);
        if interval.is_zero() {
            return interval;
        }
        let granularity = self.config.min_sampling_interval.as_nanos().max(1);
        let rounded = interval.as_nanos().div_ceil(granularity) * granularity;
        Duration::from_nanos(u64::try_from(rounded).unwrap_or(u64::MAX))
    }
}

/// Mutex poisoning carries no recovery strategy here; the protected state
/// is valid after any panic in a holder, so keep going with the guard.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
