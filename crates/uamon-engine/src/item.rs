//! The per-item state machine.
//!
//! A [`MonitoredItem`] owns its sample queue, filter configuration, and
//! sampling-interval bookkeeping. The scheduler and the publish path only
//! ever reach it through the methods here; every method that depends on
//! time takes an explicit `now` so the interval arithmetic is testable
//! without sleeping.

use crate::notify::{Notification, TimestampsToReturn};
use crate::source::TargetRef;
use std::time::{Duration, Instant};
use uamon_core::{value_changed, DataChangeFilter, DiscardPolicy, Sample, SampleQueue};

/// The monitoring mode of an item.
///
/// `Sampling` runs change detection and queues significant changes but
/// never reports them; the gate is the publish-readiness predicate, not
/// the queue path, so a later switch to `Reporting` picks up where
/// sampling left off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MonitoringMode {
    Disabled,
    Sampling,
    #[default]
    Reporting,
}

/// One observer's subscription to one source attribute.
#[derive(Debug)]
pub struct MonitoredItem {
    id: u32,
    client_handle: u32,
    owner: u32,
    target: TargetRef,
    mode: MonitoringMode,
    sampling_interval: Duration,
    queue: Option<SampleQueue>,
    queue_size: u32,
    discard_policy: DiscardPolicy,
    filter: DataChangeFilter,
    range_span: f64,
    always_report: bool,
    timestamps: TimestampsToReturn,
    last_sample: Option<Sample>,
    /// `None` while the interval is zero ("as fast as the source changes").
    next_sample_at: Option<Instant>,
    ready_to_publish: bool,
    ready_to_trigger: bool,
    resend_pending: bool,
    semantics_changed: bool,
    structure_changed: bool,
}

impl MonitoredItem {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u32,
        client_handle: u32,
        owner: u32,
        target: TargetRef,
        mode: MonitoringMode,
        sampling_interval: Duration,
        queue_size: u32,
        discard_policy: DiscardPolicy,
        filter: DataChangeFilter,
        range_span: f64,
        always_report: bool,
        timestamps: TimestampsToReturn,
        now: Instant,
    ) -> Self {
        // Capacity one or less keeps only the single last sample; no
        // queue is allocated.
        let queue = (queue_size > 1)
            .then(|| SampleQueue::new(queue_size as usize, discard_policy));

        Self {
            id,
            client_handle,
            owner,
            target,
            mode,
            sampling_interval,
            queue,
            queue_size,
            discard_policy,
            filter,
            range_span,
            always_report,
            timestamps,
            last_sample: None,
            next_sample_at: (!sampling_interval.is_zero()).then_some(now),
            ready_to_publish: false,
            ready_to_trigger: false,
            resend_pending: false,
            semantics_changed: false,
            structure_changed: false,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn client_handle(&self) -> u32 {
        self.client_handle
    }

    pub fn owner(&self) -> u32 {
        self.owner
    }

    pub fn target(&self) -> &TargetRef {
        &self.target
    }

    pub fn mode(&self) -> MonitoringMode {
        self.mode
    }

    pub fn sampling_interval(&self) -> Duration {
        self.sampling_interval
    }

    pub fn queue_len(&self) -> usize {
        self.queue.as_ref().map_or(0, SampleQueue::len)
    }

    pub fn queue_size(&self) -> u32 {
        self.queue_size
    }

    pub fn discard_policy(&self) -> DiscardPolicy {
        self.discard_policy
    }

    pub fn last_sample(&self) -> Option<&Sample> {
        self.last_sample.as_ref()
    }

    pub fn is_resend_pending(&self) -> bool {
        self.resend_pending
    }

    /// Time until the item is next due for an active poll.
    ///
    /// `Duration::MAX` while disabled; zero when the interval is zero or
    /// the due time has passed.
    pub fn time_to_next_sample(&self, now: Instant) -> Duration {
        if self.mode == MonitoringMode::Disabled {
            return Duration::MAX;
        }
        match self.next_sample_at {
            None => Duration::ZERO,
            Some(due) => due.saturating_duration_since(now),
        }
    }

    /// Whether a publish cycle should drain this item.
    ///
    /// Gated on mode (`Sampling` accumulates but never reports) and on the
    /// due time, so a drain cannot outpace the sampling interval.
    pub fn is_ready_to_publish(&self, now: Instant) -> bool {
        if !self.ready_to_publish || self.mode != MonitoringMode::Reporting {
            return false;
        }
        match self.next_sample_at {
            Some(due) => due <= now,
            None => true,
        }
    }

    /// Ready to fire any linked triggered items.
    pub fn is_ready_to_trigger(&self) -> bool {
        self.mode != MonitoringMode::Disabled && self.ready_to_trigger
    }

    /// Evaluates a fresh sample against the change filter and queues it
    /// when significant.
    ///
    /// Invoked by the scheduler poll or directly by a push source. A
    /// no-op while disabled. `ignore_filter` forces the initial report
    /// after creation or re-enable.
    pub fn evaluate(&mut self, sample: Sample, ignore_filter: bool) {
        if self.mode == MonitoringMode::Disabled {
            return;
        }

        if !self.always_report
            && !ignore_filter
            && !value_changed(&sample, self.last_sample.as_ref(), &self.filter, self.range_span)
        {
            return;
        }

        let mut sample = sample;
        if let Some(error) = sample.error {
            if !error.is_good() {
                sample.value.status = error;
            }
        }

        self.last_sample = Some(sample.clone());
        if let Some(queue) = &mut self.queue {
            queue.push(sample);
        }
        self.ready_to_publish = true;
        self.ready_to_trigger = true;
    }

    /// Changes the monitoring mode, returning the previous mode.
    ///
    /// Leaving `Disabled` resets the due time and clears the delivered
    /// baseline so the next evaluate is an unconditional initial report;
    /// entering it clears the ready flags but retains queued entries.
    pub fn set_mode(&mut self, mode: MonitoringMode, now: Instant) -> MonitoringMode {
        let previous = self.mode;
        if previous == mode {
            return previous;
        }

        if previous == MonitoringMode::Disabled {
            self.next_sample_at = (!self.sampling_interval.is_zero()).then_some(now);
            self.last_sample = None;
        }

        self.mode = mode;

        if mode == MonitoringMode::Disabled {
            self.ready_to_publish = false;
            self.ready_to_trigger = false;
        }

        previous
    }

    /// Applies new parameters. The filter must already be validated.
    ///
    /// The due time is adjusted by swapping the old interval contribution
    /// for the new one rather than resetting to `now`, so a parameter
    /// tweak never causes a burst of immediate re-samples.
    pub fn modify(
        &mut self,
        sampling_interval: Duration,
        queue_size: u32,
        discard_policy: DiscardPolicy,
        filter: DataChangeFilter,
        range_span: f64,
        now: Instant,
    ) {
        match self.next_sample_at {
            Some(due) => {
                let rewound = due.checked_sub(self.sampling_interval).unwrap_or(now);
                self.next_sample_at =
                    (!sampling_interval.is_zero()).then(|| rewound + sampling_interval);
            }
            None => {
                self.next_sample_at =
                    (!sampling_interval.is_zero()).then(|| now + sampling_interval);
            }
        }
        self.sampling_interval = sampling_interval;
        self.filter = filter;
        self.range_span = range_span;
        self.queue_size = queue_size;
        self.discard_policy = discard_policy;

        if queue_size > 1 {
            match &mut self.queue {
                Some(queue) => queue.set_capacity(queue_size as usize, discard_policy),
                None => {
                    self.queue = Some(SampleQueue::new(queue_size as usize, discard_policy));
                }
            }
        } else {
            self.queue = None;
        }
    }

    /// Arms a forced re-delivery of the last value. Only meaningful while
    /// reporting; returns false otherwise.
    pub fn request_resend(&mut self) -> bool {
        if self.mode != MonitoringMode::Reporting {
            return false;
        }
        self.resend_pending = true;
        true
    }

    /// Reassigns the owning consumer without resetting accumulated state.
    /// A reporting item is armed for resend so the new consumer gets a
    /// baseline without waiting for the next real change.
    pub fn transfer(&mut self, new_owner: u32) {
        self.owner = new_owner;
        if self.mode == MonitoringMode::Reporting {
            self.resend_pending = true;
        }
    }

    /// The next value reported will carry the semantics-changed bit.
    pub fn set_semantics_changed(&mut self) {
        self.semantics_changed = true;
    }

    /// The next value reported will carry the structure-changed bit.
    pub fn set_structure_changed(&mut self) {
        self.structure_changed = true;
    }

    /// Advances the due time past `now` in whole intervals measured from
    /// the previous due time, so sustained late ticks never accumulate
    /// drift or a backlog of catch-up samples.
    fn increment_sample_time(&mut self, now: Instant) {
        let interval = self.sampling_interval;
        if interval.is_zero() {
            return;
        }
        if let Some(due) = self.next_sample_at {
            if now >= due {
                let missed = (now - due).as_nanos() / interval.as_nanos().max(1);
                let advance = interval.as_nanos().saturating_mul(missed + 1);
                let advance = u64::try_from(advance).unwrap_or(u64::MAX);
                self.next_sample_at = Some(due + Duration::from_nanos(advance));
            }
        }
    }

    /// Drains ready samples into notifications, up to `max_count`.
    ///
    /// Returns the notifications and whether data is still pending. With
    /// no queue, or with a resend armed, exactly the last delivered value
    /// is emitted. A pending semantics/structure-changed bit is OR'd into
    /// the first notification of the cycle only. After draining, the ready
    /// flags mirror the more-pending result so a partially drained item
    /// stays eligible for the next cycle.
    pub fn publish(&mut self, max_count: u32, now: Instant) -> (Vec<Notification>, bool) {
        let mut notifications = Vec::new();

        if !self.is_ready_to_publish(now) {
            if !self.resend_pending {
                return (notifications, false);
            }
        } else {
            self.increment_sample_time(now);
        }

        let mut drained = Vec::new();
        if self.resend_pending || self.queue.is_none() {
            if let Some(sample) = self.last_sample.clone() {
                drained.push(sample);
            }
        } else if let Some(queue) = &mut self.queue {
            while (drained.len() as u32) < max_count {
                match queue.pop_one() {
                    Some(sample) => drained.push(sample),
                    None => break,
                }
            }
        }

        for sample in drained {
            self.push_notification(sample, &mut notifications);
        }

        let more_pending = self.queue.as_ref().is_some_and(|queue| !queue.is_empty());
        self.ready_to_publish = more_pending;
        self.ready_to_trigger = more_pending;
        self.resend_pending = false;

        (notifications, more_pending)
    }

    fn push_notification(&mut self, sample: Sample, out: &mut Vec<Notification>) {
        let mut value = sample.value;
        if self.semantics_changed {
            value.status = value.status.with_semantics_changed();
            self.semantics_changed = false;
        }
        if self.structure_changed {
            value.status = value.status.with_structure_changed();
            self.structure_changed = false;
        }
        self.timestamps.apply(&mut value);
        out.push(Notification {
            client_handle: self.client_handle,
            value,
        });
    }
}
