//! Cooperative timing: cancellable delayed tasks and the fixed-rate tick
//! schedule that drives the simulation loop.

use skirmish_net::EntityId;

/// Default simulation tick rate in Hz.
pub const DEFAULT_TICK_RATE: u32 = 20;

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Handle of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// A task that came due.
#[derive(Debug, Clone, PartialEq)]
pub struct DueTask<T> {
    pub id: TaskId,
    pub owner: EntityId,
    /// When it was due (may be earlier than the poll time).
    pub due_at: f64,
    pub payload: T,
}

/// Delayed tasks keyed by the entity they belong to.
///
/// Nothing runs on its own: the owner of the scheduler polls it once per
/// tick and executes whatever came due. Cancelling an owner drops all of its
/// pending tasks, which is how waits are tied to entity lifetime.
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    tasks: Vec<DueTask<T>>,
    next_id: u64,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 0,
        }
    }

    /// Schedule `payload` for `owner` at absolute time `due_at`.
    pub fn schedule(&mut self, owner: EntityId, due_at: f64, payload: T) -> TaskId {
        self.next_id += 1;
        let id = TaskId(self.next_id);
        self.tasks.push(DueTask {
            id,
            owner,
            due_at,
            payload,
        });
        id
    }

    /// Cancel one task. Returns `false` if it already ran or was cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() != before
    }

    /// Cancel every task owned by `owner`. Returns how many were dropped.
    pub fn cancel_owner(&mut self, owner: EntityId) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.owner != owner);
        before - self.tasks.len()
    }

    /// Cancel everything.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.tasks.len();
        self.tasks.clear();
        count
    }

    /// Remove and return every task due at or before `now`, earliest first
    /// (ties in scheduling order).
    pub fn poll(&mut self, now: f64) -> Vec<DueTask<T>> {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.tasks.drain(..).partition(|task| task.due_at <= now);
        self.tasks = pending;
        due.sort_by(|a, b| a.due_at.total_cmp(&b.due_at).then(a.id.cmp(&b.id)));
        due
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Pending task count for one owner.
    pub fn pending_for(&self, owner: EntityId) -> usize {
        self.tasks.iter().filter(|task| task.owner == owner).count()
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// TickSchedule
// ---------------------------------------------------------------------------

/// Fixed-rate tick scheduler for the simulation loop.
///
/// Accumulates elapsed time and yields discrete ticks at the configured rate.
pub struct TickSchedule {
    accumulator_secs: f64,
    tick_duration_secs: f64,
    total_ticks: u64,
}

impl TickSchedule {
    /// Schedule at [`DEFAULT_TICK_RATE`].
    pub fn new() -> Self {
        Self::with_tick_rate(DEFAULT_TICK_RATE)
    }

    /// Schedule with a custom tick rate. A rate of zero is treated as 1 Hz.
    pub fn with_tick_rate(hz: u32) -> Self {
        Self {
            accumulator_secs: 0.0,
            tick_duration_secs: 1.0 / f64::from(hz.max(1)),
            total_ticks: 0,
        }
    }

    /// Accumulates elapsed time and returns the number of ticks to process.
    pub fn accumulate(&mut self, dt_secs: f64) -> u32 {
        self.accumulator_secs += dt_secs;
        let mut ticks = 0u32;
        while self.accumulator_secs >= self.tick_duration_secs {
            self.accumulator_secs -= self.tick_duration_secs;
            self.total_ticks += 1;
            ticks += 1;
        }
        ticks
    }

    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    pub fn tick_duration_secs(&self) -> f64 {
        self.tick_duration_secs
    }

    /// Simulated seconds covered by the ticks so far.
    pub fn elapsed_secs(&self) -> f64 {
        self.total_ticks as f64 * self.tick_duration_secs
    }
}

impl Default for TickSchedule {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_net::NodeId;

    fn owner(n: u32) -> EntityId {
        EntityId::compose(NodeId(0), n)
    }

    #[test]
    fn test_poll_returns_due_in_order() {
        let mut sched = Scheduler::new();
        sched.schedule(owner(1), 2.0, "late");
        sched.schedule(owner(1), 1.0, "early");
        sched.schedule(owner(2), 1.0, "early-second");
        sched.schedule(owner(2), 5.0, "future");

        let due: Vec<&str> = sched.poll(2.0).into_iter().map(|t| t.payload).collect();
        assert_eq!(due, vec!["early", "early-second", "late"]);
        assert_eq!(sched.len(), 1);
        assert!(sched.poll(4.9).is_empty());
        assert_eq!(sched.poll(5.0).len(), 1);
        assert!(sched.is_empty());
    }

    #[test]
    fn test_cancel_owner_drops_only_that_owner() {
        let mut sched = Scheduler::new();
        sched.schedule(owner(1), 1.0, 1);
        sched.schedule(owner(1), 2.0, 2);
        sched.schedule(owner(2), 1.0, 3);
        assert_eq!(sched.cancel_owner(owner(1)), 2);
        assert_eq!(sched.pending_for(owner(1)), 0);
        assert_eq!(sched.pending_for(owner(2)), 1);
    }

    #[test]
    fn test_cancel_single_and_all() {
        let mut sched = Scheduler::new();
        let a = sched.schedule(owner(1), 1.0, ());
        sched.schedule(owner(1), 1.0, ());
        assert!(sched.cancel(a));
        assert!(!sched.cancel(a));
        assert_eq!(sched.cancel_all(), 1);
        assert!(sched.poll(10.0).is_empty());
    }

    #[test]
    fn test_tick_schedule_fixed_rate() {
        let mut schedule = TickSchedule::with_tick_rate(20);
        let mut total = 0;
        for _ in 0..20 {
            total += schedule.accumulate(0.05);
        }
        assert_eq!(total, 20);
        assert_eq!(schedule.total_ticks(), 20);

        let mut partial = TickSchedule::with_tick_rate(20);
        assert_eq!(partial.accumulate(0.02), 0);
        assert_eq!(partial.accumulate(0.035), 1);
        assert_eq!(partial.accumulate(0.25), 5);
    }

    #[test]
    fn test_tick_schedule_zero_rate_clamped() {
        let schedule = TickSchedule::with_tick_rate(0);
        assert_eq!(schedule.tick_duration_secs(), 1.0);
    }
}
