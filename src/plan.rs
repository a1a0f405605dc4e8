//! A priority queue of plans sorted by simulated time
//!
//! Defines a `PlanQueue<T>` that stores items of type `T` ordered by `f64`
//! time (in days) and then by `ExecutionPhase`. The simulation clock uses it to
//! hold every future event: the per-slot tracing round, the daily sweep, and
//! the collaborator plans that feed them.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Plans scheduled for the same time run in phase order. A daily sweep uses
/// `Last` so that it observes every slot that shares its timestamp.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ExecutionPhase {
    First,
    #[default]
    Normal,
    Last,
}

/// A queue of plans. Ties on time are broken by phase and then by insertion
/// order, so two plans added for the same instant and phase run first-in
/// first-out.
pub struct PlanQueue<T> {
    queue: BinaryHeap<Entry<T>>,
    plan_counter: u64,
}

impl<T> PlanQueue<T> {
    #[must_use]
    pub fn new() -> PlanQueue<T> {
        PlanQueue {
            queue: BinaryHeap::new(),
            plan_counter: 0,
        }
    }

    pub fn add_plan(&mut self, time: f64, data: T, phase: ExecutionPhase) {
        self.queue.push(Entry {
            time,
            phase,
            id: self.plan_counter,
            data,
        });
        self.plan_counter += 1;
    }

    /// Remove and return the earliest plan.
    pub fn get_next_plan(&mut self) -> Option<Plan<T>> {
        self.queue.pop().map(|entry| Plan {
            time: entry.time,
            data: entry.data,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drops every remaining plan.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl<T> Default for PlanQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct Entry<T> {
    time: f64,
    phase: ExecutionPhase,
    id: u64,
    data: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// `BinaryHeap` is a max-heap, so every comparison is reversed to pop the
// earliest time, lowest phase and lowest id first. The payload never takes part.
impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.phase.cmp(&self.phase))
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// A plan holding data of type `T` for the given time.
pub struct Plan<T> {
    pub time: f64,
    pub data: T,
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::{ExecutionPhase, PlanQueue};

    #[test]
    fn empty_queue() {
        let mut plan_queue = PlanQueue::<()>::new();
        assert!(plan_queue.get_next_plan().is_none());
        assert!(plan_queue.is_empty());
    }

    #[test]
    fn plans_come_out_in_time_order() {
        let mut plan_queue = PlanQueue::new();
        plan_queue.add_plan(1.0, 1, ExecutionPhase::Normal);
        plan_queue.add_plan(3.0, 3, ExecutionPhase::Normal);
        plan_queue.add_plan(2.0, 2, ExecutionPhase::Normal);

        for expected in 1..=3 {
            let next_plan = plan_queue.get_next_plan().unwrap();
            assert_eq!(next_plan.time, f64::from(expected));
            assert_eq!(next_plan.data, expected);
        }
        assert!(plan_queue.get_next_plan().is_none());
    }

    #[test]
    fn same_time_same_phase_is_fifo() {
        let mut plan_queue = PlanQueue::new();
        plan_queue.add_plan(1.0, 1, ExecutionPhase::Normal);
        plan_queue.add_plan(1.0, 2, ExecutionPhase::Normal);

        assert_eq!(plan_queue.get_next_plan().unwrap().data, 1);
        assert_eq!(plan_queue.get_next_plan().unwrap().data, 2);
    }

    #[test]
    fn daily_sweep_runs_after_slot_at_same_time() {
        let mut plan_queue = PlanQueue::new();
        plan_queue.add_plan(1.0, "sweep", ExecutionPhase::Last);
        plan_queue.add_plan(1.0, "slot", ExecutionPhase::Normal);
        plan_queue.add_plan(1.0, "encounters", ExecutionPhase::First);

        assert_eq!(plan_queue.get_next_plan().unwrap().data, "encounters");
        assert_eq!(plan_queue.get_next_plan().unwrap().data, "slot");
        assert_eq!(plan_queue.get_next_plan().unwrap().data, "sweep");
    }

    #[test]
    fn clear_drops_everything() {
        let mut plan_queue = PlanQueue::new();
        plan_queue.add_plan(1.0, 1, ExecutionPhase::Normal);
        plan_queue.add_plan(2.0, 2, ExecutionPhase::Last);
        plan_queue.clear();
        assert!(plan_queue.is_empty());
        assert!(plan_queue.get_next_plan().is_none());
    }
}
