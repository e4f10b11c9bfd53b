use std::cell::Cell;
use std::time::Duration;

use web_time::Instant;

/// Time left in the slice the host granted to the engine. The work loop asks
/// after every unit of work and yields once this drops under the configured
/// threshold.
pub trait Deadline {
    fn time_remaining(&self) -> Duration;
}

/// Wall-clock slice: `budget` from the moment it was created.
#[derive(Clone, Copy, Debug)]
pub struct SliceBudget {
    started: Instant,
    budget: Duration,
}

impl SliceBudget {
    pub fn new(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }
}

impl Deadline for SliceBudget {
    fn time_remaining(&self) -> Duration {
        self.budget.saturating_sub(self.started.elapsed())
    }
}

/// Deterministic slice allowing a fixed number of units of work. The loop
/// always performs at least one unit before it consults the deadline, so
/// `UnitBudget::new(0)` behaves like `UnitBudget::new(1)`.
#[derive(Debug)]
pub struct UnitBudget {
    remaining: Cell<usize>,
}

impl UnitBudget {
    pub fn new(units: usize) -> Self {
        Self {
            remaining: Cell::new(units),
        }
    }
}

impl Deadline for UnitBudget {
    fn time_remaining(&self) -> Duration {
        let left = self.remaining.get().saturating_sub(1);
        self.remaining.set(left);
        if left == 0 {
            Duration::ZERO
        } else {
            Duration::MAX
        }
    }
}

/// Never runs out.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unbounded;

impl Deadline for Unbounded {
    fn time_remaining(&self) -> Duration {
        Duration::MAX
    }
}
