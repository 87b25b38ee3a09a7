//! Tick/frame coalescing for the refresh loop.
//!
//! A timer tick only *requests* a rendering pass; the pass itself runs at the
//! host's next frame. At most one request is outstanding: a tick that finds an
//! earlier request still waiting replaces it.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Scheduled { tick: u64 },
    Running { tick: u64 },
}

#[derive(Debug)]
pub struct RefreshScheduler {
    state: SchedulerState,
    ticks: u64,
    coalesced: u64,
    active: bool,
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self {
            state: SchedulerState::Idle,
            ticks: 0,
            coalesced: 0,
            active: true,
        }
    }
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn has_pending(&self) -> bool {
        matches!(self.state, SchedulerState::Scheduled { .. })
    }

    /// Number of requests replaced by a newer tick before they could run.
    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }

    /// Records a timer tick. Returns whether a pass is now scheduled.
    pub fn on_tick(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.ticks += 1;
        match self.state {
            SchedulerState::Scheduled { tick } => {
                debug!("Cancelling pending pass from tick {} in favour of tick {}", tick, self.ticks);
                self.coalesced += 1;
                self.state = SchedulerState::Scheduled { tick: self.ticks };
            }
            SchedulerState::Idle => {
                self.state = SchedulerState::Scheduled { tick: self.ticks };
            }
            // Ticks cannot interleave with a pass on one thread; nothing to replace.
            SchedulerState::Running { .. } => return false,
        }
        true
    }

    /// Moves a scheduled request to running and returns the tick it belongs to.
    pub fn begin_pass(&mut self) -> Option<u64> {
        match self.state {
            SchedulerState::Scheduled { tick } if self.active => {
                self.state = SchedulerState::Running { tick };
                Some(tick)
            }
            _ => None,
        }
    }

    pub fn finish_pass(&mut self) {
        if let SchedulerState::Running { .. } = self.state {
            self.state = SchedulerState::Idle;
        }
    }

    /// Stops accepting ticks and drops any pending request. Idempotent.
    pub fn deactivate(&mut self) {
        if self.active {
            debug!("Refresh scheduler deactivated after {} ticks", self.ticks);
        }
        self.active = false;
        self.state = SchedulerState::Idle;
    }
}
