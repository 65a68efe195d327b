use crate::config::SUBSAMPLE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the simulation to load.
    Idle,
    Looping,
    /// Disposed; no further frames are requested.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAction {
    /// Tick the simulation and redraw the surface.
    Step,
    Skip,
    /// Do not request another frame.
    Halt,
}

/// Sub-samples display refreshes down to the simulation cadence.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    state: SchedulerState,
    frame: u64,
    subsample: u64,
}

impl FrameScheduler {
    pub fn new(subsample: u64) -> Self {
        Self {
            state: SchedulerState::Idle,
            frame: 0,
            subsample: subsample.max(1),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_looping(&self) -> bool {
        self.state == SchedulerState::Looping
    }

    /// Number of animation callbacks handled while looping.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// `Idle -> Looping`; returns false if the scheduler already left `Idle`.
    pub fn start(&mut self) -> bool {
        if self.state != SchedulerState::Idle {
            return false;
        }

        self.state = SchedulerState::Looping;
        true
    }

    pub fn stop(&mut self) {
        self.state = SchedulerState::Stopped;
    }

    /// Called once per animation callback. Steps on callbacks 0, n, 2n, ...
    pub fn on_frame(&mut self) -> FrameAction {
        if !self.is_looping() {
            return FrameAction::Halt;
        }

        let due = self.frame % self.subsample == 0;
        self.frame += 1;

        if due {
            FrameAction::Step
        } else {
            FrameAction::Skip
        }
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(SUBSAMPLE)
    }
}
