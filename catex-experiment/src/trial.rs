use catex_core::{Trial, TrialResult, TrialState};

/// The trial currently on screen, with its phase clock.
#[derive(Debug, Clone)]
pub struct ActiveTrial {
    pub trial: Trial,
    pub durations: TrialDurations,
    pub timestamps: TrialTimestamps,
    pub state: TrialState,
    /// Set when the response window closes; appended to the log once
    /// feedback is over.
    pub result: Option<TrialResult>,
}

/// All in nanoseconds, matching the timer.
#[derive(Debug, Clone, Copy)]
pub struct TrialDurations {
    pub fixation_ns: u64,
    pub distractor_only_ns: Option<u64>,
    pub response_window_ns: u64,
    pub feedback_ns: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct TrialTimestamps {
    pub fixation_start: u64,
    pub distractor_start: Option<u64>,
    pub stimulus_onset: Option<u64>,
    pub feedback_start: Option<u64>,
}

impl ActiveTrial {
    pub fn new(trial: Trial, durations: TrialDurations, now_ns: u64) -> Self {
        Self {
            trial,
            durations,
            timestamps: TrialTimestamps {
                fixation_start: now_ns,
                distractor_start: None,
                stimulus_onset: None,
                feedback_start: None,
            },
            state: TrialState::Fixation,
            result: None,
        }
    }

    /// Deadline of the response window, once the stimulus is up.
    pub fn response_deadline(&self) -> Option<u64> {
        self.timestamps
            .stimulus_onset
            .map(|t0| t0 + self.durations.response_window_ns)
    }

    /// Whether a key stamped `ts` counts as this trial's response:
    /// `[t0, t0 + window)`.
    pub fn accepts(&self, ts: u64) -> bool {
        match (self.timestamps.stimulus_onset, self.response_deadline()) {
            (Some(t0), Some(deadline)) => ts >= t0 && ts < deadline,
            _ => false,
        }
    }
}
