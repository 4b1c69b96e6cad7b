//! Blocking drivers that tie a [`Surface`] to the runner.

use crate::error::ExperimentError;
use crate::participant::{FormStatus, Participant, ParticipantForm};
use crate::persist::ResultSink;
use crate::state::TrialRunner;
use crate::stats::SegmentStats;
use crate::surface::Surface;
use catex_core::{InputEvent, Key, TrialResult};
use catex_timing::Timer;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Finished,
    Aborted,
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub completion: Completion,
    /// Full in-memory log, including rows that were never flushed.
    pub results: Vec<TrialResult>,
    pub segments_saved: u32,
    pub stats: SegmentStats,
}

/// Run the session to completion or quit.
///
/// One tick: drain input, advance the runner, present its frame, sleep.
pub fn run_session<T, S, U>(
    surface: &mut U,
    runner: &mut TrialRunner<T, S>,
) -> Result<SessionReport, ExperimentError>
where
    T: Timer<Timestamp = u64>,
    S: ResultSink,
    U: Surface + ?Sized,
{
    let tick = runner.config.tick();
    let mut ticks: u64 = 0;
    surface.present(&runner.frame())?;

    loop {
        let events = surface.poll_events()?;
        runner.update(&events)?;
        if runner.is_done() {
            break;
        }
        surface.present(&runner.frame())?;
        surface.sleep(tick);
        ticks += 1;
    }

    let report = runner.report();
    info!(
        ticks,
        completion = ?report.completion,
        trials = report.results.len(),
        segments = report.segments_saved,
        "session ended"
    );
    Ok(report)
}

/// Show the participant form until it is submitted. `None` on quit.
pub fn collect_participant<U>(
    surface: &mut U,
    tick: Duration,
) -> Result<Option<Participant>, ExperimentError>
where
    U: Surface + ?Sized,
{
    let mut form = ParticipantForm::new();
    loop {
        surface.present(&form.frame())?;
        for event in surface.poll_events()? {
            match event {
                InputEvent::Quit | InputEvent::KeyDown { key: Key::Escape, .. } => {
                    debug!("participant form cancelled");
                    return Ok(None);
                }
                InputEvent::KeyDown { key, .. } => {
                    if let FormStatus::Submitted(participant) = form.handle_key(key) {
                        info!(
                            name = %participant.name,
                            number = %participant.number,
                            "participant registered"
                        );
                        return Ok(Some(participant));
                    }
                }
            }
        }
        surface.sleep(tick);
    }
}
