use crate::config::{ExperimentConfig, NoResponseFeedback, QUIT_KEY};
use crate::error::ExperimentError;
use crate::persist::ResultSink;
use crate::session::{Completion, SessionReport};
use crate::stats::SegmentStats;
use crate::trial::{ActiveTrial, TrialDurations};
use catex_core::{
    AssetRef, Frame, InputEvent, Observed, Outcome, Placement, SessionPhase, Tone, Trial,
    TrialResult, TrialState,
};
use catex_timing::Timer;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum RunnerEvent {
    SessionStarted,
    TrialStarted { trial: usize },
    StimulusOnset { trial: usize, at_ns: u64 },
    TrialComplete(TrialResult),
    SegmentSaved { segment: u32, rows: usize },
    BreakStarted { segment: u32 },
    Resumed,
    SessionFinished,
    Aborted { dropped: usize },
}

/// Drives one session: instructions, the trial sequence with breaks, and
/// the debrief screen.
///
/// Cooperative: nothing here blocks. The caller feeds every batch of input
/// to [`update`](Self::update) on a regular tick and presents
/// [`frame`](Self::frame) afterwards, so a quit is seen within one tick in
/// every phase, fixation and feedback included.
pub struct TrialRunner<T, S>
where
    T: Timer<Timestamp = u64>,
    S: ResultSink,
{
    pub config: ExperimentConfig,
    pub timer: T,
    sink: S,
    phase: SessionPhase,
    phase_started: u64,
    plan: Vec<Trial>,
    next_index: usize,
    current: Option<ActiveTrial>,
    /// Every completed trial, in completion order.
    results: Vec<TrialResult>,
    /// Completed since the last flush.
    pending: Vec<TrialResult>,
    segment: u32,
    segments_saved: u32,
    break_stats: Option<SegmentStats>,
}

impl<T, S> TrialRunner<T, S>
where
    T: Timer<Timestamp = u64>,
    S: ResultSink,
{
    pub fn new(config: ExperimentConfig, plan: Vec<Trial>, timer: T, sink: S) -> Self {
        let now = timer.now();
        Self {
            config,
            timer,
            sink,
            phase: SessionPhase::Instructions,
            phase_started: now,
            plan,
            next_index: 0,
            current: None,
            results: Vec::new(),
            pending: Vec::new(),
            segment: 1,
            segments_saved: 0,
            break_stats: None,
        }
    }

    fn durations(&self) -> TrialDurations {
        let ns = |d: std::time::Duration| d.as_nanos() as u64;
        TrialDurations {
            fixation_ns: ns(self.config.fixation()),
            distractor_only_ns: self.config.distractor_only().map(ns),
            response_window_ns: ns(self.config.response_window()),
            feedback_ns: ns(self.config.feedback()),
        }
    }

    fn resume_pressed(&self, events: &[InputEvent]) -> bool {
        let resume = self.config.resume_key.normalized();
        events.iter().any(|e| {
            matches!(e, InputEvent::KeyDown { key, .. } if key.normalized() == resume)
        })
    }

    fn enter(&mut self, phase: SessionPhase, now: u64) {
        self.phase = phase;
        self.phase_started = now;
    }

    /// Advance the session by one tick.
    pub fn update(&mut self, events: &[InputEvent]) -> Result<Vec<RunnerEvent>, ExperimentError> {
        let mut out = Vec::new();
        if self.phase.is_terminal() {
            return Ok(out);
        }

        let quit = events.iter().any(|e| match e {
            InputEvent::Quit => true,
            InputEvent::KeyDown { key, .. } => key.normalized() == QUIT_KEY,
        });
        if quit {
            self.abort(&mut out);
            return Ok(out);
        }

        let now = self.timer.now();
        match self.phase {
            SessionPhase::Instructions => {
                if self.resume_pressed(events) {
                    info!(trials = self.plan.len(), "session started");
                    out.push(RunnerEvent::SessionStarted);
                    self.start_next(now, &mut out);
                }
            }
            SessionPhase::Trials => self.update_trial(now, events, &mut out)?,
            SessionPhase::Break => {
                if self.resume_pressed(events) {
                    debug!(segment = self.segment, "resumed after break");
                    self.break_stats = None;
                    out.push(RunnerEvent::Resumed);
                    self.start_next(now, &mut out);
                }
            }
            SessionPhase::Debrief => {
                let shown = now.saturating_sub(self.phase_started);
                if shown >= self.config.debrief().as_nanos() as u64 || self.resume_pressed(events) {
                    self.enter(SessionPhase::Finished, now);
                    info!(completed = self.results.len(), "session finished");
                    out.push(RunnerEvent::SessionFinished);
                }
            }
            SessionPhase::Finished | SessionPhase::Aborted => {}
        }

        Ok(out)
    }

    fn start_next(&mut self, now: u64, out: &mut Vec<RunnerEvent>) {
        let Some(trial) = self.plan.get(self.next_index).cloned() else {
            self.current = None;
            self.enter(SessionPhase::Debrief, now);
            return;
        };
        self.next_index += 1;
        debug!(trial = trial.id, category = %trial.category, "trial started");
        out.push(RunnerEvent::TrialStarted { trial: trial.id });
        self.current = Some(ActiveTrial::new(trial, self.durations(), now));
        self.enter(SessionPhase::Trials, now);
    }

    fn update_trial(
        &mut self,
        now: u64,
        events: &[InputEvent],
        out: &mut Vec<RunnerEvent>,
    ) -> Result<(), ExperimentError> {
        // Keys in the batch that opened the window were pressed before the
        // stimulus was on screen.
        let mut opened_this_tick = false;

        loop {
            let Some(trial) = self.current.as_mut() else {
                return Ok(());
            };

            match trial.state {
                TrialState::Fixation => {
                    let held = now.saturating_sub(trial.timestamps.fixation_start);
                    if held < trial.durations.fixation_ns {
                        return Ok(());
                    }
                    match (trial.durations.distractor_only_ns, trial.trial.distractor.is_some()) {
                        (Some(_), true) => {
                            trial.state = TrialState::DistractorOnly;
                            trial.timestamps.distractor_start = Some(now);
                        }
                        _ => {
                            open_response(trial, now, out);
                            opened_this_tick = true;
                        }
                    }
                }
                TrialState::DistractorOnly => {
                    let start = trial.timestamps.distractor_start.unwrap_or(now);
                    let hold = trial.durations.distractor_only_ns.unwrap_or(0);
                    if now.saturating_sub(start) < hold {
                        return Ok(());
                    }
                    open_response(trial, now, out);
                    opened_this_tick = true;
                }
                TrialState::Response => {
                    let onset = trial.timestamps.stimulus_onset.unwrap_or(now);
                    let hit = if opened_this_tick {
                        None
                    } else {
                        events.iter().find_map(|e| match *e {
                            InputEvent::KeyDown { key, timestamp_ns }
                                if trial.accepts(timestamp_ns) =>
                            {
                                Some((key, timestamp_ns))
                            }
                            _ => None,
                        })
                    };

                    if let Some((key, ts)) = hit {
                        let observed = match self.config.key_map.category_for(key) {
                            Some(c) => Observed::Category(c.clone()),
                            None => Observed::Unmapped(key),
                        };
                        self.close_response(observed, Some(ts - onset), now);
                    } else if trial.response_deadline().is_some_and(|d| now >= d) {
                        self.close_response(Observed::NoResponse, None, now);
                    } else {
                        return Ok(());
                    }
                }
                TrialState::Feedback => {
                    let start = trial.timestamps.feedback_start.unwrap_or(now);
                    if now.saturating_sub(start) < trial.durations.feedback_ns {
                        return Ok(());
                    }
                    trial.state = TrialState::Complete;
                }
                TrialState::Complete => {
                    self.complete_current(now, out)?;
                    return Ok(());
                }
            }
        }
    }

    /// Ends the response phase: classifies and decides on feedback.
    fn close_response(&mut self, observed: Observed, reaction_ns: Option<u64>, now: u64) {
        let segment = self.segment;
        let show_feedback = self.feedback_for_outcome_enabled(&observed);
        let Some(trial) = self.current.as_mut() else {
            return;
        };
        let result = TrialResult::new(&trial.trial, segment, observed, reaction_ns);
        info!(
            trial = result.trial_id,
            correct = %result.correct_category,
            observed = result.observed.label(),
            rt_ms = reaction_ns.map(|ns| ns as f64 / 1_000_000.0),
            outcome = %result.outcome,
            "response window closed"
        );
        trial.result = Some(result);

        if show_feedback && trial.durations.feedback_ns > 0 {
            trial.state = TrialState::Feedback;
            trial.timestamps.feedback_start = Some(now);
        } else {
            trial.state = TrialState::Complete;
        }
    }

    fn feedback_for_outcome_enabled(&self, observed: &Observed) -> bool {
        !matches!(
            (observed, self.config.no_response_feedback),
            (Observed::NoResponse, NoResponseFeedback::Skip)
        )
    }

    /// Appends the finished trial to the log and handles segment
    /// boundaries.
    fn complete_current(
        &mut self,
        now: u64,
        out: &mut Vec<RunnerEvent>,
    ) -> Result<(), ExperimentError> {
        let Some(trial) = self.current.take() else {
            return Ok(());
        };
        if let Some(result) = trial.result {
            self.results.push(result.clone());
            self.pending.push(result.clone());
            out.push(RunnerEvent::TrialComplete(result));
        }

        let is_final = self.next_index >= self.plan.len();
        let interval = self.config.break_interval;
        let boundary = (interval > 0 && self.pending.len() >= interval) || is_final;
        if !boundary {
            self.start_next(now, out);
            return Ok(());
        }

        let stats = SegmentStats::from_results(&self.pending);
        self.flush(out)?;

        if is_final && !self.config.break_after_final {
            self.enter(SessionPhase::Debrief, now);
        } else {
            info!(segment = self.segment - 1, accuracy = stats.accuracy_pct(), "break");
            self.break_stats = Some(stats);
            out.push(RunnerEvent::BreakStarted {
                segment: self.segment - 1,
            });
            self.enter(SessionPhase::Break, now);
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Vec<RunnerEvent>) -> Result<(), ExperimentError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.sink.write_segment(self.segment, &self.pending)?;
        out.push(RunnerEvent::SegmentSaved {
            segment: self.segment,
            rows: self.pending.len(),
        });
        self.segments_saved += 1;
        self.segment += 1;
        self.pending.clear();
        Ok(())
    }

    /// Quit: drop the unsaved segment, keep what was already flushed.
    fn abort(&mut self, out: &mut Vec<RunnerEvent>) {
        let dropped = self.pending.len();
        warn!(
            completed = self.results.len(),
            dropped,
            saved_segments = self.segments_saved,
            "session aborted"
        );
        self.pending.clear();
        self.current = None;
        self.break_stats = None;
        self.phase = SessionPhase::Aborted;
        out.push(RunnerEvent::Aborted { dropped });
    }

    /// What the surface should show right now.
    pub fn frame(&self) -> Frame {
        match self.phase {
            SessionPhase::Instructions => Frame::text(self.config.instructions.iter().cloned()),
            SessionPhase::Trials => self.trial_frame(),
            SessionPhase::Break => {
                let mut lines = vec![
                    self.config.break_text.clone(),
                    format!("Trials Remaining: {}", self.remaining()),
                ];
                if self.config.show_break_stats {
                    if let Some(stats) = &self.break_stats {
                        lines.extend(stats.lines());
                    }
                }
                Frame::text(lines)
            }
            SessionPhase::Debrief => Frame::text([self.config.debrief_text.clone()]),
            SessionPhase::Finished | SessionPhase::Aborted => Frame::Blank,
        }
    }

    fn trial_frame(&self) -> Frame {
        let Some(active) = &self.current else {
            return Frame::Blank;
        };
        let trial = &active.trial;
        let place = |asset: &AssetRef, size| Placement {
            asset: asset.clone(),
            size,
        };
        match active.state {
            TrialState::Fixation => Frame::Fixation,
            TrialState::DistractorOnly => match &trial.distractor {
                Some(d) => Frame::Stimulus {
                    trial: trial.id,
                    base: place(d, self.config.stimulus_box),
                    overlay: None,
                },
                None => Frame::Blank,
            },
            TrialState::Response => match &trial.distractor {
                Some(d) => Frame::Stimulus {
                    trial: trial.id,
                    base: place(d, self.config.stimulus_box),
                    overlay: Some(place(&trial.stimulus, self.config.target_box)),
                },
                None => Frame::Stimulus {
                    trial: trial.id,
                    base: place(&trial.stimulus, self.config.stimulus_box),
                    overlay: None,
                },
            },
            TrialState::Feedback => match active.result.as_ref().map(|r| r.outcome) {
                Some(Outcome::Correct) => Frame::feedback("Correct", Tone::Positive),
                Some(Outcome::NoResponse)
                    if self.config.no_response_feedback == NoResponseFeedback::NoResponse =>
                {
                    Frame::feedback("No Response", Tone::Negative)
                }
                Some(_) => Frame::feedback("Incorrect", Tone::Negative),
                None => Frame::Blank,
            },
            TrialState::Complete => Frame::Blank,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn plan(&self) -> &[Trial] {
        &self.plan
    }

    /// Every image placement the plan will present, deduplicated.
    pub fn placements(&self) -> Vec<Placement> {
        let mut out: Vec<Placement> = Vec::new();
        let mut push = |asset: &AssetRef, size| {
            let p = Placement {
                asset: asset.clone(),
                size,
            };
            if !out.contains(&p) {
                out.push(p);
            }
        };
        for trial in &self.plan {
            match &trial.distractor {
                Some(d) => {
                    push(d, self.config.stimulus_box);
                    push(&trial.stimulus, self.config.target_box);
                }
                None => push(&trial.stimulus, self.config.stimulus_box),
            }
        }
        out
    }

    pub fn results(&self) -> &[TrialResult] {
        &self.results
    }

    pub fn pending(&self) -> &[TrialResult] {
        &self.pending
    }

    pub fn segment(&self) -> u32 {
        self.segment
    }

    pub fn segments_saved(&self) -> u32 {
        self.segments_saved
    }

    pub fn remaining(&self) -> usize {
        self.plan.len() - self.next_index
    }

    pub fn current_trial_state(&self) -> Option<TrialState> {
        self.current.as_ref().map(|t| t.state)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn report(&self) -> SessionReport {
        SessionReport {
            completion: if self.phase == SessionPhase::Aborted {
                Completion::Aborted
            } else {
                Completion::Finished
            },
            stats: SegmentStats::from_results(&self.results),
            results: self.results.clone(),
            segments_saved: self.segments_saved,
        }
    }
}

fn open_response(trial: &mut ActiveTrial, now: u64, out: &mut Vec<RunnerEvent>) {
    trial.state = TrialState::Response;
    trial.timestamps.stimulus_onset = Some(now);
    debug!(trial = trial.trial.id, at_ns = now, "stimulus onset");
    out.push(RunnerEvent::StimulusOnset {
        trial: trial.trial.id,
        at_ns: now,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlanStrategy;
    use catex_core::{AssetRef, Category, Key};
    use catex_timing::ManualTimer;
    use std::time::Duration;

    #[derive(Default)]
    struct Recording {
        segments: Vec<(u32, usize)>,
    }

    impl ResultSink for Recording {
        fn write_segment(
            &mut self,
            segment: u32,
            rows: &[TrialResult],
        ) -> Result<(), ExperimentError> {
            self.segments.push((segment, rows.len()));
            Ok(())
        }
    }

    fn config() -> ExperimentConfig {
        ExperimentConfig {
            fixation_ms: 500,
            response_window_ms: 1500,
            feedback_ms: 500,
            debrief_ms: 3000,
            break_interval: 2,
            plan: PlanStrategy::Catalog { limit: None },
            no_response_feedback: NoResponseFeedback::Skip,
            ..ExperimentConfig::emotion()
        }
    }

    fn trial(id: usize, category: &str) -> Trial {
        Trial {
            id,
            category: Category::new(category),
            distractor_category: None,
            stimulus: AssetRef::new(Category::new(category), format!("{category}{id}.png")),
            distractor: None,
        }
    }

    fn key(timer: &ManualTimer, c: char) -> InputEvent {
        InputEvent::KeyDown {
            key: Key::Char(c),
            timestamp_ns: timer.now(),
        }
    }

    fn step(runner: &mut TrialRunner<ManualTimer, Recording>, ms: u64) -> Vec<RunnerEvent> {
        runner.timer.advance(Duration::from_millis(ms));
        runner.update(&[]).unwrap()
    }

    fn runner(plan: Vec<Trial>) -> TrialRunner<ManualTimer, Recording> {
        TrialRunner::new(config(), plan, ManualTimer::new(), Recording::default())
    }

    fn start(runner: &mut TrialRunner<ManualTimer, Recording>) {
        let space = InputEvent::KeyDown {
            key: Key::Space,
            timestamp_ns: runner.timer.now(),
        };
        let events = runner.update(&[space]).unwrap();
        assert_eq!(events[0], RunnerEvent::SessionStarted);
    }

    #[test]
    fn waits_on_instructions_until_resume_key() {
        let mut r = runner(vec![trial(0, "happy")]);
        assert!(step(&mut r, 10_000).is_empty());
        assert_eq!(r.phase(), SessionPhase::Instructions);
        assert!(matches!(r.frame(), Frame::Text { .. }));

        start(&mut r);
        assert_eq!(r.phase(), SessionPhase::Trials);
        assert_eq!(r.frame(), Frame::Fixation);
    }

    #[test]
    fn correct_response_measures_from_onset() {
        let mut r = runner(vec![trial(0, "happy")]);
        start(&mut r);

        let events = step(&mut r, 500);
        assert!(matches!(events[0], RunnerEvent::StimulusOnset { trial: 0, .. }));
        assert!(r.frame().is_stimulus());

        r.timer.advance(Duration::from_millis(300));
        let press = key(&r.timer, 'j');
        r.update(&[press]).unwrap();
        assert_eq!(r.current_trial_state(), Some(TrialState::Feedback));
        assert_eq!(r.frame(), Frame::feedback("Correct", Tone::Positive));

        let events = step(&mut r, 500);
        let RunnerEvent::TrialComplete(result) = &events[0] else {
            panic!("expected completion, got {events:?}");
        };
        assert_eq!(result.outcome, Outcome::Correct);
        assert_eq!(result.reaction_time_ns, Some(300_000_000));
        assert_eq!(result.segment, 1);
    }

    #[test]
    fn keys_before_onset_are_discarded() {
        let mut r = runner(vec![trial(0, "happy")]);
        start(&mut r);

        r.timer.advance(Duration::from_millis(200));
        let early = key(&r.timer, 'j');
        r.update(&[early]).unwrap();

        // Pressed during fixation, delivered in the onset tick.
        r.timer.advance(Duration::from_millis(300));
        let late_delivery = InputEvent::KeyDown {
            key: Key::Char('j'),
            timestamp_ns: r.timer.now() - 1,
        };
        r.update(&[late_delivery]).unwrap();
        assert_eq!(r.current_trial_state(), Some(TrialState::Response));

        step(&mut r, 1499);
        assert_eq!(r.current_trial_state(), Some(TrialState::Response));
        step(&mut r, 1);
        assert_eq!(r.results()[0].outcome, Outcome::NoResponse);
        assert_eq!(r.results()[0].reaction_time_ns, None);
    }

    #[test]
    fn unmapped_key_closes_window_as_incorrect() {
        let mut r = runner(vec![trial(0, "angry")]);
        start(&mut r);
        step(&mut r, 500);

        r.timer.advance(Duration::from_millis(120));
        let press = key(&r.timer, 'x');
        r.update(&[press]).unwrap();
        step(&mut r, 500);

        let result = &r.results()[0];
        assert_eq!(result.observed, Observed::Unmapped(Key::Char('x')));
        assert_eq!(result.outcome, Outcome::Incorrect);
        assert_eq!(result.reaction_time_ns, Some(120_000_000));
    }

    #[test]
    fn skips_feedback_on_timeout_when_configured() {
        let mut r = runner(vec![trial(0, "happy"), trial(1, "neutral"), trial(2, "angry")]);
        start(&mut r);
        step(&mut r, 500);
        let events = step(&mut r, 1500);

        assert!(events.iter().any(|e| matches!(e, RunnerEvent::TrialComplete(_))));
        assert!(events.iter().any(|e| matches!(e, RunnerEvent::TrialStarted { trial: 1 })));
        assert_eq!(r.frame(), Frame::Fixation);
    }

    #[test]
    fn breaks_flush_each_segment() {
        let plan = (0..5).map(|i| trial(i, "happy")).collect();
        let mut r = runner(plan);
        start(&mut r);

        for done in 1..=5 {
            step(&mut r, 500);
            let events = step(&mut r, 1500);
            assert!(events.iter().any(|e| matches!(e, RunnerEvent::TrialComplete(_))));
            if done % 2 == 0 {
                assert_eq!(r.phase(), SessionPhase::Break);
                let Frame::Text { lines, .. } = r.frame() else {
                    panic!("break screen");
                };
                assert_eq!(lines[1], format!("Trials Remaining: {}", 5 - done));
                let space = InputEvent::KeyDown {
                    key: Key::Space,
                    timestamp_ns: r.timer.now(),
                };
                let events = r.update(&[space]).unwrap();
                assert_eq!(events[0], RunnerEvent::Resumed);
            }
        }

        assert_eq!(r.phase(), SessionPhase::Debrief);
        assert_eq!(r.sink().segments, vec![(1, 2), (2, 2), (3, 1)]);
        assert_eq!(r.segment(), 4);
        let segments: Vec<u32> = r.results().iter().map(|x| x.segment).collect();
        assert_eq!(segments, vec![1, 1, 2, 2, 3]);

        step(&mut r, 2999);
        assert_eq!(r.phase(), SessionPhase::Debrief);
        let events = step(&mut r, 1);
        assert_eq!(events, vec![RunnerEvent::SessionFinished]);
        assert_eq!(r.report().completion, Completion::Finished);
    }

    #[test]
    fn quit_drops_unsaved_segment() {
        let plan = (0..5).map(|i| trial(i, "happy")).collect();
        let mut r = runner(plan);
        start(&mut r);
        for _ in 0..3 {
            step(&mut r, 500);
            step(&mut r, 1500);
            if r.phase() == SessionPhase::Break {
                let space = InputEvent::KeyDown {
                    key: Key::Space,
                    timestamp_ns: r.timer.now(),
                };
                r.update(&[space]).unwrap();
            }
        }
        // Third trial sits in the unsaved second segment.
        step(&mut r, 100);
        let events = r.update(&[InputEvent::Quit]).unwrap();
        assert_eq!(events, vec![RunnerEvent::Aborted { dropped: 1 }]);
        assert_eq!(r.phase(), SessionPhase::Aborted);
        assert_eq!(r.sink().segments, vec![(1, 2)]);
        assert!(r.pending().is_empty());
        assert!(step(&mut r, 1000).is_empty());
        assert_eq!(r.report().completion, Completion::Aborted);
    }

    #[test]
    fn escape_quits_during_fixation() {
        let mut r = runner(vec![trial(0, "happy")]);
        start(&mut r);
        let esc = InputEvent::KeyDown {
            key: Key::Escape,
            timestamp_ns: r.timer.now(),
        };
        r.update(&[esc]).unwrap();
        assert!(r.is_done());
        assert!(r.results().is_empty());
    }

    #[test]
    fn flanker_shows_distractor_then_overlays_target() {
        let mut cfg = config();
        cfg.distractor_only_ms = Some(1000);
        cfg.key_map = catex_core::KeyMap::from_pairs([('j', "circle"), ('k', "square")]);
        let t = Trial {
            id: 0,
            category: Category::new("circle"),
            distractor_category: Some(Category::new("angry")),
            stimulus: AssetRef::new(Category::new("circle"), "c.png"),
            distractor: Some(AssetRef::new(Category::new("angry"), "a.png")),
        };
        let mut r = TrialRunner::new(cfg, vec![t], ManualTimer::new(), Recording::default());
        start(&mut r);

        let events = step(&mut r, 500);
        assert!(events.is_empty());
        assert_eq!(r.current_trial_state(), Some(TrialState::DistractorOnly));
        let Frame::Stimulus { base, overlay, .. } = r.frame() else {
            panic!("distractor frame");
        };
        assert_eq!(base.asset.path, std::path::PathBuf::from("a.png"));
        assert!(overlay.is_none());

        let events = step(&mut r, 1000);
        assert!(matches!(events[0], RunnerEvent::StimulusOnset { .. }));
        let Frame::Stimulus { overlay: Some(target), .. } = r.frame() else {
            panic!("target overlay");
        };
        assert_eq!(target.size, (200, 200));

        r.timer.advance(Duration::from_millis(250));
        let press = key(&r.timer, 'j');
        r.update(&[press]).unwrap();
        step(&mut r, 500);
        let result = &r.results()[0];
        assert!(result.is_correct());
        assert_eq!(result.distractor_category, Some(Category::new("angry")));
        assert_eq!(result.reaction_time_ns, Some(250_000_000));
    }

    fn resume(r: &mut TrialRunner<ManualTimer, Recording>) -> Vec<RunnerEvent> {
        let space = InputEvent::KeyDown {
            key: Key::Space,
            timestamp_ns: r.timer.now(),
        };
        r.update(&[space]).unwrap()
    }

    fn timed_out_feedback(feedback: NoResponseFeedback) -> Frame {
        let mut cfg = config();
        cfg.no_response_feedback = feedback;
        let mut r = TrialRunner::new(
            cfg,
            vec![trial(0, "happy")],
            ManualTimer::new(),
            Recording::default(),
        );
        start(&mut r);
        step(&mut r, 500);
        step(&mut r, 1500);
        assert_eq!(r.current_trial_state(), Some(TrialState::Feedback));
        r.frame()
    }

    #[test]
    fn timeout_feedback_follows_config() {
        assert_eq!(
            timed_out_feedback(NoResponseFeedback::Incorrect),
            Frame::feedback("Incorrect", Tone::Negative)
        );
        assert_eq!(
            timed_out_feedback(NoResponseFeedback::NoResponse),
            Frame::feedback("No Response", Tone::Negative)
        );
    }

    #[test]
    fn break_after_final_trial_then_debrief() {
        let mut cfg = config();
        cfg.break_after_final = true;
        cfg.no_response_feedback = NoResponseFeedback::Incorrect;
        let mut r = TrialRunner::new(
            cfg,
            vec![trial(0, "happy")],
            ManualTimer::new(),
            Recording::default(),
        );
        start(&mut r);
        step(&mut r, 500);
        step(&mut r, 1500);
        let events = step(&mut r, 500);

        assert!(events.contains(&RunnerEvent::SegmentSaved { segment: 1, rows: 1 }));
        assert!(events.contains(&RunnerEvent::BreakStarted { segment: 1 }));
        assert_eq!(r.phase(), SessionPhase::Break);
        assert_eq!(r.sink().segments, vec![(1, 1)]);
        let Frame::Text { lines, .. } = r.frame() else {
            panic!("break screen");
        };
        assert_eq!(lines[1], "Trials Remaining: 0");

        let events = resume(&mut r);
        assert_eq!(events[0], RunnerEvent::Resumed);
        assert_eq!(r.phase(), SessionPhase::Debrief);
        assert_eq!(r.sink().segments, vec![(1, 1)]);
    }

    #[test]
    fn flanker_practice_break_shows_segment_stats() {
        let cfg = ExperimentConfig {
            break_interval: 1,
            ..ExperimentConfig::flanker_practice()
        };
        let plan = (0..2)
            .map(|id| Trial {
                id,
                category: Category::new("circle"),
                distractor_category: Some(Category::new("happy")),
                stimulus: AssetRef::new(Category::new("circle"), "c.png"),
                distractor: Some(AssetRef::new(Category::new("happy"), "h.png")),
            })
            .collect();
        let mut r = TrialRunner::new(cfg, plan, ManualTimer::new(), Recording::default());
        start(&mut r);
        step(&mut r, 500);
        step(&mut r, 1000);
        r.timer.advance(Duration::from_millis(300));
        let press = key(&r.timer, 'j');
        r.update(&[press]).unwrap();
        step(&mut r, 500);

        assert_eq!(r.phase(), SessionPhase::Break);
        assert_eq!(
            r.frame(),
            Frame::text([
                "Take a short break! Press SPACE to continue.".to_string(),
                "Trials Remaining: 1".to_string(),
                "Accuracy: 100.00%".to_string(),
                "Average Reaction Time: 0.30 seconds".to_string(),
            ])
        );
        assert_eq!(resume(&mut r)[0], RunnerEvent::Resumed);
        assert_eq!(r.phase(), SessionPhase::Trials);
    }
}
