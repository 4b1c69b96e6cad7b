use catex_core::{Outcome, TrialResult};
use std::time::Duration;

/// Summary over a run of results, shown on break screens and logged at the
/// end of a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentStats {
    pub trials: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub no_response: usize,
    /// Mean over trials that have a reaction time.
    pub mean_reaction_time: Option<Duration>,
}

impl SegmentStats {
    pub fn from_results(results: &[TrialResult]) -> Self {
        let mut stats = Self {
            trials: results.len(),
            ..Self::default()
        };
        let mut rt_sum: u128 = 0;
        let mut rt_count: u32 = 0;

        for r in results {
            match r.outcome {
                Outcome::Correct => stats.correct += 1,
                Outcome::Incorrect => stats.incorrect += 1,
                Outcome::NoResponse => stats.no_response += 1,
            }
            if let Some(rt) = r.reaction_time_ns {
                rt_sum += rt as u128;
                rt_count += 1;
            }
        }
        if rt_count > 0 {
            let mean = (rt_sum / rt_count as u128) as u64;
            stats.mean_reaction_time = Some(Duration::from_nanos(mean));
        }
        stats
    }

    /// Percent of trials classified correct, 0 for an empty segment.
    pub fn accuracy_pct(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.correct as f64 / self.trials as f64 * 100.0
        }
    }

    pub fn lines(&self) -> Vec<String> {
        let rt = self
            .mean_reaction_time
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        vec![
            format!("Accuracy: {:.2}%", self.accuracy_pct()),
            format!("Average Reaction Time: {:.2} seconds", rt),
        ]
    }
}
