use crate::input::{Category, Key};
use crate::stimulus::AssetRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Position inside a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    Fixation,
    /// Flanker layout: distractor alone before the target appears.
    DistractorOnly,
    Response,
    Feedback,
    Complete,
}

/// One planned presentation. Immutable once the plan is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub id: usize,
    pub category: Category,
    pub distractor_category: Option<Category>,
    pub stimulus: AssetRef,
    pub distractor: Option<AssetRef>,
}

/// What the participant did during the response window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Observed {
    Category(Category),
    /// A key that is not bound to any category. Still ends the window.
    Unmapped(Key),
    NoResponse,
}

impl Observed {
    pub fn label(&self) -> &str {
        match self {
            Observed::Category(c) => c.as_str(),
            Observed::Unmapped(_) => "Unmapped",
            Observed::NoResponse => "No Response",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Correct,
    Incorrect,
    NoResponse,
}

impl Outcome {
    pub fn classify(observed: &Observed, correct: &Category) -> Self {
        match observed {
            Observed::NoResponse => Outcome::NoResponse,
            Observed::Category(c) if c == correct => Outcome::Correct,
            _ => Outcome::Incorrect,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Correct => "Correct",
            Outcome::Incorrect => "Incorrect",
            Outcome::NoResponse => "No Response",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Recorded result per trial. `outcome` is always derived from `observed`
/// and the trial's category, never set independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub trial_id: usize,
    pub segment: u32,
    pub correct_category: Category,
    pub distractor_category: Option<Category>,
    pub observed: Observed,
    pub reaction_time_ns: Option<u64>,
    pub outcome: Outcome,
}

impl TrialResult {
    pub fn new(
        trial: &Trial,
        segment: u32,
        observed: Observed,
        reaction_time_ns: Option<u64>,
    ) -> Self {
        let outcome = Outcome::classify(&observed, &trial.category);
        Self {
            trial_id: trial.id,
            segment,
            correct_category: trial.category.clone(),
            distractor_category: trial.distractor_category.clone(),
            observed,
            reaction_time_ns,
            outcome,
        }
    }

    pub fn reaction_time(&self) -> Option<Duration> {
        self.reaction_time_ns.map(Duration::from_nanos)
    }

    pub fn is_correct(&self) -> bool {
        self.outcome == Outcome::Correct
    }
}
