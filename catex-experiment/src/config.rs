use crate::error::ExperimentError;
use catex_core::{Category, Key, KeyMap};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How the trial plan is drawn from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanStrategy {
    /// Every catalog image once, shuffled, optionally truncated.
    Catalog { limit: Option<usize> },
    /// `trials` independent uniform draws of target (and distractor)
    /// category, then shuffled.
    Sampled { trials: usize },
}

/// What to show after a trial that timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoResponseFeedback {
    Skip,
    Incorrect,
    NoResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusFolder {
    pub category: Category,
    pub folder: PathBuf,
}

impl StimulusFolder {
    pub fn new(category: &str, folder: impl Into<PathBuf>) -> Self {
        Self {
            category: Category::new(category),
            folder: folder.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub title: String,
    pub instructions: Vec<String>,

    pub fixation_ms: u64,
    /// Flanker layout only: distractor shown alone before the target.
    pub distractor_only_ms: Option<u64>,
    pub response_window_ms: u64,
    pub feedback_ms: u64,
    pub debrief_ms: u64,
    /// Cooperative scheduler period; input is drained every tick.
    pub tick_ms: u64,

    /// Trials per segment. 0 disables breaks.
    pub break_interval: usize,
    pub break_after_final: bool,
    pub break_text: String,
    pub show_break_stats: bool,
    pub debrief_text: String,

    pub plan: PlanStrategy,
    pub targets: Vec<StimulusFolder>,
    pub distractors: Vec<StimulusFolder>,
    pub key_map: KeyMap,
    pub resume_key: Key,
    pub no_response_feedback: NoResponseFeedback,

    pub persist: bool,
    pub output_dir: PathBuf,
    pub output_suffix: String,

    pub stimulus_box: (u32, u32),
    pub target_box: (u32, u32),
}

pub const QUIT_KEY: Key = Key::Escape;

pub const PRESETS: &[&str] = &["emotion", "emotion-practice", "flanker", "flanker-practice"];

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self::emotion()
    }
}

impl ExperimentConfig {
    /// Full emotion categorisation run: every face image once, 25-trial
    /// segments, results appended to `<name>_<number>_results.csv`.
    pub fn emotion() -> Self {
        Self {
            title: "Emotion Categorization Experiment".into(),
            instructions: vec![
                "Press J for Happy, K for Neutral, L for Angry.".into(),
                "Press SPACE to start.".into(),
            ],
            fixation_ms: 500,
            distractor_only_ms: None,
            response_window_ms: 1500,
            feedback_ms: 500,
            debrief_ms: 3000,
            tick_ms: 1,
            break_interval: 25,
            break_after_final: false,
            break_text: "Take a short break! Press SPACE to continue.".into(),
            show_break_stats: false,
            debrief_text: "Experiment Completed! Results saved.".into(),
            plan: PlanStrategy::Catalog { limit: Some(200) },
            targets: vec![
                StimulusFolder::new("happy", "distractors/happy"),
                StimulusFolder::new("neutral", "distractors/neutral"),
                StimulusFolder::new("angry", "distractors/angry"),
            ],
            distractors: Vec::new(),
            key_map: KeyMap::from_pairs([('j', "happy"), ('k', "neutral"), ('l', "angry")]),
            resume_key: Key::Space,
            no_response_feedback: NoResponseFeedback::Skip,
            persist: true,
            output_dir: PathBuf::from("."),
            output_suffix: "_results".into(),
            stimulus_box: (400, 400),
            target_box: (200, 200),
        }
    }

    pub fn emotion_practice() -> Self {
        Self {
            title: "Emotion Categorization Practice".into(),
            instructions: vec![
                "Practice Session".into(),
                "Press J for Happy, K for Neutral, L for Angry.".into(),
                "Press SPACE to start.".into(),
            ],
            break_interval: 10,
            show_break_stats: true,
            debrief_text: "Practice Completed!".into(),
            plan: PlanStrategy::Catalog { limit: Some(50) },
            no_response_feedback: NoResponseFeedback::Incorrect,
            persist: false,
            ..Self::emotion()
        }
    }

    /// Shape categorisation with an emotional face behind the target.
    pub fn flanker() -> Self {
        Self {
            title: "Emotion Categorization Experiment 2".into(),
            instructions: vec![
                "Primary Task: Categorize the shape in the center.".into(),
                "Press J for Circle, K for Square, L for Triangle.".into(),
                "Ignore the image around the shape.".into(),
                "Press SPACE to start.".into(),
            ],
            distractor_only_ms: Some(1000),
            response_window_ms: 2000,
            break_after_final: true,
            plan: PlanStrategy::Sampled { trials: 200 },
            targets: vec![
                StimulusFolder::new("circle", "shapes/circle"),
                StimulusFolder::new("square", "shapes/square"),
                StimulusFolder::new("triangle", "shapes/triangle"),
            ],
            distractors: vec![
                StimulusFolder::new("happy", "distractors/happy"),
                StimulusFolder::new("angry", "distractors/angry"),
                StimulusFolder::new("neutral", "distractors/neutral"),
            ],
            key_map: KeyMap::from_pairs([('j', "circle"), ('k', "square"), ('l', "triangle")]),
            no_response_feedback: NoResponseFeedback::Incorrect,
            output_suffix: "_exp2_results".into(),
            ..Self::emotion()
        }
    }

    pub fn flanker_practice() -> Self {
        Self {
            title: "Emotion Categorization Experiment (Trial Version)".into(),
            break_interval: 10,
            show_break_stats: true,
            plan: PlanStrategy::Sampled { trials: 30 },
            debrief_text: "Practice Completed!".into(),
            persist: false,
            ..Self::flanker()
        }
    }

    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "emotion" => Some(Self::emotion()),
            "emotion-practice" => Some(Self::emotion_practice()),
            "flanker" => Some(Self::flanker()),
            "flanker-practice" => Some(Self::flanker_practice()),
            _ => None,
        }
    }

    /// Reads a JSON config. Relative stimulus folders and the output
    /// directory resolve against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ExperimentError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ExperimentError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut config = Self::from_json_str(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ExperimentError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| ExperimentError::Config(format!("malformed config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for f in self.targets.iter_mut().chain(self.distractors.iter_mut()) {
            resolve(&mut f.folder);
        }
        resolve(&mut self.output_dir);
    }

    pub fn validate(&self) -> Result<(), ExperimentError> {
        let fail = |msg: String| Err(ExperimentError::Config(msg));

        if self.targets.is_empty() {
            return fail("at least one target category is required".into());
        }
        if self.response_window_ms == 0 {
            return fail("response_window_ms must be positive".into());
        }
        if self.tick_ms == 0 {
            return fail("tick_ms must be positive".into());
        }

        let mut seen = HashSet::new();
        for binding in self.key_map.bindings() {
            let key = binding.key.normalized();
            if !seen.insert(key) {
                return fail(format!("key `{key}` is bound more than once"));
            }
            if key == QUIT_KEY {
                return fail(format!("key `{key}` is reserved for quitting"));
            }
            if key == self.resume_key.normalized() {
                return fail(format!("resume key `{key}` cannot also be a response key"));
            }
        }
        if self.resume_key.normalized() == QUIT_KEY {
            return fail("resume key cannot be the quit key".into());
        }

        // The catalog resolves folders by category name alone.
        let all = self.targets.iter().chain(&self.distractors);
        for (i, a) in all.clone().enumerate() {
            if let Some(b) = all.clone().skip(i + 1).find(|b| b.category == a.category) {
                if b.folder != a.folder {
                    return fail(format!(
                        "category `{}` maps to both {} and {}",
                        a.category,
                        a.folder.display(),
                        b.folder.display()
                    ));
                }
            }
        }

        match self.plan {
            PlanStrategy::Catalog { .. } if !self.distractors.is_empty() => {
                fail("the catalog plan does not draw distractors; use the sampled plan".into())
            }
            PlanStrategy::Sampled { trials: 0 } => {
                fail("sampled plan needs at least one trial".into())
            }
            _ => Ok(()),
        }
    }

    pub fn fixation(&self) -> Duration {
        Duration::from_millis(self.fixation_ms)
    }

    pub fn distractor_only(&self) -> Option<Duration> {
        self.distractor_only_ms.map(Duration::from_millis)
    }

    pub fn response_window(&self) -> Duration {
        Duration::from_millis(self.response_window_ms)
    }

    pub fn feedback(&self) -> Duration {
        Duration::from_millis(self.feedback_ms)
    }

    pub fn debrief(&self) -> Duration {
        Duration::from_millis(self.debrief_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn is_flanker(&self) -> bool {
        !self.distractors.is_empty()
    }
}
