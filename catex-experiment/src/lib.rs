pub mod catalog;
pub mod config;
pub mod error;
pub mod participant;
pub mod persist;
pub mod plan;
pub mod session;
pub mod state;
pub mod stats;
pub mod surface;
pub mod trial;

pub use catalog::{DirectoryCatalog, StimulusCatalog};
pub use config::{
    ExperimentConfig, NoResponseFeedback, PRESETS, PlanStrategy, QUIT_KEY, StimulusFolder,
};
pub use error::ExperimentError;
pub use participant::{FormStatus, Participant, ParticipantForm};
pub use persist::{CsvSink, NullSink, ResultSink};
pub use plan::build_plan;
pub use session::{Completion, SessionReport, collect_participant, run_session};
pub use state::{RunnerEvent, TrialRunner};
pub use stats::SegmentStats;
pub use surface::Surface;
pub use trial::{ActiveTrial, TrialDurations, TrialTimestamps};
