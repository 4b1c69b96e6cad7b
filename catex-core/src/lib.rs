pub mod input;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use input::{Category, InputEvent, Key, KeyBinding, KeyMap};
pub use phase::SessionPhase;
pub use stimulus::{AssetRef, Frame, Placement, Tone};
pub use trial::{Observed, Outcome, Trial, TrialResult, TrialState};
