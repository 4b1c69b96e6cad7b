use crate::error::ExperimentError;
use catex_core::{Frame, InputEvent};
use std::time::Duration;

/// The display/input collaborator a session runs against.
///
/// A window implements it for real runs; tests script one. Timestamps on
/// key events must come from the same clock the runner was built with.
pub trait Surface {
    /// Draw `frame` and make it visible. Returns once submitted.
    fn present(&mut self, frame: &Frame) -> Result<(), ExperimentError>;

    /// Events since the last call. Never blocks.
    fn poll_events(&mut self) -> Result<Vec<InputEvent>, ExperimentError>;

    /// Suspend for `d` while keeping the window alive.
    fn sleep(&mut self, d: Duration);
}
