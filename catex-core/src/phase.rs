/// Coarse position of a session. Trials and breaks alternate until the plan
/// is exhausted; `Finished` and `Aborted` are terminal.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Instructions,
    Trials,
    Break,
    Debrief,
    Finished,
    Aborted,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Aborted)
    }
}
