/// Capture loop state machine.
///
/// ```text
/// running ⇄ draining
///    ↓         ↓
///       stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopState {
    Running,
    Draining,
    Stopped,
}

impl LoopState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: LoopState) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Self::Running, Self::Draining)
                | (Self::Draining, Self::Running)
                | (Self::Running, Self::Stopped)
                | (Self::Draining, Self::Stopped)
        )
    }
}
