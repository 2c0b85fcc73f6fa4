use std::fmt;

/// Whether the target process tree is the only audio captured or the only
/// audio left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoopbackMode {
    IncludeTargetProcessTree,
    #[default]
    ExcludeTargetProcessTree,
}

impl LoopbackMode {
    /// Numeric value of `PROCESS_LOOPBACK_MODE`.
    pub fn raw(self) -> i32 {
        match self {
            Self::IncludeTargetProcessTree => 0,
            Self::ExcludeTargetProcessTree => 1,
        }
    }
}

impl fmt::Display for LoopbackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncludeTargetProcessTree => f.write_str("including"),
            Self::ExcludeTargetProcessTree => f.write_str("excluding"),
        }
    }
}

/// Parameters for activating the process-loopback virtual capture endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivationRequest {
    target_process_id: u32,
    mode: LoopbackMode,
}

impl ActivationRequest {
    pub fn new(target_process_id: u32, mode: LoopbackMode) -> Self {
        Self { target_process_id, mode }
    }

    pub fn target_process_id(&self) -> u32 {
        self.target_process_id
    }

    pub fn mode(&self) -> LoopbackMode {
        self.mode
    }
}

impl fmt::Display for ActivationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} PID {} tree", self.mode, self.target_process_id)
    }
}
