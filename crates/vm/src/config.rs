//! Execution limits.

/// Default limit on nested calls into interpreted code.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 200;

/// Configuration shared by every frame of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Deepest allowed interpreted call. The top-level frame is depth 0.
    pub max_call_depth: usize,
}

impl VmConfig {
    /// Set the call depth limit.
    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}
