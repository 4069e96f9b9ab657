//! Executor limits, loadable from `neon.toml`.
//!
//! ```toml
//! stack_capacity = 300
//! call_depth = 300
//! frame_depth = 1000
//! enable_assert = true
//! alloc_limit = 16777216
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_STACK_CAPACITY: usize = 300;
pub const DEFAULT_CALL_DEPTH: usize = 300;
pub const DEFAULT_FRAME_DEPTH: usize = 1000;
pub const DEFAULT_ALLOC_LIMIT: usize = 1 << 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Operand stack capacity, in cells.
    pub stack_capacity: usize,
    /// Maximum nesting of `CALLF`; exceeding it is fatal.
    pub call_depth: usize,
    pub frame_depth: usize,
    /// When false, `JNASSERT` jumps over assertion code.
    pub enable_assert: bool,
    /// Largest array or frame, in cells, that one instruction may create.
    pub alloc_limit: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            stack_capacity: DEFAULT_STACK_CAPACITY,
            call_depth: DEFAULT_CALL_DEPTH,
            frame_depth: DEFAULT_FRAME_DEPTH,
            enable_assert: true,
            alloc_limit: DEFAULT_ALLOC_LIMIT,
        }
    }
}

impl ExecutorConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
        Self::from_toml_str(&content)
            .map_err(|e| format!("invalid toml in '{}': {}", path.display(), e))
    }
}
