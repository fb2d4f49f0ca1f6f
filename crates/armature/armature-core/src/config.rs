//! Core configuration for armature-core.

use serde::{Deserialize, Serialize};

/// Tolerances for inverting a Bezier segment's X polynomial.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BezierSolver {
    /// Upper bound on bisection steps.
    pub max_iterations: u32,
    /// Accept a parameter once its X is within this distance of the target.
    pub epsilon: f32,
}

impl Default for BezierSolver {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            epsilon: 1e-5,
        }
    }
}

/// Per-skeleton configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bezier: BezierSolver,
    /// Deepest bone (root = depth 0) a skeleton accepts.
    pub max_hierarchy_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bezier: BezierSolver::default(),
            max_hierarchy_depth: 1024,
        }
    }
}
