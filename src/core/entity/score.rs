use serde::{Deserialize, Serialize};

/// 0–100 summary of how an execution's techniques fared against the
/// defenses: blocked is full credit, detected partial, successful none.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SecurityScore {
    pub overall: f64,
    pub blocked: usize,
    pub detected: usize,
    pub successful: usize,
    /// Count of results that actually ran to a scored outcome; skipped
    /// results are excluded.
    pub total: usize,
}

impl SecurityScore {
    pub fn zero() -> Self {
        Self {
            overall: 0.0,
            blocked: 0,
            detected: 0,
            successful: 0,
            total: 0,
        }
    }
}
