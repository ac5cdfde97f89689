//! Defensive-effectiveness scoring over a set of execution results.

use crate::core::entity::{ExecutionResult, ResultStatus, SecurityScore};

/// Credit model: a blocked technique earns full credit for the defenses, a
/// detected one partial credit, a technique that ran undetected none.
const BLOCKED_CREDIT: f64 = 1.0;
const DETECTED_CREDIT: f64 = 0.5;

pub struct ScoreCalculator;

impl ScoreCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Pure rollup of results into a [`SecurityScore`].
    ///
    /// Skipped results are excluded from the denominator so a cancelled run
    /// is scored on the subset that actually completed. With nothing scored,
    /// overall is 0.
    pub fn calculate(&self, results: &[ExecutionResult]) -> SecurityScore {
        let mut score = SecurityScore::zero();

        for result in results {
            match result.status {
                ResultStatus::Blocked => score.blocked += 1,
                ResultStatus::Detected => score.detected += 1,
                ResultStatus::Successful => score.successful += 1,
                _ => continue,
            }
            score.total += 1;
        }

        if score.total > 0 {
            let credits =
                score.blocked as f64 * BLOCKED_CREDIT + score.detected as f64 * DETECTED_CREDIT;
            score.overall = 100.0 * credits / score.total as f64;
        }

        score
    }
}

impl Default for ScoreCalculator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(status: ResultStatus) -> ExecutionResult {
        let mut r = ExecutionResult::pending("exec-1", "T1082", "paw-a");
        r.status = status;
        r
    }

    #[test]
    fn empty_results_score_zero() {
        let score = ScoreCalculator::new().calculate(&[]);
        assert_eq!(score.overall, 0.0);
        assert_eq!(score.total, 0);
    }

    #[test]
    fn all_blocked_is_a_perfect_score() {
        let results = vec![
            result_with(ResultStatus::Blocked),
            result_with(ResultStatus::Blocked),
        ];
        let score = ScoreCalculator::new().calculate(&results);
        assert_eq!(score.overall, 100.0);
        assert_eq!(score.blocked, 2);
        assert_eq!(score.total, 2);
    }

    #[test]
    fn all_successful_scores_zero() {
        let results = vec![
            result_with(ResultStatus::Successful),
            result_with(ResultStatus::Successful),
        ];
        let score = ScoreCalculator::new().calculate(&results);
        assert_eq!(score.overall, 0.0);
        assert_eq!(score.successful, 2);
    }

    #[test]
    fn detected_earns_half_credit() {
        let results = vec![result_with(ResultStatus::Detected)];
        let score = ScoreCalculator::new().calculate(&results);
        assert_eq!(score.overall, 50.0);
        assert_eq!(score.detected, 1);
    }

    #[test]
    fn skipped_results_do_not_dilute_the_score() {
        let results = vec![
            result_with(ResultStatus::Blocked),
            result_with(ResultStatus::Skipped),
            result_with(ResultStatus::Skipped),
        ];
        let score = ScoreCalculator::new().calculate(&results);
        assert_eq!(score.overall, 100.0);
        assert_eq!(score.total, 1);
    }

    #[test]
    fn pending_and_running_are_not_counted() {
        let results = vec![
            result_with(ResultStatus::Pending),
            result_with(ResultStatus::Running),
            result_with(ResultStatus::Blocked),
        ];
        let score = ScoreCalculator::new().calculate(&results);
        assert_eq!(score.total, 1);
        assert_eq!(score.overall, 100.0);
    }

    #[test]
    fn mixed_outcomes_match_the_credit_model() {
        let results = vec![
            result_with(ResultStatus::Blocked),
            result_with(ResultStatus::Detected),
            result_with(ResultStatus::Detected),
        ];
        let score = ScoreCalculator::new().calculate(&results);
        assert_eq!(score.blocked, 1);
        assert_eq!(score.detected, 2);
        assert_eq!(score.total, 3);
        assert!((score.overall - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn overall_stays_within_bounds() {
        let statuses = [
            ResultStatus::Blocked,
            ResultStatus::Detected,
            ResultStatus::Successful,
            ResultStatus::Skipped,
        ];
        for a in statuses {
            for b in statuses {
                for c in statuses {
                    let results = vec![result_with(a), result_with(b), result_with(c)];
                    let score = ScoreCalculator::new().calculate(&results);
                    assert!((0.0..=100.0).contains(&score.overall));
                }
            }
        }
    }
}
