//! Partition of a block range into constant-balance spans.

use tally_core::error::WeightError;
use tally_core::types::{Amount, Checkpoint};

/// A half-open block span `[start, end)` over which the balance is constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BalanceInterval {
    pub start: u64,
    pub end: u64,
    pub balance: Amount,
}

impl BalanceInterval {
    /// Number of blocks in the span.
    pub fn blocks(&self) -> u64 {
        self.end - self.start
    }
}

/// Check that checkpoint heights are strictly increasing.
pub fn validate(checkpoints: &[Checkpoint]) -> Result<(), WeightError> {
    for pair in checkpoints.windows(2) {
        if pair[1].height <= pair[0].height {
            return Err(WeightError::UnorderedCheckpoints {
                height: pair[1].height,
            });
        }
    }
    Ok(())
}

/// Split `[since, target)` into spans bounded by checkpoint heights.
///
/// Blocks before the first checkpoint and spans with a zero balance are
/// omitted. The last checkpoint's balance extends to `target`.
///
/// # Errors
///
/// - [`WeightError::InvalidRange`] if `target < since`
/// - [`WeightError::UnorderedCheckpoints`] if heights are not strictly increasing
pub fn intervals(
    checkpoints: &[Checkpoint],
    since: u64,
    target: u64,
) -> Result<Vec<BalanceInterval>, WeightError> {
    if target < since {
        return Err(WeightError::InvalidRange { since, target });
    }
    validate(checkpoints)?;

    let mut spans = Vec::with_capacity(checkpoints.len());
    for (i, cp) in checkpoints.iter().enumerate() {
        if cp.height >= target {
            break;
        }
        let end = checkpoints.get(i + 1).map_or(target, |next| next.height.min(target));
        let start = cp.height.max(since);
        if start < end && cp.balance > 0 {
            spans.push(BalanceInterval {
                start,
                end,
                balance: cp.balance,
            });
        }
    }
    Ok(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cps() -> Vec<Checkpoint> {
        vec![
            Checkpoint::new(10, 5),
            Checkpoint::new(20, 0),
            Checkpoint::new(30, 7),
        ]
    }

    #[test]
    fn spans_cover_range() {
        let spans = intervals(&cps(), 0, 40).unwrap();
        assert_eq!(
            spans,
            vec![
                BalanceInterval { start: 10, end: 20, balance: 5 },
                BalanceInterval { start: 30, end: 40, balance: 7 },
            ]
        );
    }

    #[test]
    fn since_clips_first_span() {
        let spans = intervals(&cps(), 15, 40).unwrap();
        assert_eq!(spans[0], BalanceInterval { start: 15, end: 20, balance: 5 });
        assert_eq!(spans[0].blocks(), 5);
    }

    #[test]
    fn target_clips_last_span() {
        let spans = intervals(&cps(), 0, 12).unwrap();
        assert_eq!(spans, vec![BalanceInterval { start: 10, end: 12, balance: 5 }]);
    }

    #[test]
    fn target_before_first_checkpoint_is_empty() {
        assert!(intervals(&cps(), 0, 10).unwrap().is_empty());
        assert!(intervals(&cps(), 0, 3).unwrap().is_empty());
    }

    #[test]
    fn empty_range_is_empty() {
        assert!(intervals(&cps(), 35, 35).unwrap().is_empty());
    }

    #[test]
    fn reversed_range_rejected() {
        assert_eq!(
            intervals(&cps(), 35, 34),
            Err(WeightError::InvalidRange { since: 35, target: 34 })
        );
    }

    #[test]
    fn duplicate_heights_rejected() {
        let bad = vec![Checkpoint::new(10, 1), Checkpoint::new(10, 2)];
        assert_eq!(
            intervals(&bad, 0, 50),
            Err(WeightError::UnorderedCheckpoints { height: 10 })
        );
    }

    #[test]
    fn decreasing_heights_rejected() {
        let bad = vec![Checkpoint::new(10, 1), Checkpoint::new(20, 2), Checkpoint::new(15, 3)];
        assert_eq!(
            validate(&bad),
            Err(WeightError::UnorderedCheckpoints { height: 15 })
        );
    }
}
