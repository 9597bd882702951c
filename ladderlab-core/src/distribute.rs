//! Order distributor: split an integer quantity across levels by weight.
//!
//! Allocations are lot-rounded, never below one lot while the total is
//! nonzero, and always sum to the requested total exactly. The rounding
//! remainder lands on one end of the allocation, chosen by [`RemainderPolicy`].

use crate::domain::Side;
use crate::error::LadderError;
use serde::{Deserialize, Serialize};

/// Where the rounding remainder is booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// Buys correct the last element, sells the first.
    #[default]
    SideDefault,
    AlwaysFirst,
    AlwaysLast,
}

impl RemainderPolicy {
    fn target(self, side: Side, len: usize) -> usize {
        let last = len - 1;
        match self {
            RemainderPolicy::SideDefault => match side {
                Side::Buy => last,
                Side::Sell => 0,
            },
            RemainderPolicy::AlwaysFirst => 0,
            RemainderPolicy::AlwaysLast => last,
        }
    }
}

/// Direction in which the weights are laid across the target levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceOrder {
    Forward,
    Reversed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderDistributor {
    lot_size: u64,
    policy: RemainderPolicy,
}

impl OrderDistributor {
    pub fn new(lot_size: u64, policy: RemainderPolicy) -> Result<Self, LadderError> {
        if lot_size == 0 {
            return Err(LadderError::invalid("lot_size", "must be at least 1"));
        }
        Ok(Self { lot_size, policy })
    }

    /// Allocate `total` across `sequence.len()` slots proportionally to the weights.
    pub fn distribute(
        &self,
        total: u64,
        sequence: &[f64],
        side: Side,
        order: SequenceOrder,
    ) -> Result<Vec<u64>, LadderError> {
        if sequence.is_empty() {
            return Err(LadderError::invalid("sequence", "must not be empty"));
        }
        if let Some(w) = sequence.iter().find(|w| !(w.is_finite() && **w > 0.0)) {
            return Err(LadderError::invalid(
                "sequence",
                format!("weights must be positive and finite, got {w}"),
            ));
        }
        if total % self.lot_size != 0 {
            return Err(LadderError::invalid(
                "total_qty",
                format!("{total} is not a multiple of lot size {}", self.lot_size),
            ));
        }

        let n = sequence.len();
        if total == 0 {
            return Ok(vec![0; n]);
        }

        let weights: Vec<f64> = match order {
            SequenceOrder::Forward => sequence.to_vec(),
            SequenceOrder::Reversed => sequence.iter().rev().copied().collect(),
        };
        let weight_sum: f64 = weights.iter().sum();
        let scale = total as f64 / weight_sum;
        let lot = self.lot_size as f64;

        let mut alloc: Vec<u64> = weights
            .iter()
            .map(|w| ((w * scale / lot).round().max(1.0) as u64) * self.lot_size)
            .collect();

        let allocated: u64 = alloc.iter().sum();
        let target = self.policy.target(side, n);
        if allocated < total {
            alloc[target] += total - allocated;
        } else if allocated > total {
            absorb_excess(&mut alloc, target, allocated - total);
        }

        verify_conservation(total, &alloc)?;
        Ok(alloc)
    }
}

/// Remove `excess` starting at `target` and walking toward the other end.
///
/// Every element and the excess are lot multiples, so the result stays lot-aligned.
fn absorb_excess(alloc: &mut [u64], target: usize, mut excess: u64) {
    let n = alloc.len();
    let walk: Vec<usize> = if target == 0 {
        (0..n).collect()
    } else {
        (0..=target).rev().chain(target + 1..n).collect()
    };
    for i in walk {
        let take = excess.min(alloc[i]);
        alloc[i] -= take;
        excess -= take;
        if excess == 0 {
            break;
        }
    }
}

/// Fail with `ConservationViolation` unless `allocation` sums to `expected`.
pub fn verify_conservation(expected: u64, allocation: &[u64]) -> Result<(), LadderError> {
    let actual: u64 = allocation.iter().sum();
    if actual == expected {
        Ok(())
    } else {
        Err(LadderError::ConservationViolation { expected, actual })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIB5: [f64; 5] = [1.0, 2.0, 3.0, 5.0, 8.0];

    fn distributor() -> OrderDistributor {
        OrderDistributor::new(100, RemainderPolicy::SideDefault).unwrap()
    }

    #[test]
    fn small_sell_total_on_fib5() {
        let out = distributor()
            .distribute(700, &FIB5, Side::Sell, SequenceOrder::Forward)
            .unwrap();
        assert_eq!(out.len(), 5);
        assert_eq!(out.iter().sum::<u64>(), 700);
        assert!(out.iter().all(|q| q % 100 == 0));
        // One-lot floors overshoot by a lot; the sell correction hits the first slot.
        assert_eq!(out, vec![0, 100, 100, 200, 300]);
    }

    #[test]
    fn buy_correction_lands_on_last_slot() {
        let out = distributor()
            .distribute(700, &FIB5, Side::Buy, SequenceOrder::Forward)
            .unwrap();
        assert_eq!(out, vec![100, 100, 100, 200, 200]);
    }

    #[test]
    fn positive_remainder_goes_to_policy_target() {
        // 1000 over [1,1,1]: 333.3 each → 300 each, remainder 100.
        let d = distributor();
        let seq = [1.0, 1.0, 1.0];
        assert_eq!(
            d.distribute(1000, &seq, Side::Sell, SequenceOrder::Forward).unwrap(),
            vec![400, 300, 300]
        );
        assert_eq!(
            d.distribute(1000, &seq, Side::Buy, SequenceOrder::Forward).unwrap(),
            vec![300, 300, 400]
        );

        let first = OrderDistributor::new(100, RemainderPolicy::AlwaysFirst).unwrap();
        assert_eq!(
            first.distribute(1000, &seq, Side::Buy, SequenceOrder::Forward).unwrap(),
            vec![400, 300, 300]
        );
        let last = OrderDistributor::new(100, RemainderPolicy::AlwaysLast).unwrap();
        assert_eq!(
            last.distribute(1000, &seq, Side::Sell, SequenceOrder::Forward).unwrap(),
            vec![300, 300, 400]
        );
    }

    #[test]
    fn reversed_order_mirrors_weights() {
        let d = distributor();
        let fwd = d
            .distribute(19_000, &FIB5, Side::Buy, SequenceOrder::Forward)
            .unwrap();
        let rev = d
            .distribute(19_000, &FIB5, Side::Buy, SequenceOrder::Reversed)
            .unwrap();
        assert_eq!(fwd, vec![1000, 2000, 3000, 5000, 8000]);
        assert_eq!(rev, vec![8000, 5000, 3000, 2000, 1000]);
    }

    #[test]
    fn zero_total_is_all_zero() {
        for side in [Side::Buy, Side::Sell] {
            let out = distributor()
                .distribute(0, &FIB5, side, SequenceOrder::Reversed)
                .unwrap();
            assert_eq!(out, vec![0; 5]);
        }
    }

    #[test]
    fn total_smaller_than_slot_count() {
        // Three one-lot floors against a one-lot total: two lots must be absorbed.
        let out = distributor()
            .distribute(100, &[1.0, 2.0, 3.0], Side::Sell, SequenceOrder::Forward)
            .unwrap();
        assert_eq!(out.iter().sum::<u64>(), 100);
        assert_eq!(out, vec![0, 0, 100]);

        let out = distributor()
            .distribute(100, &[1.0, 2.0, 3.0], Side::Buy, SequenceOrder::Forward)
            .unwrap();
        assert_eq!(out, vec![100, 0, 0]);
    }

    #[test]
    fn rejects_bad_inputs() {
        let d = distributor();
        assert!(d.distribute(700, &[], Side::Buy, SequenceOrder::Forward).is_err());
        assert!(d.distribute(750, &FIB5, Side::Buy, SequenceOrder::Forward).is_err());
        assert!(d
            .distribute(700, &[1.0, 0.0], Side::Buy, SequenceOrder::Forward)
            .is_err());
        assert!(d
            .distribute(700, &[1.0, f64::NAN], Side::Buy, SequenceOrder::Forward)
            .is_err());
        assert!(OrderDistributor::new(0, RemainderPolicy::SideDefault).is_err());
    }

    #[test]
    fn conservation_check() {
        assert!(verify_conservation(700, &[300, 400]).is_ok());
        assert_eq!(
            verify_conservation(700, &[300, 500]),
            Err(LadderError::ConservationViolation {
                expected: 700,
                actual: 800
            })
        );
    }
}
