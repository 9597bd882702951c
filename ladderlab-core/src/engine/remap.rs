//! Filled-quantity conversion.
//!
//! A fill on one side becomes resting quantity on the other side at the same
//! levels, with the quantities laid in reverse order: what filled at the far
//! end of the run comes back at the near end.

use crate::domain::Fill;

/// Mirror a run of same-side fills onto the opposite side.
///
/// `fills` is expected in ascending index order (as produced by the fill
/// engine). The output keeps those indices and prices, flips the side, and
/// reverses the quantities. Totals are conserved.
pub fn remap(fills: &[Fill]) -> Vec<Fill> {
    fills
        .iter()
        .zip(fills.iter().rev())
        .map(|(slot, source)| Fill {
            index: slot.index,
            price: slot.price,
            qty: source.qty,
            side: slot.side.opposite(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;

    fn fill(index: usize, price: f64, qty: u64, side: Side) -> Fill {
        Fill {
            index,
            price,
            qty,
            side,
        }
    }

    #[test]
    fn sells_come_back_as_reversed_buys() {
        let fills = vec![
            fill(1, 10.2, 200, Side::Sell),
            fill(2, 10.1, 100, Side::Sell),
        ];
        let out = remap(&fills);
        assert_eq!(
            out,
            vec![fill(1, 10.2, 100, Side::Buy), fill(2, 10.1, 200, Side::Buy)]
        );
    }

    #[test]
    fn totals_are_conserved() {
        let fills = vec![
            fill(3, 10.0, 100, Side::Buy),
            fill(4, 9.9, 200, Side::Buy),
            fill(5, 9.8, 500, Side::Buy),
        ];
        let out = remap(&fills);
        let before: u64 = fills.iter().map(|f| f.qty).sum();
        let after: u64 = out.iter().map(|f| f.qty).sum();
        assert_eq!(before, after);
        assert!(out.iter().all(|f| f.side == Side::Sell));
        assert_eq!(out.iter().map(|f| f.qty).collect::<Vec<_>>(), vec![500, 200, 100]);
    }

    #[test]
    fn empty_in_empty_out() {
        assert!(remap(&[]).is_empty());
    }
}
