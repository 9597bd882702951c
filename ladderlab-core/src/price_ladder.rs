//! Price ladder construction.
//!
//! Levels compound `step_pct` away from the pivot in both directions until
//! they leave the `max_deviation_pct` band. Prices are snapped to the tick
//! grid and deduplicated on integer ticks, so the pivot appears exactly once.

use crate::config::LadderConfig;
use crate::distribute::{OrderDistributor, SequenceOrder};
use crate::domain::{Ladder, PriceLevel, Side};
use crate::error::{require_positive, LadderError};
use std::collections::BTreeSet;

/// Upper bound on generated levels; guards against degenerate tiny steps.
pub const MAX_LEVELS: usize = 10_000;

/// Relative slack when comparing a compounded price against the band edge.
const BAND_EPSILON: f64 = 1e-9;

/// Snap a price to the nearest multiple of `tick`.
pub fn round_to_tick(price: f64, tick: f64) -> f64 {
    from_ticks(to_ticks(price, tick), tick)
}

fn to_ticks(price: f64, tick: f64) -> i64 {
    (price / tick).round() as i64
}

fn from_ticks(ticks: i64, tick: f64) -> f64 {
    // Dividing by an integral ticks-per-unit keeps decimal ticks exact (0.01 → /100).
    let per_unit = 1.0 / tick;
    if (per_unit - per_unit.round()).abs() < 1e-9 {
        ticks as f64 / per_unit.round()
    } else {
        ticks as f64 * tick
    }
}

/// Descending, unique, tick-aligned level prices within the deviation band.
pub fn generate_levels(
    pivot: f64,
    step_pct: f64,
    max_deviation_pct: f64,
    tick_size: f64,
) -> Result<Vec<f64>, LadderError> {
    require_positive("pivot_price", pivot)?;
    require_positive("step_pct", step_pct)?;
    require_positive("max_deviation_pct", max_deviation_pct)?;
    require_positive("tick_size", tick_size)?;

    let step = step_pct / 100.0;
    let dev = max_deviation_pct / 100.0;
    let upper = pivot * (1.0 + dev) * (1.0 + BAND_EPSILON);
    let lower = pivot * (1.0 - dev) * (1.0 - BAND_EPSILON);

    let mut ticks: BTreeSet<i64> = BTreeSet::new();
    ticks.insert(to_ticks(pivot, tick_size));

    let mut k = 1;
    loop {
        let price = pivot * (1.0 + step).powi(k);
        if price > upper {
            break;
        }
        ticks.insert(to_ticks(price, tick_size));
        guard_level_count(ticks.len())?;
        k += 1;
    }

    if step < 1.0 {
        let mut k = 1;
        loop {
            let price = pivot * (1.0 - step).powi(k);
            if price < lower || to_ticks(price, tick_size) <= 0 {
                break;
            }
            ticks.insert(to_ticks(price, tick_size));
            guard_level_count(ticks.len())?;
            k += 1;
        }
    }

    Ok(ticks
        .iter()
        .rev()
        .map(|&t| from_ticks(t, tick_size))
        .collect())
}

fn guard_level_count(count: usize) -> Result<(), LadderError> {
    if count > MAX_LEVELS {
        return Err(LadderError::invalid(
            "step_pct",
            format!("ladder would exceed {MAX_LEVELS} levels"),
        ));
    }
    Ok(())
}

/// Build the opening ladder from configuration.
///
/// Funds buy `floor(funds / pivot / lot)` lots. Half (rounded down) are held as
/// inventory and rest as sells above the pivot; the rest rest as buys at or
/// below it. Each side uses the `sequence_depth` levels nearest the pivot,
/// with the largest quantities farthest away.
pub fn seed_ladder(config: &LadderConfig) -> Result<Ladder, LadderError> {
    config.validate()?;
    let tick = config.tick_size;
    let prices = generate_levels(
        config.pivot_price,
        config.step_pct,
        config.max_deviation_pct,
        tick,
    )?;
    let pivot = round_to_tick(config.pivot_price, tick);

    let total_lots = (config.total_funds / pivot / config.lot_size as f64).floor() as u64;
    if total_lots == 0 {
        return Err(LadderError::invalid(
            "total_funds",
            format!(
                "{} cannot buy one lot of {} at {pivot}",
                config.total_funds, config.lot_size
            ),
        ));
    }

    let mut ladder = Ladder {
        levels: prices.into_iter().map(PriceLevel::new).collect(),
        pivot_price: pivot,
        lot_size: config.lot_size,
        step_pct: config.step_pct,
        max_deviation_pct: config.max_deviation_pct,
        tick_size: tick,
    };

    let half_tick = tick / 2.0;
    let sell_zone: Vec<usize> = (0..ladder.len())
        .filter(|&i| ladder.levels[i].price > pivot + half_tick)
        .collect();
    let buy_zone: Vec<usize> = (0..ladder.len())
        .filter(|&i| ladder.levels[i].price <= pivot + half_tick)
        .collect();

    let mut sell_total = (total_lots / 2) * config.lot_size;
    if sell_zone.is_empty() {
        sell_total = 0;
    }
    let buy_total = total_lots * config.lot_size - sell_total;

    let distributor = OrderDistributor::new(config.lot_size, config.remainder_policy)?;

    // Sells nearest the pivot are the highest indices of the sell zone.
    let sell_depth = config.sequence_depth.min(sell_zone.len());
    let sell_targets = &sell_zone[sell_zone.len() - sell_depth..];
    if !sell_targets.is_empty() {
        let weights = config.sell_sequence.generate(sell_targets.len())?;
        let alloc =
            distributor.distribute(sell_total, &weights, Side::Sell, SequenceOrder::Reversed)?;
        for (&i, qty) in sell_targets.iter().zip(alloc) {
            ladder.levels[i].sell_qty = qty;
        }
    }

    let buy_depth = config.sequence_depth.min(buy_zone.len());
    let buy_targets = &buy_zone[..buy_depth];
    let weights = config.buy_sequence.generate(buy_targets.len())?;
    let alloc = distributor.distribute(buy_total, &weights, Side::Buy, SequenceOrder::Forward)?;
    for (&i, qty) in buy_targets.iter().zip(alloc) {
        ladder.levels[i].buy_qty = qty;
    }

    Ok(ladder)
}
