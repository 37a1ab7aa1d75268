//! Rebalance and retest detection after a sweep
//!
//! Both work on the bars after the sweep event up to the end of the session
//! and use the same touch test: a bar's high or low within `tolerance` of a
//! level.

use serde::{Deserialize, Serialize};

use super::bars::PriceBar;
use super::direction::{Direction, SweepType};
use super::sweep::SweepEvent;

/// Rebalance: after a sweep-and-reverse, price touches the mid and then keeps
/// going in the reversal direction more than one pip past it.
///
/// The reversal direction is the session direction (opposite to the swept
/// side), so a `Short` session must print below `mid - pip` after the touch.
pub fn check_rebalance(
    after_sweep: &[PriceBar],
    sweep_type: SweepType,
    direction: Option<Direction>,
    mid: f64,
    tolerance: f64,
    pip_size: f64,
) -> bool {
    if sweep_type != SweepType::SweepAndReverse {
        return false;
    }
    let Some(direction) = direction else {
        return false;
    };
    let Some(touch) = after_sweep.iter().position(|b| b.touches(mid, tolerance)) else {
        return false;
    };

    let rest = &after_sweep[touch + 1..];
    match direction {
        Direction::Short => rest.iter().any(|b| b.low < mid - pip_size),
        Direction::Long => rest.iter().any(|b| b.high > mid + pip_size),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RetestOutcome {
    /// Some bar came back to the swept level
    pub level: bool,
    /// Some bar came back to the mid
    pub mid: bool,
}

/// Retests of the swept level and of the mid; independent of rebalance
pub fn check_retests(
    after_sweep: &[PriceBar],
    sweep: Option<&SweepEvent>,
    mid: f64,
    tolerance: f64,
) -> RetestOutcome {
    let Some(sweep) = sweep else {
        return RetestOutcome::default();
    };

    RetestOutcome {
        level: after_sweep
            .iter()
            .any(|b| b.touches(sweep.reference_price, tolerance)),
        mid: after_sweep.iter().any(|b| b.touches(mid, tolerance)),
    }
}
