//! Direction and sweep-type classification
//!
//! A session's direction is the larger of the up and down excursions from an
//! anchor price: the swept level when a sweep occurred and bars follow it,
//! otherwise the session open. Equal excursions classify as `Short`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::bars::PriceBar;
use super::sweep::{SweepCheck, SweepSide};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Long => "Long",
            Self::Short => "Short",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price excursion on both sides of an anchor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchoredMove {
    pub anchor_price: f64,
    pub max_high: f64,
    pub max_time: NaiveDateTime,
    pub min_low: f64,
    pub min_time: NaiveDateTime,
}

impl AnchoredMove {
    /// `None` when there are no bars to measure
    pub fn measure(anchor_price: f64, bars: &[PriceBar]) -> Option<Self> {
        let first = bars.first()?;
        let mut mv = Self {
            anchor_price,
            max_high: first.high,
            max_time: first.local_time(),
            min_low: first.low,
            min_time: first.local_time(),
        };
        for bar in &bars[1..] {
            if bar.high > mv.max_high {
                mv.max_high = bar.high;
                mv.max_time = bar.local_time();
            }
            if bar.low < mv.min_low {
                mv.min_low = bar.low;
                mv.min_time = bar.local_time();
            }
        }
        Some(mv)
    }

    pub fn up_move(&self) -> f64 {
        self.max_high - self.anchor_price
    }

    pub fn down_move(&self) -> f64 {
        self.anchor_price - self.min_low
    }

    pub fn direction(&self) -> Direction {
        if self.up_move() > self.down_move() {
            Direction::Long
        } else {
            Direction::Short
        }
    }
}

/// Classify direction from `anchor_price` over the bars that follow it
pub fn classify_direction(anchor_price: f64, bars: &[PriceBar]) -> Option<Direction> {
    AnchoredMove::measure(anchor_price, bars).map(|mv| mv.direction())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SweepType {
    Continue,
    #[serde(rename = "Sweep and Reverse")]
    SweepAndReverse,
    #[serde(rename = "No Sweep")]
    NoSweep,
}

impl SweepType {
    pub const ALL: [SweepType; 3] = [Self::Continue, Self::SweepAndReverse, Self::NoSweep];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Continue => "Continue",
            Self::SweepAndReverse => "Sweep and Reverse",
            Self::NoSweep => "No Sweep",
        }
    }
}

impl std::fmt::Display for SweepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label the session's sweep behaviour.
///
/// A sweep with an undetermined direction is reported as `NoSweep`.
pub fn classify_sweep_type(check: &SweepCheck, direction: Option<Direction>) -> SweepType {
    let (Some(sweep), Some(direction)) = (check.effective(), direction) else {
        return SweepType::NoSweep;
    };

    let continuation = match sweep.side {
        SweepSide::High => Direction::Long,
        SweepSide::Low => Direction::Short,
    };

    if direction == continuation {
        SweepType::Continue
    } else {
        SweepType::SweepAndReverse
    }
}
