use crate::geometry::FEET_PER_METER;
use std::collections::VecDeque;

const HISTORY_LEN: usize = 3;

/// Climb rate from the last three altitude samples, smoothed with an EMA.
#[derive(Debug, Clone)]
pub struct VerticalRateFilter {
    beta: f64,
    /// (altitude m, timestamp s), oldest first
    history: VecDeque<(f64, f64)>,
    rate: f64,
}

impl VerticalRateFilter {
    pub fn new(beta: f64) -> Self {
        VerticalRateFilter {
            beta,
            history: VecDeque::with_capacity(HISTORY_LEN),
            rate: 0.0,
        }
    }

    /// Adds a sample and returns the smoothed climb rate in ft/min.
    pub fn update(&mut self, altitude: f64, timestamp: f64) -> f64 {
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back((altitude, timestamp));

        let instant = self.instantaneous() * FEET_PER_METER * 60.0;
        self.rate = self.beta * instant + (1.0 - self.beta) * self.rate;
        self.rate
    }

    /// Unsmoothed vertical speed in m/s.
    pub fn instantaneous(&self) -> f64 {
        match self.history.len() {
            3 => {
                let (a0, t0) = self.history[0];
                let (a1, _) = self.history[1];
                let (a2, t2) = self.history[2];
                let span = t2 - t0;
                if span == 0.0 {
                    return 0.0;
                }
                (a0 - 4.0 * a1 + 3.0 * a2) / span
            }
            2 => {
                let (a0, t0) = self.history[0];
                let (a1, t1) = self.history[1];
                let span = t1 - t0;
                if span == 0.0 {
                    return 0.0;
                }
                (a1 - a0) / span
            }
            _ => 0.0,
        }
    }

    /// Smoothed climb rate in ft/min.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Most recent altitude in feet.
    pub fn altitude_ft(&self) -> f64 {
        self.history
            .back()
            .map(|(altitude, _)| altitude * FEET_PER_METER)
            .unwrap_or(0.0)
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.rate = 0.0;
    }
}
