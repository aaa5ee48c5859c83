//! Penalty management for load and time window violations.

use crate::config::Config;
use crate::{Cost, Duration, Load};
use tracing::trace;

/// Maps constraint violations to additive cost penalties.
///
/// A `CostEvaluator` is a read-only snapshot of the current penalty
/// coefficients; the [`PenaltyManager`] adapts those coefficients between
/// generations and hands out fresh snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostEvaluator {
    capacity_penalty: Cost,
    time_warp_penalty: Cost,
}

impl CostEvaluator {
    pub fn new(capacity_penalty: Cost, time_warp_penalty: Cost) -> Self {
        CostEvaluator {
            capacity_penalty,
            time_warp_penalty,
        }
    }

    /// The penalty for carrying the given load with the given capacity.
    pub fn load_penalty(&self, load: Load, capacity: Load) -> Cost {
        (load - capacity).max(0) * self.capacity_penalty
    }

    /// The penalty for the given amount of time warp.
    pub fn tw_penalty(&self, time_warp: Duration) -> Cost {
        time_warp * self.time_warp_penalty
    }
}

/// Adapts the penalty coefficients to steer the search towards a target
/// fraction of feasible solutions.
#[derive(Debug)]
pub struct PenaltyManager {
    capacity_penalty: Cost,
    time_warp_penalty: Cost,
    repair_booster: Cost,
    penalty_increase: f64,
    penalty_decrease: f64,
    target_feasible: f64,
    load_feasible: Vec<bool>,
    time_feasible: Vec<bool>,
}

impl PenaltyManager {
    pub fn new(config: &Config) -> Self {
        PenaltyManager {
            capacity_penalty: config.init_capacity_penalty,
            time_warp_penalty: config.init_time_warp_penalty,
            repair_booster: config.repair_booster,
            penalty_increase: config.penalty_increase,
            penalty_decrease: config.penalty_decrease,
            target_feasible: config.target_feasible,
            load_feasible: Vec::new(),
            time_feasible: Vec::new(),
        }
    }

    /// A cost evaluator using the current penalty coefficients.
    pub fn cost_evaluator(&self) -> CostEvaluator {
        CostEvaluator::new(self.capacity_penalty, self.time_warp_penalty)
    }

    /// A cost evaluator with boosted penalties, for repair runs on
    /// infeasible solutions.
    pub fn boosted_cost_evaluator(&self) -> CostEvaluator {
        CostEvaluator::new(
            self.capacity_penalty * self.repair_booster,
            self.time_warp_penalty * self.repair_booster,
        )
    }

    /// Record whether the latest educated solution was load- and
    /// time-feasible.
    pub fn register(&mut self, load_feasible: bool, time_feasible: bool) {
        self.load_feasible.push(load_feasible);
        self.time_feasible.push(time_feasible);
    }

    /// Update both penalty coefficients from the feasibility registered
    /// since the previous update, then clear the registers.
    pub fn update_penalties(&mut self) {
        if !self.load_feasible.is_empty() {
            let feasible = self.load_feasible.iter().filter(|&&ok| ok).count();
            let pct = feasible as f64 / self.load_feasible.len() as f64;
            self.capacity_penalty = self.compute(self.capacity_penalty, pct);
            self.load_feasible.clear();
        }

        if !self.time_feasible.is_empty() {
            let feasible = self.time_feasible.iter().filter(|&&ok| ok).count();
            let pct = feasible as f64 / self.time_feasible.len() as f64;
            self.time_warp_penalty = self.compute(self.time_warp_penalty, pct);
            self.time_feasible.clear();
        }

        trace!(
            capacity = self.capacity_penalty,
            time_warp = self.time_warp_penalty,
            "updated penalty coefficients"
        );
    }

    // The +- 1 ensures the penalty does not get stuck at the same integer
    // value; [1, 1000] bounds avoid overflow in cost computations.
    fn compute(&self, penalty: Cost, feasible_pct: f64) -> Cost {
        let current = penalty as f64;

        if feasible_pct < self.target_feasible - 0.05 {
            (self.penalty_increase * current + 1.0).min(1000.0) as Cost
        } else if feasible_pct > self.target_feasible + 0.05 {
            (self.penalty_decrease * current - 1.0).max(1.0) as Cost
        } else {
            penalty
        }
    }
}
