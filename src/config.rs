//! Configuration parameters for the HGS-VRPTW algorithm.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration settings for the HGS-VRPTW algorithm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Minimum sub-population size after survivor selection
    pub min_pop_size: usize,
    /// Overflow allowance before survivor selection is triggered
    pub generation_size: usize,
    /// Number of elite individuals weighted in the biased fitness
    pub nb_elite: usize,
    /// Number of closest solutions considered in the diversity measure
    pub nb_close: usize,
    /// Lower diversity bound for parent pairs, as a fraction of the number
    /// of clients
    pub lb_diversity: f64,
    /// Upper diversity bound for parent pairs, as a fraction of the number
    /// of clients
    pub ub_diversity: f64,
    /// Size of each client's granular neighbour list
    pub nb_granular: usize,
    /// Weight of the waiting-time term in the proximity measure
    pub weight_wait_time: i64,
    /// Weight of the time-warp term in the proximity measure
    pub weight_time_warp: i64,
    /// Window size for subpath enumeration during intensification
    pub post_process_path_length: usize,
    /// Initial penalty per unit of excess load
    pub init_capacity_penalty: i64,
    /// Initial penalty per unit of time warp
    pub init_time_warp_penalty: i64,
    /// Multiplier applied to both penalties during repair runs
    pub repair_booster: i64,
    /// Penalty growth factor when too few solutions are feasible
    pub penalty_increase: f64,
    /// Penalty shrink factor when enough solutions are feasible
    pub penalty_decrease: f64,
    /// Target fraction of feasible solutions between penalty updates
    pub target_feasible: f64,
    /// Probability (in percent) of a boosted repair run for infeasible
    /// offspring
    pub repair_probability: u32,
    /// Number of iterations between penalty parameter updates
    pub nb_penalty_management: u32,
    /// Whether feasible improvements over the incumbent trigger the more
    /// intensive route-based search
    pub should_intensify: bool,
    /// Maximum number of iterations without improvement
    pub max_iterations_without_improvement: u32,
    /// Optional wall-clock limit for the algorithm
    pub time_limit: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            min_pop_size: 25,
            generation_size: 40,
            nb_elite: 4,
            nb_close: 5,
            lb_diversity: 0.1,
            ub_diversity: 0.5,
            nb_granular: 34,
            weight_wait_time: 18,
            weight_time_warp: 20,
            post_process_path_length: 7,
            init_capacity_penalty: 20,
            init_time_warp_penalty: 6,
            repair_booster: 12,
            penalty_increase: 1.34,
            penalty_decrease: 0.32,
            target_feasible: 0.43,
            repair_probability: 50,
            nb_penalty_management: 100,
            should_intensify: true,
            max_iterations_without_improvement: 20_000,
            time_limit: None,
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Config::default()
    }

    /// Set the minimum sub-population size.
    pub fn with_min_pop_size(mut self, size: usize) -> Self {
        self.min_pop_size = size;
        self
    }

    /// Set the generation size.
    pub fn with_generation_size(mut self, size: usize) -> Self {
        self.generation_size = size;
        self
    }

    /// Set the number of elite individuals.
    pub fn with_nb_elite(mut self, n: usize) -> Self {
        self.nb_elite = n;
        self
    }

    /// Set the number of closest solutions for the diversity measure.
    pub fn with_nb_close(mut self, n: usize) -> Self {
        self.nb_close = n;
        self
    }

    /// Set the diversity bounds used when pairing parents.
    pub fn with_diversity_bounds(mut self, lb: f64, ub: f64) -> Self {
        self.lb_diversity = lb;
        self.ub_diversity = ub;
        self
    }

    /// Set the granular neighbourhood size.
    pub fn with_nb_granular(mut self, n: usize) -> Self {
        self.nb_granular = n;
        self
    }

    /// Set the proximity weights for waiting time and time warp.
    pub fn with_proximity_weights(mut self, wait: i64, warp: i64) -> Self {
        self.weight_wait_time = wait;
        self.weight_time_warp = warp;
        self
    }

    /// Set the subpath enumeration window size.
    pub fn with_post_process_path_length(mut self, k: usize) -> Self {
        self.post_process_path_length = k;
        self
    }

    /// Set the initial penalty coefficients.
    pub fn with_initial_penalties(mut self, capacity: i64, time_warp: i64) -> Self {
        self.init_capacity_penalty = capacity;
        self.init_time_warp_penalty = time_warp;
        self
    }

    /// Set whether intensification runs on feasible improvements.
    pub fn with_intensification(mut self, intensify: bool) -> Self {
        self.should_intensify = intensify;
        self
    }

    /// Set the maximum iterations without improvement.
    pub fn with_max_iterations_without_improvement(mut self, iterations: u32) -> Self {
        self.max_iterations_without_improvement = iterations;
        self
    }

    /// Set the time limit.
    pub fn with_time_limit(mut self, duration: Duration) -> Self {
        self.time_limit = Some(duration);
        self
    }
}
