//! # HGS-VRPTW
//!
//! A Rust implementation of the Hybrid Genetic Search algorithm for the
//! Vehicle Routing Problem with Time Windows (VRPTW).
//!
//! Based on the algorithm of Vidal et al., combining genetic search with
//! granular local improvement heuristics, penalized infeasibility, and
//! strategic management of population diversity. The search handles
//! capacity constraints, client time windows, service durations, and
//! release times; lateness is treated as penalized time warp rather than
//! as a hard constraint.
//!
//! The crate is single-threaded by design: given a seeded random number
//! generator, runs are bit-for-bit reproducible.

pub mod config;
pub mod error;
pub mod genetic;
pub mod individual;
pub mod local_search;
pub mod matrix;
pub mod penalty;
pub mod population;
pub mod problem;
pub mod segment;
pub mod utils;

pub use crate::config::Config;
pub use crate::error::Error;
pub use crate::individual::Individual;
pub use crate::local_search::{Exchange, LocalSearch, SwapStar};
pub use crate::penalty::{CostEvaluator, PenaltyManager};
pub use crate::population::Population;
pub use crate::problem::{Client, ProblemData};

use crate::genetic::order_crossover;
use rand::Rng;
use std::time::{Duration as WallDuration, Instant};
use tracing::{debug, info};

/// Travel distance between two locations.
pub type Distance = i64;
/// Travel or service time, time warp, and time window bounds.
pub type Duration = i64;
/// Client demand and vehicle load.
pub type Load = i64;
/// Penalized objective values and move deltas.
pub type Cost = i64;

/// The main structure orchestrating the hybrid genetic search.
pub struct HgsAlgorithm<'a> {
    pub data: &'a ProblemData,
    pub config: Config,
    pub penalty_manager: PenaltyManager,
    pub population: Population<'a>,
    pub local_search: LocalSearch<'a>,
    pub best_solution: Option<Individual<'a>>,
    pub iterations: u32,
    pub iterations_without_improvement: u32,
    pub run_time: WallDuration,
    start_time: Instant,
}

impl<'a> HgsAlgorithm<'a> {
    /// Create a new HGS instance for the given problem and configuration,
    /// with the standard operator set: the (N, M)-exchange family as node
    /// operators and SWAP* as route operator.
    pub fn new(data: &'a ProblemData, config: Config) -> Result<Self, Error> {
        let mut local_search = LocalSearch::new(data, &config)?;

        for (n, m) in [(1, 0), (2, 0), (3, 0), (1, 1), (2, 1), (3, 1), (2, 2), (3, 2), (3, 3)] {
            local_search.add_node_operator(Exchange::new(n, m));
        }

        local_search.add_route_operator(SwapStar::new(data.num_clients(), data.num_vehicles()));

        Ok(HgsAlgorithm {
            data,
            penalty_manager: PenaltyManager::new(&config),
            population: Population::new(data, &config),
            local_search,
            config,
            best_solution: None,
            iterations: 0,
            iterations_without_improvement: 0,
            run_time: WallDuration::from_secs(0),
            start_time: Instant::now(),
        })
    }

    /// Seed the population with random individuals and set the initial
    /// incumbent.
    pub fn initialize<R: Rng>(&mut self, rng: &mut R) {
        let costs = self.penalty_manager.cost_evaluator();
        self.population.initialize(&costs, rng);

        // The initial incumbent may well be infeasible; it is replaced as
        // soon as a feasible solution is found.
        self.best_solution = match self.population.best() {
            Some(best) => Some(best.clone()),
            None => self
                .population
                .iter()
                .min_by_key(|indiv| indiv.cost(&costs))
                .cloned(),
        };
    }

    /// Run the algorithm until the termination criteria are met, and
    /// return the best solution found.
    pub fn run<R: Rng>(&mut self, rng: &mut R) -> Result<Individual<'a>, Error> {
        self.start_time = Instant::now();
        self.initialize(rng);

        if self.population.size() == 0 {
            return Err(Error::EmptyPopulation);
        }

        // With at most one client there is nothing to recombine.
        if self.data.num_clients() <= 1 {
            return match &self.best_solution {
                Some(best) => Ok(best.clone()),
                None => Err(Error::EmptyPopulation),
            };
        }

        while !self.should_terminate() {
            self.iterations += 1;

            let previous_best = self.population.best().map(|best| best.distance());

            let offspring = {
                let (parent1, parent2) = self.population.select_parents(rng);
                order_crossover(parent1, parent2, self.data, rng)
            };

            self.educate(offspring, rng)?;

            // Diversification and penalty management.
            if self.iterations % self.config.nb_penalty_management == 0 {
                self.penalty_manager.update_penalties();
                self.population
                    .reorder(&self.penalty_manager.cost_evaluator());
            }

            let current_best = self.population.best().map(|best| best.distance());

            if current_best < previous_best || (previous_best.is_none() && current_best.is_some()) {
                self.best_solution = self.population.best().cloned();
                self.iterations_without_improvement = 0;

                if let Some(distance) = current_best {
                    info!(iteration = self.iterations, distance, "new best solution");
                }
            } else {
                self.iterations_without_improvement += 1;
            }
        }

        self.run_time = self.start_time.elapsed();
        debug!(
            iterations = self.iterations,
            seconds = self.run_time.as_secs(),
            "search finished"
        );

        match &self.best_solution {
            Some(best) => Ok(best.clone()),
            None => Err(Error::EmptyPopulation),
        }
    }

    // Improve the offspring with local search and insert it into the
    // population; infeasible offspring may additionally be repaired under
    // boosted penalties.
    fn educate<R: Rng>(&mut self, offspring: Individual<'a>, rng: &mut R) -> Result<(), Error> {
        let costs = self.penalty_manager.cost_evaluator();
        let mut indiv = self.local_search.search(&offspring, &costs, rng)?;

        // Only feasible improvements over the incumbent are worth the more
        // expensive route-based intensification.
        if self.config.should_intensify && indiv.is_feasible() && self.improves_best(&indiv) {
            indiv = self.local_search.intensify(&indiv, &costs, rng)?;
        }

        self.penalty_manager
            .register(!indiv.has_excess_load(), !indiv.has_time_warp());

        let is_feasible = indiv.is_feasible();
        self.population.add(indiv.clone(), &costs);

        if !is_feasible && rng.gen_range(0..100) < self.config.repair_probability {
            // Re-run the search under boosted penalties to try and repair
            // the infeasibility.
            let boosted = self.penalty_manager.boosted_cost_evaluator();
            let mut repaired = self.local_search.search(&indiv, &boosted, rng)?;

            if repaired.is_feasible() {
                if self.config.should_intensify && self.improves_best(&repaired) {
                    repaired = self.local_search.intensify(&repaired, &boosted, rng)?;
                }

                self.penalty_manager
                    .register(!repaired.has_excess_load(), !repaired.has_time_warp());
                self.population.add(repaired, &costs);
            }
        }

        Ok(())
    }

    fn improves_best(&self, indiv: &Individual) -> bool {
        match self.population.best() {
            Some(best) => indiv.distance() < best.distance(),
            None => true,
        }
    }

    fn should_terminate(&self) -> bool {
        if self.iterations_without_improvement >= self.config.max_iterations_without_improvement {
            return true;
        }

        if let Some(time_limit) = self.config.time_limit {
            if self.start_time.elapsed() >= time_limit {
                return true;
            }
        }

        false
    }
}
