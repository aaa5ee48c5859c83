//! Population management for the genetic algorithm.

use crate::config::Config;
use crate::individual::Individual;
use crate::penalty::CostEvaluator;
use crate::problem::ProblemData;
use rand::Rng;
use tracing::debug;

/// A population member together with its survival bookkeeping.
struct PopulationItem<'a> {
    /// Stable identity used by peer proximity lists
    id: u64,
    indiv: Individual<'a>,
    /// Biased fitness; lower is better
    fitness: f64,
    /// (broken pairs distance, peer id) pairs, ascending by distance
    proximity: Vec<(usize, u64)>,
}

/// Manages feasible and infeasible sub-populations, ranks members by a
/// biased fitness blending cost and diversity, and selects parents for
/// recombination.
pub struct Population<'a> {
    data: &'a ProblemData,
    min_pop_size: usize,
    generation_size: usize,
    nb_elite: usize,
    nb_close: usize,
    lb_diversity: f64,
    ub_diversity: f64,
    feasible: Vec<PopulationItem<'a>>,
    infeasible: Vec<PopulationItem<'a>>,
    /// Best feasible solution observed over all additions
    best: Option<Individual<'a>>,
    next_id: u64,
}

impl<'a> Population<'a> {
    /// Create a new, empty population.
    pub fn new(data: &'a ProblemData, config: &Config) -> Self {
        Population {
            data,
            min_pop_size: config.min_pop_size,
            generation_size: config.generation_size,
            nb_elite: config.nb_elite,
            nb_close: config.nb_close,
            lb_diversity: config.lb_diversity,
            ub_diversity: config.ub_diversity,
            feasible: Vec::with_capacity(config.min_pop_size + config.generation_size + 1),
            infeasible: Vec::with_capacity(config.min_pop_size + config.generation_size + 1),
            best: None,
            next_id: 0,
        }
    }

    /// Seed the population with random individuals.
    pub fn initialize<R: Rng>(&mut self, costs: &CostEvaluator, rng: &mut R) {
        for _ in 0..4 * self.min_pop_size {
            let indiv = Individual::random(self.data, rng);
            self.add(indiv, costs);
        }
    }

    /// Add the given individual to the appropriate sub-population.
    /// Survivor selection is triggered automatically when the
    /// sub-population exceeds its maximum size.
    pub fn add(&mut self, indiv: Individual<'a>, costs: &CostEvaluator) {
        let id = self.next_id;
        self.next_id += 1;

        if indiv.is_feasible() {
            match &self.best {
                Some(best) if indiv.cost(costs) >= best.cost(costs) => {}
                _ => {
                    debug!(cost = indiv.cost(costs), "new best feasible solution");
                    self.best = Some(indiv.clone());
                }
            }
        }

        let feasible = indiv.is_feasible();
        let subpop = if feasible {
            &mut self.feasible
        } else {
            &mut self.infeasible
        };

        // Register proximity against every current member of the same
        // sub-population, on both sides.
        let mut proximity = Vec::with_capacity(subpop.len());

        for item in subpop.iter_mut() {
            let distance = indiv.broken_pairs_distance(&item.indiv);

            let place = item
                .proximity
                .partition_point(|&(other, _)| other < distance);
            item.proximity.insert(place, (distance, id));

            let place = proximity.partition_point(|&(other, _): &(usize, u64)| other < distance);
            proximity.insert(place, (distance, item.id));
        }

        // Insert ordered by cost ascending.
        let cost = indiv.cost(costs);
        let place = subpop.partition_point(|item| item.indiv.cost(costs) < cost);

        subpop.insert(
            place,
            PopulationItem {
                id,
                indiv,
                fitness: 0.0,
                proximity,
            },
        );

        update_biased_fitness(subpop, self.nb_elite, self.nb_close, self.data.num_clients());

        if subpop.len() > self.min_pop_size + self.generation_size {
            let (min_pop_size, nb_elite, nb_close) =
                (self.min_pop_size, self.nb_elite, self.nb_close);
            let num_clients = self.data.num_clients();

            // First purge duplicates, then the worst by biased fitness.
            while subpop.len() > min_pop_size {
                if !remove_duplicate(subpop) {
                    break;
                }
            }

            while subpop.len() > min_pop_size {
                update_biased_fitness(subpop, nb_elite, nb_close, num_clients);
                remove_worst_biased_fitness(subpop);
            }
        }
    }

    /// Re-sort both sub-populations by cost and recompute the biased
    /// fitness. To be called after the penalty coefficients have changed.
    pub fn reorder(&mut self, costs: &CostEvaluator) {
        for subpop in [&mut self.feasible, &mut self.infeasible] {
            subpop.sort_by_key(|item| item.indiv.cost(costs));
            update_biased_fitness(subpop, self.nb_elite, self.nb_close, self.data.num_clients());
        }
    }

    /// Select two parents by binary tournament, subject to a diversity
    /// restriction on the pair.
    pub fn select_parents<R: Rng>(&self, rng: &mut R) -> (&Individual<'a>, &Individual<'a>) {
        let first = self.binary_tournament(rng);
        let mut second = self.binary_tournament(rng);

        let lower = self.lb_diversity * self.data.num_clients() as f64;
        let upper = self.ub_diversity * self.data.num_clients() as f64;

        // Redraw the second parent a bounded number of times in search of
        // a partner at a useful structural distance.
        let mut diversity = first.broken_pairs_distance(second) as f64;
        let mut tries = 0;

        while (diversity < lower || diversity > upper) && tries < 10 {
            second = self.binary_tournament(rng);
            diversity = first.broken_pairs_distance(second) as f64;
            tries += 1;
        }

        (first, second)
    }

    // Uniformly draws two members from the union of both sub-populations
    // and returns the one with the better (lower) fitness.
    fn binary_tournament<R: Rng>(&self, rng: &mut R) -> &Individual<'a> {
        let item = |idx: usize| {
            if idx < self.feasible.len() {
                &self.feasible[idx]
            } else {
                &self.infeasible[idx - self.feasible.len()]
            }
        };

        let total = self.feasible.len() + self.infeasible.len();
        let first = item(rng.gen_range(0..total));
        let second = item(rng.gen_range(0..total));

        if first.fitness < second.fitness {
            &first.indiv
        } else {
            &second.indiv
        }
    }

    /// The best feasible solution observed so far, if any.
    pub fn best(&self) -> Option<&Individual<'a>> {
        self.best.as_ref()
    }

    /// The total number of individuals over both sub-populations.
    pub fn size(&self) -> usize {
        self.feasible.len() + self.infeasible.len()
    }

    /// The number of feasible individuals.
    pub fn num_feasible(&self) -> usize {
        self.feasible.len()
    }

    /// The number of infeasible individuals.
    pub fn num_infeasible(&self) -> usize {
        self.infeasible.len()
    }

    /// Iterate over all individuals, feasible first.
    pub fn iter(&self) -> impl Iterator<Item = &Individual<'a>> {
        self.feasible
            .iter()
            .chain(self.infeasible.iter())
            .map(|item| &item.indiv)
    }
}

// Computes the biased fitness of each item. The sub-population is kept in
// ascending cost order, so an item's index is its cost rank; the diversity
// rank orders items by average distance to their closest neighbours,
// descending. Elitism shrinks the weight of the diversity rank.
fn update_biased_fitness(
    subpop: &mut [PopulationItem],
    nb_elite: usize,
    nb_close: usize,
    num_clients: usize,
) {
    let pop_size = subpop.len();

    if pop_size == 0 {
        return;
    }

    let mut diversity: Vec<(f64, usize)> = subpop
        .iter()
        .enumerate()
        .map(|(cost_rank, item)| {
            (
                avg_broken_pairs_distance_closest(item, nb_close, num_clients),
                cost_rank,
            )
        })
        .collect();

    diversity.sort_by(|a, b| b.0.total_cmp(&a.0).then(b.1.cmp(&a.1)));

    let nb_elite = nb_elite.min(pop_size);
    let div_weight = 1.0 - nb_elite as f64 / pop_size as f64;

    for (div_rank, &(_, cost_rank)) in diversity.iter().enumerate() {
        subpop[cost_rank].fitness =
            (cost_rank as f64 + div_weight * div_rank as f64) / pop_size as f64;
    }
}

// The average broken pairs distance to the closest neighbours, normalised
// by the number of clients and the number of neighbours considered.
fn avg_broken_pairs_distance_closest(
    item: &PopulationItem,
    nb_close: usize,
    num_clients: usize,
) -> f64 {
    if item.proximity.is_empty() {
        return 0.0;
    }

    let closest = nb_close.min(item.proximity.len());
    let sum: usize = item
        .proximity
        .iter()
        .take(closest)
        .map(|&(distance, _)| distance)
        .sum();

    sum as f64 / (num_clients * closest) as f64
}

// Removes the first duplicate member, if one exists. An item is a
// duplicate when its closest proximity distance is zero; this tolerates
// permutations of identical routes across vehicles.
fn remove_duplicate(subpop: &mut Vec<PopulationItem>) -> bool {
    let duplicate = subpop
        .iter()
        .position(|item| matches!(item.proximity.first(), Some(&(0, _))));

    match duplicate {
        Some(idx) => {
            remove_item(subpop, idx);
            true
        }
        None => false,
    }
}

// Removes the member with the worst (largest) biased fitness.
fn remove_worst_biased_fitness(subpop: &mut Vec<PopulationItem>) {
    let mut worst = 0;

    for idx in 1..subpop.len() {
        if subpop[idx].fitness > subpop[worst].fitness {
            worst = idx;
        }
    }

    remove_item(subpop, worst);
}

// Removes the item and scrubs it from all peer proximity lists.
fn remove_item(subpop: &mut Vec<PopulationItem>, idx: usize) {
    let id = subpop[idx].id;
    subpop.remove(idx);

    for item in subpop.iter_mut() {
        item.proximity.retain(|&(_, peer)| peer != id);
    }
}
