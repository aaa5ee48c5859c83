//! Unit tests for population management and parent selection.

use hgs_vrptw::config::Config;
use hgs_vrptw::individual::Individual;
use hgs_vrptw::matrix::Matrix;
use hgs_vrptw::penalty::CostEvaluator;
use hgs_vrptw::population::Population;
use hgs_vrptw::problem::{Client, ProblemData};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

const HORIZON: i64 = 1_000_000;

/// Six clients spread on a line, wide time windows, ample capacity.
fn create_test_instance(num_vehicles: usize) -> ProblemData {
    let n = 7;
    let mut dist = Matrix::new(n);

    for i in 0..n {
        for j in 0..n {
            dist.set(i, j, 13 * (i as i64 - j as i64).abs());
        }
    }

    let clients = (0..n)
        .map(|idx| {
            if idx == 0 {
                Client::new(0, 0, 0, 0, 0, HORIZON, 0)
            } else {
                Client::new(13 * idx as i64, 0, 1, 0, 0, HORIZON, 0)
            }
        })
        .collect();

    let dur = dist.clone();
    ProblemData::new(clients, num_vehicles, 100, dist, dur).unwrap()
}

/// An RNG wrapper that counts how many random words are drawn.
struct CountingRng {
    inner: ChaCha8Rng,
    draws: u64,
}

impl CountingRng {
    fn new(seed: u64) -> Self {
        CountingRng {
            inner: ChaCha8Rng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl RngCore for CountingRng {
    fn next_u32(&mut self) -> u32 {
        self.draws += 1;
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws += 1;
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}

#[test]
fn test_add_tracks_best_feasible_solution() {
    let data = create_test_instance(3);
    let config = Config::default();
    let costs = CostEvaluator::new(20, 6);
    let mut population = Population::new(&data, &config);

    assert!(population.best().is_none());

    let good = Individual::new(&data, vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
    let poor = Individual::new(&data, vec![vec![1, 4], vec![2, 5], vec![3, 6]]).unwrap();
    assert!(poor.distance() > good.distance());

    population.add(poor.clone(), &costs);
    let best_after_poor = population.best().unwrap().distance();

    population.add(good.clone(), &costs);
    let best_after_good = population.best().unwrap().distance();

    assert_eq!(best_after_poor, poor.distance());
    assert_eq!(best_after_good, good.distance());

    // A worse solution does not displace the incumbent.
    population.add(poor, &costs);
    assert_eq!(population.best().unwrap().distance(), good.distance());
}

#[test]
fn test_sub_population_sizes_stay_bounded() {
    let data = create_test_instance(3);
    let config = Config::default()
        .with_min_pop_size(4)
        .with_generation_size(3);
    let costs = CostEvaluator::new(20, 6);

    let mut population = Population::new(&data, &config);
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    for _ in 0..60 {
        population.add(Individual::random(&data, &mut rng), &costs);

        // After any add, both sub-populations respect the hard cap.
        assert!(population.num_feasible() <= 4 + 3);
        assert!(population.num_infeasible() <= 4 + 3);
    }
}

#[test]
fn test_survivor_selection_purges_duplicates_first() {
    let data = create_test_instance(3);
    let config = Config::default()
        .with_min_pop_size(2)
        .with_generation_size(2);
    let costs = CostEvaluator::new(20, 6);

    let mut population = Population::new(&data, &config);

    // Three copies of one solution plus two distinct ones overflow the
    // sub-population (cap 4), so the purge runs; the duplicates must go.
    let duplicated = vec![vec![1, 2, 3], vec![4, 5, 6]];
    let other = vec![vec![6, 5, 4], vec![3, 2, 1]];
    let third = vec![vec![1, 3, 5], vec![2, 4, 6]];

    for routes in [duplicated.clone(), duplicated.clone(), duplicated, other, third] {
        population.add(Individual::new(&data, routes).unwrap(), &costs);
    }

    assert_eq!(population.size(), 2);

    // At most one copy of the duplicated solution can survive.
    let copies = population
        .iter()
        .filter(|indiv| indiv.routes()[0] == vec![1, 2, 3])
        .count();
    assert!(copies <= 1);
}

#[test]
fn test_full_elitism_keeps_cheapest_survivors() {
    let data = create_test_instance(6);
    let costs = CostEvaluator::new(20, 6);

    // With nb_elite at least the sub-population size, the diversity rank
    // carries no weight: biased fitness is the pure cost rank, so the
    // purge removes exactly the most expensive members.
    let config = Config::default()
        .with_min_pop_size(2)
        .with_generation_size(1)
        .with_nb_elite(100);

    let mut population = Population::new(&data, &config);

    // Four structurally distinct solutions with strictly increasing
    // distance: more routes on this line instance cost more.
    let solutions = [
        vec![vec![1, 2, 3, 4, 5, 6]],
        vec![vec![1, 2, 3], vec![4, 5, 6]],
        vec![vec![1, 2], vec![3, 4], vec![5, 6]],
        vec![vec![1], vec![2], vec![3], vec![4], vec![5], vec![6]],
    ];

    let mut distances: Vec<i64> = Vec::new();

    for routes in &solutions {
        let indiv = Individual::new(&data, routes.clone()).unwrap();
        distances.push(indiv.distance());
        population.add(indiv, &costs);
    }

    assert!(distances.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(population.size(), 2);

    let mut survivors: Vec<i64> = population.iter().map(|indiv| indiv.distance()).collect();
    survivors.sort_unstable();
    assert_eq!(survivors, vec![distances[0], distances[1]]);
}

#[test]
fn test_select_parents_returns_members() {
    let data = create_test_instance(3);
    let config = Config::default();
    let costs = CostEvaluator::new(20, 6);

    let mut population = Population::new(&data, &config);
    let mut rng = ChaCha8Rng::seed_from_u64(9);

    for _ in 0..10 {
        population.add(Individual::random(&data, &mut rng), &costs);
    }

    for _ in 0..25 {
        let (first, second) = population.select_parents(&mut rng);
        assert_eq!(first.routes().iter().flatten().count(), 6);
        assert_eq!(second.routes().iter().flatten().count(), 6);
    }
}

#[test]
fn test_select_parents_caps_diversity_redraws() {
    let data = create_test_instance(3);
    let config = Config::default();
    let costs = CostEvaluator::new(20, 6);

    let mut population = Population::new(&data, &config);

    // Two identical individuals: their broken-pairs distance of zero can
    // never satisfy the lower diversity bound, so the redraw loop must
    // hit its cap of 10 and return anyway.
    let routes = vec![vec![1, 2, 3], vec![4, 5, 6]];
    population.add(Individual::new(&data, routes.clone()).unwrap(), &costs);
    population.add(Individual::new(&data, routes).unwrap(), &costs);

    let mut rng = CountingRng::new(17);
    let (first, second) = population.select_parents(&mut rng);

    assert_eq!(first.broken_pairs_distance(second), 0);

    // Two tournaments for the initial parents plus ten redraws, each
    // drawing two candidates: 24 uniform draws in total.
    assert_eq!(rng.draws, 24);
}

#[test]
fn test_reorder_after_penalty_change_is_consistent() {
    let data = create_test_instance(3);
    let config = Config::default();

    let mut population = Population::new(&data, &config);
    let mut rng = ChaCha8Rng::seed_from_u64(21);

    let costs = CostEvaluator::new(1, 1);
    for _ in 0..12 {
        population.add(Individual::random(&data, &mut rng), &costs);
    }

    let size = population.size();

    // Reordering under much harsher penalties keeps the membership
    // intact and still allows parent selection.
    let harsh = CostEvaluator::new(500, 500);
    population.reorder(&harsh);

    assert_eq!(population.size(), size);
    let (first, second) = population.select_parents(&mut rng);
    assert_eq!(first.routes().iter().flatten().count(), 6);
    assert_eq!(second.routes().iter().flatten().count(), 6);
}

#[test]
fn test_initialize_seeds_population() {
    let data = create_test_instance(3);
    let config = Config::default().with_min_pop_size(5).with_generation_size(8);
    let costs = CostEvaluator::new(20, 6);

    let mut population = Population::new(&data, &config);
    let mut rng = ChaCha8Rng::seed_from_u64(25);
    population.initialize(&costs, &mut rng);

    // Four times the minimum size are generated; survivor selection may
    // shrink the result, but the population is never empty nor above the
    // caps.
    assert!(population.size() > 0);
    assert!(population.num_feasible() <= 5 + 8);
    assert!(population.num_infeasible() <= 5 + 8);
}
