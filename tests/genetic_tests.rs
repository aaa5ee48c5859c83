//! Tests for the crossover operator and the full genetic driver.

use hgs_vrptw::config::Config;
use hgs_vrptw::genetic::order_crossover;
use hgs_vrptw::individual::Individual;
use hgs_vrptw::matrix::Matrix;
use hgs_vrptw::problem::{Client, ProblemData};
use hgs_vrptw::HgsAlgorithm;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A clustered instance small enough for quick end-to-end runs.
fn create_test_instance(num_clients: usize, num_vehicles: usize, capacity: i64) -> ProblemData {
    let mut rng = ChaCha8Rng::seed_from_u64(12345);
    let mut coords = vec![(0_i64, 0_i64)];
    let mut clients = vec![Client::new(0, 0, 0, 0, 0, 10_000, 0)];

    for _ in 0..num_clients {
        let x = rng.gen_range(-50..=50);
        let y = rng.gen_range(-50..=50);

        coords.push((x, y));
        clients.push(Client::new(x, y, rng.gen_range(1..5), 2, 0, 10_000, 0));
    }

    let n = coords.len();
    let mut dist = Matrix::new(n);

    for i in 0..n {
        for j in 0..n {
            let dx = (coords[i].0 - coords[j].0) as f64;
            let dy = (coords[i].1 - coords[j].1) as f64;
            dist.set(i, j, (dx * dx + dy * dy).sqrt().round() as i64);
        }
    }

    let dur = dist.clone();
    ProblemData::new(clients, num_vehicles, capacity, dist, dur).unwrap()
}

#[test]
fn test_order_crossover_produces_valid_assignment() {
    let data = create_test_instance(10, 3, 100);
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    for _ in 0..20 {
        let parent1 = Individual::random(&data, &mut rng);
        let parent2 = Individual::random(&data, &mut rng);

        let offspring = order_crossover(&parent1, &parent2, &data, &mut rng);

        let mut clients: Vec<usize> = offspring.routes().iter().flatten().copied().collect();
        clients.sort_unstable();
        assert_eq!(clients, (1..=10).collect::<Vec<_>>());
        assert_eq!(offspring.routes().len(), 3);
    }
}

#[test]
fn test_order_crossover_inherits_parent_material() {
    let data = create_test_instance(8, 2, 100);
    let mut rng = ChaCha8Rng::seed_from_u64(2);

    let parent1 = Individual::random(&data, &mut rng);
    let parent2 = Individual::random(&data, &mut rng);
    let offspring = order_crossover(&parent1, &parent2, &data, &mut rng);

    // Every arc in the offspring giant tour appears in at least one
    // parent giant tour or crosses a crossover cut; in particular the
    // offspring is never entirely unrelated to both parents.
    let tour: Vec<usize> = offspring.routes().iter().flatten().copied().collect();
    let parent_tour: Vec<usize> = parent1.routes().iter().flatten().copied().collect();

    let pairs = |tour: &[usize]| -> Vec<(usize, usize)> {
        tour.windows(2).map(|w| (w[0], w[1])).collect()
    };

    let offspring_pairs = pairs(&tour);
    let parent_pairs = [pairs(&parent_tour), {
        let tour2: Vec<usize> = parent2.routes().iter().flatten().copied().collect();
        pairs(&tour2)
    }]
    .concat();

    let inherited = offspring_pairs
        .iter()
        .filter(|&pair| parent_pairs.contains(pair))
        .count();

    assert!(inherited > 0);
}

#[test]
fn test_algorithm_run_improves_over_random_solutions() {
    let data = create_test_instance(12, 4, 30);

    let config = Config::default()
        .with_min_pop_size(8)
        .with_generation_size(8)
        .with_nb_granular(6)
        .with_post_process_path_length(3)
        .with_max_iterations_without_improvement(40);

    let mut algorithm = HgsAlgorithm::new(&data, config).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(5);

    let best = algorithm.run(&mut rng).unwrap();

    // The incumbent covers every client exactly once.
    let mut clients: Vec<usize> = best.routes().iter().flatten().copied().collect();
    clients.sort_unstable();
    assert_eq!(clients, (1..=12).collect::<Vec<_>>());

    // And it is no worse than a batch of random solutions.
    let mut sample_rng = ChaCha8Rng::seed_from_u64(6);
    let random_best = (0..50)
        .map(|_| {
            let indiv = Individual::random(&data, &mut sample_rng);
            indiv.distance() + 1_000 * indiv.excess_load() + 1_000 * indiv.time_warp()
        })
        .min()
        .unwrap();

    assert!(best.is_feasible());
    assert!(best.distance() <= random_best);
    assert!(algorithm.iterations > 0);
}

#[test]
fn test_algorithm_run_is_deterministic_per_seed() {
    let data = create_test_instance(10, 3, 30);

    let config = Config::default()
        .with_min_pop_size(5)
        .with_generation_size(5)
        .with_nb_granular(5)
        .with_post_process_path_length(0)
        .with_max_iterations_without_improvement(25);

    let mut first_algorithm = HgsAlgorithm::new(&data, config.clone()).unwrap();
    let mut first_rng = ChaCha8Rng::seed_from_u64(77);
    let first = first_algorithm.run(&mut first_rng).unwrap();

    let mut second_algorithm = HgsAlgorithm::new(&data, config).unwrap();
    let mut second_rng = ChaCha8Rng::seed_from_u64(77);
    let second = second_algorithm.run(&mut second_rng).unwrap();

    assert_eq!(first.routes(), second.routes());
    assert_eq!(first.distance(), second.distance());
    assert_eq!(first_algorithm.iterations, second_algorithm.iterations);
}
