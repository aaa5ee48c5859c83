//! Benchmarks for the local search engine and the full algorithm.

#[cfg(feature = "bench")]
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use hgs_vrptw::config::Config;
use hgs_vrptw::individual::Individual;
use hgs_vrptw::local_search::{Exchange, LocalSearch, SwapStar};
use hgs_vrptw::matrix::Matrix;
use hgs_vrptw::penalty::CostEvaluator;
use hgs_vrptw::problem::{Client, ProblemData};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Create a benchmark instance with clients on a grid and staggered time
/// windows.
fn create_benchmark_instance(size: usize) -> ProblemData {
    let grid = (size as f64).sqrt().ceil() as usize;
    let mut coords = vec![(0_i64, 0_i64)];
    let mut clients = vec![Client::new(0, 0, 0, 0, 0, 100_000, 0)];

    for idx in 1..=size {
        let row = ((idx - 1) / grid) as i64;
        let col = ((idx - 1) % grid) as i64;
        let (x, y) = (col * 10, row * 10);

        coords.push((x, y));
        clients.push(Client::new(
            x,
            y,
            1 + (idx as i64 % 4),
            5,
            10 * row,
            10 * row + 5_000,
            0,
        ));
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
    ProblemData::new(clients, (size / 5).max(1), 10, dist, dur).unwrap()
}

fn engine<'a>(data: &'a ProblemData, config: &Config) -> LocalSearch<'a> {
    let mut local_search = LocalSearch::new(data, config).unwrap();

    for (n, m) in [(1, 0), (2, 0), (3, 0), (1, 1), (2, 1), (3, 1), (2, 2)] {
        local_search.add_node_operator(Exchange::new(n, m));
    }

    local_search.add_route_operator(SwapStar::new(data.num_clients(), data.num_vehicles()));
    local_search
}

#[cfg(feature = "bench")]
fn benchmark_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    let config = Config::default();
    let costs = CostEvaluator::new(20, 6);

    for size in [50, 100] {
        let data = create_benchmark_instance(size);

        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            let mut local_search = engine(data, &config);
            let mut rng = ChaCha8Rng::seed_from_u64(42);

            b.iter(|| {
                let indiv = Individual::random(data, &mut rng);
                local_search.search(&indiv, &costs, &mut rng).unwrap()
            });
        });
    }

    group.finish();
}

#[cfg(feature = "bench")]
fn benchmark_intensify(c: &mut Criterion) {
    let mut group = c.benchmark_group("intensify");
    let config = Config::default().with_post_process_path_length(5);
    let costs = CostEvaluator::new(20, 6);

    for size in [50] {
        let data = create_benchmark_instance(size);

        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            let mut local_search = engine(data, &config);
            let mut rng = ChaCha8Rng::seed_from_u64(42);

            b.iter(|| {
                let indiv = Individual::random(data, &mut rng);
                let improved = local_search.search(&indiv, &costs, &mut rng).unwrap();
                local_search.intensify(&improved, &costs, &mut rng).unwrap()
            });
        });
    }

    group.finish();
}

#[cfg(feature = "bench")]
criterion_group!(benches, benchmark_search, benchmark_intensify);

#[cfg(feature = "bench")]
criterion_main!(benches);

#[cfg(not(feature = "bench"))]
fn main() {}
