//! Basic example of using the HGS-VRPTW library.

use hgs_vrptw::config::Config;
use hgs_vrptw::problem::ProblemData;
use hgs_vrptw::utils::{format_duration, save_solution};
use hgs_vrptw::HgsAlgorithm;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::env;
use std::time::{Duration, Instant};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hgs_vrptw=info".into()),
        )
        .init();

    // Get instance path and seed from the command line.
    let args: Vec<String> = env::args().collect();
    let instance_path = args.get(1).map(String::as_str).unwrap_or("instances/toy.vrp");
    let seed: u64 = args.get(2).map(|s| s.parse()).transpose()?.unwrap_or(42);

    println!("Loading instance from: {}", instance_path);
    let data = ProblemData::from_file(instance_path)?;
    println!(
        "Loaded instance with {} clients and {} vehicles",
        data.num_clients(),
        data.num_vehicles()
    );

    let config = Config::new()
        .with_min_pop_size(25)
        .with_generation_size(40)
        .with_nb_granular(20)
        .with_max_iterations_without_improvement(5_000)
        .with_time_limit(Duration::from_secs(30));

    let mut algorithm = HgsAlgorithm::new(&data, config)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    println!("Starting search (seed {}, time limit 30s)", seed);
    let start_time = Instant::now();
    let best = algorithm.run(&mut rng)?;
    let runtime = start_time.elapsed();

    println!("Search completed in {}", format_duration(runtime));
    println!("Iterations: {}", algorithm.iterations);
    println!("Best distance: {}", best.distance());
    println!("Feasible: {}", best.is_feasible());
    println!();
    print!("{}", best);

    save_solution(&best, "solution.txt")?;
    println!("Solution written to solution.txt");

    Ok(())
}
