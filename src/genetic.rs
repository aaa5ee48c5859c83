//! Genetic recombination of parent solutions.

use crate::individual::Individual;
use crate::problem::ProblemData;
use rand::Rng;

/// Perform order crossover (OX) between two parent solutions.
///
/// The parents' routes are flattened into giant tours; a random slice of
/// the first parent is copied into the offspring, and the remaining
/// positions are filled in the order the missing clients appear in the
/// second parent. The offspring tour is then distributed evenly over the
/// available routes; local search is expected to repair the route
/// structure afterwards.
pub fn order_crossover<'a, R: Rng>(
    parent1: &Individual,
    parent2: &Individual,
    data: &'a ProblemData,
    rng: &mut R,
) -> Individual<'a> {
    let tour1 = giant_tour(parent1);
    let tour2 = giant_tour(parent2);
    let tour_size = tour1.len();

    let cut1 = rng.gen_range(0..tour_size);
    let cut2 = rng.gen_range(0..tour_size);
    let (start, end) = if cut1 <= cut2 { (cut1, cut2) } else { (cut2, cut1) };

    let mut offspring = vec![0; tour_size];
    let mut used = vec![false; data.num_clients() + 1];

    // Copy the [start, end] slice from the first parent.
    for idx in start..=end {
        offspring[idx] = tour1[idx];
        used[tour1[idx]] = true;
    }

    // Fill the remaining positions from the second parent, wrapping
    // around from just after the copied slice.
    let mut fill = (end + 1) % tour_size;

    for offset in 0..tour_size {
        let client = tour2[(end + 1 + offset) % tour_size];

        if !used[client] {
            offspring[fill] = client;
            used[client] = true;
            fill = (fill + 1) % tour_size;
        }
    }

    split_evenly(&offspring, data)
}

// Flattens the non-empty routes into one giant tour.
fn giant_tour(indiv: &Individual) -> Vec<usize> {
    indiv
        .routes()
        .iter()
        .take(indiv.num_routes())
        .flatten()
        .copied()
        .collect()
}

// Distributes a giant tour evenly over the available routes, the same way
// random individuals are constructed.
fn split_evenly<'a>(tour: &[usize], data: &'a ProblemData) -> Individual<'a> {
    let num_clients = data.num_clients();
    let num_vehicles = data.num_vehicles();

    let per_vehicle = (num_clients / num_vehicles).max(1);
    let per_route = per_vehicle + usize::from(num_clients % num_vehicles != 0);

    let mut routes = vec![Vec::new(); num_vehicles];

    for (idx, &client) in tour.iter().enumerate() {
        routes[idx / per_route].push(client);
    }

    // The tour covers every client exactly once and the route count
    // matches the fleet, so construction cannot fail.
    match Individual::new(data, routes) {
        Ok(indiv) => indiv,
        Err(_) => unreachable!("even split never exceeds the fleet size"),
    }
}
