//! Individual representation: an immutable routing decision.

use crate::error::Error;
use crate::penalty::CostEvaluator;
use crate::problem::ProblemData;
use crate::{Cost, Distance, Duration, Load};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;

/// A complete assignment of clients to vehicle routes, with its derived
/// cost measures computed once at construction.
///
/// Routes do not contain depot entries; the depot implicitly starts and
/// ends every route. Non-empty routes occupy the low indices, and the
/// route list always has exactly `num_vehicles` entries.
#[derive(Debug, Clone)]
pub struct Individual<'a> {
    data: &'a ProblemData,
    routes: Vec<Vec<usize>>,
    /// [pred, succ] pair for each client; depot is 0 at route endpoints
    neighbours: Vec<(usize, usize)>,
    num_routes: usize,
    distance: Distance,
    excess_load: Load,
    time_warp: Duration,
}

impl<'a> Individual<'a> {
    /// Construct an individual from explicit routes. Non-empty routes are
    /// shifted to the front (preserving relative order) and the route list
    /// is padded with empty routes up to the number of vehicles.
    pub fn new(data: &'a ProblemData, mut routes: Vec<Vec<usize>>) -> Result<Self, Error> {
        if routes.len() > data.num_vehicles() {
            return Err(Error::TooManyRoutes {
                routes: routes.len(),
                vehicles: data.num_vehicles(),
            });
        }

        routes.resize(data.num_vehicles(), Vec::new());

        // Stable, so the relative order of non-empty routes is preserved.
        routes.sort_by_key(|route| route.is_empty());

        let mut indiv = Individual {
            data,
            routes,
            neighbours: vec![(0, 0); data.num_clients() + 1],
            num_routes: 0,
            distance: 0,
            excess_load: 0,
            time_warp: 0,
        };

        indiv.make_neighbours();
        indiv.evaluate();

        Ok(indiv)
    }

    /// Construct a random individual: a shuffled permutation of all
    /// clients, distributed evenly over the routes.
    pub fn random<R: Rng>(data: &'a ProblemData, rng: &mut R) -> Self {
        let num_clients = data.num_clients();
        let num_vehicles = data.num_vehicles();

        let mut clients: Vec<usize> = (1..=num_clients).collect();
        clients.shuffle(rng);

        // Clients per route, adjusted upwards when the division is not
        // perfect so the final route is never over-filled.
        let per_vehicle = (num_clients / num_vehicles).max(1);
        let per_route = per_vehicle + usize::from(num_clients % num_vehicles != 0);

        let mut routes = vec![Vec::new(); num_vehicles];
        for (idx, client) in clients.into_iter().enumerate() {
            routes[idx / per_route].push(client);
        }

        let mut indiv = Individual {
            data,
            routes,
            neighbours: vec![(0, 0); num_clients + 1],
            num_routes: 0,
            distance: 0,
            excess_load: 0,
            time_warp: 0,
        };

        indiv.make_neighbours();
        indiv.evaluate();

        indiv
    }

    // Determines the [pred, succ] pairs for each client.
    fn make_neighbours(&mut self) {
        self.neighbours[0] = (0, 0); // depot neighbours have no meaning

        for route in &self.routes {
            for (idx, &client) in route.iter().enumerate() {
                let pred = if idx == 0 { 0 } else { route[idx - 1] };
                let succ = if idx == route.len() - 1 {
                    0
                } else {
                    route[idx + 1]
                };

                self.neighbours[client] = (pred, succ);
            }
        }
    }

    // Evaluates distance, excess load, and time warp over all routes by a
    // single forward traversal per route.
    fn evaluate(&mut self) {
        let data = self.data;

        self.num_routes = 0;
        self.distance = 0;
        self.excess_load = 0;
        self.time_warp = 0;

        for route in &self.routes {
            if route.is_empty() {
                break; // all subsequent routes are empty as well
            }

            self.num_routes += 1;

            // The route cannot leave the depot before the latest release
            // time among its clients.
            let release = route
                .iter()
                .map(|&client| data.client(client).release_time)
                .max()
                .unwrap_or(0);

            let mut distance = data.dist(0, route[0]);
            let mut load = data.client(route[0]).demand;
            let mut time_warp = 0;
            let mut time = release + data.duration(0, route[0]);

            let first = data.client(route[0]);
            if time < first.tw_early {
                time = first.tw_early;
            }

            if time > first.tw_late {
                time_warp += time - first.tw_late;
                time = first.tw_late;
            }

            for window in route.windows(2) {
                let (prev, curr) = (window[0], window[1]);
                let client = data.client(curr);

                distance += data.dist(prev, curr);
                load += client.demand;
                time += data.client(prev).service_duration + data.duration(prev, curr);

                if time < client.tw_early {
                    time = client.tw_early; // wait for the window to open
                }

                if time > client.tw_late {
                    time_warp += time - client.tw_late;
                    time = client.tw_late;
                }
            }

            let last = *route.last().unwrap_or(&0);
            distance += data.dist(last, 0);
            time += data.client(last).service_duration + data.duration(last, 0);

            // Only the closing of the depot window matters on return.
            time_warp += (time - data.depot().tw_late).max(0);

            self.distance += distance;
            self.time_warp += time_warp;
            self.excess_load += (load - data.vehicle_capacity()).max(0);
        }
    }

    /// This individual's penalized objective value.
    pub fn cost(&self, costs: &CostEvaluator) -> Cost {
        let capacity = self.data.vehicle_capacity();

        self.distance
            + costs.load_penalty(capacity + self.excess_load, capacity)
            + costs.tw_penalty(self.time_warp)
    }

    /// Total travel distance over all routes.
    pub fn distance(&self) -> Distance {
        self.distance
    }

    /// Total load in excess of the vehicle capacity, over all routes.
    pub fn excess_load(&self) -> Load {
        self.excess_load
    }

    /// Total time warp over all routes.
    pub fn time_warp(&self) -> Duration {
        self.time_warp
    }

    /// The number of non-empty routes.
    pub fn num_routes(&self) -> usize {
        self.num_routes
    }

    /// This individual's routes. Non-empty routes occupy the low indices.
    pub fn routes(&self) -> &[Vec<usize>] {
        &self.routes
    }

    /// The [pred, succ] pair of each client in this individual's routes.
    pub fn neighbours(&self) -> &[(usize, usize)] {
        &self.neighbours
    }

    /// True when this solution violates neither load nor time windows.
    pub fn is_feasible(&self) -> bool {
        !self.has_excess_load() && !self.has_time_warp()
    }

    /// True if the solution violates load constraints.
    pub fn has_excess_load(&self) -> bool {
        self.excess_load > 0
    }

    /// True if the solution violates time window constraints.
    pub fn has_time_warp(&self) -> bool {
        self.time_warp > 0
    }

    /// Counts, over all clients, how many predecessor and successor
    /// assignments differ between this individual and the other: a
    /// structural diversity measure. The count is symmetric and at most
    /// twice the number of clients; depot acts as the sentinel neighbour
    /// at route endpoints.
    pub fn broken_pairs_distance(&self, other: &Individual) -> usize {
        let mut dist = 0;

        for client in 1..=self.data.num_clients() {
            let (pred, succ) = self.neighbours[client];
            let (other_pred, other_succ) = other.neighbours[client];

            dist += usize::from(pred != other_pred) + usize::from(succ != other_succ);
        }

        dist
    }
}

impl PartialEq for Individual<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
            && self.excess_load == other.excess_load
            && self.time_warp == other.time_warp
            && self.neighbours == other.neighbours
    }
}

impl Eq for Individual<'_> {}

impl fmt::Display for Individual<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, route) in self.routes.iter().take(self.num_routes).enumerate() {
            write!(f, "Route #{}:", idx + 1)?;

            for client in route {
                write!(f, " {}", client)?;
            }

            writeln!(f)?;
        }

        writeln!(f, "Distance: {}", self.distance)
    }
}
