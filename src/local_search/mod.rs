//! Local search engine for the HGS-VRPTW algorithm.
//!
//! The engine improves one candidate solution at a time. `search` drives
//! node operators over granular (U, V) client pairs until no improving
//! move remains; `intensify` drives route operators over route pairs and
//! finishes each modified route with subpath enumeration. Both rely on the
//! segment algebra to evaluate every move in O(1).

pub mod exchange;
pub mod space;
pub mod swap_star;

pub use exchange::Exchange;
pub use space::{Node, NodeIndex, Route, SearchSpace};
pub use swap_star::SwapStar;

use crate::config::Config;
use crate::error::Error;
use crate::individual::Individual;
use crate::penalty::CostEvaluator;
use crate::problem::ProblemData;
use crate::segment::TimeWindowSegment;
use crate::utils::next_permutation;
use crate::Cost;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

/// A local search operator working on client node pairs (U, V).
pub trait NodeOperator {
    /// The cost delta of applying this operator to (U, V). Non-improving
    /// or rejected moves return 0 or a positive value.
    fn evaluate(
        &self,
        u: NodeIndex,
        v: NodeIndex,
        space: &SearchSpace,
        costs: &CostEvaluator,
    ) -> Cost;

    /// Apply the move. Only called after `evaluate` returned a strictly
    /// negative delta; the engine updates the touched routes afterwards.
    fn apply(&self, u: NodeIndex, v: NodeIndex, space: &mut SearchSpace);
}

/// A local search operator working on route pairs (U, V).
pub trait RouteOperator {
    /// Called when a fresh solution is loaded into the engine.
    fn init(&mut self, _space: &SearchSpace) {}

    /// The cost delta of the best move this operator finds for the route
    /// pair.
    fn evaluate(
        &mut self,
        route_u: usize,
        route_v: usize,
        space: &SearchSpace,
        costs: &CostEvaluator,
    ) -> Cost;

    /// Apply the best move found by the preceding `evaluate` call.
    fn apply(&mut self, route_u: usize, route_v: usize, space: &mut SearchSpace);

    /// Called whenever the given route has been modified.
    fn update(&mut self, _route: usize) {}
}

/// Drives node and route operators to a local optimum.
pub struct LocalSearch<'a> {
    data: &'a ProblemData,
    space: SearchSpace<'a>,
    /// Granular neighbours per client; nothing is stored for the depot
    neighbours: Vec<Vec<usize>>,
    /// Random client order used when iterating node pairs
    order_nodes: Vec<usize>,
    /// Random route order used when iterating route pairs
    order_routes: Vec<usize>,
    /// Move counter stamps of the last actual modification per route
    last_modified: Vec<i64>,
    node_ops: Vec<Box<dyn NodeOperator>>,
    route_ops: Vec<Box<dyn RouteOperator>>,
    post_process_path_length: usize,
    nb_moves: i64,
    search_completed: bool,
}

impl<'a> LocalSearch<'a> {
    /// Create a new engine for the given instance. Buffers are allocated
    /// here once and reused across searches.
    pub fn new(data: &'a ProblemData, config: &Config) -> Result<Self, Error> {
        if config.nb_granular == 0 {
            return Err(Error::EmptyNeighbourhood);
        }

        let neighbours = calculate_neighbours(data, config);

        Ok(LocalSearch {
            data,
            space: SearchSpace::new(data),
            neighbours,
            order_nodes: (1..=data.num_clients()).collect(),
            order_routes: (0..data.num_vehicles()).collect(),
            last_modified: vec![0; data.num_vehicles()],
            node_ops: Vec::new(),
            route_ops: Vec::new(),
            post_process_path_length: config.post_process_path_length,
            nb_moves: 0,
            search_completed: false,
        })
    }

    /// Register an operator evaluated at client node pairs.
    pub fn add_node_operator(&mut self, op: impl NodeOperator + 'static) {
        self.node_ops.push(Box::new(op));
    }

    /// Register an operator evaluated at route pairs during
    /// intensification.
    pub fn add_route_operator(&mut self, op: impl RouteOperator + 'static) {
        self.route_ops.push(Box::new(op));
    }

    /// Replace the granular neighbourhood structure.
    pub fn set_neighbours(&mut self, neighbours: Vec<Vec<usize>>) {
        debug_assert_eq!(neighbours.len(), self.data.num_clients() + 1);
        self.neighbours = neighbours;
    }

    /// The granular neighbourhood structure currently in use.
    pub fn neighbours(&self) -> &[Vec<usize>] {
        &self.neighbours
    }

    /// Perform regular (node-based) local search around the given
    /// individual, returning the improved individual.
    pub fn search<R: Rng>(
        &mut self,
        indiv: &Individual,
        costs: &CostEvaluator,
        rng: &mut R,
    ) -> Result<Individual<'a>, Error> {
        if self.node_ops.is_empty() {
            return Err(Error::NoOperators);
        }

        self.load_individual(indiv);

        // Shuffling the orders beforehand adds diversity to the search.
        self.order_nodes.shuffle(rng);
        self.node_ops.shuffle(rng);

        // Tracks when each node was last tested, against the per-route
        // modification stamps: a pair only needs re-testing once either
        // route has changed since.
        let mut last_tested_nodes = vec![-1_i64; self.data.num_clients() + 1];
        self.last_modified = vec![0; self.data.num_vehicles()];

        self.search_completed = false;
        self.nb_moves = 0;

        let mut step = 0;
        while !self.search_completed {
            self.search_completed = true;

            for order_idx in 0..self.order_nodes.len() {
                let u_client = self.order_nodes[order_idx];
                let u = self.space.client_node(u_client);

                let last_tested = last_tested_nodes[u_client];
                last_tested_nodes[u_client] = self.nb_moves;

                for nb_idx in 0..self.neighbours[u_client].len() {
                    let v_client = self.neighbours[u_client][nb_idx];
                    let v = self.space.client_node(v_client);

                    let modified_u = self.last_modified[self.space.node(u).route];
                    let modified_v = self.last_modified[self.space.node(v).route];

                    if modified_u > last_tested || modified_v > last_tested {
                        if self.apply_node_ops(u, v, costs) {
                            continue;
                        }

                        // Moves involving V's predecessor only matter when
                        // that predecessor is a depot: those pairs are not
                        // in any neighbour list.
                        let pred_v = self.space.pred(v);
                        let pred_is_depot = self.space.node(pred_v).is_depot();

                        if pred_is_depot && self.apply_node_ops(u, pred_v, costs) {
                            continue;
                        }
                    }
                }

                // Empty route moves are not tested in the first pass, to
                // avoid growing the fleet too eagerly.
                if step > 0 {
                    let empty = self
                        .space
                        .first_empty_route()
                        .map(|route| route.start_depot);

                    if let Some(depot) = empty {
                        self.apply_node_ops(u, depot, costs);
                    }
                }
            }

            step += 1;
        }

        debug!(moves = self.nb_moves, "node-based search reached local optimum");
        self.export_individual()
    }

    /// Perform the more intensive route-based local search around the
    /// given individual: route operators plus subpath enumeration.
    pub fn intensify<R: Rng>(
        &mut self,
        indiv: &Individual,
        costs: &CostEvaluator,
        rng: &mut R,
    ) -> Result<Individual<'a>, Error> {
        self.load_individual(indiv);

        self.order_routes.shuffle(rng);
        self.route_ops.shuffle(rng);

        let mut last_tested_routes = vec![-1_i64; self.data.num_vehicles()];
        self.last_modified = vec![0; self.data.num_vehicles()];

        self.search_completed = false;
        self.nb_moves = 0;

        while !self.search_completed {
            self.search_completed = true;

            for order_idx in 0..self.order_routes.len() {
                let route_u = self.order_routes[order_idx];

                if self.space.route(route_u).is_empty() {
                    continue;
                }

                let last_tested = last_tested_routes[route_u];
                last_tested_routes[route_u] = self.nb_moves;

                for route_v in 0..route_u {
                    if self.space.route(route_v).is_empty() {
                        continue;
                    }

                    let modified = self.last_modified[route_u].max(self.last_modified[route_v]);

                    if modified > last_tested {
                        self.apply_route_ops(route_u, route_v, costs);
                    }
                }

                if self.last_modified[route_u] > last_tested {
                    self.enumerate_subpaths(route_u, costs);
                }
            }
        }

        debug!(moves = self.nb_moves, "route-based search reached local optimum");
        self.export_individual()
    }

    fn apply_node_ops(&mut self, u: NodeIndex, v: NodeIndex, costs: &CostEvaluator) -> bool {
        for op_idx in 0..self.node_ops.len() {
            if self.node_ops[op_idx].evaluate(u, v, &self.space, costs) < 0 {
                // Read the routes first: the operator changes memberships.
                let route_u = self.space.node(u).route;
                let route_v = self.space.node(v).route;

                self.node_ops[op_idx].apply(u, v, &mut self.space);
                self.register_move(route_u, route_v);

                return true;
            }
        }

        false
    }

    fn apply_route_ops(&mut self, route_u: usize, route_v: usize, costs: &CostEvaluator) -> bool {
        for op_idx in 0..self.route_ops.len() {
            if self.route_ops[op_idx].evaluate(route_u, route_v, &self.space, costs) < 0 {
                self.route_ops[op_idx].apply(route_u, route_v, &mut self.space);
                self.register_move(route_u, route_v);

                return true;
            }
        }

        false
    }

    // Updates engine state after an improving move touched the two routes.
    fn register_move(&mut self, route_u: usize, route_v: usize) {
        self.nb_moves += 1;
        self.search_completed = false;

        self.space.update_route(route_u);
        self.last_modified[route_u] = self.nb_moves;

        for op in self.route_ops.iter_mut() {
            op.update(route_u);
        }

        if route_u != route_v {
            self.space.update_route(route_v);
            self.last_modified[route_v] = self.nb_moves;

            for op in self.route_ops.iter_mut() {
                op.update(route_v);
            }
        }
    }

    // Optimally recombines every window of `post_process_path_length`
    // consecutive clients by enumerating its permutations. Only the first
    // improving permutation per window is applied.
    fn enumerate_subpaths(&mut self, route: usize, costs: &CostEvaluator) {
        let size = self.space.route(route).size();
        let k = self.post_process_path_length.min(size);

        if k <= 1 {
            return; // recombining a single node cannot help
        }

        for start in 1..=size + 1 - k {
            // The window is [start, start + k); its fixed anchor points
            // are the nodes at start - 1 and start + k.
            let before = self.space.route(route).node_at(start - 1);
            let after = self.space.route(route).node_at(start + k);

            let mut path: Vec<usize> = (start..start + k).collect();
            let current = self.evaluate_subpath(&path, before, after, route, costs);

            while next_permutation(&mut path) {
                let cost = self.evaluate_subpath(&path, before, after, route, costs);

                if cost < current {
                    let mut prev = before;

                    for &position in &path {
                        let node = self.space.route(route).node_at(position);
                        self.space.insert_after(node, prev);
                        prev = node;
                    }

                    // Finding more than one improving permutation per
                    // window is rare, so move on after the first.
                    self.register_move(route, route);
                    break;
                }
            }
        }
    }

    // Travel distance plus time warp penalty of traversing the window
    // positions in the given permuted order, between the fixed anchors.
    fn evaluate_subpath(
        &self,
        path: &[usize],
        before: NodeIndex,
        after: NodeIndex,
        route: usize,
        costs: &CostEvaluator,
    ) -> Cost {
        let dur = self.data.duration_matrix();

        let mut total_dist = 0;
        let mut tws = self.space.node(before).tw_before;
        let mut from = self.space.node(before).client;

        for &position in path {
            let node = self.space.node(self.space.route(route).node_at(position));
            total_dist += self.data.dist(from, node.client);
            tws = TimeWindowSegment::merge(dur, tws, node.tw);
            from = node.client;
        }

        let after = self.space.node(after);
        total_dist += self.data.dist(from, after.client);
        tws = TimeWindowSegment::merge(dur, tws, after.tw_after);

        total_dist + costs.tw_penalty(tws.total_time_warp())
    }

    fn load_individual(&mut self, indiv: &Individual) {
        self.space.load_individual(indiv);

        for op in self.route_ops.iter_mut() {
            op.init(&self.space);
        }
    }

    fn export_individual(&self) -> Result<Individual<'a>, Error> {
        Individual::new(self.data, self.space.export_routes())
    }
}

/// Build the granular neighbourhood: for each client, the `nb_granular`
/// closest other clients under a proximity measure that accounts for
/// distance, minimal waiting time, and minimal time warp in either
/// direction (Vidal et al. 2012).
pub fn calculate_neighbours(data: &ProblemData, config: &Config) -> Vec<Vec<usize>> {
    let num_clients = data.num_clients();
    let mut neighbours = vec![Vec::new(); num_clients + 1];

    let granularity = config.nb_granular.min(num_clients.saturating_sub(1));

    for i in 1..=num_clients {
        let mut proximities: Vec<(i64, usize)> = Vec::with_capacity(num_clients - 1);

        for j in 1..=num_clients {
            if j == i {
                continue;
            }

            let proximity = directed_proximity(data, config, i, j)
                .min(directed_proximity(data, config, j, i));

            proximities.push((proximity, j));
        }

        proximities.sort_unstable();
        proximities.truncate(granularity);

        // Neighbour lists are kept in ascending client order.
        let mut clients: Vec<usize> = proximities.into_iter().map(|(_, j)| j).collect();
        clients.sort_unstable();
        neighbours[i] = clients;
    }

    neighbours
}

// Proximity of travelling from client `from` to client `to`.
fn directed_proximity(data: &ProblemData, config: &Config, from: usize, to: usize) -> i64 {
    let from_client = data.client(from);
    let to_client = data.client(to);

    let max_release = from_client.release_time.max(to_client.release_time);
    let arc = data.dist(from, to);

    let wait_time =
        to_client.tw_early - arc - from_client.service_duration - from_client.tw_late;

    let earliest_arrival = (max_release + data.dist(0, from)).max(from_client.tw_early);
    let time_warp = earliest_arrival + from_client.service_duration + arc - to_client.tw_late;

    arc + config.weight_wait_time * wait_time.max(0) + config.weight_time_warp * time_warp.max(0)
}
