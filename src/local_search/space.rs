//! Search view of a solution: intrusively linked routes over a node arena.
//!
//! Nodes and routes form a cyclic graph (each node knows its route, each
//! route reaches its nodes through the `next` links). The cycle is
//! expressed with indices into contiguous arenas rather than pointers, so
//! navigation stays O(1) and the whole engine is trivially movable. Client
//! nodes occupy arena slots `1..=num_clients`; every route owns a start
//! and an end depot sentinel, which keeps operator inner loops free of
//! boundary checks.

use crate::individual::Individual;
use crate::problem::ProblemData;
use crate::segment::{DistanceSegment, LoadSegment, TimeWindowSegment};
use crate::{Distance, Duration, Load};

pub type NodeIndex = usize;

/// A client or depot sentinel inside the search view.
#[derive(Debug, Clone, Copy, Default)]
pub struct Node {
    /// Client represented by this node (0 for depot sentinels)
    pub client: usize,
    /// Position within the route: 0 for the start depot, 1..=size for
    /// clients, size + 1 for the end depot
    pub position: usize,
    pub prev: NodeIndex,
    pub next: NodeIndex,
    /// Index of the owning route
    pub route: usize,
    /// Load of the chain from the start depot through this node
    pub cum_load: LoadSegment,
    /// Distance of the chain from the start depot through this node
    pub cum_dist: DistanceSegment,
    /// Time window data of this node alone
    pub tw: TimeWindowSegment,
    /// Time window data of the chain from the start depot through this node
    pub tw_before: TimeWindowSegment,
    /// Time window data of the chain from this node through the end depot
    pub tw_after: TimeWindowSegment,
}

impl Node {
    /// Whether this node is a depot sentinel.
    pub fn is_depot(&self) -> bool {
        self.client == 0
    }

    /// Load of the chain from the start depot through this node.
    pub fn cumulated_load(&self) -> Load {
        self.cum_load.load()
    }

    /// Distance of the chain from the start depot through this node.
    pub fn cumulated_distance(&self) -> Distance {
        self.cum_dist.distance()
    }
}

/// One vehicle route: a node chain between two depot sentinels, with
/// cached totals refreshed by [`SearchSpace::update_route`].
#[derive(Debug, Clone, Default)]
pub struct Route {
    pub idx: usize,
    pub start_depot: NodeIndex,
    pub end_depot: NodeIndex,
    /// Ordered node ids, depots included; rebuilt on update
    nodes: Vec<NodeIndex>,
    load: Load,
    time_warp: Duration,
    /// Polar angle of the route centroid around the instance centroid;
    /// empty routes get a large angle so they sort last on export
    angle_center: f64,
}

impl Route {
    /// The node at the given position (0 = start depot, 1..=size clients,
    /// size + 1 = end depot).
    pub fn node_at(&self, position: usize) -> NodeIndex {
        self.nodes[position]
    }

    /// The number of clients in this route, excluding the depots. Only
    /// valid once the route has been updated after loading.
    pub fn size(&self) -> usize {
        debug_assert!(self.nodes.len() >= 2);
        self.nodes.len() - 2
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Total load on this route.
    pub fn load(&self) -> Load {
        self.load
    }

    /// Total time warp on this route.
    pub fn time_warp(&self) -> Duration {
        self.time_warp
    }

    pub fn has_time_warp(&self) -> bool {
        self.time_warp > 0
    }

    pub fn angle_center(&self) -> f64 {
        self.angle_center
    }
}

/// Arena of nodes and routes materializing one solution for local search.
///
/// The arenas are allocated once per instance and reused across searches;
/// loading an individual only rewires links.
#[derive(Debug)]
pub struct SearchSpace<'a> {
    data: &'a ProblemData,
    /// Centroid of all client locations, anchor for route polar angles
    center: (f64, f64),
    nodes: Vec<Node>,
    routes: Vec<Route>,
}

impl<'a> SearchSpace<'a> {
    pub fn new(data: &'a ProblemData) -> Self {
        let num_clients = data.num_clients();
        let num_vehicles = data.num_vehicles();

        let mut nodes = vec![Node::default(); num_clients + 1 + 2 * num_vehicles];
        let mut routes = Vec::with_capacity(num_vehicles);

        for (client, node) in nodes.iter_mut().enumerate().take(num_clients + 1) {
            node.client = client;
        }

        for idx in 0..num_vehicles {
            let start_depot = num_clients + 1 + idx;
            let end_depot = num_clients + 1 + num_vehicles + idx;

            nodes[start_depot].client = 0;
            nodes[start_depot].route = idx;
            nodes[end_depot].client = 0;
            nodes[end_depot].route = idx;

            routes.push(Route {
                idx,
                start_depot,
                end_depot,
                nodes: Vec::with_capacity(num_clients + 2),
                load: 0,
                time_warp: 0,
                angle_center: 0.0,
            });
        }

        SearchSpace {
            data,
            center: data.centroid(),
            nodes,
            routes,
        }
    }

    pub fn data(&self) -> &'a ProblemData {
        self.data
    }

    pub fn node(&self, id: NodeIndex) -> &Node {
        &self.nodes[id]
    }

    /// The arena id of the node representing the given client.
    pub fn client_node(&self, client: usize) -> NodeIndex {
        client
    }

    pub fn route(&self, idx: usize) -> &Route {
        &self.routes[idx]
    }

    pub fn num_routes(&self) -> usize {
        self.routes.len()
    }

    /// The node directly before the given node.
    pub fn pred(&self, id: NodeIndex) -> NodeIndex {
        self.nodes[id].prev
    }

    /// The node directly after the given node.
    pub fn succ(&self, id: NodeIndex) -> NodeIndex {
        self.nodes[id].next
    }

    /// Whether the route is free of load and time window violations.
    pub fn route_is_feasible(&self, idx: usize) -> bool {
        !self.route_has_excess_load(idx) && self.routes[idx].time_warp == 0
    }

    pub fn route_has_excess_load(&self, idx: usize) -> bool {
        self.routes[idx].load > self.data.vehicle_capacity()
    }

    /// The first empty route, if any.
    pub fn first_empty_route(&self) -> Option<&Route> {
        self.routes.iter().find(|route| route.is_empty())
    }

    /// Distance of the chain between positions `start` and `end` of the
    /// route (inclusive). O(1) through cumulative distances.
    pub fn dist_between(&self, route: usize, start: usize, end: usize) -> Distance {
        debug_assert!(start <= end);

        let route = &self.routes[route];
        let start_dist = self.nodes[route.node_at(start)].cumulated_distance();
        let end_dist = self.nodes[route.node_at(end)].cumulated_distance();

        end_dist - start_dist
    }

    /// Load of the chain between positions `start` and `end` of the route
    /// (inclusive). O(1) through cumulative loads.
    pub fn load_between(&self, route: usize, start: usize, end: usize) -> LoadSegment {
        debug_assert!(1 <= start && start <= end);

        let route = &self.routes[route];
        let before_start = self.nodes[route.node_at(start - 1)].cumulated_load();
        let at_end = self.nodes[route.node_at(end)].cumulated_load();

        LoadSegment::new(at_end - before_start)
    }

    /// Time window data of the chain between positions `start` and `end`
    /// of the route (inclusive), folded left to right.
    pub fn tw_between(&self, route: usize, start: usize, end: usize) -> TimeWindowSegment {
        debug_assert!(1 <= start && start <= end);

        let route = &self.routes[route];
        let dur = self.data.duration_matrix();
        let mut tws = self.nodes[route.node_at(start)].tw;

        for position in start + 1..=end {
            tws = TimeWindowSegment::merge(dur, tws, self.nodes[route.node_at(position)].tw);
        }

        tws
    }

    /// Unlink the node from its current place and relink it directly after
    /// `after`, transferring route ownership. Cached route statistics are
    /// stale until the touched routes are updated.
    pub fn insert_after(&mut self, node: NodeIndex, after: NodeIndex) {
        let (prev, next) = (self.nodes[node].prev, self.nodes[node].next);
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;

        let after_next = self.nodes[after].next;
        self.nodes[after_next].prev = node;
        self.nodes[node].next = after_next;
        self.nodes[node].prev = after;
        self.nodes[after].next = node;

        self.nodes[node].route = self.nodes[after].route;
    }

    /// Swap two non-adjacent nodes in place, exchanging route ownership.
    pub fn swap_with(&mut self, first: NodeIndex, second: NodeIndex) {
        debug_assert!(self.nodes[first].next != second && self.nodes[second].next != first);

        let (first_prev, first_next) = (self.nodes[first].prev, self.nodes[first].next);
        let (second_prev, second_next) = (self.nodes[second].prev, self.nodes[second].next);

        self.nodes[first_prev].next = second;
        self.nodes[first_next].prev = second;
        self.nodes[second_prev].next = first;
        self.nodes[second_next].prev = first;

        self.nodes[first].prev = second_prev;
        self.nodes[first].next = second_next;
        self.nodes[second].prev = first_prev;
        self.nodes[second].next = first_next;

        let route = self.nodes[first].route;
        self.nodes[first].route = self.nodes[second].route;
        self.nodes[second].route = route;
    }

    /// Rebuild the route's node list, cumulative statistics, and cached
    /// totals after link mutations. One forward and one reverse pass.
    pub fn update_route(&mut self, idx: usize) {
        let mut chain = std::mem::take(&mut self.routes[idx].nodes);
        chain.clear();

        let start_depot = self.routes[idx].start_depot;
        let end_depot = self.routes[idx].end_depot;

        let mut node = start_depot;
        chain.push(node);

        while node != end_depot {
            node = self.nodes[node].next;
            chain.push(node);
        }

        let dist = self.data.distance_matrix();
        let dur = self.data.duration_matrix();

        // Forward pass: positions, cumulative load/distance, and prefix
        // time window data.
        for position in 0..chain.len() {
            let id = chain[position];
            self.nodes[id].position = position;
            self.nodes[id].route = idx;

            if position == 0 {
                let tw = self.nodes[id].tw;
                self.nodes[id].cum_load = LoadSegment::default();
                self.nodes[id].cum_dist = DistanceSegment::new(0, 0, 0);
                self.nodes[id].tw_before = tw;
                continue;
            }

            let prev = &self.nodes[chain[position - 1]];
            let (prev_load, prev_dist, prev_tw) = (prev.cum_load, prev.cum_dist, prev.tw_before);

            let client = self.nodes[id].client;
            let demand = self.data.client(client).demand;
            let tw = self.nodes[id].tw;

            self.nodes[id].cum_load = LoadSegment::merge(prev_load, LoadSegment::new(demand));
            self.nodes[id].cum_dist =
                DistanceSegment::merge(dist, prev_dist, DistanceSegment::new(client, client, 0));
            self.nodes[id].tw_before = TimeWindowSegment::merge(dur, prev_tw, tw);
        }

        // Reverse pass: suffix time window data.
        let last = chain[chain.len() - 1];
        self.nodes[last].tw_after = self.nodes[last].tw;

        for position in (0..chain.len() - 1).rev() {
            let id = chain[position];
            let next_tw_after = self.nodes[chain[position + 1]].tw_after;
            let tw = self.nodes[id].tw;
            self.nodes[id].tw_after = TimeWindowSegment::merge(dur, tw, next_tw_after);
        }

        let route = &mut self.routes[idx];
        route.load = self.nodes[end_depot].cumulated_load();
        route.time_warp = self.nodes[end_depot].tw_before.total_time_warp();
        route.nodes = chain;

        self.update_angle(idx);
    }

    // Polar angle of the route's centroid around the instance centroid.
    fn update_angle(&mut self, idx: usize) {
        let route = &self.routes[idx];

        if route.is_empty() {
            self.routes[idx].angle_center = 1.0e30;
            return;
        }

        let mut sum_x = 0.0;
        let mut sum_y = 0.0;

        for position in 1..=route.size() {
            let client = self.nodes[route.node_at(position)].client;
            sum_x += self.data.client(client).x as f64;
            sum_y += self.data.client(client).y as f64;
        }

        let count = route.size() as f64;
        let (center_x, center_y) = self.center;
        self.routes[idx].angle_center =
            (sum_y / count - center_y).atan2(sum_x / count - center_x);
    }

    /// Materialize the individual's routes into the node arenas and
    /// refresh all cached statistics.
    pub fn load_individual(&mut self, indiv: &Individual) {
        for client in 0..=self.data.num_clients() {
            let attributes = self.data.client(client);
            self.nodes[client].tw = TimeWindowSegment::for_client(
                client,
                attributes.service_duration,
                attributes.tw_early,
                attributes.tw_late,
                attributes.release_time,
            );
        }

        let depot_tw = self.nodes[0].tw;

        for idx in 0..self.routes.len() {
            let start_depot = self.routes[idx].start_depot;
            let end_depot = self.routes[idx].end_depot;

            for &depot in &[start_depot, end_depot] {
                self.nodes[depot].tw = depot_tw;
                self.nodes[depot].tw_before = depot_tw;
                self.nodes[depot].tw_after = depot_tw;
            }

            self.nodes[start_depot].prev = end_depot;
            self.nodes[start_depot].next = end_depot;
            self.nodes[end_depot].prev = start_depot;
            self.nodes[end_depot].next = start_depot;

            let mut tail = start_depot;

            for &client in &indiv.routes()[idx] {
                self.nodes[tail].next = client;
                self.nodes[client].prev = tail;
                self.nodes[client].route = idx;
                tail = client;
            }

            self.nodes[tail].next = end_depot;
            self.nodes[end_depot].prev = tail;

            self.update_route(idx);
        }
    }

    /// Read the routes back out, ordered by the polar angle of their
    /// centroids. Empty routes sort last.
    pub fn export_routes(&self) -> Vec<Vec<usize>> {
        let mut angles: Vec<(f64, usize)> = self
            .routes
            .iter()
            .map(|route| (route.angle_center, route.idx))
            .collect();

        angles.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut routes = Vec::with_capacity(self.routes.len());

        for &(_, idx) in &angles {
            let mut clients = Vec::with_capacity(self.routes[idx].size());
            let mut node = self.nodes[self.routes[idx].start_depot].next;

            while !self.nodes[node].is_depot() {
                clients.push(self.nodes[node].client);
                node = self.nodes[node].next;
            }

            routes.push(clients);
        }

        routes
    }
}
