//! The SWAP* route operator.
//!
//! SWAP* exchanges two clients between two routes without requiring them
//! to take each other's place: each client is reinserted at its best
//! position in the other route. The implementation follows Algorithm 2 of
//! Vidal (2022), with cached removal costs and a three-best insertion
//! position cache per (route, client) pair.

use super::space::{NodeIndex, SearchSpace};
use super::RouteOperator;
use crate::matrix::Matrix;
use crate::penalty::CostEvaluator;
use crate::segment::TimeWindowSegment;
use crate::Cost;

/// Stores the three best insertion points of a client in a route.
#[derive(Debug, Clone, Copy)]
struct ThreeBest {
    should_update: bool,
    costs: [Cost; 3],
    locs: [Option<NodeIndex>; 3],
}

impl Default for ThreeBest {
    fn default() -> Self {
        ThreeBest {
            should_update: true,
            costs: [Cost::MAX; 3],
            locs: [None; 3],
        }
    }
}

impl ThreeBest {
    fn maybe_add(&mut self, cost: Cost, loc: NodeIndex) {
        if cost >= self.costs[2] {
            return;
        }

        if cost >= self.costs[1] {
            self.costs[2] = cost;
            self.locs[2] = Some(loc);
        } else if cost >= self.costs[0] {
            self.costs[2] = self.costs[1];
            self.locs[2] = self.locs[1];
            self.costs[1] = cost;
            self.locs[1] = Some(loc);
        } else {
            self.costs[2] = self.costs[1];
            self.locs[2] = self.locs[1];
            self.costs[1] = self.costs[0];
            self.locs[1] = self.locs[0];
            self.costs[0] = cost;
            self.locs[0] = Some(loc);
        }
    }
}

/// The best SWAP* move found by the latest evaluation.
#[derive(Debug, Clone, Copy, Default)]
struct BestMove {
    cost: Cost,
    u: Option<NodeIndex>,
    u_after: Option<NodeIndex>,
    v: Option<NodeIndex>,
    v_after: Option<NodeIndex>,
}

/// Explores the SWAP* neighbourhood of two routes.
#[derive(Debug)]
pub struct SwapStar {
    /// Removal cost of each client from its current route
    removal_costs: Matrix<Cost>,
    /// Three best insertion positions per (route, client)
    cache: Matrix<ThreeBest>,
    /// Routes whose caches are stale
    updated: Vec<bool>,
    best: BestMove,
    num_clients: usize,
}

impl SwapStar {
    pub fn new(num_clients: usize, num_vehicles: usize) -> Self {
        let size = num_clients.max(num_vehicles) + 1;

        SwapStar {
            removal_costs: Matrix::new(size),
            cache: Matrix::new(size),
            updated: vec![true; num_vehicles],
            best: BestMove::default(),
            num_clients,
        }
    }

    // Recomputes the cost of removing each client from the given route.
    fn update_removal_costs(&mut self, route: usize, space: &SearchSpace, costs: &CostEvaluator) {
        let data = space.data();
        let dur = data.duration_matrix();
        let capacity = data.vehicle_capacity();

        let route_load = space.route(route).load();
        let route_tw = space.route(route).time_warp();

        for position in 1..=space.route(route).size() {
            let node = space.route(route).node_at(position);
            let client = space.node(node).client;
            let pred = space.node(space.pred(node));
            let succ = space.node(space.succ(node));

            let delta_dist = data.dist(pred.client, succ.client)
                - data.dist(pred.client, client)
                - data.dist(client, succ.client);

            let tws = TimeWindowSegment::merge(dur, pred.tw_before, succ.tw_after);
            let load = route_load - data.client(client).demand;

            let removal = delta_dist
                + costs.tw_penalty(tws.total_time_warp())
                - costs.tw_penalty(route_tw)
                + costs.load_penalty(load, capacity)
                - costs.load_penalty(route_load, capacity);

            self.removal_costs.set(route, client, removal);
        }
    }

    // Recomputes the three best insertion positions of the given client in
    // the given route.
    fn update_insertion_cost(
        &mut self,
        route: usize,
        u: NodeIndex,
        space: &SearchSpace,
        costs: &CostEvaluator,
    ) {
        let data = space.data();
        let dur = data.duration_matrix();
        let capacity = data.vehicle_capacity();

        let client_u = space.node(u).client;
        let route_load = space.route(route).load();
        let route_tw = space.route(route).time_warp();
        let load = route_load + data.client(client_u).demand;

        let mut entry = ThreeBest {
            should_update: false,
            ..ThreeBest::default()
        };

        // Insertion just after the node at each position, from the start
        // depot up to and including the last client.
        for position in 0..=space.route(route).size() {
            let after = space.route(route).node_at(position);
            let after_succ = space.route(route).node_at(position + 1);

            let delta_dist = data.dist(space.node(after).client, client_u)
                + data.dist(client_u, space.node(after_succ).client)
                - data.dist(space.node(after).client, space.node(after_succ).client);

            let tws = TimeWindowSegment::merge(
                dur,
                TimeWindowSegment::merge(dur, space.node(after).tw_before, space.node(u).tw),
                space.node(after_succ).tw_after,
            );

            let delta = delta_dist
                + costs.tw_penalty(tws.total_time_warp())
                - costs.tw_penalty(route_tw)
                + costs.load_penalty(load, capacity)
                - costs.load_penalty(route_load, capacity);

            entry.maybe_add(delta, after);
        }

        self.cache.set(route, space.node(u).client, entry);
    }

    // Best place to insert U in the route of V, assuming V is removed.
    fn best_insert_point(
        &mut self,
        u: NodeIndex,
        v: NodeIndex,
        space: &SearchSpace,
        costs: &CostEvaluator,
    ) -> (Cost, NodeIndex) {
        let data = space.data();
        let dur = data.duration_matrix();
        let route = space.node(v).route;
        let client_u = space.node(u).client;

        if self.cache.get(route, client_u).should_update {
            self.update_insertion_cost(route, u, space, costs);
        }

        let entry = self.cache.get(route, client_u);

        // The cached positions are valid as long as they do not touch V.
        for idx in 0..3 {
            if let Some(loc) = entry.locs[idx] {
                if loc != v && space.succ(loc) != v {
                    return (entry.costs[idx], loc);
                }
            }
        }

        // Fall back to inserting in the place of V.
        let capacity = data.vehicle_capacity();
        let pred = space.node(space.pred(v));
        let succ = space.node(space.succ(v));

        let delta_dist = data.dist(pred.client, client_u)
            + data.dist(client_u, succ.client)
            - data.dist(pred.client, succ.client);

        let tws = TimeWindowSegment::merge(
            dur,
            TimeWindowSegment::merge(dur, pred.tw_before, space.node(u).tw),
            succ.tw_after,
        );

        let route_load = space.route(route).load();
        let load = route_load + data.client(client_u).demand;

        let delta = delta_dist
            + costs.tw_penalty(tws.total_time_warp())
            - costs.tw_penalty(space.route(route).time_warp())
            + costs.load_penalty(load, capacity)
            - costs.load_penalty(route_load, capacity);

        (delta, space.pred(v))
    }

    // Exact delta cost of inserting U after V in the route of `remove`,
    // with `remove` taken out.
    fn evaluate_move(
        &self,
        u: NodeIndex,
        v: NodeIndex,
        remove: NodeIndex,
        space: &SearchSpace,
        costs: &CostEvaluator,
    ) -> Cost {
        debug_assert_eq!(space.node(v).route, space.node(remove).route);
        debug_assert!(v != remove);

        let data = space.data();
        let dur = data.duration_matrix();
        let capacity = data.vehicle_capacity();

        let route = space.node(remove).route;
        let client_u = space.node(u).client;
        let client_v = space.node(v).client;
        let client_removed = space.node(remove).client;

        let pos_v = space.node(v).position;
        let pos_removed = space.node(remove).position;

        let mut delta = 0;

        let tws = if v == space.pred(remove) {
            // Insert U in place of `remove`: replaces the edges
            // V -> remove -> n(remove) by V -> U -> n(remove).
            let succ = space.node(space.succ(remove));

            delta += data.dist(client_v, client_u) + data.dist(client_u, succ.client)
                - data.dist(client_v, client_removed)
                - data.dist(client_removed, succ.client);

            TimeWindowSegment::merge(
                dur,
                TimeWindowSegment::merge(dur, space.node(v).tw_before, space.node(u).tw),
                succ.tw_after,
            )
        } else {
            let v_succ = space.node(space.succ(v));
            let rem_pred = space.node(space.pred(remove));
            let rem_succ = space.node(space.succ(remove));

            let current = data.dist(client_v, v_succ.client)
                + data.dist(rem_pred.client, client_removed)
                + data.dist(client_removed, rem_succ.client);

            let proposed = data.dist(client_v, client_u)
                + data.dist(client_u, v_succ.client)
                + data.dist(rem_pred.client, rem_succ.client);

            delta += proposed - current;

            if pos_v < pos_removed {
                let head = TimeWindowSegment::merge(
                    dur,
                    TimeWindowSegment::merge(dur, space.node(v).tw_before, space.node(u).tw),
                    space.tw_between(route, pos_v + 1, pos_removed - 1),
                );
                TimeWindowSegment::merge(dur, head, rem_succ.tw_after)
            } else {
                let head = TimeWindowSegment::merge(
                    dur,
                    rem_pred.tw_before,
                    space.tw_between(route, pos_removed + 1, pos_v),
                );
                let head = TimeWindowSegment::merge(dur, head, space.node(u).tw);
                TimeWindowSegment::merge(dur, head, v_succ.tw_after)
            }
        };

        let route_load = space.route(route).load();
        let load = route_load + data.client(client_u).demand - data.client(client_removed).demand;

        delta += costs.tw_penalty(tws.total_time_warp());
        delta -= costs.tw_penalty(space.route(route).time_warp());
        delta += costs.load_penalty(load, capacity);
        delta -= costs.load_penalty(route_load, capacity);

        delta
    }
}

impl RouteOperator for SwapStar {
    fn init(&mut self, _space: &SearchSpace) {
        for updated in self.updated.iter_mut() {
            *updated = true;
        }
    }

    fn evaluate(
        &mut self,
        route_u: usize,
        route_v: usize,
        space: &SearchSpace,
        costs: &CostEvaluator,
    ) -> Cost {
        self.best = BestMove::default();

        for &route in &[route_u, route_v] {
            if self.updated[route] {
                self.update_removal_costs(route, space, costs);
                self.updated[route] = false;

                for client in 1..=self.num_clients {
                    let mut entry = self.cache.get(route, client);
                    entry.should_update = true;
                    self.cache.set(route, client, entry);
                }
            }
        }

        for pos_u in 1..=space.route(route_u).size() {
            let u = space.route(route_u).node_at(pos_u);
            let removal_u = self.removal_costs.get(route_u, space.node(u).client);

            for pos_v in 1..=space.route(route_v).size() {
                let v = space.route(route_v).node_at(pos_v);
                let removal_v = self.removal_costs.get(route_v, space.node(v).client);

                let mut delta = removal_u + removal_v;

                // Cheap filter before the costly insertion point lookups.
                if delta >= 0 {
                    continue;
                }

                let (extra_v, u_after) = self.best_insert_point(u, v, space, costs);
                delta += extra_v;

                if delta >= 0 {
                    continue;
                }

                let (extra_u, v_after) = self.best_insert_point(v, u, space, costs);
                delta += extra_u;

                if delta < self.best.cost {
                    self.best = BestMove {
                        cost: delta,
                        u: Some(u),
                        u_after: Some(u_after),
                        v: Some(v),
                        v_after: Some(v_after),
                    };
                }
            }
        }

        // Positive deltas from the quick bounds almost never turn negative
        // under full evaluation, so they are not worth the time.
        if self.best.cost >= 0 {
            return self.best.cost;
        }

        match (self.best.u, self.best.u_after, self.best.v, self.best.v_after) {
            (Some(u), Some(u_after), Some(v), Some(v_after)) => {
                self.evaluate_move(v, v_after, u, space, costs)
                    + self.evaluate_move(u, u_after, v, space, costs)
            }
            _ => 0,
        }
    }

    fn apply(&mut self, _route_u: usize, _route_v: usize, space: &mut SearchSpace) {
        if let (Some(u), Some(u_after), Some(v), Some(v_after)) =
            (self.best.u, self.best.u_after, self.best.v, self.best.v_after)
        {
            space.insert_after(u, u_after);
            space.insert_after(v, v_after);
        }
    }

    fn update(&mut self, route: usize) {
        self.updated[route] = true;
    }
}
