//! The (N, M)-exchange family of node operators.
//!
//! An `Exchange` with segment lengths (N, 0) relocates the N consecutive
//! nodes starting at U to directly after V. With M > 0 it swaps the N
//! nodes starting at U with the M nodes starting at V. Relocate, swap, and
//! 2-opt style moves are all instances of this one operator.

use super::space::{NodeIndex, SearchSpace};
use super::NodeOperator;
use crate::penalty::CostEvaluator;
use crate::segment::TimeWindowSegment;
use crate::Cost;

/// Exchanges the `len_u` consecutive nodes starting at U with the `len_v`
/// consecutive nodes starting at V. `len_v == 0` relocates the U segment
/// after V.
#[derive(Debug, Clone, Copy)]
pub struct Exchange {
    len_u: usize,
    len_v: usize,
}

impl Exchange {
    /// Create a new exchange operator. Requires `len_u >= 1` and
    /// `len_u >= len_v`.
    pub fn new(len_u: usize, len_v: usize) -> Self {
        assert!(len_u >= 1 && len_u >= len_v);
        Exchange { len_u, len_v }
    }

    // True when the segment of the given length starting at the node runs
    // into a depot.
    fn contains_depot(&self, space: &SearchSpace, node: NodeIndex, seg_length: usize) -> bool {
        let node = space.node(node);

        if node.is_depot() {
            return true;
        }

        // position + length - 1 is the position of the segment's last
        // node, which must not exceed the route size.
        node.position + seg_length - 1 > space.route(node.route).size()
    }

    // True when both segments overlap in the same route.
    fn overlap(&self, space: &SearchSpace, u: NodeIndex, v: NodeIndex) -> bool {
        let u = space.node(u);
        let v = space.node(v);

        u.route == v.route
            && u.position <= v.position + self.len_v.max(1) - 1
            && v.position <= u.position + self.len_u - 1
    }

    // True when both segments are directly adjacent in the same route.
    fn adjacent(&self, space: &SearchSpace, u: NodeIndex, v: NodeIndex) -> bool {
        let u = space.node(u);
        let v = space.node(v);

        if u.route != v.route {
            return false;
        }

        u.position + self.len_u == v.position || v.position + self.len_v == u.position
    }

    fn eval_relocate_move(
        &self,
        u: NodeIndex,
        v: NodeIndex,
        space: &SearchSpace,
        costs: &CostEvaluator,
    ) -> Cost {
        let data = space.data();
        let dur = data.duration_matrix();

        let node_u = space.node(u);
        let node_v = space.node(v);
        let (route_u, route_v) = (node_u.route, node_v.route);
        let (pos_u, pos_v) = (node_u.position, node_v.position);
        debug_assert!(pos_u > 0);

        let end_u = space.route(route_u).node_at(pos_u + self.len_u - 1);
        let capacity = data.vehicle_capacity();

        let current = space.dist_between(route_u, pos_u - 1, pos_u + self.len_u)
            + data.dist(node_v.client, space.node(space.succ(v)).client);

        let proposed = data.dist(node_v.client, node_u.client)
            + space.dist_between(route_u, pos_u, pos_u + self.len_u - 1)
            + data.dist(space.node(end_u).client, space.node(space.succ(v)).client)
            + data.dist(
                space.node(space.pred(u)).client,
                space.node(space.succ(end_u)).client,
            );

        let mut delta = proposed - current;

        if route_u != route_v {
            // A feasible route cannot improve by removal alone, so the
            // distance delta is already a lower bound.
            if space.route_is_feasible(route_u) && delta >= 0 {
                return delta;
            }

            let load_u = space.route(route_u).load();
            let load_v = space.route(route_v).load();
            let moved = space
                .load_between(route_u, pos_u, pos_u + self.len_u - 1)
                .load();

            delta += costs.load_penalty(load_u - moved, capacity);
            delta -= costs.load_penalty(load_u, capacity);
            delta += costs.load_penalty(load_v + moved, capacity);
            delta -= costs.load_penalty(load_v, capacity);

            // Assume the time warp in route U fully disappears; anything
            // still positive then cannot become an improvement.
            delta -= costs.tw_penalty(space.route(route_u).time_warp());

            if delta >= 0 {
                return delta;
            }

            let u_tws = TimeWindowSegment::merge(
                dur,
                space.node(space.pred(u)).tw_before,
                space.node(space.succ(end_u)).tw_after,
            );

            delta += costs.tw_penalty(u_tws.total_time_warp());

            // Inserting into route V cannot decrease its time warp, so
            // this remains a lower bound.
            if delta >= 0 {
                return delta;
            }

            let v_tws = TimeWindowSegment::merge(
                dur,
                TimeWindowSegment::merge(
                    dur,
                    node_v.tw_before,
                    space.tw_between(route_u, pos_u, pos_u + self.len_u - 1),
                ),
                space.node(space.succ(v)).tw_after,
            );

            delta += costs.tw_penalty(v_tws.total_time_warp());
            delta -= costs.tw_penalty(space.route(route_v).time_warp());
        } else {
            let route = route_u;

            if !space.route(route).has_time_warp() && delta >= 0 {
                return delta;
            }

            delta -= costs.tw_penalty(space.route(route).time_warp());

            if delta >= 0 {
                return delta;
            }

            let tws = if pos_u < pos_v {
                let head = TimeWindowSegment::merge(
                    dur,
                    space.node(space.pred(u)).tw_before,
                    space.tw_between(route, pos_u + self.len_u, pos_v),
                );
                let head = TimeWindowSegment::merge(
                    dur,
                    head,
                    space.tw_between(route, pos_u, pos_u + self.len_u - 1),
                );
                TimeWindowSegment::merge(dur, head, space.node(space.succ(v)).tw_after)
            } else {
                let head = TimeWindowSegment::merge(
                    dur,
                    node_v.tw_before,
                    space.tw_between(route, pos_u, pos_u + self.len_u - 1),
                );
                let head = TimeWindowSegment::merge(
                    dur,
                    head,
                    space.tw_between(route, pos_v + 1, pos_u - 1),
                );
                TimeWindowSegment::merge(dur, head, space.node(space.succ(end_u)).tw_after)
            };

            delta += costs.tw_penalty(tws.total_time_warp());
        }

        delta
    }

    fn eval_swap_move(
        &self,
        u: NodeIndex,
        v: NodeIndex,
        space: &SearchSpace,
        costs: &CostEvaluator,
    ) -> Cost {
        let data = space.data();
        let dur = data.duration_matrix();

        let node_u = space.node(u);
        let node_v = space.node(v);
        let (route_u, route_v) = (node_u.route, node_v.route);
        let (pos_u, pos_v) = (node_u.position, node_v.position);

        let end_u = space.route(route_u).node_at(pos_u + self.len_u - 1);
        let end_v = space.route(route_v).node_at(pos_v + self.len_v - 1);
        let capacity = data.vehicle_capacity();

        let current = space.dist_between(route_u, pos_u - 1, pos_u + self.len_u)
            + space.dist_between(route_v, pos_v - 1, pos_v + self.len_v);

        // p(U) -> V..endV -> n(endU), plus p(V) -> U..endU -> n(endV).
        let proposed = data.dist(space.node(space.pred(u)).client, node_v.client)
            + space.dist_between(route_v, pos_v, pos_v + self.len_v - 1)
            + data.dist(
                space.node(end_v).client,
                space.node(space.succ(end_u)).client,
            )
            + data.dist(space.node(space.pred(v)).client, node_u.client)
            + space.dist_between(route_u, pos_u, pos_u + self.len_u - 1)
            + data.dist(
                space.node(end_u).client,
                space.node(space.succ(end_v)).client,
            );

        let mut delta = proposed - current;

        if route_u != route_v {
            if space.route_is_feasible(route_u) && space.route_is_feasible(route_v) && delta >= 0 {
                return delta;
            }

            let load_u = space.route(route_u).load();
            let load_v = space.route(route_v).load();
            let seg_u = space
                .load_between(route_u, pos_u, pos_u + self.len_u - 1)
                .load();
            let seg_v = space
                .load_between(route_v, pos_v, pos_v + self.len_v - 1)
                .load();
            let diff = seg_u - seg_v;

            delta += costs.load_penalty(load_u - diff, capacity);
            delta -= costs.load_penalty(load_u, capacity);
            delta += costs.load_penalty(load_v + diff, capacity);
            delta -= costs.load_penalty(load_v, capacity);

            // Assume all time warp disappears, to get a lower bound.
            delta -= costs.tw_penalty(space.route(route_u).time_warp());
            delta -= costs.tw_penalty(space.route(route_v).time_warp());

            if delta >= 0 {
                return delta;
            }

            // Since N >= M route V gains nodes, so its time warp is more
            // likely to grow: check it first.
            let v_tws = TimeWindowSegment::merge(
                dur,
                TimeWindowSegment::merge(
                    dur,
                    space.node(space.pred(v)).tw_before,
                    space.tw_between(route_u, pos_u, pos_u + self.len_u - 1),
                ),
                space.node(space.succ(end_v)).tw_after,
            );

            delta += costs.tw_penalty(v_tws.total_time_warp());

            if delta >= 0 {
                return delta;
            }

            let u_tws = TimeWindowSegment::merge(
                dur,
                TimeWindowSegment::merge(
                    dur,
                    space.node(space.pred(u)).tw_before,
                    space.tw_between(route_v, pos_v, pos_v + self.len_v - 1),
                ),
                space.node(space.succ(end_u)).tw_after,
            );

            delta += costs.tw_penalty(u_tws.total_time_warp());
        } else {
            let route = route_u;

            if !space.route(route).has_time_warp() && delta >= 0 {
                return delta;
            }

            delta -= costs.tw_penalty(space.route(route).time_warp());

            if delta >= 0 {
                return delta;
            }

            let tws = if pos_u < pos_v {
                let head = TimeWindowSegment::merge(
                    dur,
                    space.node(space.pred(u)).tw_before,
                    space.tw_between(route, pos_v, pos_v + self.len_v - 1),
                );
                let head = TimeWindowSegment::merge(
                    dur,
                    head,
                    space.tw_between(route, pos_u + self.len_u, pos_v - 1),
                );
                let head = TimeWindowSegment::merge(
                    dur,
                    head,
                    space.tw_between(route, pos_u, pos_u + self.len_u - 1),
                );
                TimeWindowSegment::merge(dur, head, space.node(space.succ(end_v)).tw_after)
            } else {
                let head = TimeWindowSegment::merge(
                    dur,
                    space.node(space.pred(v)).tw_before,
                    space.tw_between(route, pos_u, pos_u + self.len_u - 1),
                );
                let head = TimeWindowSegment::merge(
                    dur,
                    head,
                    space.tw_between(route, pos_v + self.len_v, pos_u - 1),
                );
                let head = TimeWindowSegment::merge(
                    dur,
                    head,
                    space.tw_between(route, pos_v, pos_v + self.len_v - 1),
                );
                TimeWindowSegment::merge(dur, head, space.node(space.succ(end_u)).tw_after)
            };

            delta += costs.tw_penalty(tws.total_time_warp());
        }

        delta
    }
}

impl NodeOperator for Exchange {
    fn evaluate(
        &self,
        u: NodeIndex,
        v: NodeIndex,
        space: &SearchSpace,
        costs: &CostEvaluator,
    ) -> Cost {
        if self.contains_depot(space, u, self.len_u) || self.overlap(space, u, v) {
            return 0;
        }

        if self.len_v > 0 && self.contains_depot(space, v, self.len_v) {
            return 0;
        }

        if self.len_v == 0 {
            if u == space.succ(v) {
                return 0; // relocating U after its predecessor is a no-op
            }

            return self.eval_relocate_move(u, v, space, costs);
        }

        // A symmetric exchange only needs evaluating in one direction.
        if self.len_u == self.len_v && space.node(u).client >= space.node(v).client {
            return 0;
        }

        if self.adjacent(space, u, v) {
            return 0; // equivalent to a relocate considered elsewhere
        }

        self.eval_swap_move(u, v, space, costs)
    }

    fn apply(&self, u: NodeIndex, v: NodeIndex, space: &mut SearchSpace) {
        let node_u = space.node(u);
        let route_u = node_u.route;
        let pos_u = node_u.position;

        let node_v = space.node(v);
        let route_v = node_v.route;
        let pos_v = node_v.position;

        let mut to_insert = space.route(route_u).node_at(pos_u + self.len_u - 1);
        let insert_after = if self.len_v == 0 {
            v
        } else {
            space.route(route_v).node_at(pos_v + self.len_v - 1)
        };

        // Move the N - M excess nodes of the U segment behind the end of
        // the V segment, back to front...
        for _ in 0..self.len_u - self.len_v {
            let prev = space.pred(to_insert);
            space.insert_after(to_insert, insert_after);
            to_insert = prev;
        }

        // ...and swap the M overlapping positions pairwise.
        let (mut u, mut v) = (u, v);

        for _ in 0..self.len_v {
            space.swap_with(u, v);
            u = space.succ(u);
            v = space.succ(v);
        }
    }
}
