//! Segment summaries for contiguous route stretches.
//!
//! Each segment type carries just enough information to summarize a
//! traversal over a contiguous sequence of clients, and exposes an
//! associative (but not commutative) merge. Moves are evaluated by merging
//! a handful of precomputed segments in the order the proposed route would
//! visit them, which keeps each evaluation O(1) in the route length.

use crate::matrix::Matrix;
use crate::{Distance, Duration, Load};

/// Time window summary of a route segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindowSegment {
    /// Index of the first client in the segment
    idx_first: usize,
    /// Index of the last client in the segment
    idx_last: usize,
    /// Total duration, including waiting and servicing
    duration: Duration,
    /// Cumulative time warp
    time_warp: Duration,
    /// Earliest visit moment of the first client
    tw_early: Duration,
    /// Latest visit moment of the first client
    tw_late: Duration,
    /// Earliest moment the route segment may leave the depot
    release: Duration,
}

impl TimeWindowSegment {
    pub fn new(
        idx_first: usize,
        idx_last: usize,
        duration: Duration,
        time_warp: Duration,
        tw_early: Duration,
        tw_late: Duration,
        release: Duration,
    ) -> Self {
        TimeWindowSegment {
            idx_first,
            idx_last,
            duration,
            time_warp,
            tw_early,
            tw_late,
            release,
        }
    }

    /// The singleton segment visiting just the given client.
    pub fn for_client(
        client: usize,
        service_duration: Duration,
        tw_early: Duration,
        tw_late: Duration,
        release: Duration,
    ) -> Self {
        TimeWindowSegment::new(client, client, service_duration, 0, tw_early, tw_late, release)
    }

    /// Merge two adjacent segments, travelling from the last client of
    /// `first` to the first client of `second`.
    pub fn merge(dur: &Matrix<Duration>, first: Self, second: Self) -> Self {
        let arc = dur.get(first.idx_last, second.idx_first);
        let delta = first.duration - first.time_warp + arc;
        let delta_wait = (second.tw_early - delta - first.tw_late).max(0);
        let delta_tw = (first.tw_early + delta - second.tw_late).max(0);

        TimeWindowSegment {
            idx_first: first.idx_first,
            idx_last: second.idx_last,
            duration: first.duration + second.duration + arc + delta_wait,
            time_warp: first.time_warp + second.time_warp + delta_tw,
            tw_early: (second.tw_early - delta).max(first.tw_early) - delta_wait,
            tw_late: (second.tw_late - delta).min(first.tw_late) + delta_tw,
            release: first.release.max(second.release),
        }
    }

    /// The time warp accumulated along the segment itself, assuming the
    /// segment can depart in time.
    pub fn segment_time_warp(&self) -> Duration {
        self.time_warp
    }

    /// Total time warp: the segment's own warp plus any warp forced by a
    /// release time later than the latest feasible departure.
    pub fn total_time_warp(&self) -> Duration {
        self.time_warp + (self.release - self.tw_late).max(0)
    }

    pub fn tw_early(&self) -> Duration {
        self.tw_early
    }

    pub fn tw_late(&self) -> Duration {
        self.tw_late
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn release(&self) -> Duration {
        self.release
    }
}

/// Load summary of a route segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSegment {
    load: Load,
}

impl LoadSegment {
    pub fn new(load: Load) -> Self {
        LoadSegment { load }
    }

    /// Merge two adjacent segments; loads simply add up.
    pub fn merge(first: Self, second: Self) -> Self {
        LoadSegment {
            load: first.load + second.load,
        }
    }

    pub fn load(&self) -> Load {
        self.load
    }
}

/// Distance summary of a route segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistanceSegment {
    idx_first: usize,
    idx_last: usize,
    distance: Distance,
}

impl DistanceSegment {
    pub fn new(idx_first: usize, idx_last: usize, distance: Distance) -> Self {
        DistanceSegment {
            idx_first,
            idx_last,
            distance,
        }
    }

    /// Merge two adjacent segments, adding the connecting arc.
    pub fn merge(dist: &Matrix<Distance>, first: Self, second: Self) -> Self {
        DistanceSegment {
            idx_first: first.idx_first,
            idx_last: second.idx_last,
            distance: first.distance + dist.get(first.idx_last, second.idx_first) + second.distance,
        }
    }

    pub fn distance(&self) -> Distance {
        self.distance
    }
}
