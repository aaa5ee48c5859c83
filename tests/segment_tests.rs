//! Unit tests for the segment algebra underlying move evaluation.

use hgs_vrptw::matrix::Matrix;
use hgs_vrptw::segment::{DistanceSegment, LoadSegment, TimeWindowSegment};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A small asymmetric duration matrix over a depot and four clients.
fn duration_matrix() -> Matrix<i64> {
    Matrix::from_rows(&[
        vec![0, 10, 20, 30, 25],
        vec![12, 0, 8, 19, 14],
        vec![22, 9, 0, 11, 16],
        vec![31, 18, 12, 0, 7],
        vec![24, 15, 17, 6, 0],
    ])
}

/// Per-client time window segments with staggered windows.
fn client_segment(client: usize) -> TimeWindowSegment {
    let service = 5;
    let tw_early = 10 * client as i64;
    let tw_late = 10 * client as i64 + 40;
    let release = if client == 3 { 15 } else { 0 };

    TimeWindowSegment::for_client(client, service, tw_early, tw_late, release)
}

/// Fold a client sequence left to right into one segment.
fn fold(matrix: &Matrix<i64>, clients: &[usize]) -> TimeWindowSegment {
    let mut tws = client_segment(clients[0]);

    for &client in &clients[1..] {
        tws = TimeWindowSegment::merge(matrix, tws, client_segment(client));
    }

    tws
}

#[test]
fn test_merge_accumulates_travel_and_service() {
    let matrix = duration_matrix();

    let first = TimeWindowSegment::for_client(1, 5, 0, 1000, 0);
    let second = TimeWindowSegment::for_client(2, 7, 0, 1000, 0);
    let merged = TimeWindowSegment::merge(&matrix, first, second);

    // 5 service + 8 travel + 7 service, no waiting with wide windows.
    assert_eq!(merged.duration(), 20);
    assert_eq!(merged.segment_time_warp(), 0);
    assert_eq!(merged.total_time_warp(), 0);
}

#[test]
fn test_merge_detects_time_warp() {
    // Client 1 is 5 away from the depot with window [0, 10]; client 2 has
    // window [50, 60] but is 100 time units beyond client 1. The earliest
    // possible arrival there is 5 + 100 = 105, forcing a warp of
    // 105 - 60 = 45.
    let matrix = Matrix::from_rows(&[
        vec![0, 5, 100],
        vec![5, 0, 100],
        vec![100, 100, 0],
    ]);

    let depot = TimeWindowSegment::for_client(0, 0, 0, 1000, 0);
    let first = TimeWindowSegment::for_client(1, 0, 0, 10, 0);
    let second = TimeWindowSegment::for_client(2, 0, 50, 60, 0);

    let head = TimeWindowSegment::merge(&matrix, depot, first);
    let merged = TimeWindowSegment::merge(&matrix, head, second);

    assert_eq!(merged.total_time_warp(), 45);
}

#[test]
fn test_merge_accounts_for_waiting_time() {
    // Client 2 opens long after client 1 closes: the vehicle waits, and
    // the wait shows up in the duration but not as time warp.
    let matrix = Matrix::from_rows(&[vec![0, 5, 5], vec![5, 0, 5], vec![5, 5, 0]]);

    let first = TimeWindowSegment::for_client(1, 0, 0, 10, 0);
    let second = TimeWindowSegment::for_client(2, 0, 100, 200, 0);
    let merged = TimeWindowSegment::merge(&matrix, first, second);

    // Departing at the latest feasible moment 10, arrival is 15; waiting
    // until 100 adds 85 to the earliest schedule.
    assert_eq!(merged.segment_time_warp(), 0);
    assert_eq!(merged.duration(), 5 + 85);
}

#[test]
fn test_total_time_warp_includes_release_time() {
    let tws = TimeWindowSegment::new(1, 1, 10, 3, 0, 20, 50);

    // Release time 50 exceeds the latest start 20, forcing 30 extra warp.
    assert_eq!(tws.segment_time_warp(), 3);
    assert_eq!(tws.total_time_warp(), 33);
}

#[test]
fn test_merge_takes_maximum_release_time() {
    let matrix = duration_matrix();
    let merged = TimeWindowSegment::merge(&matrix, client_segment(3), client_segment(4));

    assert_eq!(merged.release(), 15);
}

#[test]
fn test_merge_is_associative_on_fixed_sequences() {
    let matrix = duration_matrix();

    let a = fold(&matrix, &[1, 2]);
    let b = fold(&matrix, &[3]);
    let c = fold(&matrix, &[4, 0]);

    let left = TimeWindowSegment::merge(&matrix, TimeWindowSegment::merge(&matrix, a, b), c);
    let right = TimeWindowSegment::merge(&matrix, a, TimeWindowSegment::merge(&matrix, b, c));

    assert_eq!(left, right);
}

#[test]
fn test_merge_is_associative_on_random_sequences() {
    let matrix = duration_matrix();
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    for _ in 0..200 {
        let pick = |rng: &mut ChaCha8Rng| -> Vec<usize> {
            let len = rng.gen_range(1..4);
            (0..len).map(|_| rng.gen_range(0..5)).collect()
        };

        let a = fold(&matrix, &pick(&mut rng));
        let b = fold(&matrix, &pick(&mut rng));
        let c = fold(&matrix, &pick(&mut rng));

        let left = TimeWindowSegment::merge(&matrix, TimeWindowSegment::merge(&matrix, a, b), c);
        let right = TimeWindowSegment::merge(&matrix, a, TimeWindowSegment::merge(&matrix, b, c));

        // Associativity must hold field for field, so that arbitrary
        // split points produce identical totals.
        assert_eq!(left, right);
    }
}

#[test]
fn test_merge_matches_whole_sequence_fold() {
    let matrix = duration_matrix();
    let whole = fold(&matrix, &[0, 1, 2, 3, 4]);

    for split in 1..4 {
        let clients: Vec<usize> = vec![0, 1, 2, 3, 4];
        let head = fold(&matrix, &clients[..split]);
        let tail = fold(&matrix, &clients[split..]);

        assert_eq!(TimeWindowSegment::merge(&matrix, head, tail), whole);
    }
}

#[test]
fn test_load_segment_merge_sums_loads() {
    let first = LoadSegment::new(7);
    let second = LoadSegment::new(4);

    assert_eq!(LoadSegment::merge(first, second).load(), 11);
    assert_eq!(LoadSegment::default().load(), 0);
}

#[test]
fn test_distance_segment_merge_adds_connecting_arc() {
    let matrix = duration_matrix();

    let first = DistanceSegment::new(1, 2, 8);
    let second = DistanceSegment::new(3, 4, 7);
    let merged = DistanceSegment::merge(&matrix, first, second);

    // 8 within the first segment, 11 from client 2 to 3, 7 within the
    // second segment.
    assert_eq!(merged.distance(), 26);
}

#[test]
fn test_distance_segment_merge_is_associative() {
    let matrix = duration_matrix();

    let a = DistanceSegment::new(0, 1, 10);
    let b = DistanceSegment::new(2, 2, 0);
    let c = DistanceSegment::new(3, 0, 31);

    let left = DistanceSegment::merge(&matrix, DistanceSegment::merge(&matrix, a, b), c);
    let right = DistanceSegment::merge(&matrix, a, DistanceSegment::merge(&matrix, b, c));

    assert_eq!(left, right);
}
