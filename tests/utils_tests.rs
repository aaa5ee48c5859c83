//! Unit tests for utility helpers.

use hgs_vrptw::individual::Individual;
use hgs_vrptw::matrix::Matrix;
use hgs_vrptw::problem::{Client, ProblemData};
use hgs_vrptw::utils::{format_duration, next_permutation, save_solution};
use std::time::Duration;

#[test]
fn test_next_permutation_walks_lexicographic_order() {
    let mut items = [1, 2, 3];
    let mut seen = vec![items.to_vec()];

    while next_permutation(&mut items) {
        seen.push(items.to_vec());
    }

    assert_eq!(
        seen,
        vec![
            vec![1, 2, 3],
            vec![1, 3, 2],
            vec![2, 1, 3],
            vec![2, 3, 1],
            vec![3, 1, 2],
            vec![3, 2, 1],
        ]
    );

    // The slice wraps back to the first permutation on exhaustion.
    assert_eq!(items, [1, 2, 3]);
}

#[test]
fn test_next_permutation_counts_factorial_steps() {
    let mut items = [0, 1, 2, 3];
    let mut count = 1;

    while next_permutation(&mut items) {
        count += 1;
    }

    assert_eq!(count, 24);
}

#[test]
fn test_next_permutation_on_short_slices() {
    let mut empty: [i32; 0] = [];
    assert!(!next_permutation(&mut empty));

    let mut single = [7];
    assert!(!next_permutation(&mut single));

    let mut pair = [1, 2];
    assert!(next_permutation(&mut pair));
    assert_eq!(pair, [2, 1]);
    assert!(!next_permutation(&mut pair));
}

#[test]
fn test_format_duration() {
    assert_eq!(format_duration(Duration::from_secs(0)), "0h 00m 00s");
    assert_eq!(format_duration(Duration::from_secs(59)), "0h 00m 59s");
    assert_eq!(format_duration(Duration::from_secs(61)), "0h 01m 01s");
    assert_eq!(format_duration(Duration::from_secs(3_723)), "1h 02m 03s");
}

#[test]
fn test_save_solution_writes_route_lines() {
    let dist = Matrix::from_rows(&[
        vec![0, 1, 2],
        vec![1, 0, 1],
        vec![2, 1, 0],
    ]);
    let dur = dist.clone();

    let clients = vec![
        Client::new(0, 0, 0, 0, 0, 1000, 0),
        Client::new(1, 0, 1, 0, 0, 1000, 0),
        Client::new(2, 0, 1, 0, 0, 1000, 0),
    ];

    let data = ProblemData::new(clients, 2, 10, dist, dur).unwrap();
    let indiv = Individual::new(&data, vec![vec![1, 2]]).unwrap();

    let path = std::env::temp_dir().join("hgs_vrptw_solution_test.txt");
    save_solution(&indiv, &path).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(contents, "Route #1: 1 2\nDistance: 4\n");
}
