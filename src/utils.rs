//! Utility functions for the HGS-VRPTW crate.

use crate::individual::Individual;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// Advance the slice to its next lexicographic permutation. Returns false
/// once the slice holds its final (descending) permutation, leaving it in
/// the first (ascending) one.
pub fn next_permutation<T: Ord>(items: &mut [T]) -> bool {
    if items.len() < 2 {
        return false;
    }

    let mut pivot = items.len() - 1;

    while pivot > 0 && items[pivot - 1] >= items[pivot] {
        pivot -= 1;
    }

    if pivot == 0 {
        items.reverse();
        return false;
    }

    let mut swap = items.len() - 1;

    while items[swap] <= items[pivot - 1] {
        swap -= 1;
    }

    items.swap(pivot - 1, swap);
    items[pivot..].reverse();

    true
}

/// Format a duration as hours, minutes, and seconds.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}h {:02}m {:02}s", hours, minutes, seconds)
}

/// Save a solution to a file: one `Route #i: ...` line per non-empty
/// route, followed by the total distance.
pub fn save_solution<P: AsRef<Path>>(indiv: &Individual, path: P) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    write!(file, "{}", indiv)
}
