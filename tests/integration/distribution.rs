//! Key distribution across servers, weighted and unweighted.

use atoll_integration_tests::{pick_counts, server_list_file, test_entries, weighted_entries};
use atoll_ring::Continuum;
use atoll_source::load_continuum;
use atoll_types::ServerRef;

const KEYS: usize = 10_000;

#[test]
fn test_weighted_file_distribution_within_tolerance() {
    let records: Vec<(String, u64)> = (1..=10)
        .map(|i| (format!("10.0.1.{i}:11211"), 600))
        .collect();
    let records: Vec<(&str, u64)> = records.iter().map(|(a, w)| (a.as_str(), *w)).collect();
    let file = server_list_file(&records);

    let continuum = load_continuum(file.path()).expect("loads");
    let counts = pick_counts(&continuum, KEYS);

    assert_eq!(counts.len(), 10, "every server should receive keys");
    let expected = KEYS as f64 / 10.0;
    for (name, count) in &counts {
        let delta = (*count as f64 - expected).abs() / expected;
        assert!(
            delta <= 0.20,
            "server {name} got {count} keys, {delta:.3} away from even"
        );
    }
}

#[test]
fn test_unweighted_distribution_within_tolerance() {
    let continuum = Continuum::build(&test_entries(10, 0)).expect("builds");
    assert!(!continuum.weighted());

    let counts = pick_counts(&continuum, KEYS);
    assert_eq!(counts.len(), 10, "every server should receive keys");

    let expected = KEYS as f64 / 10.0;
    for (name, count) in &counts {
        let delta = (*count as f64 - expected).abs() / expected;
        assert!(
            delta <= 0.25,
            "server {name} got {count} keys, {delta:.3} away from even"
        );
    }
}

#[test]
fn test_heavier_server_receives_more_keys() {
    let continuum = Continuum::build(&weighted_entries(&[100, 200, 400])).expect("builds");
    let counts = pick_counts(&continuum, KEYS);

    let count = |i: usize| counts.get(&format!("10.0.1.{i}:11211")).copied().unwrap_or(0);
    let light = count(1);
    let mid = count(2);
    let heavy = count(3);

    assert!(
        light < mid && mid < heavy,
        "counts should follow weights, got {light} / {mid} / {heavy}"
    );

    // 400 of 700 total weight: a bit over half the keys.
    let heavy_share = heavy as f64 / KEYS as f64;
    assert!(
        (0.40..=0.75).contains(&heavy_share),
        "heaviest server share {heavy_share:.3} out of band"
    );
}

#[test]
fn test_zero_weight_server_starved_but_listed() {
    let file = server_list_file(&[
        ("10.0.1.1:11211", 600),
        ("10.0.1.2:11211", 0),
        ("10.0.1.3:11211", 300),
    ]);
    let continuum = load_continuum(file.path()).expect("loads");

    let counts = pick_counts(&continuum, KEYS);
    assert!(!counts.contains_key("10.0.1.2:11211"), "no picks for weight 0");

    let names: Vec<&str> = continuum.servers().map(ServerRef::name).collect();
    assert_eq!(names.len(), 3, "roster must include the starved server");
    assert!(names.contains(&"10.0.1.2:11211"));
}

#[test]
fn test_enumeration_covers_exactly_the_roster() {
    let continuum = Continuum::build(&test_entries(10, 600)).expect("builds");

    let mut names: Vec<&str> = continuum.servers().map(ServerRef::name).collect();
    assert_eq!(names.len(), 10, "each server exactly once");

    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), 10, "no duplicates in enumeration");
}
