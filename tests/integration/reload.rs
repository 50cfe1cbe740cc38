//! Reload-and-swap behavior: staleness detection, whole-file validation,
//! and readers holding an old continuum while a new one replaces it.

use std::collections::HashSet;
use std::io::Write;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use atoll_integration_tests::{pick_counts, server_list_file};
use atoll_source::{is_stale, load_continuum, SourceError};

fn ten_server_records() -> Vec<(String, u64)> {
    (1..=10)
        .map(|i| (format!("10.0.1.{i}:11211"), 600))
        .collect()
}

#[test]
fn test_reload_after_file_change() {
    let records = ten_server_records();
    let records: Vec<(&str, u64)> = records.iter().map(|(a, w)| (a.as_str(), *w)).collect();
    let file = server_list_file(&records);

    let continuum = load_continuum(file.path()).expect("loads");
    assert!(!is_stale(&continuum, file.path()).expect("stat works"));

    // Append a server after a beat so the mtime moves.
    thread::sleep(Duration::from_millis(20));
    let mut handle = std::fs::OpenOptions::new()
        .append(true)
        .open(file.path())
        .expect("reopen list");
    writeln!(handle, "10.0.1.11:11211\t600").expect("append record");
    drop(handle);

    assert!(is_stale(&continuum, file.path()).expect("stat works"));

    let rebuilt = load_continuum(file.path()).expect("reloads");
    assert_eq!(rebuilt.servers().count(), 11);
    assert!(!is_stale(&rebuilt, file.path()).expect("stat works"));

    // The old continuum keeps answering with its own view.
    assert_eq!(continuum.servers().count(), 10);
    continuum.pick_server("still:works").expect("old ring usable");
}

#[test]
fn test_malformed_line_fails_whole_load() {
    let mut file = server_list_file(&[("10.0.1.1:11211", 600)]);
    writeln!(file, "10.0.1.2:11211 oops").expect("append bad record");
    file.flush().expect("flush");

    let err = load_continuum(file.path()).unwrap_err();
    assert!(
        matches!(err, SourceError::MalformedServer { line: 2, .. }),
        "got {err:?}"
    );
}

#[test]
fn test_adding_a_server_remaps_a_small_fraction() {
    let records = ten_server_records();
    let records: Vec<(&str, u64)> = records.iter().map(|(a, w)| (a.as_str(), *w)).collect();
    let file = server_list_file(&records);
    let before = load_continuum(file.path()).expect("loads");

    thread::sleep(Duration::from_millis(20));
    let mut handle = std::fs::OpenOptions::new()
        .append(true)
        .open(file.path())
        .expect("reopen list");
    writeln!(handle, "10.0.1.11:11211\t600").expect("append record");
    drop(handle);
    let after = load_continuum(file.path()).expect("reloads");

    let keys = 10_000;
    let moved = (0..keys)
        .filter(|i| {
            let key = i.to_string();
            before.pick_server(&key).unwrap() != after.pick_server(&key).unwrap()
        })
        .count();

    let fraction = moved as f64 / keys as f64;
    // One of eleven servers is new; roughly that share of keys should move,
    // and certainly not most of them.
    assert!(
        (0.01..=0.35).contains(&fraction),
        "moved fraction {fraction:.3} out of band"
    );
}

#[test]
fn test_concurrent_readers_agree() {
    let records = ten_server_records();
    let records: Vec<(&str, u64)> = records.iter().map(|(a, w)| (a.as_str(), *w)).collect();
    let file = server_list_file(&records);
    let continuum = Arc::new(load_continuum(file.path()).expect("loads"));

    let baseline: Vec<String> = (0..1_000)
        .map(|i| continuum.pick_server(i.to_string()).unwrap().name().to_string())
        .collect();

    thread::scope(|scope| {
        for _ in 0..4 {
            let continuum = Arc::clone(&continuum);
            let baseline = &baseline;
            scope.spawn(move || {
                for (i, expected) in baseline.iter().enumerate() {
                    let picked = continuum.pick_server(i.to_string()).expect("ring has points");
                    assert_eq!(picked.name(), expected, "key {i}");
                }
            });
        }
    });
}

#[test]
fn test_swap_while_readers_hold_old_ring() {
    let old_records = ten_server_records();
    let old_refs: Vec<(&str, u64)> = old_records.iter().map(|(a, w)| (a.as_str(), *w)).collect();
    let old_file = server_list_file(&old_refs);

    let mut new_records = ten_server_records();
    new_records.push(("10.0.1.11:11211".to_string(), 600));
    let new_refs: Vec<(&str, u64)> = new_records.iter().map(|(a, w)| (a.as_str(), *w)).collect();
    let new_file = server_list_file(&new_refs);

    let shared = Arc::new(RwLock::new(Arc::new(
        load_continuum(old_file.path()).expect("loads"),
    )));

    let valid: HashSet<String> = new_records.iter().map(|(a, _)| a.clone()).collect();

    thread::scope(|scope| {
        for _ in 0..3 {
            let shared = Arc::clone(&shared);
            let valid = &valid;
            scope.spawn(move || {
                for i in 0..5_000 {
                    // Grab the current ring, then keep using that snapshot.
                    let snapshot = Arc::clone(&shared.read().expect("lock poisoned"));
                    let picked = snapshot.pick_server(i.to_string()).expect("ring has points");
                    assert!(valid.contains(picked.name()), "unknown server {picked}");
                }
            });
        }

        let replacement = Arc::new(load_continuum(new_file.path()).expect("loads"));
        *shared.write().expect("lock poisoned") = replacement;
    });

    let current = Arc::clone(&shared.read().expect("lock poisoned"));
    assert_eq!(current.servers().count(), 11, "swap took effect");

    // Old picks stay balanced on the new ring too.
    let counts = pick_counts(&current, 1_000);
    assert!(counts.len() >= 10, "new ring serves the full fleet");
}
