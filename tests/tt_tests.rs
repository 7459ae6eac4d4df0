use lodestar::mv::Move;
use lodestar::tt::{Bound, Probe, TranspositionTable, TtEntry, MAX_CAPACITY, MIN_CAPACITY};

fn entry(key: u64, depth: u8, score: i32) -> TtEntry {
    TtEntry {
        key,
        depth,
        bound: Bound::Exact,
        score,
        best_move: Some(Move::new(52, 36)),
    }
}

#[test]
fn test_store_and_probe_round_trip() {
    let mut tt = TranspositionTable::new(1 << 12);
    let e = entry(0xdead_beef, 5, 42);
    tt.store(e);
    match tt.probe(e.key, 5) {
        Probe::Hit(got) => {
            assert_eq!(got.key, e.key);
            assert_eq!(got.depth, 5);
            assert_eq!(got.score, 42);
            assert_eq!(got.best_move, e.best_move);
            assert_eq!(got.bound, Bound::Exact);
        }
        other => panic!("expected a hit, got {other:?}"),
    }
}

#[test]
fn test_probe_miss_on_unknown_key() {
    let tt = TranspositionTable::new(1 << 12);
    assert!(matches!(tt.probe(123, 0), Probe::Miss));
}

#[test]
fn test_shallow_entry_degrades_to_hint() {
    let mut tt = TranspositionTable::new(1 << 12);
    tt.store(entry(99, 3, 10));
    // Requesting deeper than stored: only the move hint survives.
    match tt.probe(99, 6) {
        Probe::Hint(m) => assert_eq!(m, Move::new(52, 36)),
        other => panic!("expected a hint, got {other:?}"),
    }
    // A hint-less shallow entry is a miss.
    let mut hintless = entry(99, 3, 10);
    hintless.best_move = None;
    tt.store(hintless);
    assert!(matches!(tt.probe(99, 6), Probe::Miss));
}

#[test]
fn test_same_key_always_overwrites() {
    let mut tt = TranspositionTable::new(1 << 12);
    tt.store(entry(7, 9, 100));
    tt.store(entry(7, 2, -50));
    match tt.probe(7, 2) {
        Probe::Hit(got) => {
            assert_eq!(got.depth, 2);
            assert_eq!(got.score, -50);
        }
        other => panic!("expected a hit, got {other:?}"),
    }
}

#[test]
fn test_collision_is_depth_preferred() {
    // Capacity 4096 with a mixing index: keys 0x1000 and 0x2000 both land
    // in slot 0.
    let mut tt = TranspositionTable::new(1 << 12);
    assert_eq!(tt.capacity(), 1 << 12);

    tt.store(entry(0x1000, 8, 1));
    // Shallower entry with a colliding key must not evict.
    tt.store(entry(0x2000, 3, 2));
    assert!(matches!(tt.probe(0x1000, 8), Probe::Hit(_)));
    assert!(matches!(tt.probe(0x2000, 3), Probe::Miss));

    // A deeper colliding entry replaces.
    tt.store(entry(0x2000, 9, 3));
    assert!(matches!(tt.probe(0x2000, 9), Probe::Hit(_)));
    assert!(matches!(tt.probe(0x1000, 8), Probe::Miss));
}

#[test]
fn test_clear_empties_but_keeps_capacity() {
    let mut tt = TranspositionTable::new(1 << 13);
    tt.store(entry(0xabc, 2, 10));
    assert!(matches!(tt.probe(0xabc, 2), Probe::Hit(_)));
    tt.clear();
    assert!(matches!(tt.probe(0xabc, 2), Probe::Miss));
    assert_eq!(tt.capacity(), 1 << 13);
}

#[test]
fn test_capacity_is_clamped_to_power_of_two() {
    assert_eq!(TranspositionTable::new(0).capacity(), MIN_CAPACITY);
    assert_eq!(TranspositionTable::new(5000).capacity(), 8192);
    assert_eq!(TranspositionTable::new(usize::MAX / 2).capacity(), MAX_CAPACITY);
}
