use super::*;
use std::collections::HashSet;
use std::sync::Arc;

#[test]
fn first_id_is_one() {
    let ids = IdentityAllocator::new();
    assert_eq!(ids.next(), ConnectionId(1));
    assert_eq!(ids.next(), ConnectionId(2));
}

#[test]
fn ids_strictly_increase() {
    let ids = IdentityAllocator::new();
    let issued: Vec<ConnectionId> = (0..500).map(|_| ids.next()).collect();
    assert!(issued.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn independent_allocators_do_not_share_state() {
    let a = IdentityAllocator::new();
    let b = IdentityAllocator::new();
    a.next();
    a.next();
    assert_eq!(b.next(), ConnectionId(1));
}

#[test]
fn concurrent_callers_never_see_duplicates() {
    let ids = Arc::new(IdentityAllocator::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ids = Arc::clone(&ids);
            std::thread::spawn(move || (0..200).map(|_| ids.next()).collect::<Vec<_>>())
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(seen.insert(id), "duplicate id {id}");
        }
    }
    assert_eq!(seen.len(), 1600);
}
