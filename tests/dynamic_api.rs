//! Tests for the loosely-typed `DynList` adapter.

use std::any::Any;
use std::sync::{Arc, Barrier};
use std::thread;

use snaplist::{DynList, Error, SnapList};

fn boxed<T: Any>(value: T) -> Box<dyn Any> {
    return Box::new(value);
}

fn strings(values: &[&str]) -> SnapList<String> {
    return values.iter().map(|s| s.to_string()).collect();
}

// =============================================================================
// Round trips through dyn Any
// =============================================================================

#[test]
fn values_round_trip_through_any() {
    let list = strings(&["a", "b"]);
    let list: &dyn DynList = &list;

    assert_eq!(list.push_dyn(boxed("c".to_string())), Ok(2));
    list.insert_dyn(0, boxed("z".to_string())).unwrap();
    list.set_dyn(1, boxed("A".to_string())).unwrap();

    let got = list.get_dyn(1).unwrap();
    assert_eq!(got.downcast_ref::<String>().map(String::as_str), Some("A"));
    assert_eq!(list.len_dyn(), 4);

    list.remove_at_dyn(0).unwrap();
    assert_eq!(list.index_of_dyn(&"c".to_string()), 2);
}

#[test]
fn adapter_and_typed_views_agree() {
    let list = strings(&["x"]);
    list.push_dyn(boxed("y".to_string())).unwrap();
    list.push("z".to_string()).unwrap();
    assert_eq!(list.to_vec(), vec!["x", "y", "z"]);
    assert!(list.contains_dyn(&"z".to_string()));
}

// =============================================================================
// Type mismatches
// =============================================================================

#[test]
fn mismatched_writes_are_invalid_cast() {
    let list = strings(&["a"]);
    let before = list.snapshot();

    for err in [
        list.push_dyn(boxed(1u8)).unwrap_err(),
        list.insert_dyn(0, boxed('a')).unwrap_err(),
        list.set_dyn(0, boxed("a")).unwrap_err(),
        list.remove_dyn(&42i64).unwrap_err(),
    ] {
        assert_eq!(err, Error::InvalidCast { expected: "alloc::string::String" });
    }
    assert!(before.ptr_eq(&list.snapshot()));
}

#[test]
fn mismatch_is_reported_before_index() {
    let list = strings(&[]);
    assert!(list.set_dyn(5, boxed(5u32)).unwrap_err().is_invalid_cast());
    assert!(list.insert_dyn(-1, boxed(5u32)).unwrap_err().is_invalid_cast());
}

#[test]
fn mismatched_queries_are_misses() {
    let list = strings(&["1"]);
    assert!(!list.contains_dyn(&1));
    assert!(!list.contains_dyn(&"1"));
    assert_eq!(list.index_of_dyn(&1), -1);
    assert_eq!(list.remove_dyn(&"2".to_string()), Ok(false));
    assert_eq!(list.remove_dyn(&"1".to_string()), Ok(true));
    assert_eq!(list.len_dyn(), 0);
}

// =============================================================================
// Indices
// =============================================================================

#[test]
fn minus_one_and_len_are_out_of_range_for_every_size() {
    let list: SnapList<i32> = SnapList::new();
    for len in 0..10 {
        assert_eq!(
            list.get_dyn(-1).unwrap_err(),
            Error::IndexOutOfRange { index: -1, len }
        );
        assert_eq!(
            list.get_dyn(len as isize).unwrap_err(),
            Error::IndexOutOfRange { index: len as isize, len }
        );
        list.push_dyn(boxed(len as i32)).unwrap();
    }
}

#[test]
fn negative_writes_publish_nothing() {
    let list: SnapList<i32> = (0..3).collect();
    let before = list.snapshot();
    assert!(list.set_dyn(-2, boxed(9)).unwrap_err().is_index_out_of_range());
    assert!(list.insert_dyn(-1, boxed(9)).unwrap_err().is_index_out_of_range());
    assert!(list.remove_at_dyn(isize::MIN).unwrap_err().is_index_out_of_range());
    assert!(before.ptr_eq(&list.snapshot()));
}

// =============================================================================
// Enumeration
// =============================================================================

fn unbox(values: impl Iterator<Item = Box<dyn Any + Send>>) -> Vec<i32> {
    return values
        .map(|value| *value.downcast::<i32>().unwrap())
        .collect();
}

#[test]
fn iter_dyn_ignores_concurrent_mutation() {
    for _ in 0..50 {
        let list: Arc<SnapList<i32>> = Arc::new((1..=3).collect());
        let view: &dyn DynList = &*list;
        let mut iter = view.iter_dyn();
        assert_eq!(iter.next().map(|v| *v.downcast::<i32>().unwrap()), Some(1));

        let barrier = Arc::new(Barrier::new(3));
        let pusher = {
            let (list, barrier) = (Arc::clone(&list), Arc::clone(&barrier));
            thread::spawn(move || {
                barrier.wait();
                list.push_dyn(boxed(4i32)).unwrap();
            })
        };
        let remover = {
            let (list, barrier) = (Arc::clone(&list), Arc::clone(&barrier));
            thread::spawn(move || {
                barrier.wait();
                list.remove_at_dyn(0).unwrap();
            })
        };

        barrier.wait();
        pusher.join().unwrap();
        remover.join().unwrap();

        assert_eq!(unbox(iter), vec![2, 3]);
        let mut after = unbox(view.iter_dyn());
        after.sort_unstable();
        assert_eq!(after, vec![2, 3, 4]);
    }
}

#[test]
fn registry_entries_can_be_read_back() {
    let registry: Vec<Arc<dyn DynList>> = vec![
        Arc::new(SnapList::<i32>::from_iter([5, 6])),
        Arc::new(SnapList::<i32, Arc<[i32]>>::from_iter([7])),
    ];
    let contents: Vec<Vec<i32>> = registry
        .iter()
        .map(|list| unbox(list.to_vec_dyn().into_iter()))
        .collect();
    assert_eq!(contents, vec![vec![5, 6], vec![7]]);

    let mut dest = vec![0i32; 2];
    assert_eq!(registry[0].copy_to_dyn(&mut dest, 0), Ok(2));
    assert_eq!(dest, vec![5, 6]);
    assert!(registry[1].copy_to_dyn(&mut vec![0u8; 2], 0).unwrap_err().is_invalid_cast());
}

// =============================================================================
// Heterogeneous registries
// =============================================================================

#[test]
fn lists_of_different_types_share_a_registry() {
    let registry: Vec<Arc<dyn DynList>> = vec![
        Arc::new(SnapList::<u64>::new()),
        Arc::new(strings(&[])),
        Arc::new(SnapList::<u64, Arc<[u64]>>::new()),
    ];

    for list in &registry {
        assert!(!list.is_read_only());
        assert!(!list.is_fixed_size());
        let _ = list.push_dyn(boxed(7u64));
    }

    let lens: Vec<usize> = registry.iter().map(|list| list.len_dyn()).collect();
    assert_eq!(lens, vec![1, 0, 1]);
    assert_eq!(registry[1].element_type(), "alloc::string::String");

    for list in &registry {
        list.clear_dyn().unwrap();
        assert_eq!(list.len_dyn(), 0);
    }
}
