use crate::collections::avl_map::AvlMap;
use crate::collections::TreeError;

use rand::seq::SliceRandom;
use rand::Rng;

const N: usize = if cfg!(miri) { 40 } else { 150 };
const ROUNDS: usize = if cfg!(miri) { 5 } else { 50 };
const N_LARGE: usize = if cfg!(miri) { 100 } else { 100000 };

fn fill(map: &mut AvlMap<i64, i64>, keys: &[i64]) {
    for &k in keys {
        map.insert(k, k);
    }
}

fn assert_contains(map: &AvlMap<i64, i64>, keys: &[i64]) {
    let mut sorted = keys.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(map.len(), sorted.len());
    for (i, k) in sorted.iter().enumerate() {
        assert_eq!(map.get_by_index(i), Ok(k));
    }
}

#[test]
fn put_and_get() {
    let mut map = AvlMap::new();
    fill(&mut map, &[1, 2]);
    assert_eq!(map.get(&1), Ok(&1));
    assert_eq!(map.get(&2), Ok(&2));
}

#[test]
fn put_same_key_overwrites() {
    let mut map = AvlMap::new();
    assert_eq!(map.insert(1, 1), None);
    assert_eq!(map.insert(2, 2), None);
    assert_eq!(map.insert(1, 3), Some(1));
    assert_eq!(map.get(&1), Ok(&3));
    assert_eq!(map.len(), 2);
    map.check();
}

#[test]
fn get_empty() {
    let map: AvlMap<i64, i64> = AvlMap::new();
    assert_eq!(map.get(&1), Err(TreeError::NotFound));
}

#[test]
fn get_not_containing() {
    let mut map = AvlMap::new();
    map.insert(1, 1);
    assert_eq!(map.get(&2), Err(TreeError::NotFound));
}

#[test]
fn put_and_get_dynamic() {
    let mut rng = rand::thread_rng();
    let mut map = AvlMap::new();
    for _ in 0..N {
        let k = rng.gen_range(0..21);
        map.insert(k, k);
        assert_eq!(map.get(&k), Ok(&k));
        map.check();
    }
}

#[test]
fn delete_root_no_children() {
    let mut map = AvlMap::new();
    map.insert(1, 1);
    assert_eq!(map.remove(&1), Ok(1));
    assert_eq!(map.get(&1), Err(TreeError::NotFound));
    assert!(map.is_empty());
}

#[test]
fn delete_root_one_child() {
    let mut map = AvlMap::new();
    fill(&mut map, &[1, 2]);
    assert_eq!(map.remove(&1), Ok(1));
    map.check();
    assert_eq!(map.get(&1), Err(TreeError::NotFound));
}

#[test]
fn delete_root_two_children() {
    let mut map = AvlMap::new();
    fill(&mut map, &[1, 2, 0]);
    assert_eq!(map.remove(&1), Ok(1));
    map.check();
    assert_eq!(map.get(&1), Err(TreeError::NotFound));
    assert_contains(&map, &[0, 2]);
}

#[test]
fn delete_leaf() {
    let mut map = AvlMap::new();
    fill(&mut map, &[1, 2]);
    assert_eq!(map.remove(&2), Ok(2));
    map.check();
    assert_eq!(map.get(&2), Err(TreeError::NotFound));
}

#[test]
fn delete_one_child_right_subtree() {
    let mut map = AvlMap::new();
    fill(&mut map, &[10, 20, 30]);
    assert_eq!(map.remove(&20), Ok(20));
    map.check();
    assert_contains(&map, &[10, 30]);
}

#[test]
fn delete_one_child_left_subtree() {
    let mut map = AvlMap::new();
    fill(&mut map, &[10, 20, 15]);
    assert_eq!(map.remove(&20), Ok(20));
    map.check();
    assert_contains(&map, &[10, 15]);
}

#[test]
fn delete_two_children() {
    let mut map = AvlMap::new();
    fill(&mut map, &[10, 20, 30, 15]);
    assert_eq!(map.remove(&20), Ok(20));
    map.check();
    assert_contains(&map, &[10, 15, 30]);
}

#[test]
fn delete_empty() {
    let mut map: AvlMap<i64, i64> = AvlMap::new();
    assert_eq!(map.remove(&1), Err(TreeError::NotFound));
}

#[test]
fn delete_not_containing() {
    let mut map = AvlMap::new();
    map.insert(1, 1);
    assert_eq!(map.remove(&2), Err(TreeError::NotFound));
    assert_eq!(map.len(), 1);
}

#[test]
fn delete_dynamic() {
    let mut rng = rand::thread_rng();
    let mut keys: Vec<i64> = (0..N as i64).collect();
    keys.shuffle(&mut rng);
    let mut map = AvlMap::new();
    fill(&mut map, &keys);
    keys.shuffle(&mut rng);
    for &k in &keys {
        map.check();
        assert_eq!(map.remove(&k), Ok(k));
        assert_eq!(map.get(&k), Err(TreeError::NotFound));
    }
    assert!(map.is_empty());
}

#[test]
fn find_max_min() {
    let mut map = AvlMap::new();
    fill(&mut map, &[1, 3, 0, 2]);
    assert_eq!(AvlMap::max(&map), Ok(&3));
    assert_eq!(AvlMap::min(&map), Ok(&0));
}

#[test]
fn find_max_min_empty() {
    let map: AvlMap<i64, i64> = AvlMap::new();
    assert_eq!(AvlMap::max(&map), Err(TreeError::Empty));
    assert_eq!(AvlMap::min(&map), Err(TreeError::Empty));
}

#[test]
fn find_max_min_dynamic() {
    let mut rng = rand::thread_rng();
    let keys: Vec<i64> = (0..N).map(|_| rng.gen_range(0..101)).collect();
    let mut map = AvlMap::new();
    fill(&mut map, &keys);
    assert_eq!(AvlMap::max(&map), Ok(keys.iter().max().unwrap()));
    assert_eq!(AvlMap::min(&map), Ok(keys.iter().min().unwrap()));
}

#[test]
fn next_key_has_right() {
    let mut map = AvlMap::new();
    fill(&mut map, &[10, 30, 0, 20, 50]);
    assert_eq!(map.next(&30), Ok(Some(&50)));
}

#[test]
fn next_key_move_up() {
    let mut map = AvlMap::new();
    fill(&mut map, &[10, 30, 0, 20, 50, 25]);
    assert_eq!(map.next(&25), Ok(Some(&30)));
}

#[test]
fn next_key_no_next() {
    let mut map = AvlMap::new();
    fill(&mut map, &[10, 30, 0, 20, 50]);
    assert_eq!(map.next(&50), Ok(None));
}

#[test]
fn next_key_absent() {
    let mut map = AvlMap::new();
    map.insert(3, 3);
    assert_eq!(map.next(&1), Err(TreeError::NotFound));
    let empty: AvlMap<i64, i64> = AvlMap::new();
    assert_eq!(empty.next(&3), Err(TreeError::NotFound));
}

#[test]
fn prev_key_has_left() {
    let mut map = AvlMap::new();
    fill(&mut map, &[10, 30, 0, 20, 50]);
    assert_eq!(map.prev(&30), Ok(Some(&20)));
}

#[test]
fn prev_key_move_up() {
    let mut map = AvlMap::new();
    fill(&mut map, &[10, 30, 0, 20, 50, 40]);
    assert_eq!(map.prev(&40), Ok(Some(&30)));
}

#[test]
fn prev_key_no_prev() {
    let mut map = AvlMap::new();
    fill(&mut map, &[10, 30, 0, 20, 50]);
    assert_eq!(map.prev(&0), Ok(None));
}

#[test]
fn prev_key_absent() {
    let mut map = AvlMap::new();
    map.insert(3, 3);
    assert_eq!(map.prev(&1), Err(TreeError::NotFound));
    let empty: AvlMap<i64, i64> = AvlMap::new();
    assert_eq!(empty.prev(&3), Err(TreeError::NotFound));
}

#[test]
fn next_and_prev_dynamic() {
    let mut rng = rand::thread_rng();
    let mut keys: Vec<i64> = (0..N as i64).collect();
    keys.shuffle(&mut rng);
    let mut map = AvlMap::new();
    fill(&mut map, &keys);
    keys.sort_unstable();
    for w in keys.windows(2) {
        assert_eq!(map.next(&w[0]), Ok(Some(&w[1])));
        assert_eq!(map.prev(&w[1]), Ok(Some(&w[0])));
    }
    assert_eq!(map.next(keys.last().unwrap()), Ok(None));
    assert_eq!(map.prev(&keys[0]), Ok(None));
}

#[test]
fn len_and_contains() {
    let mut map = AvlMap::new();
    assert_eq!(map.len(), 0);
    assert!(map.is_empty());
    assert!(!map.contains(&0));
    map.insert(1, 1);
    assert_eq!(map.len(), 1);
    assert!(map.contains(&1));
    map.insert(1, 3);
    assert_eq!(map.len(), 1);
    assert_eq!(map.remove(&1), Ok(3));
    assert_eq!(map.len(), 0);
    assert!(!map.contains(&1));
}

#[test]
fn get_by_index_empty() {
    let map: AvlMap<i64, i64> = AvlMap::new();
    assert_eq!(map.get_by_index(0), Err(TreeError::OutOfRange));
}

#[test]
fn get_by_index_overflow() {
    let mut map = AvlMap::new();
    map.insert(1, 2);
    assert_eq!(map.get_by_index(1), Err(TreeError::OutOfRange));
}

#[test]
fn get_by_index_common() {
    let mut map = AvlMap::new();
    fill(&mut map, &[1, 0, 3]);
    assert_eq!(map.get_by_index(0), Ok(&0));
    assert_eq!(map.get_by_index(1), Ok(&1));
    assert_eq!(map.get_by_index(2), Ok(&3));
}

#[test]
fn get_by_index_after_delete() {
    let mut map = AvlMap::new();
    fill(&mut map, &[1, 0, 3]);
    map.remove(&1).unwrap();
    assert_eq!(map.get_by_index(1), Ok(&3));
}

#[test]
fn get_by_index_dynamic() {
    let mut rng = rand::thread_rng();
    let mut keys: Vec<i64> = (0..N as i64).collect();
    keys.shuffle(&mut rng);
    let mut map = AvlMap::new();
    fill(&mut map, &keys);
    keys.sort_unstable();
    for (i, k) in keys.iter().enumerate() {
        assert_eq!(map.get_by_index(i), Ok(k));
    }
}

fn merge_case(first: &[i64], second: &[i64]) {
    let mut a = AvlMap::new();
    let mut b = AvlMap::new();
    fill(&mut a, first);
    fill(&mut b, second);
    a.merge(b);
    a.check();
    let all: Vec<i64> = first.iter().chain(second.iter()).copied().collect();
    assert_contains(&a, &all);
}

#[test]
fn merge_empty_first() {
    merge_case(&[], &[1, 2]);
}

#[test]
fn merge_empty_second() {
    merge_case(&[1, 2], &[]);
}

#[test]
fn merge_empty_both() {
    merge_case(&[], &[]);
}

#[test]
fn merge_equal_height() {
    merge_case(&[1, 2, 0, 4, 3], &[5, 7, 8, 6, 9]);
}

#[test]
fn merge_first_higher() {
    merge_case(&[1, 2, 0, 4, 3], &[5, 6]);
}

#[test]
fn merge_second_higher() {
    merge_case(&[1, 2, 0], &[3, 5, 7, 8, 6, 4]);
}

#[test]
fn merge_one_element_first() {
    merge_case(&[1], &[2, 3, 5]);
}

#[test]
fn merge_one_element_second() {
    merge_case(&[1, 2], &[5]);
}

#[test]
fn merge_far_apart() {
    merge_case(&[0, 1], &[50, 51, 52, 53]);
}

#[test]
fn merge_pivot_has_one_child() {
    merge_case(&[1, 0, 3, 2], &[5, 6, 7]);
}

#[test]
fn merge_dynamic() {
    let mut rng = rand::thread_rng();
    for _ in 0..ROUNDS {
        let first: Vec<i64> = (0..rng.gen_range(1..51)).collect();
        let second: Vec<i64> = (0..rng.gen_range(1..51)).map(|i| i + 50).collect();
        merge_case(&first, &second);
    }
}

fn split_case(keys: &[i64], at: i64) {
    let mut map = AvlMap::new();
    fill(&mut map, keys);
    let (a, b) = map.split(&at);
    a.check();
    b.check();
    let mut sorted = keys.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(a.len() + b.len(), sorted.len());
    for i in 0..a.len() {
        assert!(*a.get_by_index(i).unwrap() <= at);
    }
    for i in 0..b.len() {
        assert!(*b.get_by_index(i).unwrap() > at);
    }
    let recombined: Vec<i64> = a.keys().chain(b.keys()).copied().collect();
    assert_eq!(recombined, sorted);
}

#[test]
fn split_middle() {
    split_case(&[1, 0, 2, 6, 3, -1], 3);
}

#[test]
fn split_at_root() {
    split_case(&[1, 0, 2, 6, 3, -1], 1);
}

#[test]
fn split_at_leaf() {
    split_case(&[1, 0, 2, 6, 3, -1], 2);
}

#[test]
fn split_not_contained_key() {
    split_case(&[1, 0, 2, 6, 3, -1], 4);
}

#[test]
fn split_below_minimum() {
    split_case(&[1, 0, 2, 6, 3, -1], -10);
}

#[test]
fn split_above_maximum() {
    split_case(&[1, 0, 2, 6, 3, -1], 10);
}

#[test]
fn split_empty() {
    split_case(&[], 10);
}

#[test]
fn split_dynamic() {
    let mut rng = rand::thread_rng();
    for _ in 0..N {
        let keys: Vec<i64> = (0..25).map(|_| rng.gen_range(0..51)).collect();
        let at = rng.gen_range(0..51);
        split_case(&keys, at);
    }
}

#[test]
fn split_merge_round_trip() {
    let keys = [5, 3, 8, 1, 4, 7, 9];
    for at in -1..=10 {
        let mut map = AvlMap::new();
        fill(&mut map, &keys);
        let (mut a, b) = map.split(&at);
        a.merge(b);
        a.check();
        assert_contains(&a, &keys);
    }
}

// The concrete order-statistics scenario: seven inserts, then every rank.
#[test]
fn ranks_after_inserts() {
    let mut map = AvlMap::new();
    fill(&mut map, &[5, 3, 8, 1, 4, 7, 9]);
    let expected = [1, 3, 4, 5, 7, 8, 9];
    for (i, k) in expected.iter().enumerate() {
        assert_eq!(map.get_by_index(i), Ok(k));
    }
    map.check();

    assert_eq!(map.remove(&5), Ok(5));
    assert!(!map.contains(&5));
    let expected = [1, 3, 4, 7, 8, 9];
    for (i, k) in expected.iter().enumerate() {
        assert_eq!(map.get_by_index(i), Ok(k));
    }
    map.check();
}

#[test]
fn merge_different_shapes() {
    let mut a = AvlMap::new();
    let mut b = AvlMap::new();
    fill(&mut a, &[1, 2, 3]);
    fill(&mut b, &[10, 20]);
    a.merge(b);
    a.check();
    assert_eq!(a.len(), 5);
    let keys: Vec<i64> = a.keys().copied().collect();
    assert_eq!(keys, [1, 2, 3, 10, 20]);
}

#[test]
fn split_keeps_order() {
    let mut map = AvlMap::new();
    fill(&mut map, &[5, 3, 8, 1, 4, 7, 9]);
    let (a, b) = map.split(&4);
    let low: Vec<i64> = a.keys().copied().collect();
    let high: Vec<i64> = b.keys().copied().collect();
    assert_eq!(low, [1, 3, 4]);
    assert_eq!(high, [5, 7, 8, 9]);
}

#[test]
fn ascending_inserts_stay_balanced() {
    let mut map = AvlMap::new();
    for i in 0..N_LARGE as i64 {
        map.insert(i, i);
    }
    assert_eq!(map.len(), N_LARGE);
    map.check();
}

#[test]
fn iter_and_rev() {
    let mut map = AvlMap::new();
    fill(&mut map, &[2, 0, 3, 1]);
    let forward: Vec<i64> = map.keys().copied().collect();
    assert_eq!(forward, [0, 1, 2, 3]);
    let backward: Vec<i64> = map.keys().rev().copied().collect();
    assert_eq!(backward, [3, 2, 1, 0]);
    assert_eq!(map.iter().len(), 4);
    let values: Vec<i64> = map.values().copied().collect();
    assert_eq!(values, [0, 1, 2, 3]);
}

#[test]
fn pop_first_and_last() {
    let mut map = AvlMap::new();
    fill(&mut map, &[2, 0, 3, 1]);
    assert_eq!(map.pop_first(), Some((0, 0)));
    assert_eq!(map.pop_last(), Some((3, 3)));
    map.check();
    assert_eq!(map.len(), 2);
    let mut empty: AvlMap<i64, i64> = AvlMap::new();
    assert_eq!(empty.pop_first(), None);
    assert_eq!(empty.pop_last(), None);
}

#[test]
fn into_iter_and_from_iter() {
    let map: AvlMap<i64, i64> = [(2, 20), (0, 0), (1, 10)].into_iter().collect();
    let pairs: Vec<(i64, i64)> = map.into_iter().collect();
    assert_eq!(pairs, [(0, 0), (1, 10), (2, 20)]);
}

#[test]
fn index_and_eq() {
    let map = AvlMap::from([(1, 10), (2, 20)]);
    assert_eq!(map[&1], 10);
    let same = AvlMap::from([(2, 20), (1, 10)]);
    assert_eq!(map, same);
    assert_eq!(format!("{map:?}"), "{1: 10, 2: 20}");
}

#[test]
fn clone_test() {
    let mut map = AvlMap::new();
    let keys: Vec<i64> = (0..N as i64).collect();
    fill(&mut map, &keys);
    let copy = map.clone();
    copy.check();
    assert_contains(&copy, &keys);
    drop(map);
    assert_contains(&copy, &keys);
}

#[test]
fn large_map() {
    let mut map = AvlMap::new();
    for i in 0..N_LARGE as i64 {
        map.insert(i, 1u8);
    }
    assert_eq!(map.len(), N_LARGE);
    for i in 0..N_LARGE as i64 {
        assert_eq!(map.get(&i), Ok(&1u8));
    }
}

#[test]
fn mixed_ops_dynamic() {
    let mut rng = rand::thread_rng();
    let mut map = AvlMap::new();
    let mut model = std::collections::BTreeMap::new();
    for _ in 0..N {
        let k = rng.gen_range(0..40);
        if rng.gen_bool(0.6) {
            assert_eq!(map.insert(k, k), model.insert(k, k));
        } else {
            assert_eq!(map.remove(&k).ok(), model.remove(&k));
        }
        map.check();
        assert_eq!(map.len(), model.len());
        let ours: Vec<i64> = map.keys().copied().collect();
        let theirs: Vec<i64> = model.keys().copied().collect();
        assert_eq!(ours, theirs);
    }
}
