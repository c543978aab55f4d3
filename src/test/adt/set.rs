//! Testing utilities for set types.

use core::fmt::Debug;
use core::hash::Hash;
use std::collections::{HashMap, HashSet};
use std::thread::scope;

use rand::prelude::*;

use crate::test::RandGen;
use crate::ConcurrentSet;

/// Runs many operations in a single thread and tests if it works like a set, using
/// `std::collections::HashSet` as reference.
pub fn stress_sequential<T, S>(steps: usize)
where
    T: Clone + Debug + Eq + Hash + RandGen,
    S: Default + ConcurrentSet<T>,
{
    enum Ops {
        ContainsSome,
        ContainsNone,
        Insert,
        RemoveSome,
        RemoveNone,
    }
    const OPS: [Ops; 5] = [
        Ops::ContainsSome,
        Ops::ContainsNone,
        Ops::Insert,
        Ops::RemoveSome,
        Ops::RemoveNone,
    ];

    let mut rng = thread_rng();
    let set = S::default();
    let mut hashset = HashSet::new();

    for i in 0..steps {
        let op = OPS.choose(&mut rng).unwrap();

        match op {
            Ops::ContainsSome => {
                let Some(value) = hashset.iter().choose(&mut rng) else {
                    continue;
                };

                println!("iteration {i}: contains({value:?}) (existing)");

                assert!(set.contains(value));
            }
            Ops::ContainsNone => {
                let value = T::rand_gen(&mut rng);
                let expected = hashset.contains(&value);
                let non = if expected { "" } else { "non-" };

                println!("iteration {i}: contains({value:?}) ({non}existing)");

                assert_eq!(set.contains(&value), expected);
            }
            Ops::Insert => {
                let value = T::rand_gen(&mut rng);

                println!("iteration {i}: insert({value:?})");

                assert_eq!(set.insert(value.clone()), hashset.insert(value));
            }
            Ops::RemoveSome => {
                let Some(value) = hashset.iter().choose(&mut rng).cloned() else {
                    continue;
                };

                println!("iteration {i}: remove({value:?}) (existing)");

                assert_eq!(set.remove(&value), hashset.remove(&value));
            }
            Ops::RemoveNone => {
                let value = T::rand_gen(&mut rng);
                let expected = hashset.remove(&value);
                let non = if expected { "" } else { "non-" };

                println!("iteration {i}: remove({value:?}) ({non}existing)");

                assert_eq!(set.remove(&value), expected);
            }
        }
        assert_eq!(set.len(), hashset.len());
    }
}

enum Ops {
    Contains,
    Insert,
    Remove,
}
const OPS: [Ops; 3] = [Ops::Contains, Ops::Insert, Ops::Remove];

/// Randomly runs many operations concurrently. Once all threads are done, the size of the set must
/// be the number of successful inserts minus the number of successful removes.
pub fn stress_concurrent<T, S>(threads: usize, steps: usize)
where
    T: Debug + Eq + RandGen,
    S: Default + Sync + ConcurrentSet<T>,
{
    let set = S::default();

    let net = scope(|s| {
        let mut handles = Vec::new();
        for _ in 0..threads {
            let handle = s.spawn(|| {
                let mut rng = thread_rng();
                let mut net = 0isize;
                for _ in 0..steps {
                    let op = OPS.choose(&mut rng).unwrap();
                    let value = T::rand_gen(&mut rng);

                    match op {
                        Ops::Contains => {
                            let _ = set.contains(&value);
                        }
                        Ops::Insert => {
                            if set.insert(value) {
                                net += 1;
                            }
                        }
                        Ops::Remove => {
                            if set.remove(&value) {
                                net -= 1;
                            }
                        }
                    }
                }
                net
            });
            handles.push(handle);
        }
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .sum::<isize>()
    });

    assert_eq!(set.len() as isize, net);
}

#[derive(Debug, Clone)]
enum Log<T> {
    Contains { value: T, result: bool },
    Insert { value: T, result: bool },
    Remove { value: T, result: bool },
}

impl<T> Log<T> {
    fn value(&self) -> &T {
        match self {
            Self::Contains { value, .. }
            | Self::Insert { value, .. }
            | Self::Remove { value, .. } => value,
        }
    }
}

fn assert_logs_consistent<T, S>(logs: &[Log<T>], set: &S)
where
    T: Debug + Eq + Hash,
    S: ConcurrentSet<T>,
{
    let mut per_value_logs = HashMap::new();
    for l in logs {
        per_value_logs.entry(l.value()).or_insert(vec![]).push(l);
    }

    for (v, logs) in per_value_logs {
        let mut inserts = 0usize;
        let mut removes = 0usize;
        let mut found = false;

        for l in logs {
            match l {
                Log::Insert { result: true, .. } => inserts += 1,
                Log::Remove { result: true, .. } => removes += 1,
                Log::Contains { result: true, .. } => found = true,
                _ => (),
            }
        }

        // Successful inserts and removes of one value alternate in any linearization, starting
        // with an insert.
        assert!(
            inserts == removes || inserts == removes + 1,
            "value: {v:?}, inserted {inserts} times but removed {removes} times."
        );
        assert!(
            !found || inserts > 0,
            "value: {v:?}, contains succeeded but never inserted."
        );
        assert_eq!(
            set.contains(v),
            inserts == removes + 1,
            "value: {v:?}, final membership disagrees with {inserts} inserts and {removes} removes."
        );
    }
}

/// Randomly runs many operations concurrently and logs the operations & results per thread. Then
/// checks the consistency of the log per value against the final content of the set. For example,
/// if `v` was successfully removed twice, then `v` must have been inserted at least twice.
pub fn log_concurrent<T, S>(threads: usize, steps: usize)
where
    T: Clone + Debug + Eq + Hash + RandGen + Send,
    S: Default + Sync + ConcurrentSet<T>,
{
    let set = S::default();

    let logs = scope(|s| {
        let mut handles = Vec::new();

        for _ in 0..threads {
            let handle = s.spawn(|| {
                let mut rng = thread_rng();
                let mut logs = Vec::new();

                for _ in 0..steps {
                    let op = OPS.choose(&mut rng).unwrap();
                    let value = T::rand_gen(&mut rng);

                    match op {
                        Ops::Contains => {
                            let result = set.contains(&value);
                            logs.push(Log::Contains { value, result });
                        }
                        Ops::Insert => {
                            let result = set.insert(value.clone());
                            logs.push(Log::Insert { value, result });
                        }
                        Ops::Remove => {
                            let result = set.remove(&value);
                            logs.push(Log::Remove { value, result });
                        }
                    }
                }
                logs
            });
            handles.push(handle);
        }
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect::<Box<[_]>>()
    });

    assert_logs_consistent(&logs, &set);
}

/// Each of `threads` threads inserts its own contiguous range of `per_thread` integers into `set`.
/// Afterwards the set must hold exactly `0..threads * per_thread`.
///
/// Start from a small capacity to force resizes while the threads insert.
pub fn insert_disjoint_concurrent<S>(set: &S, threads: usize, per_thread: usize)
where
    S: Sync + ConcurrentSet<usize>,
{
    scope(|s| {
        for t in 0..threads {
            let _ = s.spawn(move || {
                for i in t * per_thread..(t + 1) * per_thread {
                    assert!(set.insert(i), "{i} inserted twice");
                }
            });
        }
    });

    let total = threads * per_thread;
    assert_eq!(set.len(), total);
    for i in 0..total {
        assert!(set.contains(&i), "{i} lost");
    }
}

/// One thread keeps growing `set` (forcing resizes) while `removers` threads walk their share of
/// `prefill` pre-inserted integers, checking membership before and after removing each one.
///
/// Afterwards only the grower's integers remain.
pub fn resize_mixed_concurrent<S>(set: &S, removers: usize, prefill: usize, grow: usize)
where
    S: Sync + ConcurrentSet<usize>,
{
    for i in 0..prefill {
        assert!(set.insert(i));
    }

    scope(|s| {
        let _ = s.spawn(|| {
            for i in prefill..prefill + grow {
                assert!(set.insert(i));
            }
        });

        for r in 0..removers {
            let _ = s.spawn(move || {
                for i in (r..prefill).step_by(removers) {
                    assert!(set.contains(&i), "{i} missing before removal");
                    assert!(set.remove(&i), "{i} not removed");
                    assert!(!set.contains(&i), "{i} still present after removal");
                    assert!(!set.remove(&i), "{i} removed twice");
                }
            });
        }
    });

    assert_eq!(set.len(), grow);
    for i in 0..prefill {
        assert!(!set.contains(&i));
    }
    for i in prefill..prefill + grow {
        assert!(set.contains(&i));
    }
}
