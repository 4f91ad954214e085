//! Bucketed map for concurrent accumulation keyed by integers.
//!
//! Each bucket is a `BTreeMap` behind its own `parking_lot::Mutex`. Writers that
//! hit different buckets never contend. Used for the lifetime of a single
//! parallel scoring call and then drained into an ordinary ordered map.

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

mod sealed {
    pub trait Sealed {}
}

/// Integer key types accepted by [`ConcurrentMap`].
pub trait BucketKey: sealed::Sealed + Copy + Ord {
    /// Bucket index in `0..bucket_count`.
    fn bucket(self, bucket_count: usize) -> usize;
}

macro_rules! impl_bucket_key {
    ($($t:ty),*) => {
        $(
            impl sealed::Sealed for $t {}
            impl BucketKey for $t {
                #[inline]
                fn bucket(self, bucket_count: usize) -> usize {
                    (self as i128).rem_euclid(bucket_count as i128) as usize
                }
            }
        )*
    };
}

impl_bucket_key!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Exclusive access to one value. The owning bucket stays locked until this is dropped.
pub struct Access<'a, V> {
    guard: MappedMutexGuard<'a, V>,
}

impl<V> Deref for Access<'_, V> {
    type Target = V;

    fn deref(&self) -> &V {
        &self.guard
    }
}

impl<V> DerefMut for Access<'_, V> {
    fn deref_mut(&mut self) -> &mut V {
        &mut self.guard
    }
}

pub struct ConcurrentMap<K, V> {
    buckets: Vec<Mutex<BTreeMap<K, V>>>,
}

impl<K: BucketKey, V: Default> ConcurrentMap<K, V> {
    /// Panics if `bucket_count` is zero.
    pub fn new(bucket_count: usize) -> Self {
        assert!(bucket_count > 0, "ConcurrentMap needs at least one bucket");
        let buckets = (0..bucket_count).map(|_| Mutex::new(BTreeMap::new())).collect();
        Self { buckets }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Lock the bucket owning `key` and return its value, inserting `V::default()` if absent.
    pub fn access(&self, key: K) -> Access<'_, V> {
        let bucket = self.buckets[key.bucket(self.buckets.len())].lock();
        Access {
            guard: MutexGuard::map(bucket, |map| map.entry(key).or_default()),
        }
    }

    pub fn erase(&self, key: K) {
        self.buckets[key.bucket(self.buckets.len())].lock().remove(&key);
    }

    /// Move every entry into one ordered map, leaving all buckets empty.
    ///
    /// Buckets are locked one at a time; no two bucket locks are ever held together.
    pub fn drain_to_ordered_map(&self) -> BTreeMap<K, V> {
        let mut result = BTreeMap::new();
        for bucket in &self.buckets {
            let mut part = std::mem::take(&mut *bucket.lock());
            result.append(&mut part);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn access_inserts_default() {
        let map: ConcurrentMap<i32, f64> = ConcurrentMap::new(4);
        *map.access(7) += 1.5;
        *map.access(7) += 1.0;
        let drained = map.drain_to_ordered_map();
        assert_eq!(drained.get(&7), Some(&2.5));
    }

    #[test]
    fn drain_empties_buckets() {
        let map: ConcurrentMap<u64, u32> = ConcurrentMap::new(3);
        for k in 0..10 {
            *map.access(k) += 1;
        }
        assert_eq!(map.drain_to_ordered_map().len(), 10);
        assert!(map.drain_to_ordered_map().is_empty());
    }

    #[test]
    fn erase_missing_key_is_noop() {
        let map: ConcurrentMap<i32, i32> = ConcurrentMap::new(2);
        *map.access(1) = 5;
        map.erase(2);
        map.erase(1);
        assert!(map.drain_to_ordered_map().is_empty());
    }

    #[test]
    fn negative_keys_land_in_range() {
        assert_eq!((-1i32).bucket(10), 9);
        assert_eq!(25u8.bucket(10), 5);
    }

    #[test]
    fn parallel_increments_are_not_lost() {
        let map: ConcurrentMap<i32, u64> = ConcurrentMap::new(10);
        (0..10_000).into_par_iter().for_each(|i| {
            *map.access(i % 37) += 1;
        });
        let drained = map.drain_to_ordered_map();
        assert_eq!(drained.values().sum::<u64>(), 10_000);
        assert_eq!(drained.len(), 37);
    }

    #[test]
    fn bucket_released_after_panic_while_held() {
        let map: ConcurrentMap<i32, i32> = ConcurrentMap::new(2);
        *map.access(1) = 41;
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut held = map.access(1);
            *held += 100;
            panic!("abort while holding the bucket");
        }));
        assert!(result.is_err());
        // parking_lot does not poison, so the write made before the panic stays
        *map.access(1) -= 100;
        *map.access(1) += 1;
        assert_eq!(map.drain_to_ordered_map().get(&1), Some(&42));
    }

    #[test]
    fn bucket_released_on_early_return() {
        let map: ConcurrentMap<i32, i32> = ConcurrentMap::new(1);
        let bump = |key: i32| -> Result<(), String> {
            let mut held = map.access(key);
            *held += 1;
            let first_visit = if *held > 1 { Err(format!("key {key} seen twice")) } else { Ok(()) };
            first_visit?;
            Ok(())
        };
        assert!(bump(3).is_ok());
        assert_eq!(bump(3), Err("key 3 seen twice".to_string()));
        // single bucket: every key shares the lock the failed call held
        assert!(bump(4).is_ok());
        *map.access(3) += 10;
        let drained = map.drain_to_ordered_map();
        assert_eq!(drained.get(&3), Some(&12));
        assert_eq!(drained.get(&4), Some(&1));
    }

    #[test]
    #[should_panic(expected = "at least one bucket")]
    fn zero_buckets_panics() {
        let _map: ConcurrentMap<i32, i32> = ConcurrentMap::new(0);
    }
}
