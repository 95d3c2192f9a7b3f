//! # Stable Stores
//!
//! Insertion-stable, handle-indexed containers for the entity arenas. Inserts
//! and erases never invalidate other handles, and a handle kept across an
//! erase-then-reuse of its slot reads as dead rather than aliasing the new
//! occupant.
//!
//! Two implementations sit behind the [`StableStore`] trait:
//! - [`PepperedStore`]: a dense slot vector plus free-slot list; handles carry
//!   a per-slot generation tag (`slotmap::SlotMap`).
//! - [`CompactStore`]: an indirection table in front of a value vector that is
//!   kept tight on erase (`slotmap::DenseSlotMap`).
//!
//! Consumers may not depend on iteration order; it is only guaranteed to be
//! deterministic within a single session.

use slotmap::{DenseSlotMap, Key, SlotMap};

use crate::error::GraphError;

/// Common interface of the two stable store variants.
pub trait StableStore<K: Key, V>: Default {
    /// Borrowing iterator over `(handle, &value)` pairs.
    type Iter<'a>: Iterator<Item = (K, &'a V)>
    where
        Self: 'a,
        V: 'a;

    /// Places `value` and returns a fresh handle. Amortized O(1); no other
    /// handle is invalidated.
    fn insert(&mut self, value: V) -> K;

    /// Removes and returns the value behind `key`.
    fn erase(&mut self, key: K) -> Result<V, GraphError>;

    /// Equivalent to erasing each key in sequence, though the store may
    /// reorder the work internally.
    fn erase_batch(&mut self, keys: impl IntoIterator<Item = K>) -> Result<(), GraphError> {
        for key in keys {
            self.erase(key)?;
        }
        Ok(())
    }

    /// Borrows the value behind `key`.
    fn get(&self, key: K) -> Result<&V, GraphError>;

    /// Mutably borrows the value behind `key`.
    fn get_mut(&mut self, key: K) -> Result<&mut V, GraphError>;

    /// O(1). False for stale handles whose slot has been reused.
    fn contains(&self, key: K) -> bool;

    /// Number of live elements.
    fn len(&self) -> usize;

    /// True when no elements are live.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates `(handle, &value)` pairs in unspecified order.
    fn iter(&self) -> Self::Iter<'_>;
}

/// Slot-vector store: erased slots are left in place ("peppered" with holes)
/// and recycled through a free list under a bumped generation tag.
#[derive(Clone, Debug)]
pub struct PepperedStore<K: Key, V>(SlotMap<K, V>);

impl<K: Key, V> Default for PepperedStore<K, V> {
    fn default() -> Self {
        Self(SlotMap::with_key())
    }
}

impl<K: Key, V> StableStore<K, V> for PepperedStore<K, V> {
    type Iter<'a>
        = slotmap::basic::Iter<'a, K, V>
    where
        Self: 'a,
        V: 'a;

    fn insert(&mut self, value: V) -> K {
        self.0.insert(value)
    }

    fn erase(&mut self, key: K) -> Result<V, GraphError> {
        self.0.remove(key).ok_or(GraphError::InvalidHandle)
    }

    fn get(&self, key: K) -> Result<&V, GraphError> {
        self.0.get(key).ok_or(GraphError::InvalidHandle)
    }

    fn get_mut(&mut self, key: K) -> Result<&mut V, GraphError> {
        self.0.get_mut(key).ok_or(GraphError::InvalidHandle)
    }

    fn contains(&self, key: K) -> bool {
        self.0.contains_key(key)
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn iter(&self) -> Self::Iter<'_> {
        self.0.iter()
    }
}

/// Compact store: values live in a dense vector that is re-packed on erase,
/// with handle lookups going through an indirection table.
#[derive(Clone, Debug)]
pub struct CompactStore<K: Key, V>(DenseSlotMap<K, V>);

impl<K: Key, V> Default for CompactStore<K, V> {
    fn default() -> Self {
        Self(DenseSlotMap::with_key())
    }
}

impl<K: Key, V> StableStore<K, V> for CompactStore<K, V> {
    type Iter<'a>
        = slotmap::dense::Iter<'a, K, V>
    where
        Self: 'a,
        V: 'a;

    fn insert(&mut self, value: V) -> K {
        self.0.insert(value)
    }

    fn erase(&mut self, key: K) -> Result<V, GraphError> {
        self.0.remove(key).ok_or(GraphError::InvalidHandle)
    }

    fn get(&self, key: K) -> Result<&V, GraphError> {
        self.0.get(key).ok_or(GraphError::InvalidHandle)
    }

    fn get_mut(&mut self, key: K) -> Result<&mut V, GraphError> {
        self.0.get_mut(key).ok_or(GraphError::InvalidHandle)
    }

    fn contains(&self, key: K) -> bool {
        self.0.contains_key(key)
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn iter(&self) -> Self::Iter<'_> {
        self.0.iter()
    }
}
