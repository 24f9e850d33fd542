#![forbid(unsafe_code)]

//! Ordered collections keyed by element identity.
//!
//! [`IdentifiedVec`] keeps insertion order for display while offering
//! constant-time lookup by id. Ids are unique: inserting an element whose id
//! is already present is rejected, and deserialising a sequence with
//! duplicate ids fails.

use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// An element with a stable identity.
pub trait Identifiable {
    /// Identity type.
    type Id: Clone + Eq + Hash + fmt::Debug;

    /// The element's identity.
    fn id(&self) -> Self::Id;
}

/// Ordered, id-keyed collection.
#[derive(Clone)]
pub struct IdentifiedVec<T: Identifiable> {
    items: Vec<T>,
    index: HashMap<T::Id, usize>,
}

impl<T: Identifiable> Default for IdentifiedVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Identifiable> IdentifiedVec<T> {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build from elements, failing on the first duplicate id.
    pub fn try_from_vec(items: Vec<T>) -> Result<Self, T::Id> {
        let mut index = HashMap::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            let id = item.id();
            if index.insert(id.clone(), position).is_some() {
                return Err(id);
            }
        }
        Ok(Self { items, index })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Ids in order.
    pub fn ids(&self) -> impl DoubleEndedIterator<Item = T::Id> + '_ {
        self.items.iter().map(Identifiable::id)
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.index.contains_key(id)
    }

    pub fn index_of(&self, id: &T::Id) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.index.get(id).map(|&i| &self.items[i])
    }

    /// Mutable access by id.
    ///
    /// The element's id must not be changed through this reference.
    pub fn get_mut(&mut self, id: &T::Id) -> Option<&mut T> {
        self.index.get(id).map(|&i| &mut self.items[i])
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    /// Append `item`. Returns `false` (and drops nothing) if the id exists.
    pub fn push(&mut self, item: T) -> bool {
        self.insert(self.items.len(), item)
    }

    /// Insert `item` at `position` (clamped to the length).
    ///
    /// Returns `false` without modifying the collection if the id exists.
    pub fn insert(&mut self, position: usize, item: T) -> bool {
        let id = item.id();
        if self.index.contains_key(&id) {
            return false;
        }
        let position = position.min(self.items.len());
        self.items.insert(position, item);
        self.reindex_from(position);
        true
    }

    /// Replace the element with the same id in place, or append it.
    ///
    /// Returns the replaced element.
    pub fn upsert(&mut self, item: T) -> Option<T> {
        match self.index.get(&item.id()) {
            Some(&i) => Some(std::mem::replace(&mut self.items[i], item)),
            None => {
                self.push(item);
                None
            }
        }
    }

    /// Remove by id, preserving the order of the remaining elements.
    pub fn remove(&mut self, id: &T::Id) -> Option<T> {
        let position = self.index.remove(id)?;
        let item = self.items.remove(position);
        self.reindex_from(position);
        Some(item)
    }

    /// Remove every element whose id is in `ids`.
    pub fn remove_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a T::Id>) -> usize
    where
        T::Id: 'a,
    {
        ids.into_iter().filter_map(|id| self.remove(id)).count()
    }

    /// Keep only elements matching `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.items.retain(|item| keep(item));
        self.reindex_from(0);
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    fn reindex_from(&mut self, start: usize) {
        if start == 0 {
            self.index.clear();
        }
        for (position, item) in self.items.iter().enumerate().skip(start) {
            self.index.insert(item.id(), position);
        }
    }
}

impl<T: Identifiable + PartialEq> PartialEq for IdentifiedVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Identifiable + Eq> Eq for IdentifiedVec<T> {}

impl<T: Identifiable + fmt::Debug> fmt::Debug for IdentifiedVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.items).finish()
    }
}

impl<'a, T: Identifiable> IntoIterator for &'a IdentifiedVec<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Identifiable> IntoIterator for IdentifiedVec<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Collects, silently keeping the first element for each id.
impl<T: Identifiable> FromIterator<T> for IdentifiedVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut collection = Self::new();
        for item in iter {
            collection.push(item);
        }
        collection
    }
}

impl<T: Identifiable + Serialize> Serialize for IdentifiedVec<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.items.len()))?;
        for item in &self.items {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

impl<'de, T: Identifiable + Deserialize<'de>> Deserialize<'de> for IdentifiedVec<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        Self::try_from_vec(items)
            .map_err(|id| de::Error::custom(format!("duplicate id in identified collection: {id:?}")))
    }
}
