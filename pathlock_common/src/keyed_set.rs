use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// An element that can be stored in a [`KeyedSet`].
///
/// The key decides identity inside the set: two elements with the same key
/// are duplicates even if they differ in other fields.
pub trait Keyed {
    type Key: Hash + Eq;

    fn key(&self) -> Self::Key;
}

/// A deduplicating collection that keeps insertion order.
///
/// The first element inserted for a key wins; later inserts with the same key
/// are ignored and reported as such.
///
/// # Example
///
/// ```rust
/// use pathlock_common::{Keyed, KeyedSet};
///
/// #[derive(Debug)]
/// struct Entry(&'static str, u8);
///
/// impl Keyed for Entry {
///     type Key = &'static str;
///     fn key(&self) -> Self::Key {
///         self.0
///     }
/// }
///
/// let mut set = KeyedSet::new();
/// assert!(set.insert(Entry("a", 1)));
/// assert!(!set.insert(Entry("a", 2)));
/// assert_eq!(set.len(), 1);
/// assert_eq!(set.iter().next().unwrap().1, 1);
/// ```
pub struct KeyedSet<T: Keyed> {
    index: HashMap<T::Key, usize>,
    items: Vec<T>,
}

impl<T: Keyed> KeyedSet<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            index: HashMap::with_capacity(capacity),
            items: Vec::with_capacity(capacity),
        }
    }

    /// Insert `item`, returning `true` if its key was not already present.
    pub fn insert(&mut self, item: T) -> bool {
        let key = item.key();
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.items.len());
        self.items.push(item);
        true
    }

    /// Insert every item, returning `true` if at least one was new.
    pub fn insert_all<I>(&mut self, items: I) -> bool
    where
        I: IntoIterator<Item = T>,
    {
        items
            .into_iter()
            .fold(false, |changed, item| self.insert(item) || changed)
    }

    pub fn contains_key(&self, key: &T::Key) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.index.get(key).map(|&i| &self.items[i])
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    /// Render the set as `[a b c]`, formatting each element with `f`.
    ///
    /// Rendered elements are sorted so the output is stable regardless of
    /// insertion order.
    pub fn render_with<F>(&self, f: F) -> String
    where
        F: Fn(&T) -> String,
    {
        let mut rendered: Vec<String> = self.items.iter().map(f).collect();
        rendered.sort();
        format!("[{}]", rendered.join(" "))
    }
}

impl<T: Keyed> Default for KeyedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for KeyedSet<T>
where
    T: Keyed + Clone,
    T::Key: Clone,
{
    fn clone(&self) -> Self {
        Self {
            index: self.index.clone(),
            items: self.items.clone(),
        }
    }
}

impl<T: Keyed + fmt::Debug> fmt::Debug for KeyedSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.items.iter()).finish()
    }
}

impl<T: Keyed> Extend<T> for KeyedSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.insert_all(iter);
    }
}

impl<T: Keyed> FromIterator<T> for KeyedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.insert_all(iter);
        set
    }
}

impl<'a, T: Keyed> IntoIterator for &'a KeyedSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Keyed> IntoIterator for KeyedSet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
