//! Specialized collection types

pub use slotmap::{Key, SlotMap};

/// Slot map with stable handles that also remembers insertion order
///
/// Handles stay valid across any number of insertions (the backing storage
/// may grow, but values are addressed by generation-checked keys, never by
/// address). Removing a value frees its slot without shifting the others;
/// iteration always follows insertion order, which is what draw traversal
/// and light packing rely on.
#[derive(Debug, Clone)]
pub struct OrderedSlotMap<K: Key, V> {
    items: SlotMap<K, V>,
    order: Vec<K>,
}

impl<K: Key, V> OrderedSlotMap<K, V> {
    /// Create an empty map
    pub fn new() -> Self {
        Self {
            items: SlotMap::with_key(),
            order: Vec::new(),
        }
    }

    /// Insert a value at the end of the iteration order
    pub fn insert(&mut self, value: V) -> K {
        let key = self.items.insert(value);
        self.order.push(key);
        key
    }

    /// Remove a value, keeping the relative order of everything else
    pub fn remove(&mut self, key: K) -> Option<V> {
        let value = self.items.remove(key)?;
        self.order.retain(|k| *k != key);
        Some(value)
    }

    /// Whether `key` refers to a live value
    pub fn contains_key(&self, key: K) -> bool {
        self.items.contains_key(key)
    }

    /// Get a value by key
    pub fn get(&self, key: K) -> Option<&V> {
        self.items.get(key)
    }

    /// Get a mutable value by key
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.items.get_mut(key)
    }

    /// Number of live values
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.order.iter().copied()
    }

    /// Key/value pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> + '_ {
        self.order.iter().filter_map(|&k| self.items.get(k).map(|v| (k, v)))
    }

    /// Drop every value
    pub fn clear(&mut self) {
        self.items.clear();
        self.order.clear();
    }
}

impl<K: Key, V> Default for OrderedSlotMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::DefaultKey;

    #[test]
    fn test_iteration_follows_insertion_order() {
        let mut map: OrderedSlotMap<DefaultKey, &str> = OrderedSlotMap::new();
        let a = map.insert("a");
        let _b = map.insert("b");
        let _c = map.insert("c");

        map.remove(a);
        map.insert("d");

        let values: Vec<_> = map.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_stale_key_after_removal() {
        let mut map: OrderedSlotMap<DefaultKey, u32> = OrderedSlotMap::new();
        let first = map.insert(1);
        map.remove(first);
        let second = map.insert(2);

        // The slot may be reused, but the old key must not resolve to the new value
        assert!(!map.contains_key(first));
        assert_eq!(map.get(second), Some(&2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_keys_survive_growth() {
        let mut map: OrderedSlotMap<DefaultKey, usize> = OrderedSlotMap::new();
        let first = map.insert(0);
        for i in 1..1000 {
            map.insert(i);
        }
        assert_eq!(map.get(first), Some(&0));
    }
}
