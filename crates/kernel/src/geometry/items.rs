use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Stable identity of an item within an [`ItemSet`].
    pub struct ItemKey;
}

/// Ordered, growable collection of items with removal by identity.
///
/// Patch contours, extrema and barbs live in these. Keys stay valid across
/// removals of other items; iteration follows insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSet<T> {
    items: SlotMap<ItemKey, T>,
    order: Vec<ItemKey>,
}

impl<T> Default for ItemSet<T> {
    fn default() -> Self {
        Self {
            items: SlotMap::with_key(),
            order: Vec::new(),
        }
    }
}

impl<T> ItemSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: T) -> ItemKey {
        let key = self.items.insert(item);
        self.order.push(key);
        key
    }

    pub fn remove(&mut self, key: ItemKey) -> Option<T> {
        let item = self.items.remove(key)?;
        self.order.retain(|k| *k != key);
        Some(item)
    }

    pub fn get(&self, key: ItemKey) -> Option<&T> {
        self.items.get(key)
    }

    pub fn get_mut(&mut self, key: ItemKey) -> Option<&mut T> {
        self.items.get_mut(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.order.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.order.iter().filter_map(|k| self.items.get(*k))
    }

    pub fn iter_keyed(&self) -> impl Iterator<Item = (ItemKey, &T)> + '_ {
        self.order
            .iter()
            .filter_map(|k| self.items.get(*k).map(|item| (*k, item)))
    }

    /// Mutable access in insertion order.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut T)) {
        for key in &self.order {
            if let Some(item) = self.items.get_mut(*key) {
                f(item);
            }
        }
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        let items = &mut self.items;
        self.order.retain(|k| match items.get(*k) {
            Some(item) if keep(item) => true,
            _ => {
                items.remove(*k);
                false
            }
        });
    }

    /// First key, in insertion order, whose item satisfies `pred`.
    pub fn find(&self, mut pred: impl FnMut(&T) -> bool) -> Option<ItemKey> {
        self.iter_keyed().find(|(_, item)| pred(item)).map(|(k, _)| k)
    }
}

impl<T> FromIterator<T> for ItemSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = ItemSet::new();
        for item in iter {
            set.push(item);
        }
        set
    }
}
