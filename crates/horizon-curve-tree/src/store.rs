//! Sparse item storage keyed by [`TreeItemId`].
//!
//! Removal leaves a vacant slot behind so the slots of the remaining items
//! stay put. [`ItemStore::compact`] drops the vacant slots and rebuilds the
//! id-to-slot index.

use std::collections::HashMap;

use crate::id::TreeItemId;
use crate::item::TreeItem;

#[derive(Debug, Default)]
pub(crate) struct ItemStore {
    slots: Vec<Option<TreeItem>>,
    index: HashMap<TreeItemId, usize>,
}

impl ItemStore {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    pub(crate) fn insert(&mut self, item: TreeItem) {
        let id = item.id();
        debug_assert!(!self.index.contains_key(&id), "tree item {id} inserted twice");
        self.index.insert(id, self.slots.len());
        self.slots.push(Some(item));
    }

    pub(crate) fn get(&self, id: TreeItemId) -> Option<&TreeItem> {
        let slot = *self.index.get(&id)?;
        self.slots[slot].as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: TreeItemId) -> Option<&mut TreeItem> {
        let slot = *self.index.get(&id)?;
        self.slots[slot].as_mut()
    }

    pub(crate) fn contains(&self, id: TreeItemId) -> bool {
        self.index.contains_key(&id)
    }

    pub(crate) fn remove(&mut self, id: TreeItemId) -> Option<TreeItem> {
        let slot = self.index.remove(&id)?;
        self.slots[slot].take()
    }

    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    pub(crate) fn vacant_slots(&self) -> usize {
        self.slots.len() - self.index.len()
    }

    /// Items in insertion order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &TreeItem> {
        self.slots.iter().flatten()
    }

    pub(crate) fn compact(&mut self) {
        if self.vacant_slots() == 0 {
            return;
        }
        self.slots.retain(Option::is_some);
        self.slots.shrink_to_fit();
        self.index = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(slot, item)| item.as_ref().map(|item| (item.id(), slot)))
            .collect();
    }
}
