use std::collections::BTreeMap;

use super::item::{Item, ItemCategory, ItemId, ItemRegistry};

/// Item stacks owned by one character. Quantities are always positive; an
/// entry that reaches zero is deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Inventory {
    entries: BTreeMap<ItemId, u32>,
}

impl Inventory {
    pub(crate) fn add(&mut self, id: ItemId, quantity: u32) {
        if quantity == 0 {
            return;
        }
        let entry = self.entries.entry(id).or_insert(0);
        *entry = entry.saturating_add(quantity);
    }

    /// Removes up to `quantity`; removing more than held deletes the entry.
    /// Returns false when the item is not held at all.
    pub(crate) fn remove(&mut self, id: ItemId, quantity: u32) -> bool {
        let Some(held) = self.entries.get_mut(&id) else {
            return false;
        };
        if quantity >= *held {
            self.entries.remove(&id);
        } else {
            *held -= quantity;
        }
        true
    }

    #[cfg(test)]
    pub(crate) fn quantity(&self, id: ItemId) -> u32 {
        self.entries.get(&id).copied().unwrap_or(0)
    }

    pub(crate) fn contains(&self, id: ItemId) -> bool {
        self.entries.contains_key(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (ItemId, u32)> + '_ {
        self.entries.iter().map(|(id, quantity)| (*id, *quantity))
    }

    /// Held items resolved against the catalog, ordered by id. Ids the
    /// catalog does not know are skipped.
    pub(crate) fn item_objects<'a>(&self, registry: &'a ItemRegistry) -> Vec<(&'a Item, u32)> {
        self.iter()
            .filter_map(|(id, quantity)| registry.get(id).map(|item| (item, quantity)))
            .collect()
    }

    pub(crate) fn items_in_category(
        &self,
        registry: &ItemRegistry,
        category: ItemCategory,
    ) -> Vec<ItemId> {
        self.item_objects(registry)
            .into_iter()
            .filter(|(item, _)| item.category == category)
            .map(|(item, _)| item.id)
            .collect()
    }

    pub(crate) fn total_count(&self) -> u32 {
        self.entries.values().sum()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
