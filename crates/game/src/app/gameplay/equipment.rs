use super::item::{Item, ItemCategory, ItemId};

pub(crate) const MAX_ARMORS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum EquipmentSlot {
    Weapon,
    Armor1,
    Armor2,
}

impl EquipmentSlot {
    pub(crate) const ALL: [EquipmentSlot; 3] = [Self::Weapon, Self::Armor1, Self::Armor2];

    pub(crate) fn category(self) -> ItemCategory {
        match self {
            Self::Weapon => ItemCategory::Weapon,
            Self::Armor1 | Self::Armor2 => ItemCategory::Armor,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Weapon => 0,
            Self::Armor1 => 1,
            Self::Armor2 => 2,
        }
    }

    pub(crate) fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub(crate) fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Weapon => "Arma",
            Self::Armor1 => "Armadura 1",
            Self::Armor2 => "Armadura 2",
        }
    }

    fn armor_index(self) -> Option<usize> {
        match self {
            Self::Weapon => None,
            Self::Armor1 => Some(0),
            Self::Armor2 => Some(1),
        }
    }
}

/// One weapon and up to two armors. Equipment never touches the inventory;
/// returning displaced items is the caller's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Equipment {
    weapon: Option<ItemId>,
    armors: Vec<ItemId>,
}

impl Equipment {
    #[cfg(test)]
    pub(crate) fn weapon(&self) -> Option<ItemId> {
        self.weapon
    }

    #[cfg(test)]
    pub(crate) fn armors(&self) -> &[ItemId] {
        &self.armors
    }

    /// A weapon replaces the current one. A third armor or a consumable is
    /// rejected without changes.
    pub(crate) fn equip(&mut self, item: &Item) -> bool {
        match item.category {
            ItemCategory::Weapon => {
                self.weapon = Some(item.id);
                true
            }
            ItemCategory::Armor if self.armors.len() < MAX_ARMORS => {
                self.armors.push(item.id);
                true
            }
            ItemCategory::Armor | ItemCategory::Consumable => false,
        }
    }

    /// Puts `item` into `slot`, returning the previous occupant. `None` means
    /// the item does not fit the slot and nothing changed.
    pub(crate) fn replace_slot(
        &mut self,
        slot: EquipmentSlot,
        item: &Item,
    ) -> Option<Option<ItemId>> {
        if item.category != slot.category() {
            return None;
        }
        match slot.armor_index() {
            None => Some(self.weapon.replace(item.id)),
            Some(index) if index < self.armors.len() => Some(Some(std::mem::replace(
                &mut self.armors[index],
                item.id,
            ))),
            Some(_) if self.armors.len() < MAX_ARMORS => {
                self.armors.push(item.id);
                Some(None)
            }
            Some(_) => None,
        }
    }

    pub(crate) fn slot(&self, slot: EquipmentSlot) -> Option<ItemId> {
        match slot.armor_index() {
            None => self.weapon,
            Some(index) => self.armors.get(index).copied(),
        }
    }

    pub(crate) fn unequip_weapon(&mut self) -> Option<ItemId> {
        self.weapon.take()
    }

    pub(crate) fn unequip_slot(&mut self, slot: EquipmentSlot) -> Option<ItemId> {
        match slot.armor_index() {
            None => self.unequip_weapon(),
            Some(index) if index < self.armors.len() => Some(self.armors.remove(index)),
            Some(_) => None,
        }
    }

    pub(crate) fn equipped_ids(&self) -> Vec<ItemId> {
        self.weapon.iter().chain(self.armors.iter()).copied().collect()
    }

    /// Empties every slot and returns what was equipped.
    pub(crate) fn clear(&mut self) -> Vec<ItemId> {
        let removed = self.equipped_ids();
        self.weapon = None;
        self.armors.clear();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::gameplay::item::ItemRegistry;

    fn item(registry: &ItemRegistry, id: u32) -> &Item {
        registry.get(ItemId(id)).expect("catalog item")
    }

    #[test]
    fn third_armor_is_rejected_without_mutation() {
        let registry = ItemRegistry::with_default_catalog();
        let mut equipment = Equipment::default();
        assert!(equipment.equip(item(&registry, 2)));
        assert!(equipment.equip(item(&registry, 3)));
        assert!(!equipment.equip(item(&registry, 4)));
        assert_eq!(equipment.armors(), &[ItemId(2), ItemId(3)]);
    }

    #[test]
    fn weapon_equip_replaces_and_consumables_never_fit() {
        let registry = ItemRegistry::with_default_catalog();
        let mut equipment = Equipment::default();
        assert!(equipment.equip(item(&registry, 1)));
        assert!(equipment.equip(item(&registry, 7)));
        assert_eq!(equipment.weapon(), Some(ItemId(7)));
        assert!(!equipment.equip(item(&registry, 11)));
        assert_eq!(equipment.equipped_ids(), vec![ItemId(7)]);
    }

    #[test]
    fn replace_slot_keeps_armor_position_and_reports_occupant() {
        let registry = ItemRegistry::with_default_catalog();
        let mut equipment = Equipment::default();
        equipment.equip(item(&registry, 2));
        equipment.equip(item(&registry, 3));

        let displaced = equipment.replace_slot(EquipmentSlot::Armor1, item(&registry, 10));
        assert_eq!(displaced, Some(Some(ItemId(2))));
        assert_eq!(equipment.armors(), &[ItemId(10), ItemId(3)]);

        assert_eq!(
            equipment.replace_slot(EquipmentSlot::Weapon, item(&registry, 6)),
            None
        );
        assert_eq!(
            equipment.replace_slot(EquipmentSlot::Weapon, item(&registry, 9)),
            Some(None)
        );
    }

    #[test]
    fn replace_slot_fills_free_armor_slots_then_replaces() {
        let registry = ItemRegistry::with_default_catalog();
        let mut equipment = Equipment::default();
        assert_eq!(
            equipment.replace_slot(EquipmentSlot::Armor1, item(&registry, 6)),
            Some(None)
        );
        assert_eq!(
            equipment.replace_slot(EquipmentSlot::Armor2, item(&registry, 8)),
            Some(None)
        );
        assert_eq!(
            equipment.replace_slot(EquipmentSlot::Armor2, item(&registry, 4)),
            Some(Some(ItemId(8)))
        );
        assert_eq!(equipment.armors(), &[ItemId(6), ItemId(4)]);
    }

    #[test]
    fn unequip_by_slot_and_clear() {
        let registry = ItemRegistry::with_default_catalog();
        let mut equipment = Equipment::default();
        equipment.equip(item(&registry, 1));
        equipment.equip(item(&registry, 6));
        equipment.equip(item(&registry, 8));

        assert_eq!(equipment.unequip_slot(EquipmentSlot::Armor2), Some(ItemId(8)));
        assert_eq!(equipment.unequip_slot(EquipmentSlot::Armor2), None);
        assert_eq!(equipment.clear(), vec![ItemId(1), ItemId(6)]);
        assert!(equipment.equipped_ids().is_empty());
    }

    #[test]
    fn slot_cycling_wraps() {
        assert_eq!(EquipmentSlot::Armor2.next(), EquipmentSlot::Weapon);
        assert_eq!(EquipmentSlot::Weapon.prev(), EquipmentSlot::Armor2);
    }
}
