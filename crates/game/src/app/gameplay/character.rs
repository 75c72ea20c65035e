use std::sync::Arc;

use tracing::debug;

use super::equipment::{Equipment, EquipmentSlot};
use super::inventory::Inventory;
use super::item::{ItemCategory, ItemId, ItemRegistry, StatKey, StatModifiers};

const GREEN_RATIO: f64 = 0.6;
const YELLOW_RATIO: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CharacterStats {
    pub(crate) attack: i32,
    pub(crate) defense: i32,
    pub(crate) max_hp: i32,
    pub(crate) hp: i32,
    pub(crate) will: i32,
}

impl CharacterStats {
    pub(crate) const fn new(attack: i32, defense: i32, max_hp: i32, will: i32) -> Self {
        Self {
            attack,
            defense,
            max_hp,
            hp: max_hp,
            will,
        }
    }

    fn add_modifiers(&mut self, modifiers: &StatModifiers) {
        for (key, value) in modifiers.iter() {
            match key {
                StatKey::Attack => self.attack = self.attack.saturating_add(value),
                StatKey::Defense => self.defense = self.defense.saturating_add(value),
                StatKey::MaxHp => self.max_hp = self.max_hp.saturating_add(value),
                StatKey::Hp => self.hp = self.hp.saturating_add(value),
                StatKey::Will => self.will = self.will.saturating_add(value),
                // No mana pool; will-restoring items only matter as consumables.
                StatKey::Mp => {}
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HpColor {
    Green,
    Yellow,
    Red,
}

impl HpColor {
    pub(crate) fn from_ratio(ratio: f64) -> Self {
        if ratio > GREEN_RATIO {
            Self::Green
        } else if ratio > YELLOW_RATIO {
            Self::Yellow
        } else {
            Self::Red
        }
    }
}

/// A party member. `current_hp` stays within `[0, total max_hp]` and
/// `hp_color` is recomputed after every change that can move either.
#[derive(Debug, Clone)]
pub(crate) struct Character {
    name: String,
    sprite_key: Option<String>,
    base_stats: CharacterStats,
    current_hp: i32,
    hp_color: HpColor,
    inventory: Inventory,
    equipment: Equipment,
    registry: Arc<ItemRegistry>,
}

impl Character {
    pub(crate) fn new(
        name: impl Into<String>,
        sprite_key: Option<String>,
        base_stats: CharacterStats,
        registry: Arc<ItemRegistry>,
    ) -> Self {
        let mut character = Self {
            name: name.into(),
            sprite_key,
            base_stats,
            current_hp: base_stats.max_hp,
            hp_color: HpColor::Green,
            inventory: Inventory::default(),
            equipment: Equipment::default(),
            registry,
        };
        character.set_hp(base_stats.max_hp);
        character
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn sprite_key(&self) -> Option<&str> {
        self.sprite_key.as_deref()
    }

    pub(crate) fn base_stats(&self) -> CharacterStats {
        self.base_stats
    }

    pub(crate) fn current_hp(&self) -> i32 {
        self.current_hp
    }

    pub(crate) fn hp_color(&self) -> HpColor {
        self.hp_color
    }

    pub(crate) fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub(crate) fn inventory_mut(&mut self) -> &mut Inventory {
        &mut self.inventory
    }

    pub(crate) fn equipment(&self) -> &Equipment {
        &self.equipment
    }

    pub(crate) fn registry(&self) -> &ItemRegistry {
        &self.registry
    }

    /// Base stats plus the modifiers of every equipped item.
    pub(crate) fn total_stats(&self) -> CharacterStats {
        let mut total = self.base_stats;
        for id in self.equipment.equipped_ids() {
            if let Some(item) = self.registry.get(id) {
                total.add_modifiers(&item.modifiers);
            }
        }
        total
    }

    pub(crate) fn max_hp(&self) -> i32 {
        self.total_stats().max_hp.max(0)
    }

    pub(crate) fn hp_ratio(&self) -> f64 {
        let max_hp = self.max_hp();
        if max_hp == 0 {
            return 0.0;
        }
        f64::from(self.current_hp) / f64::from(max_hp)
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.current_hp > 0
    }

    pub(crate) fn set_hp(&mut self, hp: i32) {
        self.current_hp = hp.clamp(0, self.max_hp());
        self.hp_color = HpColor::from_ratio(self.hp_ratio());
    }

    pub(crate) fn update_hp(&mut self, delta: i32) {
        self.set_hp(self.current_hp.saturating_add(delta));
    }

    pub(crate) fn heal(&mut self, amount: i32) {
        self.update_hp(amount.max(0));
    }

    pub(crate) fn take_damage(&mut self, amount: i32) {
        self.update_hp(amount.max(0).saturating_neg());
    }

    pub(crate) fn heal_to_full(&mut self) {
        self.set_hp(self.max_hp());
    }

    pub(crate) fn set_base_stats(&mut self, stats: CharacterStats) {
        self.base_stats = stats;
        self.set_hp(self.current_hp);
    }

    /// Moves `id` from the inventory into `slot`, returning any previous
    /// occupant to the inventory. Nothing changes when the item is not held,
    /// does not fit the slot, or already occupies it.
    pub(crate) fn equip_from_inventory(&mut self, slot: EquipmentSlot, id: ItemId) -> bool {
        if !self.inventory.contains(id) || self.equipment.slot(slot) == Some(id) {
            return false;
        }
        let Some(item) = self.registry.get(id) else {
            return false;
        };
        let Some(displaced) = self.equipment.replace_slot(slot, item) else {
            debug!(character = %self.name, item = %id, ?slot, "equip_rejected");
            return false;
        };
        if let Some(displaced) = displaced {
            self.inventory.add(displaced, 1);
        }
        self.inventory.remove(id, 1);
        self.set_hp(self.current_hp);
        debug!(character = %self.name, item = %id, ?slot, ?displaced, "item_equipped");
        true
    }

    pub(crate) fn unequip_to_inventory(&mut self, slot: EquipmentSlot) -> bool {
        let Some(id) = self.equipment.unequip_slot(slot) else {
            return false;
        };
        self.inventory.add(id, 1);
        self.set_hp(self.current_hp);
        debug!(character = %self.name, item = %id, ?slot, "item_unequipped");
        true
    }

    /// Adds `id` to the inventory and equips it in the first slot that fits.
    pub(crate) fn add_and_equip(&mut self, id: ItemId) -> bool {
        self.inventory.add(id, 1);
        let Some(item) = self.registry.get(id) else {
            return false;
        };
        let equipped = self.equipment.equip(item);
        if equipped {
            self.inventory.remove(id, 1);
            self.set_hp(self.current_hp);
        }
        equipped
    }

    /// Returns every equipped item to the inventory.
    pub(crate) fn unequip_all(&mut self) -> usize {
        let removed = self.equipment.clear();
        for id in &removed {
            self.inventory.add(*id, 1);
        }
        self.set_hp(self.current_hp);
        removed.len()
    }

    /// Consumes one consumable. Its `hp` modifier heals; other modifiers have
    /// no runtime effect.
    pub(crate) fn use_consumable(&mut self, id: ItemId) -> bool {
        let Some(item) = self.registry.get(id) else {
            return false;
        };
        if item.category != ItemCategory::Consumable || !self.inventory.contains(id) {
            return false;
        }
        let heal = item.modifiers.get(StatKey::Hp);
        self.inventory.remove(id, 1);
        self.heal(heal);
        true
    }
}
