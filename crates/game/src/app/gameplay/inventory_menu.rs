use deswonder_engine::{InputAction, InputSnapshot, TextPanel};
use tracing::debug;

use super::character::{Character, HpColor};
use super::equipment::EquipmentSlot;
use super::item::{ItemCategory, ItemId};
use super::party::Party;

pub(crate) const SKILL_NAMES: [&str; 3] = ["BrokenSoul", "Flagger", "MechaSaber"];
const PANEL_X: i32 = 16;
const PANEL_Y: i32 = 16;
const PANEL_WIDTH: i32 = 288;
const EMPTY_SLOT: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MenuState {
    CharacterSelect,
    Equipment,
    Skills,
    InventorySelect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MenuSignal {
    Stay,
    Close,
}

/// Navigation over the party's equipment. The selected character is the
/// party's own selection, so debug commands act on whoever the menu shows.
#[derive(Debug, Clone)]
pub(crate) struct InventoryMenu {
    is_open: bool,
    state: MenuState,
    slot: EquipmentSlot,
    item_index: usize,
    skill_index: usize,
}

impl Default for InventoryMenu {
    fn default() -> Self {
        Self {
            is_open: false,
            state: MenuState::CharacterSelect,
            slot: EquipmentSlot::Weapon,
            item_index: 0,
            skill_index: 0,
        }
    }
}

impl InventoryMenu {
    pub(crate) fn is_open(&self) -> bool {
        self.is_open
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> MenuState {
        self.state
    }

    pub(crate) fn slot(&self) -> EquipmentSlot {
        self.slot
    }

    #[cfg(test)]
    pub(crate) fn item_index(&self) -> usize {
        self.item_index
    }

    #[cfg(test)]
    pub(crate) fn skill_index(&self) -> usize {
        self.skill_index
    }

    pub(crate) fn open(&mut self, party: &mut Party) {
        self.is_open = true;
        self.state = MenuState::CharacterSelect;
        party.select(party.selected_index());
        self.clamp_item_index(party);
        self.skill_index = self.skill_index.min(SKILL_NAMES.len() - 1);
        debug!(character = party.selected_index(), "inventory_menu_opened");
    }

    pub(crate) fn close(&mut self) {
        self.is_open = false;
        self.state = MenuState::CharacterSelect;
    }

    /// Items of the current character that fit the selected slot, by id.
    pub(crate) fn available_items_for_slot(&self, party: &Party) -> Vec<ItemId> {
        let Some(character) = party.current() else {
            return Vec::new();
        };
        character
            .inventory()
            .items_in_category(character.registry(), self.slot.category())
    }

    /// `[weapon, armor 1, armor 2]` of the current character.
    pub(crate) fn equipment_items(&self, party: &Party) -> [Option<ItemId>; 3] {
        let Some(character) = party.current() else {
            return [None; 3];
        };
        EquipmentSlot::ALL.map(|slot| character.equipment().slot(slot))
    }

    pub(crate) fn equip_selected(&mut self, party: &mut Party) -> bool {
        let candidates = self.available_items_for_slot(party);
        let Some(id) = candidates.get(self.item_index).copied() else {
            return false;
        };
        let slot = self.slot;
        let equipped = party
            .current_mut()
            .is_some_and(|character| character.equip_from_inventory(slot, id));
        self.clamp_item_index(party);
        equipped
    }

    pub(crate) fn unequip_selected(&mut self, party: &mut Party) -> bool {
        let slot = self.slot;
        party
            .current_mut()
            .is_some_and(|character| character.unequip_to_inventory(slot))
    }

    /// Uses the lowest-id consumable the current character holds.
    pub(crate) fn use_first_consumable(&mut self, party: &mut Party) -> bool {
        let Some(character) = party.current_mut() else {
            return false;
        };
        let consumable = character
            .inventory()
            .items_in_category(character.registry(), ItemCategory::Consumable)
            .first()
            .copied();
        consumable.is_some_and(|id| character.use_consumable(id))
    }

    pub(crate) fn handle_input(
        &mut self,
        input: &InputSnapshot,
        party: &mut Party,
    ) -> MenuSignal {
        if !self.is_open {
            return MenuSignal::Close;
        }
        if input.was_pressed(InputAction::ToggleInventory) {
            self.close();
            return MenuSignal::Close;
        }
        let pressed = |action| input.was_pressed(action);

        match self.state {
            MenuState::CharacterSelect => {
                if pressed(InputAction::Cancel) {
                    self.close();
                    return MenuSignal::Close;
                }
                if pressed(InputAction::MoveLeft) {
                    party.select_prev();
                } else if pressed(InputAction::MoveRight) {
                    party.select_next();
                } else if pressed(InputAction::MoveDown) {
                    self.state = MenuState::Skills;
                    self.skill_index = 0;
                } else if pressed(InputAction::Confirm) {
                    self.state = MenuState::Equipment;
                    self.slot = EquipmentSlot::Weapon;
                } else if pressed(InputAction::Interact) {
                    self.use_first_consumable(party);
                }
            }
            MenuState::Equipment => {
                if pressed(InputAction::Cancel) {
                    self.state = MenuState::CharacterSelect;
                } else if pressed(InputAction::MoveUp) {
                    self.slot = self.slot.prev();
                } else if pressed(InputAction::MoveDown) {
                    self.slot = self.slot.next();
                } else if pressed(InputAction::Confirm) {
                    if !self.available_items_for_slot(party).is_empty() {
                        self.state = MenuState::InventorySelect;
                        self.item_index = 0;
                    }
                } else if pressed(InputAction::Interact) {
                    self.unequip_selected(party);
                }
            }
            MenuState::Skills => {
                if pressed(InputAction::Cancel) {
                    self.state = MenuState::CharacterSelect;
                } else if pressed(InputAction::MoveUp) {
                    if self.skill_index == 0 {
                        self.state = MenuState::CharacterSelect;
                    } else {
                        self.skill_index -= 1;
                    }
                } else if pressed(InputAction::MoveDown) {
                    self.skill_index = (self.skill_index + 1) % SKILL_NAMES.len();
                }
            }
            MenuState::InventorySelect => {
                let candidates = self.available_items_for_slot(party).len();
                if pressed(InputAction::Cancel) || candidates == 0 {
                    self.state = MenuState::Equipment;
                } else if pressed(InputAction::MoveUp) {
                    self.item_index = (self.item_index + candidates - 1) % candidates;
                } else if pressed(InputAction::MoveDown) {
                    self.item_index = (self.item_index + 1) % candidates;
                } else if pressed(InputAction::Confirm) {
                    self.equip_selected(party);
                    self.state = MenuState::Equipment;
                }
            }
        }
        MenuSignal::Stay
    }

    /// Read-only text view of the current character and the cursor.
    pub(crate) fn panel(&self, party: &Party) -> TextPanel {
        let mut lines = Vec::new();
        let mut highlighted_line = None;
        let Some(character) = party.current() else {
            return TextPanel {
                x: PANEL_X,
                y: PANEL_Y,
                width: PANEL_WIDTH,
                lines: vec!["(sin personajes)".to_string()],
                highlighted_line: None,
            };
        };

        if self.state == MenuState::CharacterSelect {
            highlighted_line = Some(lines.len());
        }
        lines.push(format!(
            "< {} >  {}/{}",
            character.name(),
            party.selected_index() + 1,
            party.len()
        ));
        lines.extend(stat_lines(character));

        for (slot, equipped) in EquipmentSlot::ALL.iter().zip(self.equipment_items(party)) {
            if self.state == MenuState::Equipment && *slot == self.slot {
                highlighted_line = Some(lines.len());
            }
            lines.push(format!("{}: {}", slot.label(), item_name(character, equipped)));
        }

        match self.state {
            MenuState::Skills => {
                lines.push("Habilidades:".to_string());
                for (index, skill) in SKILL_NAMES.iter().enumerate() {
                    if index == self.skill_index {
                        highlighted_line = Some(lines.len());
                    }
                    lines.push(format!("  {skill}"));
                }
            }
            MenuState::InventorySelect => {
                lines.push(format!("Equipar en {}:", self.slot.label()));
                for (index, id) in self.available_items_for_slot(party).iter().enumerate() {
                    if index == self.item_index {
                        highlighted_line = Some(lines.len());
                    }
                    lines.push(format!("  {}", item_name(character, Some(*id))));
                }
            }
            MenuState::CharacterSelect | MenuState::Equipment => {
                lines.push(format!("Objetos ({}):", character.inventory().total_count()));
                let items = character.inventory().item_objects(character.registry());
                if items.is_empty() {
                    lines.push("  (vacio)".to_string());
                }
                for (item, quantity) in items {
                    lines.push(format!("  {} x{quantity}", item.name));
                }
            }
        }

        TextPanel {
            x: PANEL_X,
            y: PANEL_Y,
            width: PANEL_WIDTH,
            lines,
            highlighted_line,
        }
    }

    fn clamp_item_index(&mut self, party: &Party) {
        let candidates = self.available_items_for_slot(party).len();
        self.item_index = self.item_index.min(candidates.saturating_sub(1));
    }
}

fn stat_lines(character: &Character) -> [String; 2] {
    let total = character.total_stats();
    let color = match character.hp_color() {
        HpColor::Green => "ok",
        HpColor::Yellow => "!",
        HpColor::Red => "!!",
    };
    [
        format!(
            "HP {}/{} {color}",
            character.current_hp(),
            character.max_hp()
        ),
        format!(
            "ATK {}  DEF {}  VOL {}",
            total.attack, total.defense, total.will
        ),
    ]
}

fn item_name(character: &Character, id: Option<ItemId>) -> String {
    id.and_then(|id| character.registry().get(id))
        .map(|item| item.name.clone())
        .unwrap_or_else(|| EMPTY_SLOT.to_string())
}
