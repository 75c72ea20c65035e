use deswonder_engine::{SceneDebugCommand, SceneDebugCommandResult};
use tracing::info;

use super::character::CharacterStats;
use super::item::{ItemCategory, ItemId};
use super::party::{profile_for_sprite, Party, RecruitOutcome, RECRUIT_PROFILES};

pub(crate) const HITBOX_COLOR: [u8; 4] = [255, 0, 0, 255];
pub(crate) const ZONE_COLOR: [u8; 4] = [0, 255, 0, 255];
pub(crate) const REACH_COLOR: [u8; 4] = [255, 255, 0, 255];
const LEGENDARY_ITEMS: [u32; 2] = [9, 10];
const MAX_STAT: i32 = 99;
const MAX_STAT_HP: i32 = 999;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DebugFlags {
    pub(crate) show_hitboxes: bool,
    pub(crate) show_zones: bool,
    pub(crate) noclip: bool,
    pub(crate) god_mode: bool,
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

fn toggle(flag: &mut bool, label: &str) -> SceneDebugCommandResult {
    *flag = !*flag;
    SceneDebugCommandResult::Success(format!("{label}: {}", on_off(*flag)))
}

/// Applies a console command to the party and the debug flags. Commands that
/// need the map or the leader's body return `None` for the scene to handle.
pub(crate) fn execute(
    command: &SceneDebugCommand,
    party: &mut Party,
    flags: &mut DebugFlags,
) -> Option<SceneDebugCommandResult> {
    let result = match command {
        SceneDebugCommand::Recruit { name } => match party.recruit(name) {
            RecruitOutcome::Joined { index } => {
                SceneDebugCommandResult::Success(format!("{name} joined at slot {index}"))
            }
            RecruitOutcome::AlreadyInParty => {
                SceneDebugCommandResult::Error(format!("{name} is already in the party"))
            }
            RecruitOutcome::UnknownName => {
                let known: Vec<&str> = RECRUIT_PROFILES.iter().map(|profile| profile.key).collect();
                SceneDebugCommandResult::Error(format!(
                    "unknown recruit '{name}' (known: {})",
                    known.join(", ")
                ))
            }
        },
        SceneDebugCommand::DismissLast => match party.remove_last() {
            Some(member) => SceneDebugCommandResult::Success(format!("{} left", member.name())),
            None => SceneDebugCommandResult::Error("only the leader remains".to_string()),
        },
        SceneDebugCommand::HealAll => {
            party.heal_all();
            SceneDebugCommandResult::Success("party healed".to_string())
        }
        SceneDebugCommand::DamageAll { amount } => {
            party.damage_all(*amount);
            SceneDebugCommandResult::Success(format!("party took {amount} damage"))
        }
        SceneDebugCommand::GiveWeapons => give_category(party, ItemCategory::Weapon),
        SceneDebugCommand::GiveArmors => give_category(party, ItemCategory::Armor),
        SceneDebugCommand::ClearInventory => match party.current_mut() {
            Some(character) => {
                character.inventory_mut().clear();
                SceneDebugCommandResult::Success(format!("{} inventory cleared", character.name()))
            }
            None => no_character(),
        },
        SceneDebugCommand::GiveLegendary => match party.current_mut() {
            Some(character) => {
                for id in LEGENDARY_ITEMS {
                    character.inventory_mut().add(ItemId(id), 1);
                }
                SceneDebugCommandResult::Success(format!(
                    "{} received legendary gear",
                    character.name()
                ))
            }
            None => no_character(),
        },
        SceneDebugCommand::UnequipAll => match party.current_mut() {
            Some(character) => {
                let count = character.unequip_all();
                SceneDebugCommandResult::Success(format!(
                    "{} unequipped {count} items",
                    character.name()
                ))
            }
            None => no_character(),
        },
        SceneDebugCommand::ToggleHitboxes => toggle(&mut flags.show_hitboxes, "hitboxes"),
        SceneDebugCommand::ToggleZones => toggle(&mut flags.show_zones, "zones"),
        SceneDebugCommand::ToggleNoclip => toggle(&mut flags.noclip, "noclip"),
        SceneDebugCommand::ToggleGodMode => {
            let result = toggle(&mut flags.god_mode, "god");
            apply_god_mode(party, *flags);
            result
        }
        SceneDebugCommand::MaxStats => {
            for member in party.members_mut() {
                let base = member.base_stats();
                member.set_base_stats(CharacterStats {
                    attack: MAX_STAT,
                    defense: MAX_STAT,
                    max_hp: MAX_STAT_HP,
                    hp: MAX_STAT_HP,
                    will: base.will,
                });
                member.heal_to_full();
            }
            SceneDebugCommandResult::Success("stats maxed".to_string())
        }
        SceneDebugCommand::ResetStats => {
            for member in party.members_mut() {
                let starting = member
                    .sprite_key()
                    .and_then(profile_for_sprite)
                    .map(|profile| profile.stats);
                if let Some(stats) = starting {
                    member.set_base_stats(stats);
                }
                member.heal_to_full();
            }
            SceneDebugCommandResult::Success("stats reset".to_string())
        }
        SceneDebugCommand::PartyInfo => SceneDebugCommandResult::Success(party_info(party)),
        SceneDebugCommand::ItemCounts => match party.current() {
            Some(_) => SceneDebugCommandResult::Success(item_counts(party)),
            None => no_character(),
        },
        SceneDebugCommand::TeleportToStart => return None,
    };
    info!(?command, "debug_command_applied");
    Some(result)
}

fn no_character() -> SceneDebugCommandResult {
    SceneDebugCommandResult::Error("no character selected".to_string())
}

fn give_category(party: &mut Party, category: ItemCategory) -> SceneDebugCommandResult {
    let Some(character) = party.current_mut() else {
        return no_character();
    };
    let ids: Vec<ItemId> = character
        .registry()
        .items_by_category(category)
        .map(|item| item.id)
        .collect();
    for id in &ids {
        character.inventory_mut().add(*id, 1);
    }
    SceneDebugCommandResult::Success(format!(
        "{} received {} {category:?} items",
        character.name(),
        ids.len()
    ))
}

/// Keeps every member at full HP while god mode is on.
pub(crate) fn apply_god_mode(party: &mut Party, flags: DebugFlags) {
    if !flags.god_mode {
        return;
    }
    for member in party.members_mut() {
        if member.current_hp() != member.max_hp() {
            member.heal_to_full();
        }
    }
}

/// One `NAME: HP x/y, ATK a, DEF d` line per member, using total stats.
pub(crate) fn party_info(party: &Party) -> String {
    party
        .members()
        .iter()
        .map(|member| {
            let total = member.total_stats();
            let knocked_out = if member.is_alive() { "" } else { " (KO)" };
            format!(
                "{}: HP {}/{}, ATK {}, DEF {}{knocked_out}",
                member.name(),
                member.current_hp(),
                member.max_hp(),
                total.attack,
                total.defense
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `name: qty` per held item of the selected character.
pub(crate) fn item_counts(party: &Party) -> String {
    let Some(character) = party.current() else {
        return String::new();
    };
    let items = character.inventory().item_objects(character.registry());
    if items.is_empty() {
        return "Inventario vacio".to_string();
    }
    items
        .iter()
        .map(|(item, quantity)| format!("{}: {quantity}", item.name))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::app::gameplay::item::ItemRegistry;

    fn party() -> Party {
        Party::new(Arc::new(ItemRegistry::with_default_catalog()))
    }

    fn run(command: SceneDebugCommand, party: &mut Party, flags: &mut DebugFlags) -> String {
        match execute(&command, party, flags) {
            Some(SceneDebugCommandResult::Success(message)) => message,
            other => panic!("expected success for {command:?}, got {other:?}"),
        }
    }

    #[test]
    fn give_commands_target_selected_character() {
        let mut party = party();
        let mut flags = DebugFlags::default();
        party.recruit("koral");
        party.select(1);
        run(SceneDebugCommand::GiveWeapons, &mut party, &mut flags);
        run(SceneDebugCommand::GiveLegendary, &mut party, &mut flags);

        let koral = party.get(1).expect("koral");
        assert_eq!(koral.inventory().quantity(ItemId(9)), 2);
        assert_eq!(koral.inventory().quantity(ItemId(10)), 1);
        assert!(party.leader().inventory().is_empty());
    }

    #[test]
    fn item_counts_lists_or_reports_empty() {
        let mut party = party();
        let mut flags = DebugFlags::default();
        assert_eq!(
            run(SceneDebugCommand::ItemCounts, &mut party, &mut flags),
            "Inventario vacio"
        );
        run(SceneDebugCommand::GiveArmors, &mut party, &mut flags);
        let counts = run(SceneDebugCommand::ItemCounts, &mut party, &mut flags);
        assert_eq!(counts.lines().count(), 6);
        assert!(counts.starts_with("Armadura berserker: 1"));
        run(SceneDebugCommand::ClearInventory, &mut party, &mut flags);
        assert!(party.leader().inventory().is_empty());
    }

    #[test]
    fn party_info_uses_total_stats() {
        let mut party = party();
        party.recruit("vel");
        assert_eq!(
            party_info(&party),
            "ELY: HP 100/100, ATK 4, DEF 7\nVEL: HP 90/90, ATK 3, DEF 6"
        );
    }

    #[test]
    fn max_then_reset_stats_restore_starting_values() {
        let mut party = party();
        let mut flags = DebugFlags::default();
        party.recruit("koral");
        run(SceneDebugCommand::MaxStats, &mut party, &mut flags);
        assert!(party
            .members()
            .iter()
            .all(|member| member.current_hp() == 999 && member.base_stats().attack == 99));

        party.damage_all(10);
        run(SceneDebugCommand::ResetStats, &mut party, &mut flags);
        assert_eq!(party.leader().base_stats().max_hp, 100);
        assert_eq!(party.leader().current_hp(), 100);
        assert_eq!(party.get(1).map(|m| m.current_hp()), Some(130));
    }

    #[test]
    fn god_mode_keeps_everyone_full() {
        let mut party = party();
        let mut flags = DebugFlags::default();
        party.recruit("vel");
        party.damage_all(50);
        assert_eq!(run(SceneDebugCommand::ToggleGodMode, &mut party, &mut flags), "god: on");
        assert!(party.members().iter().all(|m| m.current_hp() == m.max_hp()));
        party.damage_all(50);
        apply_god_mode(&mut party, flags);
        assert!(party.members().iter().all(|m| m.current_hp() == m.max_hp()));
    }

    #[test]
    fn recruit_errors_are_reported() {
        let mut party = party();
        let mut flags = DebugFlags::default();
        let result = execute(
            &SceneDebugCommand::Recruit {
                name: "zed".to_string(),
            },
            &mut party,
            &mut flags,
        );
        assert!(matches!(result, Some(SceneDebugCommandResult::Error(_))));
        let dismiss = execute(&SceneDebugCommand::DismissLast, &mut party, &mut flags);
        assert!(matches!(dismiss, Some(SceneDebugCommandResult::Error(_))));
    }

    #[test]
    fn teleport_is_left_to_the_scene() {
        let mut party = party();
        let mut flags = DebugFlags::default();
        assert!(execute(&SceneDebugCommand::TeleportToStart, &mut party, &mut flags).is_none());
    }

    #[test]
    fn toggles_flip_flags() {
        let mut party = party();
        let mut flags = DebugFlags::default();
        assert_eq!(run(SceneDebugCommand::ToggleHitboxes, &mut party, &mut flags), "hitboxes: on");
        assert_eq!(run(SceneDebugCommand::ToggleHitboxes, &mut party, &mut flags), "hitboxes: off");
        run(SceneDebugCommand::ToggleNoclip, &mut party, &mut flags);
        run(SceneDebugCommand::ToggleZones, &mut party, &mut flags);
        assert!(flags.noclip && flags.show_zones);
    }
}
