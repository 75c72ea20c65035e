use std::sync::Arc;

use tracing::info;

use super::character::{Character, CharacterStats};
use super::item::{ItemId, ItemRegistry};

/// Starting data for a character that can be in the party.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MemberProfile {
    pub(crate) key: &'static str,
    pub(crate) name: &'static str,
    pub(crate) sprite_key: &'static str,
    pub(crate) items: &'static [u32],
    pub(crate) stats: CharacterStats,
}

pub(crate) const LEADER_PROFILE: MemberProfile = MemberProfile {
    key: "ely",
    name: "ELY",
    sprite_key: "ely",
    items: &[1],
    stats: CharacterStats::new(4, 7, 100, 4),
};

pub(crate) const RECRUIT_PROFILES: [MemberProfile; 2] = [
    MemberProfile {
        key: "koral",
        name: "KORAL",
        sprite_key: "koral",
        items: &[5, 6],
        stats: CharacterStats::new(6, 4, 130, 2),
    },
    MemberProfile {
        key: "vel",
        name: "VEL",
        sprite_key: "vel",
        items: &[7, 8],
        stats: CharacterStats::new(2, 5, 90, 6),
    },
];

/// Profile whose sprite matches `sprite_key`, leader included.
pub(crate) fn profile_for_sprite(sprite_key: &str) -> Option<&'static MemberProfile> {
    std::iter::once(&LEADER_PROFILE)
        .chain(RECRUIT_PROFILES.iter())
        .find(|profile| profile.sprite_key == sprite_key)
}

fn recruit_profile(name: &str) -> Option<&'static MemberProfile> {
    RECRUIT_PROFILES
        .iter()
        .find(|profile| profile.key.eq_ignore_ascii_case(name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecruitOutcome {
    Joined { index: usize },
    UnknownName,
    AlreadyInParty,
}

/// Ordered roster. Index 0 is the leader and can never be removed.
#[derive(Debug, Clone)]
pub(crate) struct Party {
    members: Vec<Character>,
    selected: usize,
    registry: Arc<ItemRegistry>,
}

impl Party {
    pub(crate) fn new(registry: Arc<ItemRegistry>) -> Self {
        let leader = build_member(&LEADER_PROFILE, &registry);
        Self {
            members: vec![leader],
            selected: 0,
            registry,
        }
    }

    pub(crate) fn leader(&self) -> &Character {
        &self.members[0]
    }

    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }

    #[cfg(test)]
    pub(crate) fn get(&self, index: usize) -> Option<&Character> {
        self.members.get(index)
    }

    pub(crate) fn members(&self) -> &[Character] {
        &self.members
    }

    pub(crate) fn members_mut(&mut self) -> &mut [Character] {
        &mut self.members
    }

    pub(crate) fn followers(&self) -> &[Character] {
        &self.members[1..]
    }

    pub(crate) fn selected_index(&self) -> usize {
        self.selected
    }

    pub(crate) fn current(&self) -> Option<&Character> {
        self.members.get(self.selected)
    }

    pub(crate) fn current_mut(&mut self) -> Option<&mut Character> {
        self.members.get_mut(self.selected)
    }

    pub(crate) fn select(&mut self, index: usize) {
        self.selected = index.min(self.members.len() - 1);
    }

    pub(crate) fn select_next(&mut self) {
        self.selected = (self.selected + 1) % self.members.len();
    }

    pub(crate) fn select_prev(&mut self) {
        let len = self.members.len();
        self.selected = (self.selected + len - 1) % len;
    }

    pub(crate) fn recruit(&mut self, name: &str) -> RecruitOutcome {
        let Some(profile) = recruit_profile(name) else {
            return RecruitOutcome::UnknownName;
        };
        let already_present = self
            .members
            .iter()
            .any(|member| member.sprite_key() == Some(profile.sprite_key));
        if already_present {
            return RecruitOutcome::AlreadyInParty;
        }
        self.members.push(build_member(profile, &self.registry));
        let index = self.members.len() - 1;
        info!(member = profile.name, index, "party_member_added");
        RecruitOutcome::Joined { index }
    }

    /// Removes a follower. The leader and out-of-range indices give `None`.
    pub(crate) fn remove(&mut self, index: usize) -> Option<Character> {
        if index == 0 || index >= self.members.len() {
            return None;
        }
        let removed = self.members.remove(index);
        if self.selected >= self.members.len() {
            self.selected = self.members.len() - 1;
        } else if self.selected > index {
            self.selected -= 1;
        }
        info!(member = removed.name(), index, "party_member_removed");
        Some(removed)
    }

    pub(crate) fn remove_last(&mut self) -> Option<Character> {
        self.remove(self.members.len() - 1)
    }

    pub(crate) fn heal_all(&mut self) {
        for member in &mut self.members {
            member.heal_to_full();
        }
    }

    pub(crate) fn damage_all(&mut self, amount: i32) {
        for member in &mut self.members {
            member.take_damage(amount);
        }
    }
}

fn build_member(profile: &MemberProfile, registry: &Arc<ItemRegistry>) -> Character {
    let mut character = Character::new(
        profile.name,
        Some(profile.sprite_key.to_string()),
        profile.stats,
        Arc::clone(registry),
    );
    for id in profile.items {
        character.add_and_equip(ItemId(*id));
    }
    character
}
