use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub(crate) struct ItemId(pub(crate) u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ItemCategory {
    Weapon,
    Armor,
    Consumable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum StatKey {
    Attack,
    Defense,
    MaxHp,
    Hp,
    Will,
    Mp,
}

/// Additive per-key stat changes carried by an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub(crate) struct StatModifiers(BTreeMap<StatKey, i32>);

impl StatModifiers {
    pub(crate) fn with(mut self, key: StatKey, value: i32) -> Self {
        self.0.insert(key, value);
        self
    }

    pub(crate) fn get(&self, key: StatKey) -> i32 {
        self.0.get(&key).copied().unwrap_or(0)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (StatKey, i32)> + '_ {
        self.0.iter().map(|(key, value)| (*key, *value))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct Item {
    pub(crate) id: ItemId,
    pub(crate) name: String,
    pub(crate) category: ItemCategory,
    #[serde(default, rename = "stats")]
    pub(crate) modifiers: StatModifiers,
}

impl Item {
    fn new(id: u32, name: &str, category: ItemCategory, modifiers: StatModifiers) -> Self {
        Self {
            id: ItemId(id),
            name: name.to_string(),
            category,
            modifiers,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum ItemCatalogError {
    #[error("duplicate item id {0}")]
    DuplicateId(ItemId),
    #[error("invalid item catalog at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    items: Vec<Item>,
}

/// Process-wide item catalog. Built once at startup and shared by `Arc`;
/// everything else refers to items by id.
#[derive(Debug, Clone, Default)]
pub(crate) struct ItemRegistry {
    items: BTreeMap<ItemId, Item>,
}

impl ItemRegistry {
    pub(crate) fn with_default_catalog() -> Self {
        use ItemCategory::{Armor, Consumable, Weapon};
        use StatKey::{Attack, Defense, Hp, Mp};

        let atk = |value| StatModifiers::default().with(Attack, value);
        let def = |value| StatModifiers::default().with(Defense, value);
        let catalog = [
            Item::new(1, "Espada maestra", Weapon, atk(0)),
            Item::new(2, "Armadura berserker", Armor, def(2)),
            Item::new(3, "Armadura Holografica", Armor, def(3)),
            Item::new(4, "Armadura N.E.O", Armor, def(1)),
            Item::new(5, "Baston magico", Weapon, atk(0)),
            Item::new(6, "Tunica", Armor, def(1)),
            Item::new(7, "Daga", Weapon, atk(1)),
            Item::new(8, "Capa", Armor, def(1)),
            Item::new(9, "Espada legendaria", Weapon, atk(5)),
            Item::new(10, "Armadura divina", Armor, def(4)),
            Item::new(
                11,
                "Galleta de chocolate",
                Consumable,
                StatModifiers::default().with(Hp, 50),
            ),
            Item::new(
                12,
                "Modulo de voluntad",
                Consumable,
                StatModifiers::default().with(Mp, 30),
            ),
        ];

        let mut registry = Self::default();
        for item in catalog {
            registry.items.insert(item.id, item);
        }
        registry
    }

    /// Parses `{"items": [{"id", "name", "category", "stats"}]}`.
    pub(crate) fn from_json_str(raw: &str) -> Result<Self, ItemCatalogError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let file: CatalogFile = serde_path_to_error::deserialize(&mut deserializer).map_err(
            |error| {
                let path = error.path().to_string();
                ItemCatalogError::Parse {
                    path,
                    source: error.into_inner(),
                }
            },
        )?;

        let mut registry = Self::default();
        for item in file.items {
            registry.register(item)?;
        }
        Ok(registry)
    }

    pub(crate) fn register(&mut self, item: Item) -> Result<(), ItemCatalogError> {
        if self.items.contains_key(&item.id) {
            return Err(ItemCatalogError::DuplicateId(item.id));
        }
        self.items.insert(item.id, item);
        Ok(())
    }

    pub(crate) fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub(crate) fn all_items(&self) -> impl Iterator<Item = &Item> + '_ {
        self.items.values()
    }

    pub(crate) fn items_by_category(
        &self,
        category: ItemCategory,
    ) -> impl Iterator<Item = &Item> + '_ {
        self.items
            .values()
            .filter(move |item| item.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_twelve_items_split_by_category() {
        let registry = ItemRegistry::with_default_catalog();
        assert_eq!(registry.all_items().count(), 12);
        let weapons: Vec<u32> = registry
            .items_by_category(ItemCategory::Weapon)
            .map(|item| item.id.0)
            .collect();
        assert_eq!(weapons, vec![1, 5, 7, 9]);
        assert_eq!(registry.items_by_category(ItemCategory::Armor).count(), 6);
        assert_eq!(registry.items_by_category(ItemCategory::Consumable).count(), 2);
    }

    #[test]
    fn modifiers_default_to_zero_for_missing_keys() {
        let registry = ItemRegistry::with_default_catalog();
        let legendary = registry.get(ItemId(9)).expect("legendary sword");
        assert_eq!(legendary.name, "Espada legendaria");
        assert_eq!(legendary.modifiers.get(StatKey::Attack), 5);
        assert_eq!(legendary.modifiers.get(StatKey::Defense), 0);
        assert!(registry.get(ItemId(99)).is_none());
    }

    #[test]
    fn catalog_parses_from_json() {
        let registry = ItemRegistry::from_json_str(
            r#"{"items": [
                {"id": 1, "name": "Stick", "category": "weapon", "stats": {"attack": 2}},
                {"id": 2, "name": "Bread", "category": "consumable", "stats": {"hp": 10}}
            ]}"#,
        )
        .expect("catalog parses");
        assert_eq!(registry.all_items().count(), 2);
        let bread = registry.get(ItemId(2)).expect("bread");
        assert_eq!(bread.category, ItemCategory::Consumable);
        assert_eq!(bread.modifiers.get(StatKey::Hp), 10);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let error = ItemRegistry::from_json_str(
            r#"{"items": [
                {"id": 3, "name": "A", "category": "armor"},
                {"id": 3, "name": "B", "category": "armor"}
            ]}"#,
        )
        .expect_err("duplicate id");
        assert!(matches!(error, ItemCatalogError::DuplicateId(ItemId(3))));
    }

    #[test]
    fn parse_errors_name_the_json_path() {
        let error = ItemRegistry::from_json_str(
            r#"{"items": [{"id": 1, "name": "A", "category": "shield"}]}"#,
        )
        .expect_err("unknown category");
        match error {
            ItemCatalogError::Parse { path, .. } => assert_eq!(path, "items[0].category"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
