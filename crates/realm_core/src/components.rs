//! Unit instances and their derived stats.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::{Catalog, EquipSlot, ItemData, UnitData};
use crate::factions::FactionId;
use crate::grid::TilePos;
use crate::math::{apply_percent, scale_percent, Fixed};

/// Unique identifier for units, assigned monotonically.
pub type UnitId = u64;

/// Percent of base stats gained per level above 1.
pub const GROWTH_PER_LEVEL: i32 = 10;

/// Experience needed to go from `level` to `level + 1`.
#[must_use]
pub const fn xp_to_next(level: u32) -> u32 {
    100 * level
}

/// A unit on the map.
#[derive(Debug, Clone, PartialEq, Hash, Eq, Serialize, Deserialize)]
pub struct UnitInstance {
    /// Globally unique id.
    pub id: UnitId,
    /// Catalog unit type.
    pub kind: String,
    /// Owning faction, or [`crate::factions::HOSTILE_FACTION`].
    pub owner: FactionId,
    /// Tile the unit stands on.
    pub pos: TilePos,
    /// Current hit points.
    pub hp: u32,
    /// Experience toward the next level.
    pub xp: u32,
    /// Level, starting at 1.
    pub level: u32,
    /// Kills credited.
    pub kills: u32,
    /// Remaining adventure ticks.
    pub adventure: Option<u32>,
    /// Remaining training ticks.
    pub construction: Option<u32>,
    /// Equipped items by slot.
    pub equipment: BTreeMap<EquipSlot, String>,
    /// Carried, unequipped items.
    pub inventory: Vec<String>,
}

impl UnitInstance {
    /// A level 1 unit with `hp` hit points.
    #[must_use]
    pub fn new(
        id: UnitId,
        kind: impl Into<String>,
        owner: impl Into<FactionId>,
        pos: TilePos,
        hp: u32,
    ) -> Self {
        Self {
            id,
            kind: kind.into(),
            owner: owner.into(),
            pos,
            hp,
            xp: 0,
            level: 1,
            kills: 0,
            adventure: None,
            construction: None,
            equipment: BTreeMap::new(),
            inventory: Vec::new(),
        }
    }

    /// Whether the unit is outside normal AI control.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.adventure.is_some() || self.construction.is_some()
    }

    fn level_bonus(&self, stat_modifier: i32) -> i32 {
        let levels = i32::try_from(self.level.saturating_sub(1)).unwrap_or(i32::MAX);
        stat_modifier.saturating_add(levels.saturating_mul(GROWTH_PER_LEVEL))
    }

    fn equipment_bonus(&self, catalog: &Catalog, pick: impl Fn(&ItemData) -> u32) -> u32 {
        self.equipment
            .values()
            .filter_map(|id| catalog.get_item(id))
            .map(pick)
            .sum()
    }

    /// Maximum hit points given the owner's HP modifier (percent).
    #[must_use]
    pub fn max_hp(&self, def: &UnitData, catalog: &Catalog, stat_modifier: i32) -> u32 {
        let scale = u64::try_from(scale_percent(self.level_bonus(stat_modifier))).unwrap_or(0);
        let base = u32::try_from(u64::from(def.hp) * scale / 100).unwrap_or(u32::MAX);
        base.saturating_add(self.equipment_bonus(catalog, |item| item.hp)).max(1)
    }

    /// Attack power given the owner's attack modifier (percent).
    #[must_use]
    pub fn attack_power(&self, def: &UnitData, catalog: &Catalog, stat_modifier: i32) -> Fixed {
        let base = apply_percent(Fixed::from_num(def.attack), self.level_bonus(stat_modifier));
        base + Fixed::from_num(self.equipment_bonus(catalog, |item| item.attack))
    }

    /// Add experience, converting surplus into levels.
    ///
    /// Returns the number of levels gained.
    pub fn grant_experience(&mut self, amount: u32) -> u32 {
        self.xp = self.xp.saturating_add(amount);
        let mut gained = 0;
        while self.xp >= xp_to_next(self.level) {
            self.xp -= xp_to_next(self.level);
            self.level += 1;
            gained += 1;
        }
        gained
    }

    /// Take an item, equipping it if its slot is free.
    pub fn take_item(&mut self, catalog: &Catalog, item_id: &str) {
        let Some(item) = catalog.get_item(item_id) else {
            tracing::warn!(item = item_id, "Skipping unknown item");
            return;
        };
        if self.equipment.contains_key(&item.slot) {
            self.inventory.push(item.id.clone());
        } else {
            self.equipment.insert(item.slot, item.id.clone());
        }
    }

    /// Remove and return everything the unit carries.
    pub fn drain_items(&mut self) -> Vec<String> {
        let mut items: Vec<String> = std::mem::take(&mut self.equipment).into_values().collect();
        items.append(&mut self.inventory);
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::from_ron_str(
            r#"(
                units: [UnitData(id: "guard", name: "Guard", role: Soldier, hp: 40, attack: 10)],
                items: [
                    ItemData(id: "sword", name: "Sword", slot: Weapon, attack: 3),
                    ItemData(id: "axe", name: "Axe", slot: Weapon, attack: 4),
                    ItemData(id: "mail", name: "Mail", slot: Armor, hp: 15),
                ],
            )"#,
        )
        .unwrap()
    }

    #[test]
    fn test_levels_consume_surplus() {
        let mut unit = UnitInstance::new(1, "guard", "a", TilePos::new(0, 0), 40);
        let gained = unit.grant_experience(350);
        // 100 for level 1->2, 200 for 2->3
        assert_eq!(gained, 2);
        assert_eq!(unit.level, 3);
        assert_eq!(unit.xp, 50);
    }

    #[test]
    fn test_stats_grow_with_level_and_gear() {
        let catalog = catalog();
        let def = catalog.get_unit("guard").unwrap();
        let mut unit = UnitInstance::new(1, "guard", "a", TilePos::new(0, 0), 40);
        assert_eq!(unit.max_hp(def, &catalog, 0), 40);

        unit.level = 3;
        assert_eq!(unit.max_hp(def, &catalog, 0), 48);
        assert_eq!(unit.attack_power(def, &catalog, 0), Fixed::from_num(12));

        unit.take_item(&catalog, "mail");
        unit.take_item(&catalog, "sword");
        assert_eq!(unit.max_hp(def, &catalog, 0), 63);
        assert_eq!(unit.attack_power(def, &catalog, 0), Fixed::from_num(15));
    }

    #[test]
    fn test_occupied_slot_goes_to_inventory() {
        let catalog = catalog();
        let mut unit = UnitInstance::new(1, "guard", "a", TilePos::new(0, 0), 40);
        unit.take_item(&catalog, "sword");
        unit.take_item(&catalog, "axe");
        unit.take_item(&catalog, "unknown");
        assert_eq!(unit.equipment.get(&EquipSlot::Weapon).map(String::as_str), Some("sword"));
        assert_eq!(unit.inventory, vec!["axe".to_string()]);
        assert_eq!(unit.drain_items().len(), 2);
        assert!(unit.equipment.is_empty());
    }
}
