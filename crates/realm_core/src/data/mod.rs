//! The immutable catalog of static definitions.
//!
//! Every table is keyed by stable string ids. A [`Catalog`] is built once,
//! usually from RON, and shared by reference (typically behind an `Arc`)
//! with every tick. Nothing in the simulation mutates it.
//!
//! A catalog may live in a single document or be split across a directory
//! of RON files; split files are merged in file-name order and each may
//! fill any subset of the tables.

mod building_data;
mod faction_data;
mod tech_data;
mod unit_data;
mod world_data;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use building_data::{InfraKind, InfrastructureData, UpgradePath};
pub use faction_data::{FactionData, Personality, MAX_PERSONALITY};
pub use tech_data::TechData;
pub use unit_data::{CombatTrait, EquipSlot, ItemData, UnitData, UnitRole, UnitStat};
pub use world_data::{BiomeData, Rarity, ResourceData, ResourceTier, WorldEventData};

use crate::error::{GameError, Result};

/// Registry of all static definitions.
///
/// # Example RON
///
/// ```ron
/// Catalog(
///     resources: [ResourceData(id: "wood", name: "Wood", tier: Raw)],
///     biomes: [BiomeData(id: "plains", name: "Plains", deposits: ["wood"])],
///     base_storage: {Raw: 200, Processed: 100, Component: 50, Exotic: 20},
/// )
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    /// Playable factions.
    pub factions: Vec<FactionData>,
    /// Terrain types.
    pub biomes: Vec<BiomeData>,
    /// Resource types.
    pub resources: Vec<ResourceData>,
    /// Buildable structures.
    pub infrastructure: Vec<InfrastructureData>,
    /// Unit types.
    pub units: Vec<UnitData>,
    /// Research unlocks.
    pub techs: Vec<TechData>,
    /// Random map events.
    pub world_events: Vec<WorldEventData>,
    /// Items.
    pub items: Vec<ItemData>,
    /// Unit types the hostile spawner draws from.
    pub hostiles: Vec<String>,
    /// Storage every faction starts with, per tier.
    pub base_storage: BTreeMap<ResourceTier, u32>,
}

impl Catalog {
    /// Parse a catalog from a RON document.
    pub fn from_ron_str(ron_text: &str) -> Result<Self> {
        ron::from_str(ron_text).map_err(|e| GameError::DataParse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Load a catalog from a RON file or a directory of RON files.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            return Self::load_dir(path);
        }
        Self::load_file(path)
    }

    fn load_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| GameError::DataParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        ron::from_str(&text).map_err(|e| GameError::DataParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn load_dir(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| GameError::DataParse {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;

        let mut files: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "ron"))
            .collect();
        files.sort();

        let mut catalog = Self::default();
        for file in files {
            let part = Self::load_file(&file)?;
            tracing::debug!(path = %file.display(), "Merged catalog file");
            catalog.merge(part);
        }
        Ok(catalog)
    }

    /// Append every table of `other` onto this catalog.
    ///
    /// Base storage entries in `other` override existing ones.
    pub fn merge(&mut self, other: Self) {
        self.factions.extend(other.factions);
        self.biomes.extend(other.biomes);
        self.resources.extend(other.resources);
        self.infrastructure.extend(other.infrastructure);
        self.units.extend(other.units);
        self.techs.extend(other.techs);
        self.world_events.extend(other.world_events);
        self.items.extend(other.items);
        self.hostiles.extend(other.hostiles);
        self.base_storage.extend(other.base_storage);
    }

    /// Find a faction by its ID.
    #[must_use]
    pub fn get_faction(&self, id: &str) -> Option<&FactionData> {
        self.factions.iter().find(|f| f.id == id)
    }

    /// Find a biome by its ID.
    #[must_use]
    pub fn get_biome(&self, id: &str) -> Option<&BiomeData> {
        self.biomes.iter().find(|b| b.id == id)
    }

    /// Find a resource by its ID.
    #[must_use]
    pub fn get_resource(&self, id: &str) -> Option<&ResourceData> {
        self.resources.iter().find(|r| r.id == id)
    }

    /// Find an infrastructure type by its ID.
    #[must_use]
    pub fn get_infrastructure(&self, id: &str) -> Option<&InfrastructureData> {
        self.infrastructure.iter().find(|i| i.id == id)
    }

    /// Find a unit type by its ID.
    #[must_use]
    pub fn get_unit(&self, id: &str) -> Option<&UnitData> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Find a technology by its ID.
    #[must_use]
    pub fn get_tech(&self, id: &str) -> Option<&TechData> {
        self.techs.iter().find(|t| t.id == id)
    }

    /// Find a world-event type by its ID.
    #[must_use]
    pub fn get_world_event(&self, id: &str) -> Option<&WorldEventData> {
        self.world_events.iter().find(|e| e.id == id)
    }

    /// Find an item by its ID.
    #[must_use]
    pub fn get_item(&self, id: &str) -> Option<&ItemData> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Storage tier of a resource.
    #[must_use]
    pub fn resource_tier(&self, id: &str) -> Option<ResourceTier> {
        self.get_resource(id).map(|r| r.tier)
    }

    /// Items a returning hero may bring back.
    pub fn lore_items(&self) -> impl Iterator<Item = &ItemData> {
        self.items.iter().filter(|i| i.lore)
    }

    /// Base storage for a tier.
    #[must_use]
    pub fn base_storage(&self, tier: ResourceTier) -> u32 {
        self.base_storage.get(&tier).copied().unwrap_or(0)
    }

    /// Validate internal consistency.
    ///
    /// Returns one message per problem; an empty list means the catalog is
    /// safe to simulate.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        check_unique("faction", self.factions.iter().map(|f| &f.id), &mut errors);
        check_unique("biome", self.biomes.iter().map(|b| &b.id), &mut errors);
        check_unique("resource", self.resources.iter().map(|r| &r.id), &mut errors);
        check_unique(
            "infrastructure",
            self.infrastructure.iter().map(|i| &i.id),
            &mut errors,
        );
        check_unique("unit", self.units.iter().map(|u| &u.id), &mut errors);
        check_unique("tech", self.techs.iter().map(|t| &t.id), &mut errors);
        check_unique(
            "world event",
            self.world_events.iter().map(|e| &e.id),
            &mut errors,
        );
        check_unique("item", self.items.iter().map(|i| &i.id), &mut errors);

        for faction in &self.factions {
            self.validate_faction(faction, &mut errors);
        }

        for infra in &self.infrastructure {
            self.validate_infrastructure(infra, &mut errors);
        }

        for unit in &self.units {
            self.check_costs("Unit", &unit.id, &unit.cost, &mut errors);
        }

        for biome in &self.biomes {
            for deposit in &biome.deposits {
                if self.get_resource(deposit).is_none() {
                    errors.push(format!(
                        "Biome '{}' lists unknown deposit '{}'",
                        biome.id, deposit
                    ));
                }
            }
        }

        for event in &self.world_events {
            if let Some(unit_id) = &event.spawns {
                if self.get_unit(unit_id).is_none() {
                    errors.push(format!(
                        "World event '{}' spawns unknown unit '{}'",
                        event.id, unit_id
                    ));
                }
            }
            for item in &event.loot {
                if self.get_item(item).is_none() {
                    errors.push(format!(
                        "World event '{}' drops unknown item '{}'",
                        event.id, item
                    ));
                }
            }
        }

        for hostile in &self.hostiles {
            if self.get_unit(hostile).is_none() {
                errors.push(format!("Hostile list names unknown unit '{hostile}'"));
            }
        }

        errors
    }

    fn validate_faction(&self, faction: &FactionData, errors: &mut Vec<String>) {
        let p = faction.personality;
        for (name, value) in [
            ("aggression", p.aggression),
            ("diplomacy", p.diplomacy),
            ("expansion", p.expansion),
        ] {
            if value > MAX_PERSONALITY {
                errors.push(format!(
                    "Faction '{}' {name} {value} exceeds {MAX_PERSONALITY}",
                    faction.id
                ));
            }
        }

        match self.get_unit(&faction.leader) {
            Some(unit) if unit.role == UnitRole::Hero => {}
            Some(_) => errors.push(format!(
                "Faction '{}' leader '{}' is not a Hero",
                faction.id, faction.leader
            )),
            None => errors.push(format!(
                "Faction '{}' has unknown leader '{}'",
                faction.id, faction.leader
            )),
        }

        if let Some(escort) = &faction.escort {
            if self.get_unit(escort).is_none() {
                errors.push(format!(
                    "Faction '{}' has unknown escort '{}'",
                    faction.id, escort
                ));
            }
        }

        match self.get_infrastructure(&faction.settlement) {
            Some(infra) if infra.is_settlement() => {}
            Some(_) => errors.push(format!(
                "Faction '{}' start '{}' is not a settlement",
                faction.id, faction.settlement
            )),
            None => errors.push(format!(
                "Faction '{}' has unknown settlement '{}'",
                faction.id, faction.settlement
            )),
        }

        for unit_id in faction.roster.iter().chain(&faction.starting_units) {
            match self.get_unit(unit_id) {
                Some(unit) if unit.role == UnitRole::Hero => errors.push(format!(
                    "Faction '{}' lists hero '{}' as a regular unit",
                    faction.id, unit_id
                )),
                Some(_) => {}
                None => errors.push(format!(
                    "Faction '{}' lists unknown unit '{}'",
                    faction.id, unit_id
                )),
            }
        }

        for infra_id in &faction.buildable {
            if self.get_infrastructure(infra_id).is_none() {
                errors.push(format!(
                    "Faction '{}' can build unknown infrastructure '{}'",
                    faction.id, infra_id
                ));
            }
        }

        self.check_costs(
            "Faction",
            &faction.id,
            &faction.starting_resources,
            errors,
        );
    }

    fn validate_infrastructure(&self, infra: &InfrastructureData, errors: &mut Vec<String>) {
        if infra.size == 0 {
            errors.push(format!("Infrastructure '{}' has zero size", infra.id));
        }

        self.check_costs("Infrastructure", &infra.id, &infra.cost, errors);

        match &infra.kind {
            InfraKind::Extractor { resource, .. } => {
                if self.get_resource(resource).is_none() {
                    errors.push(format!(
                        "Extractor '{}' targets unknown resource '{}'",
                        infra.id, resource
                    ));
                }
            }
            InfraKind::Processor { inputs, output, .. } => {
                self.check_costs("Processor", &infra.id, inputs, errors);
                if self.get_resource(output).is_none() {
                    errors.push(format!(
                        "Processor '{}' outputs unknown resource '{}'",
                        infra.id, output
                    ));
                }
            }
            InfraKind::Settlement { upgrade, .. } => {
                if let Some(path) = upgrade {
                    match self.get_infrastructure(&path.target) {
                        Some(target) if target.is_settlement() => {}
                        _ => errors.push(format!(
                            "Settlement '{}' upgrades to unknown settlement '{}'",
                            infra.id, path.target
                        )),
                    }
                    self.check_costs("Upgrade", &infra.id, &path.cost, errors);
                }
            }
            InfraKind::Facility => {}
        }
    }

    fn check_costs(
        &self,
        kind: &str,
        owner: &str,
        costs: &BTreeMap<String, u32>,
        errors: &mut Vec<String>,
    ) {
        for resource in costs.keys() {
            if self.get_resource(resource).is_none() {
                errors.push(format!(
                    "{kind} '{owner}' references unknown resource '{resource}'"
                ));
            }
        }
    }
}

fn check_unique<'a>(
    kind: &str,
    ids: impl Iterator<Item = &'a String>,
    errors: &mut Vec<String>,
) {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            errors.push(format!("Duplicate {kind} id '{id}'"));
        }
    }
}
