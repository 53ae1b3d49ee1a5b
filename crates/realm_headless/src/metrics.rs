//! World metrics for reports and batch summaries.
//!
//! Metrics are read from a finished [`GameState`] through its query
//! surface. Floating point appears only here, in output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use realm_core::data::Catalog;
use realm_core::factions::{DiplomacyStatus, FactionState};
use realm_core::state::GameState;

use crate::runner::NotificationCounter;

/// Metrics for a single run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameMetrics {
    /// Scenario name.
    pub scenario: String,
    /// Random seed used.
    pub seed: u64,
    /// Final tick.
    pub ticks: u64,
    /// Final year.
    pub year: u64,
    /// Era name at the end of the run.
    pub epoch: String,
    /// Living units of every owner, hostiles included.
    pub units: usize,
    /// Coin minted across the world.
    pub minted: f64,
    /// Athar held across the world.
    pub world_athar: f64,
    /// Wars standing at the end, each pair counted once.
    pub wars: usize,
    /// Alliances standing at the end, each pair counted once.
    pub alliances: usize,
    /// Faction with the highest score, if any.
    pub leader: Option<String>,
    /// Per-faction metrics.
    pub factions: BTreeMap<String, FactionMetrics>,
    /// Notifications raised during the run, by name.
    pub notifications: BTreeMap<String, u64>,
    /// Final state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl GameMetrics {
    /// Collect metrics from a finished world.
    #[must_use]
    pub fn collect(
        scenario: impl Into<String>,
        seed: u64,
        state: &GameState,
        catalog: &Catalog,
        notifications: &NotificationCounter,
    ) -> Self {
        let factions: BTreeMap<String, FactionMetrics> = state
            .factions()
            .map(|faction| {
                (
                    faction.id.clone(),
                    FactionMetrics::collect(faction, state, catalog),
                )
            })
            .collect();
        let leader = factions
            .values()
            .max_by(|a, b| a.score.cmp(&b.score).then_with(|| b.faction_id.cmp(&a.faction_id)))
            .map(|f| f.faction_id.clone());

        Self {
            scenario: scenario.into(),
            seed,
            ticks: state.tick(),
            year: state.year(),
            epoch: state.epoch().name().to_string(),
            units: state.units().count(),
            minted: state.minted().to_num::<f64>(),
            world_athar: state.world_athar().to_num::<f64>(),
            wars: count_pairs(state, DiplomacyStatus::War),
            alliances: count_pairs(state, DiplomacyStatus::Alliance),
            leader,
            factions,
            notifications: notifications.counts.clone(),
            final_state_hash: state.state_hash(),
        }
    }
}

fn count_pairs(state: &GameState, status: DiplomacyStatus) -> usize {
    state
        .factions()
        .flat_map(|f| {
            f.diplomacy
                .iter()
                .filter(move |(other, relation)| relation.status == status && f.id < **other)
        })
        .count()
}

/// Metrics for a single faction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactionMetrics {
    /// Faction identifier.
    pub faction_id: String,
    /// Current population.
    pub population: u32,
    /// Settlement capacity.
    pub capacity: u32,
    /// Settlement count.
    pub settlements: usize,
    /// Owned structures of every kind.
    pub structures: usize,
    /// Living units.
    pub units: usize,
    /// Unlocked techs.
    pub techs: usize,
    /// Unspent research.
    pub research: u64,
    /// Athar held.
    pub athar: f64,
    /// Lore items recovered.
    pub relics: usize,
    /// Stock per resource.
    pub resources: BTreeMap<String, f64>,
    /// Factions this one is at war with.
    pub enemies: Vec<String>,
    /// Rough standing used to pick a leader.
    pub score: u64,
}

impl FactionMetrics {
    /// Collect metrics for one faction.
    #[must_use]
    pub fn collect(faction: &FactionState, state: &GameState, catalog: &Catalog) -> Self {
        let id = faction.id.as_str();
        let structures = state
            .grid()
            .tiles()
            .filter(|tile| tile.infrastructure.is_some() && tile.is_owned_by(id))
            .count();
        let settlements = state.settlement_tiles(catalog, id).len();
        let units = state.unit_count(id);
        let enemies = faction
            .diplomacy
            .iter()
            .filter(|(_, relation)| relation.status == DiplomacyStatus::War)
            .map(|(other, _)| other.clone())
            .collect();

        let score = u64::from(faction.population)
            + 10 * structures as u64
            + 5 * units as u64
            + 20 * faction.techs.len() as u64;

        Self {
            faction_id: faction.id.clone(),
            population: faction.population,
            capacity: state.settlement_capacity(catalog, id),
            settlements,
            structures,
            units,
            techs: faction.techs.len(),
            research: faction.research,
            athar: faction.athar.to_num::<f64>(),
            relics: faction.relics.len(),
            resources: faction
                .storage
                .stocks()
                .map(|(resource, amount)| (resource.to_string(), amount.to_num::<f64>()))
                .collect(),
            enemies,
            score,
        }
    }
}

/// Summary statistics across multiple runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Runs summarized.
    pub total_games: u32,
    /// Runs led by each faction.
    pub leads_by_faction: BTreeMap<String, u32>,
    /// Lead rate by faction.
    pub lead_rates: BTreeMap<String, f64>,
    /// Average final population by faction.
    pub avg_population: BTreeMap<String, f64>,
    /// Average structure count by faction.
    pub avg_structures: BTreeMap<String, f64>,
    /// Average techs by faction.
    pub avg_techs: BTreeMap<String, f64>,
    /// Runs ending with at least one war.
    pub games_with_war: u32,
    /// Average living units.
    pub avg_units: f64,
}

impl BatchSummary {
    /// Calculate summary from a list of game metrics.
    #[must_use]
    pub fn from_games(games: &[GameMetrics]) -> Self {
        if games.is_empty() {
            return Self::default();
        }
        let total = games.len() as f64;

        let mut summary = Self {
            total_games: games.len() as u32,
            ..Default::default()
        };
        let mut population: BTreeMap<String, u64> = BTreeMap::new();
        let mut structures: BTreeMap<String, u64> = BTreeMap::new();
        let mut techs: BTreeMap<String, u64> = BTreeMap::new();
        let mut units = 0usize;

        for game in games {
            if let Some(leader) = &game.leader {
                *summary.leads_by_faction.entry(leader.clone()).or_insert(0) += 1;
            }
            if game.wars > 0 {
                summary.games_with_war += 1;
            }
            units += game.units;
            for (id, faction) in &game.factions {
                *population.entry(id.clone()).or_insert(0) += u64::from(faction.population);
                *structures.entry(id.clone()).or_insert(0) += faction.structures as u64;
                *techs.entry(id.clone()).or_insert(0) += faction.techs as u64;
            }
        }

        let average = |sums: BTreeMap<String, u64>| -> BTreeMap<String, f64> {
            sums.into_iter()
                .map(|(id, sum)| (id, sum as f64 / total))
                .collect()
        };
        summary.lead_rates = summary
            .leads_by_faction
            .iter()
            .map(|(id, leads)| (id.clone(), f64::from(*leads) / total))
            .collect();
        summary.avg_population = average(population);
        summary.avg_structures = average(structures);
        summary.avg_techs = average(techs);
        summary.avg_units = units as f64 / total;
        summary
    }

    /// The faction leading more than `threshold` of runs, if any.
    #[must_use]
    pub fn dominant_faction(&self, threshold: f64) -> Option<&String> {
        self.lead_rates
            .iter()
            .find(|(_, rate)| **rate > threshold)
            .map(|(id, _)| id)
    }
}
