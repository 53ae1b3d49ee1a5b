//! World construction: an explicit builder and a seeded generator.
//!
//! [`WorldBuilder`] is the only public way to assemble a [`GameState`].
//! [`generate_world`] drives it from a [`WorldConfig`]:
//! - Biomes follow a value-noise elevation field
//! - Deposits are scattered per biome
//! - Factions start spread out, with a settlement, workers and home deposits
//!
//! Generation draws from its own [`SimRng`], so the same seed and config
//! always produce the same world.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::UnitId;
use crate::data::{BiomeData, Catalog, InfraKind};
use crate::economy;
use crate::error::{GameError, Result};
use crate::factions::{DiplomacyStatus, FactionState, HOSTILE_FACTION, MAX_OPINION, MIN_OPINION};
use crate::grid::{TilePos, WorldGrid};
use crate::math::Fixed;
use crate::rng::SimRng;
use crate::state::{GameState, TICK_PER_YEAR};

/// Assembles a [`GameState`] piece by piece.
///
/// Every step validates its catalog references, so a built state never
/// points at an unknown id.
#[derive(Debug)]
pub struct WorldBuilder<'c> {
    catalog: &'c Catalog,
    state: GameState,
}

impl<'c> WorldBuilder<'c> {
    /// A `width`×`height` world filled with `biome`.
    ///
    /// # Errors
    ///
    /// Fails for an unknown biome or an empty map.
    pub fn new(catalog: &'c Catalog, width: u32, height: u32, biome: &str) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(GameError::InvalidState(format!(
                "World must not be empty, got {width}x{height}"
            )));
        }
        if catalog.get_biome(biome).is_none() {
            return Err(GameError::missing("biome", biome));
        }
        Ok(Self {
            catalog,
            state: GameState::new(WorldGrid::new(width, height, biome)),
        })
    }

    fn check_pos(&self, pos: TilePos) -> Result<()> {
        if self.state.grid.contains(pos) {
            Ok(())
        } else {
            Err(GameError::InvalidPlacement {
                x: pos.x,
                y: pos.y,
                reason: "off the map".to_string(),
            })
        }
    }

    fn check_faction(&self, id: &str) -> Result<()> {
        if self.state.factions.contains_key(id) {
            Ok(())
        } else {
            Err(GameError::UnknownFaction(id.to_string()))
        }
    }

    /// Change the biome of one tile.
    ///
    /// # Errors
    ///
    /// Fails for an unknown biome or an off-map position.
    pub fn biome(&mut self, pos: TilePos, biome: &str) -> Result<&mut Self> {
        self.check_pos(pos)?;
        if self.catalog.get_biome(biome).is_none() {
            return Err(GameError::missing("biome", biome));
        }
        if let Some(tile) = self.state.grid.get_mut(pos) {
            tile.biome = biome.to_string();
        }
        Ok(self)
    }

    /// Put a deposit under one tile.
    ///
    /// # Errors
    ///
    /// Fails for an unknown resource or an off-map position.
    pub fn deposit(&mut self, pos: TilePos, resource: &str) -> Result<&mut Self> {
        self.check_pos(pos)?;
        if self.catalog.get_resource(resource).is_none() {
            return Err(GameError::missing("resource", resource));
        }
        if let Some(tile) = self.state.grid.get_mut(pos) {
            tile.resource = Some(resource.to_string());
            tile.respawn_at = None;
        }
        Ok(self)
    }

    /// Register a catalog faction with its starting stock.
    ///
    /// The new faction is neutral toward every faction registered before.
    ///
    /// # Errors
    ///
    /// Fails if the catalog has no such faction.
    pub fn faction(&mut self, id: &str) -> Result<&mut Self> {
        let data = self
            .catalog
            .get_faction(id)
            .ok_or_else(|| GameError::missing("faction", id))?;
        let mut faction = FactionState::new(id, data.leader.clone(), self.catalog);
        for (resource, amount) in &data.starting_resources {
            if let Some(tier) = self.catalog.resource_tier(resource) {
                faction.storage.deposit(resource, tier, Fixed::from_num(*amount));
            }
        }
        let others: Vec<String> = self.state.factions.keys().cloned().collect();
        self.state.factions.insert(id.to_string(), faction);
        for other in others {
            self.state.set_status(id, &other, DiplomacyStatus::Neutral);
        }
        Ok(self)
    }

    /// Set a faction's stock of one resource, clamped to capacity.
    ///
    /// # Errors
    ///
    /// Fails for an unregistered faction or unknown resource.
    pub fn stock(&mut self, faction: &str, resource: &str, amount: u32) -> Result<&mut Self> {
        self.check_faction(faction)?;
        let tier = self
            .catalog
            .resource_tier(resource)
            .ok_or_else(|| GameError::missing("resource", resource))?;
        if let Some(entry) = self.state.factions.get_mut(faction) {
            entry.storage.set_amount(resource, tier, Fixed::from_num(amount));
        }
        Ok(self)
    }

    /// Set a faction's population. Clamped to capacity on [`build`](Self::build).
    ///
    /// # Errors
    ///
    /// Fails for an unregistered faction.
    pub fn population(&mut self, faction: &str, population: u32) -> Result<&mut Self> {
        self.check_faction(faction)?;
        if let Some(entry) = self.state.factions.get_mut(faction) {
            entry.population = population;
        }
        Ok(self)
    }

    /// Set the stance between two factions on both sides.
    ///
    /// # Errors
    ///
    /// Fails if either faction is unregistered.
    pub fn relation(&mut self, a: &str, b: &str, status: DiplomacyStatus) -> Result<&mut Self> {
        self.check_faction(a)?;
        self.check_faction(b)?;
        self.state.set_status(a, b, status);
        Ok(self)
    }

    /// Set `a`'s opinion of `b`.
    ///
    /// # Errors
    ///
    /// Fails if either faction is unregistered.
    pub fn opinion(&mut self, a: &str, b: &str, opinion: i32) -> Result<&mut Self> {
        self.check_faction(a)?;
        self.check_faction(b)?;
        if a != b {
            if let Some(entry) = self.state.factions.get_mut(a) {
                entry.diplomacy.entry(b.to_string()).or_default().opinion =
                    opinion.clamp(MIN_OPINION, MAX_OPINION);
            }
        }
        Ok(self)
    }

    /// Install infrastructure owned by `owner`.
    ///
    /// # Errors
    ///
    /// Fails for unknown ids or a blocked footprint.
    pub fn infrastructure(&mut self, pos: TilePos, id: &str, owner: &str) -> Result<&mut Self> {
        self.check_faction(owner)?;
        let infra = self
            .catalog
            .get_infrastructure(id)
            .ok_or_else(|| GameError::missing("infrastructure", id))?;
        self.state
            .grid
            .place_structure(pos, infra.size, &infra.id, owner)?;
        economy::recalculate_storage(&mut self.state, self.catalog, owner);
        Ok(self)
    }

    /// Place a unit at full health.
    ///
    /// `owner` may be [`HOSTILE_FACTION`].
    ///
    /// # Errors
    ///
    /// Fails for an unknown unit type, owner or position.
    pub fn unit(&mut self, kind: &str, owner: &str, pos: TilePos) -> Result<UnitId> {
        if owner != HOSTILE_FACTION {
            self.check_faction(owner)?;
        }
        self.check_pos(pos)?;
        if self.catalog.get_unit(kind).is_none() {
            return Err(GameError::missing("unit", kind));
        }
        self.state
            .spawn_unit(self.catalog, kind, owner, pos)
            .ok_or_else(|| GameError::missing("unit", kind))
    }

    /// Start the clock at `tick`.
    pub fn at_tick(&mut self, tick: u64) -> &mut Self {
        self.state.tick = tick;
        self.state.year = tick / TICK_PER_YEAR;
        self
    }

    /// Set the observer cursor.
    ///
    /// # Errors
    ///
    /// Fails for an off-map position.
    pub fn cursor(&mut self, pos: TilePos) -> Result<&mut Self> {
        self.check_pos(pos)?;
        self.state.cursor = Some(pos);
        Ok(self)
    }

    /// The state so far.
    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// Finish: recalculate storage and clamp populations.
    #[must_use]
    pub fn build(mut self) -> GameState {
        let ids: Vec<String> = self.state.factions.keys().cloned().collect();
        for id in &ids {
            economy::recalculate_storage(&mut self.state, self.catalog, id);
            let capacity = self.state.settlement_capacity(self.catalog, id);
            if let Some(faction) = self.state.factions.get_mut(id) {
                faction.population = faction.population.min(capacity);
            }
        }
        self.state
    }
}

/// Where and how one faction starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionStart {
    /// Catalog faction id.
    pub id: String,
    /// Settlement tile; chosen automatically when absent.
    #[serde(default)]
    pub position: Option<TilePos>,
    /// Stock overrides on top of the catalog's starting resources.
    #[serde(default)]
    pub resources: BTreeMap<String, u32>,
    /// Starting population.
    #[serde(default = "default_population")]
    pub population: u32,
}

const fn default_population() -> u32 {
    5
}

/// A tile forced to a biome or deposit after noise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedTile {
    /// Position.
    pub pos: TilePos,
    /// Biome override.
    #[serde(default)]
    pub biome: Option<String>,
    /// Deposit override.
    #[serde(default)]
    pub deposit: Option<String>,
}

/// Procedural world parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
    /// Biomes from low to high elevation. Empty means every catalog
    /// biome ordered by its `elevation`.
    #[serde(default)]
    pub biomes: Vec<String>,
    /// Noise lattice spacing in tiles.
    #[serde(default = "default_feature_size")]
    pub feature_size: u32,
    /// Factions, in placement order.
    #[serde(default)]
    pub factions: Vec<FactionStart>,
    /// Tiles forced after noise.
    #[serde(default)]
    pub pinned: Vec<PinnedTile>,
}

const fn default_feature_size() -> u32 {
    6
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 32,
            height: 24,
            biomes: Vec::new(),
            feature_size: default_feature_size(),
            factions: Vec::new(),
            pinned: Vec::new(),
        }
    }
}

impl WorldConfig {
    /// A small map.
    #[must_use]
    pub fn small() -> Self {
        Self {
            width: 24,
            height: 16,
            ..Default::default()
        }
    }

    /// A large map.
    #[must_use]
    pub fn large() -> Self {
        Self {
            width: 64,
            height: 48,
            feature_size: 10,
            ..Default::default()
        }
    }

    /// Add a faction with an automatic start.
    #[must_use]
    pub fn with_faction(mut self, id: impl Into<String>) -> Self {
        self.factions.push(FactionStart {
            id: id.into(),
            position: None,
            resources: BTreeMap::new(),
            population: default_population(),
        });
        self
    }
}

/// Tiles kept free of noise deposits and foreign starts around a settlement.
const START_CLEARANCE: u32 = 2;
/// Candidates tried per automatic start beyond the four corners.
const START_CANDIDATES: u32 = 16;

fn lattice(seed: u64, x: u32, y: u32) -> u32 {
    let mut h = seed
        ^ u64::from(x).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ u64::from(y).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    h ^= h >> 33;
    h = h.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    h ^= h >> 33;
    u32::try_from(h & 0xFF).unwrap_or(0)
}

/// Bilinear value noise in `[0, 255]`.
fn noise(seed: u64, x: u32, y: u32, scale: u32) -> u32 {
    let scale = scale.clamp(1, 64);
    let (lx, fx) = (x / scale, x % scale);
    let (ly, fy) = (y / scale, y % scale);
    let top = lattice(seed, lx, ly) * (scale - fx) + lattice(seed, lx + 1, ly) * fx;
    let bottom = lattice(seed, lx, ly + 1) * (scale - fx) + lattice(seed, lx + 1, ly + 1) * fx;
    (top * (scale - fy) + bottom * fy) / (scale * scale)
}

fn elevation_bands<'a>(catalog: &'a Catalog, config: &WorldConfig) -> Result<Vec<&'a BiomeData>> {
    if config.biomes.is_empty() {
        let mut bands: Vec<&BiomeData> = catalog.biomes.iter().collect();
        bands.sort_by(|a, b| a.elevation.cmp(&b.elevation).then_with(|| a.id.cmp(&b.id)));
        if bands.is_empty() {
            return Err(GameError::InvalidState("Catalog has no biomes".to_string()));
        }
        return Ok(bands);
    }
    config
        .biomes
        .iter()
        .map(|id| catalog.get_biome(id).ok_or_else(|| GameError::missing("biome", id)))
        .collect()
}

fn corner_starts(width: u32, height: u32, rng: &mut SimRng) -> Vec<TilePos> {
    let pad_x = (width / 6).max(1).min(width - 1);
    let pad_y = (height / 6).max(1).min(height - 1);
    let jitter = rng.range(0, 2);
    let (near_x, far_x) = ((pad_x + jitter).min(width - 1), width.saturating_sub(1 + pad_x + jitter));
    let (near_y, far_y) = ((pad_y + jitter).min(height - 1), height.saturating_sub(1 + pad_y + jitter));
    vec![
        TilePos::new(near_x, near_y),
        TilePos::new(far_x, far_y),
        TilePos::new(far_x, near_y),
        TilePos::new(near_x, far_y),
    ]
}

fn spread_start(width: u32, height: u32, taken: &[TilePos], rng: &mut SimRng) -> TilePos {
    let mut best = TilePos::new(width / 2, height / 2);
    let mut best_gap = 0;
    for _ in 0..START_CANDIDATES {
        let candidate = TilePos::new(rng.range(0, width), rng.range(0, height));
        let gap = taken
            .iter()
            .map(|pos| pos.distance(candidate))
            .min()
            .unwrap_or(u32::MAX);
        if gap > best_gap {
            best = candidate;
            best_gap = gap;
        }
    }
    best
}

fn choose_starts(config: &WorldConfig, rng: &mut SimRng) -> Vec<TilePos> {
    let corners = corner_starts(config.width, config.height, rng);
    let mut starts: Vec<TilePos> = Vec::with_capacity(config.factions.len());
    let mut next_corner = corners.iter();
    for start in &config.factions {
        let pos = match start.position {
            Some(pos) => pos,
            None => match next_corner.find(|corner| {
                starts
                    .iter()
                    .all(|s| s.distance(**corner) > 2 * START_CLEARANCE)
            }) {
                Some(corner) => *corner,
                None => spread_start(config.width, config.height, &starts, rng),
            },
        };
        starts.push(pos);
    }
    starts
}

/// Generate a world from `config`.
///
/// # Errors
///
/// Fails when the config names unknown catalog ids or two starts collide.
pub fn generate_world(catalog: &Catalog, config: &WorldConfig, seed: u64) -> Result<GameState> {
    Ok(WorldBuilder::generate(catalog, config, seed)?.build())
}

impl<'c> WorldBuilder<'c> {
    /// Generate a world from `config`, leaving it open for further edits.
    ///
    /// # Errors
    ///
    /// See [`generate_world`].
    pub fn generate(catalog: &'c Catalog, config: &WorldConfig, seed: u64) -> Result<Self> {
        let mut rng = SimRng::seed_from_u64(seed);
        let bands = elevation_bands(catalog, config)?;
        let passable = bands
            .iter()
            .filter(|biome| biome.is_passable())
            .min_by_key(|biome| biome.move_cost)
            .map(|biome| biome.id.clone())
            .ok_or_else(|| GameError::InvalidState("No passable biome to start on".to_string()))?;

        let mut world = WorldBuilder::new(catalog, config.width, config.height, &passable)?;
        let noise_seed = (u64::from(rng.range(0, u32::MAX)) << 32) | u64::from(rng.range(0, u32::MAX));
        let band_count = u32::try_from(bands.len()).unwrap_or(u32::MAX);
        for y in 0..config.height {
            for x in 0..config.width {
                let height = noise(noise_seed, x, y, config.feature_size);
                let index = usize::try_from(height * band_count / 256).unwrap_or(0);
                if let Some(biome) = bands.get(index) {
                    world.biome(TilePos::new(x, y), &biome.id)?;
                }
            }
        }

        let starts = choose_starts(config, &mut rng);
        let near_start = |pos: TilePos| starts.iter().any(|s| s.distance(pos) <= START_CLEARANCE);

        for y in 0..config.height {
            for x in 0..config.width {
                let pos = TilePos::new(x, y);
                if near_start(pos) {
                    continue;
                }
                let Some(biome) = world
                    .state()
                    .tile(pos)
                    .and_then(|tile| catalog.get_biome(&tile.biome))
                else {
                    continue;
                };
                if biome.deposits.is_empty() || !rng.percent(biome.deposit_chance) {
                    continue;
                }
                if let Some(resource) = rng.pick(&biome.deposits) {
                    world.deposit(pos, resource)?;
                }
            }
        }

        for pinned in &config.pinned {
            if let Some(biome) = &pinned.biome {
                world.biome(pinned.pos, biome)?;
            }
            if let Some(resource) = &pinned.deposit {
                world.deposit(pinned.pos, resource)?;
            }
        }

        for (start, pos) in config.factions.iter().zip(&starts) {
            place_start(&mut world, catalog, start, *pos, &passable, &mut rng)?;
        }
        tracing::debug!(
            seed,
            width = config.width,
            height = config.height,
            factions = config.factions.len(),
            "World generated"
        );
        Ok(world)
    }
}

fn place_start(
    world: &mut WorldBuilder<'_>,
    catalog: &Catalog,
    start: &FactionStart,
    pos: TilePos,
    passable: &str,
    rng: &mut SimRng,
) -> Result<()> {
    let data = catalog
        .get_faction(&start.id)
        .ok_or_else(|| GameError::missing("faction", &start.id))?;
    world.faction(&start.id)?;

    let home: Vec<TilePos> = world.state().grid.within(pos, 1);
    for tile in &home {
        let impassable = world
            .state()
            .tile(*tile)
            .and_then(|t| catalog.get_biome(&t.biome))
            .map_or(true, |biome| !biome.is_passable());
        if impassable {
            world.biome(*tile, passable)?;
        }
    }
    world.infrastructure(pos, &data.settlement, &start.id)?;

    for kind in &data.starting_units {
        world.unit(kind, &start.id, pos)?;
    }

    // one deposit per buildable extractor, on free tiles close to home
    let mut free: Vec<TilePos> = world
        .state()
        .grid
        .within(pos, START_CLEARANCE)
        .into_iter()
        .filter(|p| {
            world
                .state()
                .tile(*p)
                .is_some_and(|t| !t.is_built() && t.owner.is_none() && t.resource.is_none())
        })
        .collect();
    for infra in data.buildable.iter().filter_map(|id| catalog.get_infrastructure(id)) {
        let InfraKind::Extractor { resource, .. } = &infra.kind else {
            continue;
        };
        if free.is_empty() {
            break;
        }
        let index = usize::try_from(rng.range(0, u32::try_from(free.len()).unwrap_or(u32::MAX)))
            .unwrap_or(0);
        let site = free.remove(index.min(free.len() - 1));
        world.deposit(site, resource)?;
    }

    for (resource, amount) in &start.resources {
        world.stock(&start.id, resource, *amount)?;
    }
    world.population(&start.id, start.population)?;
    Ok(())
}
