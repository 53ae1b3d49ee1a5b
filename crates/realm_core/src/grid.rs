//! The tile grid every other system reads and writes.
//!
//! Tiles are stored row-major; iteration order is always `y` then `x`,
//! which is the deterministic order phases sweep the map in.
//!
//! Multi-tile structures keep their infrastructure id, capacity and
//! ownership on a single root tile. Satellite tiles only carry
//! `structure_root` pointing back at it.

use serde::{Deserialize, Serialize};

use crate::components::UnitInstance;
use crate::error::{GameError, Result};
use crate::factions::FactionId;

/// Tile coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TilePos {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl TilePos {
    /// Create a position.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance.
    #[must_use]
    pub const fn distance(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// One orthogonal step toward `target`, along the longer axis first.
    ///
    /// Returns `self` when already there.
    #[must_use]
    pub fn step_toward(self, target: Self) -> Self {
        let dx = self.x.abs_diff(target.x);
        let dy = self.y.abs_diff(target.y);
        if dx == 0 && dy == 0 {
            return self;
        }
        if dx >= dy {
            let x = if target.x > self.x { self.x + 1 } else { self.x - 1 };
            Self::new(x, self.y)
        } else {
            let y = if target.y > self.y { self.y + 1 } else { self.y - 1 };
            Self::new(self.x, y)
        }
    }
}

/// A world-event marker placed on a tile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldEventMarker {
    /// Catalog world-event id.
    pub id: String,
    /// Tick at which the marker is cleared.
    pub expires_at: u64,
}

/// One cell of the world.
#[derive(Debug, Clone, PartialEq, Hash, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Coordinates.
    pub pos: TilePos,
    /// Catalog biome id.
    pub biome: String,
    /// Deposit currently under the tile.
    pub resource: Option<String>,
    /// Tick after which a depleted tile may regrow a deposit.
    pub respawn_at: Option<u64>,
    /// Installed infrastructure (root tiles only).
    pub infrastructure: Option<String>,
    /// Owning faction.
    pub owner: Option<FactionId>,
    /// Root of the multi-tile structure this satellite belongs to.
    pub structure_root: Option<TilePos>,
    /// Units standing here. Every unit's `pos` equals this tile's `pos`.
    pub units: Vec<UnitInstance>,
    /// Active world event.
    pub world_event: Option<WorldEventMarker>,
}

impl Tile {
    /// Empty, unowned tile.
    #[must_use]
    pub fn new(pos: TilePos, biome: impl Into<String>) -> Self {
        Self {
            pos,
            biome: biome.into(),
            resource: None,
            respawn_at: None,
            infrastructure: None,
            owner: None,
            structure_root: None,
            units: Vec::new(),
            world_event: None,
        }
    }

    /// Whether any structure occupies the tile.
    #[must_use]
    pub const fn is_built(&self) -> bool {
        self.infrastructure.is_some() || self.structure_root.is_some()
    }

    /// Whether `faction` owns the tile.
    #[must_use]
    pub fn is_owned_by(&self, faction: &str) -> bool {
        self.owner.as_deref() == Some(faction)
    }
}

/// Fixed-size 2D array of tiles.
#[derive(Debug, Clone, PartialEq, Hash, Eq, Serialize, Deserialize)]
pub struct WorldGrid {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

impl WorldGrid {
    /// A grid filled with one biome.
    #[must_use]
    pub fn new(width: u32, height: u32, biome: &str) -> Self {
        let mut tiles = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                tiles.push(Tile::new(TilePos::new(x, y), biome));
            }
        }
        Self {
            width,
            height,
            tiles,
        }
    }

    /// Width in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Whether `pos` lies on the grid.
    #[must_use]
    pub const fn contains(&self, pos: TilePos) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    fn index(&self, pos: TilePos) -> Option<usize> {
        self.contains(pos)
            .then(|| (pos.y * self.width + pos.x) as usize)
    }

    /// Tile at `pos`.
    #[must_use]
    pub fn get(&self, pos: TilePos) -> Option<&Tile> {
        self.index(pos).and_then(|i| self.tiles.get(i))
    }

    /// Mutable tile at `pos`.
    pub fn get_mut(&mut self, pos: TilePos) -> Option<&mut Tile> {
        self.index(pos).and_then(move |i| self.tiles.get_mut(i))
    }

    /// All tiles, row-major.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// All tiles mutably, row-major.
    pub fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.iter_mut()
    }

    /// Orthogonal neighbours in N, E, S, W order.
    #[must_use]
    pub fn neighbors(&self, pos: TilePos) -> Vec<TilePos> {
        let mut out = Vec::with_capacity(4);
        if pos.y > 0 {
            out.push(TilePos::new(pos.x, pos.y - 1));
        }
        if pos.x + 1 < self.width {
            out.push(TilePos::new(pos.x + 1, pos.y));
        }
        if pos.y + 1 < self.height {
            out.push(TilePos::new(pos.x, pos.y + 1));
        }
        if pos.x > 0 {
            out.push(TilePos::new(pos.x - 1, pos.y));
        }
        out
    }

    /// Positions within Manhattan `radius` of `center`, row-major.
    #[must_use]
    pub fn within(&self, center: TilePos, radius: u32) -> Vec<TilePos> {
        let x0 = center.x.saturating_sub(radius);
        let y0 = center.y.saturating_sub(radius);
        let x1 = (center.x + radius).min(self.width.saturating_sub(1));
        let y1 = (center.y + radius).min(self.height.saturating_sub(1));
        let mut out = Vec::new();
        for y in y0..=y1 {
            for x in x0..=x1 {
                let pos = TilePos::new(x, y);
                if pos.distance(center) <= radius {
                    out.push(pos);
                }
            }
        }
        out
    }

    /// The root tile of the structure covering `pos`.
    #[must_use]
    pub fn root_of(&self, pos: TilePos) -> TilePos {
        self.get(pos)
            .and_then(|tile| tile.structure_root)
            .unwrap_or(pos)
    }

    /// Tiles covered by a `size`×`size` footprint rooted at `root`.
    #[must_use]
    pub fn footprint(root: TilePos, size: u32) -> Vec<TilePos> {
        let mut out = Vec::with_capacity((size * size) as usize);
        for dy in 0..size.max(1) {
            for dx in 0..size.max(1) {
                out.push(TilePos::new(root.x + dx, root.y + dy));
            }
        }
        out
    }

    /// Check that a footprint is free for `owner`.
    ///
    /// Every covered tile must be on the grid, unbuilt, and either
    /// unowned or owned by `owner`.
    pub fn check_placement(&self, root: TilePos, size: u32, owner: &str) -> Result<()> {
        for pos in Self::footprint(root, size) {
            let reject = |reason: &str| GameError::InvalidPlacement {
                x: pos.x,
                y: pos.y,
                reason: reason.to_string(),
            };
            let tile = self.get(pos).ok_or_else(|| reject("off the map"))?;
            if tile.is_built() {
                return Err(reject("already built"));
            }
            if tile.owner.as_deref().is_some_and(|o| o != owner) {
                return Err(reject("owned by another faction"));
            }
        }
        Ok(())
    }

    /// Install a structure and claim its footprint.
    pub fn place_structure(
        &mut self,
        root: TilePos,
        size: u32,
        infrastructure: &str,
        owner: &str,
    ) -> Result<()> {
        self.check_placement(root, size, owner)?;
        for pos in Self::footprint(root, size) {
            if let Some(tile) = self.get_mut(pos) {
                tile.owner = Some(owner.to_string());
                if pos == root {
                    tile.infrastructure = Some(infrastructure.to_string());
                } else {
                    tile.structure_root = Some(root);
                }
            }
        }
        Ok(())
    }

    /// Tiles a `size`×`size` structure at `root` would cover that it does not yet.
    fn growth_tiles(&self, root: TilePos, size: u32) -> Vec<TilePos> {
        Self::footprint(root, size)
            .into_iter()
            .filter(|pos| *pos != root)
            .filter(|pos| self.get(*pos).and_then(|tile| tile.structure_root) != Some(root))
            .collect()
    }

    /// Check that the structure at `root` can widen to `size`.
    ///
    /// Every newly covered tile must pass [`Self::check_placement`].
    pub fn check_growth(&self, root: TilePos, size: u32, owner: &str) -> Result<()> {
        for pos in self.growth_tiles(root, size) {
            self.check_placement(pos, 1, owner)?;
        }
        Ok(())
    }

    /// Widen the structure at `root` to a `size`×`size` footprint.
    ///
    /// Nothing is claimed when any new tile is blocked.
    pub fn grow_structure(&mut self, root: TilePos, size: u32, owner: &str) -> Result<()> {
        self.check_growth(root, size, owner)?;
        for pos in self.growth_tiles(root, size) {
            if let Some(tile) = self.get_mut(pos) {
                tile.owner = Some(owner.to_string());
                tile.structure_root = Some(root);
            }
        }
        Ok(())
    }
}
