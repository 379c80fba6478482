//! # World Representation & Persistence
//!
//! The tile grid with its visibility query, the per-level snapshot record,
//! the ordered five-level world state, and the full-game save record.
//!
//! Only the active level has a live grid and live actors. Every other level
//! holds a frozen layout plus `ActorRecord` snapshots; actors there are
//! reconstructed by name when the level is re-entered.

use crate::game::{Actor, Position};
use crate::{config, UndercityError, UndercityResult};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// One grid cell.
///
/// `prop` holds the raw template marker for fixture tiles (`'0'` = none);
/// it is resolved into a prop actor on the level's first load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub walkable: bool,
    pub explored: bool,
    pub outdoor: bool,
    pub prop: char,
}

impl Default for Tile {
    fn default() -> Self {
        Self {
            walkable: false,
            explored: false,
            outdoor: false,
            prop: '0',
        }
    }
}

/// Row-major tile grid with a transient field-of-view overlay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
    tiles: Vec<Tile>,
    #[serde(skip)]
    visible: Vec<bool>,
}

impl Grid {
    /// Creates a fully blocked, unexplored grid.
    pub fn blocked(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            tiles: vec![Tile::default(); (width * height) as usize],
            visible: Vec::new(),
        }
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    fn index(&self, pos: Position) -> usize {
        (pos.x + pos.y * self.width) as usize
    }

    pub fn tile(&self, pos: Position) -> Option<&Tile> {
        if self.in_bounds(pos) {
            Some(&self.tiles[self.index(pos)])
        } else {
            None
        }
    }

    pub fn tile_mut(&mut self, pos: Position) -> Option<&mut Tile> {
        if self.in_bounds(pos) {
            let idx = self.index(pos);
            Some(&mut self.tiles[idx])
        } else {
            None
        }
    }

    pub fn is_wall(&self, pos: Position) -> bool {
        self.tile(pos).map(|t| !t.walkable).unwrap_or(true)
    }

    pub fn is_explored(&self, pos: Position) -> bool {
        self.tile(pos).map(|t| t.explored).unwrap_or(false)
    }

    /// Whether the tile is inside the most recently computed field of view.
    pub fn is_in_view(&self, pos: Position) -> bool {
        if !self.in_bounds(pos) || self.visible.is_empty() {
            return false;
        }
        self.visible[self.index(pos)]
    }

    /// Recomputes the field of view from `origin`.
    ///
    /// A tile is visible when it lies within [`config::FOV_RADIUS`] and the
    /// straight line from the origin reaches it without crossing a wall.
    /// Every visible tile is marked explored; exploration never resets.
    pub fn compute_fov(&mut self, origin: Position) {
        self.visible = vec![false; self.tiles.len()];
        let radius = config::FOV_RADIUS;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let pos = origin.offset(dx, dy);
                if !self.in_bounds(pos) || origin.distance(pos) > radius as f32 {
                    continue;
                }
                if self.line_clear(origin, pos) {
                    let idx = self.index(pos);
                    self.visible[idx] = true;
                    self.tiles[idx].explored = true;
                }
            }
        }
    }

    /// Bresenham walk from `from` to `to`; true when no strictly intermediate
    /// cell is a wall. Walls themselves are therefore visible from adjacent
    /// open tiles.
    fn line_clear(&self, from: Position, to: Position) -> bool {
        let mut x = from.x;
        let mut y = from.y;
        let dx = (to.x - from.x).abs();
        let dy = -(to.y - from.y).abs();
        let sx = if from.x < to.x { 1 } else { -1 };
        let sy = if from.y < to.y { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            if (x, y) != (from.x, from.y) && (x, y) != (to.x, to.y) {
                if self.is_wall(Position::new(x, y)) {
                    return false;
                }
            }
            if (x, y) == (to.x, to.y) {
                return true;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}

/// Minimal persisted projection of a live actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRecord {
    pub x: i32,
    pub y: i32,
    pub name: String,
    pub dead: bool,
}

impl ActorRecord {
    pub fn capture(actor: &Actor) -> Self {
        Self {
            x: actor.pos.x,
            y: actor.pos.y,
            name: actor.name.clone(),
            dead: actor.is_dead(),
        }
    }
}

/// One dungeon floor.
///
/// `procedural` is true until the floor has been generated and frozen; a
/// frozen floor replays its stored layout and actor snapshot on every
/// subsequent entry, within a session and across saves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level {
    pub procedural: bool,
    pub layout: Option<Grid>,
    pub start: Position,
    pub end: Position,
    pub actors: Vec<ActorRecord>,
    pub props_resolved: bool,
}

impl Level {
    /// A template-built floor: never procedural, layout parsed on first load.
    pub fn template() -> Self {
        Self {
            procedural: false,
            layout: None,
            start: Position::new(0, 0),
            end: Position::new(0, 0),
            actors: Vec::new(),
            props_resolved: false,
        }
    }

    /// A procedural floor, generated on first entry.
    pub fn procedural() -> Self {
        Self {
            procedural: true,
            ..Self::template()
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.layout.is_some()
    }
}

/// The ordered world: five floors, the active index, and the revolver
/// cylinder counter.
#[derive(Debug)]
pub struct WorldState {
    levels: Vec<Level>,
    current: usize,
    pub ammo: u32,
}

impl WorldState {
    /// A fresh world: floors 0, 1 and 4 come from templates, 2 and 3 are
    /// procedural.
    pub fn new() -> Self {
        let levels = (0..config::LEVEL_COUNT)
            .map(|idx| {
                if config::TEMPLATE_LEVELS.contains(&idx) {
                    Level::template()
                } else {
                    Level::procedural()
                }
            })
            .collect();
        Self {
            levels,
            current: 0,
            ammo: 0,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_last_level(&self) -> bool {
        self.current == config::LEVEL_COUNT - 1
    }

    pub fn level(&self, index: usize) -> &Level {
        &self.levels[index]
    }

    pub fn current_level(&self) -> &Level {
        &self.levels[self.current]
    }

    pub fn current_level_mut(&mut self) -> &mut Level {
        &mut self.levels[self.current]
    }

    /// Leaves the active floor: a still-procedural floor is frozen first
    /// (generation happens at most once), then every live actor is
    /// snapshotted, replacing the prior snapshot.
    pub fn depart(&mut self, grid: &Grid, actors: &[Actor]) {
        let level = &mut self.levels[self.current];
        if level.procedural {
            level.layout = Some(grid.clone());
            level.procedural = false;
        }
        level.actors = actors.iter().map(ActorRecord::capture).collect();
    }

    /// Moves the active index one step. Levels are navigated one at a time;
    /// out-of-range steps are a caller bug.
    pub fn step(&mut self, forward: bool) -> UndercityResult<()> {
        let target = if forward {
            self.current + 1
        } else {
            self.current.checked_sub(1).unwrap_or(usize::MAX)
        };
        if target >= config::LEVEL_COUNT {
            return Err(UndercityError::InvalidState(format!(
                "cannot step {} from level {}",
                if forward { "forward" } else { "backward" },
                self.current
            )));
        }
        self.current = target;
        Ok(())
    }

    fn from_save(save: SaveGame) -> Self {
        Self {
            levels: save.levels,
            current: save.current,
            ammo: save.ammo,
        }
    }
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new()
    }
}

/// The on-disk save record. Item behavior is not serialized; the inventory
/// is reduced to names and re-derived through the factory table on load.
#[derive(Debug, Serialize, Deserialize)]
pub struct SaveGame {
    pub levels: Vec<Level>,
    pub current: usize,
    pub hp: f32,
    pub ammo: u32,
    pub inventory: Vec<String>,
}

impl SaveGame {
    /// Captures the world and the player into a save record. The caller is
    /// expected to have run [`WorldState::depart`] first so the active floor
    /// is frozen and snapshotted.
    pub fn capture(state: &WorldState, player: &Actor) -> Self {
        Self {
            levels: state.levels.clone(),
            current: state.current,
            hp: player
                .destructible
                .as_ref()
                .map(|d| d.hp)
                .unwrap_or(config::PLAYER_HP),
            ammo: state.ammo,
            inventory: player
                .container
                .as_ref()
                .map(|c| c.names())
                .unwrap_or_default(),
        }
    }

    /// Rebuilds the world state from this record.
    pub fn into_world(self) -> WorldState {
        WorldState::from_save(self)
    }
}

/// Runtime configuration, passed explicitly into the persistence layer.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub save_path: PathBuf,
}

impl GameConfig {
    pub fn new(save_path: PathBuf) -> Self {
        Self { save_path }
    }
}

/// Writes the save record to the configured path as JSON.
pub fn write_save(game_config: &GameConfig, save: &SaveGame) -> UndercityResult<()> {
    if let Some(parent) = game_config.save_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(save)?;
    fs::write(&game_config.save_path, json)?;
    info!("game saved to {}", game_config.save_path.display());
    Ok(())
}

/// Reads the save record. A missing or corrupt file is treated as "no
/// save"; it is never fatal.
pub fn read_save(game_config: &GameConfig) -> Option<SaveGame> {
    let raw = match fs::read_to_string(&game_config.save_path) {
        Ok(raw) => raw,
        Err(_) => return None,
    };
    let save: SaveGame = match serde_json::from_str(&raw) {
        Ok(save) => save,
        Err(err) => {
            warn!("ignoring corrupt save: {}", err);
            return None;
        }
    };
    if save.levels.len() != config::LEVEL_COUNT || save.current >= config::LEVEL_COUNT {
        warn!("ignoring malformed save: wrong level count or index");
        return None;
    }
    Some(save)
}

/// Removes any existing save record, so a new game never resumes stale
/// state.
pub fn delete_save(game_config: &GameConfig) {
    if game_config.save_path.exists() {
        if let Err(err) = fs::remove_file(&game_config.save_path) {
            warn!("could not delete save: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::spawn;

    fn open_grid(width: i32, height: i32) -> Grid {
        let mut grid = Grid::blocked(width, height);
        for y in 0..height {
            for x in 0..width {
                grid.tile_mut(Position::new(x, y)).unwrap().walkable = true;
            }
        }
        grid
    }

    #[test]
    fn test_grid_bounds_and_walls() {
        let grid = Grid::blocked(10, 5);
        assert!(grid.in_bounds(Position::new(9, 4)));
        assert!(!grid.in_bounds(Position::new(10, 4)));
        assert!(grid.is_wall(Position::new(3, 3)));
        assert!(grid.is_wall(Position::new(-1, 0)));
    }

    #[test]
    fn test_fov_is_radius_limited_and_marks_explored() {
        let mut grid = open_grid(40, 40);
        let origin = Position::new(20, 20);
        grid.compute_fov(origin);

        assert!(grid.is_in_view(origin));
        assert!(grid.is_in_view(Position::new(20 + config::FOV_RADIUS, 20)));
        assert!(!grid.is_in_view(Position::new(20 + config::FOV_RADIUS + 1, 20)));

        assert!(grid.is_explored(Position::new(25, 20)));
        assert!(!grid.is_explored(Position::new(0, 0)));
    }

    #[test]
    fn test_fov_blocked_by_walls() {
        let mut grid = open_grid(20, 20);
        // Wall segment between the origin and the far side.
        for y in 0..20 {
            grid.tile_mut(Position::new(10, y)).unwrap().walkable = false;
        }
        grid.compute_fov(Position::new(5, 10));

        // The wall itself is visible, the space behind it is not.
        assert!(grid.is_in_view(Position::new(10, 10)));
        assert!(!grid.is_in_view(Position::new(12, 10)));
    }

    #[test]
    fn test_explored_is_monotonic_across_recompute() {
        let mut grid = open_grid(40, 40);
        grid.compute_fov(Position::new(5, 5));
        assert!(grid.is_explored(Position::new(8, 5)));

        // Move far away; the old area leaves view but stays explored.
        grid.compute_fov(Position::new(35, 35));
        assert!(!grid.is_in_view(Position::new(8, 5)));
        assert!(grid.is_explored(Position::new(8, 5)));
    }

    #[test]
    fn test_depart_freezes_procedural_level_once() {
        let mut state = WorldState::new();
        // Level 2 is procedural.
        state.current = 2;
        assert!(state.current_level().procedural);

        let grid = open_grid(10, 10);
        state.depart(&grid, &[]);
        assert!(!state.current_level().procedural);
        assert!(state.current_level().is_frozen());

        // A later depart must not replace the frozen layout.
        let mut other = open_grid(10, 10);
        other.tile_mut(Position::new(0, 0)).unwrap().walkable = false;
        state.depart(&other, &[]);
        assert!(state
            .current_level()
            .layout
            .as_ref()
            .unwrap()
            .tile(Position::new(0, 0))
            .unwrap()
            .walkable);
    }

    #[test]
    fn test_depart_replaces_snapshot() {
        let mut state = WorldState::new();
        let grid = open_grid(10, 10);
        let thug = spawn::from_name("thug", Position::new(3, 3), 0).unwrap();
        state.depart(&grid, &[thug]);
        assert_eq!(state.current_level().actors.len(), 1);
        assert_eq!(state.current_level().actors[0].name, "thug");
        assert!(!state.current_level().actors[0].dead);

        state.depart(&grid, &[]);
        assert!(state.current_level().actors.is_empty());
    }

    #[test]
    fn test_step_is_bounded() {
        let mut state = WorldState::new();
        assert!(state.step(false).is_err());
        assert!(state.step(true).is_ok());
        assert_eq!(state.current_index(), 1);

        state.current = config::LEVEL_COUNT - 1;
        assert!(state.step(true).is_err());
    }

    #[test]
    fn test_save_capture_reduces_inventory_to_names() {
        let mut state = WorldState::new();
        state.ammo = 3;
        let mut player = spawn::player(Position::new(1, 1));
        let bandage = spawn::from_name("bandage", Position::new(0, 0), 0).unwrap();
        player.container.as_mut().unwrap().add(bandage).unwrap();
        player.destructible.as_mut().unwrap().hp = 21.0;

        let save = SaveGame::capture(&state, &player);
        assert_eq!(save.hp, 21.0);
        assert_eq!(save.ammo, 3);
        assert_eq!(save.inventory, vec!["bandage"]);
        assert_eq!(save.levels.len(), config::LEVEL_COUNT);
    }

    #[test]
    fn test_read_save_rejects_corrupt_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let game_config = GameConfig::new(dir.path().join("save.json"));

        assert!(read_save(&game_config).is_none());

        fs::write(&game_config.save_path, "{ not json").unwrap();
        assert!(read_save(&game_config).is_none());

        fs::write(&game_config.save_path, "{\"levels\":[],\"current\":0,\"hp\":1.0,\"ammo\":0,\"inventory\":[]}").unwrap();
        assert!(read_save(&game_config).is_none());
    }
}
