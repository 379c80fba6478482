//! # Procedural Dungeon Builder
//!
//! Classic room-and-corridor generation: sample rooms with collision
//! rejection, carve the survivors, chain their centers with L-shaped
//! corridors, and roll monsters and items into each room.

use crate::game::{spawn, Actor, Grid, Position};
use crate::generation::Room;
use crate::{config, UndercityError, UndercityResult};
use log::debug;
use rand::rngs::StdRng;
use rand::Rng;

/// Output of one procedural build.
#[derive(Debug)]
pub struct BuiltDungeon {
    pub grid: Grid,
    /// Entry point: first room's center shifted one tile east.
    pub start: Position,
    /// Exit point: last room's center shifted one tile east.
    pub end: Position,
    /// Where the player lands on first entry (the first room's center).
    pub player_start: Position,
    /// Monsters and items rolled into the rooms.
    pub actors: Vec<Actor>,
    /// The accepted rooms, in placement order.
    pub rooms: Vec<Room>,
}

/// Room-and-corridor generator for the procedural floors.
#[derive(Debug, Clone)]
pub struct DungeonBuilder {
    pub width: i32,
    pub height: i32,
    pub room_attempts: u32,
}

impl DungeonBuilder {
    pub fn new() -> Self {
        Self {
            width: config::MAP_WIDTH,
            height: config::MAP_HEIGHT,
            room_attempts: config::ROOM_ATTEMPTS,
        }
    }

    /// Generates a floor.
    ///
    /// Each of the `room_attempts` samples is kept only when its bounding
    /// rectangle intersects no previously accepted room; accepted rooms are
    /// carved and connected to the previous room's center with an L-shaped
    /// corridor whose bend direction is chosen at random.
    pub fn generate(&self, rng: &mut StdRng) -> UndercityResult<BuiltDungeon> {
        let mut grid = Grid::blocked(self.width, self.height);
        let mut rooms: Vec<Room> = Vec::new();
        let mut actors = Vec::new();
        let mut player_start = Position::new(0, 0);

        for _ in 0..self.room_attempts {
            let w = rng.gen_range(config::MIN_ROOM_SIZE..=config::MAX_ROOM_SIZE);
            let h = rng.gen_range(config::MIN_ROOM_SIZE..=config::MAX_ROOM_SIZE);
            let x = rng.gen_range(0..self.width - w);
            let y = rng.gen_range(0..self.height - h);
            let room = Room::new(x, y, w, h);

            if rooms.iter().any(|other| room.intersects(other)) {
                continue;
            }

            self.carve_room(&mut grid, &room);

            if let Some(prev) = rooms.last() {
                let from = prev.center();
                let to = room.center();
                if rng.gen_bool(0.5) {
                    self.carve_h_tunnel(&mut grid, from.x, to.x, from.y);
                    self.carve_v_tunnel(&mut grid, from.y, to.y, to.x);
                } else {
                    self.carve_v_tunnel(&mut grid, from.y, to.y, from.x);
                    self.carve_h_tunnel(&mut grid, from.x, to.x, to.y);
                }
            } else {
                player_start = room.center();
            }

            self.populate_room(rng, &room, &mut actors);
            rooms.push(room);
        }

        if rooms.is_empty() {
            return Err(UndercityError::GenerationFailed(
                "failed to place any rooms".to_string(),
            ));
        }
        debug!("generated floor with {} rooms", rooms.len());

        let last_center = rooms[rooms.len() - 1].center();
        Ok(BuiltDungeon {
            grid,
            start: player_start.offset(1, 0),
            end: last_center.offset(1, 0),
            player_start,
            actors,
            rooms,
        })
    }

    fn carve_room(&self, grid: &mut Grid, room: &Room) {
        for y in (room.y1 + 1)..room.y2 {
            for x in (room.x1 + 1)..room.x2 {
                if let Some(tile) = grid.tile_mut(Position::new(x, y)) {
                    tile.walkable = true;
                }
            }
        }
    }

    fn carve_h_tunnel(&self, grid: &mut Grid, x1: i32, x2: i32, y: i32) {
        for x in x1.min(x2)..=x1.max(x2) {
            if let Some(tile) = grid.tile_mut(Position::new(x, y)) {
                tile.walkable = true;
            }
        }
    }

    fn carve_v_tunnel(&self, grid: &mut Grid, y1: i32, y2: i32, x: i32) {
        for y in y1.min(y2)..=y1.max(y2) {
            if let Some(tile) = grid.tile_mut(Position::new(x, y)) {
                tile.walkable = true;
            }
        }
    }

    fn populate_room(&self, rng: &mut StdRng, room: &Room, actors: &mut Vec<Actor>) {
        let monsters = rng.gen_range(0..=config::MAX_ROOM_MONSTERS);
        for _ in 0..monsters {
            let pos = self.interior_position(rng, room);
            actors.push(spawn::room_monster(rng, pos));
        }

        let items = rng.gen_range(0..=config::MAX_ROOM_ITEMS);
        for _ in 0..items {
            let pos = self.interior_position(rng, room);
            actors.push(spawn::room_item(rng, pos));
        }
    }

    fn interior_position(&self, rng: &mut StdRng, room: &Room) -> Position {
        Position::new(
            rng.gen_range(room.x1 + 1..room.x2),
            rng.gen_range(room.y1 + 1..room.y2),
        )
    }
}

impl Default for DungeonBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_generation_produces_walkable_entry_and_exit() {
        let builder = DungeonBuilder::new();
        let mut rng = StdRng::seed_from_u64(12345);
        let built = builder.generate(&mut rng).unwrap();

        assert!(!built.grid.is_wall(built.start));
        assert!(!built.grid.is_wall(built.end));
        assert!(!built.grid.is_wall(built.player_start));
        assert_eq!(built.start, built.player_start.offset(1, 0));
    }

    #[test]
    fn test_generated_actors_sit_on_walkable_tiles() {
        let builder = DungeonBuilder::new();
        let mut rng = StdRng::seed_from_u64(777);
        let built = builder.generate(&mut rng).unwrap();

        for actor in &built.actors {
            assert!(
                !built.grid.is_wall(actor.pos),
                "{} spawned inside a wall at {:?}",
                actor.name,
                actor.pos
            );
        }
    }

    #[test]
    fn test_generation_is_deterministic_per_seed() {
        let builder = DungeonBuilder::new();
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        let a = builder.generate(&mut rng_a).unwrap();
        let b = builder.generate(&mut rng_b).unwrap();

        assert_eq!(a.start, b.start);
        assert_eq!(a.end, b.end);
        assert_eq!(a.actors.len(), b.actors.len());
    }
}
