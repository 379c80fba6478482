//! Property tests for the level builders: room non-overlap, reachable
//! entry and exit points, and template connectivity.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::VecDeque;
use undercity::generation::{parse, template_source, DungeonBuilder};
use undercity::{Grid, Position};

/// Breadth-first reachability over walkable tiles.
fn path_exists(grid: &Grid, from: Position, to: Position) -> bool {
    let mut seen = vec![false; (grid.width * grid.height) as usize];
    let mut queue = VecDeque::new();
    seen[(from.x + from.y * grid.width) as usize] = true;
    queue.push_back(from);

    while let Some(pos) = queue.pop_front() {
        if pos == to {
            return true;
        }
        for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            let next = pos.offset(dx, dy);
            if !grid.in_bounds(next) || grid.is_wall(next) {
                continue;
            }
            let idx = (next.x + next.y * grid.width) as usize;
            if !seen[idx] {
                seen[idx] = true;
                queue.push_back(next);
            }
        }
    }
    false
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_rooms_never_overlap(seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let built = DungeonBuilder::new().generate(&mut rng).unwrap();
        for (i, a) in built.rooms.iter().enumerate() {
            for b in &built.rooms[i + 1..] {
                prop_assert!(!a.intersects(b), "rooms {:?} and {:?} overlap", a, b);
            }
        }
    }

    #[test]
    fn prop_entry_and_exit_are_walkable_and_connected(seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let built = DungeonBuilder::new().generate(&mut rng).unwrap();
        prop_assert!(!built.grid.is_wall(built.start));
        prop_assert!(!built.grid.is_wall(built.end));
        prop_assert!(path_exists(&built.grid, built.start, built.end));
    }
}

#[test]
fn test_templates_connect_entry_to_exit() {
    for index in undercity::config::TEMPLATE_LEVELS {
        let parsed = parse(template_source(index).unwrap()).unwrap();
        assert!(
            path_exists(&parsed.grid, parsed.start, parsed.end),
            "template {} has no path from entry to exit",
            index
        );
    }
}

#[test]
fn test_template_seeded_actors_stand_on_walkable_tiles() {
    for index in undercity::config::TEMPLATE_LEVELS {
        let parsed = parse(template_source(index).unwrap()).unwrap();
        for record in &parsed.actors {
            assert!(
                !parsed.grid.is_wall(Position::new(record.x, record.y)),
                "template {}: {} stands in a wall",
                index,
                record.name
            );
        }
    }
}
