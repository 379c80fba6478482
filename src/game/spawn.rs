//! # Actor Factories
//!
//! Every actor kind the game knows is built here: the name table that
//! reconstructs snapshotted actors and saved inventory items, the prop
//! marker table that resolves template tiles into fixtures, and the random
//! tables the dungeon builder rolls per room.
//!
//! Snapshots persist `{x, y, name, dead}` only, so anything that must
//! survive a level transition is keyed by name, including one-shot prop
//! state ("door" vs "open door", "memo N" vs "read memo").

use crate::config;
use crate::game::{
    Actor, ActorRecord, Ai, Attacker, Container, DeathKind, Destructible, ItemEffect, Position,
};
use crate::ui::Color;
use rand::rngs::StdRng;
use rand::Rng;

/// Builds the player actor at the given position.
pub fn player(pos: Position) -> Actor {
    let mut actor = Actor::new(pos, '@', "player", Color::White);
    actor.destructible = Some(Destructible::new(
        config::PLAYER_HP,
        config::PLAYER_DEFENSE,
        "your corpse",
        DeathKind::Player,
    ));
    actor.attacker = Some(Attacker::new(config::PLAYER_POWER));
    actor.ai = Some(Ai::Player);
    actor.container = Some(Container::new(config::INVENTORY_CAPACITY));
    actor
}

fn thug(pos: Position) -> Actor {
    let mut actor = Actor::new(pos, 't', "thug", Color::DarkBlue);
    actor.destructible = Some(Destructible::new(
        config::MONSTER_HP,
        config::MONSTER_DEFENSE,
        "dead thug",
        DeathKind::Monster,
    ));
    actor.attacker = Some(Attacker::new(config::MONSTER_POWER));
    actor.ai = Some(Ai::monster());
    actor
}

fn gangster(pos: Position) -> Actor {
    let mut actor = Actor::new(pos, 'g', "gangster", Color::Crimson);
    actor.destructible = Some(Destructible::new(
        config::MONSTER_HP,
        config::MONSTER_DEFENSE,
        "dead gangster",
        DeathKind::Monster,
    ));
    actor.attacker = Some(Attacker::new(config::MONSTER_POWER));
    actor.ai = Some(Ai::monster());
    actor
}

fn dead_body(pos: Position) -> Actor {
    let mut actor = Actor::new(pos, '%', "dead body", Color::DarkRed);
    actor.blocks = false;
    actor
}

fn bandage(pos: Position) -> Actor {
    let mut actor = Actor::new(pos, '!', "bandage", Color::Violet);
    actor.blocks = false;
    actor.item = Some(ItemEffect::Healer {
        amount: config::HEAL_AMOUNT,
    });
    actor
}

fn rock(pos: Position) -> Actor {
    let mut actor = Actor::new(pos, '#', "rock", Color::DarkBlue);
    actor.blocks = false;
    actor.item = Some(ItemEffect::Confuser {
        turns: config::CONFUSE_TURNS,
        range: config::CONFUSE_RANGE,
    });
    actor
}

fn pistol(pos: Position) -> Actor {
    let mut actor = Actor::new(pos, '#', "pistol", Color::DarkYellow);
    actor.blocks = false;
    actor.item = Some(ItemEffect::Gun {
        range: config::GUN_RANGE,
        damage: config::GUN_DAMAGE,
    });
    actor
}

fn grenade(pos: Position) -> Actor {
    let mut actor = Actor::new(pos, '#', "grenade", Color::DarkRed);
    actor.blocks = false;
    actor.item = Some(ItemEffect::Grenade {
        radius: config::GRENADE_RADIUS,
        damage: config::GRENADE_DAMAGE,
    });
    actor
}

fn rounds(pos: Position) -> Actor {
    let mut actor = Actor::new(pos, 'a', "rounds", Color::Gold);
    actor.blocks = false;
    actor.item = Some(ItemEffect::Ammo);
    actor
}

fn girl(pos: Position) -> Actor {
    let mut actor = Actor::new(pos, 'W', "girl", Color::LightGreen);
    actor.blocks = false;
    actor.item = Some(ItemEffect::Win);
    actor
}

fn desk(pos: Position) -> Actor {
    Actor::new(pos, 'd', "desk", Color::Grey)
}

fn door(pos: Position, open: bool) -> Actor {
    let (glyph, name) = if open { ('/', "open door") } else { ('+', "door") };
    let mut actor = Actor::new(pos, glyph, name, Color::Orange);
    actor.blocks = !open;
    actor.item = Some(ItemEffect::Door { open });
    actor
}

fn memo(pos: Position, level: usize, index: u8, used: bool) -> Actor {
    let name = if used {
        "read memo".to_string()
    } else {
        format!("memo {}", index)
    };
    let mut actor = Actor::new(pos, '?', &name, Color::Sea);
    actor.blocks = false;
    actor.item = Some(ItemEffect::Story { level, index, used });
    actor
}

/// Builds a live actor by name.
///
/// This is the single table behind snapshot reconstruction, saved-inventory
/// reload and prop persistence. Names with no row here ("player", "stairs")
/// return `None` and are skipped by callers.
pub fn from_name(name: &str, pos: Position, level: usize) -> Option<Actor> {
    match name {
        "thug" => Some(thug(pos)),
        "gangster" => Some(gangster(pos)),
        "dead body" => Some(dead_body(pos)),
        "bandage" => Some(bandage(pos)),
        "rock" => Some(rock(pos)),
        "pistol" => Some(pistol(pos)),
        "grenade" => Some(grenade(pos)),
        "rounds" => Some(rounds(pos)),
        "girl" => Some(girl(pos)),
        "desk" => Some(desk(pos)),
        "door" => Some(door(pos, false)),
        "open door" => Some(door(pos, true)),
        "read memo" => Some(memo(pos, level, 0, true)),
        _ => {
            if let Some(index) = name.strip_prefix("memo ") {
                let index: u8 = index.parse().ok()?;
                return Some(memo(pos, level, index, false));
            }
            None
        }
    }
}

/// Reconstructs a snapshotted actor. Monsters that died before the snapshot
/// come back as plain corpses.
pub fn from_record(record: &ActorRecord, level: usize) -> Option<Actor> {
    let pos = Position::new(record.x, record.y);
    if record.dead {
        return Some(dead_body(pos));
    }
    from_name(&record.name, pos, level)
}

/// Resolves a template prop marker into its fixture actor.
pub fn from_prop_marker(marker: char, pos: Position, level: usize) -> Option<Actor> {
    match marker {
        'd' => Some(desk(pos)),
        '%' => Some(dead_body(pos)),
        '+' => Some(door(pos, false)),
        '!' => Some(bandage(pos)),
        'a' => Some(rounds(pos)),
        '#' => Some(rock(pos)),
        '*' => Some(grenade(pos)),
        '1'..='9' => Some(memo(pos, level, marker as u8 - b'0', false)),
        _ => None,
    }
}

/// Rolls one monster for a procedural room: mostly thugs, the odd gangster.
pub fn room_monster(rng: &mut StdRng, pos: Position) -> Actor {
    if rng.gen_range(0..100) < 80 {
        thug(pos)
    } else {
        gangster(pos)
    }
}

/// Rolls one item for a procedural room.
pub fn room_item(rng: &mut StdRng, pos: Position) -> Actor {
    let roll: f32 = rng.gen();
    if roll < 0.10 {
        bandage(pos)
    } else if roll < 0.50 {
        rock(pos)
    } else if roll < 0.70 {
        rounds(pos)
    } else if roll < 0.80 {
        pistol(pos)
    } else {
        grenade(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_table_round_trips_monsters() {
        let pos = Position::new(3, 4);
        let actor = from_name("thug", pos, 0).unwrap();
        assert_eq!(actor.pos, pos);
        assert!(actor.is_alive());
        assert!(actor.attacker.is_some());
        assert_eq!(actor.ai, Some(Ai::monster()));
    }

    #[test]
    fn test_unknown_names_are_skipped() {
        let pos = Position::new(0, 0);
        assert!(from_name("player", pos, 0).is_none());
        assert!(from_name("stairs", pos, 0).is_none());
    }

    #[test]
    fn test_dead_record_reconstructs_as_corpse() {
        let record = ActorRecord {
            x: 7,
            y: 8,
            name: "gangster".to_string(),
            dead: true,
        };
        let corpse = from_record(&record, 2).unwrap();
        assert_eq!(corpse.name, "dead body");
        assert_eq!(corpse.glyph, '%');
        assert!(!corpse.blocks);
        assert!(corpse.destructible.is_none());
    }

    #[test]
    fn test_memo_state_survives_by_name() {
        let pos = Position::new(1, 1);
        let fresh = from_name("memo 3", pos, 1).unwrap();
        assert_eq!(
            fresh.item,
            Some(ItemEffect::Story {
                level: 1,
                index: 3,
                used: false
            })
        );

        let spent = from_name("read memo", pos, 1).unwrap();
        match spent.item {
            Some(ItemEffect::Story { used, .. }) => assert!(used),
            other => panic!("expected a story prop, got {:?}", other),
        }
    }

    #[test]
    fn test_door_state_survives_by_name() {
        let pos = Position::new(2, 2);
        let closed = from_name("door", pos, 0).unwrap();
        assert!(closed.blocks);
        let open = from_name("open door", pos, 0).unwrap();
        assert!(!open.blocks);
        assert_eq!(open.glyph, '/');
    }

    #[test]
    fn test_prop_marker_table() {
        let pos = Position::new(0, 0);
        assert_eq!(from_prop_marker('d', pos, 0).unwrap().name, "desk");
        assert_eq!(from_prop_marker('+', pos, 0).unwrap().name, "door");
        assert_eq!(from_prop_marker('5', pos, 1).unwrap().name, "memo 5");
        assert!(from_prop_marker('0', pos, 0).is_none());
        assert!(from_prop_marker(' ', pos, 0).is_none());
    }
}
