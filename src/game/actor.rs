//! # Entity Model
//!
//! Actors are plain records with independently optional capability
//! components. A thug is an actor with health, attack and AI; a bandage is
//! an actor with an item behavior; a stairway is an actor with a portal.
//! Absent capabilities are no-ops, never errors.

use crate::game::{Ai, ItemEffect, Position};
use crate::ui::Color;
use uuid::Uuid;

/// Opaque identity of a live actor, valid for the current session only.
///
/// Used to iterate a stable snapshot of the actor list while the list is
/// being reordered by deaths mid-sweep. Never serialized; snapshots persist
/// actors by name instead.
pub type ActorId = Uuid;

/// Creates a new unique actor ID.
pub fn new_actor_id() -> ActorId {
    Uuid::new_v4()
}

/// Offensive capability: a flat attack power.
#[derive(Debug, Clone)]
pub struct Attacker {
    pub power: f32,
}

impl Attacker {
    pub fn new(power: f32) -> Self {
        Self { power }
    }
}

/// Which death rules apply when hit points run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathKind {
    Player,
    Monster,
}

/// Result of a single [`Destructible::take_damage`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageOutcome {
    /// Damage actually applied after defense
    pub dealt: f32,
    /// True exactly once, on the call that drops HP to zero or below
    pub died: bool,
}

/// Health, defense, and death bookkeeping.
#[derive(Debug, Clone)]
pub struct Destructible {
    pub max_hp: f32,
    pub hp: f32,
    pub defense: f32,
    pub corpse_name: String,
    pub kind: DeathKind,
}

impl Destructible {
    pub fn new(max_hp: f32, defense: f32, corpse_name: &str, kind: DeathKind) -> Self {
        Self {
            max_hp,
            hp: max_hp,
            defense,
            corpse_name: corpse_name.to_string(),
            kind,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.hp <= 0.0
    }

    /// Applies damage reduced by defense, floored at zero.
    ///
    /// Death is reported exactly once: the call that crosses HP to zero or
    /// below sets `died`; further calls on a dead actor deal nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use undercity::{DeathKind, Destructible};
    ///
    /// let mut hull = Destructible::new(10.0, 2.0, "corpse", DeathKind::Monster);
    /// assert_eq!(hull.take_damage(1.0).dealt, 0.0);
    /// let hit = hull.take_damage(12.0);
    /// assert_eq!(hit.dealt, 10.0);
    /// assert!(hit.died);
    /// assert!(!hull.take_damage(12.0).died);
    /// ```
    pub fn take_damage(&mut self, dmg: f32) -> DamageOutcome {
        if self.is_dead() {
            return DamageOutcome {
                dealt: 0.0,
                died: false,
            };
        }
        let dealt = (dmg - self.defense).max(0.0);
        if dealt > 0.0 {
            self.hp -= dealt;
        }
        DamageOutcome {
            dealt,
            died: self.hp <= 0.0,
        }
    }

    /// Restores hit points, clamped at `max_hp`. Returns the amount asked for.
    pub fn heal(&mut self, amount: f32) -> f32 {
        self.hp = (self.hp + amount).min(self.max_hp);
        amount
    }
}

/// Fixed-capacity ordered item holder.
#[derive(Debug, Default)]
pub struct Container {
    pub capacity: usize,
    pub items: Vec<Actor>,
}

impl Container {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Vec::new(),
        }
    }

    /// Adds an item at the front of the holder. Fails without mutating when
    /// the holder is full.
    pub fn add(&mut self, item: Actor) -> Result<(), Actor> {
        if self.capacity == 0 || self.items.len() >= self.capacity {
            return Err(item);
        }
        self.items.insert(0, item);
        Ok(())
    }

    /// Removes and returns the item at `index`, if present.
    pub fn remove(&mut self, index: usize) -> Option<Actor> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    /// Item names in holder order, for menus and the save record.
    pub fn names(&self) -> Vec<String> {
        self.items.iter().map(|item| item.name.clone()).collect()
    }
}

/// A level transition trigger. Forward from the last level is the final
/// exit and ends the game instead of descending.
#[derive(Debug, Clone, Copy)]
pub struct Portal {
    pub forward: bool,
}

/// A grid-positioned entity: player, monster, item, door, prop or stairway.
///
/// Behavior is the union of whatever capability components are present;
/// there is no monster/item/player type tag.
#[derive(Debug)]
pub struct Actor {
    pub id: ActorId,
    pub pos: Position,
    pub glyph: char,
    pub name: String,
    pub color: Color,
    pub blocks: bool,
    pub attacker: Option<Attacker>,
    pub destructible: Option<Destructible>,
    pub ai: Option<Ai>,
    pub item: Option<ItemEffect>,
    pub container: Option<Container>,
    pub portal: Option<Portal>,
}

impl Actor {
    /// Creates a bare blocking actor with no capabilities attached.
    pub fn new(pos: Position, glyph: char, name: &str, color: Color) -> Self {
        Self {
            id: new_actor_id(),
            pos,
            glyph,
            name: name.to_string(),
            color,
            blocks: true,
            attacker: None,
            destructible: None,
            ai: None,
            item: None,
            container: None,
            portal: None,
        }
    }

    /// Straight-line distance from this actor to a position.
    pub fn distance_to(&self, pos: Position) -> f32 {
        self.pos.distance(pos)
    }

    /// True when the actor has health and it has run out.
    pub fn is_dead(&self) -> bool {
        self.destructible
            .as_ref()
            .map(|d| d.is_dead())
            .unwrap_or(false)
    }

    /// True when the actor has health and it has not run out.
    pub fn is_alive(&self) -> bool {
        self.destructible
            .as_ref()
            .map(|d| !d.is_dead())
            .unwrap_or(false)
    }

    /// True for items the player can carry. Props such as doors and memos
    /// stay on the level.
    pub fn is_portable(&self) -> bool {
        self.item.as_ref().map(|i| i.is_portable()).unwrap_or(false)
    }
}
