//! # Undercity
//!
//! A turn-based noir dungeon crawl: one player, five city levels, and the
//! thugs and gangsters that live in them.
//!
//! ## Architecture Overview
//!
//! The crate revolves around a few key concepts:
//!
//! - **Entity Model**: actors are plain records with independently optional
//!   capability components (attack, health, AI, item behavior, inventory)
//! - **Level Builders**: procedural room-and-corridor generation, plus a
//!   fixed ASCII template parser for the hand-authored levels
//! - **World Persistence**: per-level actor snapshots that survive level
//!   transitions and a full save/load cycle
//! - **Turn Engine**: one player action per tick, then one AI update per
//!   monster, driven through a narrow frontend trait
//!
//! Rendering, input polling and the message log presentation live behind the
//! [`ui::Ui`] trait; the simulation itself never touches a terminal.

pub mod game;
pub mod generation;
pub mod ui;

pub use game::{
    Actor, ActorId, ActorRecord, Ai, Attacker, Container, DeathKind, Destructible, Engine,
    GameConfig, Grid, ItemEffect, Level, Portal, Position, SaveGame, Status, Tile, TickFlow,
    WorldState,
};
pub use generation::{DungeonBuilder, Room};
pub use ui::{Action, Color, MessageLog, Ui};

/// Core error type for the Undercity engine.
#[derive(thiserror::Error, Debug)]
pub enum UndercityError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Game state is invalid
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Level generation failed
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// Level template could not be parsed
    #[error("Template error: {0}")]
    Template(String),
}

/// Result type used throughout the Undercity codebase.
pub type UndercityResult<T> = Result<T, UndercityError>;

/// Version information for the game.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Game tuning constants.
pub mod config {
    /// Level grid width in tiles
    pub const MAP_WIDTH: i32 = 80;

    /// Level grid height in tiles
    pub const MAP_HEIGHT: i32 = 45;

    /// Number of levels in the descent
    pub const LEVEL_COUNT: usize = 5;

    /// Level indices built from fixed templates; the rest are procedural
    pub const TEMPLATE_LEVELS: [usize; 3] = [0, 1, 4];

    /// Room placement attempts per procedural level
    pub const ROOM_ATTEMPTS: u32 = 50;

    /// Minimum room edge length
    pub const MIN_ROOM_SIZE: i32 = 10;

    /// Maximum room edge length
    pub const MAX_ROOM_SIZE: i32 = 10;

    /// Maximum monsters rolled per room
    pub const MAX_ROOM_MONSTERS: u32 = 3;

    /// Maximum items rolled per room
    pub const MAX_ROOM_ITEMS: u32 = 2;

    /// Turns a monster keeps hunting after losing sight of the player
    pub const TRACKING_TURNS: i32 = 5;

    /// Field-of-view radius in tiles
    pub const FOV_RADIUS: i32 = 10;

    /// Player inventory capacity
    pub const INVENTORY_CAPACITY: usize = 20;

    /// Revolver cylinder capacity
    pub const AMMO_CAP: u32 = 6;

    /// Player starting stats
    pub const PLAYER_HP: f32 = 30.0;
    pub const PLAYER_DEFENSE: f32 = 2.0;
    pub const PLAYER_POWER: f32 = 5.0;

    /// Monster stats, shared by thugs and gangsters
    pub const MONSTER_HP: f32 = 10.0;
    pub const MONSTER_DEFENSE: f32 = 0.0;
    pub const MONSTER_POWER: f32 = 3.0;

    /// Item tuning
    pub const HEAL_AMOUNT: f32 = 4.0;
    pub const CONFUSE_TURNS: i32 = 10;
    pub const CONFUSE_RANGE: f32 = 10.0;
    pub const GUN_RANGE: f32 = 10.0;
    pub const GUN_DAMAGE: f32 = 10.0;
    pub const GRENADE_RADIUS: f32 = 5.0;
    pub const GRENADE_DAMAGE: f32 = 10.0;

    /// Message history length before the oldest line is evicted
    pub const MESSAGE_HISTORY: usize = 9;
}
