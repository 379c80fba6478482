//! # Frontend Seam
//!
//! The simulation consumes its collaborators (frame presentation, input
//! polling, target-tile picking, the colored message log, the inventory
//! menu and the story confirmation) through the narrow [`Ui`] trait.
//! The crossterm terminal frontend and the scripted test frontend are the
//! two implementations.

pub mod scripted;
pub mod terminal;

pub use scripted::ScriptedUi;
pub use terminal::TerminalUi;

use crate::config;
use crate::game::{Actor, Grid, Position};
use std::collections::VecDeque;

/// Named display colors; frontends map them to whatever they render with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    White,
    Grey,
    LightGrey,
    Red,
    LightRed,
    DarkRed,
    Crimson,
    Green,
    LightGreen,
    Chartreuse,
    DarkBlue,
    Cyan,
    Sea,
    Violet,
    Purple,
    Gold,
    Orange,
    DarkYellow,
    Silver,
}

/// One player input, read once per simulation tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Move { dx: i32, dy: i32 },
    Pickup,
    UseInventory,
    DropInventory,
    Quit,
}

/// Status-line data handed to the frontend alongside the frame.
#[derive(Debug, Clone, Copy)]
pub struct Hud {
    pub hp: f32,
    pub max_hp: f32,
    pub ammo: u32,
    pub level: usize,
}

/// The external collaborator interface.
pub trait Ui {
    /// Draws the current state. No return value.
    fn present_frame(&mut self, grid: &Grid, actors: &[Actor], hud: &Hud);

    /// Blocks until the operator provides one action.
    fn next_action(&mut self) -> Action;

    /// Interactive tile targeting, optionally range-limited from `origin`.
    /// Returns `None` when the operator cancels.
    fn pick_tile(&mut self, grid: &Grid, origin: Position, max_range: Option<f32>)
        -> Option<Position>;

    /// Appends a colored line to the bounded message history.
    fn log(&mut self, color: Color, text: &str);

    /// Presents an item menu; returns the chosen index or `None` on cancel.
    fn choose_item(&mut self, names: &[String]) -> Option<usize>;

    /// Presents a block of narrative text; returns whether the operator
    /// acknowledged it.
    fn show_story(&mut self, text: &str) -> bool;
}

/// Bounded-length message history: newest first, oldest evicted.
#[derive(Debug)]
pub struct MessageLog {
    lines: VecDeque<(Color, String)>,
    capacity: usize,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::with_capacity(config::MESSAGE_HISTORY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity,
        }
    }

    pub fn push(&mut self, color: Color, text: &str) {
        if self.lines.len() >= self.capacity {
            self.lines.pop_back();
        }
        self.lines.push_front((color, text.to_string()));
    }

    /// Lines newest-first.
    pub fn iter(&self) -> impl Iterator<Item = &(Color, String)> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}
