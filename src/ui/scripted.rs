//! # Scripted Frontend
//!
//! A deterministic [`Ui`] implementation for tests: actions, tile picks,
//! menu choices and story acknowledgements are queued up front, and every
//! log line is recorded for assertions. An exhausted action queue yields
//! `Quit` so a runaway test ends instead of blocking.

use crate::game::{Actor, Grid, Position};
use crate::ui::{Action, Color, Hud, MessageLog, Ui};
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct ScriptedUi {
    actions: VecDeque<Action>,
    tile_picks: VecDeque<Option<Position>>,
    item_choices: VecDeque<Option<usize>>,
    story_acks: VecDeque<bool>,
    pub messages: MessageLog,
    frames: usize,
    stories: usize,
}

impl ScriptedUi {
    pub fn new() -> Self {
        Self {
            messages: MessageLog::with_capacity(usize::MAX),
            ..Self::default()
        }
    }

    pub fn queue_actions(&mut self, actions: impl IntoIterator<Item = Action>) {
        self.actions.extend(actions);
    }

    pub fn queue_tile_picks(&mut self, picks: impl IntoIterator<Item = Option<Position>>) {
        self.tile_picks.extend(picks);
    }

    pub fn queue_item_choices(&mut self, choices: impl IntoIterator<Item = Option<usize>>) {
        self.item_choices.extend(choices);
    }

    pub fn queue_story_acks(&mut self, acks: impl IntoIterator<Item = bool>) {
        self.story_acks.extend(acks);
    }

    /// Whether any recorded log line contains `needle`.
    pub fn saw_message(&self, needle: &str) -> bool {
        self.messages.iter().any(|(_, text)| text.contains(needle))
    }

    pub fn frames_presented(&self) -> usize {
        self.frames
    }

    pub fn stories_shown(&self) -> usize {
        self.stories
    }
}

impl Ui for ScriptedUi {
    fn present_frame(&mut self, _grid: &Grid, _actors: &[Actor], _hud: &Hud) {
        self.frames += 1;
    }

    fn next_action(&mut self) -> Action {
        self.actions.pop_front().unwrap_or(Action::Quit)
    }

    fn pick_tile(
        &mut self,
        _grid: &Grid,
        _origin: Position,
        _max_range: Option<f32>,
    ) -> Option<Position> {
        self.tile_picks.pop_front().flatten()
    }

    fn log(&mut self, color: Color, text: &str) {
        self.messages.push(color, text);
    }

    fn choose_item(&mut self, _names: &[String]) -> Option<usize> {
        self.item_choices.pop_front().flatten()
    }

    fn show_story(&mut self, _text: &str) -> bool {
        self.stories += 1;
        self.story_acks.pop_front().unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_script_quits() {
        let mut ui = ScriptedUi::new();
        ui.queue_actions([Action::Pickup]);
        assert_eq!(ui.next_action(), Action::Pickup);
        assert_eq!(ui.next_action(), Action::Quit);
    }

    #[test]
    fn test_messages_are_recorded() {
        let mut ui = ScriptedUi::new();
        ui.log(Color::Red, "thug is dead!");
        assert!(ui.saw_message("dead"));
        assert!(!ui.saw_message("alive"));
    }
}
