//! # Terminal Frontend
//!
//! A crossterm implementation of the [`Ui`] trait: glyph rendering into an
//! alternate screen, blocking key reads, an interactive targeting cursor
//! and the bounded message panel.

use crate::config;
use crate::game::{Actor, Grid, Position};
use crate::ui::{Action, Color, Hud, MessageLog, Ui};
use crate::UndercityResult;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::style::{self, Stylize};
use crossterm::{cursor, execute, queue, terminal};
use std::io::{self, Write};

pub struct TerminalUi {
    out: io::Stdout,
    messages: MessageLog,
}

impl TerminalUi {
    /// Switches the terminal into raw alternate-screen mode.
    pub fn new() -> UndercityResult<Self> {
        let mut out = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(out, terminal::EnterAlternateScreen, cursor::Hide)?;
        Ok(Self {
            out,
            messages: MessageLog::new(),
        })
    }

    fn style_color(color: Color) -> style::Color {
        match color {
            Color::White => style::Color::White,
            Color::Grey => style::Color::DarkGrey,
            Color::LightGrey => style::Color::Grey,
            Color::Red => style::Color::Red,
            Color::LightRed => style::Color::Red,
            Color::DarkRed => style::Color::DarkRed,
            Color::Crimson => style::Color::DarkRed,
            Color::Green => style::Color::Green,
            Color::LightGreen => style::Color::Green,
            Color::Chartreuse => style::Color::Green,
            Color::DarkBlue => style::Color::DarkBlue,
            Color::Cyan => style::Color::Cyan,
            Color::Sea => style::Color::DarkCyan,
            Color::Violet => style::Color::Magenta,
            Color::Purple => style::Color::DarkMagenta,
            Color::Gold => style::Color::Yellow,
            Color::Orange => style::Color::DarkYellow,
            Color::DarkYellow => style::Color::DarkYellow,
            Color::Silver => style::Color::Grey,
        }
    }

    fn draw_frame(&mut self, grid: &Grid, actors: &[Actor], hud: &Hud) -> io::Result<()> {
        queue!(self.out, terminal::Clear(terminal::ClearType::All))?;

        for y in 0..grid.height {
            queue!(self.out, cursor::MoveTo(0, y as u16))?;
            let mut row = String::with_capacity(grid.width as usize);
            for x in 0..grid.width {
                let pos = Position::new(x, y);
                let glyph = match grid.tile(pos) {
                    Some(tile) if grid.is_in_view(pos) || tile.explored => {
                        if !tile.walkable {
                            '#'
                        } else if tile.outdoor {
                            ','
                        } else {
                            '.'
                        }
                    }
                    _ => ' ',
                };
                row.push(glyph);
            }
            queue!(self.out, style::Print(row.dark_grey()))?;
        }

        for actor in actors {
            if grid.is_in_view(actor.pos) {
                queue!(
                    self.out,
                    cursor::MoveTo(actor.pos.x as u16, actor.pos.y as u16),
                    style::PrintStyledContent(
                        actor.glyph.to_string().with(Self::style_color(actor.color))
                    )
                )?;
            }
        }

        let status_row = grid.height as u16;
        let cylinder: String = (0..config::AMMO_CAP)
            .map(|i| if i < hud.ammo { '*' } else { 'o' })
            .collect();
        queue!(
            self.out,
            cursor::MoveTo(0, status_row),
            style::Print(format!(
                "HP {:>4}/{:<4}  Revolver [{}]  Level {}",
                hud.hp,
                hud.max_hp,
                cylinder,
                hud.level + 1
            ))
        )?;

        for (offset, (color, text)) in self.messages.iter().enumerate() {
            queue!(
                self.out,
                cursor::MoveTo(0, status_row + 1 + offset as u16),
                style::PrintStyledContent(text.clone().with(Self::style_color(*color)))
            )?;
        }

        self.out.flush()
    }

    fn read_key(&mut self) -> KeyCode {
        loop {
            if let Ok(Event::Key(KeyEvent { code, kind, .. })) = event::read() {
                if kind == KeyEventKind::Press {
                    return code;
                }
            }
        }
    }

    /// Whether a tile is a legal target: seen, inside range, not a wall.
    fn valid_target(
        grid: &Grid,
        origin: Position,
        pos: Position,
        max_range: Option<f32>,
    ) -> bool {
        if !grid.is_in_view(pos) || grid.is_wall(pos) {
            return false;
        }
        match max_range {
            Some(range) => origin.distance(pos) <= range,
            None => true,
        }
    }

    fn draw_cursor_marker(&mut self, pos: Position) -> io::Result<()> {
        queue!(
            self.out,
            cursor::MoveTo(pos.x as u16, pos.y as u16),
            style::PrintStyledContent("X".white().on_dark_grey())
        )?;
        self.out.flush()
    }

    fn draw_panel(&mut self, lines: &[String]) -> io::Result<()> {
        let left = 4u16;
        let top = 2u16;
        for (offset, line) in lines.iter().enumerate() {
            queue!(
                self.out,
                cursor::MoveTo(left, top + offset as u16),
                terminal::Clear(terminal::ClearType::UntilNewLine),
                style::Print(line)
            )?;
        }
        self.out.flush()
    }
}

impl Ui for TerminalUi {
    fn present_frame(&mut self, grid: &Grid, actors: &[Actor], hud: &Hud) {
        let _ = self.draw_frame(grid, actors, hud);
    }

    fn next_action(&mut self) -> Action {
        loop {
            let action = match self.read_key() {
                KeyCode::Up | KeyCode::Char('k') => Action::Move { dx: 0, dy: -1 },
                KeyCode::Down | KeyCode::Char('j') => Action::Move { dx: 0, dy: 1 },
                KeyCode::Left | KeyCode::Char('h') => Action::Move { dx: -1, dy: 0 },
                KeyCode::Right | KeyCode::Char('l') => Action::Move { dx: 1, dy: 0 },
                KeyCode::Char('g') => Action::Pickup,
                KeyCode::Char('i') => Action::UseInventory,
                KeyCode::Char('d') => Action::DropInventory,
                KeyCode::Esc | KeyCode::Char('q') => Action::Quit,
                _ => continue,
            };
            return action;
        }
    }

    fn pick_tile(
        &mut self,
        grid: &Grid,
        origin: Position,
        max_range: Option<f32>,
    ) -> Option<Position> {
        let mut cursor_pos = origin;
        let _ = self.draw_cursor_marker(cursor_pos);

        loop {
            let (dx, dy) = match self.read_key() {
                KeyCode::Up => (0, -1),
                KeyCode::Down => (0, 1),
                KeyCode::Left => (-1, 0),
                KeyCode::Right => (1, 0),
                KeyCode::Enter => return Some(cursor_pos),
                KeyCode::Esc => return None,
                _ => continue,
            };
            let next = cursor_pos.offset(dx, dy);
            if Self::valid_target(grid, origin, next, max_range) {
                cursor_pos = next;
                let _ = self.draw_cursor_marker(cursor_pos);
            }
        }
    }

    fn log(&mut self, color: Color, text: &str) {
        self.messages.push(color, text);
    }

    fn choose_item(&mut self, names: &[String]) -> Option<usize> {
        let mut lines = vec!["-- Backpack --".to_string()];
        for (index, name) in names.iter().enumerate() {
            lines.push(format!("({}) {}", (b'a' + index as u8) as char, name));
        }
        lines.push("pick a letter, Esc to cancel".to_string());
        let _ = self.draw_panel(&lines);

        loop {
            match self.read_key() {
                KeyCode::Char(c @ 'a'..='z') => {
                    let index = (c as u8 - b'a') as usize;
                    if index < names.len() {
                        return Some(index);
                    }
                }
                KeyCode::Esc => return None,
                _ => {}
            }
        }
    }

    fn show_story(&mut self, text: &str) -> bool {
        let mut lines: Vec<String> = Vec::new();
        let mut current = String::new();
        for word in text.split_whitespace() {
            if current.len() + word.len() + 1 > 70 {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
        lines.push(String::new());
        lines.push("Enter to continue, Esc to look away".to_string());
        let _ = self.draw_panel(&lines);

        loop {
            match self.read_key() {
                KeyCode::Enter => return true,
                KeyCode::Esc => return false,
                _ => {}
            }
        }
    }
}

impl Drop for TerminalUi {
    fn drop(&mut self) {
        let _ = execute!(self.out, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}
