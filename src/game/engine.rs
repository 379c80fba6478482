//! # Turn Engine
//!
//! Resolves one player action into a full simulation step: the player
//! moves, attacks, uses an item or takes a stairway, and then every monster
//! with an AI updates once. Level transitions run synchronously inside the
//! tick; no partially transitioned state is ever observable between ticks.

use crate::game::{
    chase_step, spawn, Actor, ActorId, Ai, ChasePlan, GameConfig, Grid, ItemEffect, Portal,
    Position, SaveGame, WorldState,
};
use crate::game::{items, world};
use crate::ui::{Action, Color, Hud, Ui};
use crate::{config, UndercityError, UndercityResult};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Engine state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Fresh engine; the first tick computes the initial view.
    Start,
    /// Waiting for a player action.
    Idle,
    /// The player's action advanced world time; monsters get their turn.
    NewTurn,
    /// Terminal: the girl is safe.
    Win,
    /// Terminal: the player is dead.
    Lose,
    /// Transient, held for the remainder of a tick during a transition.
    LevelChange,
}

/// What the outer loop should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    Continue,
    /// The operator asked to quit; save and exit.
    Quit,
    /// The game reached WIN or LOSE.
    GameOver,
}

/// Which placement rule applies when a floor is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arrival {
    /// Game start or save load: land beside the entry point.
    Load,
    /// Came down the stairs: land beside the entry point.
    Forward,
    /// Climbed back up: land beside the exit point.
    Backward,
}

/// The turn engine: the live actor list, the active grid, and the world
/// state they are a view of.
pub struct Engine {
    pub status: Status,
    pub grid: Grid,
    pub actors: Vec<Actor>,
    pub state: WorldState,
    player_id: ActorId,
    game_config: GameConfig,
    rng: StdRng,
}

impl Engine {
    /// Starts a fresh game on level 0.
    pub fn new_game(game_config: GameConfig, seed: u64) -> UndercityResult<Self> {
        let player = spawn::player(Position::new(0, 0));
        let player_id = player.id;
        let mut engine = Self {
            status: Status::Start,
            grid: Grid::blocked(config::MAP_WIDTH, config::MAP_HEIGHT),
            actors: vec![player],
            state: WorldState::new(),
            player_id,
            game_config,
            rng: StdRng::seed_from_u64(seed),
        };
        engine.enter_level(Arrival::Load)?;
        info!("new game started (seed {})", seed);
        Ok(engine)
    }

    /// Resumes a game from a save record.
    pub fn from_save(save: SaveGame, game_config: GameConfig, seed: u64) -> UndercityResult<Self> {
        let inventory = save.inventory.clone();
        let hp = save.hp;
        let state = save.into_world();
        let level_index = state.current_index();

        let mut player = spawn::player(Position::new(0, 0));
        if let Some(hull) = player.destructible.as_mut() {
            hull.hp = hp.min(hull.max_hp);
        }
        if let Some(holder) = player.container.as_mut() {
            for name in &inventory {
                if holder.items.len() >= holder.capacity {
                    break;
                }
                if let Some(item) = spawn::from_name(name, Position::new(0, 0), level_index) {
                    holder.items.push(item);
                }
            }
        }
        let player_id = player.id;

        let mut engine = Self {
            status: Status::Start,
            grid: Grid::blocked(config::MAP_WIDTH, config::MAP_HEIGHT),
            actors: vec![player],
            state,
            player_id,
            game_config,
            rng: StdRng::seed_from_u64(seed),
        };
        engine.enter_level(Arrival::Load)?;
        info!("game resumed on level {}", level_index);
        Ok(engine)
    }

    pub fn player_id(&self) -> ActorId {
        self.player_id
    }

    /// The player actor. The engine never removes the player from the live
    /// list; a missing player is a corrupted state.
    pub fn player(&self) -> UndercityResult<&Actor> {
        self.actors
            .iter()
            .find(|a| a.id == self.player_id)
            .ok_or_else(|| UndercityError::InvalidState("no player in actor list".to_string()))
    }

    fn player_mut(&mut self) -> UndercityResult<&mut Actor> {
        let id = self.player_id;
        self.actors
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| UndercityError::InvalidState("no player in actor list".to_string()))
    }

    fn index_of(&self, id: ActorId) -> Option<usize> {
        self.actors.iter().position(|a| a.id == id)
    }

    /// First living actor standing on `pos`.
    pub fn living_actor_at(&self, pos: Position) -> Option<ActorId> {
        self.actors
            .iter()
            .find(|a| a.pos == pos && a.is_alive())
            .map(|a| a.id)
    }

    /// Whether terrain and blocking actors allow stepping onto `pos`.
    pub fn can_walk(&self, pos: Position) -> bool {
        if self.grid.is_wall(pos) {
            return false;
        }
        !self.actors.iter().any(|a| a.blocks && a.pos == pos)
    }

    pub fn hud(&self) -> Hud {
        let (hp, max_hp) = self
            .player()
            .ok()
            .and_then(|p| p.destructible.as_ref())
            .map(|d| (d.hp, d.max_hp))
            .unwrap_or((0.0, 0.0));
        Hud {
            hp,
            max_hp,
            ammo: self.state.ammo,
            level: self.state.current_index(),
        }
    }

    /// Presents the current frame through the frontend.
    pub fn render(&self, ui: &mut dyn Ui) {
        ui.present_frame(&self.grid, &self.actors, &self.hud());
    }

    /// Runs one simulation tick: one player action, then the monster sweep.
    pub fn tick(&mut self, ui: &mut dyn Ui) -> UndercityResult<TickFlow> {
        match self.status {
            Status::Win | Status::Lose => return Ok(TickFlow::GameOver),
            Status::Start => {
                let pos = self.player()?.pos;
                self.grid.compute_fov(pos);
            }
            _ => {}
        }
        self.status = Status::Idle;

        let action = ui.next_action();
        if action == Action::Quit {
            return Ok(TickFlow::Quit);
        }
        self.player_turn(action, ui)?;

        if self.status == Status::NewTurn {
            self.monster_sweep(ui);
            if self.status == Status::NewTurn {
                self.status = Status::Idle;
            }
        }

        match self.status {
            Status::Win | Status::Lose => Ok(TickFlow::GameOver),
            _ => Ok(TickFlow::Continue),
        }
    }

    /// Freezes and snapshots the active floor, then writes the save record.
    pub fn save(&mut self) -> UndercityResult<()> {
        self.state.depart(&self.grid, &self.actors);
        let save = SaveGame::capture(&self.state, self.player()?);
        world::write_save(&self.game_config, &save)
    }

    // ------------------------------------------------------------------
    // Player action resolution
    // ------------------------------------------------------------------

    fn player_turn(&mut self, action: Action, ui: &mut dyn Ui) -> UndercityResult<()> {
        if self.player()?.is_dead() {
            return Ok(());
        }

        // A confused player stumbles instead of acting until the counter
        // runs out; inventory browsing is still allowed.
        if matches!(self.player()?.ai, Some(Ai::Confused { .. })) {
            if let Action::Move { dx, dy } = action {
                if dx != 0 || dy != 0 {
                    self.status = Status::NewTurn;
                    self.update_actor(self.player_id, ui)?;
                    let pos = self.player()?.pos;
                    self.grid.compute_fov(pos);
                }
                return Ok(());
            }
        }

        match action {
            Action::Move { dx, dy } => {
                if dx != 0 || dy != 0 {
                    self.status = Status::NewTurn;
                    if self.player_move_attack(dx, dy, ui)? {
                        let pos = self.player()?.pos;
                        self.grid.compute_fov(pos);
                    }
                }
            }
            Action::Pickup => self.pickup(ui)?,
            Action::UseInventory => {
                if self.use_from_inventory(ui)? {
                    self.status = Status::NewTurn;
                }
            }
            Action::DropInventory => {
                if self.drop_from_inventory(ui)? {
                    self.status = Status::NewTurn;
                }
            }
            Action::Quit => {}
        }
        Ok(())
    }

    /// Resolves one step of player movement. Returns true when the player
    /// actually moved (the view needs recomputing).
    fn player_move_attack(&mut self, dx: i32, dy: i32, ui: &mut dyn Ui) -> UndercityResult<bool> {
        let target = self.player()?.pos.offset(dx, dy);
        if self.grid.is_wall(target) {
            return Ok(false);
        }

        if let Some(victim) = self
            .actors
            .iter()
            .find(|a| a.id != self.player_id && a.pos == target && a.is_alive())
            .map(|a| a.id)
        {
            self.attack(self.player_id, victim, ui)?;
            return Ok(false);
        }

        if let Some(door) = self
            .actors
            .iter()
            .position(|a| a.pos == target && a.item == Some(ItemEffect::Door { open: false }))
        {
            let door = &mut self.actors[door];
            door.glyph = '/';
            door.name = "open door".to_string();
            door.blocks = false;
            door.item = Some(ItemEffect::Door { open: true });
            ui.log(Color::Orange, "The door creaks open.");
            return Ok(false);
        }

        if let Some(portal) = self
            .actors
            .iter()
            .find(|a| a.pos == target && a.portal.is_some())
            .and_then(|a| a.portal)
        {
            self.take_portal(portal, ui)?;
            return Ok(false);
        }

        let notices: Vec<String> = self
            .actors
            .iter()
            .filter(|a| a.pos == target && (a.is_dead() || a.is_portable()))
            .map(|a| a.name.clone())
            .collect();
        for name in notices {
            ui.log(Color::LightGrey, &format!("There's a {} here.", name));
        }

        self.player_mut()?.pos = target;
        self.fire_story_triggers(ui)?;
        Ok(true)
    }

    fn take_portal(&mut self, portal: Portal, ui: &mut dyn Ui) -> UndercityResult<()> {
        if portal.forward && self.state.is_last_level() {
            ui.log(
                Color::Purple,
                "You shoulder the last door open and step into daylight.",
            );
            self.status = Status::Win;
            return Ok(());
        }
        if portal.forward {
            ui.log(Color::Purple, "You go down the stairs...");
        } else {
            ui.log(Color::Purple, "You climb back up the stairs...");
        }
        self.change_level(portal.forward)
    }

    fn pickup(&mut self, ui: &mut dyn Ui) -> UndercityResult<()> {
        let pos = self.player()?.pos;
        let found = self
            .actors
            .iter()
            .position(|a| a.id != self.player_id && a.pos == pos && a.is_portable());
        let Some(found) = found else {
            ui.log(Color::LightGrey, "There's nothing here to find.");
            return Ok(());
        };

        let item = self.actors.remove(found);
        let name = item.name.clone();
        let holder = self.player_mut()?.container.as_mut().ok_or_else(|| {
            UndercityError::InvalidState("player has no inventory".to_string())
        })?;
        match holder.add(item) {
            Ok(()) => ui.log(Color::Silver, &format!("You pick up a {}.", name)),
            Err(item) => {
                ui.log(Color::Red, "Your inventory is full!");
                self.actors.insert(found, item);
            }
        }
        Ok(())
    }

    fn inventory_names(&self) -> Vec<String> {
        self.player()
            .ok()
            .and_then(|p| p.container.as_ref())
            .map(|c| c.names())
            .unwrap_or_default()
    }

    fn use_from_inventory(&mut self, ui: &mut dyn Ui) -> UndercityResult<bool> {
        let names = self.inventory_names();
        if names.is_empty() {
            ui.log(Color::LightGrey, "Your pockets are empty.");
            return Ok(false);
        }
        match ui.choose_item(&names) {
            Some(choice) if choice < names.len() => self.use_item(choice, ui),
            _ => Ok(false),
        }
    }

    fn drop_from_inventory(&mut self, ui: &mut dyn Ui) -> UndercityResult<bool> {
        let names = self.inventory_names();
        if names.is_empty() {
            ui.log(Color::LightGrey, "Your pockets are empty.");
            return Ok(false);
        }
        let Some(choice) = ui.choose_item(&names) else {
            return Ok(false);
        };
        let pos = self.player()?.pos;
        let taken = self
            .player_mut()?
            .container
            .as_mut()
            .and_then(|c| c.remove(choice));
        let Some(mut item) = taken else {
            return Ok(false);
        };
        item.pos = pos;
        let name = item.name.clone();
        self.actors.insert(0, item);
        ui.log(Color::Chartreuse, &format!("You drop a {}.", name));
        Ok(true)
    }

    /// The central polymorphic dispatch: resolves one inventory item's
    /// effect. Returns whether the action consumed a turn; a false return
    /// leaves every piece of committed state untouched.
    fn use_item(&mut self, index: usize, ui: &mut dyn Ui) -> UndercityResult<bool> {
        let effect = self
            .player()?
            .container
            .as_ref()
            .and_then(|c| c.items.get(index))
            .map(|item| item.item.clone().unwrap_or(ItemEffect::Generic));
        let Some(effect) = effect else {
            return Ok(false);
        };

        match effect {
            ItemEffect::Generic | ItemEffect::Story { .. } | ItemEffect::Door { .. } => {
                self.consume(index)?;
                Ok(true)
            }

            ItemEffect::Healer { amount } => {
                let healed = self
                    .player_mut()?
                    .destructible
                    .as_mut()
                    .map(|d| d.heal(amount))
                    .unwrap_or(0.0);
                if healed <= 0.0 {
                    return Ok(false);
                }
                ui.log(
                    Color::LightGreen,
                    &format!("You patch yourself up for {} hit points.", amount),
                );
                self.consume(index)?;
                Ok(true)
            }

            ItemEffect::Confuser { turns, range } => {
                let origin = self.player()?.pos;
                let Some(tile) = ui.pick_tile(&self.grid, origin, Some(range)) else {
                    return Ok(false);
                };
                let Some(victim) = self.living_actor_at(tile) else {
                    return Ok(false);
                };
                let name = {
                    let idx = self.index_of(victim).ok_or_else(|| {
                        UndercityError::InvalidState("target vanished".to_string())
                    })?;
                    let target = &mut self.actors[idx];
                    let prev = target.ai.take();
                    target.ai = Some(Ai::confused(turns, prev));
                    target.name.clone()
                };
                ui.log(
                    Color::LightGreen,
                    &format!("The rock cracks off {}'s skull; they stagger, dazed.", name),
                );
                self.consume(index)?;
                Ok(true)
            }

            ItemEffect::Gun { range, damage } => {
                if self.state.ammo == 0 {
                    ui.log(Color::Gold, "Click. The cylinder is empty.");
                    return Ok(false);
                }
                let origin = self.player()?.pos;
                let Some(tile) = ui.pick_tile(&self.grid, origin, Some(range)) else {
                    return Ok(false);
                };
                self.state.ammo -= 1;
                match self.living_actor_at(tile).and_then(|v| self.index_of(v)) {
                    Some(idx) => {
                        let victim = self.actors[idx].id;
                        let name = self.actors[idx].name.clone();
                        ui.log(
                            Color::Cyan,
                            &format!("Your shot hits {} for {} points of damage.", name, damage),
                        );
                        self.damage(victim, damage, ui)?;
                    }
                    None => ui.log(Color::Gold, "The shot goes wide."),
                }
                self.consume(index)?;
                Ok(true)
            }

            ItemEffect::Grenade { radius, damage } => {
                let origin = self.player()?.pos;
                let Some(tile) = ui.pick_tile(&self.grid, origin, None) else {
                    return Ok(false);
                };
                ui.log(
                    Color::Orange,
                    &format!(
                        "The grenade goes off, tearing up everything within {} tiles!",
                        radius
                    ),
                );
                let victims: Vec<ActorId> = self
                    .actors
                    .iter()
                    .filter(|a| a.is_alive() && a.pos.distance(tile) <= radius)
                    .map(|a| a.id)
                    .collect();
                for victim in victims {
                    if let Some(idx) = self.index_of(victim) {
                        let name = self.actors[idx].name.clone();
                        ui.log(
                            Color::Orange,
                            &format!("{} is caught in the blast for {} points of damage.", name, damage),
                        );
                    }
                    self.damage(victim, damage, ui)?;
                }
                self.consume(index)?;
                Ok(true)
            }

            ItemEffect::Ammo => {
                if self.state.ammo >= config::AMMO_CAP {
                    ui.log(Color::Gold, "The cylinder is already full.");
                    return Ok(false);
                }
                self.state.ammo += 1;
                ui.log(Color::Gold, "You press a round into the cylinder.");
                self.consume(index)?;
                Ok(true)
            }

            ItemEffect::Win => {
                ui.log(Color::Purple, "She's safe. It's over.");
                self.status = Status::Win;
                Ok(true)
            }
        }
    }

    fn consume(&mut self, index: usize) -> UndercityResult<()> {
        self.player_mut()?
            .container
            .as_mut()
            .and_then(|c| c.remove(index));
        Ok(())
    }

    fn fire_story_triggers(&mut self, ui: &mut dyn Ui) -> UndercityResult<()> {
        let pos = self.player()?.pos;
        let pending: Vec<(ActorId, usize, u8)> = self
            .actors
            .iter()
            .filter_map(|a| match a.item {
                Some(ItemEffect::Story {
                    level,
                    index,
                    used: false,
                }) if a.pos == pos => Some((a.id, level, index)),
                _ => None,
            })
            .collect();

        for (id, level, index) in pending {
            let text = items::story_text(level, index)
                .unwrap_or("The ink has faded beyond reading.");
            if ui.show_story(text) {
                if let Some(idx) = self.index_of(id) {
                    let memo = &mut self.actors[idx];
                    memo.name = "read memo".to_string();
                    memo.color = Color::Grey;
                    memo.item = Some(ItemEffect::Story {
                        level,
                        index,
                        used: true,
                    });
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Combat
    // ------------------------------------------------------------------

    /// Resolves one attack. A missing attacker capability is a silent no-op;
    /// a dead or indestructible target wastes the swing.
    fn attack(&mut self, attacker: ActorId, target: ActorId, ui: &mut dyn Ui) -> UndercityResult<()> {
        let (power, attacker_name) = match self.index_of(attacker) {
            Some(idx) => {
                let a = &self.actors[idx];
                match a.attacker.as_ref() {
                    Some(att) => (att.power, a.name.clone()),
                    None => return Ok(()),
                }
            }
            None => return Ok(()),
        };
        let Some(target_idx) = self.index_of(target) else {
            return Ok(());
        };

        let target_name = self.actors[target_idx].name.clone();
        let outcome = match self.actors[target_idx].destructible.as_mut() {
            Some(hull) if !hull.is_dead() => hull.take_damage(power),
            _ => {
                ui.log(
                    Color::LightGrey,
                    &format!("{} attacks {} in vain!", attacker_name, target_name),
                );
                return Ok(());
            }
        };

        if outcome.dealt > 0.0 {
            let color = if target == self.player_id {
                Color::Red
            } else {
                Color::LightRed
            };
            ui.log(
                color,
                &format!(
                    "{} attacks {} for {} hit points.",
                    attacker_name, target_name, outcome.dealt
                ),
            );
        } else {
            ui.log(
                Color::Grey,
                &format!(
                    "{} attacks {} but it has no effect!",
                    attacker_name, target_name
                ),
            );
        }
        if outcome.died {
            self.kill(target, ui)?;
        }
        Ok(())
    }

    /// Applies raw damage (reduced by the target's defense) outside of a
    /// melee exchange: gunshots and blasts.
    fn damage(&mut self, target: ActorId, amount: f32, ui: &mut dyn Ui) -> UndercityResult<()> {
        let Some(idx) = self.index_of(target) else {
            return Ok(());
        };
        let died = self.actors[idx]
            .destructible
            .as_mut()
            .map(|hull| hull.take_damage(amount).died)
            .unwrap_or(false);
        if died {
            self.kill(target, ui)?;
        }
        Ok(())
    }

    /// Death side effects, applied exactly once per actor: corpse glyph,
    /// non-blocking, sent to the back of the render and update order.
    fn kill(&mut self, target: ActorId, ui: &mut dyn Ui) -> UndercityResult<()> {
        let Some(idx) = self.index_of(target) else {
            return Ok(());
        };
        let name = self.actors[idx].name.clone();
        let is_player = target == self.player_id;

        let actor = &mut self.actors[idx];
        actor.glyph = '%';
        actor.color = Color::DarkRed;
        actor.blocks = false;

        if is_player {
            ui.log(Color::Red, "You died!");
            self.status = Status::Lose;
        } else {
            ui.log(Color::Red, &format!("{} is dead!", name));
        }
        self.send_to_back(target);
        Ok(())
    }

    /// Moves an actor to the front of the list, which draws (and updates)
    /// first, visually underneath everything living.
    fn send_to_back(&mut self, id: ActorId) {
        if let Some(idx) = self.index_of(id) {
            let actor = self.actors.remove(idx);
            self.actors.insert(0, actor);
        }
    }

    // ------------------------------------------------------------------
    // Monster sweep
    // ------------------------------------------------------------------

    /// Updates every non-player actor once, in list order, over an identity
    /// snapshot taken before the sweep: deaths may reorder the list
    /// mid-sweep without skipping or double-updating anyone.
    fn monster_sweep(&mut self, ui: &mut dyn Ui) {
        let ids: Vec<ActorId> = self
            .actors
            .iter()
            .filter(|a| a.id != self.player_id)
            .map(|a| a.id)
            .collect();
        for id in ids {
            if let Err(err) = self.update_actor(id, ui) {
                warn!("actor update failed: {}", err);
            }
        }
    }

    /// Runs one actor's AI. The state is taken out of the actor for the
    /// duration, and confusion swaps back to the wrapped state on expiry.
    fn update_actor(&mut self, id: ActorId, ui: &mut dyn Ui) -> UndercityResult<()> {
        let Some(idx) = self.index_of(id) else {
            return Ok(());
        };
        let Some(ai) = self.actors[idx].ai.take() else {
            return Ok(());
        };

        let next = match ai {
            Ai::Player => Some(Ai::Player),
            Ai::Monster { moves } => {
                let moves = self.monster_turn(id, moves, ui)?;
                Some(Ai::Monster { moves })
            }
            Ai::Confused { remaining, prev } => {
                let dead = self
                    .index_of(id)
                    .map(|i| self.actors[i].is_dead())
                    .unwrap_or(true);
                if !dead {
                    self.confused_turn(id, ui)?;
                }
                let remaining = remaining - 1;
                if remaining <= 0 {
                    prev.map(|boxed| *boxed)
                } else {
                    Some(Ai::Confused { remaining, prev })
                }
            }
        };

        if let Some(idx) = self.index_of(id) {
            self.actors[idx].ai = next;
        }
        Ok(())
    }

    /// Hunter behavior: remember the player for a few turns after losing
    /// sight, close the distance by direct stepping, strike when adjacent.
    fn monster_turn(&mut self, id: ActorId, moves: i32, ui: &mut dyn Ui) -> UndercityResult<i32> {
        let Some(idx) = self.index_of(id) else {
            return Ok(moves);
        };
        if self.actors[idx].is_dead() {
            return Ok(moves);
        }
        let pos = self.actors[idx].pos;

        let mut moves = moves;
        if self.grid.is_in_view(pos) {
            moves = config::TRACKING_TURNS;
        } else {
            moves -= 1;
        }
        if moves <= 0 {
            return Ok(moves);
        }

        let player_pos = self.player()?.pos;
        match chase_step(pos, player_pos) {
            ChasePlan::Attack => self.attack(id, self.player_id, ui)?,
            ChasePlan::Step {
                direct,
                fallback_x,
                fallback_y,
            } => {
                let dest = [direct, fallback_x, fallback_y]
                    .into_iter()
                    .find(|d| self.can_walk(*d));
                if let Some(dest) = dest {
                    if let Some(idx) = self.index_of(id) {
                        self.actors[idx].pos = dest;
                    }
                }
            }
        }
        Ok(moves)
    }

    /// Confused behavior: a uniformly random single-cell step (possibly
    /// stationary); a blocked destination with someone standing on it gets
    /// attacked instead.
    fn confused_turn(&mut self, id: ActorId, ui: &mut dyn Ui) -> UndercityResult<()> {
        let dx = self.rng.gen_range(-1..=1);
        let dy = self.rng.gen_range(-1..=1);
        if dx == 0 && dy == 0 {
            return Ok(());
        }
        let Some(idx) = self.index_of(id) else {
            return Ok(());
        };
        let dest = self.actors[idx].pos.offset(dx, dy);

        if self.can_walk(dest) {
            self.actors[idx].pos = dest;
        } else if let Some(victim) = self.living_actor_at(dest) {
            if victim != id && self.actors[idx].attacker.is_some() {
                self.attack(id, victim, ui)?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Level transitions
    // ------------------------------------------------------------------

    /// The full transition protocol: freeze, snapshot, clear to the player,
    /// step the index, load the target floor. Runs to completion inside the
    /// tick.
    fn change_level(&mut self, forward: bool) -> UndercityResult<()> {
        self.status = Status::LevelChange;
        self.state.depart(&self.grid, &self.actors);
        let player_id = self.player_id;
        self.actors.retain(|a| a.id == player_id);
        self.state.step(forward)?;
        self.enter_level(if forward {
            Arrival::Forward
        } else {
            Arrival::Backward
        })?;
        info!("entered level {}", self.state.current_index());
        Ok(())
    }

    /// Loads the active floor: a frozen layout is replayed, a template is
    /// parsed on first visit, a procedural floor is generated on first
    /// visit (and frozen when it is left).
    fn enter_level(&mut self, arrival: Arrival) -> UndercityResult<()> {
        let index = self.state.current_index();

        if self.state.current_level().is_frozen() {
            self.rebuild_frozen(arrival)?;
        } else if let Some(source) = crate::generation::template_source(index) {
            let parsed = crate::generation::parse(source)?;
            let level = self.state.current_level_mut();
            level.layout = Some(parsed.grid);
            level.start = parsed.start;
            level.end = parsed.end;
            level.actors = parsed.actors;
            self.rebuild_frozen(arrival)?;
        } else if self.state.current_level().procedural {
            self.generate_current()?;
        } else {
            return Err(UndercityError::InvalidState(format!(
                "level {} has no layout, no template and is not procedural",
                index
            )));
        }

        let pos = self.player()?.pos;
        self.grid.compute_fov(pos);
        Ok(())
    }

    /// Replays a frozen floor: tiles, stairways, prop resolution (first
    /// load only) and snapshot-driven actor reconstruction.
    fn rebuild_frozen(&mut self, arrival: Arrival) -> UndercityResult<()> {
        let index = self.state.current_index();
        let (grid, start, end, records, props_resolved) = {
            let level = self.state.current_level();
            let layout = level.layout.clone().ok_or_else(|| {
                UndercityError::InvalidState(format!("level {} is not frozen", index))
            })?;
            (
                layout,
                level.start,
                level.end,
                level.actors.clone(),
                level.props_resolved,
            )
        };
        self.grid = grid;

        let landing = match arrival {
            Arrival::Load | Arrival::Forward => start.offset(-1, 0),
            Arrival::Backward => end.offset(-1, 0),
        };
        self.player_mut()?.pos = landing;

        self.place_stairways(index, start, end);

        if !props_resolved {
            for y in 0..self.grid.height {
                for x in 0..self.grid.width {
                    let pos = Position::new(x, y);
                    let marker = self.grid.tile(pos).map(|t| t.prop).unwrap_or('0');
                    if let Some(prop) = spawn::from_prop_marker(marker, pos, index) {
                        self.actors.push(prop);
                    }
                }
            }
            self.state.current_level_mut().props_resolved = true;
        }

        for record in &records {
            if let Some(actor) = spawn::from_record(record, index) {
                self.actors.push(actor);
            }
        }
        Ok(())
    }

    /// First visit of a procedural floor: generate it live. The layout is
    /// frozen when the floor is departed, never regenerated.
    fn generate_current(&mut self) -> UndercityResult<()> {
        let index = self.state.current_index();
        let built = crate::generation::DungeonBuilder::new().generate(&mut self.rng)?;

        self.grid = built.grid;
        {
            let level = self.state.current_level_mut();
            level.start = built.start;
            level.end = built.end;
        }
        self.player_mut()?.pos = built.player_start;
        self.actors.extend(built.actors);
        self.place_stairways(index, built.start, built.end);
        Ok(())
    }

    /// A descending stairway always stands at the exit; an ascending one at
    /// the entry on every floor but the first. The last floor's descending
    /// stairway is the final exit.
    fn place_stairways(&mut self, index: usize, start: Position, end: Position) {
        let mut down = Actor::new(end, '>', "stairs", Color::Sea);
        down.portal = Some(Portal { forward: true });
        self.actors.push(down);

        if index > 0 {
            let mut up = Actor::new(start, '>', "stairs", Color::Sea);
            up.portal = Some(Portal { forward: false });
            self.actors.push(up);
        }
    }
}
