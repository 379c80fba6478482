//! Integration tests for the full-game save/load cycle.

use std::fs;
use undercity::game::{delete_save, read_save, spawn};
use undercity::ui::ScriptedUi;
use undercity::{Action, Engine, GameConfig, Position};

fn temp_config(dir: &tempfile::TempDir) -> GameConfig {
    GameConfig::new(dir.path().join("undercity.json"))
}

#[test]
fn test_save_then_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = temp_config(&dir);
    let mut engine = Engine::new_game(config.clone(), 3).unwrap();

    engine.state.ammo = 4;
    let player_id = engine.player_id();
    {
        let player = engine
            .actors
            .iter_mut()
            .find(|a| a.id == player_id)
            .unwrap();
        player.destructible.as_mut().unwrap().hp = 17.0;
        let holder = player.container.as_mut().unwrap();
        holder
            .add(spawn::from_name("bandage", Position::new(0, 0), 0).unwrap())
            .unwrap();
        holder
            .add(spawn::from_name("rock", Position::new(0, 0), 0).unwrap())
            .unwrap();
    }

    engine.save().unwrap();
    let save = read_save(&config).expect("save should read back");
    assert_eq!(save.hp, 17.0);
    assert_eq!(save.ammo, 4);
    assert_eq!(save.inventory, vec!["rock", "bandage"]);

    let loaded = Engine::from_save(save, config, 3).unwrap();
    let player = loaded.player().unwrap();
    assert_eq!(player.destructible.as_ref().unwrap().hp, 17.0);
    assert_eq!(loaded.state.ammo, 4);
    assert_eq!(
        player.container.as_ref().unwrap().names(),
        vec!["rock", "bandage"]
    );
    // Reloaded items carry their behavior again.
    let rock = &player.container.as_ref().unwrap().items[0];
    assert!(matches!(
        rock.item,
        Some(undercity::ItemEffect::Confuser { .. })
    ));
}

#[test]
fn test_load_lands_player_beside_the_entry() {
    let dir = tempfile::tempdir().unwrap();
    let config = temp_config(&dir);
    let mut engine = Engine::new_game(config.clone(), 8).unwrap();
    engine.save().unwrap();

    let save = read_save(&config).unwrap();
    let loaded = Engine::from_save(save, config, 8).unwrap();
    assert_eq!(loaded.state.current_index(), 0);
    let landing = loaded.state.level(0).start.offset(-1, 0);
    assert_eq!(loaded.player().unwrap().pos, landing);
}

#[test]
fn test_save_preserves_level_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let config = temp_config(&dir);
    let mut engine = Engine::new_game(config.clone(), 13).unwrap();

    // Kill a thug, then save; the dead flag must survive the cycle even
    // though level 0 stays loaded the whole time.
    let thug_pos = {
        let thug = engine
            .actors
            .iter_mut()
            .find(|a| a.name == "thug")
            .expect("level 0 seeds thugs");
        thug.destructible.as_mut().unwrap().hp = 0.0;
        thug.pos
    };
    engine.save().unwrap();

    let save = read_save(&config).unwrap();
    let record = save
        .levels[0]
        .actors
        .iter()
        .find(|r| r.x == thug_pos.x && r.y == thug_pos.y)
        .expect("snapshot should keep the thug");
    assert!(record.dead);

    let loaded = Engine::from_save(save, config, 13).unwrap();
    assert!(loaded
        .actors
        .iter()
        .any(|a| a.pos == thug_pos && a.name == "dead body"));
}

#[test]
fn test_corrupt_save_is_treated_as_no_save() {
    let dir = tempfile::tempdir().unwrap();
    let config = temp_config(&dir);
    fs::write(&config.save_path, "definitely not json").unwrap();
    assert!(read_save(&config).is_none());
}

#[test]
fn test_new_game_never_reads_a_stale_save() {
    let dir = tempfile::tempdir().unwrap();
    let config = temp_config(&dir);
    let mut engine = Engine::new_game(config.clone(), 21).unwrap();
    engine.save().unwrap();
    assert!(read_save(&config).is_some());

    // Starting over deletes the record up front.
    delete_save(&config);
    assert!(read_save(&config).is_none());
}

#[test]
fn test_quit_on_deeper_level_resumes_there() {
    let dir = tempfile::tempdir().unwrap();
    let config = temp_config(&dir);
    let mut engine = Engine::new_game(config.clone(), 17).unwrap();

    // Walk the player onto the downward stairway.
    let stairs = engine
        .actors
        .iter()
        .find(|a| a.portal.map(|p| p.forward) == Some(true))
        .map(|a| a.pos)
        .unwrap();
    let landing = stairs.offset(-1, 0);
    if let Some(tile) = engine.grid.tile_mut(landing) {
        tile.walkable = true;
    }
    let player_id = engine.player_id();
    engine
        .actors
        .retain(|a| a.id == player_id || !(a.pos == stairs && a.is_alive()) && a.pos != landing);
    engine
        .actors
        .iter_mut()
        .find(|a| a.id == player_id)
        .unwrap()
        .pos = landing;
    let mut ui = ScriptedUi::new();
    ui.queue_actions([Action::Move { dx: 1, dy: 0 }]);
    engine.tick(&mut ui).unwrap();
    assert_eq!(engine.state.current_index(), 1);

    engine.save().unwrap();
    let loaded = Engine::from_save(read_save(&config).unwrap(), config, 17).unwrap();
    assert_eq!(loaded.state.current_index(), 1);
    assert_eq!(
        loaded.player().unwrap().pos,
        loaded.state.level(1).start.offset(-1, 0)
    );
}
