//! # Undercity Main Entry Point
//!
//! Parses the command line, probes for a save record, and runs the outer
//! game loop against the terminal frontend.

use clap::Parser;
use log::info;
use std::path::PathBuf;
use undercity::game::{delete_save, read_save};
use undercity::ui::TerminalUi;
use undercity::{Color, Engine, GameConfig, TickFlow, Ui, UndercityResult};

/// Command line arguments for Undercity.
#[derive(Parser, Debug)]
#[command(name = "undercity")]
#[command(about = "A turn-based noir dungeon crawl through five city levels")]
#[command(version)]
struct Args {
    /// Random seed for dungeon generation
    #[arg(short, long)]
    seed: Option<u64>,

    /// Path of the save record
    #[arg(long, default_value = "savegame/undercity.json")]
    save: PathBuf,

    /// Ignore any existing save and start fresh
    #[arg(long)]
    new_game: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> UndercityResult<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .parse_filters(&args.log_level)
        .init();
    info!("starting undercity v{}", undercity::VERSION);

    let game_config = GameConfig::new(args.save.clone());
    if args.new_game {
        delete_save(&game_config);
    }
    let seed = args.seed.unwrap_or_else(rand::random);

    let mut engine = match read_save(&game_config) {
        Some(save) => {
            info!("resuming from {}", game_config.save_path.display());
            Engine::from_save(save, game_config, seed)?
        }
        None => Engine::new_game(game_config, seed)?,
    };

    let mut ui = TerminalUi::new()?;
    ui.log(
        Color::White,
        "The trail leads down. Arrows move, g grabs, i uses, d drops, q quits.",
    );

    loop {
        engine.render(&mut ui);
        match engine.tick(&mut ui)? {
            TickFlow::Continue => {}
            TickFlow::Quit => break,
            TickFlow::GameOver => {
                engine.render(&mut ui);
                break;
            }
        }
    }

    engine.save()?;
    Ok(())
}
