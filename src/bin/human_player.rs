use clap::Parser;
use game_2048::config::GameConfig;
use game_2048::engine::Direction;
use game_2048::game::GameEngine;
use game_2048::persistence::JsonFileStore;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Play 2048 in the terminal", long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[clap(short, long, default_value = "game_2048.toml")]
    config: PathBuf,

    /// Directory for the saved game and high score (overrides the config file)
    #[clap(short, long)]
    save_dir: Option<PathBuf>,

    /// Seed for tile spawns, for a reproducible game
    #[clap(long)]
    seed: Option<u64>,
}

fn parse_direction(input: &str) -> Option<Direction> {
    match input {
        "w" | "up" => Some(Direction::Up),
        "s" | "down" => Some(Direction::Down),
        "a" | "left" => Some(Direction::Left),
        "d" | "right" => Some(Direction::Right),
        _ => None,
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match GameConfig::load_or_default(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(dir) = args.save_dir {
        config.save_dir = dir;
    }

    let store = JsonFileStore::new(config.save_dir.clone());
    let mut game = match args.seed {
        Some(seed) => GameEngine::with_seed(store, config, seed),
        None => GameEngine::new(store, config),
    };
    println!("Welcome to 2048!");
    let mut win_announced = false;

    loop {
        println!("---------------------");
        println!("Score: {}, Best: {}", game.score(), game.high_score());
        println!("{}", game.board());

        if let Some(message) = game.win_message() {
            if !win_announced {
                println!("🎉 {} Keep going!", message);
                win_announced = true;
            }
        }

        if game.is_over() {
            println!("---------------------");
            println!("GAME OVER! Final Score: {}", game.score());
            println!("---------------------");
        }

        print!("Move with w/a/s/d, 'u' to undo, 'n' for a new game, 'q' to quit: ");
        io::stdout().flush().ok();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => {
                println!("Error reading input. Please try again.");
                continue;
            }
        }

        match input.trim() {
            "q" => {
                println!("Thanks for playing!");
                break;
            }
            "u" => {
                if !game.undo_last_move() {
                    println!("Nothing to undo.");
                }
            }
            "n" => {
                game.new_game();
                win_announced = false;
            }
            other => match parse_direction(other) {
                Some(direction) => {
                    if !game.is_over() && !game.process_move(direction) {
                        println!("Nothing moves that way.");
                    }
                }
                None => println!("Invalid input. Use w/a/s/d, 'u', 'n', or 'q'."),
            },
        }
    }
}
