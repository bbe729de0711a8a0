//! Qataar: a capture game on line-connected boards.
//!
//! ## Usage
//!
//! - `qataar` - Start the text protocol on the standard board
//! - `qataar play --layout square --difficulty hard` - Protocol with options
//! - `qataar play --board my_board.json` - Protocol on a custom board
//! - `qataar selfplay --games 10` - Random player 1 against the computer

use std::io;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use qataar::ai::Difficulty;
use qataar::game::{GameEngine, GameMode, Transition};
use qataar::layouts::BoardSetup;
use qataar::piece::Player;
use qataar::protocol::{Session, format_move, load_board, render_board};
use qataar::topology::Layout;

/// Qataar: a capture game played along the lines of a graph board
#[derive(Parser)]
#[command(name = "qataar")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug events to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the text protocol on stdin/stdout
    Play(PlayArgs),
    /// Play random moves for player 1 against the computer
    Selfplay {
        #[command(flatten)]
        board: BoardArgs,
        #[arg(short, long, default_value = "normal")]
        difficulty: Difficulty,
        /// Number of games to play
        #[arg(short, long, default_value_t = 1)]
        games: u32,
        /// Stop a game after this many plies
        #[arg(long, default_value_t = 400)]
        max_plies: u64,
        /// Seed for both players' random choices
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Args)]
struct BoardArgs {
    /// Built-in board
    #[arg(short, long, default_value = "standard")]
    layout: Layout,
    /// Custom board JSON file (overrides --layout)
    #[arg(short, long)]
    board: Option<PathBuf>,
}

impl BoardArgs {
    fn setup(&self) -> anyhow::Result<BoardSetup> {
        match &self.board {
            Some(path) => load_board(path),
            None => BoardSetup::builtin(self.layout).context("invalid --layout"),
        }
    }
}

#[derive(Args)]
struct PlayArgs {
    #[command(flatten)]
    board: BoardArgs,
    #[arg(short, long, default_value = "normal")]
    difficulty: Difficulty,
    #[arg(short, long, default_value = "pvc")]
    mode: GameMode,
    /// Seed for the computer's random choices
    #[arg(long)]
    seed: Option<u64>,
}

impl Default for PlayArgs {
    fn default() -> Self {
        Self {
            board: BoardArgs {
                layout: Layout::Standard,
                board: None,
            },
            difficulty: Difficulty::default(),
            mode: GameMode::default(),
            seed: None,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(Commands::Play(args)) => run_protocol(args),
        None => run_protocol(PlayArgs::default()),
        Some(Commands::Selfplay {
            board,
            difficulty,
            games,
            max_plies,
            seed,
        }) => run_selfplay(&board, difficulty, games, max_plies, seed),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_protocol(args: PlayArgs) -> anyhow::Result<()> {
    let mut engine = GameEngine::new(args.board.setup()?)
        .with_mode(args.mode)
        .with_difficulty(args.difficulty);
    if let Some(seed) = args.seed {
        engine = engine.with_ai_seed(seed);
    }

    let mut session = Session::new(engine);
    session.run(io::stdin().lock(), io::stdout().lock())?;
    Ok(())
}

fn run_selfplay(
    board: &BoardArgs,
    difficulty: Difficulty,
    games: u32,
    max_plies: u64,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let setup = board.setup()?;
    let mut rng = match seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };
    let mut wins = [0u32; 2];
    let mut unfinished = 0u32;

    for game in 1..=games {
        let mut engine = GameEngine::new(setup.clone())
            .with_mode(GameMode::PlayerVsComputer)
            .with_difficulty(difficulty)
            .with_ai_seed(rng.u64(..));

        while engine.winner().is_none() && engine.ply() < max_plies {
            let played = engine.history().len();
            let transition = if engine.is_ai_turn() {
                engine.run_ai_turn()
            } else {
                Some(play_random_turn(&mut engine, &mut rng)?)
            };
            if transition.is_none() {
                bail!("game {game} stalled at ply {}", engine.ply());
            }
            for mv in &engine.history()[played..] {
                info!(game, ply = engine.ply(), mv = %format_move(mv), "played");
            }
        }

        match engine.winner() {
            Some(winner) => {
                wins[winner.index()] += 1;
                println!("game {game}: player {winner} wins after {} plies", engine.ply());
            }
            None => {
                unfinished += 1;
                println!("game {game}: no result after {} plies", engine.ply());
            }
        }
        if games == 1 {
            println!("{}", render_board(&engine));
        }
    }

    println!(
        "player 1 (random): {}  player 2 (computer, {difficulty}): {}  unfinished: {unfinished}",
        wins[Player::One.index()],
        wins[Player::Two.index()],
    );
    Ok(())
}

/// Play a whole human turn with uniformly random choices, chain included.
fn play_random_turn(engine: &mut GameEngine, rng: &mut fastrand::Rng) -> anyhow::Result<Transition> {
    loop {
        let moves = engine.available_moves();
        if moves.is_empty() {
            return Ok(engine.pass_turn()?);
        }
        let choice = &moves[rng.usize(..moves.len())];
        engine.select(&choice.piece)?;
        match engine.play_move(&choice.mv)? {
            Transition::ChainContinues => continue,
            other => return Ok(other),
        }
    }
}
