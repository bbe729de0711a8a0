//! Line-oriented text protocol for driving a game from a terminal or from
//! another program.
//!
//! Each request is one line: an optional numeric id, a command and its
//! arguments. Each response starts with `=` on success or `?` on failure,
//! followed by the id (if any) and the payload, and ends with a blank line.
//!
//! ## Supported Commands
//!
//! - `name`, `version`, `protocol_version`, `list_commands`
//! - `known_command <cmd>` - Check if a command is supported
//! - `quit` - Exit the loop
//! - `layout <standard|extended|square>` - Switch to a built-in board
//! - `load <path>` - Switch to a custom board read from a JSON file
//! - `reset` - Restart the current game
//! - `mode <pvp|pvc>` - Two players, or player 2 played by the computer
//! - `difficulty <easy|normal|hard>` - Computer strength
//! - `select <piece>` - Select a piece; answers its legal targets
//! - `deselect` - Drop the selection
//! - `move <target> [captured]` - Move the selected piece
//! - `moves` - Every legal move of the side to move
//! - `genmove` - Let the computer play its turn; answers the moves played
//! - `showboard` - Print the placement row by row
//! - `status` - Game status as a JSON object
//!
//! Moves are written `piece>target`, with `xcaptured` appended for captures.
//!
//! In computer mode the computer does not move on its own; send `genmove`
//! once the human turn has ended.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use tracing::debug;

use crate::ai::Difficulty;
use crate::game::{GameEngine, GameMode, Phase, Transition};
use crate::layouts::BoardSetup;
use crate::movegen::{Move, MoveKind, PieceMove};
use crate::piece::{Player, count_pieces, piece_at};
use crate::topology::Layout;

const PROTOCOL_VERSION: &str = "1";

/// The list of known commands.
const KNOWN_COMMANDS: &[&str] = &[
    "deselect",
    "difficulty",
    "genmove",
    "known_command",
    "layout",
    "list_commands",
    "load",
    "mode",
    "move",
    "moves",
    "name",
    "protocol_version",
    "quit",
    "reset",
    "select",
    "showboard",
    "status",
    "version",
];

/// Read and validate a custom board file.
pub fn load_board(path: &Path) -> anyhow::Result<BoardSetup> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read board file {}", path.display()))?;
    BoardSetup::from_json(&json)
        .with_context(|| format!("failed to load board file {}", path.display()))
}

/// Format a move as `piece>target` or `piece>targetxcaptured`.
pub fn format_move(mv: &PieceMove) -> String {
    match &mv.mv.kind {
        MoveKind::Walk => format!("{}>{}", mv.piece, mv.mv.target),
        MoveKind::Jump { captured } => format!("{}>{}x{}", mv.piece, mv.mv.target, captured),
    }
}

fn format_target(mv: &Move) -> String {
    match &mv.kind {
        MoveKind::Walk => mv.target.clone(),
        MoveKind::Jump { captured } => format!("{}x{}", mv.target, captured),
    }
}

fn phase_name(phase: Phase) -> &'static str {
    match phase {
        Phase::AwaitingSelection => "awaiting-selection",
        Phase::PieceSelected => "piece-selected",
        Phase::ChainJumping => "chain-jumping",
        Phase::GameOver => "game-over",
    }
}

fn transition_name(transition: &Transition) -> String {
    match transition {
        Transition::Selected => "selected".to_string(),
        Transition::Deselected => "deselected".to_string(),
        Transition::TurnEnded => "turn-ended".to_string(),
        Transition::ChainContinues => "chain".to_string(),
        Transition::Passed => "pass".to_string(),
        Transition::GameOver(winner) => format!("game-over {winner}"),
    }
}

/// Snapshot reported by the `status` command.
#[derive(Debug, Serialize)]
struct Status<'a> {
    layout: Layout,
    nodes: usize,
    lines: usize,
    mode: String,
    difficulty: Difficulty,
    turn: Player,
    phase: &'static str,
    selected: Option<&'a str>,
    ply: u64,
    generation: u64,
    pieces: [usize; 2],
    winner: Option<Player>,
}

/// Render the placement one row per y coordinate.
///
/// Each node is printed as `id:c` where `c` is `.` for an empty node, `x`/`X`
/// for a player 1 man/king and `o`/`O` for a player 2 man/king.
pub fn render_board(engine: &GameEngine) -> String {
    let mut rows: BTreeMap<i32, Vec<(i32, &str)>> = BTreeMap::new();
    for (id, node) in engine.topology().nodes() {
        rows.entry(node.y).or_default().push((node.x, id.as_str()));
    }

    let mut out = String::new();
    for (y, mut row) in rows {
        row.sort();
        let _ = write!(out, "{y:>4} |");
        for (_, id) in row {
            let c = match piece_at(engine.pieces(), id) {
                None => '.',
                Some(p) => match (p.player, p.king) {
                    (Player::One, false) => 'x',
                    (Player::One, true) => 'X',
                    (Player::Two, false) => 'o',
                    (Player::Two, true) => 'O',
                },
            };
            let _ = write!(out, " {id}:{c}");
        }
        out.push('\n');
    }
    out.pop();
    out
}

/// A protocol session around one game.
pub struct Session {
    engine: GameEngine,
}

impl Session {
    pub fn new(engine: GameEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    /// Run the command loop until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;

            // Skip empty lines and comments
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (id, command_line) = Self::parse_id(line);
            let parts: Vec<&str> = command_line.split_whitespace().collect();
            let Some((command, args)) = parts.split_first() else {
                continue;
            };
            let command = command.to_lowercase();

            let (success, message) = self.execute(&command, args);
            debug!(%command, success, "command handled");

            let prefix = if success { '=' } else { '?' };
            let id_str = id.map(|i| i.to_string()).unwrap_or_default();
            writeln!(output, "{prefix}{id_str} {message}\n")?;
            output.flush()?;

            if command == "quit" {
                break;
            }
        }
        Ok(())
    }

    /// Parse an optional numeric command id from the beginning of the line.
    fn parse_id(line: &str) -> (Option<u32>, &str) {
        let trimmed = line.trim();
        let end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        if end == 0 {
            return (None, trimmed);
        }
        match trimmed[..end].parse::<u32>() {
            Ok(id) => (Some(id), trimmed[end..].trim()),
            Err(_) => (None, trimmed),
        }
    }

    /// Execute a command and return (success, response).
    pub fn execute(&mut self, command: &str, args: &[&str]) -> (bool, String) {
        match command {
            "name" => (true, env!("CARGO_PKG_NAME").to_string()),

            "version" => (true, env!("CARGO_PKG_VERSION").to_string()),

            "protocol_version" => (true, PROTOCOL_VERSION.to_string()),

            "list_commands" => (true, KNOWN_COMMANDS.join("\n")),

            "known_command" => match args.first() {
                Some(cmd) => {
                    let known = KNOWN_COMMANDS.contains(&cmd.to_lowercase().as_str());
                    (true, known.to_string())
                }
                None => (false, "missing argument".to_string()),
            },

            "quit" => (true, String::new()),

            "layout" => {
                let Some(name) = args.first() else {
                    return (true, self.engine.layout().to_string());
                };
                let setup = name
                    .parse::<Layout>()
                    .and_then(BoardSetup::builtin);
                match setup {
                    Ok(setup) => {
                        self.engine.set_layout(setup);
                        (true, String::new())
                    }
                    Err(e) => (false, e.to_string()),
                }
            }

            "load" => {
                let Some(path) = args.first() else {
                    return (false, "missing argument".to_string());
                };
                match load_board(Path::new(path)) {
                    Ok(setup) => {
                        self.engine.set_layout(setup);
                        (true, String::new())
                    }
                    Err(e) => (false, format!("{e:#}")),
                }
            }

            "reset" => {
                self.engine.reset();
                (true, String::new())
            }

            "mode" => {
                let Some(arg) = args.first() else {
                    return (true, self.engine.mode().to_string());
                };
                match arg.parse::<GameMode>() {
                    Ok(mode) => {
                        self.engine.set_mode(mode);
                        (true, String::new())
                    }
                    Err(e) => (false, e.to_string()),
                }
            }

            "difficulty" => {
                let Some(arg) = args.first() else {
                    return (true, self.engine.difficulty().to_string());
                };
                match arg.parse::<Difficulty>() {
                    Ok(difficulty) => {
                        self.engine.set_difficulty(difficulty);
                        (true, String::new())
                    }
                    Err(e) => (false, e.to_string()),
                }
            }

            "select" => {
                let Some(piece) = args.first() else {
                    return (false, "missing argument".to_string());
                };
                match self.engine.select(piece) {
                    Ok(_) => {
                        let targets: Vec<String> =
                            self.engine.legal_moves().iter().map(format_target).collect();
                        (true, targets.join(" "))
                    }
                    Err(e) => (false, e.to_string()),
                }
            }

            "deselect" => match self.engine.deselect() {
                Ok(t) => (true, transition_name(&t)),
                Err(e) => (false, e.to_string()),
            },

            "move" => {
                let Some(target) = args.first() else {
                    return (false, "missing argument".to_string());
                };
                let result = match args.get(1) {
                    Some(captured) => {
                        let mv = self
                            .engine
                            .legal_moves()
                            .iter()
                            .find(|m| m.target == *target && m.captured() == Some(*captured))
                            .cloned();
                        match mv {
                            Some(mv) => self.engine.play_move(&mv),
                            None => return (false, format!("'{target}' is not a legal target")),
                        }
                    }
                    None => self.engine.play(target),
                };
                match result {
                    Ok(t) => (true, transition_name(&t)),
                    Err(e) => (false, e.to_string()),
                }
            }

            "moves" => {
                let moves: Vec<String> =
                    self.engine.available_moves().iter().map(format_move).collect();
                (true, moves.join("\n"))
            }

            "genmove" => {
                if !self.engine.is_ai_turn() {
                    return (false, "it is not the computer's turn".to_string());
                }
                let start = self.engine.history().len();
                match self.engine.run_ai_turn() {
                    Some(Transition::Passed) => (true, "pass".to_string()),
                    Some(_) => {
                        let played: Vec<String> =
                            self.engine.history()[start..].iter().map(format_move).collect();
                        (true, played.join(" "))
                    }
                    None => (false, "the computer did not move".to_string()),
                }
            }

            "showboard" => (true, format!("\n{}", render_board(&self.engine))),

            "status" => {
                let status = Status {
                    layout: self.engine.layout(),
                    nodes: self.engine.topology().len(),
                    lines: self.engine.topology().lines().len(),
                    mode: self.engine.mode().to_string(),
                    difficulty: self.engine.difficulty(),
                    turn: self.engine.turn(),
                    phase: phase_name(self.engine.phase()),
                    selected: self.engine.selected(),
                    ply: self.engine.ply(),
                    generation: self.engine.generation(),
                    pieces: [
                        count_pieces(self.engine.pieces(), Player::One),
                        count_pieces(self.engine.pieces(), Player::Two),
                    ],
                    winner: self.engine.winner(),
                };
                match serde_json::to_string(&status) {
                    Ok(json) => (true, json),
                    Err(e) => (false, e.to_string()),
                }
            }

            _ => (false, format!("unknown command: {command}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(mode: GameMode) -> Session {
        let setup = BoardSetup::builtin(Layout::Standard).unwrap();
        Session::new(GameEngine::new(setup).with_mode(mode).with_ai_seed(11))
    }

    #[test]
    fn test_parse_id_with_id() {
        let (id, cmd) = Session::parse_id("123 name");
        assert_eq!(id, Some(123));
        assert_eq!(cmd, "name");
    }

    #[test]
    fn test_parse_id_without_id() {
        let (id, cmd) = Session::parse_id("name");
        assert_eq!(id, None);
        assert_eq!(cmd, "name");
    }

    #[test]
    fn test_name_and_known_command() {
        let mut s = session(GameMode::PlayerVsPlayer);
        assert_eq!(s.execute("name", &[]), (true, "qataar".to_string()));
        assert_eq!(s.execute("known_command", &["genmove"]), (true, "true".to_string()));
        assert_eq!(s.execute("known_command", &["komi"]), (true, "false".to_string()));
        assert!(!s.execute("komi", &["7.5"]).0);
    }

    #[test]
    fn test_select_and_move() {
        let mut s = session(GameMode::PlayerVsPlayer);
        let (ok, moves) = s.execute("moves", &[]);
        assert!(ok);
        let first = moves.lines().next().unwrap().to_string();
        let (piece, target) = first.split_once('>').unwrap();

        let (ok, targets) = s.execute("select", &[piece]);
        assert!(ok);
        assert!(targets.split(' ').any(|t| t == target));

        assert_eq!(s.execute("move", &[target]), (true, "turn-ended".to_string()));
        assert_eq!(s.engine().turn(), Player::Two);
    }

    #[test]
    fn test_rejections_are_failures() {
        let mut s = session(GameMode::PlayerVsPlayer);
        assert!(!s.execute("select", &["p2-1"]).0);
        assert!(!s.execute("move", &["5"]).0);
        assert!(!s.execute("mode", &["coop"]).0);
        assert!(!s.execute("layout", &["hexagon"]).0);
        assert!(!s.execute("layout", &["custom"]).0);
        assert!(!s.execute("genmove", &[]).0);
    }

    #[test]
    fn test_genmove_plays_for_computer() {
        let mut s = session(GameMode::PlayerVsComputer);
        let (_, moves) = s.execute("moves", &[]);
        let first = moves.lines().next().unwrap().to_string();
        let (piece, target) = first.split_once('>').unwrap();
        s.execute("select", &[piece]);
        s.execute("move", &[target]);

        let (ok, played) = s.execute("genmove", &[]);
        assert!(ok);
        assert!(played.starts_with("p2-"));
        assert_eq!(s.engine().turn(), Player::One);
    }

    #[test]
    fn test_status_is_json() {
        let mut s = session(GameMode::PlayerVsComputer);
        let (ok, json) = s.execute("status", &[]);
        assert!(ok);
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["layout"], "standard");
        assert_eq!(v["nodes"], 19);
        assert_eq!(v["lines"], 9);
        assert_eq!(v["turn"], 1);
        assert_eq!(v["pieces"], serde_json::json!([9, 9]));
        assert_eq!(v["phase"], "awaiting-selection");
    }

    #[test]
    fn test_showboard_marks_pieces() {
        let mut s = session(GameMode::PlayerVsPlayer);
        let (ok, board) = s.execute("showboard", &[]);
        assert!(ok);
        assert!(board.contains("1:o"));
        assert!(board.contains("18:x"));
        assert!(board.contains("19:."));
    }

    #[test]
    fn test_run_loop_echoes_ids() {
        let mut s = session(GameMode::PlayerVsPlayer);
        let input = b"1 name\n# comment\n\n2 frobnicate\nquit\nname\n";
        let mut out = Vec::new();
        s.run(&input[..], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "=1 qataar\n\n?2 unknown command: frobnicate\n\n= \n\n");
    }
}
