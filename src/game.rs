//! The game engine: the one owner of mutable game state.
//!
//! The engine is a small state machine:
//!
//! | from                               | event                                   | to                  |
//! |------------------------------------|-----------------------------------------|---------------------|
//! | `AwaitingSelection`/`PieceSelected` | select own piece with legal moves       | `PieceSelected`     |
//! | `PieceSelected`                    | walk, or capture ending the turn        | `AwaitingSelection` |
//! | `PieceSelected`/`ChainJumping`     | capture leaving further captures        | `ChainJumping`      |
//! | `ChainJumping`                     | capture with no follow-up, or crowning  | `AwaitingSelection` |
//! | any                                | a side runs out of pieces               | `GameOver`          |
//!
//! Every change to the placement goes through [`GameEngine::apply`]. Requests
//! that do not fit the current state are answered with a [`Rejection`] and
//! leave the state untouched.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ai::{AiPoll, AiRequest, AiResponse, AiState, Difficulty, Ticket};
use crate::layouts::BoardSetup;
use crate::movegen::{Move, PieceMove, apply_move, chain_continuation, player_moves};
use crate::piece::{Piece, Player, count_pieces, piece_by_id};
use crate::topology::{Layout, Topology};

/// Turn phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    AwaitingSelection,
    PieceSelected,
    /// A capture chain is in progress; only the locked piece may move and
    /// only by capturing.
    ChainJumping,
    GameOver,
}

/// Who controls player 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameMode {
    PlayerVsPlayer,
    #[default]
    PlayerVsComputer,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown game mode '{0}' (expected pvp or pvc)")]
pub struct ParseGameModeError(pub String);

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameMode::PlayerVsPlayer => f.write_str("pvp"),
            GameMode::PlayerVsComputer => f.write_str("pvc"),
        }
    }
}

impl FromStr for GameMode {
    type Err = ParseGameModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pvp" => Ok(GameMode::PlayerVsPlayer),
            "pvc" => Ok(GameMode::PlayerVsComputer),
            _ => Err(ParseGameModeError(s.to_string())),
        }
    }
}

/// Why a request was ignored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("the game is over")]
    GameOver,
    #[error("the computer is thinking")]
    AiThinking,
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("no piece with id '{0}'")]
    UnknownPiece(String),
    #[error("piece '{0}' belongs to the other player")]
    NotYourPiece(String),
    #[error("piece '{0}' has no legal moves")]
    NoLegalMoves(String),
    #[error("a capture chain is in progress")]
    ChainInProgress,
    #[error("no piece is selected")]
    NothingSelected,
    #[error("'{0}' is not a legal target")]
    IllegalTarget(String),
    #[error("a legal move is available")]
    MovesAvailable,
}

/// What an accepted request did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Selected,
    Deselected,
    /// The move finished the turn; the other player is to move.
    TurnEnded,
    /// The capturing piece must capture again.
    ChainContinues,
    /// The side to move had nothing to play.
    Passed,
    GameOver(Player),
}

/// Result of asking the computer to take its turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiStep {
    /// Not the computer's turn (or the game is over).
    NotAiTurn,
    /// A computation is already outstanding.
    AlreadyThinking,
    /// A background computation was started.
    Started,
}

/// Owner of a game session.
#[derive(Debug)]
pub struct GameEngine {
    setup: BoardSetup,
    pieces: Vec<Piece>,
    turn: Player,
    phase: Phase,
    selected: Option<String>,
    legal: Vec<Move>,
    winner: Option<Player>,
    mode: GameMode,
    difficulty: Difficulty,
    generation: u64,
    ply: u64,
    ai: AiState,
    ai_seed: Option<u64>,
    history: Vec<PieceMove>,
}

impl GameEngine {
    pub fn new(setup: BoardSetup) -> Self {
        let pieces = setup.initial_pieces.clone();
        let mut engine = Self {
            setup,
            pieces,
            turn: Player::One,
            phase: Phase::AwaitingSelection,
            selected: None,
            legal: Vec::new(),
            winner: None,
            mode: GameMode::default(),
            difficulty: Difficulty::default(),
            generation: 0,
            ply: 0,
            ai: AiState::Idle,
            ai_seed: None,
            history: Vec::new(),
        };
        engine.settle_start();
        engine
    }

    pub fn with_mode(mut self, mode: GameMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Make the computer's random choices reproducible.
    pub fn with_ai_seed(mut self, seed: u64) -> Self {
        self.ai_seed = Some(seed);
        self
    }

    // =========================================================================
    // Observers
    // =========================================================================

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn turn(&self) -> Player {
        self.turn
    }

    pub fn winner(&self) -> Option<Player> {
        self.winner
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Legal moves of the selected piece.
    pub fn legal_moves(&self) -> &[Move] {
        &self.legal
    }

    pub fn is_chain_jumping(&self) -> bool {
        self.phase == Phase::ChainJumping
    }

    pub fn topology(&self) -> &Arc<Topology> {
        &self.setup.topology
    }

    pub fn layout(&self) -> Layout {
        self.setup.layout()
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ply(&self) -> u64 {
        self.ply
    }

    /// Moves applied since the last reset, in order.
    pub fn history(&self) -> &[PieceMove] {
        &self.history
    }

    /// The state an AI answer must have been computed for to be accepted.
    pub fn ticket(&self) -> Ticket {
        Ticket {
            generation: self.generation,
            ply: self.ply,
        }
    }

    /// Every legal move for the side to move, forced capture applied.
    pub fn available_moves(&self) -> Vec<PieceMove> {
        if self.phase == Phase::GameOver {
            return Vec::new();
        }
        if self.phase == Phase::ChainJumping {
            let piece = self.selected.clone().unwrap_or_default();
            return self
                .legal
                .iter()
                .map(|m| PieceMove::new(piece.clone(), m.clone()))
                .collect();
        }
        player_moves(self.turn, &self.pieces, &self.setup.topology)
    }

    /// Legal moves of one piece of the side to move.
    pub fn moves_for(&self, piece_id: &str) -> Vec<Move> {
        self.available_moves()
            .into_iter()
            .filter(|m| m.piece == piece_id)
            .map(|m| m.mv)
            .collect()
    }

    // =========================================================================
    // Session control
    // =========================================================================

    /// Restore the initial placement and clear turn, selection, winner and
    /// chain state. Any outstanding computer answer becomes stale.
    pub fn reset(&mut self) {
        self.pieces = self.setup.initial_pieces.clone();
        self.turn = Player::One;
        self.phase = Phase::AwaitingSelection;
        self.selected = None;
        self.legal.clear();
        self.winner = None;
        self.ai = AiState::Idle;
        self.history.clear();
        self.generation += 1;
        self.ply = 0;
        debug!(generation = self.generation, layout = %self.layout(), "game reset");
        self.settle_start();
    }

    /// A starting placement with one side already empty is decided at once.
    fn settle_start(&mut self) {
        if let Some(winner) = self.check_winner() {
            self.finish(winner);
        }
    }

    /// Switch to another board. The game restarts.
    pub fn set_layout(&mut self, setup: BoardSetup) {
        self.setup = setup;
        self.reset();
    }

    /// Switch between two-player and computer play. The game restarts.
    pub fn set_mode(&mut self, mode: GameMode) {
        self.mode = mode;
        self.reset();
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
    }

    // =========================================================================
    // Human input
    // =========================================================================

    /// Select one of the side-to-move's pieces.
    pub fn select(&mut self, piece_id: &str) -> Result<Transition, Rejection> {
        self.check_human_input()?;

        if self.phase == Phase::ChainJumping {
            return if self.selected.as_deref() == Some(piece_id) {
                Ok(Transition::Selected)
            } else {
                Err(Rejection::ChainInProgress)
            };
        }

        let piece = piece_by_id(&self.pieces, piece_id)
            .ok_or_else(|| Rejection::UnknownPiece(piece_id.to_string()))?;
        if piece.player != self.turn {
            return Err(Rejection::NotYourPiece(piece_id.to_string()));
        }

        let moves = self.moves_for(piece_id);
        if moves.is_empty() {
            return Err(Rejection::NoLegalMoves(piece_id.to_string()));
        }

        debug!(piece = piece_id, moves = moves.len(), "piece selected");
        self.selected = Some(piece_id.to_string());
        self.legal = moves;
        self.phase = Phase::PieceSelected;
        Ok(Transition::Selected)
    }

    /// Drop the current selection.
    pub fn deselect(&mut self) -> Result<Transition, Rejection> {
        self.check_human_input()?;
        match self.phase {
            Phase::ChainJumping => Err(Rejection::ChainInProgress),
            Phase::PieceSelected => {
                self.clear_selection();
                Ok(Transition::Deselected)
            }
            _ => Err(Rejection::NothingSelected),
        }
    }

    /// Move the selected piece to `target`.
    ///
    /// When two captures land on the same node, the first one generated is
    /// played; use [`GameEngine::play_move`] to pick a specific capture.
    pub fn play(&mut self, target: &str) -> Result<Transition, Rejection> {
        self.check_human_input()?;
        self.selected.as_ref().ok_or(Rejection::NothingSelected)?;
        let mv = self
            .legal
            .iter()
            .find(|m| m.target == target)
            .cloned()
            .ok_or_else(|| Rejection::IllegalTarget(target.to_string()))?;
        self.play_move(&mv)
    }

    /// Play one of the selected piece's legal moves.
    pub fn play_move(&mut self, mv: &Move) -> Result<Transition, Rejection> {
        self.check_human_input()?;
        let piece = self.selected.clone().ok_or(Rejection::NothingSelected)?;
        if !self.legal.contains(mv) {
            return Err(Rejection::IllegalTarget(mv.target.clone()));
        }
        Ok(self.apply(PieceMove::new(piece, mv.clone())))
    }

    /// Hand the turn over when the side to move has no legal move.
    pub fn pass_turn(&mut self) -> Result<Transition, Rejection> {
        self.check_human_input()?;
        if !self.available_moves().is_empty() {
            return Err(Rejection::MovesAvailable);
        }
        Ok(self.pass())
    }

    fn check_human_input(&self) -> Result<(), Rejection> {
        if self.phase == Phase::GameOver {
            return Err(Rejection::GameOver);
        }
        if self.ai.is_thinking() {
            return Err(Rejection::AiThinking);
        }
        if self.is_ai_turn() {
            return Err(Rejection::NotYourTurn);
        }
        Ok(())
    }

    // =========================================================================
    // State transitions
    // =========================================================================

    /// Apply a legal move. This is the only place the placement changes.
    fn apply(&mut self, mv: PieceMove) -> Transition {
        let applied = apply_move(&self.pieces, &mv, &self.setup.topology);
        let chain = chain_continuation(&mv, &applied, &self.setup.topology);
        self.pieces = applied.pieces;
        self.ply += 1;

        debug!(
            player = %self.turn,
            piece = %mv.piece,
            target = %mv.mv.target,
            captured = mv.mv.captured(),
            promoted = applied.promoted,
            "move applied"
        );
        self.history.push(mv.clone());

        if let Some(winner) = self.check_winner() {
            return self.finish(winner);
        }

        if chain.is_empty() {
            self.end_turn();
            Transition::TurnEnded
        } else {
            self.selected = Some(mv.piece);
            self.legal = chain;
            self.phase = Phase::ChainJumping;
            Transition::ChainContinues
        }
    }

    /// Hand the turn over without moving.
    fn pass(&mut self) -> Transition {
        debug!(player = %self.turn, "turn passed");
        self.ply += 1;
        self.end_turn();
        Transition::Passed
    }

    fn end_turn(&mut self) {
        self.turn = self.turn.opponent();
        self.clear_selection();
    }

    fn clear_selection(&mut self) {
        self.selected = None;
        self.legal.clear();
        self.phase = Phase::AwaitingSelection;
    }

    fn check_winner(&self) -> Option<Player> {
        if self.pieces.is_empty() {
            return None;
        }
        if count_pieces(&self.pieces, Player::One) == 0 {
            Some(Player::Two)
        } else if count_pieces(&self.pieces, Player::Two) == 0 {
            Some(Player::One)
        } else {
            None
        }
    }

    fn finish(&mut self, winner: Player) -> Transition {
        info!(%winner, ply = self.ply, "game over");
        self.winner = Some(winner);
        self.selected = None;
        self.legal.clear();
        self.phase = Phase::GameOver;
        Transition::GameOver(winner)
    }

    // =========================================================================
    // Computer opponent
    // =========================================================================

    pub fn is_ai_turn(&self) -> bool {
        self.mode == GameMode::PlayerVsComputer
            && self.turn == Player::Two
            && self.phase != Phase::GameOver
    }

    pub fn is_ai_thinking(&self) -> bool {
        self.ai.is_thinking()
    }

    /// Start a background search for the computer's turn; collect its
    /// answer with [`GameEngine::poll_ai`] or [`GameEngine::wait_ai`].
    ///
    /// The computer never starts a turn mid-chain: its chains are finished
    /// when its answer is applied.
    pub fn start_ai(&mut self) -> AiStep {
        if !self.is_ai_turn() {
            return AiStep::NotAiTurn;
        }
        if self.ai.is_thinking() {
            return AiStep::AlreadyThinking;
        }
        let request = AiRequest {
            pieces: self.pieces.clone(),
            topology: Arc::clone(&self.setup.topology),
            difficulty: self.difficulty,
            ticket: self.ticket(),
            seed: self.ai_seed.map(|s| s.wrapping_add(self.ply)),
        };
        debug!(difficulty = %self.difficulty, ply = self.ply, "computer thinking");
        self.ai = AiState::spawn(request);
        AiStep::Started
    }

    /// Apply the computer's answer if it has arrived.
    pub fn poll_ai(&mut self) -> Option<Transition> {
        let elapsed = self.ai.elapsed();
        let polled = self.ai.poll();
        self.handle_poll(polled, elapsed)
    }

    /// Block until the computer answers, then apply it.
    pub fn wait_ai(&mut self) -> Option<Transition> {
        let elapsed = self.ai.elapsed();
        let polled = self.ai.wait();
        self.handle_poll(polled, elapsed)
    }

    /// Start the computer's turn and wait for it to finish.
    pub fn run_ai_turn(&mut self) -> Option<Transition> {
        match self.start_ai() {
            AiStep::Started => self.wait_ai(),
            AiStep::NotAiTurn | AiStep::AlreadyThinking => None,
        }
    }

    fn handle_poll(&mut self, polled: AiPoll, elapsed: Option<Duration>) -> Option<Transition> {
        match polled {
            AiPoll::Pending => None,
            AiPoll::Ready(response) => {
                debug!(?elapsed, "computer answered");
                self.apply_ai_response(response)
            }
            AiPoll::Lost => {
                warn!("computer worker stopped without answering");
                self.is_ai_turn().then(|| self.pass())
            }
        }
    }

    /// Apply a computer answer computed for `response.ticket`.
    ///
    /// Answers for an earlier generation or ply are dropped. A missing move
    /// passes the turn. After a capture that opens a chain, the forced
    /// follow-up captures are played straight away.
    pub fn apply_ai_response(&mut self, response: AiResponse) -> Option<Transition> {
        if response.ticket != self.ticket() || !self.is_ai_turn() || self.ai.is_thinking() {
            debug!(stale = ?response.ticket, current = ?self.ticket(), "discarding stale computer answer");
            return None;
        }

        let Some(mv) = response.best else {
            return Some(self.pass());
        };

        if !player_moves(Player::Two, &self.pieces, &self.setup.topology).contains(&mv) {
            warn!(piece = %mv.piece, target = %mv.mv.target, "computer answered with an illegal move");
            return Some(self.pass());
        }

        match self.apply(mv) {
            Transition::ChainContinues => Some(self.finish_forced_chain()),
            other => Some(other),
        }
    }

    /// Keep capturing with the locked piece until the chain ends.
    fn finish_forced_chain(&mut self) -> Transition {
        loop {
            let Some(piece) = self.selected.clone() else {
                return self.pass();
            };
            let Some(mv) = self.legal.first().cloned() else {
                return self.pass();
            };
            match self.apply(PieceMove::new(piece, mv)) {
                Transition::ChainContinues => continue,
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Node;

    fn setup(nodes: &[(&str, i32, i32)], lines: &[&[&str]], pieces: Vec<Piece>) -> BoardSetup {
        let topology = Topology::new(
            Layout::Standard,
            nodes.iter().map(|&(id, x, y)| (id.to_string(), Node::new(x, y))),
            lines
                .iter()
                .map(|l| l.iter().map(|s| s.to_string()).collect::<Vec<_>>()),
        )
        .with_promotion_rows(["top"], ["bottom"]);
        BoardSetup {
            topology: Arc::new(topology),
            initial_pieces: pieces,
        }
    }

    fn pvp(setup: BoardSetup) -> GameEngine {
        GameEngine::new(setup).with_mode(GameMode::PlayerVsPlayer)
    }

    #[test]
    fn test_select_and_walk_passes_turn() {
        let s = setup(
            &[("a", 0, 2), ("b", 0, 1), ("x", 5, 0), ("y", 5, 1)],
            &[&["a", "b"], &["x", "y"]],
            vec![
                Piece::new("p1", Player::One, "a"),
                Piece::new("p2", Player::Two, "x"),
            ],
        );
        let mut g = pvp(s);
        assert_eq!(g.select("p1"), Ok(Transition::Selected));
        assert_eq!(g.phase(), Phase::PieceSelected);
        assert_eq!(g.legal_moves(), &[Move::walk("b")]);
        assert_eq!(g.play("b"), Ok(Transition::TurnEnded));
        assert_eq!(g.turn(), Player::Two);
        assert_eq!(g.phase(), Phase::AwaitingSelection);
        assert!(g.selected().is_none());
        assert!(g.legal_moves().is_empty());
    }

    #[test]
    fn test_rejections_leave_state_untouched() {
        let s = setup(
            &[("a", 0, 2), ("b", 0, 1), ("x", 5, 0), ("y", 5, 1)],
            &[&["a", "b"], &["x", "y"]],
            vec![
                Piece::new("p1", Player::One, "a"),
                Piece::new("p2", Player::Two, "x"),
            ],
        );
        let mut g = pvp(s);
        assert_eq!(g.select("p2"), Err(Rejection::NotYourPiece("p2".into())));
        assert_eq!(g.select("zz"), Err(Rejection::UnknownPiece("zz".into())));
        assert_eq!(g.play("b"), Err(Rejection::NothingSelected));
        g.select("p1").unwrap();
        assert_eq!(g.play("x"), Err(Rejection::IllegalTarget("x".into())));
        assert_eq!(g.phase(), Phase::PieceSelected);
        assert_eq!(g.ply(), 0);
        assert_eq!(g.deselect(), Ok(Transition::Deselected));
        assert_eq!(g.phase(), Phase::AwaitingSelection);
    }

    #[test]
    fn test_piece_without_moves_is_not_selected() {
        let s = setup(
            &[("a", 0, 2), ("b", 0, 1), ("c", 0, 3)],
            &[&["c", "a", "b"]],
            vec![
                Piece::new("p1", Player::One, "a"),
                Piece::new("blocker", Player::One, "b"),
                Piece::new("p2", Player::Two, "c"),
            ],
        );
        let mut g = pvp(s);
        assert_eq!(g.select("p1"), Err(Rejection::NoLegalMoves("p1".into())));
        assert_eq!(g.phase(), Phase::AwaitingSelection);
    }

    #[test]
    fn test_human_must_capture_when_possible() {
        // p1 can capture p2; q1 could only walk
        let s = setup(
            &[("a", 0, 4), ("b", 0, 3), ("c", 0, 2), ("x", 5, 4), ("y", 5, 3)],
            &[&["a", "b", "c"], &["x", "y"]],
            vec![
                Piece::new("p1", Player::One, "a"),
                Piece::new("q1", Player::One, "x"),
                Piece::new("p2", Player::Two, "b"),
            ],
        );
        let mut g = pvp(s);
        assert_eq!(g.select("q1"), Err(Rejection::NoLegalMoves("q1".into())));
        g.select("p1").unwrap();
        assert_eq!(g.legal_moves(), &[Move::jump("c", "p2")]);
    }

    #[test]
    fn test_reset_bumps_generation() {
        let s = setup(
            &[("a", 0, 2), ("b", 0, 1), ("x", 5, 0), ("y", 5, 1)],
            &[&["a", "b"], &["x", "y"]],
            vec![
                Piece::new("p1", Player::One, "a"),
                Piece::new("p2", Player::Two, "x"),
            ],
        );
        let mut g = pvp(s);
        g.select("p1").unwrap();
        g.play("b").unwrap();
        let before = g.ticket();
        g.reset();
        assert_eq!(g.turn(), Player::One);
        assert_eq!(g.ply(), 0);
        assert_ne!(g.ticket(), before);
        assert_eq!(g.pieces()[0].node, "a");
    }

    #[test]
    fn test_play_checks_state_before_target() {
        let s = setup(
            &[("a", 0, 2), ("b", 0, 1), ("c", 0, 0)],
            &[&["a", "b", "c"]],
            vec![
                Piece::new("p1", Player::One, "a"),
                Piece::new("p2", Player::Two, "b"),
            ],
        );
        let mut g = pvp(s);
        assert_eq!(g.play("c"), Err(Rejection::NothingSelected));
        g.select("p1").unwrap();
        assert_eq!(g.play("c"), Ok(Transition::GameOver(Player::One)));
        assert_eq!(g.play("c"), Err(Rejection::GameOver));
        assert_eq!(g.play("nowhere"), Err(Rejection::GameOver));
    }

    #[test]
    fn test_one_sided_start_is_decided() {
        let s = setup(
            &[("a", 0, 2), ("b", 0, 1)],
            &[&["a", "b"]],
            vec![Piece::new("p1", Player::One, "a")],
        );
        let mut g = pvp(s);
        assert_eq!(g.winner(), Some(Player::One));
        assert_eq!(g.phase(), Phase::GameOver);
        assert_eq!(g.select("p1"), Err(Rejection::GameOver));
        assert!(g.available_moves().is_empty());

        g.reset();
        assert_eq!(g.winner(), Some(Player::One));
        assert_eq!(g.phase(), Phase::GameOver);
    }

    #[test]
    fn test_game_mode_parse() {
        assert_eq!("PvC".parse::<GameMode>(), Ok(GameMode::PlayerVsComputer));
        assert!("coop".parse::<GameMode>().is_err());
        assert_eq!(GameMode::PlayerVsPlayer.to_string(), "pvp");
    }
}
