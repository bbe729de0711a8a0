//! Computer opponent: difficulty policy and the background worker.
//!
//! The computer always plays player 2. A decision is computed from an
//! immutable [`AiRequest`] snapshot, either inline with [`choose_move`] or on
//! a background thread through [`AiState::spawn`]. The only thing that crosses
//! the thread boundary is plain data: the request goes in, an [`AiResponse`]
//! comes back over a channel.
//!
//! Every request carries a [`Ticket`] naming the board generation and ply it
//! was computed for, so the engine can discard answers that arrive after a
//! reset or layout change.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError, channel};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::constants::{HARD_DEPTH, NORMAL_DEPTH};
use crate::movegen::{PieceMove, player_moves};
use crate::piece::{Piece, Player};
use crate::search::{INF, Searcher, order_moves};
use crate::topology::Topology;

/// Strength of the computer opponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Uniformly random legal move.
    Easy,
    #[default]
    Normal,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown difficulty '{0}' (expected easy, normal or hard)")]
pub struct ParseDifficultyError(pub String);

impl Difficulty {
    /// Search depth in turns, or `None` for the random policy.
    pub fn search_depth(self) -> Option<u32> {
        match self {
            Difficulty::Easy => None,
            Difficulty::Normal => Some(NORMAL_DEPTH),
            Difficulty::Hard => Some(HARD_DEPTH),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "normal" => Ok(Difficulty::Normal),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(ParseDifficultyError(s.to_string())),
        }
    }
}

/// Identifies the game state a request was computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    /// Bumped on every reset or layout change.
    pub generation: u64,
    /// Bumped on every applied move or pass.
    pub ply: u64,
}

/// Immutable snapshot handed to the computer.
#[derive(Debug, Clone)]
pub struct AiRequest {
    pub pieces: Vec<Piece>,
    pub topology: Arc<Topology>,
    pub difficulty: Difficulty,
    pub ticket: Ticket,
    /// Fixed seed for reproducible play; `None` draws from entropy.
    pub seed: Option<u64>,
}

/// The computer's answer. `best` is `None` when player 2 has no legal move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiResponse {
    pub ticket: Ticket,
    pub best: Option<PieceMove>,
}

/// Pick a move for player 2.
///
/// Easy picks uniformly among the legal moves. Normal and hard shuffle the
/// candidates, put captures first, and keep the first candidate whose
/// searched value beats every earlier one, so equal captures are chosen at
/// random rather than by generation order.
pub fn choose_move(
    pieces: &[Piece],
    topology: &Topology,
    difficulty: Difficulty,
    rng: &mut fastrand::Rng,
) -> Option<PieceMove> {
    let mut moves = player_moves(Player::Two, pieces, topology);
    if moves.is_empty() {
        debug!("computer has no legal move");
        return None;
    }

    let Some(depth) = difficulty.search_depth() else {
        let idx = rng.usize(..moves.len());
        return Some(moves.swap_remove(idx));
    };

    rng.shuffle(&mut moves);
    order_moves(&mut moves);

    let mut searcher = Searcher::new(topology);
    let mut best: Option<(PieceMove, i32)> = None;

    for mv in moves {
        let value = searcher.successor_value(pieces, &mv, depth, -INF, INF, Player::Two);
        if best.as_ref().is_none_or(|(_, b)| value > *b) {
            best = Some((mv, value));
        }
    }

    let (mv, value) = best?;
    info!(
        %difficulty,
        piece = %mv.piece,
        target = %mv.mv.target,
        value,
        nodes = searcher.nodes(),
        "computer chose move"
    );
    Some(mv)
}

/// Answer a request synchronously.
pub fn respond(request: &AiRequest) -> AiResponse {
    let mut rng = match request.seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };
    AiResponse {
        ticket: request.ticket,
        best: choose_move(&request.pieces, &request.topology, request.difficulty, &mut rng),
    }
}

/// Result of checking on a running computation.
#[derive(Debug)]
pub enum AiPoll {
    Pending,
    Ready(AiResponse),
    /// The worker went away without answering.
    Lost,
}

/// Computation state of the computer opponent.
///
/// At most one computation is outstanding; the engine refuses to start a
/// second one while `Thinking`.
#[derive(Debug, Default)]
pub enum AiState {
    #[default]
    Idle,
    Thinking {
        receiver: Receiver<AiResponse>,
        ticket: Ticket,
        started: Instant,
    },
}

impl AiState {
    /// Run `request` on a new worker thread.
    pub fn spawn(request: AiRequest) -> Self {
        let ticket = request.ticket;
        let (tx, rx) = channel();

        thread::spawn(move || {
            let response = respond(&request);
            // The receiver is gone if the game was reset meanwhile.
            let _ = tx.send(response);
        });

        AiState::Thinking {
            receiver: rx,
            ticket,
            started: Instant::now(),
        }
    }

    pub fn is_thinking(&self) -> bool {
        matches!(self, AiState::Thinking { .. })
    }

    pub fn ticket(&self) -> Option<Ticket> {
        match self {
            AiState::Thinking { ticket, .. } => Some(*ticket),
            AiState::Idle => None,
        }
    }

    /// Time spent on the outstanding computation.
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            AiState::Thinking { started, .. } => Some(started.elapsed()),
            AiState::Idle => None,
        }
    }

    /// Non-blocking check. A finished computation resets the state to idle.
    pub fn poll(&mut self) -> AiPoll {
        let polled = match self {
            AiState::Idle => return AiPoll::Pending,
            AiState::Thinking { receiver, .. } => match receiver.try_recv() {
                Ok(response) => AiPoll::Ready(response),
                Err(TryRecvError::Empty) => return AiPoll::Pending,
                Err(TryRecvError::Disconnected) => AiPoll::Lost,
            },
        };
        *self = AiState::Idle;
        polled
    }

    /// Block until the outstanding computation answers.
    pub fn wait(&mut self) -> AiPoll {
        let polled = match self {
            AiState::Idle => return AiPoll::Pending,
            AiState::Thinking { receiver, .. } => match receiver.recv() {
                Ok(response) => AiPoll::Ready(response),
                Err(_) => AiPoll::Lost,
            },
        };
        *self = AiState::Idle;
        polled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movegen::Move;
    use crate::topology::{Layout, Node};

    fn column(len: i32) -> Arc<Topology> {
        let ids: Vec<String> = (0..len).map(|i| format!("n{i}")).collect();
        Arc::new(
            Topology::new(
                Layout::Standard,
                ids.iter().enumerate().map(|(i, id)| (id.clone(), Node::new(0, i as i32))),
                [ids.clone()],
            )
            .with_promotion_rows(Vec::<String>::new(), Vec::<String>::new()),
        )
    }

    fn ticket() -> Ticket {
        Ticket {
            generation: 0,
            ply: 0,
        }
    }

    #[test]
    fn test_difficulty_parse_and_depth() {
        assert_eq!("HARD".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("expert".parse::<Difficulty>().is_err());
        assert_eq!(Difficulty::Easy.search_depth(), None);
        assert_eq!(Difficulty::Normal.search_depth(), Some(NORMAL_DEPTH));
        assert_eq!(Difficulty::Hard.search_depth(), Some(HARD_DEPTH));
    }

    #[test]
    fn test_single_legal_move_every_difficulty() {
        let t = column(3);
        let pieces = vec![Piece::new("a", Player::Two, "n0")];
        for difficulty in [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard] {
            let mut rng = fastrand::Rng::with_seed(7);
            let mv = choose_move(&pieces, &t, difficulty, &mut rng);
            assert_eq!(mv, Some(PieceMove::new("a", Move::walk("n1"))));
        }
    }

    #[test]
    fn test_no_move_gives_none() {
        let t = column(2);
        let pieces = vec![Piece::new("a", Player::Two, "n1")];
        let mut rng = fastrand::Rng::with_seed(1);
        assert_eq!(choose_move(&pieces, &t, Difficulty::Hard, &mut rng), None);
    }

    #[test]
    fn test_worker_round_trip() {
        let request = AiRequest {
            pieces: vec![Piece::new("a", Player::Two, "n0")],
            topology: column(3),
            difficulty: Difficulty::Normal,
            ticket: ticket(),
            seed: Some(3),
        };
        let mut state = AiState::spawn(request);
        assert!(state.is_thinking());
        assert_eq!(state.ticket(), Some(ticket()));
        match state.wait() {
            AiPoll::Ready(resp) => {
                assert_eq!(resp.ticket, ticket());
                assert_eq!(resp.best, Some(PieceMove::new("a", Move::walk("n1"))));
            }
            other => panic!("unexpected poll result {other:?}"),
        }
        assert!(!state.is_thinking());
        assert!(matches!(state.poll(), AiPoll::Pending));
    }
}
