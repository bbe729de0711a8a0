//! Legal move generation.
//!
//! Everything here is a pure function of the piece placement and the
//! topology. Nothing panics on a piece whose node is missing from the board;
//! such a piece simply has no moves.
//!
//! ## Direction rule
//!
//! A regular piece may move sideways (equal y) or forward (player 1 towards
//! smaller y, player 2 towards larger y). Kings move in every direction, and
//! on custom boards every piece does. Captures use the same rule, applied to
//! the direction of the captured piece.
//!
//! ## Capture geometry
//!
//! A capture walks over an adjacent opponent into an empty node adjacent to
//! it. The two hops need not be declared on the same line; instead the
//! approach and landing vectors must point the same way within the topology's
//! colinearity tolerance (see [`crate::constants::COLINEARITY_THRESHOLD`]).

use serde::{Deserialize, Serialize};

use crate::piece::{Piece, PieceId, Player, piece_at, piece_by_id};
use crate::topology::{Layout, Node, NodeId, Topology};

/// What a move does besides relocating the piece.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MoveKind {
    Walk,
    Jump { captured: PieceId },
}

/// A single-step move of some piece to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub target: NodeId,
    #[serde(flatten)]
    pub kind: MoveKind,
}

impl Move {
    pub fn walk(target: impl Into<NodeId>) -> Self {
        Self {
            target: target.into(),
            kind: MoveKind::Walk,
        }
    }

    pub fn jump(target: impl Into<NodeId>, captured: impl Into<PieceId>) -> Self {
        Self {
            target: target.into(),
            kind: MoveKind::Jump {
                captured: captured.into(),
            },
        }
    }

    #[inline]
    pub fn is_jump(&self) -> bool {
        matches!(self.kind, MoveKind::Jump { .. })
    }

    pub fn captured(&self) -> Option<&str> {
        match &self.kind {
            MoveKind::Jump { captured } => Some(captured),
            MoveKind::Walk => None,
        }
    }
}

/// A move bound to the piece that makes it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PieceMove {
    #[serde(rename = "pieceId")]
    pub piece: PieceId,
    #[serde(flatten)]
    pub mv: Move,
}

impl PieceMove {
    pub fn new(piece: impl Into<PieceId>, mv: Move) -> Self {
        Self {
            piece: piece.into(),
            mv,
        }
    }

    #[inline]
    pub fn is_jump(&self) -> bool {
        self.mv.is_jump()
    }
}

/// Position after a move has been applied.
#[derive(Debug, Clone)]
pub struct Applied {
    pub pieces: Vec<Piece>,
    /// The moving piece was crowned by this move.
    pub promoted: bool,
}

/// Whether a piece may travel in a direction whose y component is `dy`.
#[inline]
pub fn direction_allowed(piece: &Piece, dy: i64, layout: Layout) -> bool {
    piece.king || layout.is_custom() || dy == 0 || dy.signum() == piece.player.forward_dy()
}

/// All moves available to `piece`, ignoring the forced-capture rule.
pub fn valid_moves(piece: &Piece, pieces: &[Piece], topo: &Topology) -> Vec<Move> {
    let mut moves = Vec::new();
    let Some(origin) = topo.node(&piece.node) else {
        return moves;
    };
    let layout = topo.layout();

    for neighbor in topo.neighbors(&piece.node) {
        let Some(mid) = topo.node(neighbor) else {
            continue;
        };
        match piece_at(pieces, neighbor) {
            None => {
                if direction_allowed(piece, delta(origin, mid).1, layout) {
                    moves.push(Move::walk(neighbor.clone()));
                }
            }
            Some(occupant) if occupant.player != piece.player => {
                let v1 = delta(origin, mid);
                if !direction_allowed(piece, v1.1, layout) {
                    continue;
                }
                for landing in topo.neighbors(neighbor) {
                    if *landing == piece.node || piece_at(pieces, landing).is_some() {
                        continue;
                    }
                    let Some(end) = topo.node(landing) else {
                        continue;
                    };
                    let v2 = delta(mid, end);
                    if is_straight(v1, v2, topo.colinearity_threshold()) {
                        moves.push(Move::jump(landing.clone(), occupant.id.clone()));
                    }
                }
            }
            Some(_) => {}
        }
    }
    moves
}

/// Capture moves available to `piece`.
pub fn jump_moves(piece: &Piece, pieces: &[Piece], topo: &Topology) -> Vec<Move> {
    let mut moves = valid_moves(piece, pieces, topo);
    moves.retain(Move::is_jump);
    moves
}

/// Every legal move for `player`.
///
/// If any capture exists, only captures are returned.
pub fn player_moves(player: Player, pieces: &[Piece], topo: &Topology) -> Vec<PieceMove> {
    let all: Vec<PieceMove> = pieces
        .iter()
        .filter(|p| p.player == player)
        .flat_map(|p| {
            valid_moves(p, pieces, topo)
                .into_iter()
                .map(move |m| PieceMove::new(p.id.clone(), m))
        })
        .collect();

    if all.iter().any(PieceMove::is_jump) {
        all.into_iter().filter(PieceMove::is_jump).collect()
    } else {
        all
    }
}

/// Apply `mv` to a copy of `pieces`: relocate, crown, then remove the
/// captured piece.
///
/// An unknown piece id leaves the placement unchanged.
pub fn apply_move(pieces: &[Piece], mv: &PieceMove, topo: &Topology) -> Applied {
    let mut next = pieces.to_vec();
    let mut promoted = false;

    if let Some(moving) = next.iter_mut().find(|p| p.id == mv.piece) {
        moving.node = mv.mv.target.clone();
        if !moving.king && topo.is_promotion_node(moving.player, &moving.node) {
            moving.king = true;
            promoted = true;
        }
        if let Some(captured) = mv.mv.captured() {
            next.retain(|p| p.id != captured);
        }
    }

    Applied {
        pieces: next,
        promoted,
    }
}

/// Further captures the piece that just moved is forced to continue with.
///
/// Empty when the move was a walk or crowned the piece: crowning always ends
/// the turn.
pub fn chain_continuation(mv: &PieceMove, applied: &Applied, topo: &Topology) -> Vec<Move> {
    if !mv.is_jump() || applied.promoted {
        return Vec::new();
    }
    match piece_by_id(&applied.pieces, &mv.piece) {
        Some(piece) => jump_moves(piece, &applied.pieces, topo),
        None => Vec::new(),
    }
}

/// Vector from `from` to `to`, widened so any pair of `i32` coordinates fits.
#[inline]
fn delta(from: &Node, to: &Node) -> (i64, i64) {
    (
        i64::from(to.x) - i64::from(from.x),
        i64::from(to.y) - i64::from(from.y),
    )
}

fn is_straight(v1: (i64, i64), v2: (i64, i64), threshold: f64) -> bool {
    let (x1, y1) = (v1.0 as f64, v1.1 as f64);
    let (x2, y2) = (v2.0 as f64, v2.1 as f64);
    let len1 = x1.hypot(y1);
    let len2 = x2.hypot(y2);
    if len1 == 0.0 || len2 == 0.0 {
        return false;
    }
    (x1 * x2 + y1 * y2) / (len1 * len2) > threshold
}
