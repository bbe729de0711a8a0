//! Players and pieces.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::topology::{NodeId, deserialize_id};

/// Identifier of a piece, e.g. `"p1-4"`.
pub type PieceId = String;

/// One of the two sides.
///
/// Player 1 moves towards decreasing y (up the board), player 2 towards
/// increasing y. The computer always plays player 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Player {
    One,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid player number {0} (expected 1 or 2)")]
pub struct InvalidPlayer(pub u8);

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    /// Index into per-player arrays (0 for player 1, 1 for player 2).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }

    /// Sign of the y delta that counts as forward for this player.
    #[inline]
    pub fn forward_dy(self) -> i64 {
        match self {
            Player::One => -1,
            Player::Two => 1,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Player::One => 1,
            Player::Two => 2,
        }
    }
}

impl TryFrom<u8> for Player {
    type Error = InvalidPlayer;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Player::One),
            2 => Ok(Player::Two),
            other => Err(InvalidPlayer(other)),
        }
    }
}

impl From<Player> for u8 {
    fn from(p: Player) -> u8 {
        p.number()
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// A piece on the board.
///
/// At most one piece may occupy a node; the engine never produces a move that
/// lands on an occupied node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: PieceId,
    pub player: Player,
    #[serde(deserialize_with = "deserialize_id")]
    pub node: NodeId,
    #[serde(rename = "isKing", default)]
    pub king: bool,
}

impl Piece {
    pub fn new(id: impl Into<PieceId>, player: Player, node: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            player,
            node: node.into(),
            king: false,
        }
    }

    /// Builder-style helper returning the same piece as a king.
    pub fn crowned(mut self) -> Self {
        self.king = true;
        self
    }
}

/// Find the piece standing on `node`, if any.
#[inline]
pub fn piece_at<'a>(pieces: &'a [Piece], node: &str) -> Option<&'a Piece> {
    pieces.iter().find(|p| p.node == node)
}

/// Find a piece by id.
#[inline]
pub fn piece_by_id<'a>(pieces: &'a [Piece], id: &str) -> Option<&'a Piece> {
    pieces.iter().find(|p| p.id == id)
}

/// Number of pieces still owned by `player`.
pub fn count_pieces(pieces: &[Piece], player: Player) -> usize {
    pieces.iter().filter(|p| p.player == player).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_numbers() {
        assert_eq!(Player::try_from(1), Ok(Player::One));
        assert_eq!(Player::try_from(2), Ok(Player::Two));
        assert_eq!(Player::try_from(3), Err(InvalidPlayer(3)));
        assert_eq!(u8::from(Player::Two), 2);
        assert_eq!(Player::One.opponent(), Player::Two);
    }

    #[test]
    fn test_piece_json_accepts_numeric_node() {
        let piece: Piece =
            serde_json::from_str(r#"{"id":"p2-1","player":2,"node":7,"isKing":false}"#).unwrap();
        assert_eq!(piece.node, "7");
        assert_eq!(piece.player, Player::Two);
        assert!(!piece.king);
    }

    #[test]
    fn test_piece_json_rejects_bad_player() {
        let res: Result<Piece, _> = serde_json::from_str(r#"{"id":"x","player":3,"node":"1"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_lookup_helpers() {
        let pieces = vec![
            Piece::new("a", Player::One, "1"),
            Piece::new("b", Player::Two, "2").crowned(),
        ];
        assert_eq!(piece_at(&pieces, "2").map(|p| p.id.as_str()), Some("b"));
        assert!(piece_at(&pieces, "3").is_none());
        assert!(piece_by_id(&pieces, "b").unwrap().king);
        assert_eq!(count_pieces(&pieces, Player::One), 1);
    }
}
