//! Minimax search with alpha-beta pruning.
//!
//! Player 2 maximizes, player 1 minimizes, and leaves are scored by
//! [`crate::eval::evaluate`]. The search mirrors the game rules exactly:
//!
//! - Forced capture: whenever the side to move has a capture, only captures
//!   are searched.
//! - Chain captures: when a capture leaves the same (uncrowned) piece with
//!   further captures, the search stays on the same side at the same depth
//!   and only considers that piece's captures. Depth decreases and the side
//!   flips only when a turn really ends.
//! - A side with no legal move at its ply scores [`WIN_SCORE`] against it.
//!
//! Captures are tried first at every node, which is where most cutoffs come
//! from. There is no transposition table and no time limit.

use crate::constants::WIN_SCORE;
use crate::eval::evaluate;
use crate::movegen::{PieceMove, apply_move, chain_continuation, player_moves};
use crate::piece::{Piece, Player};
use crate::topology::Topology;

/// Bound used for the initial alpha-beta window.
pub const INF: i32 = i32::MAX;

/// Search state for one decision: the board graph and a node counter.
pub struct Searcher<'a> {
    topology: &'a Topology,
    nodes: u64,
}

impl<'a> Searcher<'a> {
    pub fn new(topology: &'a Topology) -> Self {
        Self { topology, nodes: 0 }
    }

    /// Number of positions visited so far.
    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    /// Value of `pieces` with `side` to move, searched `depth` turns deep.
    pub fn minimax(&mut self, pieces: &[Piece], depth: u32, alpha: i32, beta: i32, side: Player) -> i32 {
        self.search(pieces, depth, alpha, beta, side, None)
    }

    /// Value of the position reached by `mv`, played by `side` at a node
    /// searched `depth` turns deep.
    ///
    /// If the move leaves a capture chain open, the continuation is searched
    /// at the same depth with the same side to move; otherwise the opponent
    /// moves next and one turn of depth is consumed.
    pub fn successor_value(
        &mut self,
        pieces: &[Piece],
        mv: &PieceMove,
        depth: u32,
        alpha: i32,
        beta: i32,
        side: Player,
    ) -> i32 {
        let applied = apply_move(pieces, mv, self.topology);
        let chain = chain_continuation(mv, &applied, self.topology);

        if chain.is_empty() {
            self.search(
                &applied.pieces,
                depth.saturating_sub(1),
                alpha,
                beta,
                side.opponent(),
                None,
            )
        } else {
            let forced = chain
                .into_iter()
                .map(|m| PieceMove::new(mv.piece.clone(), m))
                .collect();
            self.search(&applied.pieces, depth, alpha, beta, side, Some(forced))
        }
    }

    fn search(
        &mut self,
        pieces: &[Piece],
        depth: u32,
        mut alpha: i32,
        mut beta: i32,
        side: Player,
        forced: Option<Vec<PieceMove>>,
    ) -> i32 {
        self.nodes += 1;

        if depth == 0 {
            return evaluate(pieces, self.topology);
        }

        let mut moves = match forced {
            Some(chain) => chain,
            None => player_moves(side, pieces, self.topology),
        };

        if moves.is_empty() {
            return match side {
                Player::Two => -WIN_SCORE,
                Player::One => WIN_SCORE,
            };
        }

        order_moves(&mut moves);

        match side {
            Player::Two => {
                let mut best = -INF;
                for mv in &moves {
                    let score = self.successor_value(pieces, mv, depth, alpha, beta, side);
                    best = best.max(score);
                    alpha = alpha.max(score);
                    if beta <= alpha {
                        break;
                    }
                }
                best
            }
            Player::One => {
                let mut best = INF;
                for mv in &moves {
                    let score = self.successor_value(pieces, mv, depth, alpha, beta, side);
                    best = best.min(score);
                    beta = beta.min(score);
                    if beta <= alpha {
                        break;
                    }
                }
                best
            }
        }
    }
}

/// Stable sort putting captures first; the relative order of equal moves is
/// preserved.
pub fn order_moves(moves: &mut [PieceMove]) {
    moves.sort_by_key(|m| !m.is_jump());
}

/// Convenience wrapper around [`Searcher::minimax`].
pub fn minimax(
    pieces: &[Piece],
    depth: u32,
    alpha: i32,
    beta: i32,
    side: Player,
    topology: &Topology,
) -> i32 {
    Searcher::new(topology).minimax(pieces, depth, alpha, beta, side)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MAN_VALUE;
    use crate::movegen::Move;
    use crate::topology::{Layout, Node};

    fn column(len: i32) -> Topology {
        let ids: Vec<String> = (0..len).map(|i| format!("n{i}")).collect();
        Topology::new(
            Layout::Standard,
            ids.iter().enumerate().map(|(i, id)| (id.clone(), Node::new(0, i as i32))),
            [ids.clone()],
        )
        .with_promotion_rows(Vec::<String>::new(), Vec::<String>::new())
    }

    #[test]
    fn test_depth_zero_is_static_eval() {
        let t = column(3);
        let pieces = vec![Piece::new("a", Player::Two, "n0")];
        assert_eq!(minimax(&pieces, 0, -INF, INF, Player::Two, &t), evaluate(&pieces, &t));
    }

    #[test]
    fn test_no_moves_is_a_loss() {
        let t = column(2);
        // player 2 at the bottom cannot move further down
        let pieces = vec![
            Piece::new("a", Player::Two, "n1"),
            Piece::new("b", Player::One, "n0"),
        ];
        assert_eq!(minimax(&pieces, 3, -INF, INF, Player::Two, &t), -WIN_SCORE);
        // player 1 at the top cannot move further up
        assert_eq!(minimax(&pieces, 3, -INF, INF, Player::One, &t), WIN_SCORE);
    }

    #[test]
    fn test_capture_preferred_over_quiet_play() {
        // n0 (P2) sits above n1 (P1); jumping lands on n2.
        let t = column(4);
        let capture = vec![
            Piece::new("a", Player::Two, "n0"),
            Piece::new("b", Player::One, "n1"),
        ];
        let v = minimax(&capture, 1, -INF, INF, Player::Two, &t);
        let expected = evaluate(
            &apply_move(&capture, &PieceMove::new("a", Move::jump("n2", "b")), &t).pieces,
            &t,
        );
        assert_eq!(v, expected);
        assert!(v >= MAN_VALUE);
    }

    #[test]
    fn test_chain_keeps_depth_and_side() {
        // P2 at n0 can capture n1 then n3 in one turn.
        let t = column(5);
        let pieces = vec![
            Piece::new("a", Player::Two, "n0"),
            Piece::new("b", Player::One, "n1"),
            Piece::new("c", Player::One, "n3"),
        ];
        // With depth 1 both captures happen before the leaf is scored.
        let v = minimax(&pieces, 1, -INF, INF, Player::Two, &t);
        let only_p2: Vec<Piece> = vec![Piece::new("a", Player::Two, "n4")];
        assert_eq!(v, evaluate(&only_p2, &t));

        let mut searcher = Searcher::new(&t);
        searcher.minimax(&pieces, 1, -INF, INF, Player::Two);
        // root, after first capture, leaf
        assert_eq!(searcher.nodes(), 3);
    }

    #[test]
    fn test_order_moves_jumps_first_stable() {
        let mut moves = vec![
            PieceMove::new("w1", Move::walk("x")),
            PieceMove::new("j1", Move::jump("y", "z")),
            PieceMove::new("w2", Move::walk("q")),
            PieceMove::new("j2", Move::jump("r", "s")),
        ];
        order_moves(&mut moves);
        let ids: Vec<&str> = moves.iter().map(|m| m.piece.as_str()).collect();
        assert_eq!(ids, vec!["j1", "j2", "w1", "w2"]);
    }
}
