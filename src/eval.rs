//! Static position evaluation.
//!
//! Scores are always from player 2's point of view (the computer): positive
//! means player 2 is better. Material dominates; the positional terms only
//! break ties between otherwise equal positions.

use crate::constants::{ADVANCE_BONUS, CENTER_BONUS, KING_VALUE, MAN_VALUE, WIN_SCORE};
use crate::piece::{Piece, Player};
use crate::topology::Topology;

/// Evaluate a placement.
///
/// The result stays strictly inside `±WIN_SCORE`, so a static score never
/// reads as a forced result.
pub fn evaluate(pieces: &[Piece], topo: &Topology) -> i32 {
    let limit = i64::from(WIN_SCORE - 1);
    let total: i64 = pieces
        .iter()
        .map(|p| {
            let v = i64::from(piece_value(p, topo));
            match p.player {
                Player::Two => v,
                Player::One => -v,
            }
        })
        .sum();
    // bounded by the clamp
    total.clamp(-limit, limit) as i32
}

/// Value of a single piece, including its positional bonus.
pub fn piece_value(piece: &Piece, topo: &Topology) -> i32 {
    let base = if piece.king { KING_VALUE } else { MAN_VALUE };

    let (Some(node), Some(bounds)) = (topo.node(&piece.node), topo.bounds()) else {
        return base;
    };

    // i64 throughout: custom boards may use the whole i32 coordinate range
    let mut val = i64::from(base);
    if !piece.king {
        let rows = match piece.player {
            Player::One => i64::from(bounds.max_y) - i64::from(node.y),
            Player::Two => i64::from(node.y) - i64::from(bounds.min_y),
        };
        val += rows * i64::from(ADVANCE_BONUS);
    }

    // within one column of the centre
    if (2 * i64::from(node.x) - bounds.center_x2()).abs() <= 2 {
        val += i64::from(CENTER_BONUS);
    }

    i32::try_from(val).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layouts::standard_topology;

    #[test]
    fn test_initial_position_is_balanced() {
        let setup = crate::layouts::BoardSetup::builtin(crate::topology::Layout::Standard).unwrap();
        assert_eq!(evaluate(&setup.initial_pieces, &setup.topology), 0);
    }

    #[test]
    fn test_extreme_coordinates_saturate() {
        use crate::topology::{Layout, Node};

        let t = Topology::new(
            Layout::Custom,
            [
                ("top".to_string(), Node::new(i32::MIN, i32::MIN)),
                ("bottom".to_string(), Node::new(i32::MAX, i32::MAX)),
            ],
            Vec::<Vec<String>>::new(),
        );
        let far = Piece::new("a", Player::One, "top");
        assert_eq!(piece_value(&far, &t), i32::MAX);
        assert_eq!(evaluate(&[far], &t), -(WIN_SCORE - 1));

        let home = Piece::new("b", Player::Two, "top");
        assert_eq!(piece_value(&home, &t), MAN_VALUE);
    }

    #[test]
    fn test_king_outweighs_man() {
        let t = standard_topology();
        let man = Piece::new("a", Player::Two, "1");
        let king = man.clone().crowned();
        assert!(piece_value(&king, &t) > piece_value(&man, &t));
        assert_eq!(piece_value(&king, &t), KING_VALUE);
    }

    #[test]
    fn test_advancement_and_centre() {
        let t = standard_topology();
        // node 2 is (0,-3): back row for player 2, centre column
        let home = Piece::new("a", Player::Two, "2");
        // node 14 is (0,2): five rows advanced
        let deep = Piece::new("a", Player::Two, "14");
        assert_eq!(piece_value(&home, &t), MAN_VALUE + CENTER_BONUS);
        assert_eq!(piece_value(&deep, &t), MAN_VALUE + 5 * ADVANCE_BONUS + CENTER_BONUS);
    }

    #[test]
    fn test_sign_convention() {
        let t = standard_topology();
        let ours = vec![Piece::new("a", Player::Two, "1")];
        let theirs = vec![Piece::new("b", Player::One, "18")];
        assert!(evaluate(&ours, &t) > 0);
        assert!(evaluate(&theirs, &t) < 0);
    }

    #[test]
    fn test_unknown_node_scores_material_only() {
        let t = standard_topology();
        let lost = Piece::new("a", Player::Two, "99");
        assert_eq!(piece_value(&lost, &t), MAN_VALUE);
    }
}
