//! Built-in boards, custom board files and initial placements.
//!
//! The hourglass boards (standard, extended) share node numbering: 1-9 form
//! the top triangle, 10-18 the bottom triangle and 19 is the centre. The
//! square board is three concentric rings joined by radial lines.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::piece::{Piece, Player};
use crate::topology::{Layout, Node, NodeId, Topology, TopologyError, deserialize_chains};

/// Node coordinates of the standard hourglass.
const HOURGLASS_NODES: [(&str, i32, i32, &str); 19] = [
    ("19", 0, 0, "C"),
    ("7", -1, -1, "7"),
    ("8", 0, -1, "8"),
    ("9", 1, -1, "9"),
    ("4", -2, -2, "4"),
    ("5", 0, -2, "5"),
    ("6", 2, -2, "6"),
    ("1", -3, -3, "1"),
    ("2", 0, -3, "2"),
    ("3", 3, -3, "3"),
    ("10", -1, 1, "10"),
    ("11", 0, 1, "11"),
    ("12", 1, 1, "12"),
    ("13", -2, 2, "13"),
    ("14", 0, 2, "14"),
    ("15", 2, 2, "15"),
    ("16", -3, 3, "16"),
    ("17", 0, 3, "17"),
    ("18", 3, 3, "18"),
];

const HOURGLASS_LINES: &[&[&str]] = &[
    // rows
    &["1", "2", "3"],
    &["4", "5", "6"],
    &["7", "8", "9"],
    &["10", "11", "12"],
    &["13", "14", "15"],
    &["16", "17", "18"],
    // spine
    &["2", "5", "8", "19", "11", "14", "17"],
    // diagonals through the centre
    &["16", "13", "10", "19", "9", "6", "3"],
    &["18", "15", "12", "19", "7", "4", "1"],
];

const EXTRA_NODES: [(&str, i32, i32, &str); 2] = [("20", -3, 0, "L"), ("21", 3, 0, "R")];

const EXTRA_LINES: &[&[&str]] = &[&["1", "20", "16"], &["3", "21", "18"], &["20", "19", "21"]];

const SQUARE_NODES: [(&str, i32, i32, &str); 24] = [
    // outer ring
    ("1", -3, -3, "TL1"),
    ("2", 0, -3, "TM1"),
    ("3", 3, -3, "TR1"),
    ("4", -3, 0, "ML1"),
    ("5", 3, 0, "MR1"),
    ("6", -3, 3, "BL1"),
    ("7", 0, 3, "BM1"),
    ("8", 3, 3, "BR1"),
    // middle ring
    ("9", -2, -2, "TL2"),
    ("10", 0, -2, "TM2"),
    ("11", 2, -2, "TR2"),
    ("12", -2, 0, "ML2"),
    ("13", 2, 0, "MR2"),
    ("14", -2, 2, "BL2"),
    ("15", 0, 2, "BM2"),
    ("16", 2, 2, "BR2"),
    // inner ring
    ("17", -1, -1, "TL3"),
    ("18", 0, -1, "TM3"),
    ("19", 1, -1, "TR3"),
    ("20", -1, 0, "ML3"),
    ("21", 1, 0, "MR3"),
    ("22", -1, 1, "BL3"),
    ("23", 0, 1, "BM3"),
    ("24", 1, 1, "BR3"),
];

const SQUARE_LINES: &[&[&str]] = &[
    // rings
    &["1", "2", "3"],
    &["3", "5", "8"],
    &["8", "7", "6"],
    &["6", "4", "1"],
    &["9", "10", "11"],
    &["11", "13", "16"],
    &["16", "15", "14"],
    &["14", "12", "9"],
    &["17", "18", "19"],
    &["19", "21", "24"],
    &["24", "23", "22"],
    &["22", "20", "17"],
    // radial diagonals
    &["1", "9", "17"],
    &["3", "11", "19"],
    &["8", "16", "24"],
    &["6", "14", "22"],
    // radial cross
    &["2", "10", "18"],
    &["5", "13", "21"],
    &["7", "15", "23"],
    &["4", "12", "20"],
];

const SQUARE_P2_START: [&str; 6] = ["1", "2", "3", "9", "10", "11"];
const SQUARE_P1_START: [&str; 6] = ["6", "7", "8", "14", "15", "16"];

/// A topology together with the placement a new game starts from.
#[derive(Debug, Clone)]
pub struct BoardSetup {
    pub topology: Arc<Topology>,
    pub initial_pieces: Vec<Piece>,
}

impl BoardSetup {
    /// Build one of the fixed layouts.
    ///
    /// [`Layout::Custom`] has no built-in definition; use
    /// [`BoardSetup::from_config`] instead.
    pub fn builtin(layout: Layout) -> Result<Self, TopologyError> {
        let (topology, initial_pieces) = match layout {
            Layout::Standard => (standard_topology(), hourglass_pieces()),
            Layout::Extended => (extended_topology(), hourglass_pieces()),
            Layout::Square => (square_topology(), square_pieces()),
            Layout::Custom => return Err(TopologyError::CustomNeedsConfig),
        };
        Ok(Self {
            topology: Arc::new(topology),
            initial_pieces,
        })
    }

    /// Build a custom board from a parsed configuration.
    pub fn from_config(config: BoardConfig) -> Result<Self, TopologyError> {
        if config.nodes.is_empty() {
            return Err(TopologyError::Empty);
        }

        let mut occupied = HashSet::new();
        for piece in &config.pieces {
            if !config.nodes.contains_key(&piece.node) {
                return Err(TopologyError::UnknownPieceNode {
                    piece: piece.id.clone(),
                    node: piece.node.clone(),
                });
            }
            if !occupied.insert(piece.node.as_str()) {
                return Err(TopologyError::DoubleOccupancy {
                    node: piece.node.clone(),
                });
            }
        }

        let lines = if config.lines.is_empty() {
            chains_from_segments(&config.segments)
        } else {
            config.lines
        };
        let topology = Topology::new(Layout::Custom, config.nodes, lines);
        let initial_pieces = config
            .pieces
            .into_iter()
            .map(|mut p| {
                p.king = false;
                p
            })
            .collect();

        Ok(Self {
            topology: Arc::new(topology),
            initial_pieces,
        })
    }

    /// Parse a custom board from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, TopologyError> {
        let config: BoardConfig = serde_json::from_str(json)?;
        Self::from_config(config)
    }

    pub fn layout(&self) -> Layout {
        self.topology.layout()
    }
}

/// A user-authored board, as saved by the board editor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardConfig {
    pub nodes: BTreeMap<NodeId, Node>,
    #[serde(default, deserialize_with = "deserialize_chains")]
    pub lines: Vec<Vec<NodeId>>,
    #[serde(default, deserialize_with = "deserialize_chains")]
    pub segments: Vec<Vec<NodeId>>,
    #[serde(default)]
    pub pieces: Vec<Piece>,
}

pub fn standard_topology() -> Topology {
    Topology::new(Layout::Standard, node_map(&HOURGLASS_NODES), chains(HOURGLASS_LINES))
}

pub fn extended_topology() -> Topology {
    let nodes = node_map(&HOURGLASS_NODES)
        .into_iter()
        .chain(node_map(&EXTRA_NODES));
    let lines = chains(HOURGLASS_LINES).into_iter().chain(chains(EXTRA_LINES));
    Topology::new(Layout::Extended, nodes, lines)
}

pub fn square_topology() -> Topology {
    Topology::new(Layout::Square, node_map(&SQUARE_NODES), chains(SQUARE_LINES))
}

/// Player 2 on the top triangle (1-9), player 1 on the bottom (10-18).
fn hourglass_pieces() -> Vec<Piece> {
    let p2 = (1..=9).map(|i| Piece::new(format!("p2-{i}"), Player::Two, i.to_string()));
    let p1 = (1..=9).map(|i| Piece::new(format!("p1-{i}"), Player::One, (i + 9).to_string()));
    p2.chain(p1).collect()
}

fn square_pieces() -> Vec<Piece> {
    let p2 = SQUARE_P2_START
        .iter()
        .enumerate()
        .map(|(i, n)| Piece::new(format!("p2-{}", i + 1), Player::Two, *n));
    let p1 = SQUARE_P1_START
        .iter()
        .enumerate()
        .map(|(i, n)| Piece::new(format!("p1-{}", i + 1), Player::One, *n));
    p2.chain(p1).collect()
}

fn node_map(nodes: &[(&str, i32, i32, &str)]) -> Vec<(NodeId, Node)> {
    nodes
        .iter()
        .map(|&(id, x, y, label)| (id.to_string(), Node::labelled(x, y, label)))
        .collect()
}

fn chains(lines: &[&[&str]]) -> Vec<Vec<NodeId>> {
    lines
        .iter()
        .map(|line| line.iter().map(|s| s.to_string()).collect())
        .collect()
}

/// Stitch two-node segments into maximal chains.
///
/// Each chain starts from the first unused segment and keeps absorbing any
/// segment that shares an endpoint with its head or tail. Segments with the
/// wrong arity are ignored.
pub fn chains_from_segments(segments: &[Vec<NodeId>]) -> Vec<Vec<NodeId>> {
    let mut pool: Vec<(NodeId, NodeId)> = segments
        .iter()
        .filter(|s| s.len() == 2)
        .map(|s| (s[0].clone(), s[1].clone()))
        .collect();
    let mut out = Vec::new();

    while !pool.is_empty() {
        let (a, b) = pool.remove(0);
        let mut chain = vec![a, b];

        loop {
            let head = &chain[0];
            let tail = &chain[chain.len() - 1];
            let Some(idx) = pool
                .iter()
                .position(|(s, e)| s == head || e == head || s == tail || e == tail)
            else {
                break;
            };
            let (s, e) = pool.remove(idx);
            let tail = chain[chain.len() - 1].clone();
            let head = chain[0].clone();
            if s == tail {
                chain.push(e);
            } else if e == tail {
                chain.push(s);
            } else if e == head {
                chain.insert(0, s);
            } else {
                chain.insert(0, e);
            }
        }
        out.push(chain);
    }
    out
}
