//! Board topology: nodes, straight lines and the adjacency graph derived
//! from them.
//!
//! A board is not a grid. It is a set of nodes with integer coordinates plus
//! a list of "lines", ordered chains of nodes known to be straight. Two nodes
//! are adjacent (a piece may walk between them) only if some line places them
//! next to each other. Geometric colinearity alone never creates an edge.
//!
//! A [`Topology`] is immutable once built and is shared by reference between
//! the engine, the move generator and the search.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::constants::{
    COLINEARITY_THRESHOLD, PROMOTION_P1, PROMOTION_P2_HOURGLASS, PROMOTION_P2_SQUARE,
};
use crate::piece::Player;

/// Identifier of a node, e.g. `"19"`.
pub type NodeId = String;

/// Errors raised while building a board.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("unknown layout '{0}' (expected standard, extended, square or custom)")]
    UnknownLayout(String),
    #[error("the custom layout needs a board configuration")]
    CustomNeedsConfig,
    #[error("board configuration has no nodes")]
    Empty,
    #[error("piece '{piece}' stands on unknown node '{node}'")]
    UnknownPieceNode { piece: String, node: String },
    #[error("node '{node}' holds more than one piece")]
    DoubleOccupancy { node: String },
    #[error("invalid board configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// The supported board layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Standard,
    Extended,
    Square,
    Custom,
}

impl Layout {
    pub fn name(self) -> &'static str {
        match self {
            Layout::Standard => "standard",
            Layout::Extended => "extended",
            Layout::Square => "square",
            Layout::Custom => "custom",
        }
    }

    /// Custom boards let every piece walk and capture in any direction.
    #[inline]
    pub fn is_custom(self) -> bool {
        self == Layout::Custom
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Layout {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Layout::Standard),
            "extended" => Ok(Layout::Extended),
            "square" => Ok(Layout::Square),
            "custom" => Ok(Layout::Custom),
            _ => Err(TopologyError::UnknownLayout(s.to_string())),
        }
    }
}

/// A point where a piece may rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub x: i32,
    pub y: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Node {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y, label: None }
    }

    pub fn labelled(x: i32, y: i32, label: &str) -> Self {
        Self {
            x,
            y,
            label: Some(label.to_string()),
        }
    }
}

/// Bounding box of all node coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl Bounds {
    /// Horizontal centre of the board, doubled to stay in integers.
    #[inline]
    pub fn center_x2(&self) -> i64 {
        i64::from(self.min_x) + i64::from(self.max_x)
    }
}

/// Immutable board graph for one layout.
#[derive(Debug, Clone)]
pub struct Topology {
    layout: Layout,
    nodes: BTreeMap<NodeId, Node>,
    lines: Vec<Vec<NodeId>>,
    adjacency: BTreeMap<NodeId, BTreeSet<NodeId>>,
    promotion: [BTreeSet<NodeId>; 2],
    bounds: Option<Bounds>,
    colinearity: f64,
}

impl Topology {
    /// Build a topology from a node map and a set of line chains.
    ///
    /// Every consecutive pair within every chain becomes an undirected edge.
    /// Repeated pairs collapse, self pairs are dropped and pairs naming an
    /// unknown node are skipped.
    ///
    /// Promotion rows default to the built-in rows for fixed layouts and to
    /// the extreme rows of the node set for [`Layout::Custom`].
    pub fn new<I, L>(layout: Layout, nodes: I, lines: L) -> Self
    where
        I: IntoIterator<Item = (NodeId, Node)>,
        L: IntoIterator<Item = Vec<NodeId>>,
    {
        let nodes: BTreeMap<NodeId, Node> = nodes.into_iter().collect();
        let lines: Vec<Vec<NodeId>> = lines.into_iter().collect();
        let adjacency = build_adjacency(&nodes, &lines);
        let bounds = compute_bounds(&nodes);

        let promotion = match layout {
            Layout::Custom => extreme_rows(&nodes, bounds),
            Layout::Square => [id_set(&PROMOTION_P1), id_set(&PROMOTION_P2_SQUARE)],
            Layout::Standard | Layout::Extended => {
                [id_set(&PROMOTION_P1), id_set(&PROMOTION_P2_HOURGLASS)]
            }
        };

        Self {
            layout,
            nodes,
            lines,
            adjacency,
            promotion,
            bounds,
            colinearity: COLINEARITY_THRESHOLD,
        }
    }

    /// Replace the promotion rows (the nodes where each player crowns).
    pub fn with_promotion_rows<P1, P2>(mut self, player1: P1, player2: P2) -> Self
    where
        P1: IntoIterator,
        P1::Item: Into<NodeId>,
        P2: IntoIterator,
        P2::Item: Into<NodeId>,
    {
        self.promotion = [
            player1.into_iter().map(Into::into).collect(),
            player2.into_iter().map(Into::into).collect(),
        ];
        self
    }

    /// Override the capture colinearity tolerance.
    pub fn with_colinearity_threshold(mut self, threshold: f64) -> Self {
        self.colinearity = threshold;
        self
    }

    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    #[inline]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&NodeId, &Node)> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn lines(&self) -> &[Vec<NodeId>] {
        &self.lines
    }

    /// Neighbors of `id`. Unknown nodes have none.
    pub fn neighbors<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a NodeId> + use<'a> {
        self.adjacency.get(id).into_iter().flatten()
    }

    pub fn are_adjacent(&self, a: &str, b: &str) -> bool {
        self.adjacency.get(a).is_some_and(|set| set.contains(b))
    }

    pub fn promotion_nodes(&self, player: Player) -> &BTreeSet<NodeId> {
        &self.promotion[player.index()]
    }

    #[inline]
    pub fn is_promotion_node(&self, player: Player, id: &str) -> bool {
        self.promotion[player.index()].contains(id)
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    #[inline]
    pub fn colinearity_threshold(&self) -> f64 {
        self.colinearity
    }
}

fn build_adjacency(
    nodes: &BTreeMap<NodeId, Node>,
    lines: &[Vec<NodeId>],
) -> BTreeMap<NodeId, BTreeSet<NodeId>> {
    let mut adjacency: BTreeMap<NodeId, BTreeSet<NodeId>> =
        nodes.keys().map(|id| (id.clone(), BTreeSet::new())).collect();

    for line in lines {
        for pair in line.windows(2) {
            let (u, v) = (&pair[0], &pair[1]);
            if u == v {
                continue;
            }
            if !nodes.contains_key(u) || !nodes.contains_key(v) {
                warn!(%u, %v, "skipping line segment with unknown node");
                continue;
            }
            if let Some(set) = adjacency.get_mut(u) {
                set.insert(v.clone());
            }
            if let Some(set) = adjacency.get_mut(v) {
                set.insert(u.clone());
            }
        }
    }
    adjacency
}

fn compute_bounds(nodes: &BTreeMap<NodeId, Node>) -> Option<Bounds> {
    let mut iter = nodes.values();
    let first = iter.next()?;
    let init = Bounds {
        min_x: first.x,
        max_x: first.x,
        min_y: first.y,
        max_y: first.y,
    };
    Some(iter.fold(init, |b, n| Bounds {
        min_x: b.min_x.min(n.x),
        max_x: b.max_x.max(n.x),
        min_y: b.min_y.min(n.y),
        max_y: b.max_y.max(n.y),
    }))
}

/// Player 1 crowns on the minimum-y row, player 2 on the maximum-y row.
fn extreme_rows(nodes: &BTreeMap<NodeId, Node>, bounds: Option<Bounds>) -> [BTreeSet<NodeId>; 2] {
    let Some(b) = bounds else {
        return [BTreeSet::new(), BTreeSet::new()];
    };
    let row = |y: i32| -> BTreeSet<NodeId> {
        nodes
            .iter()
            .filter(|(_, n)| n.y == y)
            .map(|(id, _)| id.clone())
            .collect()
    };
    [row(b.min_y), row(b.max_y)]
}

fn id_set(ids: &[&str]) -> BTreeSet<NodeId> {
    ids.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Serde helpers: board files may use integers or strings as ids
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Str(String),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> String {
        match raw {
            RawId::Int(n) => n.to_string(),
            RawId::Str(s) => s,
        }
    }
}

pub(crate) fn deserialize_id<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(d).map(String::from)
}

pub(crate) fn deserialize_chains<'de, D>(d: D) -> Result<Vec<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Vec<RawId>> = Vec::deserialize(d)?;
    Ok(raw
        .into_iter()
        .map(|chain| chain.into_iter().map(String::from).collect())
        .collect())
}
