//! Tunable constants for move generation, evaluation and search.
//!
//! Everything numeric that shapes how the engine plays lives here so it can
//! be adjusted in one place.

// =============================================================================
// Move Generation
// =============================================================================

/// Minimum normalized dot product between the approach vector
/// (jumped node minus origin) and the landing vector (landing minus jumped
/// node) for a capture to count as a straight jump.
///
/// 0.90 accepts deviations up to roughly 25.8 degrees. Orthogonal and 45
/// degree boards never come close to the boundary; custom boards with
/// irregular angles might.
pub const COLINEARITY_THRESHOLD: f64 = 0.90;

// =============================================================================
// Evaluation
// =============================================================================

/// Material value of a king.
pub const KING_VALUE: i32 = 100;

/// Material value of a regular (uncrowned) piece.
pub const MAN_VALUE: i32 = 20;

/// Bonus per row a regular piece has advanced from its own back edge.
pub const ADVANCE_BONUS: i32 = 2;

/// Bonus for a piece standing within one column of the board's centre.
pub const CENTER_BONUS: i32 = 3;

/// Score for a side that has no legal move at its ply.
pub const WIN_SCORE: i32 = 10_000;

// =============================================================================
// Search
// =============================================================================

/// Search depth for the normal difficulty.
pub const NORMAL_DEPTH: u32 = 2;

/// Search depth for the hard difficulty.
pub const HARD_DEPTH: u32 = 6;

// =============================================================================
// Promotion Rows (built-in layouts)
// =============================================================================

/// Player 1 crowns on the top row of every built-in layout.
pub const PROMOTION_P1: [&str; 3] = ["1", "2", "3"];

/// Player 2 crowns on the bottom row of the hourglass layouts.
pub const PROMOTION_P2_HOURGLASS: [&str; 3] = ["16", "17", "18"];

/// Player 2 crowns on the bottom row of the square layout.
pub const PROMOTION_P2_SQUARE: [&str; 3] = ["6", "7", "8"];
