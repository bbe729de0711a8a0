//! Qataar: a checkers-like capture game played on graph boards.
//!
//! Pieces move along the straight lines drawn on the board and capture by
//! jumping over an adjacent enemy to the next node of a straight line.
//! Captures are compulsory and chain within a turn; reaching the far row
//! crowns a piece.
//!
//! ## Modules
//!
//! - [`constants`] - Evaluation weights, search depths and promotion rows
//! - [`piece`] - Players and pieces
//! - [`topology`] - Board graph built from nodes and lines
//! - [`layouts`] - Built-in boards and custom board files
//! - [`movegen`] - Legal moves, forced capture and move application
//! - [`eval`] - Static evaluation
//! - [`search`] - Alpha-beta minimax
//! - [`ai`] - Difficulty policy and background worker
//! - [`game`] - The game engine state machine
//! - [`protocol`] - Text command protocol
//!
//! ## Example
//!
//! ```
//! use qataar::game::{GameEngine, GameMode};
//! use qataar::layouts::BoardSetup;
//! use qataar::topology::Layout;
//!
//! let setup = BoardSetup::builtin(Layout::Standard).unwrap();
//! let mut game = GameEngine::new(setup).with_mode(GameMode::PlayerVsComputer);
//!
//! // Player 1 plays the first legal move
//! let mv = game.available_moves().remove(0);
//! game.select(&mv.piece).unwrap();
//! game.play_move(&mv.mv).unwrap();
//!
//! // The computer answers
//! game.run_ai_turn();
//! assert_eq!(game.turn(), qataar::piece::Player::One);
//! ```

pub mod ai;
pub mod constants;
pub mod eval;
pub mod game;
pub mod layouts;
pub mod movegen;
pub mod piece;
pub mod protocol;
pub mod search;
pub mod topology;

pub use game::{GameEngine, GameMode, Phase, Rejection, Transition};
pub use layouts::BoardSetup;
pub use movegen::{Move, PieceMove};
pub use piece::{Piece, Player};
pub use topology::{Layout, Topology};
