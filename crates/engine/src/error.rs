//! Engine errors

use thiserror::Error;

use gambit_dsl::{CompileError, MoveId};

use crate::types::{BoardId, Loc, PieceId};

/// Errors raised while an action procedure executes.
///
/// `Fail` is the expected, recoverable outcome: the move is simply illegal
/// and the board is untouched. The limit variants are resource errors from
/// runaway action definitions; they abort that evaluation only and are
/// logged rather than surfaced as gameplay.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ActionError {
    #[error("{0}")]
    Fail(String),

    #[error("action exceeded the {0}-step execution budget")]
    StepLimitExceeded(u32),

    #[error("action call depth exceeded {0}")]
    CallDepthExceeded(u32),

    /// A call site the compiler validated no longer resolves. Indicates a
    /// compiler or snapshot bug, never authored content.
    #[error("call to unknown action '{0}'")]
    UnknownAction(String),
}

impl ActionError {
    /// Expected rejection, as opposed to a resource/internal error.
    pub fn is_fail(&self) -> bool {
        matches!(self, ActionError::Fail(_))
    }
}

/// Errors from game transitions (move / resign / draw)
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GameError {
    #[error("this game has already ended")]
    GameOver,

    #[error("'{0}' is not participating in this game")]
    NotParticipant(String),

    #[error("it is not your turn")]
    NotYourTurn,

    #[error("location {0} is off the board")]
    OutOfBounds(Loc),

    #[error("there is no unit at {0}")]
    NoUnit(Loc),

    #[error("the unit at {0} is not yours")]
    NotYourUnit(Loc),

    #[error("you cannot move that piece to that location")]
    NoMoveDefined,

    #[error("move '{0}' is not in this game's registry snapshot")]
    UnknownMove(MoveId),

    #[error("board setup references unknown piece '{0}'")]
    UnknownPiece(PieceId),

    #[error("invalid placement at {0}")]
    InvalidPlacement(Loc),

    #[error(transparent)]
    Action(#[from] ActionError),
}

/// Errors from move grid writes
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GridError {
    #[error("the center cell denotes the piece itself and cannot hold a move")]
    CenterCell,

    #[error("offset ({0}, {1}) is outside the move grid")]
    OutOfRange(i32, i32),
}

/// Error from the path resolver
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PathError {
    #[error("{from} and {to} do not share a rank, file or diagonal")]
    NotColinear { from: Loc, to: Loc },
}

/// Errors from lobby transitions
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LobbyError {
    #[error("this request no longer exists")]
    UnknownRequest(u64),
}

/// Errors from the workshop store (the persistence boundary)
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("unknown piece '{0}'")]
    UnknownPiece(PieceId),

    #[error("unknown board setup '{0}'")]
    UnknownBoard(BoardId),

    #[error("unknown move '{0}'")]
    UnknownMove(MoveId),

    #[error("move '{0}' has no implementation and cannot be placed on a grid")]
    UnplayableMove(MoveId),

    #[error("piece '{piece}' placement at {loc} is invalid")]
    InvalidPlacement { piece: PieceId, loc: Loc },

    #[error(transparent)]
    Compile(#[from] CompileError),
}
