//! Compile-time errors
//!
//! Everything that can go wrong between a submitted workspace document and
//! a compiled action. These surface to the author at save time; a move
//! definition that fails to compile is unusable.

use thiserror::Error;

use crate::lexer::LexError;
use crate::parser::ParseError;

/// Compile result type
pub type Result<T> = std::result::Result<T, CompileError>;

/// Errors raised while compiling a move implementation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error("malformed workspace document: {0}")]
    Document(String),

    #[error("expected exactly one root 'act' block, found {0}")]
    RootBlock(usize),

    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("unknown action reference '{0}'")]
    UnknownActionReference(String),

    #[error("wrong number of arguments to '{name}': got {got}")]
    WrongArity { name: String, got: usize },

    #[error("move '{0}' has no implementation")]
    NoImplementation(String),

    #[error("a move named '{0}' is already registered")]
    DuplicateName(String),

    #[error("'{0}' is a builtin name")]
    ReservedName(String),

    #[error("move id '{0}' is already registered")]
    DuplicateId(String),
}
