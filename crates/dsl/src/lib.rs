//! Gambit action definition language
//!
//! Compiler for the move/action language used by custom chess pieces.
//! A move's behaviour arrives as a serialized visual-program document,
//! is rendered to action source text, and is compiled into an executable
//! procedure stored in the [`registry::MoveRegistry`].

pub mod ast;
pub mod builtins;
pub mod codegen;
pub mod document;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod registry;

pub use ast::{Expr, Program, Stmt};
pub use codegen::generate_source;
pub use document::WorkspaceDocument;
pub use error::CompileError;
pub use lexer::{lex, LexError, Token};
pub use parser::parse;
pub use registry::{
    CompiledAction, MoveCategory, MoveDefinition, MoveId, MoveRegistry, RegistrySnapshot,
};
