//! Move registry: named, compiled actions
//!
//! The registry is the `MoveId → CompiledAction` table. Registration order
//! is semantic: an action may call any action registered *earlier* by name,
//! never a later one, so dependencies always form a DAG. Games take an
//! immutable [`RegistrySnapshot`] so edits to the registry cannot change the
//! meaning of moves mid-game.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::{Expr, Program, Spanned, Stmt};
use crate::builtins::builtin_arity;
use crate::codegen::generate_source;
use crate::document::WorkspaceDocument;
use crate::error::CompileError;
use crate::lexer::lex;
use crate::parser::parse;

/// Stable identifier for a move definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoveId(pub String);

impl fmt::Display for MoveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MoveId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Who authored a move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveCategory {
    /// Editor affordances (e.g. the eraser); never playable
    Ui,
    Official,
    Custom,
}

/// A move definition: presentation fields plus an optional implementation.
///
/// The implementation is the serialized visual-program document, kept
/// opaque here and only interpreted by the compiler. A definition without
/// one can be browsed but never attached to a grid cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveDefinition {
    pub id: MoveId,
    pub name: String,
    pub overview: String,
    pub description: String,
    pub color: [u8; 3],
    pub symbol: String,
    pub category: MoveCategory,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub implementation: Option<serde_json::Value>,
}

/// An executable action procedure
#[derive(Debug, Clone)]
pub struct CompiledAction {
    pub id: MoveId,
    pub name: String,
    /// Generated source, kept for diagnostics and the conversion endpoint
    pub source: String,
    pub program: Program,
}

/// Ordered store of definitions and their compiled procedures
#[derive(Debug, Default)]
pub struct MoveRegistry {
    definitions: IndexMap<MoveId, MoveDefinition>,
    compiled: IndexMap<MoveId, Arc<CompiledAction>>,
    names: HashMap<String, MoveId>,
}

impl MoveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, compiling its implementation if present.
    ///
    /// Named-action references are resolved against what is already
    /// registered; referencing a later (or unknown) action is an error.
    pub fn register(&mut self, definition: MoveDefinition) -> Result<(), CompileError> {
        if builtin_arity(&definition.name).is_some() {
            return Err(CompileError::ReservedName(definition.name));
        }
        if self.definitions.contains_key(&definition.id) {
            return Err(CompileError::DuplicateId(definition.id.0));
        }
        if self.names.contains_key(&definition.name) {
            return Err(CompileError::DuplicateName(definition.name));
        }

        if let Some(raw) = &definition.implementation {
            let action = self.compile(&definition.id, &definition.name, raw)?;
            self.compiled
                .insert(definition.id.clone(), Arc::new(action));
        }

        debug!(id = %definition.id, name = %definition.name, "move registered");
        self.names
            .insert(definition.name.clone(), definition.id.clone());
        self.definitions.insert(definition.id.clone(), definition);
        Ok(())
    }

    /// Register a definition directly from action source text.
    ///
    /// Documents lower to source before compilation anyway, and seed data
    /// (the official move library) is authored as source; this skips the
    /// document stage. The definition's opaque `implementation` blob is
    /// ignored in favour of `source`.
    pub fn register_source(
        &mut self,
        definition: MoveDefinition,
        source: &str,
    ) -> Result<(), CompileError> {
        if builtin_arity(&definition.name).is_some() {
            return Err(CompileError::ReservedName(definition.name));
        }
        if self.definitions.contains_key(&definition.id) {
            return Err(CompileError::DuplicateId(definition.id.0));
        }
        if self.names.contains_key(&definition.name) {
            return Err(CompileError::DuplicateName(definition.name));
        }

        let tokens = lex(source)?;
        let program = parse(&tokens)?;
        self.check_references(&program)?;
        let action = CompiledAction {
            id: definition.id.clone(),
            name: definition.name.clone(),
            source: source.to_string(),
            program,
        };

        debug!(id = %definition.id, name = %definition.name, "move registered from source");
        self.compiled
            .insert(definition.id.clone(), Arc::new(action));
        self.names
            .insert(definition.name.clone(), definition.id.clone());
        self.definitions.insert(definition.id.clone(), definition);
        Ok(())
    }

    /// Compile one implementation document against the current registry.
    fn compile(
        &self,
        id: &MoveId,
        name: &str,
        raw: &serde_json::Value,
    ) -> Result<CompiledAction, CompileError> {
        let document = WorkspaceDocument::from_json(raw)?;
        let source = generate_source(&document)?;
        let tokens = lex(&source)?;
        let program = parse(&tokens)?;
        self.check_references(&program)?;
        Ok(CompiledAction {
            id: id.clone(),
            name: name.to_string(),
            source,
            program,
        })
    }

    /// Validate every call site: builtins by arity, everything else must be
    /// an earlier-registered playable action taking `(source, target)`.
    fn check_references(&self, program: &Program) -> Result<(), CompileError> {
        self.check_stmts(&program.statements)
    }

    fn check_stmts(&self, statements: &[Spanned<Stmt>]) -> Result<(), CompileError> {
        for stmt in statements {
            match &stmt.node {
                Stmt::If { arms, else_body } => {
                    for (cond, body) in arms {
                        self.check_expr(cond)?;
                        self.check_stmts(body)?;
                    }
                    if let Some(body) = else_body {
                        self.check_stmts(body)?;
                    }
                }
                Stmt::For { list, body, .. } => {
                    self.check_expr(list)?;
                    self.check_stmts(body)?;
                }
                Stmt::Assign { target, value } => {
                    if let crate::ast::AssignTarget::UnitOf(cell) = target {
                        self.check_expr(cell)?;
                    }
                    self.check_expr(value)?;
                }
                Stmt::Call { callee, args } => {
                    for arg in args {
                        self.check_expr(arg)?;
                    }
                    self.check_call(callee, args.len())?;
                }
            }
        }
        Ok(())
    }

    fn check_expr(&self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Number(_) | Expr::Bool(_) | Expr::Var(_) => Ok(()),
            Expr::Field { object, .. } => self.check_expr(object),
            Expr::Unary { operand, .. } => self.check_expr(operand),
            Expr::Binary { left, right, .. } => {
                self.check_expr(left)?;
                self.check_expr(right)
            }
            Expr::Call { callee, args } => {
                for arg in args {
                    self.check_expr(arg)?;
                }
                // `path` is the only value-producing procedure
                if callee != "path" {
                    return Err(CompileError::UnknownActionReference(callee.clone()));
                }
                self.check_call(callee, args.len())
            }
        }
    }

    fn check_call(&self, callee: &str, arg_count: usize) -> Result<(), CompileError> {
        if let Some(arity) = builtin_arity(callee) {
            if !arity.accepts(arg_count) {
                return Err(CompileError::WrongArity {
                    name: callee.to_string(),
                    got: arg_count,
                });
            }
            return Ok(());
        }
        match self.names.get(callee) {
            Some(id) if self.compiled.contains_key(id) => {
                if arg_count != 2 {
                    return Err(CompileError::WrongArity {
                        name: callee.to_string(),
                        got: arg_count,
                    });
                }
                Ok(())
            }
            _ => Err(CompileError::UnknownActionReference(callee.to_string())),
        }
    }

    pub fn definition(&self, id: &MoveId) -> Option<&MoveDefinition> {
        self.definitions.get(id)
    }

    /// All definitions in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &MoveDefinition> {
        self.definitions.values()
    }

    pub fn compiled(&self, id: &MoveId) -> Option<&Arc<CompiledAction>> {
        self.compiled.get(id)
    }

    /// Whether a definition has an implementation and may sit on a grid cell.
    pub fn is_playable(&self, id: &MoveId) -> bool {
        self.compiled.contains_key(id)
    }

    /// Immutable view for a game's lifetime.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            by_id: self.compiled.clone(),
            by_name: self
                .compiled
                .values()
                .map(|a| (a.name.clone(), a.clone()))
                .collect(),
        }
    }
}

/// Frozen `MoveId → CompiledAction` table held by each live game
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    by_id: IndexMap<MoveId, Arc<CompiledAction>>,
    by_name: HashMap<String, Arc<CompiledAction>>,
}

impl RegistrySnapshot {
    pub fn by_id(&self, id: &MoveId) -> Option<&Arc<CompiledAction>> {
        self.by_id.get(id)
    }

    /// Runtime lookup for named-action calls; validated at compile time.
    pub fn by_name(&self, name: &str) -> Option<&Arc<CompiledAction>> {
        self.by_name.get(name)
    }
}
