//! Action executor
//!
//! Interprets compiled action procedures against a scratch copy of the
//! board. Completing normally commits the scratch board atomically; any
//! `fail()` — explicit, empty-unit field access, immunity refusal or a
//! runtime type mismatch — discards it, so a rejected move can never leak a
//! partial mutation. Abort flow is threaded as the `Err` arm of `Result`,
//! never as unwinding.
//!
//! Execution is bounded: every statement and loop iteration costs one step
//! from a shared budget, and calls into other registered actions share the
//! same budget behind a depth guard.

use std::collections::HashMap;

use tracing::trace;

use gambit_dsl::ast::{AssignTarget, BinaryOp, Expr, Field, Spanned, Stmt, UnaryOp};
use gambit_dsl::{CompiledAction, RegistrySnapshot};

use crate::board::{Board, UnitInstance};
use crate::error::ActionError;
use crate::path::path;
use crate::types::{Immunity, Loc, Team};

/// Resource bounds for one move evaluation
#[derive(Debug, Clone, Copy)]
pub struct ExecLimits {
    pub max_steps: u32,
    pub max_call_depth: u32,
}

impl Default for ExecLimits {
    fn default() -> Self {
        Self {
            max_steps: 10_000,
            max_call_depth: 16,
        }
    }
}

/// Runtime values of the action language
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Cell(Loc),
    /// A unit snapshot; `None` is the empty unit read off a vacant tile
    Unit(Option<UnitInstance>),
    Bool(bool),
    Num(f64),
    Tiles(Vec<Loc>),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Cell(_) => "a cell",
            Value::Unit(_) => "a unit",
            Value::Bool(_) => "a boolean",
            Value::Num(_) => "a number",
            Value::Tiles(_) => "a tile list",
        }
    }
}

/// Execute one action for `acting_team` moving from `from` toward `to`.
///
/// Returns the board to commit. The input board is untouched; on any error
/// the caller simply keeps it, which is the whole rollback story.
pub fn execute(
    snapshot: &RegistrySnapshot,
    limits: ExecLimits,
    board: &Board,
    acting_team: Team,
    action: &CompiledAction,
    from: Loc,
    to: Loc,
) -> Result<Board, ActionError> {
    let mut executor = Executor {
        snapshot,
        limits,
        board: board.clone(),
        acting_team,
        steps: 0,
    };
    executor.run(action, from, to, 0)?;
    Ok(executor.board)
}

struct Executor<'a> {
    snapshot: &'a RegistrySnapshot,
    limits: ExecLimits,
    board: Board,
    acting_team: Team,
    steps: u32,
}

/// Local variables of one action invocation; `source` and `target` are
/// pre-bound cells.
struct Scope {
    vars: HashMap<String, Value>,
}

impl Scope {
    fn new(source: Loc, target: Loc) -> Self {
        let mut vars = HashMap::new();
        vars.insert("source".to_string(), Value::Cell(source));
        vars.insert("target".to_string(), Value::Cell(target));
        Self { vars }
    }
}

impl Executor<'_> {
    fn run(&mut self, action: &CompiledAction, from: Loc, to: Loc, depth: u32) -> Result<(), ActionError> {
        if depth >= self.limits.max_call_depth {
            return Err(ActionError::CallDepthExceeded(self.limits.max_call_depth));
        }
        trace!(action = %action.name, %from, %to, depth, "executing action");
        let mut scope = Scope::new(from, to);
        self.exec_stmts(&action.program.statements, &mut scope, depth)
    }

    fn tick(&mut self) -> Result<(), ActionError> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(ActionError::StepLimitExceeded(self.limits.max_steps));
        }
        Ok(())
    }

    fn exec_stmts(
        &mut self,
        statements: &[Spanned<Stmt>],
        scope: &mut Scope,
        depth: u32,
    ) -> Result<(), ActionError> {
        for stmt in statements {
            self.exec_stmt(&stmt.node, scope, depth)?;
        }
        Ok(())
    }

    fn exec_stmt(&mut self, stmt: &Stmt, scope: &mut Scope, depth: u32) -> Result<(), ActionError> {
        self.tick()?;
        match stmt {
            Stmt::If { arms, else_body } => {
                for (cond, body) in arms {
                    let value = self.eval(cond, scope, depth)?;
                    if self.truthy(value)? {
                        return self.exec_stmts(body, scope, depth);
                    }
                }
                if let Some(body) = else_body {
                    return self.exec_stmts(body, scope, depth);
                }
                Ok(())
            }
            Stmt::For { var, list, body } => {
                let tiles = match self.eval(list, scope, depth)? {
                    Value::Tiles(tiles) => tiles,
                    other => {
                        return Err(ActionError::Fail(format!(
                            "'for' needs a tile list, got {}",
                            other.type_name()
                        )));
                    }
                };
                for tile in tiles {
                    self.tick()?;
                    scope.vars.insert(var.clone(), Value::Cell(tile));
                    self.exec_stmts(body, scope, depth)?;
                }
                Ok(())
            }
            Stmt::Assign { target, value } => {
                let value = self.eval(value, scope, depth)?;
                match target {
                    AssignTarget::Var(name) => {
                        scope.vars.insert(name.clone(), value);
                        Ok(())
                    }
                    AssignTarget::UnitOf(cell_expr) => {
                        let loc = self.eval_cell(cell_expr, scope, depth)?;
                        let unit = match value {
                            Value::Unit(unit) => unit,
                            other => {
                                return Err(ActionError::Fail(format!(
                                    "only a unit can be placed on a cell, got {}",
                                    other.type_name()
                                )));
                            }
                        };
                        self.board.set(loc, unit);
                        Ok(())
                    }
                }
            }
            Stmt::Call { callee, args } => self.call(callee, args, scope, depth).map(|_| ()),
        }
    }

    fn eval(&mut self, expr: &Expr, scope: &mut Scope, depth: u32) -> Result<Value, ActionError> {
        match expr {
            Expr::Number(n) => Ok(Value::Num(*n)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Var(name) => scope.vars.get(name).cloned().ok_or_else(|| {
                ActionError::Fail(format!("unknown variable '{name}'"))
            }),
            Expr::Field { object, field } => {
                let object = self.eval(object, scope, depth)?;
                self.eval_field(object, *field)
            }
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                let value = self.eval(operand, scope, depth)?;
                Ok(Value::Bool(!self.truthy(value)?))
            }
            Expr::Binary { op, left, right } => match op {
                BinaryOp::And => {
                    let left = self.eval(left, scope, depth)?;
                    if !self.truthy(left)? {
                        return Ok(Value::Bool(false));
                    }
                    let right = self.eval(right, scope, depth)?;
                    Ok(Value::Bool(self.truthy(right)?))
                }
                BinaryOp::Or => {
                    let left = self.eval(left, scope, depth)?;
                    if self.truthy(left)? {
                        return Ok(Value::Bool(true));
                    }
                    let right = self.eval(right, scope, depth)?;
                    Ok(Value::Bool(self.truthy(right)?))
                }
                BinaryOp::Eq | BinaryOp::Ne => {
                    let left = self.eval(left, scope, depth)?;
                    let right = self.eval(right, scope, depth)?;
                    let equal = self.values_equal(&left, &right)?;
                    Ok(Value::Bool(if *op == BinaryOp::Eq { equal } else { !equal }))
                }
            },
            Expr::Call { callee, args } => {
                let result = self.call(callee, args, scope, depth)?;
                result.ok_or_else(|| {
                    ActionError::Fail(format!("'{callee}' does not produce a value"))
                })
            }
        }
    }

    /// Field reads. Reading a field off the empty unit aborts the move with
    /// a diagnostic instead of raising an unrelated error.
    fn eval_field(&mut self, object: Value, field: Field) -> Result<Value, ActionError> {
        match (object, field) {
            (Value::Cell(loc), Field::Unit) => Ok(Value::Unit(self.board.get(loc).cloned())),
            (Value::Unit(Some(unit)), Field::Cell) => {
                let loc = self.board.find(unit.id).ok_or_else(|| {
                    ActionError::Fail("that unit is no longer on the board".to_string())
                })?;
                Ok(Value::Cell(loc))
            }
            (Value::Unit(Some(unit)), Field::IsAlly) => {
                Ok(Value::Bool(unit.team == self.acting_team))
            }
            (Value::Unit(None), field) => Err(ActionError::Fail(format!(
                "tried to read .{} of an empty tile's unit",
                field.name()
            ))),
            (other, field) => Err(ActionError::Fail(format!(
                "{} has no field .{}",
                other.type_name(),
                field.name()
            ))),
        }
    }

    /// Dispatch a call: builtin first, then earlier-registered actions.
    ///
    /// Returns `Some` only for the value-producing builtin `path`.
    fn call(
        &mut self,
        callee: &str,
        args: &[Expr],
        scope: &mut Scope,
        depth: u32,
    ) -> Result<Option<Value>, ActionError> {
        // Arities were validated at compile time; a mismatch here means the
        // program did not come from the compiler.
        let wrong_arity = || ActionError::UnknownAction(format!("{callee} (wrong arity)"));
        match callee {
            "fail" => Err(ActionError::Fail("fail() invoked".to_string())),
            "kill" | "rangedKill" => {
                let [_, target_expr] = args else {
                    return Err(wrong_arity());
                };
                let target = self.eval_cell(target_expr, scope, depth)?;
                let (immunity, kind) = if callee == "kill" {
                    (Immunity::Melee, "melee")
                } else {
                    (Immunity::Ranged, "ranged")
                };
                self.remove_unit(target, immunity, kind)?;
                Ok(None)
            }
            "magicKill" => {
                let [target_expr] = args else {
                    return Err(wrong_arity());
                };
                let target = self.eval_cell(target_expr, scope, depth)?;
                self.remove_unit(target, Immunity::Magic, "magic")?;
                Ok(None)
            }
            "path" => {
                let (from_expr, to_expr) = match args {
                    [f, t, ..] if args.len() <= 4 => (f, t),
                    _ => return Err(wrong_arity()),
                };
                let from = self.eval_cell(from_expr, scope, depth)?;
                let to = self.eval_cell(to_expr, scope, depth)?;
                let begin_exclusive = match args.get(2) {
                    Some(flag) => self.eval_flag(flag, scope, depth)?,
                    None => false,
                };
                let end_exclusive = match args.get(3) {
                    Some(flag) => self.eval_flag(flag, scope, depth)?,
                    None => false,
                };
                let tiles = path(from, to, begin_exclusive, end_exclusive)
                    .map_err(|e| ActionError::Fail(e.to_string()))?;
                Ok(Some(Value::Tiles(tiles)))
            }
            name => {
                let action = self
                    .snapshot
                    .by_name(name)
                    .cloned()
                    .ok_or_else(|| ActionError::UnknownAction(name.to_string()))?;
                let [from_expr, to_expr] = args else {
                    return Err(wrong_arity());
                };
                let from = self.eval_cell(from_expr, scope, depth)?;
                let to = self.eval_cell(to_expr, scope, depth)?;
                self.run(&action, from, to, depth + 1)?;
                Ok(None)
            }
        }
    }

    /// Remove the unit on `target`, honouring immunity tags.
    fn remove_unit(
        &mut self,
        target: Loc,
        immunity: Immunity,
        kind: &str,
    ) -> Result<(), ActionError> {
        let unit = self.board.get(target).ok_or_else(|| {
            ActionError::Fail(format!("there is no unit at {target} to remove"))
        })?;
        if unit.is_immune_to(immunity) {
            return Err(ActionError::Fail(format!(
                "the unit at {target} is immune to {kind} attacks"
            )));
        }
        self.board.set(target, None);
        Ok(())
    }

    fn eval_cell(&mut self, expr: &Expr, scope: &mut Scope, depth: u32) -> Result<Loc, ActionError> {
        match self.eval(expr, scope, depth)? {
            Value::Cell(loc) => Ok(loc),
            other => Err(ActionError::Fail(format!(
                "expected a cell, got {}",
                other.type_name()
            ))),
        }
    }

    /// Path flags accept booleans, or numbers for editor convenience.
    fn eval_flag(&mut self, expr: &Expr, scope: &mut Scope, depth: u32) -> Result<bool, ActionError> {
        match self.eval(expr, scope, depth)? {
            Value::Bool(b) => Ok(b),
            Value::Num(n) => Ok(n != 0.0),
            other => Err(ActionError::Fail(format!(
                "expected a flag, got {}",
                other.type_name()
            ))),
        }
    }

    fn truthy(&self, value: Value) -> Result<bool, ActionError> {
        match value {
            Value::Bool(b) => Ok(b),
            // a cell's unit is truthy iff the cell is occupied
            Value::Unit(unit) => Ok(unit.is_some()),
            other => Err(ActionError::Fail(format!(
                "{} cannot be used as a condition",
                other.type_name()
            ))),
        }
    }

    fn values_equal(&self, left: &Value, right: &Value) -> Result<bool, ActionError> {
        match (left, right) {
            (Value::Cell(a), Value::Cell(b)) => Ok(a == b),
            (Value::Unit(a), Value::Unit(b)) => Ok(match (a, b) {
                (Some(a), Some(b)) => a.id == b.id,
                (None, None) => true,
                _ => false,
            }),
            (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
            (Value::Num(a), Value::Num(b)) => Ok(a == b),
            _ => Err(ActionError::Fail(format!(
                "cannot compare {} with {}",
                left.type_name(),
                right.type_name()
            ))),
        }
    }
}
