//! Code generation: workspace document → action source text
//!
//! The one place block programs are turned into source. The headless
//! conversion endpoint returns this text verbatim and the compiler consumes
//! it, so runtime and authoring tooling cannot disagree about what a block
//! program means.

use crate::document::{Block, WorkspaceDocument};
use crate::error::CompileError;

/// Render the document's root `act` block to action source text.
pub fn generate_source(doc: &WorkspaceDocument) -> Result<String, CompileError> {
    let root = doc.root_act()?;
    let mut out = String::new();
    if let Some(first) = root.try_input("ACTION") {
        emit_stmts(&mut out, first, 0)?;
    }
    Ok(out)
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

/// Emit a statement and everything chained after it via `next`.
fn emit_stmts(out: &mut String, first: &Block, level: usize) -> Result<(), CompileError> {
    let mut current = Some(first);
    while let Some(block) = current {
        emit_stmt(out, block, level)?;
        current = block.next.as_ref().map(|n| n.block.as_ref());
    }
    Ok(())
}

fn emit_stmt(out: &mut String, block: &Block, level: usize) -> Result<(), CompileError> {
    indent(out, level);
    match block.kind.as_str() {
        "kill" | "ranged_kill" => {
            let name = if block.kind == "kill" { "kill" } else { "rangedKill" };
            let source = emit_expr(block.input("SOURCE")?, 0)?;
            let target = emit_expr(block.input("TARGET")?, 0)?;
            out.push_str(&format!("{name}({source}, {target});\n"));
        }
        "magic_kill" => {
            let target = emit_expr(block.input("TARGET")?, 0)?;
            out.push_str(&format!("magicKill({target});\n"));
        }
        "fail" => out.push_str("fail();\n"),
        "call_action" => {
            let name = block.field_str("NAME")?.to_string();
            let source = emit_expr(block.input("SOURCE")?, 0)?;
            let target = emit_expr(block.input("TARGET")?, 0)?;
            out.push_str(&format!("{name}({source}, {target});\n"));
        }
        "set_unit" => {
            let cell = emit_expr(block.input("CELL")?, PREC_POSTFIX)?;
            let value = emit_expr(block.input("VALUE")?, 0)?;
            out.push_str(&format!("{cell}.unit = {value};\n"));
        }
        "variables_set" => {
            let var = block.field_str("VAR")?.to_string();
            let value = emit_expr(block.input("VALUE")?, 0)?;
            out.push_str(&format!("{var} = {value};\n"));
        }
        "controls_if" => {
            let mut arm = 0;
            while let Some(cond_block) = block.try_input(&format!("IF{arm}")) {
                let cond = emit_expr(cond_block, 0)?;
                if arm == 0 {
                    out.push_str(&format!("if ({cond}) {{\n"));
                } else {
                    indent(out, level);
                    out.push_str(&format!("}} else if ({cond}) {{\n"));
                }
                if let Some(body) = block.try_input(&format!("DO{arm}")) {
                    emit_stmts(out, body, level + 1)?;
                }
                arm += 1;
            }
            if arm == 0 {
                return Err(CompileError::Document(
                    "'controls_if' block has no condition".to_string(),
                ));
            }
            if let Some(else_body) = block.try_input("ELSE") {
                indent(out, level);
                out.push_str("} else {\n");
                emit_stmts(out, else_body, level + 1)?;
            }
            indent(out, level);
            out.push_str("}\n");
        }
        "for_all_tiles" => {
            let var = block.field_str("VAR")?.to_string();
            let list = emit_expr(block.input("TILE_LIST")?, 0)?;
            out.push_str(&format!("for ({var} in {list}) {{\n"));
            if let Some(body) = block.try_input("DO") {
                emit_stmts(out, body, level + 1)?;
            }
            indent(out, level);
            out.push_str("}\n");
        }
        other => {
            return Err(CompileError::Document(format!(
                "unknown statement block '{other}'"
            )));
        }
    }
    Ok(())
}

// Emission precedence, mirroring the parser's table.
const PREC_OR: u8 = 10;
const PREC_AND: u8 = 20;
const PREC_EQ: u8 = 30;
const PREC_NOT: u8 = 40;
const PREC_POSTFIX: u8 = 50;

/// Emit a value block, parenthesizing when the context binds tighter.
fn emit_expr(block: &Block, parent_prec: u8) -> Result<String, CompileError> {
    let (text, prec) = match block.kind.as_str() {
        "source_cell" => ("source".to_string(), PREC_POSTFIX),
        "target_cell" => ("target".to_string(), PREC_POSTFIX),
        "acting_unit" => ("source.unit".to_string(), PREC_POSTFIX),
        "unit_on_cell" => {
            let cell = emit_expr(block.input("CELL")?, PREC_POSTFIX)?;
            (format!("{cell}.unit"), PREC_POSTFIX)
        }
        "cell_of_unit" => {
            let unit = emit_expr(block.input("UNIT")?, PREC_POSTFIX)?;
            (format!("{unit}.cell"), PREC_POSTFIX)
        }
        "is_ally" => {
            let unit = emit_expr(block.input("UNIT")?, PREC_POSTFIX)?;
            (format!("{unit}.isAlly"), PREC_POSTFIX)
        }
        "path" => {
            let from = emit_expr(block.input("FROM_CELL")?, 0)?;
            let to = emit_expr(block.input("TO_CELL")?, 0)?;
            let mut args = vec![from, to];
            if let Some(begin) = block.try_input("BEGIN_EXCLUSIVE") {
                args.push(emit_expr(begin, 0)?);
                if let Some(end) = block.try_input("END_EXCLUSIVE") {
                    args.push(emit_expr(end, 0)?);
                }
            }
            (format!("path({})", args.join(", ")), PREC_POSTFIX)
        }
        "logic_boolean" => {
            let value = block.field_str("BOOL")?;
            (value.eq_ignore_ascii_case("true").to_string(), PREC_POSTFIX)
        }
        "math_number" => {
            let n = block.field_num("NUM")?;
            let text = if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", n as i64)
            } else {
                format!("{n}")
            };
            (text, PREC_POSTFIX)
        }
        "logic_compare" => {
            let op = match block.field_str("OP")? {
                "EQ" => "==",
                "NEQ" => "!=",
                other => {
                    return Err(CompileError::Document(format!(
                        "unsupported comparison '{other}'"
                    )));
                }
            };
            let a = emit_expr(block.input("A")?, PREC_EQ + 1)?;
            let b = emit_expr(block.input("B")?, PREC_EQ + 1)?;
            (format!("{a} {op} {b}"), PREC_EQ)
        }
        "logic_operation" => {
            let (op, prec) = match block.field_str("OP")? {
                "AND" => ("and", PREC_AND),
                "OR" => ("or", PREC_OR),
                other => {
                    return Err(CompileError::Document(format!(
                        "unsupported logic operation '{other}'"
                    )));
                }
            };
            let a = emit_expr(block.input("A")?, prec)?;
            let b = emit_expr(block.input("B")?, prec + 1)?;
            (format!("{a} {op} {b}"), prec)
        }
        "logic_negate" => {
            let operand = emit_expr(block.input("BOOL")?, PREC_NOT)?;
            (format!("not {operand}"), PREC_NOT)
        }
        "variables_get" => (block.field_str("VAR")?.to_string(), PREC_POSTFIX),
        other => {
            return Err(CompileError::Document(format!(
                "unknown value block '{other}'"
            )));
        }
    };

    if prec < parent_prec {
        Ok(format!("({text})"))
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::WorkspaceDocument;
    use serde_json::json;

    fn generate(doc: serde_json::Value) -> Result<String, CompileError> {
        generate_source(&WorkspaceDocument::from_json(&doc).unwrap())
    }

    #[test]
    fn test_empty_act_generates_empty_body() {
        let source = generate(json!({"blocks": {"blocks": [{"type": "act"}]}})).unwrap();
        assert_eq!(source, "");
    }

    #[test]
    fn test_kill_then_call_chain() {
        let source = generate(json!({"blocks": {"blocks": [{
            "type": "act",
            "inputs": {"ACTION": {"block": {
                "type": "kill",
                "inputs": {
                    "SOURCE": {"block": {"type": "source_cell"}},
                    "TARGET": {"block": {"type": "target_cell"}}
                },
                "next": {"block": {
                    "type": "call_action",
                    "fields": {"NAME": "teleport"},
                    "inputs": {
                        "SOURCE": {"block": {"type": "source_cell"}},
                        "TARGET": {"block": {"type": "target_cell"}}
                    }
                }}
            }}}
        }]}}))
        .unwrap();
        assert_eq!(source, "kill(source, target);\nteleport(source, target);\n");
    }

    #[test]
    fn test_if_with_negated_condition() {
        let source = generate(json!({"blocks": {"blocks": [{
            "type": "act",
            "inputs": {"ACTION": {"block": {
                "type": "controls_if",
                "inputs": {
                    "IF0": {"block": {
                        "type": "logic_negate",
                        "inputs": {"BOOL": {"block": {
                            "type": "is_ally",
                            "inputs": {"UNIT": {"block": {
                                "type": "unit_on_cell",
                                "inputs": {"CELL": {"block": {"type": "target_cell"}}}
                            }}}
                        }}}
                    }},
                    "DO0": {"block": {
                        "type": "magic_kill",
                        "inputs": {"TARGET": {"block": {"type": "target_cell"}}}
                    }}
                }
            }}}
        }]}}))
        .unwrap();
        assert_eq!(
            source,
            "if (not target.unit.isAlly) {\n  magicKill(target);\n}\n"
        );
    }

    #[test]
    fn test_for_over_path_with_compound_condition() {
        let source = generate(json!({"blocks": {"blocks": [{
            "type": "act",
            "inputs": {"ACTION": {"block": {
                "type": "for_all_tiles",
                "fields": {"VAR": {"name": "cell"}},
                "inputs": {
                    "TILE_LIST": {"block": {
                        "type": "path",
                        "inputs": {
                            "FROM_CELL": {"block": {"type": "source_cell"}},
                            "TO_CELL": {"block": {"type": "target_cell"}}
                        }
                    }},
                    "DO": {"block": {
                        "type": "controls_if",
                        "inputs": {
                            "IF0": {"block": {
                                "type": "logic_operation",
                                "fields": {"OP": "AND"},
                                "inputs": {
                                    "A": {"block": {
                                        "type": "logic_compare",
                                        "fields": {"OP": "NEQ"},
                                        "inputs": {
                                            "A": {"block": {"type": "variables_get", "fields": {"VAR": "cell"}}},
                                            "B": {"block": {"type": "source_cell"}}
                                        }
                                    }},
                                    "B": {"block": {
                                        "type": "unit_on_cell",
                                        "inputs": {"CELL": {"block": {"type": "variables_get", "fields": {"VAR": "cell"}}}}
                                    }}
                                }
                            }},
                            "DO0": {"block": {"type": "fail"}}
                        }
                    }}
                }
            }}}
        }]}}))
        .unwrap();
        assert_eq!(
            source,
            "for (cell in path(source, target)) {\n  \
               if (cell != source and cell.unit) {\n    fail();\n  }\n\
             }\n"
        );
    }

    #[test]
    fn test_generated_source_parses() {
        let source = generate(json!({"blocks": {"blocks": [{
            "type": "act",
            "inputs": {"ACTION": {"block": {
                "type": "variables_set",
                "fields": {"VAR": "tmp"},
                "inputs": {"VALUE": {"block": {
                    "type": "unit_on_cell",
                    "inputs": {"CELL": {"block": {"type": "source_cell"}}}
                }}}
            }}}
        }]}}))
        .unwrap();
        let tokens = crate::lexer::lex(&source).unwrap();
        assert!(crate::parser::parse(&tokens).is_ok());
    }

    #[test]
    fn test_unknown_block_is_rejected() {
        let err = generate(json!({"blocks": {"blocks": [{
            "type": "act",
            "inputs": {"ACTION": {"block": {"type": "summon_dragon"}}}
        }]}}))
        .unwrap_err();
        assert!(matches!(err, CompileError::Document(_)));
    }

    #[test]
    fn test_missing_input_is_rejected() {
        let err = generate(json!({"blocks": {"blocks": [{
            "type": "act",
            "inputs": {"ACTION": {"block": {"type": "kill"}}}
        }]}}))
        .unwrap_err();
        assert!(matches!(err, CompileError::Document(_)));
    }
}
