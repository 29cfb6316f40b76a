//! Serialized visual-program documents
//!
//! The visual editor ships a move implementation as an opaque JSON blob: a
//! tree of typed blocks with `inputs` (nested value/statement blocks),
//! `fields` (inline literals) and `next` chaining for statement sequences.
//! The editor never interprets action semantics itself; this module is the
//! only reader of the format.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CompileError;

/// A full workspace document as serialized by the editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceDocument {
    #[serde(default)]
    pub blocks: BlockRegion,
}

impl WorkspaceDocument {
    /// Parse a document from its JSON encoding.
    pub fn from_json(raw: &serde_json::Value) -> Result<Self, CompileError> {
        serde_json::from_value(raw.clone()).map_err(|e| CompileError::Document(e.to_string()))
    }

    /// The single root `act` block every implementation must have.
    pub fn root_act(&self) -> Result<&Block, CompileError> {
        let roots: Vec<&Block> = self
            .blocks
            .blocks
            .iter()
            .filter(|b| b.kind == "act")
            .collect();
        if roots.len() != 1 || self.blocks.blocks.len() != 1 {
            return Err(CompileError::RootBlock(self.blocks.blocks.len()));
        }
        Ok(roots[0])
    }
}

/// Top-level block list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockRegion {
    #[serde(default)]
    pub blocks: Vec<Block>,
}

/// One block in the visual program.
///
/// Unknown keys (editor ids, coordinates, collapsed flags) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, Input>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Box<Next>>,
}

/// A named input slot; empty if the author left the socket unfilled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Input {
    #[serde(default)]
    pub block: Option<Box<Block>>,
}

/// Statement chaining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Next {
    pub block: Box<Block>,
}

impl Block {
    /// Fetch a required input block.
    pub fn input(&self, name: &str) -> Result<&Block, CompileError> {
        self.try_input(name).ok_or_else(|| {
            CompileError::Document(format!("block '{}' is missing input '{name}'", self.kind))
        })
    }

    /// Fetch an optional input block.
    pub fn try_input(&self, name: &str) -> Option<&Block> {
        self.inputs.get(name).and_then(|i| i.block.as_deref())
    }

    /// Fetch a required string field. Variable fields may serialize as
    /// `{"name": ".."}` objects; both shapes are accepted.
    pub fn field_str(&self, name: &str) -> Result<&str, CompileError> {
        let value = self.fields.get(name).ok_or_else(|| {
            CompileError::Document(format!("block '{}' is missing field '{name}'", self.kind))
        })?;
        value
            .as_str()
            .or_else(|| value.get("name").and_then(|v| v.as_str()))
            .ok_or_else(|| {
                CompileError::Document(format!(
                    "field '{name}' of block '{}' is not a string",
                    self.kind
                ))
            })
    }

    /// Fetch a required numeric field.
    pub fn field_num(&self, name: &str) -> Result<f64, CompileError> {
        self.fields
            .get(name)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| {
                CompileError::Document(format!(
                    "field '{name}' of block '{}' is not a number",
                    self.kind
                ))
            })
    }
}
