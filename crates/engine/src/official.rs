//! Official move library
//!
//! The stock moves every player sees, authored in the action language and
//! registered in dependency order: composite moves like `moveOrAttack` call
//! the primitives registered before them.

use gambit_dsl::{MoveCategory, MoveDefinition, MoveId, MoveRegistry};
use tracing::warn;

struct OfficialMove {
    id: &'static str,
    name: &'static str,
    overview: &'static str,
    description: &'static str,
    color: [u8; 3],
    symbol: &'static str,
    source: &'static str,
}

const OFFICIAL_MOVES: &[OfficialMove] = &[
    OfficialMove {
        id: "official:swapUnit",
        name: "swapUnit",
        overview: "(Unblockable) Teleport or Swap.",
        description: "Teleport to target empty position, or swap places with \
                      the (allied or enemy) unit that is at this position.",
        color: [200, 112, 255],
        symbol: "\u{21BB}",
        source: "tmp = source.unit;\n\
                 source.unit = target.unit;\n\
                 target.unit = tmp;\n",
    },
    OfficialMove {
        id: "official:teleport",
        name: "teleport",
        overview: "(Unblockable) Teleport.",
        description: "Teleport to target empty position.",
        color: [200, 112, 255],
        symbol: "",
        source: "if (target.unit) {\n\
                 \x20 fail();\n\
                 }\n\
                 swapUnit(source, target);\n",
    },
    OfficialMove {
        id: "official:jumpAttack",
        name: "jumpAttack",
        overview: "(Unblockable) Teleport or Attack.",
        description: "Teleport to target position. If an enemy unit is \
                      there, attack it first.",
        color: [94, 255, 100],
        symbol: "",
        source: "if (target.unit) {\n\
                 \x20 if (target.unit.isAlly) {\n\
                 \x20   fail();\n\
                 \x20 }\n\
                 \x20 kill(source, target);\n\
                 }\n\
                 teleport(source, target);\n",
    },
    OfficialMove {
        id: "official:slide",
        name: "slide",
        overview: "Move",
        description: "Move to empty target position. All cells on the line \
                      between the two positions must be empty.",
        color: [130, 112, 255],
        symbol: "",
        source: "for (cell in path(source, target)) {\n\
                 \x20 if (cell != source and cell.unit) {\n\
                 \x20   fail();\n\
                 \x20 }\n\
                 }\n\
                 swapUnit(source, target);\n",
    },
    OfficialMove {
        id: "official:slideAttack",
        name: "slideAttack",
        overview: "Attack only.",
        description: "Attack the enemy unit at target position and travel \
                      there. All cells between the two positions must be \
                      empty.",
        color: [255, 112, 112],
        symbol: "",
        source: "if (target.unit.isAlly) {\n\
                 \x20 fail();\n\
                 }\n\
                 kill(source, target);\n\
                 slide(source, target);\n",
    },
    OfficialMove {
        id: "official:moveOrAttack",
        name: "moveOrAttack",
        overview: "Move or Attack.",
        description: "Move to target position or attack the enemy unit \
                      there. All cells between the two positions must be \
                      empty.",
        color: [184, 184, 184],
        symbol: "",
        source: "if (not target.unit) {\n\
                 \x20 slide(source, target);\n\
                 } else if (not target.unit.isAlly) {\n\
                 \x20 slideAttack(source, target);\n\
                 } else {\n\
                 \x20 fail();\n\
                 }\n",
    },
    OfficialMove {
        id: "official:jumpSwap",
        name: "jumpSwap",
        overview: "(Unblockable) Move, Attack, or swap places with ally.",
        description: "Teleport to target position. If an enemy unit is \
                      there, attack it. If a friendly unit is there, \
                      teleport it back to your starting location.",
        color: [255, 224, 112],
        symbol: "",
        source: "if (not target.unit) {\n\
                 \x20 teleport(source, target);\n\
                 } else if (target.unit.isAlly) {\n\
                 \x20 swapUnit(source, target);\n\
                 } else {\n\
                 \x20 jumpAttack(source, target);\n\
                 }\n",
    },
    OfficialMove {
        id: "official:destroy",
        name: "destroy",
        overview: "(Magic) Destroy target.",
        description: "Destroy the enemy at the target location without \
                      moving.",
        color: [255, 160, 112],
        symbol: "",
        source: "if (target.unit.isAlly) {\n\
                 \x20 fail();\n\
                 }\n\
                 magicKill(target);\n",
    },
];

/// Build a registry pre-seeded with the official move library.
pub fn official_registry() -> MoveRegistry {
    let mut registry = MoveRegistry::new();
    for entry in OFFICIAL_MOVES {
        let definition = MoveDefinition {
            id: MoveId::from(entry.id),
            name: entry.name.to_string(),
            overview: entry.overview.to_string(),
            description: entry.description.to_string(),
            color: entry.color,
            symbol: entry.symbol.to_string(),
            category: MoveCategory::Official,
            author: None,
            implementation: None,
        };
        if let Err(error) = registry.register_source(definition, entry.source) {
            // The library is static; a failure here is a programming error,
            // but a broken stock move must not take the server down.
            warn!(name = entry.name, %error, "official move failed to compile");
        }
    }
    registry
}
