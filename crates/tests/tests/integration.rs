//! Integration tests for end-to-end match flow.
//!
//! These tests verify the full pipeline:
//! Author moves → Compile → Design pieces → Matchmake → Play → Terminate.

use gambit_dsl::{generate_source, MoveCategory, MoveDefinition, MoveId, WorkspaceDocument};
use gambit_engine::{GameError, GameResult, Loc, Team, WinCondition, WinReason};
use gambit_tests::TestHarness;
use serde_json::json;

/// A rook-like slider crosses an open rank; the same move is rejected when
/// the rank is blocked, leaving the board untouched.
#[test]
fn test_rook_slide_scenario() {
    let mut harness = TestHarness::new();
    harness.save_rider_piece("rook", "moveOrAttack");
    harness.save_board(
        "open-rank",
        &[
            (0, 0, "rook", Team::White, false),
            (7, 7, "rook", Team::Black, false),
        ],
        WinCondition::AllPiecesCaptured,
    );
    harness.matchmake("alice", "bob", "open-rank");

    harness.make_move("alice", (0, 0), (0, 7)).unwrap();
    assert!(harness.board().get(Loc::new(0, 0)).is_none());
    assert_eq!(
        harness.board().get(Loc::new(0, 7)).unwrap().team,
        Team::White
    );
    assert!(!harness.game().white_to_move);
}

#[test]
fn test_blocked_slide_leaves_board_bit_identical() {
    let mut harness = TestHarness::new();
    harness.save_rider_piece("rook", "moveOrAttack");
    harness.save_board(
        "blocked-rank",
        &[
            (0, 0, "rook", Team::White, false),
            (0, 3, "rook", Team::Black, false),
            (7, 7, "rook", Team::Black, false),
        ],
        WinCondition::AllPiecesCaptured,
    );
    harness.matchmake("alice", "bob", "blocked-rank");

    let before = harness.board().clone();
    let err = harness.make_move("alice", (0, 0), (0, 7)).unwrap_err();
    assert!(matches!(err, GameError::Action(_)));
    assert_eq!(harness.board(), &before);
    assert!(harness.game().white_to_move);
}

/// Out-of-turn moves are rejected without mutating the turn flag or board.
#[test]
fn test_out_of_turn_rejection() {
    let mut harness = TestHarness::new();
    harness.save_rider_piece("rook", "moveOrAttack");
    harness.save_board(
        "duel",
        &[
            (0, 0, "rook", Team::White, false),
            (7, 7, "rook", Team::Black, false),
        ],
        WinCondition::AllPiecesCaptured,
    );
    harness.matchmake("alice", "bob", "duel");

    let before = harness.board().clone();
    assert_eq!(
        harness.make_move("bob", (7, 7), (7, 0)).unwrap_err(),
        GameError::NotYourTurn
    );
    assert_eq!(harness.board(), &before);
    assert!(harness.game().white_to_move);
}

/// Accepting a request clears every request by the same author and exactly
/// one game exists afterwards.
#[test]
fn test_accept_clears_authors_other_requests() {
    let mut harness = TestHarness::new();
    harness.save_rider_piece("rook", "moveOrAttack");
    harness.save_board(
        "duel",
        &[
            (0, 0, "rook", Team::White, false),
            (7, 7, "rook", Team::Black, false),
        ],
        WinCondition::AllPiecesCaptured,
    );

    // the author spams two requests; a bystander posts one of their own
    harness
        .lobby
        .request_game("alice", gambit_engine::BoardId::from("duel"));
    harness
        .lobby
        .request_game("carol", gambit_engine::BoardId::from("duel"));

    let accepted = harness.matchmake("alice", "bob", "duel");
    assert_eq!(accepted.removed_ids.len(), 2);
    assert!(harness.game.is_some());

    let remaining: Vec<&str> = harness
        .lobby
        .requests()
        .map(|r| r.requesting_user.as_str())
        .collect();
    assert_eq!(remaining, vec!["carol"]);
}

/// A royal capture under any-royal-captured ends the game immediately even
/// though other pieces remain.
#[test]
fn test_any_royal_capture_is_immediately_terminal() {
    let mut harness = TestHarness::new();
    harness.save_rider_piece("rook", "moveOrAttack");
    harness.save_board(
        "regicide",
        &[
            (0, 0, "rook", Team::White, false),
            (0, 5, "rook", Team::Black, true),
            (7, 0, "rook", Team::Black, false),
            (7, 7, "rook", Team::Black, false),
        ],
        WinCondition::AnyRoyalCaptured,
    );
    harness.matchmake("alice", "bob", "regicide");

    harness.make_move("alice", (0, 0), (0, 5)).unwrap();
    assert_eq!(
        harness.game().result,
        GameResult::Won {
            winner: Team::White,
            reason: WinReason::Capture
        }
    );
    assert_eq!(
        harness.make_move("bob", (7, 0), (7, 5)).unwrap_err(),
        GameError::GameOver
    );
}

/// Draw negotiation: two same-side offers never agree, offer + acceptance
/// always does.
#[test]
fn test_draw_negotiation() {
    let mut harness = TestHarness::new();
    harness.save_rider_piece("rook", "moveOrAttack");
    harness.save_board(
        "duel",
        &[
            (0, 0, "rook", Team::White, false),
            (7, 7, "rook", Team::Black, false),
        ],
        WinCondition::AllPiecesCaptured,
    );
    harness.matchmake("alice", "bob", "duel");

    harness.game().draw("alice").unwrap();
    harness.game().draw("alice").unwrap();
    assert_eq!(harness.game().result, GameResult::InProgress);

    harness.game().draw("bob").unwrap();
    assert_eq!(harness.game().result, GameResult::Draw);
}

/// A custom move authored as a workspace document plays end to end: the
/// document converts to source, compiles against the official library and
/// drives a capture.
#[test]
fn test_custom_document_move_plays() {
    let mut harness = TestHarness::new();

    // "charge": jump straight to the target, attacking if an enemy is there
    let document = json!({"blocks": {"blocks": [{
        "type": "act",
        "inputs": {"ACTION": {"block": {
            "type": "call_action",
            "fields": {"NAME": "jumpAttack"},
            "inputs": {
                "SOURCE": {"block": {"type": "source_cell"}},
                "TARGET": {"block": {"type": "target_cell"}}
            }
        }}}
    }]}});

    // the conversion endpoint and the compiler share this exact text
    let source =
        generate_source(&WorkspaceDocument::from_json(&document).unwrap()).unwrap();
    assert_eq!(source, "jumpAttack(source, target);\n");

    harness
        .workshop
        .create_move(MoveDefinition {
            id: MoveId::from("custom:charge"),
            name: "charge".to_string(),
            overview: "Jump and attack.".to_string(),
            description: "Leap to the target, capturing any enemy there.".to_string(),
            color: [10, 200, 90],
            symbol: "!".to_string(),
            category: MoveCategory::Custom,
            author: Some("alice".to_string()),
            implementation: Some(document),
        })
        .unwrap();

    let mut moves = gambit_engine::MoveGrid::new();
    moves
        .place(2, 1, Some(MoveId::from("custom:charge")))
        .unwrap();
    harness
        .workshop
        .save_piece(gambit_engine::Piece {
            id: gambit_engine::PieceId::from("knightish"),
            name: "Knightish".to_string(),
            image_white: String::new(),
            image_black: String::new(),
            moves,
            author: Some("alice".to_string()),
            immunities: Vec::new(),
        })
        .unwrap();

    harness.save_board(
        "charge-test",
        &[
            (0, 0, "knightish", Team::White, false),
            (2, 1, "knightish", Team::Black, false),
            // mirror write also allows (2, -1); keep a second black unit so
            // the game does not end by the no-moves rule after the capture
            (4, 0, "knightish", Team::Black, false),
        ],
        WinCondition::AllPiecesCaptured,
    );
    harness.matchmake("alice", "bob", "charge-test");

    harness.make_move("alice", (0, 0), (2, 1)).unwrap();
    assert_eq!(
        harness.board().get(Loc::new(2, 1)).unwrap().team,
        Team::White
    );
    assert_eq!(harness.game().result, GameResult::InProgress);
}

/// The black team reads its grid with the row delta negated: a "forward"
/// cell serves black moving toward white's back rank.
#[test]
fn test_black_moves_forward_toward_white() {
    let mut harness = TestHarness::new();

    let mut moves = gambit_engine::MoveGrid::new();
    moves
        .place(1, 0, Some(MoveId::from("official:slide")))
        .unwrap();
    harness
        .workshop
        .save_piece(gambit_engine::Piece {
            id: gambit_engine::PieceId::from("pawnish"),
            name: "Pawnish".to_string(),
            image_white: String::new(),
            image_black: String::new(),
            moves,
            author: None,
            immunities: Vec::new(),
        })
        .unwrap();

    harness.save_board(
        "pawn-duel",
        &[
            (1, 0, "pawnish", Team::White, false),
            (6, 7, "pawnish", Team::Black, false),
        ],
        WinCondition::AllPiecesCaptured,
    );
    harness.matchmake("alice", "bob", "pawn-duel");

    // white pushes forward (increasing row)
    harness.make_move("alice", (1, 0), (2, 0)).unwrap();
    // black pushes forward (decreasing row)
    harness.make_move("bob", (6, 7), (5, 7)).unwrap();
    assert!(harness.board().get(Loc::new(5, 7)).is_some());

    // black cannot move "backward" even though white could use that cell
    harness.make_move("alice", (2, 0), (3, 0)).unwrap();
    assert_eq!(
        harness.make_move("bob", (5, 7), (6, 7)).unwrap_err(),
        GameError::NoMoveDefined
    );
}
