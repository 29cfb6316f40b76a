//! Lobby state machine
//!
//! Published game requests awaiting acceptance. Pure state: the server
//! wraps this in a lock and fans events out to connected clients itself.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LobbyError;
use crate::types::BoardId;

/// A published offer to play a given board setup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyRequest {
    pub id: u64,
    pub requesting_user: String,
    pub board: BoardId,
    /// Creation order; doubles as a timestamp substitute in tests
    pub sequence: u64,
}

/// Outcome of accepting a request
#[derive(Debug, Clone)]
pub struct AcceptedRequest {
    pub request: LobbyRequest,
    /// Every request removed by the acceptance: the accepted one plus all
    /// other requests by the same author
    pub removed_ids: Vec<u64>,
}

/// All open requests, in creation order
#[derive(Debug, Default)]
pub struct Lobby {
    requests: IndexMap<u64, LobbyRequest>,
    next_id: u64,
}

impl Lobby {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new request.
    pub fn request_game(&mut self, user: &str, board: BoardId) -> &LobbyRequest {
        let id = self.next_id;
        self.next_id += 1;
        debug!(request = id, user, %board, "game requested");
        self.requests.insert(
            id,
            LobbyRequest {
                id,
                requesting_user: user.to_string(),
                board,
                sequence: id,
            },
        );
        &self.requests[&id]
    }

    /// Accept a request, atomically removing it and every other request by
    /// the same author (at most one live request per author survives — that
    /// is, none).
    pub fn accept_game(&mut self, request_id: u64) -> Result<AcceptedRequest, LobbyError> {
        let request = self
            .requests
            .shift_remove(&request_id)
            .ok_or(LobbyError::UnknownRequest(request_id))?;

        let mut removed_ids = vec![request_id];
        self.requests.retain(|id, other| {
            if other.requesting_user == request.requesting_user {
                removed_ids.push(*id);
                false
            } else {
                true
            }
        });
        debug!(request = request_id, removed = removed_ids.len(), "request accepted");

        Ok(AcceptedRequest {
            request,
            removed_ids,
        })
    }

    /// Drop all of a departing user's requests; returns the removed ids.
    pub fn remove_user_requests(&mut self, user: &str) -> Vec<u64> {
        let mut removed = Vec::new();
        self.requests.retain(|id, request| {
            if request.requesting_user == user {
                removed.push(*id);
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn requests(&self) -> impl Iterator<Item = &LobbyRequest> {
        self.requests.values()
    }
}
