//! The live room set.
//!
//! One async mutex guards the whole map. Matchmaking holds it across the scan
//! *and* the seat/insert that follows, and room teardown takes it to remove
//! itself, so a pairing can never land in a room that is being torn down.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pong_core::{Phase, RoomId, Stake};
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};

use crate::room_actor::RoomHandle;

#[derive(Debug, Clone, Default)]
pub struct RoomRegistry(Arc<Mutex<LiveRooms>>);

#[derive(Debug, Default)]
pub(crate) struct LiveRooms {
    /// Keyed by id, so iteration order is creation order.
    rooms: BTreeMap<RoomId, RoomHandle>,
    last_id: u64,
}

/// Lobby view of one live room
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub stake: Stake,
    pub phase: Phase,
    pub players: usize,
    pub created_at: DateTime<Utc>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, LiveRooms> {
        self.0.lock().await
    }

    pub async fn get(&self, id: RoomId) -> Option<RoomHandle> {
        self.0.lock().await.rooms.get(&id).cloned()
    }

    pub async fn remove(&self, id: RoomId) -> Option<RoomHandle> {
        self.0.lock().await.rooms.remove(&id)
    }

    pub async fn len(&self) -> usize {
        self.0.lock().await.rooms.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn summaries(&self) -> Vec<RoomSummary> {
        let live = self.0.lock().await;
        live.rooms
            .values()
            .map(|handle| RoomSummary {
                room_id: handle.id(),
                stake: handle.stake(),
                phase: handle.phase(),
                players: handle.players(),
                created_at: handle.created_at(),
            })
            .collect()
    }
}

impl LiveRooms {
    pub(crate) fn allocate_id(&mut self) -> RoomId {
        self.last_id += 1;
        RoomId(self.last_id)
    }

    /// Rooms still waiting for an opponent at exactly this stake, oldest first.
    pub(crate) fn waiting(&self, stake: Stake) -> impl Iterator<Item = &RoomHandle> {
        self.rooms
            .values()
            .filter(move |h| h.stake() == stake && h.phase() == Phase::WaitingForOpponent)
    }

    pub(crate) fn insert(&mut self, handle: RoomHandle) {
        self.rooms.insert(handle.id(), handle);
    }
}
