//! Stake-keyed pairing.
//!
//! A join scans the live rooms in creation order for ones still waiting at
//! exactly the requested stake and takes the first that accepts the seat.
//! A hit seats the player in slot 2; a miss opens a new room with the player
//! in slot 1.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use pong_core::{ConnectionId, Room, Slot, Stake};

use crate::registry::RoomRegistry;
use crate::room_actor::{random_serve, RoomActor, RoomHandle};
use crate::settlement::SettlementBridge;
use crate::{MatchRules, Outbound};

pub struct JoinRequest {
    pub connection: ConnectionId,
    pub wallet_address: String,
    pub stake: Stake,
    /// Where the room should deliver this player's frames
    pub outbound: Outbound,
}

/// Where a join landed
#[derive(Debug, Clone)]
pub struct Seat {
    pub room: RoomHandle,
    pub slot: Slot,
}

#[derive(Clone)]
pub struct Matchmaker {
    registry: RoomRegistry,
    rules: Arc<MatchRules>,
    bridge: Arc<SettlementBridge>,
    last_connection: Arc<AtomicU64>,
}

impl Matchmaker {
    pub fn new(rules: MatchRules, bridge: SettlementBridge) -> Self {
        Self {
            registry: RoomRegistry::new(),
            rules: Arc::new(rules),
            bridge: Arc::new(bridge),
            last_connection: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn rules(&self) -> &MatchRules {
        &self.rules
    }

    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId(self.last_connection.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Pair the request into a waiting room or open a new one.
    ///
    /// The registry lock is held from the scan until the player is seated,
    /// so two concurrent joins can never both claim the same waiting room.
    pub async fn join(&self, request: JoinRequest) -> Seat {
        let JoinRequest {
            connection,
            wallet_address,
            stake,
            outbound,
        } = request;

        let mut live = self.registry.lock().await;

        let candidates: Vec<RoomHandle> = live.waiting(stake).cloned().collect();
        for room in candidates {
            match room
                .seat(connection, wallet_address.clone(), outbound.clone())
                .await
            {
                Ok(slot) => {
                    tracing::info!("Paired {} into room {} at stake {}", connection, room.id(), stake);
                    return Seat { room, slot };
                }
                Err(e) => {
                    tracing::warn!("Could not pair {} into room {}: {}", connection, room.id(), e);
                }
            }
        }

        let id = live.allocate_id();
        let created_at = Utc::now();
        let room = Room::new(
            id,
            stake,
            connection,
            wallet_address,
            random_serve(),
            self.rules.win_score,
        );
        let handle = RoomActor::spawn(
            room,
            outbound,
            created_at,
            self.rules.clone(),
            self.bridge.clone(),
            self.registry.clone(),
        );
        live.insert(handle.clone());
        tracing::info!("{} opened room {} at stake {}", connection, id, stake);

        Seat {
            room: handle,
            slot: Slot::One,
        }
    }
}
