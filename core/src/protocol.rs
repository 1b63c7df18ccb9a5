//! Messages exchanged with game clients.
//!
//! Every frame is a JSON object tagged by `type`, fields in camelCase:
//! `{"type":"move","roomId":3,"slot":1,"direction":"up"}`.

use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::types::{Direction, RoomId, Slot, Stake};

/// Client → server intents
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Join {
        stake: Stake,
        #[serde(default)]
        wallet_address: Option<String>,
    },
    StakeConfirm {
        room_id: RoomId,
    },
    Move {
        room_id: RoomId,
        slot: Slot,
        direction: Direction,
    },
    Leave {
        room_id: RoomId,
    },
}

/// Server → client events
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    AssignedSlot {
        slot: Slot,
    },
    Staking {
        room_id: RoomId,
        stake: Stake,
    },
    Starting,
    Started {
        room_state: RoomState,
    },
    Update {
        room_state: RoomState,
    },
    Ended {
        room_state: RoomState,
        winner_address: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        settlement_ref: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomState {
    pub room_id: RoomId,
    pub players: Vec<PlayerState>,
    pub ball: BallState,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub slot: Slot,
    pub x: i32,
    /// Paddle top edge
    pub y: i32,
    pub score: u32,
    pub wallet_address: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallState {
    pub x: i32,
    pub y: i32,
}
