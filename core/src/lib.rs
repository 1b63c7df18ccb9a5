#![cfg_attr(not(feature = "std"), no_std)]

//! Authoritative pong rules shared by the match host and its tests:
//! table constants, the per-tick physics, the room lifecycle and the
//! client protocol. Nothing in here touches the network or a clock.

extern crate alloc;

pub mod constants;
pub mod physics;
pub mod protocol;
pub mod room;
pub mod types;

pub use physics::{advance, Ball, Court, Serve, Step};
pub use protocol::{BallState, ClientMessage, PlayerState, RoomState, ServerMessage};
pub use room::{Phase, PlayerSlot, Room, RoomError, SettlementOutcome, StakeProgress, TickReport};
pub use types::{ConnectionId, Direction, MatchId, RoomId, Slot, Stake};
