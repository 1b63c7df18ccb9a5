//! Per-connection session: checks each intent's preconditions and routes it
//! to the matchmaker or to the connection's room.
//!
//! | Intent | Needs | Goes to |
//! |---|---|---|
//! | `join` | not in a room, a wallet | matchmaker |
//! | `stakeConfirm` | in that room | room (`Staking` only) |
//! | `move` | in that room | room (`InProgress`, own slot only) |
//! | `leave` / disconnect | nothing | room, unsubscribe only |
//!
//! Rejections are returned as [`GatewayError`] for logging; nothing is sent
//! back to the client.

use pong_core::{ClientMessage, ConnectionId, Phase, RoomId, Stake};
use thiserror::Error;

use crate::matchmaker::{JoinRequest, Matchmaker};
use crate::room_actor::{RoomCommand, RoomHandle};
use crate::Outbound;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("already in room {0}")]
    AlreadyInRoom(RoomId),

    #[error("not in a room")]
    NotInRoom,

    #[error("intent for room {requested} but connection is in room {current}")]
    RoomMismatch { requested: RoomId, current: RoomId },

    #[error("join needs a wallet address")]
    MissingWallet,

    #[error("room {0} has shut down")]
    RoomClosed(RoomId),
}

pub struct Session {
    id: ConnectionId,
    wallet_address: Option<String>,
    room: Option<RoomHandle>,
    outbound: Outbound,
    matchmaker: Matchmaker,
}

impl Session {
    pub fn new(matchmaker: Matchmaker, outbound: Outbound) -> Self {
        Self {
            id: matchmaker.next_connection_id(),
            wallet_address: None,
            room: None,
            outbound,
            matchmaker,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn room_id(&self) -> Option<RoomId> {
        self.room.as_ref().map(RoomHandle::id)
    }

    pub async fn handle(&mut self, message: ClientMessage) -> Result<(), GatewayError> {
        match message {
            ClientMessage::Join {
                stake,
                wallet_address,
            } => self.join(stake, wallet_address).await,
            ClientMessage::StakeConfirm { room_id } => {
                let connection = self.id;
                self.forward(room_id, RoomCommand::ConfirmStake { connection })
                    .await
            }
            ClientMessage::Move {
                room_id,
                slot,
                direction,
            } => {
                let connection = self.id;
                self.forward(
                    room_id,
                    RoomCommand::Move {
                        connection,
                        slot,
                        direction,
                    },
                )
                .await
            }
            ClientMessage::Leave { room_id } => {
                let current = self.room_id().ok_or(GatewayError::NotInRoom)?;
                if current != room_id {
                    return Err(GatewayError::RoomMismatch {
                        requested: room_id,
                        current,
                    });
                }
                self.leave().await;
                Ok(())
            }
        }
    }

    async fn join(&mut self, stake: Stake, wallet_address: Option<String>) -> Result<(), GatewayError> {
        if self.room.as_ref().is_some_and(|r| r.phase() == Phase::Closed) {
            self.room = None;
        }
        if let Some(current) = self.room_id() {
            return Err(GatewayError::AlreadyInRoom(current));
        }

        let wallet_address = wallet_address
            .or_else(|| self.wallet_address.clone())
            .filter(|w| !w.trim().is_empty())
            .ok_or(GatewayError::MissingWallet)?;
        self.wallet_address = Some(wallet_address.clone());

        let seat = self
            .matchmaker
            .join(JoinRequest {
                connection: self.id,
                wallet_address,
                stake,
                outbound: self.outbound.clone(),
            })
            .await;
        tracing::debug!("{} holds slot {} in room {}", self.id, seat.slot, seat.room.id());
        self.room = Some(seat.room);
        Ok(())
    }

    async fn forward(&mut self, room_id: RoomId, command: RoomCommand) -> Result<(), GatewayError> {
        let room = self.room.as_ref().ok_or(GatewayError::NotInRoom)?;
        if room.id() != room_id {
            return Err(GatewayError::RoomMismatch {
                requested: room_id,
                current: room.id(),
            });
        }

        let sent = room.send(command).await;
        if let Err(e) = sent {
            tracing::debug!("{}: {}", self.id, e);
            self.room = None;
            return Err(GatewayError::RoomClosed(room_id));
        }
        Ok(())
    }

    /// Stop receiving the current room's broadcasts. The room keeps running.
    pub async fn leave(&mut self) {
        if let Some(room) = self.room.take() {
            let connection = self.id;
            if room
                .send(RoomCommand::Unsubscribe { connection })
                .await
                .is_ok()
            {
                tracing::debug!("{} left room {}", connection, room.id());
            }
        }
    }

    /// Connection dropped: same as leaving. An in-progress match is not
    /// ended for the remaining player.
    pub async fn disconnect(mut self) {
        self.leave().await;
    }
}
