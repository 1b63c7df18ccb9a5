//! One task per room.
//!
//! The actor owns its [`Room`] outright. Player intents, the announce
//! countdown, the tick interval and the settlement result all arrive through
//! the same `select!`, so a move is applied either before a tick or after it,
//! never in the middle. A due tick always wins over queued intents.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pong_core::{
    ConnectionId, Direction, Phase, Room, RoomError, RoomId, Serve, ServerMessage,
    SettlementOutcome, Slot, Stake, StakeProgress,
};
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::registry::RoomRegistry;
use crate::settlement::SettlementBridge;
use crate::{MatchRules, Outbound};

const COMMAND_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum RoomCommandError {
    #[error("room {0} is no longer running")]
    Gone(RoomId),

    #[error("room {0} inbox is full")]
    Busy(RoomId),

    #[error(transparent)]
    Rejected(#[from] RoomError),
}

#[derive(Debug)]
pub(crate) enum RoomCommand {
    Seat {
        connection: ConnectionId,
        wallet_address: String,
        outbound: Outbound,
        reply: oneshot::Sender<Result<Slot, RoomError>>,
    },
    ConfirmStake {
        connection: ConnectionId,
    },
    Move {
        connection: ConnectionId,
        slot: Slot,
        direction: Direction,
    },
    Unsubscribe {
        connection: ConnectionId,
    },
    Settled(SettlementOutcome),
}

/// Phase and head count, published by the actor after every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RoomStatus {
    phase: Phase,
    players: usize,
}

impl RoomStatus {
    fn of(room: &Room) -> Self {
        Self {
            phase: room.phase(),
            players: room.slots().len(),
        }
    }
}

/// Cheap, cloneable address of a running room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    id: RoomId,
    stake: Stake,
    created_at: DateTime<Utc>,
    commands: mpsc::Sender<RoomCommand>,
    status: watch::Receiver<RoomStatus>,
}

impl RoomHandle {
    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn stake(&self) -> Stake {
        self.stake
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn phase(&self) -> Phase {
        self.status.borrow().phase
    }

    pub fn players(&self) -> usize {
        self.status.borrow().players
    }

    pub(crate) async fn send(&self, command: RoomCommand) -> Result<(), RoomCommandError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RoomCommandError::Gone(self.id))
    }

    /// Queue a command without waiting for room in the inbox.
    pub(crate) fn try_send(&self, command: RoomCommand) -> Result<(), RoomCommandError> {
        self.commands.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => RoomCommandError::Busy(self.id),
            TrySendError::Closed(_) => RoomCommandError::Gone(self.id),
        })
    }

    /// Seat a second player and wait for the actor to confirm. A room whose
    /// inbox is full refuses at once instead of holding up the caller.
    pub(crate) async fn seat(
        &self,
        connection: ConnectionId,
        wallet_address: String,
        outbound: Outbound,
    ) -> Result<Slot, RoomCommandError> {
        let (reply, answer) = oneshot::channel();
        self.try_send(RoomCommand::Seat {
            connection,
            wallet_address,
            outbound,
            reply,
        })?;
        let slot = answer.await.map_err(|_| RoomCommandError::Gone(self.id))??;
        Ok(slot)
    }
}

pub(crate) fn random_serve() -> Serve {
    if rand::random::<bool>() {
        Serve::Right
    } else {
        Serve::Left
    }
}

pub(crate) struct RoomActor {
    room: Room,
    rules: Arc<MatchRules>,
    bridge: Arc<SettlementBridge>,
    registry: RoomRegistry,
    inbox: mpsc::Receiver<RoomCommand>,
    /// Handed to the settlement task so its answer comes back through the inbox
    mailbox: mpsc::Sender<RoomCommand>,
    status: watch::Sender<RoomStatus>,
    subscribers: HashMap<ConnectionId, Outbound>,
    kickoff: Option<Instant>,
    ticker: Option<Interval>,
}

impl RoomActor {
    /// Start the actor for a freshly created room. The creator is subscribed
    /// and told its slot before the handle is returned.
    pub(crate) fn spawn(
        room: Room,
        creator_outbound: Outbound,
        created_at: DateTime<Utc>,
        rules: Arc<MatchRules>,
        bridge: Arc<SettlementBridge>,
        registry: RoomRegistry,
    ) -> RoomHandle {
        let (commands, inbox) = mpsc::channel(COMMAND_CAPACITY);
        let (status, status_rx) = watch::channel(RoomStatus::of(&room));

        let handle = RoomHandle {
            id: room.id(),
            stake: room.stake(),
            created_at,
            commands: commands.clone(),
            status: status_rx,
        };

        let mut subscribers = HashMap::new();
        if let Some(creator) = room.slot(Slot::One) {
            let _ = creator_outbound.try_send(ServerMessage::AssignedSlot { slot: Slot::One });
            subscribers.insert(creator.connection, creator_outbound);
        }

        let actor = RoomActor {
            room,
            rules,
            bridge,
            registry,
            inbox,
            mailbox: commands,
            status,
            subscribers,
            kickoff: None,
            ticker: None,
        };
        tokio::spawn(actor.run());

        handle
    }

    async fn run(mut self) {
        let room_id = self.room.id();
        tracing::info!("Room {} opened at stake {}", room_id, self.room.stake());

        loop {
            // Timers first: a flood of intents must not delay the tick.
            tokio::select! {
                biased;
                _ = next_tick(&mut self.ticker) => self.tick(),
                _ = wait_until(self.kickoff) => self.kick_off(),
                Some(command) = self.inbox.recv() => self.handle_command(command),
            }

            if self.room.phase() == Phase::Closed {
                break;
            }
        }

        self.registry.remove(room_id).await;
        tracing::info!("Room {} closed", room_id);
    }

    fn publish_status(&self) {
        self.status.send_replace(RoomStatus::of(&self.room));
    }

    fn broadcast(&mut self, message: ServerMessage) {
        let room_id = self.room.id();
        self.subscribers
            .retain(|connection, outbound| match outbound.try_send(message.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::debug!("Room {}: {} is lagging, frame dropped", room_id, connection);
                    true
                }
                Err(TrySendError::Closed(_)) => false,
            });
    }

    fn handle_command(&mut self, command: RoomCommand) {
        let room_id = self.room.id();
        match command {
            RoomCommand::Seat {
                connection,
                wallet_address,
                outbound,
                reply,
            } => match self.room.seat_opponent(connection, wallet_address) {
                Ok(slot) => {
                    let _ = outbound.try_send(ServerMessage::AssignedSlot { slot });
                    self.subscribers.insert(connection, outbound);
                    self.publish_status();
                    tracing::info!("Room {}: {} seated in slot {}", room_id, connection, slot);
                    self.broadcast(ServerMessage::Staking {
                        room_id,
                        stake: self.room.stake(),
                    });
                    let _ = reply.send(Ok(slot));
                }
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
            },

            RoomCommand::ConfirmStake { connection } => match self.room.confirm_stake(connection) {
                Ok(StakeProgress::AllStaked) => {
                    tracing::info!("Room {}: both players staked, starting", room_id);
                    self.publish_status();
                    self.broadcast(ServerMessage::Starting);
                    self.kickoff = Some(Instant::now() + self.rules.announce_delay);
                }
                Ok(StakeProgress::Waiting) => {
                    tracing::info!("Room {}: {} staked", room_id, connection);
                }
                Ok(StakeProgress::Unchanged) => {
                    tracing::debug!("Room {}: duplicate stake from {}", room_id, connection);
                }
                Err(e) => {
                    tracing::debug!("Room {}: stake from {} ignored: {}", room_id, connection, e);
                }
            },

            RoomCommand::Move {
                connection,
                slot,
                direction,
            } => {
                if let Err(e) = self.room.move_paddle(connection, slot, direction) {
                    tracing::debug!("Room {}: move from {} ignored: {}", room_id, connection, e);
                }
            }

            RoomCommand::Unsubscribe { connection } => {
                if self.subscribers.remove(&connection).is_some() {
                    tracing::debug!("Room {}: {} unsubscribed", room_id, connection);
                }
            }

            RoomCommand::Settled(outcome) => self.finish(outcome),
        }
    }

    fn kick_off(&mut self) {
        self.kickoff = None;
        if let Err(e) = self.room.start(random_serve()) {
            tracing::warn!("Room {}: cannot start: {}", self.room.id(), e);
            return;
        }
        self.publish_status();
        tracing::info!("Room {}: match started", self.room.id());
        self.broadcast(ServerMessage::Started {
            room_state: self.room.snapshot(),
        });

        let period = self.rules.tick_interval();
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.ticker = Some(ticker);
    }

    fn tick(&mut self) {
        let report = match self.room.tick() {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("Room {}: tick refused: {}", self.room.id(), e);
                self.ticker = None;
                return;
            }
        };

        if let Some(slot) = report.scored {
            tracing::debug!(
                "Room {}: slot {} scored ({})",
                self.room.id(),
                slot,
                self.score_line()
            );
        }

        self.broadcast(ServerMessage::Update {
            room_state: self.room.snapshot(),
        });

        if let Some(winner) = report.winner {
            self.ticker = None;
            self.publish_status();
            self.begin_settlement(winner);
        }
    }

    fn score_line(&self) -> String {
        self.room
            .slots()
            .iter()
            .map(|p| p.score.to_string())
            .collect::<Vec<_>>()
            .join("-")
    }

    fn begin_settlement(&mut self, winner: Slot) {
        let room_id = self.room.id();
        let Some(winner_address) = self.room.winner_address().map(str::to_owned) else {
            tracing::error!("Room {}: winning slot {} has no wallet", room_id, winner);
            return;
        };
        tracing::info!(
            "Game over for room {}. Winner: slot {} ({}), score {}",
            room_id,
            winner,
            winner_address,
            self.score_line()
        );

        let bridge = self.bridge.clone();
        let mailbox = self.mailbox.clone();
        tokio::spawn(async move {
            let outcome = bridge.settle(room_id, &winner_address).await;
            let _ = mailbox.send(RoomCommand::Settled(outcome)).await;
        });
    }

    fn finish(&mut self, outcome: SettlementOutcome) {
        let room_id = self.room.id();
        if let Err(e) = self.room.record_settlement(&outcome) {
            tracing::warn!("Room {}: unexpected settlement result: {}", room_id, e);
            return;
        }

        let winner_address = self.room.winner_address().unwrap_or_default().to_owned();
        let (settlement_ref, error) = match outcome {
            SettlementOutcome::Settled { tx_ref } => (Some(tx_ref), None),
            SettlementOutcome::Failed { reason } => (None, Some(reason)),
        };
        self.broadcast(ServerMessage::Ended {
            room_state: self.room.snapshot(),
            winner_address,
            settlement_ref,
            error,
        });

        if self.room.phase() == Phase::SettlementFailed {
            let _ = self.room.close();
        }
        self.publish_status();
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
