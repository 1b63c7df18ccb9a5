//! Room aggregate and its lifecycle.
//!
//! ```text
//! WaitingForOpponent -> Staking -> Starting -> InProgress -> Settling -> Closed
//!                                                               \-> SettlementFailed -> Closed
//! ```
//!
//! A `Room` is plain data plus transition methods; it does no I/O and keeps
//! no clock. The host wraps one in an actor that drives the timers.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::*;
use crate::physics::{self, Ball, Court, Serve};
use crate::protocol::{BallState, PlayerState, RoomState};
use crate::types::{ConnectionId, Direction, RoomId, Slot, Stake};

/// Lifecycle phase of a room
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    WaitingForOpponent,
    Staking,
    Starting,
    InProgress,
    Settling,
    SettlementFailed,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("room is {actual:?}, expected {expected:?}")]
    WrongPhase { expected: Phase, actual: Phase },

    #[error("room already has two players")]
    RoomFull,

    #[error("connection is already seated in this room")]
    AlreadySeated,

    #[error("connection holds no slot in this room")]
    UnknownConnection,

    #[error("slot is owned by another connection")]
    SlotNotOwned,
}

/// One player's seat
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerSlot {
    pub slot: Slot,
    pub connection: ConnectionId,
    pub x: i32,
    pub y: i32,
    pub score: u32,
    pub staked: bool,
    pub wallet_address: String,
}

impl PlayerSlot {
    fn new(slot: Slot, connection: ConnectionId, wallet_address: String) -> Self {
        let x = match slot {
            Slot::One => LEFT_PADDLE_X,
            Slot::Two => RIGHT_PADDLE_X,
        };
        Self {
            slot,
            connection,
            x,
            y: PADDLE_START_Y,
            score: 0,
            staked: false,
            wallet_address,
        }
    }
}

/// What a stake confirmation did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StakeProgress {
    /// This slot is now staked, the opponent has not staked yet
    Waiting,
    /// Both slots staked; the room moved to `Starting`
    AllStaked,
    /// Slot was already staked, nothing changed
    Unchanged,
}

/// Outcome of one simulation tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickReport {
    pub scored: Option<Slot>,
    /// Set when this tick ended the match; the room is now `Settling`
    pub winner: Option<Slot>,
}

/// Result reported back by the settlement collaborator
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettlementOutcome {
    Settled { tx_ref: String },
    Failed { reason: String },
}

#[derive(Clone, Debug)]
pub struct Room {
    id: RoomId,
    stake: Stake,
    phase: Phase,
    slots: Vec<PlayerSlot>,
    ball: Ball,
    winner: Option<Slot>,
    win_score: u32,
}

impl Room {
    /// Open a room with its first player in slot 1.
    pub fn new(
        id: RoomId,
        stake: Stake,
        creator: ConnectionId,
        wallet_address: String,
        serve: Serve,
        win_score: u32,
    ) -> Self {
        Self {
            id,
            stake,
            phase: Phase::WaitingForOpponent,
            slots: vec![PlayerSlot::new(Slot::One, creator, wallet_address)],
            ball: Ball::serve(serve),
            winner: None,
            win_score,
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn stake(&self) -> Stake {
        self.stake
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn slots(&self) -> &[PlayerSlot] {
        &self.slots
    }

    pub fn ball(&self) -> Ball {
        self.ball
    }

    pub fn winner(&self) -> Option<Slot> {
        self.winner
    }

    pub fn winner_address(&self) -> Option<&str> {
        let winner = self.winner?;
        self.slot(winner).map(|p| p.wallet_address.as_str())
    }

    pub fn slot(&self, slot: Slot) -> Option<&PlayerSlot> {
        self.slots.iter().find(|p| p.slot == slot)
    }

    pub fn slot_of(&self, connection: ConnectionId) -> Option<Slot> {
        self.slots
            .iter()
            .find(|p| p.connection == connection)
            .map(|p| p.slot)
    }

    fn expect_phase(&self, expected: Phase) -> Result<(), RoomError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(RoomError::WrongPhase {
                expected,
                actual: self.phase,
            })
        }
    }

    /// Seat the second player. Only the matchmaker calls this.
    pub fn seat_opponent(
        &mut self,
        connection: ConnectionId,
        wallet_address: String,
    ) -> Result<Slot, RoomError> {
        if self.slots.len() >= 2 {
            return Err(RoomError::RoomFull);
        }
        self.expect_phase(Phase::WaitingForOpponent)?;
        if self.slot_of(connection).is_some() {
            return Err(RoomError::AlreadySeated);
        }

        self.slots
            .push(PlayerSlot::new(Slot::Two, connection, wallet_address));
        self.phase = Phase::Staking;
        Ok(Slot::Two)
    }

    /// Mark the connection's slot as staked. Re-confirming is a no-op.
    pub fn confirm_stake(&mut self, connection: ConnectionId) -> Result<StakeProgress, RoomError> {
        self.expect_phase(Phase::Staking)?;
        let player = self
            .slots
            .iter_mut()
            .find(|p| p.connection == connection)
            .ok_or(RoomError::UnknownConnection)?;

        if player.staked {
            return Ok(StakeProgress::Unchanged);
        }
        player.staked = true;

        if self.slots.len() == 2 && self.slots.iter().all(|p| p.staked) {
            self.phase = Phase::Starting;
            Ok(StakeProgress::AllStaked)
        } else {
            Ok(StakeProgress::Waiting)
        }
    }

    /// End the announce delay and put the ball in play.
    pub fn start(&mut self, serve: Serve) -> Result<(), RoomError> {
        self.expect_phase(Phase::Starting)?;
        self.ball = Ball::serve(serve);
        self.phase = Phase::InProgress;
        Ok(())
    }

    /// Move a paddle by one step, clamped to the table. Returns the new y.
    pub fn move_paddle(
        &mut self,
        connection: ConnectionId,
        slot: Slot,
        direction: Direction,
    ) -> Result<i32, RoomError> {
        self.expect_phase(Phase::InProgress)?;
        let player = self
            .slots
            .iter_mut()
            .find(|p| p.slot == slot)
            .ok_or(RoomError::UnknownConnection)?;
        if player.connection != connection {
            return Err(RoomError::SlotNotOwned);
        }

        let delta = match direction {
            Direction::Up => -MOVE_STEP,
            Direction::Down => MOVE_STEP,
        };
        player.y = (player.y + delta).clamp(0, PADDLE_MAX_Y);
        Ok(player.y)
    }

    /// Run one simulation tick. Reaching the win score moves the room to
    /// `Settling`, after which further ticks are refused.
    pub fn tick(&mut self) -> Result<TickReport, RoomError> {
        self.expect_phase(Phase::InProgress)?;
        let [left, right] = self.slots.as_mut_slice() else {
            return Err(RoomError::WrongPhase {
                expected: Phase::InProgress,
                actual: self.phase,
            });
        };

        let step = physics::advance(
            Court {
                ball: self.ball,
                paddles: [left.y, right.y],
                scores: [left.score, right.score],
            },
            self.win_score,
        );

        self.ball = step.court.ball;
        left.score = step.court.scores[0];
        right.score = step.court.scores[1];

        if let Some(winner) = step.winner {
            self.winner = Some(winner);
            self.phase = Phase::Settling;
        }

        Ok(TickReport {
            scored: step.scored,
            winner: step.winner,
        })
    }

    /// Record the ledger's answer. Success closes the room; failure parks it
    /// in `SettlementFailed` until [`Room::close`].
    pub fn record_settlement(&mut self, outcome: &SettlementOutcome) -> Result<(), RoomError> {
        self.expect_phase(Phase::Settling)?;
        self.phase = match outcome {
            SettlementOutcome::Settled { .. } => Phase::Closed,
            SettlementOutcome::Failed { .. } => Phase::SettlementFailed,
        };
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), RoomError> {
        match self.phase {
            Phase::SettlementFailed | Phase::Closed => {
                self.phase = Phase::Closed;
                Ok(())
            }
            actual => Err(RoomError::WrongPhase {
                expected: Phase::SettlementFailed,
                actual,
            }),
        }
    }

    pub fn snapshot(&self) -> RoomState {
        RoomState {
            room_id: self.id,
            players: self
                .slots
                .iter()
                .map(|p| PlayerState {
                    slot: p.slot,
                    x: p.x,
                    y: p.y,
                    score: p.score,
                    wallet_address: p.wallet_address.clone(),
                })
                .collect(),
            ball: BallState {
                x: self.ball.x,
                y: self.ball.y,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    const A: ConnectionId = ConnectionId(1);
    const B: ConnectionId = ConnectionId(2);

    fn paired_room() -> Room {
        let mut room = Room::new(
            RoomId(1),
            Stake(50),
            A,
            "0xaaa".to_string(),
            Serve::Right,
            WIN_SCORE,
        );
        room.seat_opponent(B, "0xbbb".to_string()).unwrap();
        room
    }

    fn playing_room() -> Room {
        let mut room = paired_room();
        room.confirm_stake(A).unwrap();
        room.confirm_stake(B).unwrap();
        room.start(Serve::Right).unwrap();
        room
    }

    #[test]
    fn new_room_waits_with_centered_ball() {
        let room = Room::new(RoomId(7), Stake(5), A, "0xaaa".to_string(), Serve::Left, 10);
        assert_eq!(room.phase(), Phase::WaitingForOpponent);
        assert_eq!(room.slots().len(), 1);
        assert_eq!(room.slots()[0].slot, Slot::One);
        assert_eq!(room.ball(), Ball::serve(Serve::Left));
    }

    #[test]
    fn seating_moves_to_staking_and_caps_at_two() {
        let mut room = paired_room();
        assert_eq!(room.phase(), Phase::Staking);
        assert_eq!(room.slot_of(B), Some(Slot::Two));
        assert_eq!(room.slot(Slot::Two).map(|p| p.x), Some(RIGHT_PADDLE_X));
        assert_eq!(
            room.seat_opponent(ConnectionId(3), "0xccc".to_string()),
            Err(RoomError::RoomFull)
        );
    }

    #[test]
    fn creator_cannot_pair_with_itself() {
        let mut room = Room::new(RoomId(1), Stake(50), A, "0xaaa".to_string(), Serve::Right, 10);
        assert_eq!(
            room.seat_opponent(A, "0xaaa".to_string()),
            Err(RoomError::AlreadySeated)
        );
        assert_eq!(room.phase(), Phase::WaitingForOpponent);
    }

    #[test]
    fn stake_confirmation_is_idempotent() {
        let mut room = paired_room();
        assert_eq!(room.confirm_stake(A), Ok(StakeProgress::Waiting));
        assert_eq!(room.confirm_stake(A), Ok(StakeProgress::Unchanged));
        assert_eq!(room.phase(), Phase::Staking);

        assert_eq!(room.confirm_stake(B), Ok(StakeProgress::AllStaked));
        assert_eq!(room.phase(), Phase::Starting);

        // A late duplicate no longer applies and does not transition again.
        assert!(room.confirm_stake(B).is_err());
        assert_eq!(room.phase(), Phase::Starting);
        assert!(room.slots().iter().all(|p| p.staked));
    }

    #[test]
    fn stake_from_stranger_is_rejected() {
        let mut room = paired_room();
        assert_eq!(
            room.confirm_stake(ConnectionId(9)),
            Err(RoomError::UnknownConnection)
        );
    }

    #[test]
    fn no_simulation_before_both_staked() {
        let mut room = paired_room();
        room.confirm_stake(A).unwrap();
        assert!(room.tick().is_err());
        assert!(room.start(Serve::Left).is_err());
        assert!(room.move_paddle(A, Slot::One, Direction::Up).is_err());
    }

    #[test]
    fn repeated_up_moves_clamp_at_zero() {
        let mut room = playing_room();
        for _ in 0..50 {
            room.move_paddle(A, Slot::One, Direction::Up).unwrap();
        }
        assert_eq!(room.slot(Slot::One).map(|p| p.y), Some(0));
    }

    #[test]
    fn repeated_down_moves_clamp_at_floor() {
        let mut room = playing_room();
        for _ in 0..50 {
            room.move_paddle(B, Slot::Two, Direction::Down).unwrap();
        }
        assert_eq!(room.slot(Slot::Two).map(|p| p.y), Some(PADDLE_MAX_Y));
    }

    #[test]
    fn moving_someone_elses_paddle_is_rejected() {
        let mut room = playing_room();
        assert_eq!(
            room.move_paddle(A, Slot::Two, Direction::Up),
            Err(RoomError::SlotNotOwned)
        );
        assert_eq!(room.slot(Slot::Two).map(|p| p.y), Some(PADDLE_START_Y));
    }

    #[test]
    fn match_settles_exactly_at_win_score() {
        let mut room = playing_room();
        // Both paddles out of the ball's path so every rally is a point.
        for _ in 0..30 {
            room.move_paddle(A, Slot::One, Direction::Down).unwrap();
            room.move_paddle(B, Slot::Two, Direction::Down).unwrap();
        }

        let mut last = [0u32; 2];
        let mut points = 0;
        let winner = loop {
            let report = room.tick().unwrap();
            let scores = [room.slots()[0].score, room.slots()[1].score];
            if let Some(slot) = report.scored {
                points += 1;
                assert_eq!(scores[slot.index()], last[slot.index()] + 1);
                assert_eq!(scores[slot.opponent().index()], last[slot.opponent().index()]);
            } else {
                assert_eq!(scores, last);
            }
            last = scores;

            if let Some(w) = report.winner {
                break w;
            }
            assert_eq!(room.phase(), Phase::InProgress);
            assert!(scores.iter().all(|s| *s < WIN_SCORE));
        };

        assert_eq!(room.phase(), Phase::Settling);
        assert_eq!(room.slot(winner).map(|p| p.score), Some(WIN_SCORE));
        assert_eq!(room.winner(), Some(winner));
        assert!(points >= WIN_SCORE);
        assert!(room.tick().is_err());
    }

    #[test]
    fn winner_address_follows_winning_slot() {
        let mut room = playing_room();
        room.winner = Some(Slot::One);
        assert_eq!(room.winner_address(), Some("0xaaa"));
        room.winner = Some(Slot::Two);
        assert_eq!(room.winner_address(), Some("0xbbb"));
    }

    #[test]
    fn failed_settlement_still_closes() {
        let mut room = playing_room();
        room.phase = Phase::Settling;
        room.record_settlement(&SettlementOutcome::Failed {
            reason: "reverted".to_string(),
        })
        .unwrap();
        assert_eq!(room.phase(), Phase::SettlementFailed);
        room.close().unwrap();
        assert_eq!(room.phase(), Phase::Closed);
    }

    #[test]
    fn successful_settlement_closes_directly() {
        let mut room = playing_room();
        room.phase = Phase::Settling;
        room.record_settlement(&SettlementOutcome::Settled {
            tx_ref: "0x01".to_string(),
        })
        .unwrap();
        assert_eq!(room.phase(), Phase::Closed);
        assert!(room
            .record_settlement(&SettlementOutcome::Settled {
                tx_ref: "0x02".to_string()
            })
            .is_err());
    }

    #[test]
    fn snapshot_carries_slots_and_ball() {
        let room = playing_room();
        let state = room.snapshot();
        assert_eq!(state.room_id, RoomId(1));
        assert_eq!(state.players.len(), 2);
        assert_eq!(state.players[1].wallet_address, "0xbbb");
        assert_eq!((state.ball.x, state.ball.y), (BALL_CENTER_X, BALL_CENTER_Y));
    }
}
