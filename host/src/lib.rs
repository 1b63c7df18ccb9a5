//! Match host: pairs players by stake, runs one actor per room and reports
//! finished matches to the settlement ledger.

pub mod gateway;
pub mod matchmaker;
pub mod registry;
pub mod room_actor;
pub mod settlement;
pub mod transport;

use std::time::Duration;

use pong_core::constants::{ANNOUNCE_DELAY_MS, TICK_RATE_HZ, WIN_SCORE};
use pong_core::ServerMessage;
use tokio::sync::mpsc;

pub use gateway::{GatewayError, Session};
pub use matchmaker::{JoinRequest, Matchmaker, Seat};
pub use registry::{RoomRegistry, RoomSummary};
pub use room_actor::{RoomCommandError, RoomHandle};
pub use settlement::{DryRunLedger, HttpLedger, Ledger, LedgerError, SettlementBridge};

/// Queue of frames waiting to be written to one client.
pub type Outbound = mpsc::Sender<ServerMessage>;

/// Frames a client may fall behind before broadcasts to it start dropping.
pub const OUTBOUND_CAPACITY: usize = 256;

/// Timing and scoring knobs for every room this host runs.
#[derive(Debug, Clone)]
pub struct MatchRules {
    pub tick_rate_hz: u32,
    pub win_score: u32,
    /// Pause between both players staking and the first tick
    pub announce_delay: Duration,
    /// Upper bound on a single ledger submission
    pub settlement_timeout: Duration,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            tick_rate_hz: TICK_RATE_HZ,
            win_score: WIN_SCORE,
            announce_delay: Duration::from_millis(ANNOUNCE_DELAY_MS),
            settlement_timeout: Duration::from_secs(60),
        }
    }
}

impl MatchRules {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.tick_rate_hz.max(1)))
    }
}
