use std::time::Duration;

use clap::Parser;
use match_host::MatchRules;
use pong_core::constants::{ANNOUNCE_DELAY_MS, TICK_RATE_HZ, WIN_SCORE};

/// Staked pong server: HTTP status API plus the WebSocket game channel.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Config {
    /// Address for the HTTP API (health, lobby)
    #[arg(long, env = "HTTP_ADDR", default_value = "0.0.0.0:8080")]
    pub http_addr: String,

    /// Address for the WebSocket game channel
    #[arg(long, env = "WS_ADDR", default_value = "0.0.0.0:8000")]
    pub ws_addr: String,

    /// Base URL of the ledger backend. Without it results are not submitted.
    #[arg(long, env = "SETTLEMENT_URL")]
    pub settlement_url: Option<String>,

    #[arg(long, env = "SETTLEMENT_TIMEOUT_SECS", default_value_t = 60)]
    pub settlement_timeout_secs: u64,

    #[arg(long, env = "WIN_SCORE", default_value_t = WIN_SCORE,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub win_score: u32,

    /// Pause between both stakes landing and the first tick
    #[arg(long, env = "ANNOUNCE_DELAY_MS", default_value_t = ANNOUNCE_DELAY_MS)]
    pub announce_delay_ms: u64,

    #[arg(long, env = "TICK_RATE_HZ", default_value_t = TICK_RATE_HZ,
          value_parser = clap::value_parser!(u32).range(1..=1_000))]
    pub tick_rate_hz: u32,
}

impl Config {
    pub fn rules(&self) -> MatchRules {
        MatchRules {
            tick_rate_hz: self.tick_rate_hz,
            win_score: self.win_score,
            announce_delay: Duration::from_millis(self.announce_delay_ms),
            settlement_timeout: Duration::from_secs(self.settlement_timeout_secs),
        }
    }
}
