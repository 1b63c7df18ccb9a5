use match_host::settlement::encode_match_id;
use match_host::{HttpLedger, SettlementBridge};
use pong_core::{MatchId, RoomId, SettlementOutcome};
use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    println!("🏓 Staked Pong Match Host");
    println!("{}", "=".repeat(70));
    println!();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    let command = &args[1];

    match command.as_str() {
        "settle" => {
            if args.len() < 4 {
                eprintln!(
                    "Usage: {} settle <room_id> <winner_address> --url <ledger_url> [--timeout <secs>]",
                    args[0]
                );
                std::process::exit(1);
            }

            let room_id = parse_room_id(&args[2]);
            let winner = &args[3];

            let mut url = None;
            let mut timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
            let mut rest = args[4..].iter();
            while let Some(flag) = rest.next() {
                match flag.as_str() {
                    "--url" | "-u" => {
                        url = Some(rest.next().cloned().unwrap_or_else(|| {
                            eprintln!("❌ Error: --url requires a value");
                            std::process::exit(1);
                        }));
                    }
                    "--timeout" | "-t" => {
                        let secs = rest
                            .next()
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or_else(|| {
                                eprintln!("❌ Error: --timeout requires a whole number of seconds");
                                std::process::exit(1);
                            });
                        timeout = Duration::from_secs(secs);
                    }
                    other => {
                        eprintln!("❌ Unknown option: {}", other);
                        std::process::exit(1);
                    }
                }
            }

            let url = url.unwrap_or_else(|| {
                eprintln!("❌ Error: settle needs --url <ledger_url>");
                std::process::exit(1);
            });

            settle_command(room_id, winner, &url, timeout).await;
        }

        "match-id" => {
            if args.len() < 3 {
                eprintln!("Usage: {} match-id <room_id>", args[0]);
                eprintln!("Error: Missing required argument");
                std::process::exit(1);
            }

            match_id_command(parse_room_id(&args[2]));
        }

        "--help" | "-h" => {
            print_usage(&args[0]);
            std::process::exit(0);
        }

        _ => {
            eprintln!("❌ Unknown command: {}", command);
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <command> [options]", program);
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  settle <room_id> <winner_address> --url <ledger_url> [--timeout <secs>]");
    eprintln!("      Submit a match result to the settlement ledger by hand");
    eprintln!("      - room_id: Numeric id of the finished room");
    eprintln!("      - winner_address: Wallet address that receives the payout");
    eprintln!("      - --url: Base URL of the ledger backend (POST <url>/match/result)");
    eprintln!("      - --timeout: Seconds to wait for the ledger. Default: {}", DEFAULT_TIMEOUT_SECS);
    eprintln!();
    eprintln!("  match-id <room_id>");
    eprintln!("      Print the bytes32 match id submitted for a room");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  {} settle 7 0xabc... --url http://localhost:3000", program);
}

fn parse_room_id(raw: &str) -> RoomId {
    raw.parse::<u64>().map(RoomId).unwrap_or_else(|e| {
        eprintln!("❌ Invalid room id '{}': {}", raw, e);
        std::process::exit(1);
    })
}

async fn settle_command(room_id: RoomId, winner: &str, url: &str, timeout: Duration) {
    let ledger = HttpLedger::new(url).unwrap_or_else(|e| {
        eprintln!("❌ Error creating ledger client: {}", e);
        std::process::exit(1);
    });

    println!("📋 Settling room {}", room_id);
    println!("  Match ID: {}", encode_match_id(&MatchId::for_room(room_id)));
    println!("  Winner: {}", winner);
    println!("  Ledger: {}", ledger.endpoint());
    println!("  Timeout: {}s", timeout.as_secs());
    println!();

    println!("💸 Submitting result...");
    let start = Instant::now();
    let bridge = SettlementBridge::new(Arc::new(ledger), timeout);
    let outcome = bridge.settle(room_id, winner).await;
    println!("  Elapsed: {:.2}s", start.elapsed().as_secs_f64());
    println!();

    match outcome {
        SettlementOutcome::Settled { tx_ref } => {
            println!("✅ Result recorded!");
            println!("  Tx: {}", tx_ref);
            println!("{}", "=".repeat(70));
        }
        SettlementOutcome::Failed { reason } => {
            eprintln!("❌ Settlement failed: {}", reason);
            eprintln!();
            eprintln!("The ledger did not record this result. Submitting again is safe only");
            eprintln!("if the ledger rejects duplicate match ids.");
            eprintln!("{}", "=".repeat(70));
            std::process::exit(1);
        }
    }
}

fn match_id_command(room_id: RoomId) {
    println!("🔑 Room {}", room_id);
    println!("  Match ID: {}", encode_match_id(&MatchId::for_room(room_id)));
    println!("{}", "=".repeat(70));
}
