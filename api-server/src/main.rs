mod config;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpResponse, HttpServer, Responder};
use clap::Parser;
use match_host::{
    transport, DryRunLedger, HttpLedger, Ledger, Matchmaker, RoomRegistry, SettlementBridge,
};
use tokio::net::TcpListener;

use crate::config::Config;

const SERVICE_NAME: &str = "staked-pong-server";

// API Handlers

/// GET /health
/// Health check endpoint with the number of live rooms
async fn health(registry: web::Data<RoomRegistry>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "liveRooms": registry.len().await,
    }))
}

/// GET /api/rooms
/// Live rooms in creation order
async fn rooms(registry: web::Data<RoomRegistry>) -> impl Responder {
    let summaries = registry.summaries().await;
    tracing::debug!("Listing {} live rooms", summaries.len());
    HttpResponse::Ok().json(summaries)
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/api/rooms", web::get().to(rooms));
}

/// Pick the ledger the settlement bridge reports to.
fn ledger(config: &Config) -> std::io::Result<Arc<dyn Ledger>> {
    match &config.settlement_url {
        Some(url) => {
            let ledger = HttpLedger::new(url).map_err(std::io::Error::other)?;
            tracing::info!("Settling results through {}", ledger.endpoint());
            Ok(Arc::new(ledger))
        }
        None => {
            tracing::warn!("No SETTLEMENT_URL configured: match results will not be submitted");
            Ok(Arc::new(DryRunLedger))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Config::parse();
    tracing::info!("Starting Staked Pong Server");

    let rules = config.rules();
    tracing::info!(
        "Rules: first to {}, {} Hz, {} ms announce delay, {} s settlement timeout",
        rules.win_score,
        rules.tick_rate_hz,
        rules.announce_delay.as_millis(),
        rules.settlement_timeout.as_secs()
    );

    let bridge = SettlementBridge::new(ledger(&config)?, rules.settlement_timeout);
    let matchmaker = Matchmaker::new(rules, bridge);
    let registry = web::Data::new(matchmaker.registry().clone());

    let listener = TcpListener::bind(&config.ws_addr).await?;
    tokio::spawn(async move {
        if let Err(e) = transport::serve(listener, matchmaker).await {
            tracing::error!("Game socket stopped: {}", e);
        }
    });

    tracing::info!("Binding to {}", config.http_addr);

    HttpServer::new(move || {
        // Configure CORS to allow all origins
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .expose_any_header()
            .max_age(86400);

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(registry.clone())
            .configure(routes)
    })
    .bind(&config.http_addr)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;
    use match_host::{JoinRequest, MatchRules, OUTBOUND_CAPACITY};
    use pong_core::Stake;
    use serde_json::Value;
    use std::time::Duration;

    fn matchmaker() -> Matchmaker {
        let bridge = SettlementBridge::new(Arc::new(DryRunLedger), Duration::from_secs(1));
        Matchmaker::new(MatchRules::default(), bridge)
    }

    #[actix_web::test]
    async fn health_reports_live_rooms() {
        let mm = matchmaker();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(mm.registry().clone()))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], SERVICE_NAME);
        assert_eq!(body["liveRooms"], 0);
    }

    #[actix_web::test]
    async fn rooms_lists_waiting_room() {
        let mm = matchmaker();
        let (outbound, _frames) = tokio::sync::mpsc::channel(OUTBOUND_CAPACITY);
        mm.join(JoinRequest {
            connection: mm.next_connection_id(),
            wallet_address: "0xaaa".to_string(),
            stake: Stake(50),
            outbound,
        })
        .await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(mm.registry().clone()))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/rooms").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let rooms = body.as_array().unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0]["roomId"], 1);
        assert_eq!(rooms[0]["stake"], 50);
        assert_eq!(rooms[0]["phase"], "waitingForOpponent");
        assert_eq!(rooms[0]["players"], 1);
        assert!(rooms[0]["createdAt"].is_string());

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["liveRooms"], 1);
    }
}
