use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use match_host::{transport, DryRunLedger, MatchRules, Matchmaker, SettlementBridge};
use pong_core::{ServerMessage, Slot, Stake};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> (String, Matchmaker) {
    let rules = MatchRules {
        tick_rate_hz: 200,
        win_score: 1,
        announce_delay: Duration::from_millis(20),
        settlement_timeout: Duration::from_secs(5),
    };
    let bridge = SettlementBridge::new(Arc::new(DryRunLedger), rules.settlement_timeout);
    let matchmaker = Matchmaker::new(rules, bridge);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    tokio::spawn(transport::serve(listener, matchmaker.clone()));

    (url, matchmaker)
}

async fn connect(url: &str) -> Client {
    let (client, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    client
}

async fn send(client: &mut Client, frame: serde_json::Value) {
    client
        .send(Message::Text(frame.to_string().into()))
        .await
        .unwrap();
}

async fn recv(client: &mut Client) -> ServerMessage {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(10), client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn recv_until_ended(client: &mut Client) -> ServerMessage {
    loop {
        let frame = recv(client).await;
        if matches!(frame, ServerMessage::Ended { .. }) {
            return frame;
        }
    }
}

#[tokio::test]
async fn two_clients_play_a_match_over_websocket() {
    let (url, matchmaker) = start_server().await;
    let mut a = connect(&url).await;
    let mut b = connect(&url).await;

    // Garbage is logged and skipped; the connection stays usable
    a.send(Message::Text("not json".to_string().into())).await.unwrap();

    // The browser client sends the stake as a string
    send(&mut a, json!({"type": "join", "stake": "50", "walletAddress": "0xaaa"})).await;
    assert_eq!(recv(&mut a).await, ServerMessage::AssignedSlot { slot: Slot::One });

    send(&mut b, json!({"type": "join", "stake": 50, "walletAddress": "0xbbb"})).await;
    assert_eq!(recv(&mut b).await, ServerMessage::AssignedSlot { slot: Slot::Two });

    let room_id = match recv(&mut a).await {
        ServerMessage::Staking { room_id, stake } => {
            assert_eq!(stake, Stake(50));
            room_id
        }
        other => panic!("expected staking, got {:?}", other),
    };
    assert!(matches!(recv(&mut b).await, ServerMessage::Staking { .. }));
    assert_eq!(matchmaker.registry().len().await, 1);

    send(&mut a, json!({"type": "stakeConfirm", "roomId": room_id})).await;
    send(&mut b, json!({"type": "stakeConfirm", "roomId": room_id})).await;

    for client in [&mut a, &mut b] {
        assert_eq!(recv(client).await, ServerMessage::Starting);
        assert!(matches!(recv(client).await, ServerMessage::Started { .. }));
    }

    for _ in 0..30 {
        send(&mut a, json!({"type": "move", "roomId": room_id, "slot": 1, "direction": "down"})).await;
        send(&mut b, json!({"type": "move", "roomId": room_id, "slot": 2, "direction": "down"})).await;
    }

    match recv_until_ended(&mut a).await {
        ServerMessage::Ended {
            winner_address,
            settlement_ref,
            error,
            ..
        } => {
            assert!(winner_address == "0xaaa" || winner_address == "0xbbb");
            assert!(settlement_ref.unwrap().starts_with("dry-run-0x"));
            assert_eq!(error, None);
        }
        _ => unreachable!(),
    }
    assert!(matches!(
        recv_until_ended(&mut b).await,
        ServerMessage::Ended { .. }
    ));

    send(&mut a, json!({"type": "leave", "roomId": room_id})).await;
    let _ = a.close(None).await;
}
