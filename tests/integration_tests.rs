//! Integration tests for the Monopoly server
//!
//! These tests run a real server on an ephemeral port and talk to it over TCP
//! with the same frame codec the clients use.

use server::config::ServerConfig;
use server::dice::ScriptedDice;
use server::network::Server;
use shared::{read_frame, write_frame, ClientPacket, ServerPacket};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_test::assert_ok;

struct TestClient {
    stream: TcpStream,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = assert_ok!(TcpStream::connect(addr).await);
        Self { stream }
    }

    async fn send(&mut self, packet: ClientPacket) {
        assert_ok!(write_frame(&mut self.stream, &packet).await);
    }

    async fn recv(&mut self) -> ServerPacket {
        let frame = timeout(Duration::from_secs(3), read_frame(&mut self.stream))
            .await
            .expect("timed out waiting for a packet");
        assert_ok!(frame).expect("server closed the connection")
    }

    /// Skips packets until one matches.
    async fn recv_until(&mut self, matches: impl Fn(&ServerPacket) -> bool) -> ServerPacket {
        loop {
            let packet = self.recv().await;
            if matches(&packet) {
                return packet;
            }
        }
    }
}

async fn start_server(config: ServerConfig, rolls: &[(u8, u8)]) -> SocketAddr {
    let dice = Box::new(ScriptedDice::with_rolls(rolls));
    let server = assert_ok!(Server::with_dice("127.0.0.1:0", config, dice, 64).await);
    let addr = server.local_addr();
    tokio::spawn(server.run());
    addr
}

/// Alice creates a room and Bob joins it. Returns both clients and the room id.
async fn seat_two_players(addr: SocketAddr) -> (TestClient, TestClient, String) {
    let mut alice = TestClient::connect(addr).await;
    alice
        .send(ClientPacket::CreateRoom {
            player_name: "Alice".into(),
        })
        .await;
    let room_id = match alice.recv().await {
        ServerPacket::RoomJoined {
            room_id, is_host, ..
        } => {
            assert!(is_host);
            room_id
        }
        other => panic!("expected RoomJoined, got {other:?}"),
    };

    let mut bob = TestClient::connect(addr).await;
    bob.send(ClientPacket::JoinRoom {
        room_id: room_id.to_lowercase(),
        player_name: "Bob".into(),
    })
    .await;
    bob.recv_until(|p| matches!(p, ServerPacket::RoomJoined { is_host: false, .. }))
        .await;
    alice
        .recv_until(|p| matches!(p, ServerPacket::PlayerJoined { players } if players.len() == 2))
        .await;

    (alice, bob, room_id)
}

async fn start_game(alice: &mut TestClient, bob: &mut TestClient, room_id: &str) {
    alice
        .send(ClientPacket::StartGame {
            room_id: room_id.to_string(),
        })
        .await;
    for client in [alice, bob] {
        client
            .recv_until(|p| matches!(p, ServerPacket::GameState { log, .. } if log.starts_with("Game started")))
            .await;
    }
}

#[tokio::test]
async fn auction_won_by_bob() {
    // Alice rolls 1 + 2 onto Baltic Avenue, price 60
    let addr = start_server(ServerConfig::default(), &[(1, 2)]).await;
    let (mut alice, mut bob, room_id) = seat_two_players(addr).await;
    start_game(&mut alice, &mut bob, &room_id).await;

    alice
        .send(ClientPacket::RollDice {
            room_id: room_id.clone(),
        })
        .await;
    match bob
        .recv_until(|p| matches!(p, ServerPacket::StartAuction { .. }))
        .await
    {
        ServerPacket::StartAuction { property, .. } => {
            assert_eq!(property.id, 3);
            assert_eq!(property.price, 60);
        }
        _ => unreachable!(),
    }

    bob.send(ClientPacket::PlaceBid {
        room_id: room_id.clone(),
        amount: 70,
    })
    .await;
    match alice
        .recv_until(|p| matches!(p, ServerPacket::UpdateAuction { .. }))
        .await
    {
        ServerPacket::UpdateAuction {
            auction,
            highest_bidder_name,
        } => {
            assert_eq!(auction.highest_bid, 70);
            assert_eq!(highest_bidder_name, "Bob");
        }
        _ => unreachable!(),
    }

    alice
        .send(ClientPacket::EndAuction {
            room_id: room_id.clone(),
        })
        .await;
    bob.recv_until(|p| matches!(p, ServerPacket::EndAuction))
        .await;
    match bob
        .recv_until(|p| matches!(p, ServerPacket::GameState { .. }))
        .await
    {
        ServerPacket::GameState {
            board,
            players,
            current_player_index,
            auction,
            ..
        } => {
            assert_eq!(board[3].owner, Some(1));
            assert_eq!(players[1].cash, 1430);
            assert_eq!(players[1].properties, vec![3]);
            assert_eq!(current_player_index, 1);
            assert!(auction.is_none());
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn auction_closes_on_timer() {
    let config = ServerConfig {
        auction_duration: Duration::from_millis(200),
        ..ServerConfig::default()
    };
    let addr = start_server(config, &[(1, 2)]).await;
    let (mut alice, mut bob, room_id) = seat_two_players(addr).await;
    start_game(&mut alice, &mut bob, &room_id).await;

    alice.send(ClientPacket::RollDice { room_id }).await;
    alice
        .recv_until(|p| matches!(p, ServerPacket::StartAuction { .. }))
        .await;
    alice
        .recv_until(|p| matches!(p, ServerPacket::EndAuction))
        .await;
    match alice
        .recv_until(|p| matches!(p, ServerPacket::GameState { .. }))
        .await
    {
        ServerPacket::GameState {
            board,
            current_player_index,
            log,
            ..
        } => {
            assert_eq!(board[3].owner, None);
            assert_eq!(current_player_index, 1);
            assert_eq!(log, "No bids for Baltic Avenue");
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn rejected_intent_reaches_only_the_sender() {
    let addr = start_server(ServerConfig::default(), &[]).await;
    let (mut alice, mut bob, room_id) = seat_two_players(addr).await;
    start_game(&mut alice, &mut bob, &room_id).await;

    bob.send(ClientPacket::RollDice {
        room_id: room_id.clone(),
    })
    .await;
    match bob.recv().await {
        ServerPacket::ErrorMessage { message } => {
            assert_eq!(message, "Not allowed: it is not your turn")
        }
        other => panic!("expected ErrorMessage, got {other:?}"),
    }

    bob.send(ClientPacket::ChatMessage {
        room_id,
        message: "sorry".into(),
    })
    .await;
    // Alice sees the chat next, never Bob's error
    assert_eq!(
        alice.recv().await,
        ServerPacket::ChatMessage {
            message: "sorry".into(),
            sender: "Bob".into()
        }
    );
}

#[tokio::test]
async fn reconnect_restores_seat() {
    let addr = start_server(ServerConfig::default(), &[]).await;
    let (mut alice, mut bob, room_id) = seat_two_players(addr).await;
    start_game(&mut alice, &mut bob, &room_id).await;

    drop(bob);
    alice
        .recv_until(|p| {
            matches!(p, ServerPacket::PlayerJoined { players } if !players[1].connected)
        })
        .await;

    let mut bob = TestClient::connect(addr).await;
    bob.send(ClientPacket::ReconnectRoom {
        room_id: room_id.clone(),
        player_name: "Bob".into(),
    })
    .await;
    match bob.recv().await {
        ServerPacket::RoomJoined {
            players, is_host, ..
        } => {
            assert!(!is_host);
            assert!(players[1].connected);
        }
        other => panic!("expected RoomJoined, got {other:?}"),
    }
    bob.recv_until(|p| matches!(p, ServerPacket::GameState { .. }))
        .await;

    bob.send(ClientPacket::RoomInfo { room_id }).await;
    assert_eq!(
        bob.recv_until(|p| matches!(p, ServerPacket::RoomInfo { .. }))
            .await,
        ServerPacket::RoomInfo {
            player_count: 2,
            max_players: 8,
            started: true
        }
    );
}

#[tokio::test]
async fn late_joiner_is_turned_away() {
    let addr = start_server(ServerConfig::default(), &[]).await;
    let (mut alice, mut bob, room_id) = seat_two_players(addr).await;
    start_game(&mut alice, &mut bob, &room_id).await;

    let mut carol = TestClient::connect(addr).await;
    carol
        .send(ClientPacket::JoinRoom {
            room_id,
            player_name: "Carol".into(),
        })
        .await;
    assert_eq!(
        carol.recv().await,
        ServerPacket::ErrorMessage {
            message: "Game has already started. Cannot join.".into()
        }
    );
}
