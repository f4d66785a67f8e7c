//! Scripted two-player session against a running server.
//!
//! Seats two players in a fresh room, starts the game and plays a few turns,
//! closing any auction with a single opening bid. Every packet is printed.

use clap::Parser;
use shared::{read_frame, write_frame, ClientPacket, ServerPacket};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Number of dice rolls to play
    #[arg(short = 'r', long, default_value = "6")]
    rolls: usize,
}

struct Seat {
    name: &'static str,
    stream: TcpStream,
}

impl Seat {
    async fn connect(server: &str, name: &'static str) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = TcpStream::connect(server).await?;
        println!("{} connected from {}", name, stream.local_addr()?);
        Ok(Self { name, stream })
    }

    async fn send(&mut self, packet: ClientPacket) -> Result<(), Box<dyn std::error::Error>> {
        write_frame(&mut self.stream, &packet).await?;
        Ok(())
    }

    /// Prints packets until one satisfies `done`, which is returned.
    async fn wait_for(
        &mut self,
        done: impl Fn(&ServerPacket) -> bool,
    ) -> Result<ServerPacket, Box<dyn std::error::Error>> {
        loop {
            let packet = timeout(Duration::from_secs(5), read_frame(&mut self.stream))
                .await??
                .ok_or("server closed the connection")?;
            print_packet(self.name, &packet);
            if done(&packet) {
                return Ok(packet);
            }
        }
    }
}

fn print_packet(who: &str, packet: &ServerPacket) {
    match packet {
        ServerPacket::GameState {
            log,
            current_player_index,
            ..
        } => println!("[{who}] state: {log} (turn: player {current_player_index})"),
        ServerPacket::ErrorMessage { message } => println!("[{who}] error: {message}"),
        other => println!("[{who}] {other:?}"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut alice = Seat::connect(&args.server, "Alice").await?;
    alice
        .send(ClientPacket::CreateRoom {
            player_name: "Alice".into(),
        })
        .await?;
    let room_id = match alice
        .wait_for(|p| matches!(p, ServerPacket::RoomJoined { .. }))
        .await?
    {
        ServerPacket::RoomJoined { room_id, .. } => room_id,
        _ => return Err("expected RoomJoined".into()),
    };
    println!("Room {} created", room_id);

    let mut bob = Seat::connect(&args.server, "Bob").await?;
    bob.send(ClientPacket::JoinRoom {
        room_id: room_id.clone(),
        player_name: "Bob".into(),
    })
    .await?;
    bob.wait_for(|p| matches!(p, ServerPacket::RoomJoined { .. }))
        .await?;

    alice
        .send(ClientPacket::StartGame {
            room_id: room_id.clone(),
        })
        .await?;
    let mut current = match alice
        .wait_for(|p| matches!(p, ServerPacket::GameState { .. }))
        .await?
    {
        ServerPacket::GameState {
            current_player_index,
            ..
        } => current_player_index,
        _ => 0,
    };

    for _ in 0..args.rolls {
        let roller = if current == 0 { &mut alice } else { &mut bob };
        roller
            .send(ClientPacket::RollDice {
                room_id: room_id.clone(),
            })
            .await?;

        // Alice sees every broadcast, so she follows the game for both seats
        let reply = alice
            .wait_for(|p| {
                matches!(
                    p,
                    ServerPacket::StartAuction { .. } | ServerPacket::GameState { .. }
                )
            })
            .await?;

        let state = match reply {
            ServerPacket::StartAuction { property, .. } => {
                let roller = if current == 0 { &mut alice } else { &mut bob };
                roller
                    .send(ClientPacket::PlaceBid {
                        room_id: room_id.clone(),
                        amount: (property.price / 2).max(1),
                    })
                    .await?;
                roller
                    .wait_for(|p| {
                        matches!(
                            p,
                            ServerPacket::UpdateAuction { .. } | ServerPacket::ErrorMessage { .. }
                        )
                    })
                    .await?;
                alice
                    .send(ClientPacket::EndAuction {
                        room_id: room_id.clone(),
                    })
                    .await?;
                alice
                    .wait_for(|p| matches!(p, ServerPacket::EndAuction))
                    .await?;
                alice
                    .wait_for(|p| matches!(p, ServerPacket::GameState { .. }))
                    .await?
            }
            state => state,
        };

        if let ServerPacket::GameState {
            current_player_index,
            ..
        } = state
        {
            current = current_player_index;
        }
    }

    alice.send(ClientPacket::Disconnect).await?;
    bob.send(ClientPacket::Disconnect).await?;
    println!("Session finished");
    Ok(())
}
