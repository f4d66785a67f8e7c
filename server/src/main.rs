use clap::Parser;
use log::info;
use server::config::{AuctionEndPolicy, GameRules, ServerConfig};
use server::network::Server;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Maximum simultaneous connections
    #[arg(short = 'm', long, default_value = "256")]
    max_clients: usize,

    /// Seconds before an auction closes on its own
    #[arg(long, default_value = "60")]
    auction_secs: u64,

    /// Minutes a room with nobody connected is kept for reconnects
    #[arg(long, default_value = "10")]
    grace_minutes: u64,

    /// Minutes between sweeps for abandoned rooms
    #[arg(long, default_value = "30")]
    cleanup_minutes: u64,

    /// Who may close an auction early
    #[arg(long, value_enum, default_value = "host-or-timeout")]
    auction_end_policy: AuctionEndPolicy,

    /// Seed for dice and room ids, for reproducible sessions
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            rules: GameRules::default(),
            auction_duration: Duration::from_secs(self.auction_secs),
            auction_end_policy: self.auction_end_policy,
            room_grace_period: Duration::from_secs(self.grace_minutes * 60),
            cleanup_interval: Duration::from_secs(self.cleanup_minutes.max(1) * 60),
            rng_seed: self.seed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);

    info!("Starting Monopoly server...");
    info!(
        "Auctions last {}s, abandoned rooms are kept {} min",
        args.auction_secs, args.grace_minutes
    );

    let server = Server::new(&address, args.server_config(), args.max_clients).await?;
    let control = server.control();

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            let _ = control.send(server::network::ServerMessage::Shutdown);
        }
    }

    Ok(())
}
