//! Hiroba room relay server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-server
//! cargo run --bin hiroba-server -- --port 9090 --membership-updates delta
//! ```

use std::{sync::Arc, time::Duration};

use clap::{Parser, ValueEnum};
use hiroba_server::{
    config::{
        DEFAULT_ICE_SERVER, DEFAULT_PING_INTERVAL, DEFAULT_PORT, DEFAULT_TIMEOUT_MULTIPLIER,
        ServerConfig,
    },
    domain::{DEFAULT_ROOM_CAPACITY, IceServer, MembershipUpdates},
    ui::Server,
};
use hiroba_shared::{logger::setup_logger, time::SystemClock};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MembershipUpdatesArg {
    /// Every member receives the full room view after each change
    Snapshot,
    /// Members receive addRoomUser / deleteRoomUser
    Delta,
}

impl From<MembershipUpdatesArg> for MembershipUpdates {
    fn from(arg: MembershipUpdatesArg) -> Self {
        match arg {
            MembershipUpdatesArg::Snapshot => MembershipUpdates::Snapshot,
            MembershipUpdatesArg::Delta => MembershipUpdates::Delta,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "hiroba-server")]
#[command(about = "WebSocket room relay server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Seconds between liveness pings
    #[arg(long, default_value_t = DEFAULT_PING_INTERVAL.as_secs())]
    ping_interval_secs: u64,

    /// Missed ping intervals tolerated before a connection is dropped
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MULTIPLIER)]
    timeout_multiplier: u32,

    /// Capacity of rooms created without maxUsers
    #[arg(long, default_value_t = DEFAULT_ROOM_CAPACITY)]
    default_room_capacity: usize,

    /// How room members learn about joins and leaves
    #[arg(long, value_enum, default_value = "snapshot")]
    membership_updates: MembershipUpdatesArg,

    /// ICE server URL handed to clients (repeatable)
    #[arg(long = "ice-server", default_values_t = [DEFAULT_ICE_SERVER.to_string()])]
    ice_servers: Vec<String>,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            ping_interval: Duration::from_secs(args.ping_interval_secs),
            timeout_multiplier: args.timeout_multiplier,
            default_room_capacity: args.default_room_capacity,
            membership_updates: args.membership_updates.into(),
            ice_servers: args
                .ice_servers
                .into_iter()
                .map(|urls| IceServer { urls })
                .collect(),
        }
    }
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_PKG_NAME"), env!("CARGO_BIN_NAME"), "info");

    let config = ServerConfig::from(Args::parse());
    tracing::debug!("Starting with {:?}", config);

    let server = Server::new(config, Arc::new(SystemClock));
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
