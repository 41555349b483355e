use clap::Parser;
use log::{error, info};
use server::network::{Server, ServerPhase};
use server::rules::GameRules;
use server::ServerResult;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "12345")]
    port: u16,

    /// Number of players to wait for before the match starts
    #[arg(short = 'n', long, default_value = "2")]
    players: usize,

    /// Tick period in milliseconds, overriding the rules file
    #[arg(short, long)]
    tick_ms: Option<u64>,

    /// JSON file overriding any of the default game rules
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Seed for reproducible map generation
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> ServerResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut rules = match &args.rules {
        Some(path) => GameRules::from_file(path)?,
        None => GameRules::default(),
    };
    if let Some(tick_ms) = args.tick_ms {
        rules.tick_ms = tick_ms;
    }

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::new(&address, args.players, rules).await?;
    if let Some(seed) = args.seed {
        server = server.with_seed(seed);
    }

    info!(
        "Players can connect to {}:{}",
        server.get_ip().await,
        server.local_addr().port()
    );

    let status = server.status();
    tokio::spawn(async move {
        let mut last = usize::MAX;
        while status.phase() == ServerPhase::Accepting {
            let connected = status.connected_count();
            if connected != last {
                info!(
                    "Waiting for players: {}/{}",
                    connected,
                    status.expected_count()
                );
                last = connected;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    });

    tokio::select! {
        result = server.run() => {
            if let Err(e) = &result {
                error!("Server stopped: {}", e);
            }
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
