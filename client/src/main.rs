use clap::Parser;
use client::network::Client;
use client::ClientResult;
use log::info;
use tokio::io::BufReader;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:12345")]
    server: String,
}

#[tokio::main]
async fn main() -> ClientResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    info!("Starting client...");
    let mut client = Client::connect(&args.server).await?;

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    client.run(stdin, &mut stdout).await?;

    info!("Goodbye");
    Ok(())
}
