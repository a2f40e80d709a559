use clap::Parser;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "skein-relay", about = "Signaling relay for the skein peer mesh")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:3000")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let (app, _signaling) = skein_relay::bootstrap();

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    info!("Relay listening on ws://{}/ws", args.bind);

    axum::serve(listener, app).await?;
    Ok(())
}
