use std::error::Error;

use clap::Parser;
use socks_tunnel::{
    config::{DEFAULT_DIAL, DEFAULT_LISTEN, DEFAULT_VIA},
    Listener, TunnelConfig,
};

/// Listens on --listen and forwards every connection to --dial through the
/// SOCKS5 proxy running on port --via. Bytes are copied untouched, so TLS
/// and any other protocol is negotiated end to end.
#[derive(Parser, Debug)]
#[command(name = "socks-tunnel", version)]
struct Args {
    /// Local address to accept connections on
    #[arg(long, default_value = DEFAULT_LISTEN)]
    listen: String,

    /// SOCKS5 proxy port on localhost (or a full host:port)
    #[arg(long, default_value = DEFAULT_VIA)]
    via: String,

    /// Address to dial through the proxy
    #[arg(long, default_value = DEFAULT_DIAL)]
    dial: String,

    /// Username for proxies that require RFC 1929 authentication
    #[arg(long, requires = "password")]
    username: Option<String>,

    #[arg(long, requires = "username")]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = TunnelConfig::new(args.listen, &args.via, &args.dial)?
        .with_credentials(args.username, args.password)?;
    let listener = Listener::bind(config).await?;
    listener.run().await?;
    Ok(())
}
