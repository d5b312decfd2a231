use std::error::Error;

use socks_tunnel::{DestinationAddress, ReplyStatus, Socks5, SocksConfig};
use tokio::net::TcpStream;

// Minimal no-auth SOCKS5 server for trying socks-tunnel locally:
//   cargo run --example socks_server
//   cargo run -- --via 1080 --dial example.org:80
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:1080").await?;
    loop {
        let stream = listener.accept().await?;
        let socks = Socks5::new_server(SocksConfig::default(), stream.0);
        tokio::spawn(async move {
            let socks_stream = match socks.accept().await {
                Ok(socks_stream) => socks_stream,
                Err(e) => {
                    eprintln!("{}", e);
                    return;
                }
            };
            let Ok(socket) = (match socks_stream.addr() {
                DestinationAddress::Domain(host, port) => {
                    TcpStream::connect((host.as_str(), *port)).await
                }
                DestinationAddress::Ip(addr) => TcpStream::connect(addr).await,
            }) else {
                if let Err(e) = socks_stream.reply_error(ReplyStatus::HostUnreachable).await {
                    eprintln!("{}", e);
                }
                return;
            };
            if let Err(e) = socks_stream.serve(socket).await {
                eprintln!("{}", e);
            };
        });
    }
}
