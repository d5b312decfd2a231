#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use socks_tunnel::{DestinationAddress, Listener, ReplyStatus, Socks5, SocksConfig, TunnelConfig};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::mpsc,
};

pub const WAIT: Duration = Duration::from_secs(5);

/// SOCKS5 server that forwards every accepted CONNECT to `upstream`,
/// whatever destination was requested, and records the requests it saw.
pub struct FakeProxy {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<DestinationAddress>>>,
}

impl FakeProxy {
    pub fn requests(&self) -> Vec<DestinationAddress> {
        self.requests.lock().unwrap().clone()
    }
}

pub async fn spawn_proxy(
    config: SocksConfig,
    upstream: SocketAddr,
    reject: fn(usize) -> bool,
) -> FakeProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();
    tokio::spawn(async move {
        let mut count = 0usize;
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let index = count;
            count += 1;
            let config = config.clone();
            let seen = seen.clone();
            tokio::spawn(async move {
                let Ok(socks) = Socks5::new_server(config, stream).accept().await else {
                    return;
                };
                seen.lock().unwrap().push(socks.addr().clone());
                if reject(index) {
                    let _ = socks.reply_error(ReplyStatus::HostUnreachable).await;
                    return;
                }
                let Ok(target) = TcpStream::connect(upstream).await else {
                    let _ = socks.reply_error(ReplyStatus::ConnectionRefused).await;
                    return;
                };
                let _ = socks.serve(target).await;
            });
        }
    });
    FakeProxy { addr, requests }
}

pub fn accept_all(_: usize) -> bool {
    false
}

pub async fn echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            if let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let (mut r, mut w) = stream.split();
                    let _ = tokio::io::copy(&mut r, &mut w).await;
                });
            }
        }
    });
    addr
}

/// Upstream that reads until EOF and reports how many bytes it got.
pub async fn sink_server() -> (SocketAddr, mpsc::UnboundedReceiver<usize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        loop {
            if let Ok((mut stream, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let _ = stream.read_to_end(&mut buf).await;
                    let _ = tx.send(buf.len());
                });
            }
        }
    });
    (addr, rx)
}

/// Upstream that greets and hangs up.
pub async fn hangup_server(greeting: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            if let Ok((mut stream, _)) = listener.accept().await {
                let _ = stream.write_all(greeting).await;
            }
        }
    });
    addr
}

pub async fn spawn_tunnel(proxy: SocketAddr, remote: &str, socks: SocksConfig) -> SocketAddr {
    let mut config = TunnelConfig::new("127.0.0.1:0", &proxy.to_string(), remote).unwrap();
    config.socks = socks;
    let listener = Listener::bind(config).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(listener.run());
    addr
}

pub async fn exchange(stream: &mut TcpStream, payload: &[u8]) -> Vec<u8> {
    stream.write_all(payload).await.unwrap();
    let mut buf = vec![0u8; payload.len()];
    tokio::time::timeout(WAIT, stream.read_exact(&mut buf))
        .await
        .expect("timed out waiting for echo")
        .unwrap();
    buf
}
