use std::{io, net::SocketAddr, sync::Arc};

use log::{debug, info, warn};
use tokio::net::{TcpListener, TcpStream};

use crate::{
    address::DestinationAddress,
    config::TunnelConfig,
    dialer::{Dialer, Network, Socks5Dialer},
    error::TunnelError,
    relay::{relay, RelayOutcome},
};

/// Accepts local connections and tunnels each one to a fixed remote address.
pub struct Listener<D: Dialer = Socks5Dialer> {
    listener: TcpListener,
    dialer: Arc<D>,
    remote: DestinationAddress,
}

impl Listener<Socks5Dialer> {
    /// Builds the SOCKS5 dialer from `config` and binds the listen address.
    pub async fn bind(config: TunnelConfig) -> Result<Self, TunnelError> {
        let dialer = Socks5Dialer::new("tcp", config.proxy.clone(), config.socks.clone())
            .map_err(TunnelError::Proxy)?;
        Listener::with_dialer(config, dialer).await
    }
}

impl<D: Dialer> Listener<D> {
    pub async fn with_dialer(config: TunnelConfig, dialer: D) -> Result<Self, TunnelError> {
        let listener = TcpListener::bind(config.listen.as_str())
            .await
            .map_err(|source| TunnelError::Bind {
                addr: config.listen.clone(),
                source,
            })?;
        Ok(Listener {
            listener,
            dialer: Arc::new(dialer),
            remote: config.remote,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts forever. Returns only when `accept` itself fails, which callers
    /// should treat as fatal.
    pub async fn run(self) -> Result<(), TunnelError> {
        if let Ok(addr) = self.local_addr() {
            info!("Listening on {}", addr);
        }
        loop {
            let (stream, peer) = self.listener.accept().await.map_err(TunnelError::Accept)?;
            debug!("accepted {}", peer);
            let dialer = self.dialer.clone();
            let remote = self.remote.clone();
            tokio::spawn(async move {
                match handle(dialer.as_ref(), &remote, stream).await {
                    Ok(outcome) => match outcome.error() {
                        None => debug!(
                            "{} closed ({:?} first, sent {:?}, received {:?})",
                            peer,
                            outcome.finished,
                            outcome.client_to_upstream.as_ref().and_then(|r| r.as_ref().ok()),
                            outcome.upstream_to_client.as_ref().and_then(|r| r.as_ref().ok()),
                        ),
                        Some(e) => debug!("{} closed ({:?} first): {}", peer, outcome.finished, e),
                    },
                    Err(e) => warn!("{} -> {}: {}", peer, remote, e),
                }
            });
        }
    }
}

/// One tunnel: dial the remote through `dialer`, then relay until the pair is done.
/// Both streams are dropped on every return path.
pub async fn handle<D: Dialer>(
    dialer: &D,
    remote: &DestinationAddress,
    client: TcpStream,
) -> Result<RelayOutcome, TunnelError> {
    if let Err(e) = client.set_nodelay(true) {
        debug!("set_nodelay on client stream: {}", e);
    }
    let upstream = dialer.dial(Network::Tcp, remote).await?;
    Ok(relay(client, upstream).await)
}
