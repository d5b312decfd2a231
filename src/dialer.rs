use std::{fmt::Display, future::Future, net::SocketAddr, str::FromStr};

use log::debug;
use tokio::net::TcpStream;

use crate::{
    address::{DestinationAddress, ToSocketDestination},
    error::DialError,
    socks5::{Socks5, SocksConfig},
    AsyncSocket,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    #[default]
    Tcp,
    Tcp4,
    Tcp6,
}

impl Network {
    /// The family allowed by both `self` and `requested`, if any.
    /// `tcp` allows either family and defers to the other side.
    fn narrow(self, requested: Network) -> Option<Network> {
        match (self, requested) {
            (Network::Tcp, n) | (n, Network::Tcp) => Some(n),
            (a, b) if a == b => Some(a),
            _ => None,
        }
    }

    fn accepts(&self, addr: &SocketAddr) -> bool {
        match self {
            Network::Tcp => true,
            Network::Tcp4 => addr.is_ipv4(),
            Network::Tcp6 => addr.is_ipv6(),
        }
    }
}

impl FromStr for Network {
    type Err = DialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Network::Tcp),
            "tcp4" => Ok(Network::Tcp4),
            "tcp6" => Ok(Network::Tcp6),
            other => Err(DialError::UnsupportedNetwork(other.to_string())),
        }
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Tcp => write!(f, "tcp"),
            Network::Tcp4 => write!(f, "tcp4"),
            Network::Tcp6 => write!(f, "tcp6"),
        }
    }
}

/// Opens outbound connections on behalf of the relay.
///
/// Implementations are shared between every relay task, so `dial` takes
/// `&self` and must not need exclusive access.
pub trait Dialer: Send + Sync + 'static {
    type Conn: AsyncSocket;

    fn dial(
        &self,
        network: Network,
        address: &DestinationAddress,
    ) -> impl Future<Output = Result<Self::Conn, DialError>> + Send;
}

/// Dials destinations through a SOCKS5 proxy. Building one performs no I/O.
#[derive(Debug, Clone)]
pub struct Socks5Dialer {
    network: Network,
    proxy: DestinationAddress,
    config: SocksConfig,
}

impl Socks5Dialer {
    /// `network` selects the address family used to reach the proxy itself.
    pub fn new(
        network: &str,
        proxy: impl ToSocketDestination,
        config: SocksConfig,
    ) -> Result<Self, DialError> {
        Ok(Socks5Dialer {
            network: network.parse()?,
            proxy: proxy.to_destination_address()?,
            config,
        })
    }

    pub fn proxy(&self) -> &DestinationAddress {
        &self.proxy
    }

    async fn connect_proxy(&self, network: Network) -> Result<TcpStream, DialError> {
        let proxy_err = |source| DialError::ProxyConnect {
            proxy: self.proxy.to_string(),
            source,
        };
        let host = self.proxy.host();
        let candidates = tokio::net::lookup_host((host.as_str(), self.proxy.port()))
            .await
            .map_err(proxy_err)?
            .filter(|addr| network.accepts(addr));

        let mut last_err = None;
        for addr in candidates {
            match TcpStream::connect(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!("proxy candidate {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }
        Err(proxy_err(last_err.unwrap_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                format!("no {} address for proxy", network),
            )
        })))
    }
}

impl Dialer for Socks5Dialer {
    type Conn = TcpStream;

    fn dial(
        &self,
        network: Network,
        address: &DestinationAddress,
    ) -> impl Future<Output = Result<TcpStream, DialError>> + Send {
        async move {
            let network = self
                .network
                .narrow(network)
                .ok_or(DialError::NetworkMismatch {
                    requested: network,
                    configured: self.network,
                })?;
            let stream = self.connect_proxy(network).await?;
            if let Err(e) = stream.set_nodelay(true) {
                debug!("set_nodelay on proxy stream: {}", e);
            }
            let stream = Socks5::new_client(self.config.clone(), stream)
                .connect(address.clone())
                .await?
                .proxied_stream()
                .await?;
            Ok(stream)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_validates_without_io() {
        let dialer = Socks5Dialer::new("tcp", "localhost:8080", SocksConfig::default()).unwrap();
        assert_eq!(
            dialer.proxy(),
            &DestinationAddress::Domain("localhost".into(), 8080)
        );
        assert!(matches!(
            Socks5Dialer::new("udp", "localhost:8080", SocksConfig::default()),
            Err(DialError::UnsupportedNetwork(_))
        ));
        assert!(matches!(
            Socks5Dialer::new("tcp", "localhost", SocksConfig::default()),
            Err(DialError::Address(_))
        ));
    }

    #[test]
    fn network_names() {
        assert_eq!("tcp6".parse::<Network>().unwrap(), Network::Tcp6);
        assert_eq!(Network::Tcp4.to_string(), "tcp4");
        assert!(Network::Tcp4.accepts(&"127.0.0.1:1".parse().unwrap()));
        assert!(!Network::Tcp4.accepts(&"[::1]:1".parse().unwrap()));
        assert_eq!(Network::Tcp.narrow(Network::Tcp4), Some(Network::Tcp4));
        assert_eq!(Network::Tcp6.narrow(Network::Tcp), Some(Network::Tcp6));
        assert_eq!(Network::Tcp4.narrow(Network::Tcp6), None);
    }

    #[tokio::test]
    async fn unreachable_proxy_is_a_dial_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dialer = Socks5Dialer::new("tcp", addr, SocksConfig::default()).unwrap();
        let target = DestinationAddress::Domain("example.org".into(), 80);
        assert!(matches!(
            dialer.dial(Network::Tcp, &target).await,
            Err(DialError::ProxyConnect { .. })
        ));
    }

    #[tokio::test]
    async fn requested_family_filters_proxy_addresses() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let target = DestinationAddress::Domain("example.org".into(), 80);

        // tcp4 is dialed, not refused, on a tcp dialer.
        let dialer = Socks5Dialer::new("tcp", addr, SocksConfig::default()).unwrap();
        assert!(matches!(
            dialer.dial(Network::Tcp4, &target).await,
            Err(DialError::ProxyConnect { .. })
        ));

        // An IPv4-only proxy has nothing to offer a tcp6 request.
        match dialer.dial(Network::Tcp6, &target).await {
            Err(DialError::ProxyConnect { source, .. }) => {
                assert_eq!(source.kind(), std::io::ErrorKind::AddrNotAvailable)
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }

        let dialer = Socks5Dialer::new("tcp4", addr, SocksConfig::default()).unwrap();
        assert!(matches!(
            dialer.dial(Network::Tcp6, &target).await,
            Err(DialError::NetworkMismatch {
                requested: Network::Tcp6,
                configured: Network::Tcp4,
            })
        ));
    }
}
