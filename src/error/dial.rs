use thiserror::Error;

use super::{address, socks};
use crate::dialer::Network;

#[derive(Error, Debug)]
pub enum DialError {
    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),
    #[error("Cannot dial {requested} through a {configured} dialer")]
    NetworkMismatch {
        requested: Network,
        configured: Network,
    },
    #[error("AddressError: {0}")]
    Address(#[from] address::AddrError),
    #[error("Unable to reach proxy {proxy}: {source}")]
    ProxyConnect {
        proxy: String,
        #[source]
        source: std::io::Error,
    },
    #[error("SocksError: {0}")]
    Socks(#[from] socks::SocksError),
}
