use thiserror::Error;
pub(crate) mod address;
pub(crate) mod dial;
pub(crate) mod socks;

pub use address::AddrError;
pub use dial::DialError;
pub use socks::SocksError;

#[derive(Error, Debug)]
pub enum TunnelError {
    #[error("ConfigError: {0}")]
    Config(String),
    #[error("Unable to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid proxy configuration: {0}")]
    Proxy(#[source] dial::DialError),
    #[error("Accept failed: {0}")]
    Accept(#[source] std::io::Error),
    #[error("DialError: {0}")]
    Dial(#[from] dial::DialError),
}
