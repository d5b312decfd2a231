pub mod address;
pub mod config;
pub mod dialer;
mod error;
pub mod listener;
pub mod relay;
mod socks5;

use std::fmt::Display;

pub use address::{DestinationAddress, ToSocketDestination};
pub use config::TunnelConfig;
pub use dialer::{Dialer, Network, Socks5Dialer};
pub use error::{AddrError, DialError, SocksError, TunnelError};
pub use listener::Listener;
pub use relay::{relay, Direction, RelayOutcome};
pub use socks5::{
    AuthMethod, ClientInterruptedSocks5Stream, Command, Credentials,
    ServerInterruptedSocks5Stream, Socks5, Socks5Client, Socks5Server, SocksConfig,
};
use tokio::io::{AsyncRead, AsyncWrite};

pub trait AsyncSocket: AsyncRead + AsyncWrite + Unpin + Send + 'static {}
impl<T> AsyncSocket for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

/// Reply field of a SOCKS5 command response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Succeeded,
    GeneralSocksServerFailure,
    ConnectionNotAllowedByRuleset,
    NetworkUnreachable,
    HostUnreachable,
    ConnectionRefused,
    TtlExpired,
    CommandNotSupported,
    AddressTypeNotSupported,
    Other(u8),
}

impl Display for ReplyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplyStatus::Succeeded => write!(f, "Succeeded"),
            ReplyStatus::GeneralSocksServerFailure => write!(f, "General socks server failure"),
            ReplyStatus::ConnectionNotAllowedByRuleset => {
                write!(f, "Connection not allowed by ruleset")
            }
            ReplyStatus::NetworkUnreachable => write!(f, "Network unreachable"),
            ReplyStatus::HostUnreachable => write!(f, "Host unreachable"),
            ReplyStatus::ConnectionRefused => write!(f, "Connection refused"),
            ReplyStatus::TtlExpired => write!(f, "TTL expired"),
            ReplyStatus::CommandNotSupported => write!(f, "Command not supported"),
            ReplyStatus::AddressTypeNotSupported => write!(f, "Address type not supported"),
            ReplyStatus::Other(code) => write!(f, "Unknown reply {:#04x}", code),
        }
    }
}
