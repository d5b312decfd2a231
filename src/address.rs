use std::{
    fmt::Display,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6},
    str::FromStr,
};

use crate::error::AddrError;

/// Longest domain name that fits in a SOCKS5 address field.
pub const MAX_DOMAIN_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationAddress {
    Domain(String, u16),
    Ip(SocketAddr),
}

impl DestinationAddress {
    pub fn port(&self) -> u16 {
        match self {
            DestinationAddress::Domain(_, port) => *port,
            DestinationAddress::Ip(addr) => addr.port(),
        }
    }

    pub fn host(&self) -> String {
        match self {
            DestinationAddress::Domain(domain, _) => domain.clone(),
            DestinationAddress::Ip(addr) => addr.ip().to_string(),
        }
    }

    /// Address body as it appears on the wire, without the type or length prefix.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            DestinationAddress::Domain(domain, port) => {
                [domain.as_bytes(), port.to_be_bytes().as_ref()].concat()
            }
            DestinationAddress::Ip(addr) => match addr {
                SocketAddr::V4(addr) => {
                    [&addr.ip().octets(), addr.port().to_be_bytes().as_ref()].concat()
                }
                SocketAddr::V6(addr) => {
                    [&addr.ip().octets(), addr.port().to_be_bytes().as_ref()].concat()
                }
            },
        }
    }

    pub fn from_bytes(buf: &[u8], ip: bool) -> Result<Self, AddrError> {
        if buf.len() < 3 {
            return Err(AddrError::InvalidAddress(format!("{} bytes", buf.len())));
        }
        let port = u16::from_be_bytes([buf[buf.len() - 2], buf[buf.len() - 1]]);
        if ip {
            let ip = match buf.len() {
                6 => {
                    let mut octets = [0; 4];
                    octets.copy_from_slice(&buf[0..4]);
                    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::from(octets), port))
                }
                18 => {
                    let mut octets = [0; 16];
                    octets.copy_from_slice(&buf[0..16]);
                    SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::from(octets), port, 0, 0))
                }
                n => return Err(AddrError::InvalidAddress(format!("{} bytes", n))),
            };
            Ok(DestinationAddress::Ip(ip))
        } else {
            let domain = String::from_utf8_lossy(&buf[0..buf.len() - 2]).to_string();
            Ok(DestinationAddress::Domain(domain, port))
        }
    }
}

impl Default for DestinationAddress {
    fn default() -> Self {
        DestinationAddress::Ip(SocketAddr::from(([0, 0, 0, 0], 0)))
    }
}

impl Display for DestinationAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DestinationAddress::Domain(domain, port) => write!(f, "{}:{}", domain, port),
            DestinationAddress::Ip(addr) => write!(f, "{}", addr),
        }
    }
}

impl FromStr for DestinationAddress {
    type Err = AddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(ip) = s.parse::<SocketAddr>() {
            return Ok(DestinationAddress::Ip(ip));
        }
        let (domain, port) = s
            .rsplit_once(':')
            .ok_or_else(|| AddrError::InvalidAddress(s.to_string()))?;
        if domain.is_empty() || domain.contains(':') || domain.starts_with('[') {
            return Err(AddrError::InvalidAddress(s.to_string()));
        }
        if domain.len() > MAX_DOMAIN_LEN {
            return Err(AddrError::DomainTooLong(domain.len()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| AddrError::InvalidPort(s.to_string()))?;
        Ok(DestinationAddress::Domain(domain.to_string(), port))
    }
}

pub trait ToSocketDestination {
    fn to_destination_address(&self) -> Result<DestinationAddress, AddrError>;
}

impl ToSocketDestination for SocketAddr {
    fn to_destination_address(&self) -> Result<DestinationAddress, AddrError> {
        Ok(DestinationAddress::Ip(*self))
    }
}

impl ToSocketDestination for DestinationAddress {
    fn to_destination_address(&self) -> Result<DestinationAddress, AddrError> {
        if let DestinationAddress::Domain(domain, _) = self {
            if domain.is_empty() {
                return Err(AddrError::InvalidAddress(self.to_string()));
            }
            if domain.len() > MAX_DOMAIN_LEN {
                return Err(AddrError::DomainTooLong(domain.len()));
            }
        }
        Ok(self.clone())
    }
}

impl ToSocketDestination for &str {
    fn to_destination_address(&self) -> Result<DestinationAddress, AddrError> {
        DestinationAddress::from_str(self)
    }
}

impl ToSocketDestination for String {
    fn to_destination_address(&self) -> Result<DestinationAddress, AddrError> {
        DestinationAddress::from_str(self)
    }
}
