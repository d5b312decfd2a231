use crate::{
    address::DestinationAddress,
    error::TunnelError,
    socks5::{Credentials, SocksConfig},
};

pub const DEFAULT_LISTEN: &str = "localhost:8000";
pub const DEFAULT_VIA: &str = "8080";
pub const DEFAULT_DIAL: &str = "color-foo-bar-123:4567";

/// Host the proxy is assumed to run on when only a port is given.
pub const PROXY_HOST: &str = "localhost";

/// Everything a tunnel needs, fixed at startup.
#[derive(Debug, Clone)]
pub struct TunnelConfig {
    pub listen: String,
    pub proxy: DestinationAddress,
    pub remote: DestinationAddress,
    pub socks: SocksConfig,
}

impl TunnelConfig {
    /// `via` is either a bare port on [`PROXY_HOST`] or a full `host:port`.
    pub fn new(listen: impl Into<String>, via: &str, dial: &str) -> Result<Self, TunnelError> {
        let listen = listen.into();
        if listen.trim().is_empty() {
            return Err(TunnelError::Config("listen address is empty".into()));
        }
        let proxy = match via.parse::<u16>() {
            Ok(port) => DestinationAddress::Domain(PROXY_HOST.to_string(), port),
            Err(_) => via
                .parse::<DestinationAddress>()
                .map_err(|e| TunnelError::Config(format!("invalid proxy {:?}: {}", via, e)))?,
        };
        let remote = dial
            .parse::<DestinationAddress>()
            .map_err(|e| TunnelError::Config(format!("invalid dial address {:?}: {}", dial, e)))?;
        Ok(TunnelConfig {
            listen,
            proxy,
            remote,
            socks: SocksConfig::default(),
        })
    }

    pub fn with_credentials(
        mut self,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self, TunnelError> {
        match (username, password) {
            (None, None) => {}
            (Some(username), Some(password)) => {
                let credentials = Credentials::new(username, password)
                    .map_err(|e| TunnelError::Config(e.to_string()))?;
                self.socks = SocksConfig::with_credentials(credentials);
            }
            _ => {
                return Err(TunnelError::Config(
                    "username and password must be given together".into(),
                ))
            }
        }
        Ok(self)
    }
}

impl Default for TunnelConfig {
    fn default() -> Self {
        TunnelConfig {
            listen: DEFAULT_LISTEN.to_string(),
            proxy: DestinationAddress::Domain(PROXY_HOST.to_string(), 8080),
            remote: DestinationAddress::Domain("color-foo-bar-123".to_string(), 4567),
            socks: SocksConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli_defaults() {
        let parsed = TunnelConfig::new(DEFAULT_LISTEN, DEFAULT_VIA, DEFAULT_DIAL).unwrap();
        let default = TunnelConfig::default();
        assert_eq!(parsed.listen, default.listen);
        assert_eq!(parsed.proxy, default.proxy);
        assert_eq!(parsed.remote, default.remote);
        assert_eq!(default.proxy.to_string(), "localhost:8080");
    }

    #[test]
    fn via_accepts_port_or_address() {
        let config = TunnelConfig::new("127.0.0.1:0", "9050", "example.org:80").unwrap();
        assert_eq!(config.proxy.to_string(), "localhost:9050");
        let config = TunnelConfig::new("127.0.0.1:0", "10.0.0.2:1080", "example.org:80").unwrap();
        assert_eq!(config.proxy.to_string(), "10.0.0.2:1080");
    }

    #[test]
    fn rejects_malformed_configuration() {
        assert!(matches!(
            TunnelConfig::new("", "8080", "example.org:80"),
            Err(TunnelError::Config(_))
        ));
        assert!(matches!(
            TunnelConfig::new("localhost:8000", "not a port", "example.org:80"),
            Err(TunnelError::Config(_))
        ));
        assert!(matches!(
            TunnelConfig::new("localhost:8000", "8080", "example.org"),
            Err(TunnelError::Config(_))
        ));
    }

    #[test]
    fn credentials_come_in_pairs() {
        let config = TunnelConfig::default();
        assert!(config
            .clone()
            .with_credentials(Some("user".into()), None)
            .is_err());
        let config = config
            .with_credentials(Some("user".into()), Some("pass".into()))
            .unwrap();
        assert!(config.socks.credentials.is_some());
    }
}
