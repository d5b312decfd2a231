use crate::error::socks::SocksError;

use super::AuthMethod;

/// Username/password pair for RFC 1929 sub-negotiation.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub(crate) username: String,
    pub(crate) password: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, SocksError> {
        let username = username.into();
        let password = password.into();
        if !(1..=255).contains(&username.len()) || !(1..=255).contains(&password.len()) {
            return Err(SocksError::InvalidCredentials);
        }
        Ok(Credentials { username, password })
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub auth_method: Vec<AuthMethod>,
    pub credentials: Option<Credentials>,
}

impl Config {
    pub fn with_credentials(credentials: Credentials) -> Self {
        Config {
            auth_method: vec![AuthMethod::NoAuth, AuthMethod::UsernamePassword],
            credentials: Some(credentials),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            auth_method: vec![AuthMethod::NoAuth],
            credentials: None,
        }
    }
}
