mod config;

use std::net::SocketAddr;

use crate::{
    address::{ToSocketDestination, MAX_DOMAIN_LEN},
    error::{address::AddrError, socks::SocksError},
    relay::{relay, RelayOutcome},
    ReplyStatus,
};
pub use config::{Config as SocksConfig, Credentials};

use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{address::DestinationAddress, AsyncSocket};

const PASSWORD_AUTH_VERSION: u8 = 1;

pub struct Socks5;

pub struct Socks5Client<T> {
    config: SocksConfig,
    socket_stream: T,
}

pub struct Socks5Server<T> {
    config: SocksConfig,
    socket_stream: T,
}

impl Socks5 {
    pub fn new_client<T: AsyncSocket>(config: SocksConfig, socket_stream: T) -> Socks5Client<T> {
        Socks5Client {
            config,
            socket_stream,
        }
    }
    pub fn new_server<T: AsyncSocket>(config: SocksConfig, socket_stream: T) -> Socks5Server<T> {
        Socks5Server {
            config,
            socket_stream,
        }
    }
}

impl<T: AsyncSocket> Socks5Server<T> {
    /// Runs method selection (and password sub-negotiation when configured)
    /// and reads the client's request without answering it.
    pub async fn accept(self) -> Result<ServerInterruptedSocks5Stream<T>, SocksError> {
        let mut socket_stream = self.socket_stream;
        let auth_request = AuthRequest::read(&mut socket_stream).await?;
        let required = match self.config.credentials {
            Some(_) => AuthMethod::UsernamePassword,
            None => AuthMethod::NoAuth,
        };
        if !auth_request.methods.contains(&required) {
            AuthResponse::new(Version::V5, AuthMethod::NoAcceptableMethod)?
                .write(&mut socket_stream)
                .await?;
            return Err(SocksError::NoAcceptableMethod);
        }
        AuthResponse::new(Version::V5, required.clone())?
            .write(&mut socket_stream)
            .await?;
        if let Some(expected) = &self.config.credentials {
            let offered = Credentials::read(&mut socket_stream).await?;
            let accepted = &offered == expected;
            socket_stream
                .write_all(&[PASSWORD_AUTH_VERSION, if accepted { 0 } else { 1 }])
                .await?;
            if !accepted {
                return Err(SocksError::AuthenticationFailed);
            }
        }
        let request = CommandRequest::read(&mut socket_stream).await?;

        Ok(ServerInterruptedSocks5Stream {
            auth_method: required,
            command: request.command,
            addr: request.addr,
            socket: socket_stream,
        })
    }
}

impl<T: AsyncSocket> Socks5Client<T> {
    /// Negotiates an authentication method with the proxy. The returned stream
    /// still has to issue its CONNECT request.
    pub async fn connect(
        self,
        addr: impl ToSocketDestination,
    ) -> Result<ClientInterruptedSocks5Stream<T>, SocksError> {
        let addr = addr.to_destination_address()?;
        let mut socket_stream = self.socket_stream;
        AuthRequest::new(Version::V5, self.config.auth_method.clone())?
            .write(&mut socket_stream)
            .await?;
        let response = AuthResponse::read(&mut socket_stream).await?;
        match response.method {
            AuthMethod::NoAcceptableMethod => return Err(SocksError::NoAcceptableMethod),
            ref method if !self.config.auth_method.contains(method) => {
                return Err(SocksError::UnexpectedMethod(method.into()))
            }
            AuthMethod::NoAuth => {}
            AuthMethod::UsernamePassword => {
                let credentials = self
                    .config
                    .credentials
                    .as_ref()
                    .ok_or(SocksError::MethodNotSupported)?;
                credentials.write(&mut socket_stream).await?;
                let version = socket_stream.read_u8().await?;
                if version != PASSWORD_AUTH_VERSION {
                    return Err(SocksError::InvalidVersion);
                }
                if socket_stream.read_u8().await? != 0 {
                    return Err(SocksError::AuthenticationFailed);
                }
            }
            _ => return Err(SocksError::MethodNotSupported),
        }

        Ok(ClientInterruptedSocks5Stream {
            addr,
            socket: socket_stream,
        })
    }
}

pub struct ClientInterruptedSocks5Stream<T> {
    addr: DestinationAddress,
    socket: T,
}
pub struct ServerInterruptedSocks5Stream<T> {
    auth_method: AuthMethod,
    command: Command,
    addr: DestinationAddress,
    socket: T,
}

impl<T: AsyncSocket> ClientInterruptedSocks5Stream<T> {
    pub fn addr(&self) -> &DestinationAddress {
        &self.addr
    }

    /// Sends CONNECT and hands back the stream once the proxy reports success.
    pub async fn proxied_stream(mut self) -> Result<T, SocksError> {
        CommandRequest::new(Version::V5, Command::Connect, self.addr.to_owned())?
            .write(&mut self.socket)
            .await?;
        let response = CommandResponse::read(&mut self.socket).await?;
        if response.reply != ReplyStatus::Succeeded {
            return Err(SocksError::Reply(response.reply));
        }
        debug!("{} bound by proxy at {}", self.addr, response.addr);

        Ok(self.socket)
    }
}

impl<T: AsyncSocket> ServerInterruptedSocks5Stream<T> {
    pub fn addr(&self) -> &DestinationAddress {
        &self.addr
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn auth_method(&self) -> &AuthMethod {
        &self.auth_method
    }

    pub async fn reply_error(mut self, error: ReplyStatus) -> Result<(), SocksError> {
        CommandResponse::new(Version::V5, error, DestinationAddress::default())?
            .write(&mut self.socket)
            .await
    }

    pub async fn proxied_stream(mut self) -> Result<T, SocksError> {
        match self.command {
            Command::Connect => {
                CommandResponse::new(Version::V5, ReplyStatus::Succeeded, self.addr.to_owned())?
                    .write(&mut self.socket)
                    .await?;
                Ok(self.socket)
            }
            _ => {
                self.reply_error(ReplyStatus::CommandNotSupported).await?;
                Err(SocksError::CommandNotSupported)
            }
        }
    }

    pub async fn serve(self, socket_stream: impl AsyncSocket) -> Result<RelayOutcome, SocksError>
    where
        Self: Sized,
    {
        let s = self.proxied_stream().await?;
        Ok(relay(s, socket_stream).await)
    }
}

#[derive(PartialEq, Clone, Copy)]
pub enum Version {
    V5 = 5,
}

impl Version {
    pub async fn read(mut reader: impl AsyncRead + Unpin) -> Result<Self, SocksError> {
        match reader.read_u8().await? {
            5 => Ok(Version::V5),
            _ => Err(SocksError::InvalidVersion),
        }
    }
}
#[derive(PartialEq, Debug, Clone, Default)]
pub enum AuthMethod {
    #[default]
    NoAuth,
    GssApi,
    UsernamePassword,
    NoAcceptableMethod,
    Other(u8),
}

impl From<&AuthMethod> for u8 {
    fn from(v: &AuthMethod) -> Self {
        match *v {
            AuthMethod::NoAuth => 0,
            AuthMethod::GssApi => 1,
            AuthMethod::UsernamePassword => 2,
            AuthMethod::NoAcceptableMethod => 0xff,
            AuthMethod::Other(v) => v,
        }
    }
}

impl AuthMethod {
    pub async fn read(mut reader: impl AsyncRead + Unpin) -> Result<Self, SocksError> {
        match reader.read_u8().await? {
            0 => Ok(AuthMethod::NoAuth),
            1 => Ok(AuthMethod::GssApi),
            2 => Ok(AuthMethod::UsernamePassword),
            0xff => Ok(AuthMethod::NoAcceptableMethod),
            v => Ok(AuthMethod::Other(v)),
        }
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect = 1,
    Bind = 2,
    UdpAssociate = 3,
}

impl Command {
    pub fn from(v: u8) -> Result<Self, SocksError> {
        match v {
            1 => Ok(Command::Connect),
            2 => Ok(Command::Bind),
            3 => Ok(Command::UdpAssociate),
            _ => Err(SocksError::CommandNotSupported),
        }
    }
}

impl Credentials {
    async fn read(mut reader: impl AsyncRead + Unpin) -> Result<Self, SocksError> {
        if reader.read_u8().await? != PASSWORD_AUTH_VERSION {
            return Err(SocksError::InvalidVersion);
        }
        let mut username = vec![0u8; reader.read_u8().await? as usize];
        reader.read_exact(&mut username).await?;
        let mut password = vec![0u8; reader.read_u8().await? as usize];
        reader.read_exact(&mut password).await?;
        Ok(Credentials {
            username: String::from_utf8_lossy(&username).to_string(),
            password: String::from_utf8_lossy(&password).to_string(),
        })
    }

    async fn write(&self, mut writer: impl AsyncWrite + Unpin) -> Result<(), SocksError> {
        writer
            .write_all(
                &[
                    [PASSWORD_AUTH_VERSION, self.username.len() as u8].as_ref(),
                    self.username.as_bytes(),
                    [self.password.len() as u8].as_ref(),
                    self.password.as_bytes(),
                ]
                .concat(),
            )
            .await
            .map_err(|e| e.into())
    }
}

pub struct Address {
    pub addr: DestinationAddress,
}

impl From<&DestinationAddress> for Address {
    fn from(addr: &DestinationAddress) -> Self {
        Address { addr: addr.clone() }
    }
}

impl Address {
    pub async fn read(mut reader: impl AsyncRead + Unpin) -> Result<Self, SocksError> {
        match reader.read_u8().await? {
            1 => {
                let mut buf = [0u8; 6];
                reader.read_exact(&mut buf).await?;
                Ok(Self {
                    addr: DestinationAddress::from_bytes(&buf, true)?,
                })
            }
            3 => {
                let mut buf = vec![0u8; reader.read_u8().await? as usize + 2];
                reader.read_exact(&mut buf).await?;
                Ok(Self {
                    addr: DestinationAddress::from_bytes(&buf, false)?,
                })
            }
            4 => {
                let mut buf = [0u8; 18];
                reader.read_exact(&mut buf).await?;
                Ok(Self {
                    addr: DestinationAddress::from_bytes(&buf, true)?,
                })
            }
            _ => Err(SocksError::InvalidAddress),
        }
    }
    pub async fn write(&self, mut writer: impl AsyncWrite + Unpin) -> Result<(), SocksError> {
        let (dest_addr_type, addr) = match &self.addr {
            DestinationAddress::Domain(domain, _) => {
                if domain.len() > MAX_DOMAIN_LEN {
                    return Err(AddrError::DomainTooLong(domain.len()).into());
                }
                let mut addr_and_len = vec![domain.len() as u8];
                addr_and_len.extend_from_slice(&self.addr.to_bytes());
                (3u8, addr_and_len)
            }
            DestinationAddress::Ip(SocketAddr::V4(_)) => (1, self.addr.to_bytes()),
            DestinationAddress::Ip(SocketAddr::V6(_)) => (4, self.addr.to_bytes()),
        };
        writer
            .write_all(&[[dest_addr_type].as_ref(), addr.as_ref()].concat())
            .await
            .map_err(|e| e.into())
    }
}

impl From<&ReplyStatus> for u8 {
    fn from(v: &ReplyStatus) -> Self {
        match *v {
            ReplyStatus::Succeeded => 0,
            ReplyStatus::GeneralSocksServerFailure => 1,
            ReplyStatus::ConnectionNotAllowedByRuleset => 2,
            ReplyStatus::NetworkUnreachable => 3,
            ReplyStatus::HostUnreachable => 4,
            ReplyStatus::ConnectionRefused => 5,
            ReplyStatus::TtlExpired => 6,
            ReplyStatus::CommandNotSupported => 7,
            ReplyStatus::AddressTypeNotSupported => 8,
            ReplyStatus::Other(v) => v,
        }
    }
}

impl From<u8> for ReplyStatus {
    fn from(v: u8) -> Self {
        match v {
            0 => ReplyStatus::Succeeded,
            1 => ReplyStatus::GeneralSocksServerFailure,
            2 => ReplyStatus::ConnectionNotAllowedByRuleset,
            3 => ReplyStatus::NetworkUnreachable,
            4 => ReplyStatus::HostUnreachable,
            5 => ReplyStatus::ConnectionRefused,
            6 => ReplyStatus::TtlExpired,
            7 => ReplyStatus::CommandNotSupported,
            8 => ReplyStatus::AddressTypeNotSupported,
            _ => ReplyStatus::Other(v),
        }
    }
}

struct AuthRequest {
    version: Version,
    methods: Vec<AuthMethod>,
}

impl AuthRequest {
    pub fn new(version: Version, methods: Vec<AuthMethod>) -> Result<Self, SocksError> {
        if methods.is_empty() {
            return Err(SocksError::MethodNotProvided);
        }
        if methods.len() > 255 {
            return Err(SocksError::TooManyMethods);
        }
        if version != Version::V5 {
            return Err(SocksError::InvalidVersion);
        }
        Ok(AuthRequest { version, methods })
    }
    pub async fn read(mut reader: impl AsyncRead + Unpin) -> Result<Self, SocksError> {
        let version = Version::read(&mut reader).await?;
        let number_of_methods = reader.read_u8().await?;
        let mut methods = Vec::new();
        for _ in 0..number_of_methods {
            methods.push(AuthMethod::read(&mut reader).await?);
        }
        Ok(AuthRequest { version, methods })
    }
    pub async fn write(&self, mut writer: impl AsyncWrite + Unpin) -> Result<(), SocksError> {
        writer
            .write_all(
                &[
                    [self.version as u8].as_ref(),
                    [self.methods.len() as u8].as_ref(),
                    self.methods
                        .iter()
                        .map(|m| m.into())
                        .collect::<Vec<u8>>()
                        .as_ref(),
                ]
                .concat(),
            )
            .await
            .map_err(|e| e.into())
    }
}

struct AuthResponse {
    version: Version,
    method: AuthMethod,
}

impl AuthResponse {
    pub fn new(version: Version, method: AuthMethod) -> Result<Self, SocksError> {
        if version != Version::V5 {
            return Err(SocksError::InvalidVersion);
        }
        Ok(AuthResponse { version, method })
    }
    pub async fn read(mut reader: impl AsyncRead + Unpin) -> Result<Self, SocksError> {
        let version = Version::read(&mut reader).await?;
        let method = AuthMethod::read(&mut reader).await?;
        Ok(AuthResponse { version, method })
    }
    pub async fn write(&self, mut writer: impl AsyncWrite + Unpin) -> Result<(), SocksError> {
        writer
            .write_all(&[self.version as u8, (&self.method).into()])
            .await
            .map_err(|e| e.into())
    }
}

struct CommandRequest {
    version: Version,
    command: Command,
    addr: DestinationAddress,
}
impl CommandRequest {
    pub fn new(
        version: Version,
        command: Command,
        addr: DestinationAddress,
    ) -> Result<Self, SocksError> {
        if version != Version::V5 {
            return Err(SocksError::InvalidVersion);
        }
        Ok(CommandRequest {
            version,
            command,
            addr,
        })
    }
    pub async fn read(mut reader: impl AsyncRead + Unpin) -> Result<Self, SocksError> {
        let version = Version::read(&mut reader).await?;
        let command = Command::from(reader.read_u8().await?)?;
        reader.read_u8().await?;
        let addr = Address::read(&mut reader).await?;
        Ok(CommandRequest {
            version,
            command,
            addr: addr.addr,
        })
    }
    pub async fn write(&self, mut writer: impl AsyncWrite + Unpin) -> Result<(), SocksError> {
        writer
            .write_all([self.version as u8, self.command as u8, 0].as_ref())
            .await?;
        Address::from(&self.addr).write(&mut writer).await
    }
}

struct CommandResponse {
    version: Version,
    reply: ReplyStatus,
    addr: DestinationAddress,
}

impl CommandResponse {
    pub fn new(
        version: Version,
        reply: ReplyStatus,
        addr: DestinationAddress,
    ) -> Result<Self, SocksError> {
        if version != Version::V5 {
            return Err(SocksError::InvalidVersion);
        }
        Ok(CommandResponse {
            version,
            reply,
            addr,
        })
    }
    pub async fn read(mut reader: impl AsyncRead + Unpin) -> Result<Self, SocksError> {
        let version = Version::read(&mut reader).await?;
        let reply = ReplyStatus::from(reader.read_u8().await?);
        reader.read_u8().await?;
        let addr = Address::read(&mut reader).await?;
        Ok(CommandResponse {
            version,
            reply,
            addr: addr.addr,
        })
    }
    pub async fn write(&self, mut writer: impl AsyncWrite + Unpin) -> Result<(), SocksError> {
        writer
            .write_all([self.version as u8, (&self.reply).into(), 0].as_ref())
            .await?;
        Address::from(&self.addr).write(&mut writer).await
    }
}
