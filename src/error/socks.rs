use thiserror::Error;

use super::address;
use crate::ReplyStatus;

#[derive(Error, Debug)]
pub enum SocksError {
    #[error("Invalid Version")]
    InvalidVersion,
    #[error("Command not supported")]
    CommandNotSupported,
    #[error("Method not supported")]
    MethodNotSupported,
    #[error("Method not provided")]
    MethodNotProvided,
    #[error("Too many methods provided")]
    TooManyMethods,
    #[error("No acceptable authentication method")]
    NoAcceptableMethod,
    #[error("Proxy selected a method that was not offered: {0:#04x}")]
    UnexpectedMethod(u8),
    #[error("Invalid credentials length")]
    InvalidCredentials,
    #[error("Authentication failed")]
    AuthenticationFailed,
    #[error("Invalid Address")]
    InvalidAddress,
    #[error("Proxy replied: {0}")]
    Reply(ReplyStatus),
    #[error("IOError: {0}")]
    IOError(#[from] std::io::Error),
    #[error("AddressError: {0}")]
    AddressError(#[from] address::AddrError),
}
