use thiserror::Error;
#[derive(Error, Debug)]
pub enum AddrError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Invalid port in {0}")]
    InvalidPort(String),
    #[error("Domain too long ({0} bytes)")]
    DomainTooLong(usize),
}
