use std::io::{self, ErrorKind};

use thiserror::Error;

use crate::proxy::socks5::{
    REP_ADDR_TYPE_NOT_SUPPORTED, REP_COMMAND_NOT_SUPPORTED, REP_CONNECTION_REFUSED,
    REP_GENERAL_FAILURE, REP_HOST_UNREACHABLE, REP_NETWORK_UNREACHABLE, REP_TTL_EXPIRED,
};

pub type Result<T> = std::result::Result<T, Socks5Error>;

#[derive(Debug, Error)]
pub enum Socks5Error {
    #[error("socks5: version mismatch {0}")]
    ProtocolVersionMismatch(u8),
    #[error("socks5: too many methods {0}")]
    TooManyMethods(u8),
    #[error("socks5: short read of {0}")]
    ShortRead(&'static str),
    #[error("socks5: not found NO AUTH method")]
    NoAcceptableMethod,
    #[error("socks5: unsupport CMD {0}")]
    UnsupportedCommand(u8),
    #[error("socks5: unknown CMD {0}")]
    UnknownCommand(u8),
    #[error("socks5: unsupport addr type {0}")]
    UnsupportedAddressType(u8),
    #[error("socks5: unknown addr type {0}")]
    UnknownAddressType(u8),
    #[error("socks5: invalid domain")]
    InvalidDomainName,
    #[error("connect {destination} error: {source}")]
    UpstreamConnectFailed {
        destination: String,
        #[source]
        source: io::Error,
    },
    #[error("relay error: {0}")]
    RelayIo(#[source] io::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Socks5Error {
    /// Reply code sent to the client before closing, when failure replies are enabled.
    pub fn reply_code(&self) -> Option<u8> {
        match self {
            Socks5Error::UnsupportedCommand(_) | Socks5Error::UnknownCommand(_) => {
                Some(REP_COMMAND_NOT_SUPPORTED)
            }
            Socks5Error::UnsupportedAddressType(_) | Socks5Error::UnknownAddressType(_) => {
                Some(REP_ADDR_TYPE_NOT_SUPPORTED)
            }
            Socks5Error::InvalidDomainName => Some(REP_GENERAL_FAILURE),
            Socks5Error::UpstreamConnectFailed { source, .. } => Some(match source.kind() {
                ErrorKind::ConnectionRefused => REP_CONNECTION_REFUSED,
                ErrorKind::NetworkUnreachable => REP_NETWORK_UNREACHABLE,
                ErrorKind::HostUnreachable => REP_HOST_UNREACHABLE,
                ErrorKind::TimedOut => REP_TTL_EXPIRED,
                _ => REP_GENERAL_FAILURE,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config error: {0}")]
    Read(#[from] io::Error),
    #[error("parse config error: {0}")]
    Parse(#[from] toml::de::Error),
}
