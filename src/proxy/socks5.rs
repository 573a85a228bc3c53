use std::{
    fmt,
    io::ErrorKind,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
};

use log::warn;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, Socks5Error};

pub(crate) const VER: u8 = 5;
pub(crate) const NO_AUTH: u8 = 0;
pub(crate) const NO_ACCEPTABLE_METHODS: u8 = 0xff;

// Methods past this count are never read.
pub(crate) const MAX_METHODS: u8 = 5;

pub(crate) const CMD_CONNECT: u8 = 1;
pub(crate) const CMD_BIND: u8 = 2;
pub(crate) const CMD_UDP_ASSOCIATE: u8 = 3;

pub(crate) const ATYP_IPV4: u8 = 1;
pub(crate) const ATYP_DOMAIN: u8 = 3;
pub(crate) const ATYP_IPV6: u8 = 4;

pub(crate) const REP_SUCCESS: u8 = 0;
pub(crate) const REP_GENERAL_FAILURE: u8 = 1;
pub(crate) const REP_NETWORK_UNREACHABLE: u8 = 3;
pub(crate) const REP_HOST_UNREACHABLE: u8 = 4;
pub(crate) const REP_CONNECTION_REFUSED: u8 = 5;
pub(crate) const REP_TTL_EXPIRED: u8 = 6;
pub(crate) const REP_COMMAND_NOT_SUPPORTED: u8 = 7;
pub(crate) const REP_ADDR_TYPE_NOT_SUPPORTED: u8 = 8;

/// Destination of a CONNECT request. Domain names are resolved when dialing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Ip(SocketAddrV4),
    Host(String, u16),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Ip(addr) => write!(f, "{}", addr),
            Destination::Host(host, port) => write!(f, "{}:{}", host, port),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Command {
    Connect,
    Bind,
    UdpAssociate,
}

impl TryFrom<u8> for Command {
    type Error = Socks5Error;

    fn try_from(cmd: u8) -> Result<Self> {
        match cmd {
            CMD_CONNECT => Ok(Command::Connect),
            CMD_BIND => Ok(Command::Bind),
            CMD_UDP_ASSOCIATE => Ok(Command::UdpAssociate),
            c => Err(Socks5Error::UnknownCommand(c)),
        }
    }
}

/// Reads the method selection message and answers it. Only NO AUTH is accepted.
pub async fn negotiate_method<S>(stream: &mut S) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let ver = read_u8(stream, "VER").await?;
    if ver != VER {
        return Err(Socks5Error::ProtocolVersionMismatch(ver));
    }

    let nmethods = read_u8(stream, "NMETHODS").await?;
    if nmethods > MAX_METHODS {
        return Err(Socks5Error::TooManyMethods(nmethods));
    }

    let mut buf = [0u8; MAX_METHODS as usize];
    let methods = &mut buf[..nmethods as usize];
    read_exact(stream, methods, "METHODS").await?;

    if !methods.contains(&NO_AUTH) {
        stream.write_all(&[VER, NO_ACCEPTABLE_METHODS]).await?;
        stream.flush().await?;
        return Err(Socks5Error::NoAcceptableMethod);
    }

    stream.write_all(&[VER, NO_AUTH]).await?;
    stream.flush().await?;
    Ok(())
}

/// Reads a CONNECT request up to and including the destination port.
pub async fn read_request<R>(stream: &mut R) -> Result<Destination>
where
    R: AsyncRead + Unpin,
{
    let ver = read_u8(stream, "VER").await?;
    if ver != VER {
        return Err(Socks5Error::ProtocolVersionMismatch(ver));
    }

    let cmd = read_u8(stream, "CMD").await?;
    match Command::try_from(cmd)? {
        Command::Connect => {}
        Command::Bind | Command::UdpAssociate => {
            return Err(Socks5Error::UnsupportedCommand(cmd));
        }
    }

    let _rsv = read_u8(stream, "RSV").await?;
    let atype = read_u8(stream, "ATYP").await?;
    read_destination(stream, atype).await
}

async fn read_destination<R>(stream: &mut R, atype: u8) -> Result<Destination>
where
    R: AsyncRead + Unpin,
{
    match atype {
        ATYP_IPV4 => {
            let mut octets = [0u8; 4];
            read_exact(stream, &mut octets, "DST.ADDR").await?;
            let port = read_port(stream).await?;
            let addr = SocketAddrV4::new(Ipv4Addr::from(octets), port);
            Ok(Destination::Ip(addr))
        }
        ATYP_DOMAIN => {
            let len = read_u8(stream, "DST.ADDR length").await?;
            let mut domain = vec![0u8; len as usize];
            read_exact(stream, &mut domain, "DST.ADDR").await?;
            let port = read_port(stream).await?;
            let host = String::from_utf8(domain).map_err(|_| Socks5Error::InvalidDomainName)?;
            if host.is_empty() {
                return Err(Socks5Error::InvalidDomainName);
            }
            Ok(Destination::Host(host, port))
        }
        ATYP_IPV6 => Err(Socks5Error::UnsupportedAddressType(atype)),
        atype => Err(Socks5Error::UnknownAddressType(atype)),
    }
}

/// Writes the success reply carrying the outbound connection's local address.
pub async fn reply_success<W>(stream: &mut W, bind: SocketAddr) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_reply(stream, REP_SUCCESS, reported_bind(bind)).await
}

pub async fn reply_failure<W>(stream: &mut W, rep: u8) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let bind = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
    write_reply(stream, rep, bind).await
}

async fn write_reply<W>(stream: &mut W, rep: u8, bind: SocketAddrV4) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut reply = [0u8; 10];
    reply[..4].copy_from_slice(&[VER, rep, 0, ATYP_IPV4]);
    reply[4..8].copy_from_slice(&bind.ip().octets());
    reply[8..].copy_from_slice(&bind.port().to_be_bytes());

    stream.write_all(&reply).await?;
    stream.flush().await?;
    Ok(())
}

// The reply always uses ATYP IPv4.
fn reported_bind(bind: SocketAddr) -> SocketAddrV4 {
    match bind {
        SocketAddr::V4(addr) => addr,
        SocketAddr::V6(addr) => {
            let ip = addr.ip().to_ipv4_mapped().unwrap_or_else(|| {
                warn!("socks5: bound address {} is not IPv4", addr);
                Ipv4Addr::UNSPECIFIED
            });
            SocketAddrV4::new(ip, addr.port())
        }
    }
}

async fn read_u8<R>(stream: &mut R, field: &'static str) -> Result<u8>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 1];
    read_exact(stream, &mut buf, field).await?;
    Ok(buf[0])
}

async fn read_port<R>(stream: &mut R) -> Result<u16>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 2];
    read_exact(stream, &mut buf, "DST.PORT").await?;
    Ok(u16::from_be_bytes(buf))
}

async fn read_exact<R>(stream: &mut R, buf: &mut [u8], field: &'static str) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    match stream.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(Socks5Error::ShortRead(field)),
        Err(e) => Err(Socks5Error::Io(e)),
    }
}
