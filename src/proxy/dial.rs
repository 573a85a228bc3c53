use std::{
    io::{Error, ErrorKind, Result},
    net::SocketAddr,
    time::Duration,
};

use async_trait::async_trait;
use tokio::net::{self, TcpStream};

use super::socks5::Destination;

#[async_trait]
pub trait Dialer: Sync + Send {
    async fn dial(&self, destination: &Destination) -> Result<TcpStream>;
}

/// Dials destinations directly. Domain names are resolved as part of the dial
/// and only their IPv4 addresses are tried.
pub struct TcpDialer {
    connect_timeout: Option<Duration>,
}

impl TcpDialer {
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(&self, destination: &Destination) -> Result<TcpStream> {
        match self.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, connect(destination))
                .await
                .map_err(|_| Error::new(ErrorKind::TimedOut, "connect timed out"))?,
            None => connect(destination).await,
        }
    }
}

async fn connect(destination: &Destination) -> Result<TcpStream> {
    match destination {
        Destination::Ip(addr) => TcpStream::connect(*addr).await,
        Destination::Host(host, port) => {
            let addrs = net::lookup_host((host.as_str(), *port)).await?;

            let mut last_error = None;
            for addr in addrs.filter(SocketAddr::is_ipv4) {
                match TcpStream::connect(addr).await {
                    Ok(stream) => return Ok(stream),
                    Err(e) => last_error = Some(e),
                }
            }

            Err(last_error.unwrap_or_else(|| {
                let error = format!("no IPv4 address for {}", host);
                Error::new(ErrorKind::HostUnreachable, error)
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, SocketAddrV4};

    use tokio::net::TcpListener;

    use super::*;

    async fn local_listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[tokio::test]
    async fn dial_ipv4() {
        let (listener, port) = local_listener().await;
        let destination = Destination::Ip(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port));

        let stream = TcpDialer::new(None).dial(&destination).await.unwrap();
        let (_, peer) = listener.accept().await.unwrap();
        assert_eq!(stream.local_addr().unwrap(), peer);
    }

    #[tokio::test]
    async fn dial_localhost_uses_ipv4() {
        let (listener, port) = local_listener().await;
        let destination = Destination::Host("localhost".to_string(), port);

        let dialer = TcpDialer::new(Some(Duration::from_secs(5)));
        let stream = dialer.dial(&destination).await.unwrap();
        let _ = listener.accept().await.unwrap();
        assert!(stream.local_addr().unwrap().is_ipv4());
    }

    #[tokio::test]
    async fn dial_refused() {
        let (listener, port) = local_listener().await;
        drop(listener);
        let destination = Destination::Ip(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port));

        let err = TcpDialer::new(None).dial(&destination).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionRefused);
    }
}
