mod dial;
mod relay;
pub mod socks5;

use std::sync::Arc;

use futures::stream::StreamExt;
use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite, BufReader},
    net::TcpListener,
};
use tokio_stream::wrappers::TcpListenerStream;

use crate::config::{Config, ReplyMode};
use crate::error::{Result, Socks5Error};

pub use dial::{Dialer, TcpDialer};
pub use relay::relay;
pub use socks5::Destination;

/// Per-connection SOCKS5 CONNECT handling, shared by every session.
#[derive(Clone)]
pub struct Socks5Proxy {
    dialer: Arc<dyn Dialer>,
    reply_mode: ReplyMode,
}

impl Socks5Proxy {
    pub fn new(dialer: Arc<dyn Dialer>, reply_mode: ReplyMode) -> Self {
        Self { dialer, reply_mode }
    }

    pub fn from_config(config: &Config) -> Self {
        let dialer = TcpDialer::new(config.connect_timeout());
        Self::new(Arc::new(dialer), config.reply_mode)
    }

    /// Runs one session to completion. Both connections are closed on return.
    pub async fn handle<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        // Bytes read ahead during the handshake stay in this buffer and reach the relay.
        let mut inbound = BufReader::new(stream);

        socks5::negotiate_method(&mut inbound).await?;

        let destination = match socks5::read_request(&mut inbound).await {
            Ok(destination) => destination,
            Err(e) => return Err(self.refuse(&mut inbound, e).await),
        };

        info!("Connect - {}", destination);
        let outbound = match self.dialer.dial(&destination).await {
            Ok(outbound) => outbound,
            Err(source) => {
                let error = Socks5Error::UpstreamConnectFailed {
                    destination: destination.to_string(),
                    source,
                };
                return Err(self.refuse(&mut inbound, error).await);
            }
        };

        socks5::reply_success(&mut inbound, outbound.local_addr()?).await?;
        relay(inbound, outbound).await
    }

    async fn refuse<W>(&self, stream: &mut W, error: Socks5Error) -> Socks5Error
    where
        W: AsyncWrite + Unpin,
    {
        if self.reply_mode == ReplyMode::Rfc1928 {
            if let Some(rep) = error.reply_code() {
                if let Err(e) = socks5::reply_failure(stream, rep).await {
                    debug!("socks5: failure reply not sent: {}", e);
                }
            }
        }

        error
    }
}

pub async fn run_socks5_proxy(config: &Config) -> std::io::Result<()> {
    let listener = TcpListener::bind(&config.listen).await?;
    info!("SOCKS5 listen on {}", listener.local_addr()?);
    serve(listener, Socks5Proxy::from_config(config)).await
}

/// Accepts connections forever, one task per connection.
pub async fn serve(listener: TcpListener, proxy: Socks5Proxy) -> std::io::Result<()> {
    let mut incoming = TcpListenerStream::new(listener);

    while let Some(stream) = incoming.next().await {
        match stream {
            Ok(stream) => {
                let proxy = proxy.clone();
                let peer = stream.peer_addr();

                tokio::spawn(async move {
                    if let Err(e) = proxy.handle(stream).await {
                        match peer {
                            Ok(peer) => warn!("{} - {}", peer, e),
                            Err(_) => warn!("{}", e),
                        }
                    }
                });
            }
            Err(e) => warn!("accept error: {}", e),
        }
    }

    Ok(())
}
