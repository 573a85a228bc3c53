use log::debug;
use tokio::io::{self, AsyncRead, AsyncWrite};

use crate::error::{Result, Socks5Error};

/// Copies bytes both ways until either direction ends, then drops both streams.
pub async fn relay<A, B>(inbound: A, outbound: B) -> Result<()>
where
    A: AsyncRead + AsyncWrite,
    B: AsyncRead + AsyncWrite,
{
    let (mut inbound_reader, mut inbound_writer) = io::split(inbound);
    let (mut outbound_reader, mut outbound_writer) = io::split(outbound);

    let result = tokio::select! {
        r = io::copy(&mut inbound_reader, &mut outbound_writer) => {
            r.map(|n| debug!("client finished after {} bytes", n))
        }
        r = io::copy(&mut outbound_reader, &mut inbound_writer) => {
            r.map(|n| debug!("remote finished after {} bytes", n))
        }
    };

    result.map_err(Socks5Error::RelayIo)
}
