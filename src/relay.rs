use std::io;

use log::debug;
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    select,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToUpstream,
    UpstreamToClient,
}

/// How a relayed pair came to an end.
///
/// Each direction is `None` when its copy was cancelled before it ended.
/// A failed copy carries only its error; the partial byte count is not known.
#[derive(Debug)]
pub struct RelayOutcome {
    /// The direction whose copy ended first.
    pub finished: Direction,
    pub client_to_upstream: Option<io::Result<u64>>,
    pub upstream_to_client: Option<io::Result<u64>>,
}

impl RelayOutcome {
    pub fn error(&self) -> Option<&io::Error> {
        [&self.client_to_upstream, &self.upstream_to_client]
            .into_iter()
            .find_map(|res| res.as_ref().and_then(|res| res.as_ref().err()))
    }
}

async fn copy_half<R, W>(reader: &mut R, writer: &mut W) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let bytes = tokio::io::copy(reader, writer).await?;
    writer.shutdown().await?;
    Ok(bytes)
}

/// Copies bytes both ways between `client` and `upstream`.
///
/// A clean EOF from the client is passed on as a half-close: the upstream write
/// side is shut down and upstream bytes keep flowing to the client until the
/// upstream ends too. EOF from the upstream, or an error in either direction,
/// cancels the other copy. Both write halves are shut down and both streams
/// dropped before returning.
pub async fn relay<A, B>(client: A, upstream: B) -> RelayOutcome
where
    A: AsyncRead + AsyncWrite,
    B: AsyncRead + AsyncWrite,
{
    let (mut client_reader, mut client_writer) = tokio::io::split(client);
    let (mut upstream_reader, mut upstream_writer) = tokio::io::split(upstream);

    let outcome = {
        let client_to_upstream = copy_half(&mut client_reader, &mut upstream_writer);
        let upstream_to_client = copy_half(&mut upstream_reader, &mut client_writer);
        tokio::pin!(client_to_upstream, upstream_to_client);

        select! {
            res = &mut client_to_upstream => {
                let drained = match res {
                    Ok(_) => Some((&mut upstream_to_client).await),
                    Err(_) => None,
                };
                RelayOutcome {
                    finished: Direction::ClientToUpstream,
                    client_to_upstream: Some(res),
                    upstream_to_client: drained,
                }
            }
            res = &mut upstream_to_client => RelayOutcome {
                finished: Direction::UpstreamToClient,
                client_to_upstream: None,
                upstream_to_client: Some(res),
            },
        }
    };

    if let Err(e) = upstream_writer.shutdown().await {
        debug!("upstream shutdown: {}", e);
    }
    if let Err(e) = client_writer.shutdown().await {
        debug!("client shutdown: {}", e);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt};

    #[tokio::test]
    async fn copies_both_directions_until_both_ends_close() {
        let (client, mut client_peer) = duplex(64);
        let (upstream, mut upstream_peer) = duplex(64);
        let task = tokio::spawn(relay(client, upstream));

        client_peer.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        upstream_peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        upstream_peer.write_all(b"pong").await.unwrap();
        client_peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");

        drop(client_peer);
        let mut rest = Vec::new();
        upstream_peer.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
        drop(upstream_peer);

        let outcome = task.await.unwrap();
        assert_eq!(outcome.finished, Direction::ClientToUpstream);
        assert_eq!(outcome.client_to_upstream.unwrap().unwrap(), 4);
        assert_eq!(outcome.upstream_to_client.unwrap().unwrap(), 4);
    }

    #[tokio::test]
    async fn client_half_close_still_receives_reply() {
        let (client, mut client_peer) = duplex(64);
        let (upstream, mut upstream_peer) = duplex(64);
        let task = tokio::spawn(relay(client, upstream));

        client_peer.write_all(b"request").await.unwrap();
        client_peer.shutdown().await.unwrap();

        let mut request = Vec::new();
        upstream_peer.read_to_end(&mut request).await.unwrap();
        assert_eq!(request, b"request");
        upstream_peer.write_all(b"late reply").await.unwrap();
        drop(upstream_peer);

        let mut reply = Vec::new();
        client_peer.read_to_end(&mut reply).await.unwrap();
        assert_eq!(reply, b"late reply");

        let outcome = task.await.unwrap();
        assert_eq!(outcome.finished, Direction::ClientToUpstream);
        assert_eq!(*outcome.upstream_to_client.as_ref().unwrap().as_ref().unwrap(), 10);
        assert!(outcome.error().is_none());
    }

    #[tokio::test]
    async fn upstream_close_cancels_other_direction() {
        let (client, mut client_peer) = duplex(64);
        let (upstream, upstream_peer) = duplex(64);
        let task = tokio::spawn(relay(client, upstream));

        drop(upstream_peer);
        let outcome = task.await.unwrap();
        assert_eq!(outcome.finished, Direction::UpstreamToClient);
        assert!(outcome.client_to_upstream.is_none());

        let mut rest = Vec::new();
        client_peer.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }
}
