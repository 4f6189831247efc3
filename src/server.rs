//! # TCP Server
//!
//! Accepts concentrator connections and runs one [`Session`] per connection.
//! Each connection has a read loop feeding the frame decoder and a writer
//! task draining the session's outbound queue.

use crate::config::GatewayConfig;
use crate::error::Result;
use crate::logging::{log_frame_hex, LogThrottle, INBOUND, OUTBOUND};
use crate::session::Session;
use crate::telemetry::TelemetrySink;
use crate::transport::{Frame, FrameCodec};
use bytes::BytesMut;
use futures::SinkExt;
use log::{debug, error, info, log_enabled, warn, Level};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::codec::{Decoder, FramedWrite};
use tokio_util::sync::CancellationToken;

const READ_BUFFER_SIZE: usize = 1024;

/// Runs the accept loop until the listener fails.
pub async fn serve(
    listener: TcpListener,
    config: Arc<GatewayConfig>,
    sink: Arc<dyn TelemetrySink>,
) -> Result<()> {
    serve_until(listener, config, sink, CancellationToken::new()).await
}

/// Runs the accept loop until `shutdown` is cancelled.
pub async fn serve_until(
    listener: TcpListener,
    config: Arc<GatewayConfig>,
    sink: Arc<dyn TelemetrySink>,
    shutdown: CancellationToken,
) -> Result<()> {
    info!("Gateway listening on {}", listener.local_addr()?);

    loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Gateway shutting down");
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Accept failed: {}", e);
                    continue;
                }
            },
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!("{}: set_nodelay failed: {}", peer, e);
        }
        let config = Arc::clone(&config);
        let sink = Arc::clone(&sink);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer, config, sink).await {
                warn!("{}: connection ended with error: {}", peer, e);
            }
        });
    }
}

/// Serves one connection until the peer closes it or a read fails.
pub async fn handle_connection<S>(
    stream: S,
    peer: SocketAddr,
    config: Arc<GatewayConfig>,
    sink: Arc<dyn TelemetrySink>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    info!("{}: connected", peer);
    let peer_name = peer.to_string();
    let (mut reader, writer) = tokio::io::split(stream);
    let (outbound_tx, outbound_rx) = mpsc::channel(config.protocol.outbound_queue);
    let codec = FrameCodec::with_checksum(config.protocol.verify_checksum);

    let session = Session::new(peer_name.clone(), Arc::clone(&config), sink, outbound_tx);
    let writer_task = tokio::spawn(write_frames(
        FramedWrite::new(writer, codec),
        outbound_rx,
        peer_name.clone(),
    ));

    let mut decoder = codec;
    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
    let mut throttle = LogThrottle::new(Duration::from_secs(10), 5);

    let result = loop {
        let n = match reader.read_buf(&mut buf).await {
            Ok(0) => break Ok(()),
            Ok(n) => n,
            Err(e) => break Err(e.into()),
        };
        log_frame_hex(INBOUND, &peer_name, &buf[buf.len() - n..]);

        loop {
            match decoder.decode(&mut buf) {
                Ok(Some(frame)) => {
                    if config.protocol.serial_dispatch {
                        session.dispatch(frame).await;
                    } else {
                        let session = Arc::clone(&session);
                        tokio::spawn(async move { session.dispatch(frame).await });
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    if throttle.allow() {
                        warn!("{}: discarded malformed input: {}", peer_name, e);
                    }
                }
            }
        }
    };

    let suppressed = throttle.take_suppressed();
    if suppressed > 0 {
        warn!("{}: {} malformed input warnings suppressed", peer_name, suppressed);
    }
    session.close();
    writer_task.abort();
    info!("{}: disconnected", peer_name);
    result
}

async fn write_frames<W>(
    mut framed: FramedWrite<W, FrameCodec>,
    mut outbound: mpsc::Receiver<Frame>,
    peer: String,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = outbound.recv().await {
        debug!("{}: sending {}", peer, frame);
        if log_enabled!(Level::Debug) {
            if let Ok(raw) = frame.build() {
                log_frame_hex(OUTBOUND, &peer, &raw);
            }
        }
        if let Err(e) = framed.send(frame).await {
            warn!("{}: write failed: {}", peer, e);
            break;
        }
    }
}
