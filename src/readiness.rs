use std::future::poll_fn;
use std::io;
use std::net::SocketAddr;
use std::task::Poll;

use tokio::net::{TcpListener, TcpStream};
use tracing::debug;

// Polled once and never awaited; EOF counts as ready.
pub async fn available(stream: &TcpStream) -> bool {
    poll_fn(|cx| match stream.poll_read_ready(cx) {
        Poll::Ready(Ok(())) => Poll::Ready(true),
        Poll::Ready(Err(e)) => {
            debug!("Failed to inspect socket readiness: {:?}", e);
            Poll::Ready(false)
        }
        Poll::Pending => Poll::Ready(false),
    })
    .await
}

pub async fn try_accept(listener: &TcpListener) -> Option<io::Result<(TcpStream, SocketAddr)>> {
    poll_fn(|cx| match listener.poll_accept(cx) {
        Poll::Ready(rv) => Poll::Ready(Some(rv)),
        Poll::Pending => Poll::Ready(None),
    })
    .await
}
