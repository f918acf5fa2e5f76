use std::io;

use bytes::{Buf, BytesMut};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::readiness::available;

pub const BUFFER_SIZE: usize = 4096;

// Moves at most one buffer from `src` to `dst`, never waiting on either peer.
// Bytes `dst` could not take yet stay in `backlog`, and `src` is not read
// again until they are flushed.
pub async fn relay(src: &TcpStream, dst: &TcpStream, backlog: &mut BytesMut) -> bool {
    if !backlog.is_empty() {
        return flush(dst, backlog);
    }

    if !available(src).await {
        return true;
    }

    let mut buf = [0; BUFFER_SIZE];
    let n = match src.try_read(&mut buf) {
        Ok(n) => n,
        // stale readiness, nothing was consumed
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => return true,
        Err(e) => {
            debug!("Failed to read from socket: {:?}", e);
            0
        }
    };
    if n == 0 {
        return false;
    }

    backlog.extend_from_slice(&buf[..n]);
    flush(dst, backlog)
}

fn flush(dst: &TcpStream, backlog: &mut BytesMut) -> bool {
    while !backlog.is_empty() {
        match dst.try_write(&backlog[..]) {
            Ok(0) => {
                debug!("Socket stopped accepting bytes");
                return false;
            }
            Ok(n) => {
                trace!("Relayed {} bytes", n);
                backlog.advance(n);
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                trace!("Holding back {} bytes", backlog.len());
                break;
            }
            Err(e) => {
                debug!("Failed to write to socket: {:?}", e);
                return false;
            }
        }
    }

    true
}

// Resolves once the next relay call can make progress.
pub async fn wait(src: &TcpStream, dst: &TcpStream, backlog: &BytesMut) -> io::Result<()> {
    if backlog.is_empty() {
        src.readable().await
    } else {
        dst.writable().await
    }
}
